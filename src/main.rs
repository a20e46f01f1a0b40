//! Social Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    if let Err(e) = social_backend::run().await {
        eprintln!("social-backend: {e}");
        std::process::exit(1);
    }
}
