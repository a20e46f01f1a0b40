/*!
 * Application configuration
 * Read once from the environment (after `.env` is loaded) and shared via `AppState`.
 */

/// Placeholder secret used when `JWT_SECRET` is unset. Refused in production.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub github: GithubConfig,
    /// `None` when any Cloudinary credential is missing; uploads are then refused.
    pub cloudinary: Option<CloudinaryConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            environment: var_or("ENVIRONMENT", "development"),
            host: var_or("HOST", "127.0.0.1"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            jwt_secret: var_or("JWT_SECRET", DEFAULT_JWT_SECRET),
            github: GithubConfig {
                client_id: var_or("GITHUB_CLIENT_ID", ""),
                client_secret: var_or("GITHUB_CLIENT_SECRET", ""),
                callback_url: var_or(
                    "GITHUB_CALLBACK_URL",
                    "http://localhost:3000/auth/github/callback",
                ),
            },
            cloudinary: cloudinary_from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Refuse to run a production server with the well-known default secret.
    pub fn check_production_secrets(&self) -> Result<(), String> {
        if self.is_production()
            && (self.jwt_secret.is_empty() || self.jwt_secret == DEFAULT_JWT_SECRET)
        {
            return Err(
                "JWT_SECRET must be set to a secure, unique value in production".to_string(),
            );
        }
        Ok(())
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        tracing::debug!("{key} not set, using default");
        default.to_string()
    })
}

fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    let cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME").ok()?;
    let api_key = std::env::var("CLOUDINARY_API_KEY").ok()?;
    let api_secret = std::env::var("CLOUDINARY_API_SECRET").ok()?;

    Some(CloudinaryConfig {
        cloud_name,
        api_key,
        api_secret,
        folder: var_or("CLOUDINARY_FOLDER", "odin-book"),
    })
}
