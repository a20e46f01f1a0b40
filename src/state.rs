use std::sync::Arc;

use crate::{auth::github::IdentityProvider, config::AppConfig, store::Store, upload::MediaStorage};

/// Shared handles every handler can reach through `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        media: Arc<dyn MediaStorage>,
        identity: Arc<dyn IdentityProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            media,
            identity,
            config: Arc::new(config),
        }
    }
}
