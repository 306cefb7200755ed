// Shared server state handed to every route

use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::chat::ChatService;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<dyn AuthProvider>,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(config: AppConfig, auth: Arc<dyn AuthProvider>, chat: ChatService) -> Self {
        Self {
            config: Arc::new(config),
            auth,
            chat,
        }
    }
}
