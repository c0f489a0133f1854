use std::sync::Arc;

use crate::auth::email_password::EmailPasswordProvider;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Shared with the auth middleware stage, which owns the provider routes;
    /// app routes only use it to resolve the current user.
    pub provider: Arc<EmailPasswordProvider>,
}
