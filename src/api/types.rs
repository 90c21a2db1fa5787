//! Shared state for the API layer.

use std::sync::Arc;

use crate::directory::IdentityDirectory;
use crate::service::EmergencyService;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub service: Arc<EmergencyService>,
    pub identity: Arc<dyn IdentityDirectory>,
}

impl ApiContext {
    pub fn new(service: Arc<EmergencyService>, identity: Arc<dyn IdentityDirectory>) -> Self {
        Self { service, identity }
    }
}
