//! Shared handler state.

use std::sync::Arc;

use weather_core::Dashboard;

#[derive(Clone, Debug)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
        }
    }
}
