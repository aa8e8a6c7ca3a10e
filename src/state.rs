use std::sync::Arc;

use crate::assistant::AssistantInvoker;
use crate::config::Config;
use crate::inventory::{InventoryStore, PostgresInventoryStore};
use crate::python_service::PythonAssistant;

/// Read-only handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub inventory: Arc<dyn InventoryStore>,
    pub assistant: Arc<dyn AssistantInvoker>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let assistant = Arc::new(PythonAssistant::from_config(&config.assistant)?);
        let inventory = Arc::new(PostgresInventoryStore::connect_lazy(
            &config.database.url,
            config.database.max_connections,
        )?);

        Ok(Self::with_services(config, inventory, assistant))
    }

    pub fn with_services(
        config: Config,
        inventory: Arc<dyn InventoryStore>,
        assistant: Arc<dyn AssistantInvoker>,
    ) -> Self {
        Self {
            config,
            inventory,
            assistant,
        }
    }
}
