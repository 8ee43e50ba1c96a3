use std::sync::Arc;

use stockroom_infra::store;
use stockroom_infra::{
    ApprovalWorkflow, InMemoryItemStore, InMemoryRequestStore, ItemStore, RequestStore,
};

use crate::config::Config;

/// Shared application services, injected into handlers via `Extension`.
pub struct AppServices {
    pub items: Arc<dyn ItemStore>,
    pub requests: Arc<dyn RequestStore>,
    pub workflow: ApprovalWorkflow,
}

impl AppServices {
    /// In-memory wiring with the given approval mode. Used by tests and the
    /// no-DATABASE_URL dev setup.
    pub fn in_memory(mode: stockroom_infra::ApplyMode) -> Self {
        let items: Arc<dyn ItemStore> = Arc::new(InMemoryItemStore::new());
        let requests: Arc<dyn RequestStore> = Arc::new(InMemoryRequestStore::new());
        let workflow = ApprovalWorkflow::new(items.clone(), requests.clone(), mode);
        Self {
            items,
            requests,
            workflow,
        }
    }
}

/// Wire stores and the workflow from configuration.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let (items, requests) = store::connect(url).await?;
            let items: Arc<dyn ItemStore> = Arc::new(items);
            let requests: Arc<dyn RequestStore> = Arc::new(requests);
            let workflow =
                ApprovalWorkflow::new(items.clone(), requests.clone(), config.approval_mode);
            Ok(AppServices {
                items,
                requests,
                workflow,
            })
        }
        None => Ok(AppServices::in_memory(config.approval_mode)),
    }
}
