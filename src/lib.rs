pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod logger;
pub mod service;
pub mod state;
pub mod storage;

use std::sync::Arc;

use config::Config;
use error::Result;
use service::{ApplicationService, ListingService};
use state::LoggingHook;
use storage::{ApplicationStore, FileStorage, MemoryStorage};

/// Wire the services over a store chosen from config.
///
/// `in_memory` skips the snapshot file entirely.
pub fn build_services(config: &Config, in_memory: bool) -> Result<(ApplicationService, ListingService)> {
    let store: Arc<dyn ApplicationStore> = if in_memory {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(FileStorage::open(config)?)
    };

    let applications = ApplicationService::new(store.clone())
        .with_hook(Arc::new(LoggingHook))
        .with_max_attempts(config.get_transition_attempts());
    let listing = ListingService::new(store);
    Ok((applications, listing))
}
