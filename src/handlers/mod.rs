pub mod catalog;
pub mod counts;
pub mod health;
pub mod movements;
pub mod stock;
pub mod transfers;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    alerts::AlertService, catalog::CatalogService, counts::CountService,
    movements::MovementService, reconciliation::ReconciliationService, transfers::TransferService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub movements: MovementService,
    pub alerts: AlertService,
    pub transfers: TransferService,
    pub counts: CountService,
    pub reconciliation: ReconciliationService,
    pub catalog: CatalogService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            movements: MovementService::new(db_pool.clone(), event_sender.clone()),
            alerts: AlertService::new(db_pool.clone(), event_sender.clone()),
            transfers: TransferService::new(db_pool.clone(), event_sender.clone()),
            counts: CountService::new(db_pool.clone(), event_sender.clone()),
            reconciliation: ReconciliationService::new(db_pool.clone(), event_sender),
            catalog: CatalogService::new(db_pool),
        }
    }
}
