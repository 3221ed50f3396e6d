use std::sync::Arc;

use larder_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::{item, store},
    events::{Event, EventSender},
    handlers::AppServices,
    services::catalog::NewItem,
    tenant::TenantContext,
    AppState,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Helper harness backed by an in-memory SQLite database. Each instance is
/// a fresh schema and a fresh tenant. The event receiver is kept open so
/// tests can assert on emitted events.
pub struct TestApp {
    pub state: AppState,
    pub ctx: TenantContext,
    pub events: mpsc::Receiver<Event>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db_arc = Arc::new(pool);

        let (tx, rx) = mpsc::channel(256);
        let event_sender = EventSender::new(tx);

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));

        let config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let state = AppState {
            db: db_arc,
            config,
            event_sender,
            services,
        };

        let ctx = TenantContext::new(Uuid::new_v4(), Uuid::new_v4());

        Self {
            state,
            ctx,
            events: rx,
        }
    }

    /// A second identity under a different account, for tenancy tests
    pub fn other_tenant(&self) -> TenantContext {
        TenantContext::new(Uuid::new_v4(), Uuid::new_v4())
    }

    pub async fn seed_store(&self, name: &str) -> store::Model {
        self.state
            .services
            .catalog
            .create_store(&self.ctx, name.to_string())
            .await
            .expect("failed to seed store")
    }

    pub async fn seed_item(&self, name: &str, cost_price: Decimal) -> item::Model {
        self.seed_item_with_thresholds(name, cost_price, None, None)
            .await
    }

    pub async fn seed_item_with_thresholds(
        &self,
        name: &str,
        cost_price: Decimal,
        min_stock_level: Option<Decimal>,
        max_stock_level: Option<Decimal>,
    ) -> item::Model {
        self.state
            .services
            .catalog
            .create_item(
                &self.ctx,
                NewItem {
                    name: name.to_string(),
                    unit: "kg".to_string(),
                    category: None,
                    cost_price,
                    min_stock_level,
                    max_stock_level,
                },
            )
            .await
            .expect("failed to seed item")
    }

    /// Drains events received so far without blocking
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut collected = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            collected.push(event);
        }
        collected
    }
}
