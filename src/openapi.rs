use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities;
use crate::errors::ErrorResponse;
use crate::handlers;
use crate::services::{alerts, movements};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Larder API",
        description = r#"
# Larder Inventory API

Movement-ledger based inventory tracking for multi-location restaurant
operations.

## Concepts

- **Movements**: every stock change is one signed, append-only ledger event.
- **Stock**: current quantities and values are derived by summing movements.
- **Alerts**: low/over-stock signals derived from per-item thresholds.
- **Transfers**: inter-store moves producing paired OUT/IN movements.
- **Counts**: physical stocktakes reconciled against the ledger on approval,
  emitting compensating adjustment movements.

## Tenancy

All endpoints are tenant-scoped. Upstream authentication injects the caller
identity as headers:

```
X-Account-Id: <tenant uuid>
X-User-Id: <user uuid>
```
        "#,
        contact(
            name = "Larder Systems",
            email = "support@larder.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "stock", description = "Derived stock levels and alerts"),
        (name = "movements", description = "Append-only movement ledger"),
        (name = "counts", description = "Physical counts and reconciliation"),
        (name = "transfers", description = "Inter-store transfers"),
        (name = "catalog", description = "Item and store master data"),
        (name = "health", description = "Service health")
    ),
    paths(
        handlers::stock::current_stock,
        handlers::stock::alerts,
        handlers::movements::record_movement,
        handlers::movements::list_movements,
        handlers::movements::correct_movement,
        handlers::counts::start_count,
        handlers::counts::list_counts,
        handlers::counts::get_count,
        handlers::counts::add_entry,
        handlers::counts::update_entry,
        handlers::counts::delete_entry,
        handlers::counts::complete_count,
        handlers::counts::approve_count,
        handlers::transfers::create_transfer,
        handlers::transfers::list_transfers,
        handlers::transfers::get_transfer,
        handlers::transfers::mark_in_transit,
        handlers::transfers::complete_transfer,
        handlers::transfers::cancel_transfer,
        handlers::transfers::delete_transfer,
        handlers::catalog::create_item,
        handlers::catalog::update_item,
        handlers::catalog::list_items,
        handlers::catalog::create_store,
        handlers::catalog::list_stores,
        handlers::health::health,
    ),
    components(schemas(
        ErrorResponse,
        entities::stock_movement::MovementType,
        entities::stock_movement::ReferenceType,
        entities::stock_count::CountStatus,
        entities::transfer::TransferStatus,
        movements::StockLevel,
        alerts::AlertType,
        alerts::AlertSeverity,
        alerts::StockAlert,
        handlers::movements::RecordMovementRequest,
        handlers::movements::CorrectMovementRequest,
        handlers::counts::StartCountRequest,
        handlers::counts::AddEntryRequest,
        handlers::counts::UpdateEntryRequest,
        handlers::counts::CompleteCountRequest,
        handlers::counts::ApproveCountRequest,
        handlers::transfers::CreateTransferRequest,
        handlers::transfers::TransferItemRequest,
        handlers::catalog::CreateItemRequest,
        handlers::catalog::UpdateItemRequest,
        handlers::catalog::CreateStoreRequest,
    ))
)]
pub struct ApiDoc;

/// Swagger UI router, served at /docs
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
