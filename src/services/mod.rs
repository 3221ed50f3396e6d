use sea_orm::TransactionError;

use crate::errors::ServiceError;

// Core engine services
pub mod alerts;
pub mod counts;
pub mod movements;
pub mod reconciliation;
pub mod transfers;

// Master data the engine joins against
pub mod catalog;

/// Collapses SeaORM's two-layer transaction error into the service taxonomy
pub(crate) fn flatten_txn_err(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
