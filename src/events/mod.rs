use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::stock_movement::MovementType;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// The events the engine emits. Delivery beyond this process (email, chat,
// push) is the notification collaborator's concern; it consumes this stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ledger events
    MovementRecorded {
        movement_id: Uuid,
        item_id: Uuid,
        store_id: Uuid,
        movement_type: MovementType,
        quantity: Decimal,
    },
    MovementCorrected {
        original_id: Uuid,
        correction_id: Uuid,
    },

    // Transfer events
    TransferCreated(Uuid),
    TransferInTransit(Uuid),
    TransferCancelled(Uuid),
    TransferDeleted(Uuid),
    TransferCompleted {
        transfer_id: Uuid,
        from_store_id: Uuid,
        to_store_id: Uuid,
        line_count: usize,
    },

    // Count events
    CountStarted(Uuid),
    CountCompleted {
        count_id: Uuid,
        items_counted: i32,
        total_value: Decimal,
    },
    CountApproved {
        count_id: Uuid,
        approved_by: Uuid,
        approved_at: DateTime<Utc>,
    },

    // Reconciliation discrepancy summary, emitted once per approval that
    // produced at least one adjustment
    DiscrepancyDetected {
        count_id: Uuid,
        shortages: u32,
        surpluses: u32,
        total_discrepancy_value: Decimal,
    },
}

/// Consumes the event stream. Everything is logged; discrepancy summaries
/// are additionally handed to the notification sink.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::DiscrepancyDetected {
                count_id,
                shortages,
                surpluses,
                total_discrepancy_value,
            } => {
                warn!(
                    count_id = %count_id,
                    shortages,
                    surpluses,
                    total_discrepancy_value = %total_discrepancy_value,
                    "Count approval produced stock adjustments"
                );
            }
            other => {
                info!(event = ?other, "Event received");
            }
        }
    }

    info!("Event processing loop terminated");
}
