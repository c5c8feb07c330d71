use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Domain events emitted after successful state changes. Delivery is
/// best-effort and never sits on the failure path of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CatererCreated(Uuid),
    CatererUpdated(Uuid),
    CatererDeleted(Uuid),
    SaleCreated {
        sale_id: Uuid,
        caterer_id: Uuid,
    },
    SaleStatusOverridden {
        sale_id: Uuid,
        status: String,
    },
    PaymentRecorded {
        payment_id: Uuid,
        sale_id: Uuid,
        caterer_id: Uuid,
    },
    SummaryRecomputed(Uuid),
    ProductCreated(Uuid),
    BatchReceived {
        batch_id: Uuid,
        product_id: Uuid,
    },
    BatchAdjusted {
        batch_id: Uuid,
        delta: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging on a full or closed channel rather than
    /// failing the operation that produced it.
    pub async fn send(&self, event: Event) {
        if let Err(err) = self.sender.send(event).await {
            warn!(error = %err, "event channel closed, dropping event");
        }
    }
}

/// Drains the event channel. Currently events are only logged; this is the
/// seam where webhook or outbox delivery would attach.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        debug!(?event, "domain event");
    }
}

/// Builds a connected sender/processor pair with the given channel depth.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
