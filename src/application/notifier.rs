use crate::domain::ports::NotifierBox;
use crate::domain::settlement::SettlementNotice;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Hands settlement notices to a background worker so the request that
/// settled a payment never waits on the order service.
///
/// Delivery is at-most-once: a failed notification is logged and dropped.
#[derive(Clone)]
pub struct SettlementDispatcher {
    sender: mpsc::UnboundedSender<SettlementNotice>,
}

impl SettlementDispatcher {
    /// Starts the worker. It runs until every dispatcher clone is dropped.
    pub fn spawn(notifier: NotifierBox) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<SettlementNotice>();

        let worker = tokio::spawn(async move {
            while let Some(notice) = receiver.recv().await {
                match notifier.on_payment_settled(&notice).await {
                    Ok(()) => info!(
                        order_id = notice.order_id,
                        reference = %notice.payment_reference,
                        outcome = ?notice.outcome,
                        "order service notified"
                    ),
                    Err(e) => warn!(
                        order_id = notice.order_id,
                        reference = %notice.payment_reference,
                        error = %e,
                        "settlement notification failed"
                    ),
                }
            }
        });

        (Self { sender }, worker)
    }

    pub fn dispatch(&self, notice: SettlementNotice) {
        if let Err(e) = self.sender.send(notice) {
            warn!(reference = %e.0.payment_reference, "notification worker stopped, notice dropped");
        }
    }
}
