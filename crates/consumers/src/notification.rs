//! The failure-notification dispatcher, consuming unsuccessful
//! transactions.

use async_trait::async_trait;
use broker::{HandlerVerdict, MessageHandler};
use directory::{Notice, Notifier};
use orchestrator::TransactionEvent;

/// Emails the buyer when their payment was declined.
pub struct NotificationConsumer<N: Notifier> {
    notifier: N,
}

impl<N: Notifier> NotificationConsumer<N> {
    /// Creates a consumer over the given notifier.
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl<N: Notifier> MessageHandler for NotificationConsumer<N> {
    async fn handle(&self, body: &[u8]) -> HandlerVerdict {
        let event: TransactionEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(err) => return HandlerVerdict::Rejected(format!("malformed event: {err}")),
        };

        if event.order_id.is_empty() {
            return HandlerVerdict::Rejected("missing orderID".to_string());
        }
        if event.user_email.is_empty() {
            return HandlerVerdict::Rejected("missing userEmail".to_string());
        }

        let notice = Notice::PaymentFailed {
            user_email: event.user_email.clone(),
            order_id: event.order_id.clone(),
            product_name: event.product_name.clone(),
        };
        match self.notifier.send(notice).await {
            Ok(()) => {
                metrics::counter!("failure_notifications_sent").increment(1);
                tracing::info!(order_id = %event.order_id, "payment-failure email sent");
                HandlerVerdict::Processed
            }
            Err(err) => HandlerVerdict::Failed(err.to_string()),
        }
    }
}
