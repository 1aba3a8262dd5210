//! Payment notifications to merchants.
//!
//! When an order is paid, the merchant's `notify_url` receives a signed JSON [`PaymentNotification`]. Delivery is
//! best-effort: a bounded number of attempts with a doubling pause between them. The outcome is logged and never
//! feeds back into the order.
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use upay_engine::{db_types::Order, events::OrderPaidEvent};

use crate::{data_objects::PaymentNotification, errors::ServerError, helpers::RequestSigner};

const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);
const FIRST_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct MerchantNotifier {
    client: Arc<Client>,
    signer: RequestSigner,
    attempts: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for MerchantNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantNotifier (attempts: {})", self.attempts)
    }
}

impl MerchantNotifier {
    pub fn new(signer: RequestSigner, attempts: u32) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(DEFAULT_NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create the notification client. {e}")))?;
        Ok(Self { client: Arc::new(client), signer, attempts: attempts.max(1), retry_delay: FIRST_RETRY_DELAY })
    }

    /// Sets the pause before the first retry. Each further retry waits twice as long as the one before.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn signed_notification(&self, order: &Order) -> Result<PaymentNotification, ServerError> {
        let mut notification = PaymentNotification::for_order(order);
        notification.signature = self.signer.sign(&notification.signed_params())?;
        Ok(notification)
    }

    /// Delivers the payment notification for `order`. Returns true if the merchant acknowledged it with a 2xx reply.
    pub async fn notify(&self, order: &Order) -> bool {
        if order.notify_url.is_empty() {
            debug!("💻️ Order {} has no notify url. Skipping the merchant notification.", order.trade_id);
            return false;
        }
        let notification = match self.signed_notification(order) {
            Ok(n) => n,
            Err(e) => {
                error!("💻️ Could not sign the notification for order {}. {e}", order.trade_id);
                return false;
            },
        };
        let mut delay = self.retry_delay;
        for attempt in 1..=self.attempts {
            match self.client.post(&order.notify_url).json(&notification).send().await {
                Ok(res) if res.status().is_success() => {
                    info!("💻️ Merchant acknowledged payment of order {} on attempt {attempt}", order.trade_id);
                    return true;
                },
                Ok(res) => warn!(
                    "💻️ Merchant notification for {} returned HTTP {} (attempt {attempt}/{})",
                    order.trade_id,
                    res.status(),
                    self.attempts
                ),
                Err(e) => warn!(
                    "💻️ Merchant notification for {} failed (attempt {attempt}/{}). {e}",
                    order.trade_id, self.attempts
                ),
            }
            if attempt < self.attempts {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        error!("💻️ Giving up on the payment notification for order {} to {}", order.trade_id, order.notify_url);
        false
    }
}

/// The `on_order_paid` hook that notifies merchants.
pub fn merchant_notify_hook(
    notifier: MerchantNotifier,
) -> impl Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
    move |ev: OrderPaidEvent| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let notifier = notifier.clone();
        Box::pin(async move {
            notifier.notify(&ev.order).await;
        })
    }
}
