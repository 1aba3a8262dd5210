use serde::{Deserialize, Serialize};
use upay_engine::{
    db_types::{Order, OrderStatusType},
    order_objects::{AdmissionOutcome, AdmissionRequest, SettlementOutcome},
};
use upg_common::Amount;

//-------------------------------------------   Create order   ---------------------------------------------------
/// A merchant's signed create-order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// The currency to be paid in, e.g. `USDT-TRC20`
    #[serde(rename = "type")]
    pub currency: String,
    pub order_id: String,
    /// The quote (fiat) amount
    pub amount: Amount,
    #[serde(default)]
    pub notify_url: String,
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default)]
    pub signature: String,
}

impl CreateOrderRequest {
    /// The fields the signature covers. The amount is signed in its compact form, so `10.00` is signed as `10`.
    pub fn signed_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("amount", self.amount.to_compact_string()),
            ("notify_url", self.notify_url.clone()),
            ("order_id", self.order_id.clone()),
            ("redirect_url", self.redirect_url.clone()),
            ("type", self.currency.clone()),
        ]
    }
}

impl From<CreateOrderRequest> for AdmissionRequest {
    fn from(value: CreateOrderRequest) -> Self {
        AdmissionRequest::new(value.order_id, value.currency, value.amount)
            .with_notify_url(value.notify_url)
            .with_redirect_url(value.redirect_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderData {
    pub trade_id: String,
    pub order_id: String,
    pub amount: Amount,
    pub actual_amount: Amount,
    /// The wallet address to pay into
    pub token: String,
    /// Unix time in milliseconds
    pub expiration_time: i64,
    pub payment_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub status_code: u16,
    pub message: String,
    pub data: CreateOrderData,
}

impl CreateOrderResponse {
    pub fn new(outcome: &AdmissionOutcome, payment_url: String) -> Self {
        let order = outcome.order();
        let message = if outcome.is_new() { "success" } else { "existing order" };
        let data = CreateOrderData {
            trade_id: order.trade_id.to_string(),
            order_id: order.order_id.to_string(),
            amount: order.amount,
            actual_amount: order.actual_amount,
            token: order.token.clone(),
            expiration_time: order.expiration_time.timestamp_millis(),
            payment_url,
        };
        Self { status_code: 200, message: message.to_string(), data }
    }
}

//-------------------------------------------   Order status   ---------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusResponse {
    pub trade_id: String,
    /// 1 = waiting for payment, 2 = paid, 3 = expired
    pub status: u8,
}

impl OrderStatusResponse {
    pub fn new(trade_id: &str, status: OrderStatusType) -> Self {
        Self { trade_id: trade_id.to_string(), status: status.code() }
    }
}

/// What a checkout page shows for an order that is waiting for payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub trade_id: String,
    pub currency: String,
    pub actual_amount: Amount,
    pub token: String,
    /// Unix time in milliseconds
    pub expiration_time: i64,
    pub redirect_url: String,
}

impl From<&Order> for CheckoutView {
    fn from(order: &Order) -> Self {
        Self {
            trade_id: order.trade_id.to_string(),
            currency: order.currency.clone(),
            actual_amount: order.actual_amount,
            token: order.token.clone(),
            expiration_time: order.expiration_time.timestamp_millis(),
            redirect_url: order.redirect_url.clone(),
        }
    }
}

//---------------------------------------------   Verify   -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub trade_id: String,
    pub status: u8,
    /// True only when this request moved the order to paid
    pub settled: bool,
    pub message: String,
}

impl VerifyResponse {
    pub fn new(trade_id: &str, outcome: &SettlementOutcome) -> Self {
        let status = match outcome {
            SettlementOutcome::NoTransfer | SettlementOutcome::Mismatch(_) => OrderStatusType::WaitPay,
            SettlementOutcome::Settled(order) => order.status,
            SettlementOutcome::MatchedButFinal { status, .. } | SettlementOutcome::AlreadyFinal(status) => *status,
        };
        Self {
            trade_id: trade_id.to_string(),
            status: status.code(),
            settled: outcome.settled_now(),
            message: outcome.to_string(),
        }
    }
}

//------------------------------------------   Notifications   ---------------------------------------------------
/// The signed callback a merchant receives once an order is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub trade_id: String,
    pub order_id: String,
    pub amount: Amount,
    pub actual_amount: Amount,
    pub token: String,
    pub block_transaction_id: String,
    pub status: u8,
    pub signature: String,
}

impl PaymentNotification {
    /// An unsigned notification for `order`.
    pub fn for_order(order: &Order) -> Self {
        Self {
            trade_id: order.trade_id.to_string(),
            order_id: order.order_id.to_string(),
            amount: order.amount,
            actual_amount: order.actual_amount,
            token: order.token.clone(),
            block_transaction_id: order.block_transaction_id.clone().unwrap_or_default(),
            status: order.status.code(),
            signature: String::default(),
        }
    }

    /// The fields the signature covers, with amounts in the form a merchant reads them back from the JSON body.
    pub fn signed_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("actual_amount", self.actual_amount.to_compact_string()),
            ("amount", self.amount.to_compact_string()),
            ("block_transaction_id", self.block_transaction_id.clone()),
            ("order_id", self.order_id.clone()),
            ("status", self.status.to_string()),
            ("token", self.token.clone()),
            ("trade_id", self.trade_id.clone()),
        ]
    }
}
