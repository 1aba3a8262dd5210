use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use upg_common::Amount;
use upay_engine::{
    db_types::OrderStatusType,
    order_objects::{AdmissionOutcome, AdmissionRequest, SettlementOutcome},
    traits::{ExplorerError, Transfer},
    AdmissionError,
    OrderManagement,
    SettlementError,
};

use crate::cucumber::GatewayWorld;

#[when(expr = "merchant order {word} for {word} {word} is admitted")]
async fn admit_order(world: &mut GatewayWorld, order_id: String, amount: String, currency: String) {
    let amount = Amount::from_str(&amount).expect("Invalid amount");
    let request = AdmissionRequest::new(order_id, currency, amount).with_notify_url("https://shop.example/notify");
    let result = world.system().admission.admit(request).await;
    world.last_admission = Some(result);
}

#[then(expr = "a new order is created for wallet {word} with amount {word}")]
async fn order_created(world: &mut GatewayWorld, token: String, amount: String) {
    let amount = Amount::from_str(&amount).expect("Invalid amount");
    match world.last_admission.as_ref().expect("Nothing was admitted") {
        Ok(AdmissionOutcome::Created(order)) => {
            assert_eq!(order.token, token, "Wrong wallet");
            assert_eq!(order.actual_amount, amount, "Wrong on-chain amount");
            assert_eq!(order.status, OrderStatusType::WaitPay);
        },
        other => panic!("Expected a new order, got {other:?}"),
    }
}

#[then(expr = "the existing order for {word} is returned")]
async fn order_existing(world: &mut GatewayWorld, order_id: String) {
    let latest = world.latest_order(&order_id).await;
    match world.last_admission.as_ref().expect("Nothing was admitted") {
        Ok(AdmissionOutcome::Existing(order)) => assert_eq!(order.trade_id, latest.trade_id),
        other => panic!("Expected the existing order, got {other:?}"),
    }
}

#[then(expr = "admission fails with {word}")]
async fn admission_fails(world: &mut GatewayWorld, kind: String) {
    let err = match world.last_admission.as_ref().expect("Nothing was admitted") {
        Err(e) => e,
        Ok(outcome) => panic!("Expected admission to fail, got {outcome:?}"),
    };
    let actual = match err {
        AdmissionError::Configuration(_) => "Configuration",
        AdmissionError::AllocationExhausted { .. } => "AllocationExhausted",
        AdmissionError::OrderAlreadySettled(_) => "OrderAlreadySettled",
        _ => "Backend",
    };
    assert_eq!(actual, kind, "Unexpected error: {err}");
}

#[when(expr = "the explorer reports a matching transfer {word} for order {word}")]
async fn matching_transfer(world: &mut GatewayWorld, hash: String, order_id: String) {
    let order = world.latest_order(&order_id).await;
    let amount = order.actual_amount;
    script_transfer(world, hash, amount, &order_id).await;
}

#[when(expr = "the explorer reports transfer {word} of {word} for order {word}")]
async fn report_transfer(world: &mut GatewayWorld, hash: String, amount: String, order_id: String) {
    let amount = Amount::from_str(&amount).expect("Invalid amount");
    script_transfer(world, hash, amount, &order_id).await;
}

async fn script_transfer(world: &mut GatewayWorld, hash: String, amount: Amount, order_id: &str) {
    let order = world.latest_order(order_id).await;
    let chain = world.system().verifier.chains().get(&order.currency).expect("Unsupported currency").clone();
    // Scale hundredths up to the chain's raw integer units
    let raw_amount = format!("{}{}", amount.cents(), "0".repeat(chain.decimals as usize - 2));
    let transfer = Transfer {
        hash,
        symbol: chain.symbol.clone(),
        recipient: order.token.clone(),
        raw_amount,
        timestamp: order.start_time.timestamp_millis() + 1,
    };
    world.system().source.set_transfer(&order.token, transfer).await;
}

#[when(expr = "the explorer is unavailable for order {word}")]
async fn explorer_down(world: &mut GatewayWorld, order_id: String) {
    let order = world.latest_order(&order_id).await;
    let error = ExplorerError::HttpStatus { status: 503, message: "Service Unavailable".into() };
    world.system().source.set_error(&order.token, error).await;
}

#[when(expr = "order {word} is verified")]
async fn verify_order(world: &mut GatewayWorld, order_id: String) {
    let order = world.latest_order(&order_id).await;
    let result = world.system().verifier.verify_trade(&order.trade_id).await;
    world.last_settlement = Some(result);
}

#[when("all pending orders are verified")]
async fn verify_pending(world: &mut GatewayWorld) {
    world.system().verifier.verify_pending().await.expect("Error verifying pending orders");
}

#[then(expr = "verification reports {word}")]
async fn verification_reports(world: &mut GatewayWorld, kind: String) {
    let result = world.last_settlement.as_ref().expect("Nothing was verified");
    let actual = match result {
        Ok(SettlementOutcome::NoTransfer) => "NoTransfer",
        Ok(SettlementOutcome::Mismatch(_)) => "Mismatch",
        Ok(SettlementOutcome::Settled(_)) => "Settled",
        Ok(SettlementOutcome::MatchedButFinal { .. }) => "MatchedButFinal",
        Ok(SettlementOutcome::AlreadyFinal(_)) => "AlreadyFinal",
        Err(SettlementError::Explorer(_)) => "ExplorerError",
        Err(_) => "Error",
    };
    assert_eq!(actual, kind, "Unexpected verification result: {result:?}");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut GatewayWorld, ms: u64) {
    let delay = Duration::from_millis(ms);
    tokio::time::sleep(delay).await;
}

#[then(expr = "order {word} has status {word}")]
async fn order_status(world: &mut GatewayWorld, order_id: String, status: String) {
    let order = world.latest_order(&order_id).await;
    let expected = OrderStatusType::from_str(&status).expect("Invalid status");
    assert_eq!(order.status, expected, "Status is incorrect");
}

#[then(expr = "order {word} was paid by transaction {word}")]
async fn order_paid_by(world: &mut GatewayWorld, order_id: String, hash: String) {
    let order = world.latest_order(&order_id).await;
    assert_eq!(order.status, OrderStatusType::PaySuccess);
    assert_eq!(order.block_transaction_id.as_deref(), Some(hash.as_str()));
}

#[then(expr = "merchant order {word} has {int} orders")]
async fn order_count(world: &mut GatewayWorld, order_id: String, count: usize) {
    let db = &world.system().db;
    let mut all = Vec::new();
    for status in [OrderStatusType::WaitPay, OrderStatusType::PaySuccess, OrderStatusType::Expired] {
        all.extend(db.fetch_orders_by_status(status).await.expect("Error fetching orders"));
    }
    let n = all.iter().filter(|o| o.order_id.as_str() == order_id).count();
    assert_eq!(n, count, "Wrong number of orders for {order_id}");
}

#[then(expr = "{int} orders are waiting for payment")]
async fn waiting_orders(world: &mut GatewayWorld, count: usize) {
    let pending = world.system().db.fetch_orders_by_status(OrderStatusType::WaitPay).await.expect("Error");
    assert_eq!(pending.len(), count);
}

#[then(expr = "the expiry for order {word} is scheduled")]
async fn expiry_scheduled(world: &mut GatewayWorld, order_id: String) {
    let order = world.latest_order(&order_id).await;
    assert!(world.system().scheduler.is_scheduled(&order.trade_id).await);
}
