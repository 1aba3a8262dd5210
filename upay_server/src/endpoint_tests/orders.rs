use std::str::FromStr;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Duration;
use upay_engine::{
    chains::ChainRegistry,
    db_types::{now_millis, ExchangeRate, OrderStatusType, WalletAddress, WalletStatus},
    events::EventProducers,
    memory::MemoryReservationStore,
    traits::{ExplorerError, Transfer},
    OrderAdmissionApi,
    OrderQueryApi,
    SettlementVerifier,
};
use upg_common::Amount;

use super::{
    helpers::{
        get_request,
        post_request,
        sample_order,
        send_request,
        server_options,
        signed_order_request,
        stored_order,
        TEST_TRADE_ID,
    },
    mocks::{MockDatabase, MockExplorer, MockScheduler},
};
use crate::{
    data_objects::{CheckoutView, CreateOrderResponse, OrderStatusResponse, VerifyResponse},
    routes::{CheckStatusRoute, CreateOrderRoute, OrderViewRoute, VerifyOrderRoute},
};

fn wallet() -> WalletAddress {
    WalletAddress {
        id: 1,
        currency: "USDT-TRC20".into(),
        token: "TXo4VDm8Qc5YBSjPhu8pMaxzbApXCH2CWd".into(),
        status: WalletStatus::Enabled,
        rate: ExchangeRate::from_str("2").unwrap(),
    }
}

fn admission_config(db: MockDatabase, scheduler: MockScheduler) -> impl FnOnce(&mut ServiceConfig) {
    let api = OrderAdmissionApi::new(db, MemoryReservationStore::new(), scheduler, EventProducers::default())
        .with_validity(Duration::minutes(10));
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(server_options()))
            .app_data(web::Data::new(api))
            .service(CreateOrderRoute::<MockDatabase, MemoryReservationStore, MockScheduler>::new());
    }
}

fn query_config(db: MockDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderQueryApi::new(db)))
            .service(CheckStatusRoute::<MockDatabase>::new())
            .service(OrderViewRoute::<MockDatabase>::new());
    }
}

fn verify_config(db: MockDatabase, explorer: MockExplorer) -> impl FnOnce(&mut ServiceConfig) {
    let verifier = SettlementVerifier::new(db, explorer, ChainRegistry::builtin(), EventProducers::default());
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(verifier)).service(VerifyOrderRoute::<MockDatabase, MockExplorer>::new());
    }
}

//--------------------------------------------   Create order  -------------------------------------------------
#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_order_id().times(1).returning(|_| Ok(None));
    db.expect_fetch_enabled_wallets().times(1).returning(|_| Ok(vec![wallet()]));
    db.expect_insert_order().times(1).returning(|order| Ok(stored_order(order)));
    let mut scheduler = MockScheduler::new();
    scheduler.expect_schedule_expiry().times(1).returning(|_, _| Ok(()));

    let request = signed_order_request("INV-1001", "USDT-TRC20", Amount::from_cents(1000));
    let (status, body) = post_request("/api/create_order", &request, admission_config(db, scheduler)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CreateOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.message, "success");
    assert_eq!(response.data.order_id, "INV-1001");
    assert_eq!(response.data.amount, Amount::from_cents(1000));
    assert_eq!(response.data.actual_amount, Amount::from_cents(500));
    assert_eq!(response.data.token, "TXo4VDm8Qc5YBSjPhu8pMaxzbApXCH2CWd");
    assert_eq!(response.data.trade_id.len(), 18);
    assert_eq!(
        response.data.payment_url,
        format!("https://pay.example.com/pay/checkout-counter/{}", response.data.trade_id)
    );
}

#[actix_web::test]
async fn create_order_with_a_bad_signature() {
    let _ = env_logger::try_init().ok();
    let mut request = signed_order_request("INV-1001", "USDT-TRC20", Amount::from_cents(1000));
    request.amount = Amount::from_cents(100);
    let config = admission_config(MockDatabase::new(), MockScheduler::new());
    let (status, body) = post_request("/api/create_order", &request, config).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"The request signature is missing or invalid"}"#);
}

#[actix_web::test]
async fn create_order_without_wallets() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_order_id().returning(|_| Ok(None));
    db.expect_fetch_enabled_wallets().returning(|_| Ok(vec![]));
    db.expect_insert_order().never();

    let request = signed_order_request("INV-1001", "USDT-BSC", Amount::from_cents(1000));
    let (status, body) = post_request("/api/create_order", &request, admission_config(db, MockScheduler::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("There are no enabled wallets for USDT-BSC"), "{body}");
}

#[actix_web::test]
async fn create_order_that_was_already_paid() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_order_id().returning(|_| Ok(Some(sample_order(OrderStatusType::PaySuccess))));
    db.expect_fetch_enabled_wallets().never();

    let request = signed_order_request("INV-1001", "USDT-TRC20", Amount::from_cents(1000));
    let (status, body) = post_request("/api/create_order", &request, admission_config(db, MockScheduler::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order INV-1001 has already been paid"}"#);
}

#[actix_web::test]
async fn resubmitting_a_live_order_extends_it() {
    let _ = env_logger::try_init().ok();
    let mut live = sample_order(OrderStatusType::WaitPay);
    live.start_time = now_millis() - Duration::minutes(1);
    live.expiration_time = live.start_time + Duration::minutes(10);
    let existing = live.clone();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_order_id().times(1).returning(move |_| Ok(Some(existing.clone())));
    db.expect_update_order_if_status().times(1).returning(move |_, expected, update| {
        assert_eq!(expected, OrderStatusType::WaitPay);
        let mut extended = live.clone();
        extended.expiration_time = update.expiration_time.unwrap();
        Ok(Some(extended))
    });
    db.expect_fetch_enabled_wallets().never();
    db.expect_insert_order().never();
    let mut scheduler = MockScheduler::new();
    scheduler.expect_cancel_expiry().never();
    scheduler.expect_schedule_expiry().times(1).returning(|_, _| Ok(()));

    let request = signed_order_request("INV-1001", "USDT-TRC20", Amount::from_cents(1000));
    let (status, body) = post_request("/api/create_order", &request, admission_config(db, scheduler)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CreateOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.message, "existing order");
    assert_eq!(response.data.trade_id, TEST_TRADE_ID);
    assert_eq!(response.data.actual_amount, Amount::from_cents(143));
}

#[actix_web::test]
async fn resubmitting_an_overdue_order_replaces_it() {
    let _ = env_logger::try_init().ok();
    // The stored order's window closed long ago, but its expiry has not run yet
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_order_id().times(1).returning(|_| Ok(Some(sample_order(OrderStatusType::WaitPay))));
    db.expect_update_order_if_status().times(1).returning(|trade_id, expected, update| {
        assert_eq!(trade_id.as_str(), TEST_TRADE_ID);
        assert_eq!(expected, OrderStatusType::WaitPay);
        assert_eq!(update.status, Some(OrderStatusType::Expired));
        Ok(Some(sample_order(OrderStatusType::Expired)))
    });
    db.expect_fetch_enabled_wallets().times(1).returning(|_| Ok(vec![wallet()]));
    db.expect_insert_order().times(1).returning(|order| Ok(stored_order(order)));
    let mut scheduler = MockScheduler::new();
    scheduler.expect_cancel_expiry().times(1).returning(|_| Ok(true));
    scheduler.expect_schedule_expiry().times(1).returning(|_, _| Ok(()));

    let request = signed_order_request("INV-1001", "USDT-TRC20", Amount::from_cents(1000));
    let (status, body) = post_request("/api/create_order", &request, admission_config(db, scheduler)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: CreateOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.message, "success");
    assert_ne!(response.data.trade_id, TEST_TRADE_ID);
}

//--------------------------------------------   Order status  -------------------------------------------------
#[actix_web::test]
async fn check_status() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().returning(|_| Ok(Some(sample_order(OrderStatusType::PaySuccess))));
    let path = format!("/pay/check-status/{TEST_TRADE_ID}");
    let (status, body) = get_request(&path, query_config(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"trade_id":"202406011200001234","status":2}"#);
    let response: OrderStatusResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, OrderStatusType::PaySuccess.code());
}

#[actix_web::test]
async fn check_status_of_an_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().returning(|_| Ok(None));
    let (status, body) = get_request("/pay/check-status/nope", query_config(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order nope does not exist"}"#);
}

#[actix_web::test]
async fn checkout_view() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().returning(|_| Ok(Some(sample_order(OrderStatusType::WaitPay))));
    let path = format!("/pay/order/{TEST_TRADE_ID}");
    let (status, body) = get_request(&path, query_config(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""tradeId":"202406011200001234""#), "{body}");
    let view: CheckoutView = serde_json::from_str(&body).unwrap();
    assert_eq!(view.actual_amount, Amount::from_cents(143));
    assert_eq!(view.currency, "USDT-TRC20");
    assert_eq!(view.redirect_url, "https://shop.example.com/thanks");
}

#[actix_web::test]
async fn checkout_view_of_an_expired_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().returning(|_| Ok(Some(sample_order(OrderStatusType::Expired))));
    let path = format!("/pay/order/{TEST_TRADE_ID}");
    let (status, _) = get_request(&path, query_config(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//----------------------------------------------   Verify  -----------------------------------------------------
fn matching_transfer() -> Transfer {
    let order = sample_order(OrderStatusType::WaitPay);
    Transfer {
        hash: "b3e5f0a4c2d1".into(),
        symbol: "USDT".into(),
        recipient: order.token.clone(),
        raw_amount: "1430000".into(),
        timestamp: order.start_time.timestamp_millis() + 60_000,
    }
}

#[actix_web::test]
async fn verify_settles_a_matching_transfer() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().times(1).returning(|_| Ok(Some(sample_order(OrderStatusType::WaitPay))));
    db.expect_update_order_if_status().times(1).returning(|_, _, update| {
        let mut paid = sample_order(OrderStatusType::PaySuccess);
        paid.block_transaction_id = update.block_transaction_id;
        Ok(Some(paid))
    });
    let mut explorer = MockExplorer::new();
    explorer.expect_latest_transfer_to().times(1).returning(|chain, query| {
        assert_eq!(chain.currency, "USDT-TRC20");
        assert_eq!(query.address, "TXo4VDm8Qc5YBSjPhu8pMaxzbApXCH2CWd");
        Ok(Some(matching_transfer()))
    });

    let path = format!("/pay/verify/{TEST_TRADE_ID}");
    let (status, body) = send_request(TestRequest::post().uri(&path), verify_config(db, explorer)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let response: VerifyResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.trade_id, TEST_TRADE_ID);
    assert_eq!(response.status, 2);
    assert!(response.settled);
}

#[actix_web::test]
async fn verify_without_a_transfer() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().returning(|_| Ok(Some(sample_order(OrderStatusType::WaitPay))));
    db.expect_update_order_if_status().never();
    let mut explorer = MockExplorer::new();
    explorer.expect_latest_transfer_to().returning(|_, _| Ok(None));

    let path = format!("/pay/verify/{TEST_TRADE_ID}");
    let (status, body) = send_request(TestRequest::post().uri(&path), verify_config(db, explorer)).await;
    assert_eq!(status, StatusCode::OK);
    let response: VerifyResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, 1);
    assert!(!response.settled);
}

#[actix_web::test]
async fn verify_when_the_explorer_is_down() {
    let _ = env_logger::try_init().ok();
    let mut db = MockDatabase::new();
    db.expect_fetch_order_by_trade_id().returning(|_| Ok(Some(sample_order(OrderStatusType::WaitPay))));
    db.expect_update_order_if_status().never();
    let mut explorer = MockExplorer::new();
    explorer.expect_latest_transfer_to().returning(|_, _| Err(ExplorerError::Timeout));

    let path = format!("/pay/verify/{TEST_TRADE_ID}");
    let (status, body) = send_request(TestRequest::post().uri(&path), verify_config(db, explorer)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.starts_with(r#"{"error":"The block explorer is unavailable."#), "{body}");
}
