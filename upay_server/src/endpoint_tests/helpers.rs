use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{Duration, TimeZone, Utc};
use log::debug;
use serde::Serialize;
use upay_engine::db_types::{NewOrder, Order, OrderId, OrderStatusType, TradeId};
use upg_common::{Amount, Secret};

use crate::{
    config::ServerOptions,
    data_objects::CreateOrderRequest,
    helpers::{RequestSigner, SignatureScheme},
};

pub const TEST_SECRET: &str = "merchant-test-secret";
pub const TEST_TRADE_ID: &str = "202406011200001234";

pub fn server_options() -> ServerOptions {
    let signer = RequestSigner::new(SignatureScheme::Md5, Secret::new(TEST_SECRET.to_string()));
    ServerOptions { app_url: "https://pay.example.com".into(), signer }
}

pub async fn get_request<F>(path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), configure).await
}

pub async fn post_request<T, F>(path: &str, body: &T, configure: F) -> (StatusCode, String)
where
    T: Serialize,
    F: FnOnce(&mut ServiceConfig),
{
    send_request(TestRequest::post().uri(path).set_json(body), configure).await
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// A create-order request signed with [`TEST_SECRET`].
pub fn signed_order_request(order_id: &str, currency: &str, amount: Amount) -> CreateOrderRequest {
    let mut request = CreateOrderRequest {
        currency: currency.to_string(),
        order_id: order_id.to_string(),
        amount,
        notify_url: "https://shop.example.com/notify".into(),
        redirect_url: "https://shop.example.com/thanks".into(),
        signature: String::default(),
    };
    request.signature = server_options().signer.sign(&request.signed_params()).unwrap();
    request
}

/// What the store hands back for an insert: the new order with an id and timestamps.
pub fn stored_order(new_order: NewOrder) -> Order {
    Order {
        id: 1,
        trade_id: new_order.trade_id,
        order_id: new_order.order_id,
        currency: new_order.currency,
        token: new_order.token,
        amount: new_order.amount,
        actual_amount: new_order.actual_amount,
        status: OrderStatusType::WaitPay,
        block_transaction_id: None,
        start_time: new_order.start_time,
        expiration_time: new_order.expiration_time,
        notify_url: new_order.notify_url,
        redirect_url: new_order.redirect_url,
        created_at: new_order.start_time,
        updated_at: new_order.start_time,
    }
}

/// A 10.00 order on USDT-TRC20 that opened at 2024-06-01 12:00 UTC and is paid with 1.43 USDT.
pub fn sample_order(status: OrderStatusType) -> Order {
    let start_time = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        id: 7,
        trade_id: TradeId::from(TEST_TRADE_ID),
        order_id: OrderId::from("INV-1001"),
        currency: "USDT-TRC20".into(),
        token: "TXo4VDm8Qc5YBSjPhu8pMaxzbApXCH2CWd".into(),
        amount: Amount::from_cents(1000),
        actual_amount: Amount::from_cents(143),
        status,
        block_transaction_id: None,
        start_time,
        expiration_time: start_time + Duration::minutes(10),
        notify_url: "https://shop.example.com/notify".into(),
        redirect_url: "https://shop.example.com/thanks".into(),
        created_at: start_time,
        updated_at: start_time,
    }
}
