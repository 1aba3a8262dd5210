use std::str::FromStr;

use chrono::Duration;
use cucumber::given;
use upay_engine::{
    db_types::{ExchangeRate, NewWalletAddress},
    WalletManagement,
};

use crate::cucumber::{gateway_world::GatewaySystem, GatewayWorld};

#[given("a fresh gateway")]
async fn fresh_gateway(world: &mut GatewayWorld) {
    let system = GatewaySystem::new().await;
    world.system = Some(system);
}

#[given(expr = "an order validity of {int}ms")]
async fn order_validity(world: &mut GatewayWorld, ms: i64) {
    world.system_mut().set_validity(Duration::milliseconds(ms));
}

#[given(expr = "wallet {word} for {word} at a rate of {word}")]
async fn add_wallet(world: &mut GatewayWorld, token: String, currency: String, rate: String) {
    let rate = ExchangeRate::from_str(&rate).expect("Invalid rate");
    let wallet = NewWalletAddress::enabled(currency, token, rate);
    world.system().db.insert_wallet(wallet).await.expect("Error adding wallet");
}
