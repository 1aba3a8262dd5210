use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::error;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, Type};
use thiserror::Error;
use upg_common::Amount;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        TradeId        ---------------------------------------------------------
/// The gateway-generated order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct TradeId(pub String);

impl TradeId {
    /// Creates a trade id of the form `yyyyMMddHHmmss` followed by four random digits.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
        Self(format!("{}{suffix:04}", now.format("%Y%m%d%H%M%S")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TradeId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ConversionError("A trade id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The merchant-supplied order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and is waiting for an on-chain transfer.
    WaitPay,
    /// A matching transfer was found. Terminal.
    PaySuccess,
    /// The validity window elapsed without a matching transfer. Terminal.
    Expired,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::WaitPay)
    }

    /// The numeric status code reported to merchants.
    pub fn code(&self) -> u8 {
        match self {
            Self::WaitPay => 1,
            Self::PaySuccess => 2,
            Self::Expired => 3,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitPay => write!(f, "WaitPay"),
            Self::PaySuccess => write!(f, "PaySuccess"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WaitPay" => Ok(Self::WaitPay),
            "PaySuccess" => Ok(Self::PaySuccess),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub trade_id: TradeId,
    pub order_id: OrderId,
    /// The chain and token identifier, e.g. `USDT-TRC20`
    pub currency: String,
    /// The wallet address the customer must pay into
    pub token: String,
    /// The quote (fiat) amount supplied by the merchant
    pub amount: Amount,
    /// The exact on-chain amount this order expects
    pub actual_amount: Amount,
    pub status: OrderStatusType,
    pub block_transaction_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    pub notify_url: String,
    pub redirect_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn reservation_key(&self) -> ReservationKey {
        ReservationKey::new(&self.token, self.actual_amount)
    }

    /// How much of the validity window is left at `now`. Zero once the window has elapsed.
    pub fn remaining_validity(&self, now: DateTime<Utc>) -> Duration {
        (self.expiration_time - now).max(Duration::zero())
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time <= now
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub trade_id: TradeId,
    pub order_id: OrderId,
    pub currency: String,
    pub token: String,
    pub amount: Amount,
    pub actual_amount: Amount,
    pub start_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    pub notify_url: String,
    pub redirect_url: String,
}

//--------------------------------------      OrderUpdate      ---------------------------------------------------------
/// The fields an update-if-status write may change. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderUpdate {
    pub status: Option<OrderStatusType>,
    pub block_transaction_id: Option<String>,
    pub expiration_time: Option<DateTime<Utc>>,
}

impl OrderUpdate {
    /// Marks the order as paid by the given transaction. Status and hash are always written together.
    pub fn settle<S: Into<String>>(block_transaction_id: S) -> Self {
        Self {
            status: Some(OrderStatusType::PaySuccess),
            block_transaction_id: Some(block_transaction_id.into()),
            expiration_time: None,
        }
    }

    pub fn expire() -> Self {
        Self { status: Some(OrderStatusType::Expired), ..Default::default() }
    }

    pub fn extend_to(expiration_time: DateTime<Utc>) -> Self {
        Self { expiration_time: Some(expiration_time), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.block_transaction_id.is_none() && self.expiration_time.is_none()
    }
}

//--------------------------------------      WalletStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum WalletStatus {
    Enabled,
    Disabled,
}

impl From<String> for WalletStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Enabled" => Self::Enabled,
            "Disabled" => Self::Disabled,
            _ => {
                error!("Invalid wallet status: {value}. Treating the wallet as disabled.");
                Self::Disabled
            },
        }
    }
}

impl Display for WalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled => write!(f, "Enabled"),
            Self::Disabled => write!(f, "Disabled"),
        }
    }
}

//--------------------------------------      ExchangeRate     ---------------------------------------------------------
/// Fiat units per on-chain unit. A usable rate is strictly positive; the allocator refuses any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate(pub Decimal);

impl ExchangeRate {
    /// A rate for seeding wallets. Zero and negative rates are refused.
    pub fn new(rate: Decimal) -> Result<Self, ConversionError> {
        if rate <= Decimal::ZERO {
            return Err(ConversionError(format!("An exchange rate must be positive, not {rate}")));
        }
        Ok(Self(rate))
    }

    pub fn is_usable(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for ExchangeRate {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self).map_err(|e| ConversionError(format!("Invalid exchange rate {s}. {e}")))
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------     WalletAddress     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    pub id: i64,
    pub currency: String,
    pub token: String,
    pub status: WalletStatus,
    pub rate: ExchangeRate,
}

// Rates are stored as TEXT to keep them exact.
impl<'r, R: Row> FromRow<'r, R> for WalletAddress
where
    &'r str: sqlx::ColumnIndex<R>,
    i64: sqlx::Decode<'r, R::Database> + Type<R::Database>,
    String: sqlx::Decode<'r, R::Database> + Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let rate: String = row.try_get("rate")?;
        let rate = rate
            .parse::<ExchangeRate>()
            .map_err(|e| sqlx::Error::ColumnDecode { index: "rate".into(), source: Box::new(e) })?;
        Ok(Self {
            id: row.try_get("id")?,
            currency: row.try_get("currency")?,
            token: row.try_get("token")?,
            status: WalletStatus::from(row.try_get::<String, _>("status")?),
            rate,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWalletAddress {
    pub currency: String,
    pub token: String,
    pub status: WalletStatus,
    pub rate: ExchangeRate,
}

impl NewWalletAddress {
    pub fn enabled<S: Into<String>>(currency: S, token: S, rate: ExchangeRate) -> Self {
        Self { currency: currency.into(), token: token.into(), status: WalletStatus::Enabled, rate }
    }
}

//--------------------------------------     ReservationKey    ---------------------------------------------------------
/// The exclusive claim on a (wallet, amount) pair. Rendered as `{token}_{amount}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationKey {
    pub token: String,
    pub amount: Amount,
}

impl ReservationKey {
    pub fn new(token: &str, amount: Amount) -> Self {
        Self { token: token.to_string(), amount }
    }
}

impl Display for ReservationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.token, self.amount)
    }
}

/// The current time, truncated to whole milliseconds so that stored and in-memory timestamps compare equal.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn trade_id_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let id = TradeId::generate(now);
        assert_eq!(id.as_str().len(), 18);
        assert!(id.as_str().starts_with("20240309140507"));
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn status_codes() {
        assert_eq!(OrderStatusType::WaitPay.code(), 1);
        assert_eq!(OrderStatusType::PaySuccess.code(), 2);
        assert_eq!(OrderStatusType::Expired.code(), 3);
        assert!(!OrderStatusType::WaitPay.is_terminal());
        assert!(OrderStatusType::Expired.is_terminal());
        assert_eq!("PaySuccess".parse::<OrderStatusType>().unwrap(), OrderStatusType::PaySuccess);
        assert!("Paid".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn reservation_key_rendering() {
        let key = ReservationKey::new("TXyz", Amount::from_cents(143));
        assert_eq!(key.to_string(), "TXyz_1.43");
    }

    #[test]
    fn rates() {
        assert!("7.1".parse::<ExchangeRate>().unwrap().is_usable());
        assert!(ExchangeRate::new(Decimal::ZERO).is_err());
        assert!(ExchangeRate::new(Decimal::new(-71, 1)).is_err());
        assert_eq!(ExchangeRate::new(Decimal::new(71, 1)).unwrap().to_string(), "7.1");
        assert!(!"0".parse::<ExchangeRate>().unwrap().is_usable());
        assert!(!"-2".parse::<ExchangeRate>().unwrap().is_usable());
        assert!("seven".parse::<ExchangeRate>().is_err());
    }

    #[test]
    fn order_updates() {
        assert!(OrderUpdate::default().is_empty());
        let settle = OrderUpdate::settle("0xabc");
        assert_eq!(settle.status, Some(OrderStatusType::PaySuccess));
        assert_eq!(settle.block_transaction_id.as_deref(), Some("0xabc"));
        assert!(!OrderUpdate::expire().is_empty());
    }
}
