use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use explorer_tools::ExplorerConfig;
use log::*;
use upay_engine::DEFAULT_ORDER_VALIDITY;
use upg_common::{parse_boolean_flag, Secret};

use crate::helpers::{RequestSigner, SignatureScheme};

const DEFAULT_UPAY_HOST: &str = "127.0.0.1";
const DEFAULT_UPAY_PORT: u16 = 8090;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/upay_store.db";
const DEFAULT_VERIFY_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);
const DEFAULT_DB_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);
const DEFAULT_NOTIFY_ATTEMPTS: u32 = 3;
const DEFAULT_DB_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_connections: u32,
    /// How long a store call may wait for a connection before failing with a timeout
    pub db_timeout: std::time::Duration,
    /// The public base URL of this gateway. Checkout links are built from it.
    pub app_url: String,
    /// The shared secret merchants sign order requests with. Payment notifications are signed with it too.
    pub api_secret: Secret<String>,
    /// How order requests and payment notifications are signed
    pub signature_scheme: SignatureScheme,
    /// The validity window of new and extended orders
    pub order_timeout: Duration,
    /// How often the settlement worker sweeps the orders that are waiting for payment
    pub verify_interval: std::time::Duration,
    /// When false, orders are only verified when a checkout page asks for it.
    pub settlement_polling: bool,
    /// How many times a payment notification is delivered before giving up
    pub notify_attempts: u32,
    /// Optional JSON file with extra (or overriding) chain definitions
    pub chains_file: Option<String>,
    pub explorer: ExplorerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_UPAY_HOST.to_string(),
            port: DEFAULT_UPAY_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_connections: DEFAULT_DB_CONNECTIONS,
            db_timeout: DEFAULT_DB_TIMEOUT,
            app_url: format!("http://{DEFAULT_UPAY_HOST}:{DEFAULT_UPAY_PORT}"),
            api_secret: Secret::default(),
            signature_scheme: SignatureScheme::default(),
            order_timeout: DEFAULT_ORDER_VALIDITY,
            verify_interval: DEFAULT_VERIFY_INTERVAL,
            settlement_polling: true,
            notify_attempts: DEFAULT_NOTIFY_ATTEMPTS,
            chains_file: None,
            explorer: ExplorerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("UPAY_HOST").ok().unwrap_or_else(|| DEFAULT_UPAY_HOST.into());
        let port = parse_env("UPAY_PORT", DEFAULT_UPAY_PORT);
        let database_url = env::var("UPAY_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ UPAY_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let db_connections = parse_env("UPAY_DB_CONNECTIONS", DEFAULT_DB_CONNECTIONS);
        let db_timeout = std::time::Duration::from_secs(parse_env("UPAY_DB_TIMEOUT", DEFAULT_DB_TIMEOUT.as_secs()));
        let app_url = env::var("UPAY_APP_URL").ok().unwrap_or_else(|| {
            let url = format!("http://{host}:{port}");
            warn!("🪛️ UPAY_APP_URL is not set. Payment links will point at {url}, which may not be reachable.");
            url
        });
        let app_url = app_url.trim_end_matches('/').to_string();
        let api_secret = env::var("UPAY_API_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ UPAY_API_SECRET is not set. Every create-order request will be rejected until it is set to the \
                 secret your merchants sign requests with."
            );
            String::default()
        });
        let signature_scheme = parse_env("UPAY_SIGNATURE_SCHEME", SignatureScheme::default());
        let order_timeout = Duration::minutes(parse_env("UPAY_ORDER_TIMEOUT", DEFAULT_ORDER_VALIDITY.num_minutes()));
        let order_timeout = if order_timeout > Duration::zero() {
            order_timeout
        } else {
            warn!("🪛️ UPAY_ORDER_TIMEOUT must be positive. Using {} minutes.", DEFAULT_ORDER_VALIDITY.num_minutes());
            DEFAULT_ORDER_VALIDITY
        };
        let verify_interval =
            std::time::Duration::from_secs(parse_env("UPAY_VERIFY_INTERVAL", DEFAULT_VERIFY_INTERVAL.as_secs()).max(1));
        let settlement_polling = parse_boolean_flag(env::var("UPAY_SETTLEMENT_POLLING").ok(), true);
        let notify_attempts = parse_env("UPAY_NOTIFY_ATTEMPTS", DEFAULT_NOTIFY_ATTEMPTS).max(1);
        let chains_file = env::var("UPAY_CHAINS_FILE").ok().filter(|s| !s.trim().is_empty());
        let explorer = ExplorerConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            db_connections,
            db_timeout,
            app_url,
            api_secret: Secret::new(api_secret),
            signature_scheme,
            order_timeout,
            verify_interval,
            settlement_polling,
            notify_attempts,
            chains_file,
            explorer,
        }
    }

    pub fn request_signer(&self) -> RequestSigner {
        RequestSigner::new(self.signature_scheme, self.api_secret.clone())
    }
}

/// Reads and parses an environment variable. Missing values silently fall back to the default. Invalid ones are
/// logged first.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The part of the configuration that request handlers need. Handlers receive it as app data.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub app_url: String,
    pub signer: RequestSigner,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { app_url: config.app_url.clone(), signer: config.request_signer() }
    }

    pub fn payment_url(&self, trade_id: &str) -> String {
        format!("{}/pay/checkout-counter/{trade_id}", self.app_url)
    }
}
