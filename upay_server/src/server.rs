use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use explorer_tools::ExplorerApi;
use log::*;
use upay_engine::{
    chains::ChainRegistry,
    events::{EventHandlers, EventHooks},
    scheduler::TokioExpiryScheduler,
    sqlite_expiry_handler,
    OrderAdmissionApi,
    OrderExpiryApi,
    OrderQueryApi,
    SettlementVerifier,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::merchant_notify::{merchant_notify_hook, MerchantNotifier},
    routes::{health, CheckStatusRoute, CreateOrderRoute, OrderViewRoute, VerifyOrderRoute},
    workers::{recover_expiries, start_expiry_sweeper, start_settlement_worker, EXPIRY_SWEEP_INTERVAL},
};

const EVENT_BUFFER_SIZE: usize = 100;

/// The engine APIs the request handlers are served by, over the production backends.
#[derive(Clone)]
pub struct GatewayServices {
    pub admission: OrderAdmissionApi<SqliteDatabase, SqliteDatabase, TokioExpiryScheduler>,
    pub query: OrderQueryApi<SqliteDatabase>,
    pub verifier: SettlementVerifier<SqliteDatabase, ExplorerApi>,
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = prepare_database(&config).await?;
    let chains = load_chains(config.chains_file.as_deref())?;
    info!("🪛️ Verifying payments in {}", chains.currencies().join(", "));

    let notifier = MerchantNotifier::new(config.request_signer(), config.notify_attempts)?;
    info!("🪛️ Signing merchant messages with {}", config.signature_scheme);
    let hooks = create_event_hooks(notifier);
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let expiry_api = OrderExpiryApi::new(db.clone(), producers.clone());
    let scheduler = TokioExpiryScheduler::new(sqlite_expiry_handler(expiry_api.clone()));
    recover_expiries(&expiry_api, &scheduler).await?;
    let _sweeper = start_expiry_sweeper(expiry_api, EXPIRY_SWEEP_INTERVAL);

    let explorer = ExplorerApi::new(config.explorer.clone())?;
    let verifier = SettlementVerifier::new(db.clone(), explorer, chains, producers.clone());
    if config.settlement_polling {
        // Runs for the lifetime of the server
        let _handle = start_settlement_worker(verifier.clone(), db.clone(), config.verify_interval);
    } else {
        warn!("🪛️ Settlement polling is disabled. Orders are only verified when a checkout page asks for it.");
    }

    let admission = OrderAdmissionApi::new(db.clone(), db.clone(), scheduler.clone(), producers)
        .with_validity(config.order_timeout);
    let services = GatewayServices { admission, query: OrderQueryApi::new(db.clone()), verifier };
    let srv = create_server_instance(config, services)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    scheduler.shutdown().await;
    db.close().await;
    result
}

async fn prepare_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    SqliteDatabase::create_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not create the database. {e}")))?;
    let db = SqliteDatabase::new_with_options(&config.database_url, config.db_connections, config.db_timeout)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    Ok(db)
}

/// The built-in chains, extended or overridden by the entries in `chains_file`.
pub fn load_chains(chains_file: Option<&str>) -> Result<ChainRegistry, ServerError> {
    let registry = ChainRegistry::builtin();
    match chains_file {
        Some(path) => {
            let extra = ChainRegistry::from_file(path)?;
            info!("🪛️ Loaded {} chain definitions from {path}", extra.currencies().len());
            Ok(registry.merge(extra))
        },
        None => Ok(registry),
    }
}

pub fn create_event_hooks(notifier: MerchantNotifier) -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(merchant_notify_hook(notifier));
    hooks
}

pub fn create_server_instance(config: ServerConfig, services: GatewayServices) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("upay::access_log"))
            .app_data(web::Data::new(options.clone()))
            .app_data(web::Data::new(services.admission.clone()))
            .app_data(web::Data::new(services.query.clone()))
            .app_data(web::Data::new(services.verifier.clone()))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase, SqliteDatabase, TokioExpiryScheduler>::new())
            .service(CheckStatusRoute::<SqliteDatabase>::new())
            .service(OrderViewRoute::<SqliteDatabase>::new())
            .service(VerifyOrderRoute::<SqliteDatabase, ExplorerApi>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
