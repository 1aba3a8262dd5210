use chrono::Duration;
use cucumber::World;
use log::*;
use upay_engine::{
    chains::ChainRegistry,
    db_types::{Order, OrderId},
    events::EventProducers,
    order_objects::{AdmissionOutcome, SettlementOutcome},
    scheduler::TokioExpiryScheduler,
    sqlite_expiry_handler,
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        ScriptedTransferSource,
    },
    AdmissionError,
    OrderAdmissionApi,
    OrderExpiryApi,
    OrderManagement,
    SettlementError,
    SettlementVerifier,
    SqliteDatabase,
};

pub type Admission = OrderAdmissionApi<SqliteDatabase, SqliteDatabase, TokioExpiryScheduler>;
pub type Verifier = SettlementVerifier<SqliteDatabase, ScriptedTransferSource>;

#[derive(Default, Debug, World)]
pub struct GatewayWorld {
    pub system: Option<GatewaySystem>,
    pub last_admission: Option<Result<AdmissionOutcome, AdmissionError>>,
    pub last_settlement: Option<Result<SettlementOutcome, SettlementError>>,
}

impl GatewayWorld {
    pub fn system(&self) -> &GatewaySystem {
        self.system.as_ref().expect("Gateway not initialised")
    }

    pub fn system_mut(&mut self) -> &mut GatewaySystem {
        self.system.as_mut().expect("Gateway not initialised")
    }

    pub async fn latest_order(&self, order_id: &str) -> Order {
        self.system()
            .db
            .fetch_order_by_order_id(&OrderId::from(order_id))
            .await
            .expect("Error fetching order")
            .unwrap_or_else(|| panic!("Order {order_id} does not exist"))
    }
}

pub struct GatewaySystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub scheduler: TokioExpiryScheduler,
    pub admission: Admission,
    pub expiry: OrderExpiryApi<SqliteDatabase>,
    pub source: ScriptedTransferSource,
    pub verifier: Verifier,
}

impl std::fmt::Debug for GatewaySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GatewaySystem ({})", self.db_path)
    }
}

impl GatewaySystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let producers = EventProducers::default();
        let expiry = OrderExpiryApi::new(db.clone(), producers.clone());
        let scheduler = TokioExpiryScheduler::new(sqlite_expiry_handler(expiry.clone()));
        let admission = OrderAdmissionApi::new(db.clone(), db.clone(), scheduler.clone(), producers.clone());
        let source = ScriptedTransferSource::new();
        let verifier = SettlementVerifier::new(db.clone(), source.clone(), ChainRegistry::builtin(), producers);
        Self { db_path: url, db, scheduler, admission, expiry, source, verifier }
    }

    pub fn set_validity(&mut self, validity: Duration) {
        self.admission = self.admission.clone().with_validity(validity);
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
