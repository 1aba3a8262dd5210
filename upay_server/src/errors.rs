use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use explorer_tools::ExplorerApiError;
use thiserror::Error;
use upay_engine::{
    chains::ChainConfigError,
    traits::{OrderStoreError, SchedulerError},
    AdmissionError,
    ExpiryError,
    SettlementError,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid order request. {0}")]
    InvalidOrder(String),
    #[error("The request signature is missing or invalid")]
    InvalidSignature,
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    AllocationExhausted(String),
    #[error("Order {0} has already been paid")]
    OrderAlreadySettled(String),
    #[error("The block explorer is unavailable. {0}")]
    ExplorerUnavailable(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::OrderAlreadySettled(_) => StatusCode::CONFLICT,
            Self::AllocationExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ExplorerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<AdmissionError> for ServerError {
    fn from(e: AdmissionError) -> Self {
        match e {
            AdmissionError::Configuration(msg) => Self::InvalidOrder(msg),
            AdmissionError::AllocationExhausted { .. } => Self::AllocationExhausted(e.to_string()),
            AdmissionError::OrderAlreadySettled(id) => Self::OrderAlreadySettled(id.to_string()),
            AdmissionError::OrderStore(_)
            | AdmissionError::WalletStore(_)
            | AdmissionError::Reservation(_)
            | AdmissionError::Scheduler(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::UnsupportedCurrency(_) => Self::InvalidOrder(e.to_string()),
            SettlementError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id} does not exist")),
            SettlementError::Explorer(e) => Self::ExplorerUnavailable(e.to_string()),
            SettlementError::OrderStore(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<OrderStoreError> for ServerError {
    fn from(e: OrderStoreError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<ExpiryError> for ServerError {
    fn from(e: ExpiryError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<SchedulerError> for ServerError {
    fn from(e: SchedulerError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<ChainConfigError> for ServerError {
    fn from(e: ChainConfigError) -> Self {
        Self::ConfigurationError(e.to_string())
    }
}

impl From<ExplorerApiError> for ServerError {
    fn from(e: ExplorerApiError) -> Self {
        Self::InitializeError(e.to_string())
    }
}
