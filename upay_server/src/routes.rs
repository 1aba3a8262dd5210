//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every store and explorer call in the handlers below is async, so
//! a slow explorer only parks the request that is waiting on it.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use upay_engine::{
    db_types::{OrderStatusType, TradeId},
    traits::{ExpirationScheduler, GatewayDatabase, OrderManagement, ReservationStore, TransferSource},
    OrderAdmissionApi,
    OrderQueryApi,
    SettlementVerifier,
};

use crate::{
    config::ServerOptions,
    data_objects::{CheckoutView, CreateOrderRequest, CreateOrderResponse, OrderStatusResponse, VerifyResponse},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//--------------------------------------------   Create order  -------------------------------------------------
route!(create_order => Post "/api/create_order" impl GatewayDatabase, ReservationStore, ExpirationScheduler);
/// Admits a signed merchant order and returns where, how much, and until when to pay.
///
/// Re-submitting an order id that is still waiting for payment returns the existing order with a fresh window.
pub async fn create_order<B, R, S>(
    body: web::Json<CreateOrderRequest>,
    options: web::Data<ServerOptions>,
    api: web::Data<OrderAdmissionApi<B, R, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: GatewayDatabase,
    R: ReservationStore,
    S: ExpirationScheduler,
{
    let request = body.into_inner();
    trace!("💻️ Received create order request for {} ({})", request.order_id, request.currency);
    if !options.signer.verify(&request.signed_params(), &request.signature) {
        warn!("💻️ Rejecting order {}: invalid signature", request.order_id);
        return Err(ServerError::InvalidSignature);
    }
    let outcome = api.admit(request.into()).await?;
    let payment_url = options.payment_url(outcome.order().trade_id.as_str());
    Ok(HttpResponse::Ok().json(CreateOrderResponse::new(&outcome, payment_url)))
}

//--------------------------------------------   Order status  -------------------------------------------------
route!(check_status => Get "/pay/check-status/{trade_id}" impl OrderManagement);
pub async fn check_status<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let trade_id = TradeId::from(path.into_inner().as_str());
    trace!("💻️ Status check for {trade_id}");
    let status = api
        .order_status(&trade_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {trade_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse::new(trade_id.as_str(), status)))
}

route!(order_view => Get "/pay/order/{trade_id}" impl OrderManagement);
/// The data a checkout page needs. Only orders that are still waiting for payment can be viewed.
pub async fn order_view<B: OrderManagement>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let trade_id = TradeId::from(path.into_inner().as_str());
    match api.fetch_order(&trade_id).await? {
        Some(order) if order.status == OrderStatusType::WaitPay => {
            Ok(HttpResponse::Ok().json(CheckoutView::from(&order)))
        },
        Some(order) => {
            debug!("💻️ Checkout requested for {trade_id}, which is {}", order.status);
            Err(ServerError::NoRecordFound(format!("Order {trade_id} is no longer waiting for payment")))
        },
        None => Err(ServerError::NoRecordFound(format!("Order {trade_id} does not exist"))),
    }
}

//----------------------------------------------   Verify  -----------------------------------------------------
route!(verify_order => Post "/pay/verify/{trade_id}" impl OrderManagement, TransferSource);
/// Checks the explorer for this order's payment right away, instead of waiting for the next poll.
pub async fn verify_order<B, T>(
    path: web::Path<String>,
    api: web::Data<SettlementVerifier<B, T>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    T: TransferSource,
{
    let trade_id = TradeId::from(path.into_inner().as_str());
    trace!("💻️ Verification requested for {trade_id}");
    let outcome = api.verify_trade(&trade_id).await?;
    debug!("💻️ Verification of {trade_id}: {outcome}");
    Ok(HttpResponse::Ok().json(VerifyResponse::new(trade_id.as_str(), &outcome)))
}
