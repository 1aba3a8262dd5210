use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    db_types::Order,
    events::{EventHandler, EventProducer, Handler, OrderCreatedEvent, OrderExpiredEvent, OrderPaidEvent},
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_expired_producer: Vec<EventProducer<OrderExpiredEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, order: &Order) {
        for emitter in &self.order_created_producer {
            emitter.publish_event(OrderCreatedEvent::new(order.clone())).await;
        }
    }

    pub async fn publish_order_paid(&self, order: &Order) {
        for emitter in &self.order_paid_producer {
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    pub async fn publish_order_expired(&self, order: &Order) {
        for emitter in &self.order_expired_producer {
            emitter.publish_event(OrderExpiredEvent::new(order.clone())).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_expired: Option<EventHandler<OrderExpiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_expired = hooks.on_order_expired.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_order_paid, on_order_expired }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_expired {
            result.order_expired_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_expired {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_expired: Option<Handler<OrderExpiredEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderExpiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_expired = Some(Arc::new(f));
        self
    }
}
