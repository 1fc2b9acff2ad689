//! Service layer: orchestration between core, storage and the relay.

pub mod order_service;

pub use order_service::OrderService;
