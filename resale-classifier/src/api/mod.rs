//! HTTP API handlers for resale-classifier

pub mod batch;
pub mod classify;
pub mod fees;
pub mod health;
pub mod parameters;
pub mod patterns;
pub mod products;
pub mod sse;

pub use batch::batch_routes;
pub use classify::classify_routes;
pub use fees::fee_routes;
pub use health::health_routes;
pub use parameters::parameter_routes;
pub use patterns::pattern_routes;
pub use products::product_routes;
pub use sse::batch_event_stream;
