pub mod aws;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod query_source;
pub mod router;
pub mod secrets;
pub mod service;

pub use error::GatewayError;
pub use router::{GatewayState, gateway_router};
