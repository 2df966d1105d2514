pub mod backend;
pub mod hermes_rest;
pub mod hermes_ws;

pub use backend::{BackendClient, TradeList};
pub use hermes_rest::HermesRest;
pub use hermes_ws::HermesWs;
