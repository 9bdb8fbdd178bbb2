//! Domain ports defining the edges of the hexagon.
//!
//! The dashboard core drives exactly one adapter: the hosted data API. The
//! port exposes a strongly typed error so adapters map their failures into
//! predictable variants instead of returning `anyhow::Result`.

mod data_gateway;
mod macros;

pub(crate) use macros::define_port_error;

#[cfg(test)]
pub use data_gateway::MockDataGateway;
pub use data_gateway::{DataGateway, GatewayError, GatewayResponse, Record, RemoteErrorBody};
