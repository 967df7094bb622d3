//! rfcpool core - boundary traits and error types
//!
//! This crate defines what the pool needs from the outside world:
//!
//! - `Connection` - one established remote session
//! - `Function` - a remote function bound to a session
//! - `ConnectionFactory` - builds new connections from `ConnectionParameters`
//! - `RfcError` - the shared error taxonomy

mod connection;
mod error;
mod factory;
mod params;

pub use connection::*;
pub use error::*;
pub use factory::*;
pub use params::*;

pub use serde_json::Value;
