//! Wire model shared by the huddle relay and call clients.

mod error;
pub mod model;
pub mod utils;

pub use error::ProtocolError;
pub use model::*;
