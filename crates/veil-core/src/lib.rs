//! veil-core: shared identifiers, error umbrella, configuration, and logging
//! bootstrap for the VeilFS treesystem crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod time;
pub mod types;

pub use error::{VeilError, VeilResult};
pub use types::{CloudId, NodeId, OwnerId, TreeId};
