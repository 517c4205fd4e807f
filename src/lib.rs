mod client;
mod command;
mod error;
mod logger;
mod protocol;
mod registry;
mod types;
mod zone;

pub use client::{CoolMasterClient, CoolMasterClientBuilder};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use types::*;
