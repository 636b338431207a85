mod client;
mod codec;
mod error;
mod logger;
mod mapper;
mod protocol;
mod session;
mod transport;
mod types;
mod xml;

pub use client::{AuraClient, AuraClientBuilder, DEFAULT_GATEWAY_NAME};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::APP_ID;
pub use types::*;
