mod bridge;
mod config;
pub mod discovery;
mod error;
pub mod event;
pub mod handlers;
mod hub;
mod logger;
pub mod protocol;
mod thermostat;
mod types;

pub use bridge::Bridge;
pub use config::HubConfig;
pub use error::{Error, Result};
pub use hub::{Hub, HubClient, HubClientBuilder};
pub use logger::MessageLogMode;
pub use thermostat::Thermostat;
pub use types::*;
