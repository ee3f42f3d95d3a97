// panelwatch-api: Async HTTP clients for X-UI style panels and webhook sinks

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod webhook;

pub use client::PanelClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use webhook::WebhookClient;
