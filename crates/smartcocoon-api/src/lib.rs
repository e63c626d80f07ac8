// smartcocoon-api: Async Rust client for the SmartCocoon smart-fan cloud API

pub mod auth;
pub mod client;
pub mod error;
pub mod login;
pub mod model;
pub mod persist;
pub mod transport;
pub mod update;

pub use auth::{Credentials, LoginOutcome, TokenSet};
pub use client::{API_ENDPOINT, ApiRequest, ClientConfig, SmartCocoonClient};
pub use error::Error;
pub use model::{AttributeValue, Fan, FanAttribute, FanKey, FanMode, Room, System};
pub use persist::ResponseStore;
pub use transport::TransportConfig;
pub use update::UpdateOutcome;
