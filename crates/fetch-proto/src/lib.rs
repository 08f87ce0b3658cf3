//! Shared core of the fetch button: configuration, the button state model,
//! the network collaborator and the request lifecycle controller.

pub mod config;
pub mod controller;
pub mod fetcher;
pub mod platform;
pub mod state;

pub use config::{ButtonConfig, Config, ConfigError};
pub use controller::{RequestController, RequestEvent, TransitionError};
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use state::{ButtonState, ButtonView, FailureCause, Message, StateMessages, ViewStore};

pub use reqwest::Url;
