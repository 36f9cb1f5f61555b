//! Client library for the infinitive HVAC control API.

pub mod client;
pub mod config;
pub mod models;
pub mod transport;
pub mod utils;

pub use client::{FetchFailure, InfinitiveClient, InfinitiveClientError};
pub use config::Config;
pub use models::{FanMode, Mode, Status, StatusSnapshot, TemperatureUnit, VacationStatus};
pub use transport::{HttpResponse, Transport, UreqTransport};
