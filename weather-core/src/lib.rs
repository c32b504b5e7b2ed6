//! Core library for the `weather` dashboard CLI.
//!
//! This crate defines:
//! - Configuration & API key resolution
//! - The OpenWeather provider and IP-based city detection
//! - Forecast summarization and the display model (current conditions, forecast days)
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod geolocate;
pub mod model;
pub mod provider;

pub use config::Config;
pub use error::{Error, Result};
pub use geolocate::IpLocator;
pub use model::{CurrentConditions, Dashboard, ForecastDay, ForecastEntry, Latencies, Units};
pub use provider::{Timed, WeatherProvider, provider_from_config};
