use crate::{
    Config,
    error::Result,
    model::{CurrentConditions, ForecastEntry, Units},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// A value fetched from upstream together with how long the request took.
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub latency_ms: u64,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, city: &str, units: Units) -> Result<Timed<CurrentConditions>>;

    /// Raw 3-hourly samples, oldest first.
    async fn forecast(&self, city: &str, units: Units) -> Result<Timed<Vec<ForecastEntry>>>;
}

/// Construct the OpenWeather provider from config and the process environment.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = OpenWeatherProvider::new(api_key)?.with_attempts(config.attempts());

    Ok(Box::new(provider))
}
