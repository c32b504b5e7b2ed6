use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::{Duration, Instant};

use crate::{
    error::{Error, Result},
    model::{CurrentConditions, ForecastEntry, Units},
};

use super::{Timed, WeatherProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_PAUSE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    attempts: u32,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            attempts: 1,
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Total attempts per request; transient failures are retried until
    /// this is exhausted.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        city: &str,
        units: Units,
    ) -> Result<Timed<T>> {
        let url = self.endpoint(path);
        let mut attempt = 1;

        loop {
            match self.get_once(&url, city, units).await {
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    tracing::warn!(
                        %url,
                        attempt,
                        error = %err,
                        "OpenWeather request failed, retrying"
                    );
                    tokio::time::sleep(RETRY_PAUSE).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        city: &str,
        units: Units,
    ) -> Result<Timed<T>> {
        let started = Instant::now();

        let res = self
            .http
            .get(url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", units.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(%url, %status, latency_ms, "OpenWeather response");

        let value = parse_body(status, &body)?;
        Ok(Timed { value, latency_ms })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, city: &str, units: Units) -> Result<Timed<CurrentConditions>> {
        let Timed { value, latency_ms } = self
            .get_json::<OwCurrentResponse>("weather", city, units)
            .await?;

        Ok(Timed {
            value: value.into(),
            latency_ms,
        })
    }

    async fn forecast(&self, city: &str, units: Units) -> Result<Timed<Vec<ForecastEntry>>> {
        let Timed { value, latency_ms } = self
            .get_json::<OwForecastResponse>("forecast", city, units)
            .await?;

        Ok(Timed {
            value: value.list.into_iter().map(ForecastEntry::from).collect(),
            latency_ms,
        })
    }
}

/// Decodes a successful body or turns an error status into the matching [`Error`].
fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if status.is_success() {
        return Ok(serde_json::from_str(body)?);
    }

    let message = serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    Err(match status {
        StatusCode::NOT_FOUND => Error::CityNotFound(message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
        StatusCode::UNAUTHORIZED => Error::Api {
            status,
            message: message.unwrap_or_else(|| "invalid API key".to_owned()),
        },
        _ => Error::Api {
            status,
            message: message.unwrap_or_else(|| truncate_body(body)),
        },
    })
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    #[serde(default)]
    timezone: i32,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    visibility: u32,
    clouds: OwClouds,
    sys: OwSys,
}

impl From<OwCurrentResponse> for CurrentConditions {
    fn from(raw: OwCurrentResponse) -> Self {
        let (condition, description) = raw
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description))
            .unwrap_or_else(|| ("Unknown".to_owned(), "unknown".to_owned()));

        CurrentConditions {
            city: raw.name,
            country: raw.sys.country,
            condition,
            description,
            observed_at: unix_to_utc(raw.dt).unwrap_or_else(Utc::now),
            utc_offset_secs: raw.timezone,
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            humidity_pct: raw.main.humidity,
            pressure_hpa: raw.main.pressure,
            wind_speed: raw.wind.speed,
            visibility_m: raw.visibility,
            clouds_pct: raw.clouds.all,
            sunrise: unix_to_utc(raw.sys.sunrise).unwrap_or_default(),
            sunset: unix_to_utc(raw.sys.sunset).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    weather: Vec<OwForecastWeather>,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

impl From<OwForecastEntry> for ForecastEntry {
    fn from(raw: OwForecastEntry) -> Self {
        let description = raw
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_else(|| "unknown".to_owned());

        ForecastEntry {
            at: unix_to_utc(raw.dt).unwrap_or_default(),
            temperature: raw.main.temp,
            pop: raw.pop,
            description,
        }
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_owned(),
    }
}
