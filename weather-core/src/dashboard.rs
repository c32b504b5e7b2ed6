//! Runs one lookup: current conditions, forecast, summary.

use crate::{
    error::{Error, Result},
    forecast,
    model::{Dashboard, Latencies, Units},
    provider::WeatherProvider,
};

/// Fetches everything the panel needs for `city`.
///
/// The current conditions are mandatory. Any failed forecast request
/// leaves the forecast section empty with a zero latency.
pub async fn load(
    provider: &dyn WeatherProvider,
    city: &str,
    units: Units,
    days: usize,
) -> Result<Dashboard> {
    let city = city.trim();
    if city.is_empty() {
        return Err(Error::CityNotFound(None));
    }

    let current = provider.current(city, units).await?;
    tracing::info!(city, latency_ms = current.latency_ms, "current weather fetched");

    let (forecast_days, forecast_ms) = match provider.forecast(city, units).await {
        Ok(timed) => (forecast::summarize(&timed.value, days), timed.latency_ms),
        Err(err) => {
            tracing::warn!(city, error = %err, "forecast unavailable");
            (Vec::new(), 0)
        }
    };

    Ok(Dashboard {
        current: current.value,
        forecast: forecast_days,
        latencies: Latencies {
            current_ms: current.latency_ms,
            forecast_ms,
        },
        units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{CurrentConditions, ForecastEntry},
        provider::Timed,
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy)]
    enum ForecastOutcome {
        Ok,
        ServerError,
        RateLimited,
    }

    #[derive(Debug)]
    struct FakeProvider {
        city_known: bool,
        forecast: ForecastOutcome,
        calls: Mutex<Vec<(String, Units)>>,
    }

    impl FakeProvider {
        fn new(city_known: bool, forecast: ForecastOutcome) -> Self {
            Self {
                city_known,
                forecast,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Units)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn conditions(city: &str) -> CurrentConditions {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        CurrentConditions {
            city: city.to_owned(),
            country: "GB".into(),
            condition: "Rain".into(),
            description: "light rain".into(),
            observed_at: at,
            utc_offset_secs: 0,
            temperature: 9.0,
            feels_like: 7.5,
            humidity_pct: 90,
            pressure_hpa: 1008,
            wind_speed: 5.1,
            visibility_m: 9000,
            clouds_pct: 100,
            sunrise: at,
            sunset: at,
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current(&self, city: &str, units: Units) -> Result<Timed<CurrentConditions>> {
            self.calls.lock().unwrap().push((city.to_owned(), units));
            if !self.city_known {
                return Err(Error::CityNotFound(Some("city not found".into())));
            }
            Ok(Timed {
                value: conditions(city),
                latency_ms: 120,
            })
        }

        async fn forecast(&self, _city: &str, _units: Units) -> Result<Timed<Vec<ForecastEntry>>> {
            match self.forecast {
                ForecastOutcome::Ok => Ok(Timed {
                    value: vec![ForecastEntry {
                        at: DateTime::from_timestamp(1_700_006_400, 0).unwrap(),
                        temperature: 8.0,
                        pop: 0.5,
                        description: "light rain".into(),
                    }],
                    latency_ms: 80,
                }),
                ForecastOutcome::ServerError => Err(Error::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "boom".into(),
                }),
                ForecastOutcome::RateLimited => Err(Error::RateLimited),
            }
        }
    }

    #[tokio::test]
    async fn assembles_dashboard_with_latencies() {
        let provider = FakeProvider::new(true, ForecastOutcome::Ok);

        let dash = load(&provider, "  London ", Units::Imperial, 3)
            .await
            .expect("lookup succeeds");

        assert_eq!(provider.calls(), vec![("London".to_owned(), Units::Imperial)]);
        assert_eq!(dash.current.city, "London");
        assert_eq!(dash.forecast.len(), 1);
        assert_eq!(dash.forecast[0].pop_pct, 50);
        assert_eq!(dash.forecast[0].summary, "Light rain");
        assert_eq!(
            dash.latencies,
            Latencies {
                current_ms: 120,
                forecast_ms: 80
            }
        );
        assert_eq!(dash.units, Units::Imperial);
    }

    #[tokio::test]
    async fn unknown_city_is_reported() {
        let provider = FakeProvider::new(false, ForecastOutcome::Ok);

        let err = load(&provider, "Atlantis", Units::Metric, 3).await.unwrap_err();
        assert!(matches!(err, Error::CityNotFound(_)));
    }

    #[tokio::test]
    async fn blank_city_never_reaches_the_provider() {
        let provider = FakeProvider::new(true, ForecastOutcome::Ok);

        let err = load(&provider, "   ", Units::Metric, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "City not found.");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn forecast_failure_leaves_section_empty() {
        let provider = FakeProvider::new(true, ForecastOutcome::ServerError);

        let dash = load(&provider, "London", Units::Metric, 3)
            .await
            .expect("current conditions still shown");

        assert!(dash.forecast.is_empty());
        assert_eq!(dash.latencies.forecast_ms, 0);
        assert_eq!(dash.latencies.current_ms, 120);
    }

    #[tokio::test]
    async fn rate_limited_forecast_still_shows_current_conditions() {
        let provider = FakeProvider::new(true, ForecastOutcome::RateLimited);

        let dash = load(&provider, "London", Units::Metric, 3)
            .await
            .expect("rate limiting only empties the forecast");

        assert_eq!(dash.current.city, "London");
        assert!(dash.forecast.is_empty());
        assert_eq!(dash.latencies.forecast_ms, 0);
        assert_eq!(dash.latencies.current_ms, 120);
    }
}
