use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Unit system requested from the weather API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }

    /// Lenient parse used by the interactive prompt: anything unrecognised,
    /// including an empty answer, means metric.
    pub fn parse_or_default(input: &str) -> Self {
        input.parse().unwrap_or_default()
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!(
                "Unknown unit system '{other}'. Supported: metric, imperial."
            )),
        }
    }
}

/// Point-in-time weather snapshot for a city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub city: String,
    pub country: String,
    pub condition: String,
    pub description: String,
    pub observed_at: DateTime<Utc>,
    /// Shift of the city's local time from UTC, in seconds.
    pub utc_offset_secs: i32,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed: f64,
    pub visibility_m: u32,
    pub clouds_pct: u8,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl CurrentConditions {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or(Utc.fix())
    }

    /// Expresses a UTC instant in the city's local time.
    pub fn local_time(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset())
    }

    pub fn visibility_km(&self) -> f64 {
        f64::from(self.visibility_m) / 1000.0
    }
}

/// One 3-hourly sample of the upstream forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub at: DateTime<Utc>,
    pub temperature: f64,
    /// Probability of precipitation in `0.0..=1.0`.
    pub pop: f64,
    pub description: String,
}

/// Single-day aggregate of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub min: f64,
    pub max: f64,
    pub pop_pct: u8,
    pub summary: String,
}

/// Wall-clock time spent on each upstream request, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Latencies {
    pub current_ms: u64,
    pub forecast_ms: u64,
}

/// Everything the panel shows for one lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
    pub latencies: Latencies,
    pub units: Units,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("metric", Units::Metric)]
    #[case("Imperial", Units::Imperial)]
    #[case("  METRIC ", Units::Metric)]
    fn units_parse_case_insensitively(#[case] input: &str, #[case] expected: Units) {
        assert_eq!(input.parse::<Units>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("kelvin")]
    #[case("standard")]
    fn lenient_parse_falls_back_to_metric(#[case] input: &str) {
        assert!(input.parse::<Units>().is_err());
        assert_eq!(Units::parse_or_default(input), Units::Metric);
    }

    #[test]
    fn suffixes_follow_unit_system() {
        assert_eq!(Units::Metric.temperature_suffix(), "°C");
        assert_eq!(Units::Imperial.temperature_suffix(), "°F");
        assert_eq!(Units::Metric.speed_suffix(), "m/s");
        assert_eq!(Units::Imperial.speed_suffix(), "mph");
    }

    #[test]
    fn local_time_applies_city_offset() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let current = CurrentConditions {
            city: "Tokyo".into(),
            country: "JP".into(),
            condition: "Clear".into(),
            description: "clear sky".into(),
            observed_at: at,
            utc_offset_secs: 9 * 3600,
            temperature: 12.0,
            feels_like: 11.0,
            humidity_pct: 40,
            pressure_hpa: 1020,
            wind_speed: 2.0,
            visibility_m: 8500,
            clouds_pct: 0,
            sunrise: at,
            sunset: at,
        };

        let local = current.local_time(at);
        assert_eq!(local.format("%H:%M").to_string(), "07:13");
        assert_eq!(current.visibility_km(), 8.5);
    }
}
