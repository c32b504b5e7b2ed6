use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::{
    io::{self, Write},
    process::ExitCode,
};
use weather_core::{
    Config, IpLocator, Units, WeatherProvider, dashboard, forecast::DEFAULT_DAYS,
    provider_from_config,
};

use crate::{render::Renderer, session::Session};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::White.on_default())
    .usage(AnsiColor::White.on_default())
    .literal(AnsiColor::BrightBlack.on_default())
    .placeholder(AnsiColor::BrightBlack.on_default());

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather",
    version,
    styles = STYLES,
    about = "Current weather and a short forecast in your terminal"
)]
pub struct Cli {
    /// Verbose diagnostics on stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output (also honoured via NO_COLOR).
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prompt for units and cities until you quit (the default).
    Interactive(LookupArgs),

    /// Show the dashboard for one city and exit.
    Show {
        /// City name; detected from your IP address when omitted.
        city: Option<String>,

        #[command(flatten)]
        lookup: LookupArgs,
    },

    /// Store an API key, default units and default city.
    Configure,
}

#[derive(Debug, Clone, Args)]
pub struct LookupArgs {
    /// Unit system: metric or imperial.
    #[arg(long)]
    pub units: Option<Units>,

    /// Number of forecast days to show.
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: usize,
}

impl Cli {
    fn renderer(&self) -> Renderer {
        let color = !self.no_color && std::env::var_os("NO_COLOR").is_none();
        Renderer::new(color)
    }

    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let renderer = self.renderer();

        let command = self.command.unwrap_or_else(|| {
            Command::Interactive(LookupArgs {
                units: None,
                days: DEFAULT_DAYS,
            })
        });

        match command {
            Command::Configure => configure(config_or_default(Config::load())),
            Command::Interactive(lookup) => {
                let config = Config::load()?;
                let provider = provider_from_config(&config)?;
                interactive(provider.as_ref(), &config, renderer, lookup).await
            }
            Command::Show { city, lookup: args } => {
                let config = Config::load()?;
                let provider = provider_from_config(&config)?;
                let locator = IpLocator::new()?;
                let lookup = Lookup {
                    provider: provider.as_ref(),
                    config: &config,
                    renderer,
                    args,
                };
                lookup
                    .show(city, locator.detect_city(), io::stdout())
                    .await
            }
        }
    }
}

/// Config for `configure`: an unreadable file is replaced by defaults.
fn config_or_default(loaded: anyhow::Result<Config>) -> Config {
    loaded.unwrap_or_else(|err| {
        tracing::warn!(error = %format!("{err:#}"), "ignoring unreadable config file");
        Config::default()
    })
}

async fn interactive(
    provider: &dyn WeatherProvider,
    config: &Config,
    renderer: Renderer,
    lookup: LookupArgs,
) -> anyhow::Result<ExitCode> {
    let locator = IpLocator::new()?;
    let session = Session {
        provider,
        renderer,
        days: lookup.days,
        default_units: lookup.units.unwrap_or(config.units()),
    };

    let detect = async {
        locator
            .detect_city()
            .await
            .or_else(|| config.default_city.clone())
    };

    session.run(io::stdin().lock(), io::stdout().lock(), detect).await?;
    Ok(ExitCode::SUCCESS)
}

/// Everything a one-shot lookup needs besides the city.
struct Lookup<'a> {
    provider: &'a dyn WeatherProvider,
    config: &'a Config,
    renderer: Renderer,
    args: LookupArgs,
}

impl Lookup<'_> {
    /// Resolves the city (argument, then `detect`, then the configured
    /// default), prints one panel to `out` and reports the exit status.
    /// `detect` is only awaited when no city was given.
    async fn show<F, W>(
        self,
        city: Option<String>,
        detect: F,
        mut out: W,
    ) -> anyhow::Result<ExitCode>
    where
        F: Future<Output = Option<String>>,
        W: Write,
    {
        let city = match city.filter(|c| !c.trim().is_empty()) {
            Some(city) => city,
            None => detect
                .await
                .or_else(|| self.config.default_city.clone())
                .ok_or_else(|| {
                    anyhow!(
                        "Could not detect your city.\n\
                         Hint: pass one explicitly, e.g. `weather show London`."
                    )
                })?,
        };
        let units = self.args.units.unwrap_or(self.config.units());

        match dashboard::load(self.provider, &city, units, self.args.days).await {
            Ok(dash) => {
                writeln!(out, "{}", self.renderer.dashboard(&dash, Utc::now()))?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                tracing::info!(%city, error = %err, "lookup failed");
                writeln!(out, "{}", self.renderer.error(&err.to_string()))?;
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<ExitCode> {
    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_owned());
    }

    let start = match config.units() {
        Units::Metric => 0,
        Units::Imperial => 1,
    };
    let units = inquire::Select::new("Default units:", vec![Units::Metric, Units::Imperial])
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read default units")?;
    config.default_units = Some(units);

    let current_city = config.default_city.clone().unwrap_or_default();
    let city = inquire::Text::new("Default city (used when detection fails):")
        .with_default(&current_city)
        .prompt()
        .context("Failed to read default city")?;
    config.default_city = Some(city.trim().to_owned()).filter(|c| !c.is_empty());

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::{
        future::ready,
        sync::{
            Mutex,
            atomic::{AtomicBool, Ordering},
        },
    };
    use weather_core::{CurrentConditions, Error, ForecastEntry, Timed};

    #[derive(Debug, Default)]
    struct FakeProvider {
        lookups: Mutex<Vec<(String, Units)>>,
    }

    impl FakeProvider {
        fn lookups(&self) -> Vec<(String, Units)> {
            self.lookups.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn current(
            &self,
            city: &str,
            units: Units,
        ) -> weather_core::Result<Timed<CurrentConditions>> {
            self.lookups.lock().unwrap().push((city.to_owned(), units));
            if city == "Atlantis" {
                return Err(Error::CityNotFound(Some("city not found".into())));
            }
            let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
            Ok(Timed {
                value: CurrentConditions {
                    city: city.to_owned(),
                    country: "FR".into(),
                    condition: "Clear".into(),
                    description: "clear sky".into(),
                    observed_at: at,
                    utc_offset_secs: 3600,
                    temperature: 14.0,
                    feels_like: 13.2,
                    humidity_pct: 55,
                    pressure_hpa: 1019,
                    wind_speed: 3.1,
                    visibility_m: 10_000,
                    clouds_pct: 0,
                    sunrise: at,
                    sunset: at,
                },
                latency_ms: 10,
            })
        }

        async fn forecast(
            &self,
            _city: &str,
            _units: Units,
        ) -> weather_core::Result<Timed<Vec<ForecastEntry>>> {
            Ok(Timed {
                value: Vec::new(),
                latency_ms: 5,
            })
        }
    }

    fn exit_failed(code: ExitCode) -> bool {
        format!("{code:?}") == format!("{:?}", ExitCode::FAILURE)
    }

    async fn run_show(
        provider: &FakeProvider,
        config: &Config,
        city: Option<&str>,
        detected: Option<&str>,
    ) -> (anyhow::Result<ExitCode>, String) {
        let lookup = Lookup {
            provider,
            config,
            renderer: Renderer::new(false),
            args: LookupArgs {
                units: None,
                days: DEFAULT_DAYS,
            },
        };
        let mut out = Vec::new();
        let code = lookup
            .show(
                city.map(str::to_owned),
                ready(detected.map(str::to_owned)),
                &mut out,
            )
            .await;
        (code, String::from_utf8(out).expect("utf-8 output"))
    }

    fn config_with_default_city(city: &str) -> Config {
        Config {
            default_city: Some(city.into()),
            default_units: Some(Units::Imperial),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn explicit_city_skips_detection() {
        let provider = FakeProvider::default();
        let config = config_with_default_city("Oslo");
        let polled = AtomicBool::new(false);
        let lookup = Lookup {
            provider: &provider,
            config: &config,
            renderer: Renderer::new(false),
            args: LookupArgs {
                units: Some(Units::Metric),
                days: DEFAULT_DAYS,
            },
        };

        let mut out = Vec::new();
        let code = lookup
            .show(
                Some("Paris".into()),
                async {
                    polled.store(true, Ordering::SeqCst);
                    Some("Lyon".to_owned())
                },
                &mut out,
            )
            .await
            .expect("lookup runs");

        assert!(!exit_failed(code));
        assert!(!polled.load(Ordering::SeqCst));
        assert_eq!(provider.lookups(), vec![("Paris".to_owned(), Units::Metric)]);
        assert!(String::from_utf8(out).unwrap().contains("Paris, FR"));
    }

    #[tokio::test]
    async fn blank_city_falls_back_to_detection() {
        let provider = FakeProvider::default();

        let (code, out) =
            run_show(&provider, &config_with_default_city("Oslo"), Some("  "), Some("Lyon")).await;

        assert!(!exit_failed(code.expect("lookup runs")));
        assert_eq!(provider.lookups(), vec![("Lyon".to_owned(), Units::Imperial)]);
        assert!(out.contains("Lyon, FR"));
        assert!(out.contains("Units: imperial"));
    }

    #[tokio::test]
    async fn undetected_city_uses_configured_default() {
        let provider = FakeProvider::default();

        let (code, _) = run_show(&provider, &config_with_default_city("Oslo"), None, None).await;

        assert!(!exit_failed(code.expect("lookup runs")));
        assert_eq!(provider.lookups(), vec![("Oslo".to_owned(), Units::Imperial)]);
    }

    #[tokio::test]
    async fn no_city_anywhere_is_a_hint_error() {
        let provider = FakeProvider::default();

        let (code, out) = run_show(&provider, &Config::default(), None, None).await;

        let err = code.unwrap_err().to_string();
        assert!(err.starts_with("Could not detect your city."));
        assert!(err.contains("weather show London"));
        assert!(out.is_empty());
        assert!(provider.lookups().is_empty());
    }

    #[tokio::test]
    async fn failed_lookup_prints_error_panel_and_fails() {
        let provider = FakeProvider::default();

        let (code, out) = run_show(&provider, &Config::default(), Some("Atlantis"), None).await;

        assert!(exit_failed(code.expect("error is rendered, not returned")));
        assert!(out.contains("Weather Data Unavailable"));
        assert!(out.contains("Error: city not found"));
    }

    #[test]
    fn configure_starts_from_defaults_when_file_is_broken() {
        let config = config_or_default(Err(anyhow!("Failed to parse config file: config.toml")));
        assert_eq!(config, Config::default());

        let stored = config_with_default_city("Oslo");
        assert_eq!(config_or_default(Ok(stored.clone())), stored);
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["weather"]).expect("parses");
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn show_accepts_city_units_and_days() {
        let cli = Cli::try_parse_from([
            "weather", "show", "New York", "--units", "imperial", "--days", "2", "--no-color",
        ])
        .expect("parses");

        assert!(cli.no_color);
        match cli.command {
            Some(Command::Show { city, lookup }) => {
                assert_eq!(city.as_deref(), Some("New York"));
                assert_eq!(lookup.units, Some(Units::Imperial));
                assert_eq!(lookup.days, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_defaults_to_three_days_without_city() {
        let cli = Cli::try_parse_from(["weather", "show"]).expect("parses");
        match cli.command {
            Some(Command::Show { city, lookup }) => {
                assert!(city.is_none());
                assert!(lookup.units.is_none());
                assert_eq!(lookup.days, DEFAULT_DAYS);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_units() {
        let err =
            Cli::try_parse_from(["weather", "show", "Oslo", "--units", "kelvin"]).unwrap_err();
        assert!(err.to_string().contains("Unknown unit system"));
    }

    #[test]
    fn debug_flag_is_global() {
        let cli = Cli::try_parse_from(["weather", "interactive", "--debug"]).expect("parses");
        assert!(cli.debug);
        assert!(matches!(cli.command, Some(Command::Interactive(_))));
    }
}
