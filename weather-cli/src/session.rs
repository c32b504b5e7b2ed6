//! The interactive prompt loop.

use anyhow::Result;
use chrono::Utc;
use std::io::{BufRead, Write};
use weather_core::{Units, WeatherProvider, dashboard};

use crate::render::Renderer;

/// Suggested when neither geolocation nor the config provide a city.
pub const FALLBACK_CITY: &str = "London";

const QUIT_WORDS: [&str; 3] = ["q", "quit", "exit"];

pub struct Session<'a> {
    pub provider: &'a dyn WeatherProvider,
    pub renderer: Renderer,
    pub days: usize,
    pub default_units: Units,
}

impl Session<'_> {
    /// Asks for units once, then looks up cities until the user quits or
    /// input ends. `detect` is awaited after the units prompt.
    pub async fn run<R, W, F>(&self, mut input: R, mut out: W, detect: F) -> Result<()>
    where
        R: BufRead,
        W: Write,
        F: Future<Output = Option<String>>,
    {
        writeln!(out, "{}", self.renderer.heading("Weather Dashboard"))?;
        write!(out, "Units (metric/imperial) [{}]: ", self.default_units)?;
        out.flush()?;

        let units = match read_line(&mut input)? {
            Some(answer) if !answer.is_empty() => Units::parse_or_default(&answer),
            _ => self.default_units,
        };
        tracing::debug!(%units, "units selected");

        let suggested = detect.await.unwrap_or_else(|| FALLBACK_CITY.to_owned());

        loop {
            write!(out, "\nEnter city name (e.g. {suggested}) or 'q' to quit: ")?;
            out.flush()?;

            let Some(answer) = read_line(&mut input)? else {
                break;
            };
            if QUIT_WORDS.contains(&answer.to_lowercase().as_str()) {
                break;
            }
            let city = if answer.is_empty() {
                suggested.as_str()
            } else {
                answer.as_str()
            };

            match dashboard::load(self.provider, city, units, self.days).await {
                Ok(dash) => writeln!(out, "{}", self.renderer.dashboard(&dash, Utc::now()))?,
                Err(err) => {
                    tracing::info!(city, error = %err, "lookup failed");
                    writeln!(out, "{}", self.renderer.error(&err.to_string()))?;
                }
            }
        }

        writeln!(out, "\n{}", self.renderer.muted("Goodbye."))?;
        Ok(())
    }
}

/// Next trimmed line, or `None` once input is exhausted.
fn read_line(input: &mut impl BufRead) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}
