//! Best-effort city lookup from the caller's public IP address.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://ip-api.com/json/";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct IpLocator {
    url: String,
    http: Client,
}

impl IpLocator {
    pub fn new() -> crate::Result<Self> {
        let http = Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            url: DEFAULT_URL.to_owned(),
            http,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Returns the caller's city, or `None` if the lookup fails for any reason.
    pub async fn detect_city(&self) -> Option<String> {
        let res = match self.http.get(&self.url).send().await {
            Ok(res) => res,
            Err(err) => {
                tracing::debug!(error = %err, "IP geolocation request failed");
                return None;
            }
        };

        let status = res.status();
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!(error = %err, "IP geolocation body unreadable");
                return None;
            }
        };

        let city = city_from_body(status, &body);
        tracing::debug!(%status, ?city, "IP geolocation finished");
        city
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    city: Option<String>,
}

fn city_from_body(status: StatusCode, body: &str) -> Option<String> {
    if !status.is_success() {
        return None;
    }

    let parsed: IpApiResponse = serde_json::from_str(body).ok()?;
    if parsed.status.as_deref() == Some("fail") {
        return None;
    }

    parsed
        .city
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
}
