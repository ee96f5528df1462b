//! Session-based client for the inverter vendor cloud.
//!
//! The vendor keeps the session in a cookie, so one [`reqwest::Client`] with a
//! cookie store is reused for login, query and logout.

use crate::{
    api::types::{LoginResponse, SnapshotResponse},
    config::ApiConfig,
    core::telemetry::TelemetrySource,
    entities::Snapshot,
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use std::{env, fmt, time::Duration};
use tracing::{debug, error, info, instrument, trace};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of [`TelemetrySource`].
#[derive(Clone)]
pub struct VendorClient {
    base_url: String,
    plant_id: String,
    username: String,
    password: String,
    client: Client,
}

impl fmt::Debug for VendorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorClient")
            .field("base_url", &self.base_url)
            .field("plant_id", &self.plant_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl VendorClient {
    /// Creates a client for the plant described by `config`.
    pub fn new(
        config: &ApiConfig,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            plant_id: config.plant_id.clone(),
            username: username.into(),
            password: password.into(),
            client,
        })
    }

    /// Creates a client with credentials from `SOLAR_API_USERNAME` / `SOLAR_API_PASSWORD`.
    pub fn from_env(config: &ApiConfig) -> Result<Self> {
        let username = env::var("SOLAR_API_USERNAME")
            .inspect_err(|e| error!("SOLAR_API_USERNAME not found: {}", e))?;
        let password = env::var("SOLAR_API_PASSWORD")
            .inspect_err(|e| error!("SOLAR_API_PASSWORD not found: {}", e))?;

        info!("Initializing vendor client for plant {}", config.plant_id);
        Self::new(config, username, password)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Maps non-success statuses to connectivity errors.
async fn check_status(response: Response, action: &str) -> Result<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!("Vendor rejected credentials during {}", action);
            Err(Error::Connectivity {
                message: format!("{action}: authentication rejected"),
            })
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            error!("Vendor returned {} during {}: {}", status, action, body);
            Err(Error::Connectivity {
                message: format!("{action}: HTTP {status}"),
            })
        }
    }
}

#[async_trait]
impl TelemetrySource for VendorClient {
    #[instrument(skip(self))]
    async fn login(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("/login"))
            .form(&[
                ("account", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;
        let body: LoginResponse = check_status(response, "login").await?.json().await?;

        if body.result != 1 {
            let reason = body.msg.unwrap_or_else(|| "unknown reason".to_string());
            error!("Vendor login refused: {}", reason);
            return Err(Error::Connectivity {
                message: format!("login refused: {reason}"),
            });
        }
        debug!("Vendor session opened");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_snapshot(&self, date: NaiveDate) -> Result<Snapshot> {
        let url = self.url(&format!("/plants/{}/snapshot", self.plant_id));
        let response = self
            .client
            .get(&url)
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?;
        let body: SnapshotResponse = check_status(response, "snapshot").await?.json().await?;
        trace!("Snapshot payload for {}: {:?}", date, body);

        Snapshot::try_from(body)
    }

    async fn logout(&self) -> Result<()> {
        let response = self.client.get(self.url("/logout")).send().await?;
        check_status(response, "logout").await?;
        debug!("Vendor session closed");
        Ok(())
    }
}
