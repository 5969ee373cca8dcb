use crate::config::Config;
use crate::listings::api_types::{decode_rows, RawListing};
use crate::sync::ListingSource;
use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use tracing::debug;
use url::Url;

/// HTTP client for the hosted listings backend
#[derive(Clone)]
pub struct BackendClient {
  http: reqwest::Client,
  listings_url: Url,
  api_key: String,
}

impl BackendClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_key()?;
    let listings_url = listings_endpoint(&config.backend.url, &config.backend.listings_table)?;

    let http = reqwest::Client::builder()
      .timeout(config.backend.request_timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      listings_url,
      api_key,
    })
  }

  /// Fetch every listing row in a single request
  pub async fn fetch_listings(&self) -> Result<Vec<RawListing>> {
    debug!(url = %self.listings_url, "Fetching listings");

    let response = self
      .http
      .get(self.listings_url.clone())
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch listings: {}", e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Listings request failed with {}: {}", status, body.trim()));
    }

    // Only a body that isn't a JSON array fails the load; bad rows are skipped
    let rows = response
      .json::<Vec<serde_json::Value>>()
      .await
      .map_err(|e| eyre!("Failed to parse listings: {}", e))?;
    Ok(decode_rows(rows))
  }
}

impl ListingSource for BackendClient {
  fn fetch_all(&self) -> impl Future<Output = Result<Vec<RawListing>>> + Send {
    self.fetch_listings()
  }
}

/// Build `{base}/rest/v1/{table}?select=*`, tolerating a missing trailing slash.
fn listings_endpoint(base: &str, table: &str) -> Result<Url> {
  let mut base = Url::parse(base.trim()).map_err(|e| eyre!("Invalid backend url {}: {}", base, e))?;
  if !base.path().ends_with('/') {
    let path = format!("{}/", base.path());
    base.set_path(&path);
  }

  let mut url = base
    .join(&format!("rest/v1/{}", table.trim_matches('/')))
    .map_err(|e| eyre!("Invalid listings table {}: {}", table, e))?;
  url.query_pairs_mut().append_pair("select", "*");
  Ok(url)
}
