use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::ACCEPT;
use url::Url;

use crate::config::Config;
use crate::error::FetchError;
use crate::notice::api_types::ApiListItemsResponse;
use crate::notice::types::Notice;

/// List the notices are read from when none is configured.
pub const DEFAULT_LIST_TITLE: &str = "Coachmarks";

/// Upper bound on items returned by one query.
pub const MAX_ITEMS: u32 = 5000;

const SELECT: &str = "Id,Title,Description,Frequency,Enabled,ElementID,PageList";
const ORDER_BY: &str = "StartDate asc";

/// Anything that can produce the notices currently active for a site.
#[async_trait]
pub trait NoticeSource: Send + Sync {
  /// Fetch notices whose validity window contains `now`, ordered by start date.
  async fn fetch_active_notices(
    &self,
    site_url: &str,
    now: DateTime<Utc>,
  ) -> Result<Vec<Notice>, FetchError>;
}

/// SharePoint list REST client
#[derive(Clone)]
pub struct ListClient {
  http: reqwest::Client,
  list_title: String,
  token: Option<String>,
}

impl ListClient {
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_list(&config.site.list_title, Config::get_token())
  }

  pub fn with_list(list_title: &str, token: Option<String>) -> Result<Self> {
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      list_title: list_title.to_string(),
      token,
    })
  }

  /// Build the list items query for the validity window at `now`.
  pub fn items_url(&self, site_url: &str, now: DateTime<Utc>) -> Result<Url, FetchError> {
    let invalid = |e: url::ParseError| FetchError::InvalidUrl {
      url: site_url.to_string(),
      message: e.to_string(),
    };

    let base = Url::parse(&format!("{}/", site_url.trim_end_matches('/'))).map_err(invalid)?;
    // OData string literals escape quotes by doubling them
    let title = self.list_title.replace('\'', "''");
    let mut url = base
      .join(&format!("_api/web/lists/getbytitle('{}')/items", title))
      .map_err(invalid)?;

    let now = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let filter = format!(
      "(StartDate le datetime'{}') and (EndDate ge datetime'{}')",
      now, now
    );
    url.set_query(Some(&format!(
      "$select={}&$filter={}&$orderby={}&$top={}",
      SELECT, filter, ORDER_BY, MAX_ITEMS
    )));

    Ok(url)
  }
}

#[async_trait]
impl NoticeSource for ListClient {
  async fn fetch_active_notices(
    &self,
    site_url: &str,
    now: DateTime<Utc>,
  ) -> Result<Vec<Notice>, FetchError> {
    let url = self.items_url(site_url, now)?;
    let url_text = url.to_string();
    let transport = |e: reqwest::Error| FetchError::Transport {
      url: url_text.clone(),
      message: e.to_string(),
    };

    let mut request = self
      .http
      .get(url)
      .header(ACCEPT, "application/json;odata=nometadata");
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
      });
    }

    let body = response.text().await.map_err(transport)?;
    let parsed: ApiListItemsResponse =
      serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(parsed.value.into_iter().map(Notice::from).collect())
  }
}
