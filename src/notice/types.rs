use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How often a notice is shown again after the user acknowledged it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Frequency {
  /// Shown until acknowledged, then never again
  Once,
  /// Shown on every visit
  Always,
  /// Shown at most once per calendar day
  #[default]
  Daily,
}

impl Frequency {
  /// Parse a list value. Anything that is not `Once` or `Always` means daily.
  pub fn from_list_value(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      Some("Once") => Frequency::Once,
      Some("Always") => Frequency::Always,
      _ => Frequency::Daily,
    }
  }
}

impl<'de> Deserialize<'de> for Frequency {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(Frequency::from_list_value(value.as_deref()))
  }
}

impl fmt::Display for Frequency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Frequency::Once => "Once",
      Frequency::Always => "Always",
      Frequency::Daily => "Daily",
    };
    f.pad(s)
  }
}

/// A dismissible onboarding hint tied to a page element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
  #[serde(rename = "Id")]
  pub id: i64,
  #[serde(rename = "Title", default)]
  pub title: String,
  #[serde(rename = "Description", default)]
  pub description: String,
  #[serde(rename = "Frequency", default)]
  pub frequency: Frequency,
  #[serde(rename = "Enabled", default)]
  pub enabled: bool,
  /// Attribute selector of the anchor element
  #[serde(rename = "ElementID", default)]
  pub element_id: String,
  /// Semicolon-delimited page paths; `None` means every page
  #[serde(rename = "PageList", default)]
  pub page_list: Option<String>,
  /// Session-local display state
  #[serde(rename = "Visible", default = "default_visible")]
  pub visible: bool,
}

fn default_visible() -> bool {
  true
}

impl Notice {
  /// Whether this notice should appear on the page at `page_path`.
  ///
  /// `page_path` is the site-relative path of the page, as produced by
  /// [`page_relative_path`].
  pub fn applies_to_page(&self, page_path: &str) -> bool {
    match &self.page_list {
      None => true,
      Some(list) => list.split(';').any(|page| page == page_path),
    }
  }

  /// Hide the notice for the rest of the session.
  pub fn dismiss(&mut self) {
    self.visible = false;
  }
}

/// Strip the site URL from a page URL, leaving the site-relative path.
///
/// URLs that do not start with the site URL are returned unchanged.
pub fn page_relative_path<'a>(page_url: &'a str, site_url: &str) -> &'a str {
  let site_url = site_url.trim_end_matches('/');
  page_url.strip_prefix(site_url).unwrap_or(page_url)
}
