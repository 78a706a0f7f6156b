//! Serde-deserializable types matching SharePoint list item responses.
//!
//! SharePoint sends many properties beyond the projected ones; anything not
//! named here is dropped during deserialization.

use serde::Deserialize;

use super::types::{Frequency, Notice};

/// Response body of the list items endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiListItemsResponse {
  #[serde(default)]
  pub value: Vec<ApiNotice>,
}

#[derive(Debug, Deserialize)]
pub struct ApiNotice {
  #[serde(rename = "Id")]
  pub id: i64,
  #[serde(rename = "Title")]
  pub title: Option<String>,
  #[serde(rename = "Description")]
  pub description: Option<String>,
  #[serde(rename = "Frequency")]
  pub frequency: Option<String>,
  #[serde(rename = "Enabled", default)]
  pub enabled: Option<bool>,
  #[serde(rename = "ElementID")]
  pub element_id: Option<String>,
  #[serde(rename = "PageList")]
  pub page_list: Option<String>,
}

impl From<ApiNotice> for Notice {
  fn from(api: ApiNotice) -> Self {
    Notice {
      id: api.id,
      title: api.title.unwrap_or_default(),
      description: api.description.unwrap_or_default(),
      frequency: Frequency::from_list_value(api.frequency.as_deref()),
      enabled: api.enabled.unwrap_or(false),
      element_id: api.element_id.unwrap_or_default(),
      page_list: api.page_list,
      visible: true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BODY: &str = r#"{
    "odata.metadata": "https://contoso.sharepoint.com/_api/$metadata#SP.ListData.CoachmarksListItems",
    "value": [
      {
        "odata.type": "SP.Data.CoachmarksListItem",
        "Id": 4,
        "ID": 4,
        "Title": "New search box",
        "Description": "Search the whole tenant from here",
        "Frequency": "Once",
        "Enabled": true,
        "ElementID": "data-automation-id='search'",
        "PageList": "/SitePages/Home.aspx"
      },
      {
        "Id": 7,
        "Title": "Feedback",
        "Description": null,
        "Frequency": null,
        "Enabled": false,
        "ElementID": "id='feedback'",
        "PageList": null,
        "AuthorId": 11
      }
    ]
  }"#;

  #[test]
  fn test_parse_list_response_drops_unknown_fields() {
    let response: ApiListItemsResponse = serde_json::from_str(BODY).unwrap();
    let notices: Vec<Notice> = response.value.into_iter().map(Notice::from).collect();

    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].id, 4);
    assert_eq!(notices[0].frequency, Frequency::Once);
    assert!(notices[0].enabled);
    assert_eq!(notices[0].page_list.as_deref(), Some("/SitePages/Home.aspx"));

    assert_eq!(notices[1].id, 7);
    assert_eq!(notices[1].description, "");
    assert_eq!(notices[1].frequency, Frequency::Daily);
    assert!(!notices[1].enabled);
    assert_eq!(notices[1].page_list, None);
  }

  #[test]
  fn test_every_fetched_notice_is_visible() {
    let response: ApiListItemsResponse = serde_json::from_str(BODY).unwrap();
    assert!(response.value.into_iter().map(Notice::from).all(|n| n.visible));
  }

  #[test]
  fn test_missing_value_is_empty() {
    let response: ApiListItemsResponse = serde_json::from_str("{}").unwrap();
    assert!(response.value.is_empty());
  }
}
