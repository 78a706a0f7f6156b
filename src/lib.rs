//! Onboarding notices ("coachmarks") for SharePoint sites.
//!
//! Notices are read from a SharePoint list, cached per site in local storage
//! and filtered against the user's acknowledgment history so that each one
//! is shown once, daily or always, as configured on the list item.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod notice;

pub use cache::{CacheSnapshot, NoticeCache, Scope};
pub use error::FetchError;
pub use notice::{Frequency, Notice};
