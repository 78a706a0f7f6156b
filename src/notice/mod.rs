//! Notices, their wire format, the list client that fetches them and the
//! rules deciding which are shown.

pub mod api_types;
pub mod client;
pub mod eligibility;
pub mod types;

pub use client::{ListClient, NoticeSource};
pub use eligibility::{reduce, same_calendar_day, ViewerZone};
pub use types::{page_relative_path, Frequency, Notice};
