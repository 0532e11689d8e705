//! String `format` checks. Unknown formats always pass.

use chrono::{DateTime, NaiveDate};
use url::Url;
use uuid::Uuid;

pub(crate) fn matches(format: &str, value: &str) -> bool {
  match format {
    "email" => is_email(value),
    "uri" | "url" => is_uri(value),
    "date-time" => DateTime::parse_from_rfc3339(value).is_ok(),
    "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
    "uuid" => Uuid::parse_str(value).is_ok(),
    _ => true,
  }
}

fn is_email(value: &str) -> bool {
  if value.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = value.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
}

fn is_uri(value: &str) -> bool {
  !value.chars().any(char::is_whitespace) && Url::parse(value).is_ok()
}
