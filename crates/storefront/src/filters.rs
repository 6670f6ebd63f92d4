//! Askama filters shared by the page templates.

use std::fmt::Display;

/// The current year, for the footer.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// First block of a UUID, as staff read order numbers aloud.
///
/// Usage in templates: `{{ order.id|short_id }}` renders `#1a2b3c4d`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn short_id(id: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("#{}", short(&id.to_string())))
}

fn short(id: &str) -> &str {
    id.split('-').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_keeps_first_uuid_block() {
        assert_eq!(short("1a2b3c4d-0000-4000-8000-000000000000"), "1a2b3c4d");
        assert_eq!(short("plain"), "plain");
    }
}
