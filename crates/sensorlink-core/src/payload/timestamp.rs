use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// ISO-8601 in UTC with millisecond precision, e.g. `2023-11-14T22:13:20.000Z`.
const ISO8601_MILLIS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Render epoch seconds as an ISO-8601 UTC string.
///
/// Returns `None` when the value does not fit a calendar date.
pub(crate) fn render_iso8601(seconds: u64) -> Option<String> {
    let seconds = i64::try_from(seconds).ok()?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()
        .and_then(|dt| dt.format(ISO8601_MILLIS).ok())
}

#[cfg(test)]
mod tests {
    use super::render_iso8601;

    #[test]
    fn renders_epoch() {
        assert_eq!(
            render_iso8601(0).as_deref(),
            Some("1970-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn renders_with_milliseconds() {
        assert_eq!(
            render_iso8601(1_700_000_000).as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
    }

    #[test]
    fn rejects_values_past_year_9999() {
        assert_eq!(render_iso8601(253_402_300_800), None);
        assert_eq!(render_iso8601(u64::MAX), None);
    }
}
