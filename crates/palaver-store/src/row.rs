//! Row-mapping helpers shared by the entity modules.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// RFC 3339 with fixed microsecond precision, so lexicographic comparison of
/// the TEXT column matches chronological order.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn ts_col(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_ts(s).map_err(|e| conversion(idx, e))
}

pub(crate) fn uuid_col(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| conversion(idx, e))
}

pub(crate) fn conversion(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn encoded_timestamps_sort_lexicographically() {
        let base = Utc::now();
        let earlier = encode_ts(&base);
        let later = encode_ts(&(base + Duration::milliseconds(1)));
        assert!(later > earlier);
    }
}
