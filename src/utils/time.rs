// src/utils/time.rs

//! Timestamp helpers.
//!
//! Cache timestamps are local wall-clock times written as
//! `YYYY-mm-dd HH:MM:SS.ffffff`, the format existing caches already use.

use chrono::{Local, NaiveDateTime};

/// Timestamp stored in `mtime` / `etime`.
pub type Timestamp = NaiveDateTime;

const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const READ_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const HISTORY_PREFIX_FORMAT: &str = "%Y%m%d-%H.%M.%S-";

/// Current local time, truncated to microseconds.
pub fn now() -> Timestamp {
    let now = Local::now().naive_local();
    parse(&format(&now)).unwrap_or(now)
}

/// Render a timestamp the way the cache stores it.
pub fn format(ts: &Timestamp) -> String {
    ts.format(WRITE_FORMAT).to_string()
}

/// Parse a cache timestamp; accepts space or `T` as date/time separator.
pub fn parse(s: &str) -> Option<Timestamp> {
    READ_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

/// Sortable, second-resolution prefix for history snapshot names.
pub fn history_prefix(ts: &Timestamp) -> String {
    ts.format(HISTORY_PREFIX_FORMAT).to_string()
}

/// Serializer for `Option<Timestamp>` fields. Reading goes through [`parse`].
pub mod stamp {
    use serde::Serializer;

    use super::Timestamp;

    pub fn serialize<S: Serializer>(ts: &Option<Timestamp>, ser: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => ser.serialize_str(&super::format(ts)),
            None => ser.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_cache_format() {
        let ts = parse("2024-03-01 08:15:42.123456").unwrap();
        assert_eq!(format(&ts), "2024-03-01 08:15:42.123456");
    }

    #[test]
    fn parses_without_fraction_and_with_t() {
        assert!(parse("2024-03-01 08:15:42").is_some());
        assert!(parse("2024-03-01T08:15:42.5").is_some());
        assert!(parse("yesterday").is_none());
    }

    #[test]
    fn history_prefix_sorts_lexicographically() {
        let earlier = history_prefix(&parse("2024-03-01 08:15:42").unwrap());
        let later = history_prefix(&parse("2024-11-01 08:15:42").unwrap());
        assert_eq!(earlier, "20240301-08.15.42-");
        assert!(earlier < later);
    }
}
