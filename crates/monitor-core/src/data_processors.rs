use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use crate::models::RawRecord;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses timestamps from the variety of formats found in revenue exports.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → ISO 8601 / RFC 3339 (including `Z`-suffix), common
    ///   date-time patterns, a compact `YYYYMMDD` date, or an all-digit unix
    ///   timestamp (CSV exports).
    /// * JSON number  → Unix timestamp (integer or float seconds).
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.trim()),
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0)
                } else {
                    n.as_f64().and_then(Self::from_float_secs)
                }
            }
            _ => None,
        }
    }

    fn from_float_secs(f: f64) -> Option<DateTime<Utc>> {
        if !f.is_finite() {
            return None;
        }
        // Floor plus a non-negative remainder keeps pre-epoch instants exact.
        let mut secs = f.floor() as i64;
        let mut nanos = (f.rem_euclid(1.0) * 1_000_000_000.0).round() as u32;
        if nanos >= 1_000_000_000 {
            secs = secs.checked_add(1)?;
            nanos = 0;
        }
        DateTime::from_timestamp(secs, nanos)
    }

    fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        if s.is_empty() {
            return None;
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            // Compact `YYYYMMDD` dates before epoch seconds.
            if s.len() == 8 {
                if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y%m%d") {
                    return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
                }
            }
            return s
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
        }

        // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d",
            "%Y/%m/%d",
            "%d/%m/%Y %H:%M:%S",
        ];

        for fmt in FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        warn!("could not parse timestamp string \"{}\"", s);
        None
    }
}

// ── ValueExtractor ────────────────────────────────────────────────────────────

/// Reads numeric revenue values from JSON numbers or formatted strings.
pub struct ValueExtractor;

impl ValueExtractor {
    /// Parse a finite `f64`.
    ///
    /// Strings may carry surrounding whitespace, a leading `$` and `,`
    /// thousands separators (`"$1,250.50"`). Non-finite results are rejected.
    pub fn parse(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let cleaned: String = s
                    .trim()
                    .trim_start_matches('$')
                    .chars()
                    .filter(|c| *c != ',')
                    .collect();
                cleaned.parse::<f64>().ok()
            }
            _ => None,
        }?;
        parsed.is_finite().then_some(parsed)
    }
}

// ── FieldLookup ───────────────────────────────────────────────────────────────

/// Resolves field names against a record, including dotted paths into
/// nested objects (`"metrics.revenue"`).
pub struct FieldLookup;

impl FieldLookup {
    /// Return the value stored under `field`.
    ///
    /// An exact key match wins over a dotted-path walk, so flat CSV headers
    /// that happen to contain dots still resolve.
    pub fn get<'a>(record: &'a RawRecord, field: &str) -> Option<&'a Value> {
        if let Some(v) = record.get(field) {
            return Some(v);
        }

        let mut parts = field.split('.');
        let first = record.get(parts.next()?)?;
        parts.try_fold(first, |current, key| match current {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
