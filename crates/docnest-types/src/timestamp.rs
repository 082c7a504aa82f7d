//! Timestamp fields in stored documents.
//!
//! Documents carry timestamps either as epoch milliseconds or as a stored
//! timestamp object `{ "seconds": i64, "nanos": u32 }`. A write can also
//! ask the driver to fill in its own clock by storing the server timestamp
//! sentinel; the driver replaces it with a timestamp object on write.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::TypeError;

/// Key of the marker object that stands for "use the server clock".
const SENTINEL_KEY: &str = "__docnest_sentinel__";
const SERVER_TIMESTAMP: &str = "serverTimestamp";

const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Input accepted by [`Timestamp::set`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampInput<'a> {
    Millis(i64),
    Text(&'a str),
}

impl From<i64> for TimestampInput<'_> {
    fn from(value: i64) -> Self {
        Self::Millis(value)
    }
}

impl<'a> From<&'a str> for TimestampInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

/// A stored timestamp with nanosecond precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanos: at.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos).single()
    }

    /// Milliseconds since the Unix epoch, or `None` if the value is out of
    /// range or `nanos` is not below one second.
    pub fn to_millis(&self) -> Option<i64> {
        if self.nanos >= NANOS_PER_SECOND {
            return None;
        }
        self.seconds
            .checked_mul(1000)?
            .checked_add(i64::from(self.nanos / 1_000_000))
    }

    /// The stored JSON form of this timestamp.
    pub fn to_value(&self) -> Value {
        json!({ "seconds": self.seconds, "nanos": self.nanos })
    }

    /// Value for a timestamp field about to be written.
    ///
    /// With no input (or an empty string) the server timestamp sentinel is
    /// returned. Millisecond values pass through; strings must parse as an
    /// integer number of milliseconds.
    pub fn set(value: Option<TimestampInput<'_>>) -> Result<Value, TypeError> {
        match value {
            None => Ok(Self::server_timestamp()),
            Some(TimestampInput::Text(s)) if s.is_empty() => Ok(Self::server_timestamp()),
            Some(TimestampInput::Millis(ms)) => Ok(Value::from(ms)),
            Some(TimestampInput::Text(s)) => parse_millis(s).map(Value::from),
        }
    }

    /// Read a timestamp field back as epoch milliseconds.
    pub fn format(value: &Value) -> Result<i64, TypeError> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(float_millis))
                .ok_or_else(|| TypeError::InvalidTimestamp(n.to_string())),
            Value::String(s) => parse_millis(s),
            Value::Object(_) => {
                let ts = serde_json::from_value::<Timestamp>(value.clone())
                    .map_err(|e| TypeError::InvalidTimestamp(e.to_string()))?;
                ts.to_millis()
                    .ok_or_else(|| TypeError::InvalidTimestamp(value.to_string()))
            }
            other => Err(TypeError::InvalidTimestamp(other.to_string())),
        }
    }

    /// The sentinel asking the driver to stamp the field at write time.
    pub fn server_timestamp() -> Value {
        let mut marker = Map::new();
        marker.insert(SENTINEL_KEY.into(), Value::from(SERVER_TIMESTAMP));
        Value::Object(marker)
    }

    pub fn is_server_timestamp(value: &Value) -> bool {
        match value {
            Value::Object(map) => {
                map.len() == 1
                    && map.get(SENTINEL_KEY).and_then(Value::as_str) == Some(SERVER_TIMESTAMP)
            }
            _ => false,
        }
    }
}

/// Whole milliseconds from a float, if it fits in an `i64`.
fn float_millis(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
}

fn parse_millis(s: &str) -> Result<i64, TypeError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| TypeError::InvalidTimestamp(s.to_string()))
}
