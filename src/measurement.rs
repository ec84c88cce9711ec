//! Measurement record and the message builder that stamps it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::error::{ObservabilityError, Result};

// ─── Field values ────────────────────────────────────────────────

/// A measured dimension: integer, float or boolean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Integer(v) => Some(v as f64),
            FieldValue::Float(v) => Some(v),
            FieldValue::Boolean(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            FieldValue::Boolean(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Integer(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, FieldValue>;

// ─── Measurement ─────────────────────────────────────────────────

/// One timestamped observation, shaped the way the sink receives it:
/// `{measurement, time, tags, fields}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    #[serde(rename = "measurement")]
    pub name: String,
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Utc>,
    pub tags: Tags,
    pub fields: Fields,
}

fn serialize_time<S: Serializer>(time: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&iso8601(time))
}

/// ISO-8601 with an explicit `+00:00` offset.
pub fn iso8601(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

impl Measurement {
    /// Message builder: `tags = {host}` (+ `user`), no fields, stamped now.
    pub fn build(
        name: &str,
        host: &str,
        identity: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(ObservabilityError::InvalidArgument(
                "measurement name must not be empty".into(),
            ));
        }

        let mut tags = Tags::new();
        tags.insert("host".into(), host.to_owned());
        if let Some(user) = identity {
            tags.insert("user".into(), user.to_owned());
        }

        Ok(Self {
            name: name.to_owned(),
            time: clock.now(),
            tags,
            fields: Fields::new(),
        })
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn merge_tags<I, K, V>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn merge_fields<I, K, V>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Wire payload as sent to the sink, also used by the capture snapshot.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

// ─── Clock ───────────────────────────────────────────────────────

/// Source of "now" for message timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Frozen clock for exact-match assertions in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
