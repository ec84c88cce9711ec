//! HTTP status code → tag/field vocabulary.

use crate::measurement::{FieldValue, Fields, Tags};

/// The five status families. Codes outside 100–599 have no bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusBucket {
    Info,
    Success,
    Redirect,
    ClientError,
    ServerError,
}

impl StatusBucket {
    pub fn from_status(code: u16) -> Option<Self> {
        match code {
            100..=199 => Some(Self::Info),
            200..=299 => Some(Self::Success),
            300..=399 => Some(Self::Redirect),
            400..=499 => Some(Self::ClientError),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// Value of the `result` tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Redirect => "redirect",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }

    /// Counter field key, e.g. `"2xx"`.
    pub fn family(self) -> &'static str {
        match self {
            Self::Info => "1xx",
            Self::Success => "2xx",
            Self::Redirect => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::ClientError | Self::ServerError)
    }
}

/// Tags and fields derived from one response status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub tags: Tags,
    pub fields: Fields,
}

pub fn classify(status: u16) -> Classification {
    let mut out = Classification::default();

    out.tags.insert("status_code".into(), status.to_string());
    out.fields
        .insert("http_response_code".into(), FieldValue::from(status));

    // Out-of-range codes keep only the raw code.
    if let Some(bucket) = StatusBucket::from_status(status) {
        out.tags.insert("result".into(), bucket.as_str().into());
        out.fields.insert(bucket.family().into(), FieldValue::Integer(1));
        let outcome = if bucket.is_error() { "error" } else { "success" };
        out.fields.insert(outcome.into(), FieldValue::Integer(1));
    }

    out
}
