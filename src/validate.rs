#![forbid(unsafe_code)]

// Test configuration validation - concurrency bound, headers, and JSON body

use crate::protocol::RequestBody;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("concurrency must be between {min} and {max}, got {value}", min = Concurrency::MIN, max = Concurrency::MAX)]
    ConcurrencyOutOfRange { value: i64 },
    #[error("request body is not valid JSON: {message}")]
    InvalidJsonBody { message: String },
    #[error("target endpoint must not be empty")]
    EmptyEndpoint,
    #[error("HTTP method must not be empty")]
    EmptyMethod,
}

/// Number of concurrent sessions in one run, always within [MIN, MAX].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concurrency(u32);

impl Concurrency {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 50;

    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::ConcurrencyOutOfRange { value: i64::from(value) })
        }
    }

    /// Snap an arbitrary requested value to the nearest bound, the way the
    /// input control does before anything is submitted.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u32)
    }

    /// One unit up; no-op at MAX.
    pub fn increment(self) -> Self {
        if self.0 < Self::MAX { Self(self.0 + 1) } else { self }
    }

    /// One unit down; no-op at MIN.
    pub fn decrement(self) -> Self {
        if self.0 > Self::MIN { Self(self.0 - 1) } else { self }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw operator input before validation
#[derive(Debug, Clone, Default)]
pub struct TestInput {
    pub concurrency: Concurrency,
    pub endpoint: String,
    pub method: String,
    /// Header rows in the order they were entered
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub end_flags: Vec<String>,
}

/// Configuration that passed validation and may be submitted
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    pub concurrency: Concurrency,
    pub endpoint: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
    pub end_flags: Vec<String>,
}

pub fn validate(input: TestInput) -> Result<TestConfig, ValidationError> {
    let endpoint = input.endpoint.trim().to_string();
    if endpoint.is_empty() {
        return Err(ValidationError::EmptyEndpoint);
    }

    let method = input.method.trim().to_ascii_uppercase();
    if method.is_empty() {
        return Err(ValidationError::EmptyMethod);
    }

    let body = parse_body(input.body)?;

    Ok(TestConfig {
        concurrency: input.concurrency,
        endpoint,
        method,
        headers: collect_headers(input.headers),
        body,
        end_flags: input.end_flags.into_iter().filter(|f| !f.is_empty()).collect(),
    })
}

/// Build the header map. Rows with an empty key or value are skipped; a later
/// row overwrites an earlier one with the same key.
pub fn collect_headers<I>(rows: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut headers = HashMap::new();
    for (key, value) in rows {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        headers.insert(key.to_string(), value.to_string());
    }
    headers
}

/// A blank body is forwarded as the raw string; anything else must be JSON.
pub fn parse_body(text: String) -> Result<RequestBody, ValidationError> {
    if text.trim().is_empty() {
        return Ok(RequestBody::Raw(text));
    }
    serde_json::from_str(&text)
        .map(RequestBody::Json)
        .map_err(|e| ValidationError::InvalidJsonBody { message: e.to_string() })
}
