// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration parsing and normalization for TTL/timeout options
//!
//! Every primitive that accepts a time option routes it through this module
//! exactly once, at construction time. Adapters only ever see resolved
//! `Duration` values, never unparsed strings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error for a duration string that does not match the grammar
#[derive(Debug, Error)]
#[error("invalid duration '{input}'")]
pub struct ParseError {
    /// The original, unnormalized input
    pub input: String,
    #[source]
    source: humantime::DurationError,
}

/// A duration given as raw milliseconds or a human-readable string
///
/// `0` means "no limit" wherever a `TimeValue` is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Millis(u64),
    Text(String),
}

impl TimeValue {
    /// Normalize to milliseconds
    ///
    /// Numeric input passes through unchanged; strings are parsed against
    /// the humantime grammar ("250ms", "2 minutes", "1 week").
    pub fn to_millis(&self) -> Result<u64, ParseError> {
        match self {
            TimeValue::Millis(ms) => Ok(*ms),
            TimeValue::Text(input) => {
                // humantime wants "2min"; tolerate "2 minutes" by squeezing
                // out whitespace before parsing
                let squeezed: String = input.split_whitespace().collect();
                humantime::parse_duration(&squeezed)
                    .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                    .map_err(|source| ParseError {
                        input: input.clone(),
                        source,
                    })
            }
        }
    }
}

impl From<u64> for TimeValue {
    fn from(ms: u64) -> Self {
        TimeValue::Millis(ms)
    }
}

impl From<&str> for TimeValue {
    fn from(text: &str) -> Self {
        TimeValue::Text(text.to_string())
    }
}

impl From<String> for TimeValue {
    fn from(text: String) -> Self {
        TimeValue::Text(text)
    }
}

impl From<Duration> for TimeValue {
    fn from(duration: Duration) -> Self {
        TimeValue::Millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Parse an optional duration value
///
/// Absent input stays absent so callers can apply their own defaults.
pub fn parse(value: Option<&TimeValue>) -> Result<Option<u64>, ParseError> {
    value.map(TimeValue::to_millis).transpose()
}

/// TTL and timeout options accepted by lock items
///
/// Absent fields fall back to the caller's defaults; an explicit `0` is
/// preserved and means "no limit".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOptions {
    pub ttl: Option<TimeValue>,
    pub timeout: Option<TimeValue>,
}

impl TimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, value: impl Into<TimeValue>) -> Self {
        self.ttl = Some(value.into());
        self
    }

    pub fn with_timeout(mut self, value: impl Into<TimeValue>) -> Self {
        self.timeout = Some(value.into());
        self
    }

    /// Resolve both fields exactly once, substituting `defaults` for absent
    /// ones
    pub fn resolve(
        &self,
        defaults: ResolvedTimeOptions,
    ) -> Result<ResolvedTimeOptions, ParseError> {
        Ok(ResolvedTimeOptions {
            ttl: resolve_field(self.ttl.as_ref(), defaults.ttl)?,
            timeout: resolve_field(self.timeout.as_ref(), defaults.timeout)?,
        })
    }
}

fn resolve_field(value: Option<&TimeValue>, default: Duration) -> Result<Duration, ParseError> {
    Ok(match value {
        Some(v) => Duration::from_millis(v.to_millis()?),
        None => default,
    })
}

/// Fully-resolved time options; `Duration::ZERO` means "no limit"
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedTimeOptions {
    pub ttl: Duration,
    pub timeout: Duration,
}

impl ResolvedTimeOptions {
    pub const NO_LIMIT: ResolvedTimeOptions = ResolvedTimeOptions {
        ttl: Duration::ZERO,
        timeout: Duration::ZERO,
    };
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
