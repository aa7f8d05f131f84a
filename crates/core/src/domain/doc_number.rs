use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

const SEQUENCE_WIDTH: usize = 4;

/// Document number of the form `<prefix><YY><MM><sequence>`, e.g. `PQ24110026`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocNumber(pub String);

impl DocNumber {
    /// The period part shared by every number issued in the month of `at`.
    pub fn period_prefix(prefix: &str, at: DateTime<Utc>) -> String {
        format!("{prefix}{:02}{:02}", at.year().rem_euclid(100), at.month())
    }

    pub fn compose(prefix: &str, at: DateTime<Utc>, sequence: u32) -> Self {
        Self(format!(
            "{}{sequence:0width$}",
            Self::period_prefix(prefix, at),
            width = SEQUENCE_WIDTH
        ))
    }

    /// Sequence component, given the period prefix it was issued under.
    pub fn sequence(&self, period_prefix: &str) -> Option<u32> {
        let rest = self.0.strip_prefix(period_prefix)?;
        if rest.len() < SEQUENCE_WIDTH || !rest.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
