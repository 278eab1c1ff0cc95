//! Addressing for remote append logs.

use std::fmt;

use chrono::NaiveDate;

/// Container plus append-only object within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteAppendTarget {
    pub container_id: String,
    pub object_id: String,
}

impl RemoteAppendTarget {
    pub fn new(container_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            object_id: object_id.into(),
        }
    }

    /// Target whose object name is prefixed with `date` as `YYYY-MM-DD-`.
    ///
    /// The date is picked once at startup; the object is never rotated mid-run.
    pub fn dated(container_id: impl Into<String>, name: &str, date: NaiveDate) -> Self {
        Self::new(container_id, format!("{}-{}", date.format("%Y-%m-%d"), name))
    }

    /// Dated target for today's local date.
    pub fn for_today(container_id: impl Into<String>, name: &str) -> Self {
        Self::dated(container_id, name, chrono::Local::now().date_naive())
    }
}

impl fmt::Display for RemoteAppendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container_id, self.object_id)
    }
}
