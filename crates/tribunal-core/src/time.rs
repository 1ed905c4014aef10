//! Local date-time values as exchanged with the case platform and the
//! scheduling system.
//!
//! Both systems send ISO-8601 date-times without an offset
//! (`2022-01-01T10:00:00`, optionally with fractional seconds).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::ModelError;

const WITH_SUBSECOND: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const WITHOUT_SUBSECOND: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDateTime(pub PrimitiveDateTime);

impl LocalDateTime {
    pub fn new(datetime: PrimitiveDateTime) -> Self {
        Self(datetime)
    }

    pub fn inner(&self) -> &PrimitiveDateTime {
        &self.0
    }

    pub fn into_inner(self) -> PrimitiveDateTime {
        self.0
    }

    /// Current wall-clock time in UTC with the offset dropped.
    pub fn now_utc() -> Self {
        let now = OffsetDateTime::now_utc();
        Self(PrimitiveDateTime::new(now.date(), now.time()))
    }
}

/// Whole seconds print without a fraction; anything finer keeps its digits.
impl fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = if self.0.nanosecond() == 0 {
            WITHOUT_SUBSECOND
        } else {
            WITH_SUBSECOND
        };
        let formatted = self.0.format(format).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for LocalDateTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveDateTime::parse(s, WITH_SUBSECOND)
            .or_else(|_| PrimitiveDateTime::parse(s, WITHOUT_SUBSECOND))
            .map(LocalDateTime)
            .map_err(|e| ModelError::InvalidDateTime(format!("'{s}': {e}")))
    }
}

impl Serialize for LocalDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LocalDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LocalDateTime::from_str(&s).map_err(serde::de::Error::custom)
    }
}
