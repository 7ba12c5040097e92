use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::StoreError;

/// A `year/month` bucket of documents.
///
/// Ordering is chronological. The textual form is `YYYY/MM`, which is also the
/// relative directory of the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Partition {
    year: i32,
    month: u32,
}

impl Partition {
    pub fn new(year: i32, month: u32) -> Result<Self, StoreError> {
        if !(0..=9999).contains(&year) {
            return Err(StoreError::Partition(format!("year out of range: {}", year)));
        }
        if !(1..=12).contains(&month) {
            return Err(StoreError::Partition(format!("month out of range: {}", month)));
        }
        Ok(Self { year, month })
    }

    /// The partition a document created at `at` belongs to
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Directory of this partition relative to the collection base
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(format!("{:04}", self.year)).join(format!("{:02}", self.month))
    }

    /// Parse on-disk directory names; anything that is not `YYYY` / `MM` is ignored
    pub(crate) fn from_dir_names(year: &str, month: &str) -> Option<Self> {
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?).ok()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month)
    }
}

impl FromStr for Partition {
    type Err = StoreError;

    /// Accepts `YYYY/MM` or `YYYY-MM`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('/')
            .or_else(|| s.split_once('-'))
            .ok_or_else(|| StoreError::Partition(format!("expected YYYY/MM, got {:?}", s)))?;
        Self::from_dir_names(year, month)
            .ok_or_else(|| StoreError::Partition(format!("expected YYYY/MM, got {:?}", s)))
    }
}

impl Serialize for Partition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Partition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
