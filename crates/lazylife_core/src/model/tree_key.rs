//! Storage keys for persisted item forests.
//!
//! # Invariants
//! - Actions have exactly one forest per user.
//! - Targets have one forest per (user, month bucket), where `None` holds
//!   items planned for no particular month.

use crate::model::journal::ActivityKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static MONTH_BUCKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").expect("valid month bucket regex"));

const FUTURE_BUCKET: &str = "future";

/// Rejected month bucket input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMonthBucket(pub String);

impl Display for InvalidMonthBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "month bucket must look like YYYY-MM, got `{}`", self.0)
    }
}

impl Error for InvalidMonthBucket {}

/// Validated `YYYY-MM` month bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthBucket(String);

impl MonthBucket {
    pub fn parse(value: &str) -> Result<Self, InvalidMonthBucket> {
        let trimmed = value.trim();
        if !MONTH_BUCKET_RE.is_match(trimmed) {
            return Err(InvalidMonthBucket(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which forest of a user is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TreeKind {
    Actions,
    Targets { bucket: Option<MonthBucket> },
}

impl TreeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Targets { .. } => "targets",
        }
    }

    /// Bucket column value; empty for action forests.
    pub fn bucket_key(&self) -> &str {
        match self {
            Self::Actions => "",
            Self::Targets { bucket: None } => FUTURE_BUCKET,
            Self::Targets {
                bucket: Some(bucket),
            } => bucket.as_str(),
        }
    }

    /// Rebuilds a kind from its stored `tree_kind` and `bucket` columns.
    pub fn from_columns(kind: &str, bucket: &str) -> Option<Self> {
        match (kind, bucket) {
            ("actions", "") => Some(Self::Actions),
            ("targets", FUTURE_BUCKET) => Some(Self::Targets { bucket: None }),
            ("targets", bucket) => MonthBucket::parse(bucket).ok().map(|bucket| Self::Targets {
                bucket: Some(bucket),
            }),
            _ => None,
        }
    }

    /// Journal entry kind for items archived from this forest.
    pub fn activity_kind(&self) -> ActivityKind {
        match self {
            Self::Actions => ActivityKind::Action,
            Self::Targets { .. } => ActivityKind::Target,
        }
    }
}

/// Composite natural key of one stored forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeKey {
    pub user_id: String,
    pub kind: TreeKind,
}

impl TreeKey {
    pub fn actions(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: TreeKind::Actions,
        }
    }

    pub fn targets(user_id: impl Into<String>, bucket: Option<MonthBucket>) -> Self {
        Self {
            user_id: user_id.into(),
            kind: TreeKind::Targets { bucket },
        }
    }
}

impl Display for TreeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TreeKind::Actions => write!(f, "{}/actions", self.user_id),
            kind => write!(f, "{}/targets/{}", self.user_id, kind.bucket_key()),
        }
    }
}
