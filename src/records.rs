use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Closed set of domains partitioning tags. Drives visual grouping and
/// the category summary chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Language,
    Frontend,
    Backend,
    Database,
    Infrastructure,
    Practice,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Language,
        Category::Frontend,
        Category::Backend,
        Category::Database,
        Category::Infrastructure,
        Category::Practice,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Database => "database",
            Self::Infrastructure => "infrastructure",
            Self::Practice => "practice",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "language" => Ok(Self::Language),
            "frontend" => Ok(Self::Frontend),
            "backend" => Ok(Self::Backend),
            "database" => Ok(Self::Database),
            "infrastructure" => Ok(Self::Infrastructure),
            "practice" => Ok(Self::Practice),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// A named, categorized label on a record. A tag with a `parent` folds
/// into the parent's aggregate for sizing and layout while staying
/// distinct for exact-match search.
#[derive(Clone, Debug, Deserialize)]
pub struct Tag {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub parent: Option<String>,
}

impl Tag {
    /// The single canonicalization point for parent/child folding:
    /// every aggregation site goes through this, case-preserving.
    pub fn effective_name(&self) -> &str {
        self.parent.as_deref().unwrap_or(&self.name)
    }
}

/// One immutable entry in the dataset. `end == None` means the entry is
/// ongoing.
#[derive(Clone, Debug, Deserialize)]
pub struct Record {
    pub id: String,
    pub role: String,
    pub organization: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub stack_note: Option<String>,
    pub tags: Vec<Tag>,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl Record {
    pub fn effective_end(&self, now: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(now)
    }

    /// Duration in whole months, inclusive: a record that starts and
    /// ends in the same month counts as one month, not zero.
    pub fn active_months(&self, now: NaiveDate) -> i64 {
        months_between(self.start, self.effective_end(now)) + 1
    }

    /// Free-text fields subject to query matching. `stack_note` is the
    /// raw stack field handled by its own view and is deliberately
    /// absent here.
    pub fn search_fields(&self) -> impl Iterator<Item = &str> {
        [
            self.role.as_str(),
            self.organization.as_str(),
            self.summary.as_str(),
        ]
        .into_iter()
        .chain(self.highlights.iter().map(String::as_str))
    }

    pub fn has_tag_in(&self, category: Category) -> bool {
        self.tags.iter().any(|tag| tag.category == category)
    }
}

/// Whole calendar months from `start` to `end`, ignoring day-of-month.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (i64::from(end.year()) * 12 + i64::from(end.month0()))
        - (i64::from(start.year()) * 12 + i64::from(start.month0()))
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid dataset: {0}")]
    Invalid(String),
}

/// Parse and validate a JSON record dataset.
pub fn parse_records(raw: &str) -> Result<Vec<Record>, DatasetError> {
    let records: Vec<Record> = serde_json::from_str(raw)?;

    let mut seen = HashSet::new();
    for record in &records {
        if record.id.trim().is_empty() {
            return Err(DatasetError::Invalid("record with empty id".to_owned()));
        }
        if !seen.insert(record.id.as_str()) {
            return Err(DatasetError::Invalid(format!(
                "duplicate record id: {}",
                record.id
            )));
        }
        if let Some(end) = record.end
            && end < record.start
        {
            return Err(DatasetError::Invalid(format!(
                "record {} ends before it starts",
                record.id
            )));
        }
    }

    Ok(records)
}

/// Load the immutable record dataset. Called once at process start;
/// everything downstream treats the result as read-only.
pub fn load_records(path: &Path) -> Result<Vec<Record>, DatasetError> {
    let raw = fs::read_to_string(path)?;
    let records = parse_records(&raw)?;

    let tag_count = records.iter().map(|record| record.tags.len()).sum::<usize>();
    info!(
        records = records.len(),
        tags = tag_count,
        "loaded record dataset"
    );

    Ok(records)
}
