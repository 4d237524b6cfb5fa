//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An owning account or import channel for transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub source_id: i64,
    /// Organizational unit assigned by rules or manual edit
    pub unit_id: Option<i64>,
    /// Category assigned by rules or manual edit
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = outflow, positive = inflow
    pub amount: f64,
    /// Category label as provided by the bank export, if any
    pub source_category: Option<String>,
    /// Identity digest for duplicate detection (16 lowercase hex chars)
    pub fingerprint: Option<String>,
    /// Excluded from reports when set
    pub ignored: bool,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// A transaction payload ready for insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub source_id: i64,
    pub unit_id: Option<i64>,
    pub category_id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub source_category: Option<String>,
    pub fingerprint: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A node in the category forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<i64>,
    /// Monthly budget in account currency; None = no budget set
    pub monthly_budget: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A flat organizational label (e.g. business vs. personal)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Which dimension a classification rule assigns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Unit,
    Category,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Category => "category",
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unit" => Ok(Self::Unit),
            "category" => Ok(Self::Category),
            _ => Err(format!("Unknown rule kind: {}", s)),
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction field a rule pattern is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    /// The source id, as a decimal string (unit rules)
    Source,
    /// The bank-provided category label (category rules)
    SourceCategory,
    /// The free-text description (either kind)
    Description,
}

impl RuleField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::SourceCategory => "source_category",
            Self::Description => "description",
        }
    }
}

impl std::str::FromStr for RuleField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "source_category" => Ok(Self::SourceCategory),
            "description" => Ok(Self::Description),
            _ => Err(format!("Unknown rule field: {}", s)),
        }
    }
}

impl std::fmt::Display for RuleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a rule pattern is matched against its target field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Contains,
    StartsWith,
    Regex,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::Regex => "regex",
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "regex" => Ok(Self::Regex),
            _ => Err(format!("Unknown match mode: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-authored classification rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub id: i64,
    pub kind: RuleKind,
    pub field: RuleField,
    pub mode: MatchMode,
    pub pattern: String,
    /// Unit id or category id depending on kind
    pub target_id: i64,
    /// Higher priority rules are evaluated first
    pub priority: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A rule before insertion
#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub kind: RuleKind,
    pub field: RuleField,
    pub mode: MatchMode,
    pub pattern: String,
    pub target_id: i64,
    pub priority: Option<i64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}
