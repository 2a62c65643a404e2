use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Geographic level of an action plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanLevel {
    Country,
    Province,
    District,
}

impl fmt::Display for PlanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Country => "country",
            Self::Province => "province",
            Self::District => "district",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanLevel {
    type Err = PlanLevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "country" => Ok(Self::Country),
            "province" => Ok(Self::Province),
            "district" => Ok(Self::District),
            other => Err(PlanLevelParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanLevel`] string.
#[derive(Debug, Clone)]
pub struct PlanLevelParseError(pub String);

impl fmt::Display for PlanLevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid plan level: {:?}", self.0)
    }
}

impl std::error::Error for PlanLevelParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A financial year that plans are recorded against.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FinancialYear {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An organizational grouping of KPIs and stakeholders.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubCluster {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A key performance indicator, owned by one sub-cluster.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Kpi {
    pub id: i32,
    pub sub_cluster_id: i32,
    pub name: String,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stakeholder organization or contact.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stakeholder {
    pub id: i32,
    pub name: String,
    pub sub_cluster_id: Option<i32>,
    pub organization: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A planning record for one sub-cluster, year, and geographic scope.
///
/// `geo_id` identifies the country, province, or district named by
/// `plan_level`; there are no filler geo columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActionPlan {
    pub id: i32,
    pub year_id: i32,
    pub sub_cluster_id: i32,
    pub stakeholder_id: Option<i32>,
    pub plan_level: PlanLevel,
    pub geo_id: i32,
    pub document: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A planned target value for one KPI within one action plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KpiPlan {
    pub id: i32,
    pub action_plan_id: i32,
    pub kpi_id: i32,
    pub planned_value: f64,
    pub created_at: DateTime<Utc>,
}

/// One audit record: who did what to which entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<i32>,
    pub detail: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_level_display_roundtrip() {
        let variants = [PlanLevel::Country, PlanLevel::Province, PlanLevel::District];
        for v in &variants {
            let s = v.to_string();
            let parsed: PlanLevel = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn plan_level_invalid() {
        let result = "region".parse::<PlanLevel>();
        assert!(result.is_err());
    }

    #[test]
    fn plan_level_serde_uses_snake_case() {
        let json = serde_json::to_string(&PlanLevel::District).unwrap();
        assert_eq!(json, "\"district\"");
        let parsed: PlanLevel = serde_json::from_str("\"province\"").unwrap();
        assert_eq!(parsed, PlanLevel::Province);
    }
}
