//! Action plan management: scope resolution, creation inputs, joined
//! response shapes, and the service layer.

pub mod service;

use serde::{Deserialize, Serialize};

use stakmap_db::models::{ActionPlan, FinancialYear, PlanLevel, Stakeholder};

pub use service::{
    create_action_plan, delete_action_plan, get_action_plan_detail, search_action_plans,
    update_action_plan,
};

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Geographic scope of a plan: the level plus the one id that names it.
///
/// There is exactly one geo id per scope; no variant carries filler ids for
/// the other two levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanScope {
    Country(i32),
    Province(i32),
    District(i32),
}

impl PlanScope {
    /// The level of this scope.
    pub fn level(&self) -> PlanLevel {
        match self {
            Self::Country(_) => PlanLevel::Country,
            Self::Province(_) => PlanLevel::Province,
            Self::District(_) => PlanLevel::District,
        }
    }

    /// The id of the country, province, or district this scope names.
    pub fn geo_id(&self) -> i32 {
        match self {
            Self::Country(id) | Self::Province(id) | Self::District(id) => *id,
        }
    }

    /// Resolve a scope from a level plus the wire-format trio of optional
    /// geo ids. The id matching the level must be present; the other two
    /// are ignored.
    pub fn from_parts(
        level: PlanLevel,
        country_id: Option<i32>,
        province_id: Option<i32>,
        district_id: Option<i32>,
    ) -> Result<Self, String> {
        match level {
            PlanLevel::Country => country_id
                .map(Self::Country)
                .ok_or_else(|| "country_id is required when plan_level is country".to_owned()),
            PlanLevel::Province => province_id
                .map(Self::Province)
                .ok_or_else(|| "province_id is required when plan_level is province".to_owned()),
            PlanLevel::District => district_id
                .map(Self::District)
                .ok_or_else(|| "district_id is required when plan_level is district".to_owned()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Inputs for creating an action plan with its KPI plans.
#[derive(Debug, Clone)]
pub struct NewActionPlan {
    pub year_id: i32,
    pub sub_cluster_id: i32,
    pub stakeholder_id: Option<i32>,
    pub scope: PlanScope,
    pub document: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    /// Ordered, must be non-empty.
    pub kpi_plans: Vec<NewKpiPlan>,
}

/// One requested KPI target within a new action plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKpiPlan {
    pub kpi_id: i32,
    pub planned_value: f64,
}

/// Conjunctive search parameters for action plans.
///
/// `kpi_sub_cluster_id` matches plans with at least one KpiPlan whose KPI
/// belongs to that sub-cluster. `kpi_id` narrows the KpiPlans included in
/// each result; it does not filter the plans themselves.
#[derive(Debug, Clone, Default)]
pub struct ActionPlanSearch {
    pub year_id: Option<i32>,
    pub sub_cluster_id: Option<i32>,
    pub stakeholder_id: Option<i32>,
    pub scope: Option<PlanScope>,
    pub kpi_sub_cluster_id: Option<i32>,
    pub kpi_id: Option<i32>,
}

/// Optional field updates for an action plan.
///
/// Patching never touches KpiPlans and does not re-run the duplicate check.
#[derive(Debug, Clone, Default)]
pub struct ActionPlanUpdate {
    pub document: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub scope: Option<PlanScope>,
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// Sub-cluster reference carried on joined responses: id and name only.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubClusterRef {
    pub id: i32,
    pub name: String,
}

/// One KPI plan joined with its KPI.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct KpiPlanDetail {
    pub id: i32,
    pub kpi_id: i32,
    pub planned_value: f64,
    pub kpi_name: String,
    pub kpi_unit: Option<String>,
}

/// An action plan joined with its KPI plans, financial year, stakeholder,
/// and sub-cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ActionPlanDetail {
    #[serde(flatten)]
    pub plan: ActionPlan,
    pub year: FinancialYear,
    pub sub_cluster: SubClusterRef,
    pub stakeholder: Option<Stakeholder>,
    pub kpi_plans: Vec<KpiPlanDetail>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
