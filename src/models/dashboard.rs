use serde::{Deserialize, Serialize};

use super::record::{KpiRecord, SortDirection, SortField};

/// Query parameters shared by the overview and leaderboard commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQueryParams {
    /// Period filter; the literal string "all" disables filtering.
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default)]
    pub sort_field: SortField,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

fn default_period() -> String {
    "all".to_string()
}

impl Default for DashboardQueryParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            sort_field: SortField::default(),
            sort_direction: SortDirection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position under the requested sort.
    pub rank: u32,
    #[serde(flatten)]
    pub record: KpiRecord,
}

/// Headline averages over the aggregated (one row per employee) set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub team_size: u32,
    pub avg_productivity: f64,
    pub avg_quality: f64,
    pub avg_attendance: f64,
    pub avg_final_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformerEntry {
    /// First name only, for compact chart axes.
    pub label: String,
    pub full_name: String,
    pub final_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricComparisonEntry {
    pub label: String,
    pub full_name: String,
    pub productivity: f64,
    pub quality: f64,
    pub attendance: f64,
}

/// Counts of employees per final-points band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTierBreakdown {
    /// finalPoints >= 90
    pub excellent: u32,
    /// 80 <= finalPoints < 90
    pub good: u32,
    /// 70 <= finalPoints < 80
    pub average: u32,
    /// finalPoints < 70
    pub needs_improvement: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    pub label: String,
    pub full_name: String,
    pub productivity: f64,
    pub quality: f64,
    pub final_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LateArrivalEntry {
    pub label: String,
    pub full_name: String,
    pub late_count: f64,
}

/// Team averages for one period, in first-appearance order of the periods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTrendPoint {
    pub period: String,
    pub avg_productivity: f64,
    pub avg_quality: f64,
    pub avg_attendance: f64,
    pub avg_final_points: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceHistogramBucket {
    pub range: String,
    /// Inclusive lower bound.
    pub min: f64,
    /// Exclusive upper bound.
    pub max: f64,
    pub count: u32,
}

/// Everything the dashboard screen renders, computed in one pass so the
/// charts never mix data from two different filter states.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverviewResponse {
    pub summary: KpiSummary,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub top_performers: Vec<TopPerformerEntry>,
    pub metric_comparison: Vec<MetricComparisonEntry>,
    pub performance_tiers: PerformanceTierBreakdown,
    pub quality_vs_productivity: Vec<ScatterPoint>,
    pub late_arrivals: Vec<LateArrivalEntry>,
    pub period_trend: Vec<PeriodTrendPoint>,
    pub attendance_histogram: Vec<AttendanceHistogramBucket>,
    pub periods: Vec<String>,
    pub generated_at: String,
}

/// Radar axes for the per-employee drill-down. All axes are on a 0-100
/// scale; punctuality is derived from the late count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRadar {
    pub productivity: f64,
    pub quality: f64,
    pub attendance: f64,
    pub punctuality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricDelta {
    pub metric: String,
    pub employee: f64,
    pub team_avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDetail {
    /// The employee's best period (highest final points, earliest wins ties).
    pub representative: KpiRecord,
    /// 1-based position among all employees by best final points; `None`
    /// when the employee is absent from the aggregated set.
    pub rank: Option<u32>,
    /// Share of employees ranked at or below this one, rounded; `None`
    /// whenever `rank` is.
    pub percentile: Option<u32>,
    pub radar: EmployeeRadar,
    pub vs_team: Vec<MetricDelta>,
    /// Every raw record for this employee, in dataset order.
    pub history: Vec<KpiRecord>,
}
