use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::dashboard::{
    AttendanceHistogramBucket, DashboardOverviewResponse, DashboardQueryParams, EmployeeDetail,
    EmployeeRadar, KpiSummary, LateArrivalEntry, LeaderboardEntry, MetricComparisonEntry,
    MetricDelta, PerformanceTierBreakdown, PeriodTrendPoint, ScatterPoint, TopPerformerEntry,
};
use crate::models::record::{KpiRecord, SortDirection, SortField};
use crate::services::dataset_service::DatasetService;

const TOP_PERFORMERS_LIMIT: usize = 10;
const METRIC_COMPARISON_LIMIT: usize = 12;
const LATE_ARRIVALS_LIMIT: usize = 10;
const ALL_PERIODS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    revision: u64,
    period: String,
    sort_field: SortField,
    sort_direction: SortDirection,
}

/// Computes every chart projection the dashboard renders.
///
/// All projections for one request are derived from a single filtered and
/// aggregated snapshot, keyed by the dataset revision, so a cached hit can
/// never mix rows from two dataset states.
pub struct DashboardService {
    dataset: Arc<DatasetService>,
    cache: RwLock<HashMap<CacheKey, DashboardOverviewResponse>>,
}

impl DashboardService {
    pub fn new(dataset: Arc<DatasetService>) -> Self {
        Self {
            dataset,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn overview(
        &self,
        params: &DashboardQueryParams,
    ) -> AppResult<DashboardOverviewResponse> {
        let key = CacheKey {
            revision: self.dataset.revision(),
            period: params.period.clone(),
            sort_field: params.sort_field,
            sort_direction: params.sort_direction,
        };
        if let Some(hit) = self.try_get_cache(&key) {
            debug!(
                target: "app::dashboard",
                period = %key.period,
                "overview served from cache"
            );
            return Ok(hit);
        }

        let records = self.dataset.records()?;
        let response = build_overview(&records, params)?;
        self.insert_cache(key, response.clone());
        Ok(response)
    }

    pub fn leaderboard(
        &self,
        params: &DashboardQueryParams,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        let records = self.dataset.records()?;
        let aggregated = aggregate_by_employee(&filter_by_period(&records, &params.period));
        Ok(rank_leaderboard(
            aggregated,
            params.sort_field,
            params.sort_direction,
        ))
    }

    /// Drill-down for one employee. History always comes from the full
    /// dataset; rank and team averages respect the caller's filter/sort.
    pub fn employee_detail(
        &self,
        name: &str,
        params: &DashboardQueryParams,
    ) -> AppResult<EmployeeDetail> {
        let records = self.dataset.records()?;
        let history: Vec<KpiRecord> = records
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect();
        let representative = history
            .iter()
            .cloned()
            .reduce(|best, next| {
                if next.final_points > best.final_points {
                    next
                } else {
                    best
                }
            })
            .ok_or_else(|| {
                debug!(target: "app::dashboard", employee = %name, "employee not found");
                AppError::not_found()
            })?;

        let aggregated = aggregate_by_employee(&filter_by_period(&records, &params.period));
        let summary = build_summary(&aggregated);
        let leaderboard = rank_leaderboard(aggregated, params.sort_field, params.sort_direction);
        let rank = leaderboard
            .iter()
            .find(|entry| entry.record.name == name)
            .map(|entry| entry.rank);
        let percentile = rank.map(|r| percentile_for_rank(r, leaderboard.len()));

        let radar = EmployeeRadar {
            productivity: representative.productivity,
            quality: representative.quality,
            attendance: representative.attendance,
            punctuality: punctuality_score(representative.late_count),
        };
        let vs_team = vec![
            MetricDelta {
                metric: "Productivity".to_string(),
                employee: representative.productivity,
                team_avg: summary.avg_productivity,
            },
            MetricDelta {
                metric: "Quality".to_string(),
                employee: representative.quality,
                team_avg: summary.avg_quality,
            },
            MetricDelta {
                metric: "Attendance".to_string(),
                employee: representative.attendance,
                team_avg: summary.avg_attendance,
            },
            MetricDelta {
                metric: "Final Score".to_string(),
                employee: representative.final_points,
                team_avg: summary.avg_final_points,
            },
        ];

        Ok(EmployeeDetail {
            representative,
            rank,
            percentile,
            radar,
            vs_team,
            history,
        })
    }

    fn try_get_cache(&self, key: &CacheKey) -> Option<DashboardOverviewResponse> {
        self.cache
            .read()
            .ok()
            .and_then(|guard| guard.get(key).cloned())
    }

    fn insert_cache(&self, key: CacheKey, response: DashboardOverviewResponse) {
        if let Ok(mut guard) = self.cache.write() {
            // Entries from older dataset revisions can never hit again.
            let revision = key.revision;
            guard.retain(|k, _| k.revision == revision);
            guard.insert(key, response);
        }
    }
}

fn build_overview(
    records: &[KpiRecord],
    params: &DashboardQueryParams,
) -> AppResult<DashboardOverviewResponse> {
    let filtered = filter_by_period(records, &params.period);
    let aggregated = aggregate_by_employee(&filtered);

    Ok(DashboardOverviewResponse {
        summary: build_summary(&aggregated),
        leaderboard: rank_leaderboard(
            aggregated.clone(),
            params.sort_field,
            params.sort_direction,
        ),
        top_performers: build_top_performers(&aggregated),
        metric_comparison: build_metric_comparison(&aggregated),
        performance_tiers: build_performance_tiers(&aggregated),
        quality_vs_productivity: build_scatter(&aggregated),
        late_arrivals: build_late_arrivals(&aggregated),
        period_trend: build_period_trend(records),
        attendance_histogram: build_attendance_histogram(&aggregated),
        periods: distinct_periods(records),
        generated_at: Utc::now().to_rfc3339(),
    })
}

/// Keeps records whose period matches exactly; the literal "all" keeps
/// everything.
fn filter_by_period(records: &[KpiRecord], period: &str) -> Vec<KpiRecord> {
    if period == ALL_PERIODS {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| r.period == period)
        .cloned()
        .collect()
}

/// Collapses to one record per employee name, keeping the record with the
/// highest final points. Ties keep the earlier record, and output order is
/// first appearance of each name.
fn aggregate_by_employee(records: &[KpiRecord]) -> Vec<KpiRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, KpiRecord> = HashMap::new();
    for record in records {
        match best.get(&record.name) {
            Some(existing) if record.final_points <= existing.final_points => {}
            Some(_) => {
                best.insert(record.name.clone(), record.clone());
            }
            None => {
                order.push(record.name.clone());
                best.insert(record.name.clone(), record.clone());
            }
        }
    }
    order
        .into_iter()
        .filter_map(|name| best.remove(&name))
        .collect()
}

/// Stable sort plus 1-based rank assignment. Name sorting is
/// case-insensitive; all other fields are numeric.
fn rank_leaderboard(
    mut aggregated: Vec<KpiRecord>,
    field: SortField,
    direction: SortDirection,
) -> Vec<LeaderboardEntry> {
    aggregated.sort_by(|a, b| {
        let ordering = match field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            _ => a.metric(field).total_cmp(&b.metric(field)),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    aggregated
        .into_iter()
        .enumerate()
        .map(|(i, record)| LeaderboardEntry {
            rank: (i + 1) as u32,
            record,
        })
        .collect()
}

fn build_summary(aggregated: &[KpiRecord]) -> KpiSummary {
    KpiSummary {
        team_size: aggregated.len() as u32,
        avg_productivity: mean(aggregated.iter().map(|r| r.productivity)),
        avg_quality: mean(aggregated.iter().map(|r| r.quality)),
        avg_attendance: mean(aggregated.iter().map(|r| r.attendance)),
        avg_final_points: mean(aggregated.iter().map(|r| r.final_points)),
    }
}

fn by_final_points_desc(records: &[KpiRecord]) -> Vec<KpiRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.final_points.total_cmp(&a.final_points));
    sorted
}

fn build_top_performers(aggregated: &[KpiRecord]) -> Vec<TopPerformerEntry> {
    by_final_points_desc(aggregated)
        .into_iter()
        .take(TOP_PERFORMERS_LIMIT)
        .map(|r| TopPerformerEntry {
            label: r.short_label(),
            full_name: r.name.clone(),
            final_points: r.final_points,
        })
        .collect()
}

fn build_metric_comparison(aggregated: &[KpiRecord]) -> Vec<MetricComparisonEntry> {
    by_final_points_desc(aggregated)
        .into_iter()
        .take(METRIC_COMPARISON_LIMIT)
        .map(|r| MetricComparisonEntry {
            label: r.short_label(),
            full_name: r.name.clone(),
            productivity: r.productivity,
            quality: r.quality,
            attendance: r.attendance,
        })
        .collect()
}

fn build_performance_tiers(aggregated: &[KpiRecord]) -> PerformanceTierBreakdown {
    let count = |pred: &dyn Fn(&KpiRecord) -> bool| {
        aggregated.iter().filter(|r| pred(r)).count() as u32
    };
    PerformanceTierBreakdown {
        excellent: count(&|r| r.final_points >= 90.0),
        good: count(&|r| r.final_points >= 80.0 && r.final_points < 90.0),
        average: count(&|r| r.final_points >= 70.0 && r.final_points < 80.0),
        needs_improvement: count(&|r| r.final_points < 70.0),
    }
}

fn build_scatter(aggregated: &[KpiRecord]) -> Vec<ScatterPoint> {
    aggregated
        .iter()
        .map(|r| ScatterPoint {
            label: r.short_label(),
            full_name: r.name.clone(),
            productivity: r.productivity,
            quality: r.quality,
            final_points: r.final_points,
        })
        .collect()
}

fn build_late_arrivals(aggregated: &[KpiRecord]) -> Vec<LateArrivalEntry> {
    let mut offenders: Vec<&KpiRecord> =
        aggregated.iter().filter(|r| r.late_count > 0.0).collect();
    offenders.sort_by(|a, b| b.late_count.total_cmp(&a.late_count));
    offenders
        .into_iter()
        .take(LATE_ARRIVALS_LIMIT)
        .map(|r| LateArrivalEntry {
            label: r.short_label(),
            full_name: r.name.clone(),
            late_count: r.late_count,
        })
        .collect()
}

/// Team averages per period over the unfiltered dataset, in period
/// first-appearance order. Records with a blank period are skipped.
fn build_period_trend(records: &[KpiRecord]) -> Vec<PeriodTrendPoint> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<&KpiRecord>> = HashMap::new();
    for record in records {
        if record.period.is_empty() {
            continue;
        }
        if !grouped.contains_key(&record.period) {
            order.push(record.period.clone());
        }
        grouped.entry(record.period.clone()).or_default().push(record);
    }
    order
        .into_iter()
        .filter_map(|period| {
            grouped.remove(&period).map(|group| PeriodTrendPoint {
                avg_productivity: mean(group.iter().map(|r| r.productivity)),
                avg_quality: mean(group.iter().map(|r| r.quality)),
                avg_attendance: mean(group.iter().map(|r| r.attendance)),
                avg_final_points: mean(group.iter().map(|r| r.final_points)),
                period,
            })
        })
        .collect()
}

/// Fixed attendance buckets. Each employee lands in the first bucket whose
/// half-open range contains their score; values outside every range (for
/// example above 101) are left uncounted.
fn build_attendance_histogram(aggregated: &[KpiRecord]) -> Vec<AttendanceHistogramBucket> {
    let mut buckets = vec![
        bucket("< 80%", 0.0, 80.0),
        bucket("80-85%", 80.0, 85.0),
        bucket("85-90%", 85.0, 90.0),
        bucket("90-95%", 90.0, 95.0),
        bucket("95-100%", 95.0, 101.0),
    ];
    for record in aggregated {
        for b in buckets.iter_mut() {
            if record.attendance >= b.min && record.attendance < b.max {
                b.count += 1;
                break;
            }
        }
    }
    buckets
}

fn bucket(range: &str, min: f64, max: f64) -> AttendanceHistogramBucket {
    AttendanceHistogramBucket {
        range: range.to_string(),
        min,
        max,
        count: 0,
    }
}

fn distinct_periods(records: &[KpiRecord]) -> Vec<String> {
    let mut seen = Vec::new();
    for record in records {
        if !record.period.is_empty() && !seen.contains(&record.period) {
            seen.push(record.period.clone());
        }
    }
    seen
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Share of the leaderboard at or below the given 1-based rank, rounded to
/// a whole percent.
fn percentile_for_rank(rank: u32, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let total = total as f64;
    (((total - f64::from(rank)) / total) * 100.0).round() as u32
}

/// Punctuality axis for the radar chart: each late arrival costs 10
/// points, floored at 0.
fn punctuality_score(late_count: f64) -> f64 {
    (100.0 - late_count * 10.0).max(0.0)
}
