//! Plan-vs-report achievement analytics.
//!
//! Everything here is a pure function of the plans, the reports, the service
//! catalog and the requested fiscal period. Reports are filtered to the
//! cumulative window of the period before anything is counted; the daily
//! summary works on a single calendar day instead.

use crate::calendar::{quarter_date_range, to_ethiopian, DateRange, Period};
use crate::catalog::ServiceCatalog;
use crate::error::{AnalyticsError, Result};
use crate::quarter::planned_for_period;
use crate::types::{
    AchievementRankingEntry, AnalysisReport, CategoryAchievement, ConsistencyRankingEntry,
    DailyCategoryCount, DailyServiceCount, DailySummary, DataIssues, OverallMetrics,
    PerformanceRankings, PerformanceTier, Plan, PlanWithoutReports, Recommendation,
    RecommendationKind, Report, ReportsWithoutPlan, ServiceAchievement, ServiceAnalysis,
    ServiceWoredaPerformance, VolumeRankingEntry, WoredaAnalysis, WoredaDetail, WoredaKey,
    WoredaSummary,
};
use crate::util::{achievement_rate, average, round2, std_dev};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

const ACHIEVEMENT_WEIGHT: f64 = 0.6;
const CONSISTENCY_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub fiscal_year: i32,
    pub period: Period,
}

impl AnalysisRequest {
    pub fn new(fiscal_year: i32, period: Period) -> Self {
        Self {
            fiscal_year,
            period,
        }
    }

    pub fn date_range(&self) -> DateRange {
        quarter_date_range(self.fiscal_year, self.period)
    }
}

/// In-window report counts, keyed by woreda and service, split by category.
struct ReportTally<'a> {
    by_service: HashMap<(&'a WoredaKey, &'a str), HashMap<Option<&'a str>, u64>>,
    by_woreda: BTreeMap<&'a WoredaKey, usize>,
    total: usize,
}

impl<'a> ReportTally<'a> {
    fn build(reports: &'a [Report], window: &DateRange) -> Self {
        let mut by_service: HashMap<(&WoredaKey, &str), HashMap<Option<&str>, u64>> =
            HashMap::new();
        let mut by_woreda: BTreeMap<&WoredaKey, usize> = BTreeMap::new();
        let mut total = 0usize;
        for r in reports.iter().filter(|r| window.contains(r.occurred_at)) {
            *by_service
                .entry((&r.woreda, r.service_name.as_str()))
                .or_default()
                .entry(r.category.as_deref())
                .or_insert(0) += 1;
            *by_woreda.entry(&r.woreda).or_insert(0) += 1;
            total += 1;
        }
        Self {
            by_service,
            by_woreda,
            total,
        }
    }

    fn service_count(&self, woreda: &WoredaKey, service: &str, catalog: &ServiceCatalog) -> u64 {
        let categories = catalog.categories_for(service);
        self.by_service
            .get(&(woreda, service))
            .map(|by_category| {
                by_category
                    .iter()
                    .filter(|(category, _)| categories.accepts(**category))
                    .map(|(_, n)| *n)
                    .sum()
            })
            .unwrap_or(0)
    }

    fn category_count(&self, woreda: &WoredaKey, service: &str, category: &str) -> u64 {
        self.by_service
            .get(&(woreda, service))
            .and_then(|by_category| by_category.get(&Some(category)))
            .copied()
            .unwrap_or(0)
    }

    fn woreda_count(&self, woreda: &WoredaKey) -> usize {
        self.by_woreda.get(woreda).copied().unwrap_or(0)
    }
}

/// Run the full plan-vs-report analysis for one fiscal period.
///
/// `plans` are expected to belong to `request.fiscal_year`; `reports` may be
/// unfiltered, only those inside the cumulative window are counted. Never
/// fails: empty or unmatched inputs produce zero rates.
pub fn analyze(
    plans: &[Plan],
    reports: &[Report],
    catalog: &ServiceCatalog,
    request: AnalysisRequest,
) -> AnalysisReport {
    let date_range = request.date_range();
    let tally = ReportTally::build(reports, &date_range);
    info!(
        plans = plans.len(),
        reports = reports.len(),
        in_window = tally.total,
        fiscal_year = request.fiscal_year,
        period = %request.period,
        "analyzing plan achievement for {}",
        date_range
    );

    let mut woreda_analysis: BTreeMap<WoredaKey, WoredaAnalysis> = BTreeMap::new();
    let mut analyzed: Vec<&Plan> = Vec::with_capacity(plans.len());
    for plan in plans {
        if plan.fiscal_year != request.fiscal_year {
            debug!(woreda = %plan.woreda, fiscal_year = plan.fiscal_year, "skipping plan from another fiscal year");
            continue;
        }
        if woreda_analysis.contains_key(&plan.woreda) {
            warn!(woreda = %plan.woreda, "duplicate plan for woreda; keeping the first one");
            continue;
        }
        let services = service_achievements(plan, &tally, catalog, request.period);
        woreda_analysis.insert(plan.woreda.clone(), summarize_woreda(&plan.woreda, services));
        analyzed.push(plan);
    }

    let performance_rankings = rank_woredas(&mut woreda_analysis);
    let overall_metrics = overall_metrics(&woreda_analysis, &performance_rankings, tally.total);
    let service_analysis = service_analysis(&analyzed, &woreda_analysis, catalog);
    let data_issues = detect_data_issues(&woreda_analysis, &tally);

    if !data_issues.is_clean() {
        info!(
            plans_without_reports = data_issues.plans_without_reports.len(),
            reports_without_plans = data_issues.reports_without_plans.len(),
            "data quality issues detected"
        );
    }

    AnalysisReport {
        fiscal_year: request.fiscal_year,
        period: request.period,
        date_range,
        overall_metrics,
        woreda_analysis,
        service_analysis,
        performance_rankings,
        data_issues,
    }
}

/// Detailed breakdown and recommendations for a single woreda.
pub fn analyze_woreda(
    woreda: &WoredaKey,
    plans: &[Plan],
    reports: &[Report],
    catalog: &ServiceCatalog,
    request: AnalysisRequest,
) -> Result<WoredaDetail> {
    let plan = plans
        .iter()
        .find(|p| &p.woreda == woreda && p.fiscal_year == request.fiscal_year)
        .ok_or_else(|| AnalyticsError::WoredaNotFound {
            woreda: woreda.to_string(),
            fiscal_year: request.fiscal_year,
        })?;

    let date_range = request.date_range();
    let tally = ReportTally::build(reports, &date_range);
    let report_count = tally.woreda_count(woreda);
    debug!(woreda = %woreda, report_count, "woreda reports in window");

    let services = service_achievements(plan, &tally, catalog, request.period);
    let total_planned: u64 = services.values().map(|s| s.planned).sum();
    let total_reported: u64 = services.values().map(|s| s.reported).sum();
    let rate = achievement_rate(total_reported, total_planned);
    let summary = WoredaSummary {
        total_planned,
        total_reported,
        achievement_rate: rate,
        performance: PerformanceTier::from_rate(rate),
        report_count,
    };
    let recommendations = recommendations(&summary, &services);

    Ok(WoredaDetail {
        woreda: woreda.clone(),
        display_name: woreda.display_name(),
        fiscal_year: request.fiscal_year,
        period: request.period,
        date_range,
        summary,
        services,
        recommendations,
    })
}

/// Reports filed on one calendar day, counted per catalog service and
/// category, city-wide or for a single woreda.
///
/// Categorized services only count reports whose category is listed, and
/// their total is the sum of those categories. Uncategorized services count
/// every report. Services outside the catalog are not listed.
pub fn daily_summary(
    reports: &[Report],
    catalog: &ServiceCatalog,
    date: NaiveDate,
    woreda: Option<&WoredaKey>,
) -> DailySummary {
    let mut counts: HashMap<&str, HashMap<Option<&str>, u64>> = HashMap::new();
    for r in reports
        .iter()
        .filter(|r| r.occurred_at.date() == date)
        .filter(|r| woreda.map_or(true, |w| &r.woreda == w))
    {
        *counts
            .entry(r.service_name.as_str())
            .or_default()
            .entry(r.category.as_deref())
            .or_insert(0) += 1;
    }

    let services: Vec<DailyServiceCount> = catalog
        .services
        .iter()
        .map(|def| {
            let by_category = counts.get(def.name.as_str());
            if def.categories.has_categories() {
                let categories: Vec<DailyCategoryCount> = def
                    .categories
                    .categories()
                    .iter()
                    .map(|category| DailyCategoryCount {
                        category: category.clone(),
                        count: by_category
                            .and_then(|m| m.get(&Some(category.as_str())))
                            .copied()
                            .unwrap_or(0),
                    })
                    .collect();
                let total = categories.iter().map(|c| c.count).sum();
                DailyServiceCount {
                    service_name: def.name.clone(),
                    categories,
                    total,
                }
            } else {
                DailyServiceCount {
                    service_name: def.name.clone(),
                    categories: Vec::new(),
                    total: by_category.map(|m| m.values().sum::<u64>()).unwrap_or(0),
                }
            }
        })
        .collect();

    let total: u64 = services.iter().map(|s| s.total).sum();
    debug!(%date, woreda = ?woreda.map(WoredaKey::as_str), total, "daily summary built");
    DailySummary {
        date,
        ethiopian_date: to_ethiopian(date),
        woreda: woreda.cloned(),
        services,
        total,
    }
}

fn service_achievements(
    plan: &Plan,
    tally: &ReportTally<'_>,
    catalog: &ServiceCatalog,
    period: Period,
) -> BTreeMap<String, ServiceAchievement> {
    let mut services = BTreeMap::new();
    for (service_name, yearly_plan) in plan.service_totals() {
        let planned = planned_for_period(yearly_plan, period);
        let reported = tally.service_count(&plan.woreda, service_name, catalog);
        let rate = achievement_rate(reported, planned);

        let categories = catalog.categories_for(service_name);
        let category_breakdown = if categories.has_categories() {
            let breakdown = categories
                .categories()
                .iter()
                .map(|category| {
                    let category_yearly = plan.category_quantity(service_name, category);
                    let category_planned = planned_for_period(category_yearly, period);
                    let category_reported =
                        tally.category_count(&plan.woreda, service_name, category);
                    let category_rate = achievement_rate(category_reported, category_planned);
                    CategoryAchievement {
                        category: category.clone(),
                        yearly_plan: category_yearly,
                        planned: category_planned,
                        reported: category_reported,
                        achievement_rate: category_rate,
                        performance: PerformanceTier::from_rate(category_rate),
                    }
                })
                .collect();
            Some(breakdown)
        } else {
            None
        };

        services.insert(
            service_name.to_string(),
            ServiceAchievement {
                yearly_plan,
                planned,
                reported,
                achievement_rate: rate,
                performance: PerformanceTier::from_rate(rate),
                category_breakdown,
            },
        );
    }
    services
}

/// `100 - stddev` of the non-zero service rates, floored at 0. A woreda with
/// no non-zero rate has no consistency to speak of and scores 0.
fn consistency(services: &BTreeMap<String, ServiceAchievement>) -> f64 {
    let rates: Vec<f64> = services
        .values()
        .map(|s| s.achievement_rate)
        .filter(|rate| *rate > 0.0)
        .collect();
    if rates.is_empty() {
        return 0.0;
    }
    (100.0 - std_dev(&rates)).max(0.0)
}

fn performance_score(rate: f64, consistency: f64) -> u64 {
    (rate * ACHIEVEMENT_WEIGHT + consistency * CONSISTENCY_WEIGHT)
        .round()
        .max(0.0) as u64
}

fn summarize_woreda(
    woreda: &WoredaKey,
    services: BTreeMap<String, ServiceAchievement>,
) -> WoredaAnalysis {
    let planned: u64 = services.values().map(|s| s.planned).sum();
    let reported: u64 = services.values().map(|s| s.reported).sum();
    let rate = achievement_rate(reported, planned);
    let consistency = consistency(&services);
    WoredaAnalysis {
        woreda: woreda.clone(),
        display_name: woreda.display_name(),
        planned,
        reported,
        achievement_rate: rate,
        performance: PerformanceTier::from_rate(rate),
        consistency: round2(consistency),
        performance_score: performance_score(rate, consistency),
        ranking: None,
        services,
    }
}

fn by_rate_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Builds the three rankings and writes each woreda's achievement rank back.
/// Ties keep woreda key order, since the map is iterated in key order and the
/// sorts are stable.
fn rank_woredas(woredas: &mut BTreeMap<WoredaKey, WoredaAnalysis>) -> PerformanceRankings {
    let mut ranked: Vec<&WoredaAnalysis> = woredas.values().filter(|w| w.planned > 0).collect();
    ranked.sort_by(|a, b| by_rate_desc(a.achievement_rate, b.achievement_rate));
    let by_achievement_rate: Vec<AchievementRankingEntry> = ranked
        .into_iter()
        .enumerate()
        .map(|(idx, w)| AchievementRankingEntry {
            rank: idx + 1,
            woreda: w.woreda.clone(),
            achievement_rate: w.achievement_rate,
            performance: PerformanceTier::from_rate(w.achievement_rate),
            planned: w.planned,
            reported: w.reported,
        })
        .collect();

    let mut by_reported: Vec<&WoredaAnalysis> = woredas.values().collect();
    by_reported.sort_by(|a, b| b.reported.cmp(&a.reported));
    let by_volume = by_reported
        .into_iter()
        .enumerate()
        .map(|(idx, w)| VolumeRankingEntry {
            rank: idx + 1,
            woreda: w.woreda.clone(),
            reported: w.reported,
            planned: w.planned,
        })
        .collect();

    let mut by_steadiness: Vec<&WoredaAnalysis> = woredas.values().collect();
    by_steadiness.sort_by(|a, b| by_rate_desc(a.consistency, b.consistency));
    let by_consistency = by_steadiness
        .into_iter()
        .enumerate()
        .map(|(idx, w)| ConsistencyRankingEntry {
            rank: idx + 1,
            woreda: w.woreda.clone(),
            consistency: w.consistency,
            performance: PerformanceTier::from_rate(w.consistency),
        })
        .collect();

    for entry in &by_achievement_rate {
        if let Some(w) = woredas.get_mut(&entry.woreda) {
            w.ranking = Some(entry.rank);
        }
    }

    PerformanceRankings {
        by_achievement_rate,
        by_volume,
        by_consistency,
    }
}

fn overall_metrics(
    woredas: &BTreeMap<WoredaKey, WoredaAnalysis>,
    rankings: &PerformanceRankings,
    total_reports: usize,
) -> OverallMetrics {
    let total_planned: u64 = woredas.values().map(|w| w.planned).sum();
    let total_reported: u64 = woredas.values().map(|w| w.reported).sum();
    let ranked = &rankings.by_achievement_rate;
    let rates: Vec<f64> = ranked.iter().map(|r| r.achievement_rate).collect();
    OverallMetrics {
        total_planned,
        total_reported,
        overall_achievement_rate: achievement_rate(total_reported, total_planned),
        average_woreda_performance: round2(average(&rates)),
        best_performing_woreda: ranked.first().map(|r| r.woreda.clone()),
        worst_performing_woreda: ranked.last().map(|r| r.woreda.clone()),
        total_woredas: woredas.len(),
        total_reports,
    }
}

fn service_analysis(
    plans: &[&Plan],
    woredas: &BTreeMap<WoredaKey, WoredaAnalysis>,
    catalog: &ServiceCatalog,
) -> Vec<ServiceAnalysis> {
    // catalog order first, then services that only appear in analyzed plans
    let mut names: Vec<String> = catalog.service_names().map(str::to_string).collect();
    let extra: BTreeSet<&str> = plans
        .iter()
        .flat_map(|p| p.entries.iter().map(|e| e.service_name.as_str()))
        .filter(|name| catalog.get(name).is_none())
        .collect();
    names.extend(extra.into_iter().map(str::to_string));

    names
        .into_iter()
        .map(|service_name| {
            let mut yearly_plan_total = 0u64;
            let mut total_planned = 0u64;
            let mut total_reported = 0u64;
            let mut woreda_performance = BTreeMap::new();
            for (key, w) in woredas {
                let Some(s) = w.services.get(&service_name) else {
                    continue;
                };
                yearly_plan_total += s.yearly_plan;
                total_planned += s.planned;
                total_reported += s.reported;
                woreda_performance.insert(
                    key.clone(),
                    ServiceWoredaPerformance {
                        yearly_plan: s.yearly_plan,
                        planned: s.planned,
                        reported: s.reported,
                        achievement_rate: s.achievement_rate,
                        performance: s.performance,
                    },
                );
            }
            let rate = achievement_rate(total_reported, total_planned);
            ServiceAnalysis {
                service_name,
                yearly_plan_total,
                total_planned,
                total_reported,
                achievement_rate: rate,
                performance: PerformanceTier::from_rate(rate),
                woreda_performance,
            }
        })
        .collect()
}

fn detect_data_issues(
    woredas: &BTreeMap<WoredaKey, WoredaAnalysis>,
    tally: &ReportTally<'_>,
) -> DataIssues {
    let plans_without_reports = woredas
        .values()
        .filter(|w| w.planned > 0 && w.reported == 0)
        .map(|w| PlanWithoutReports {
            woreda: w.woreda.clone(),
            planned: w.planned,
        })
        .collect();
    let reports_without_plans = tally
        .by_woreda
        .iter()
        .filter(|(key, _)| !woredas.contains_key(**key))
        .map(|(key, count)| ReportsWithoutPlan {
            woreda: (*key).clone(),
            report_count: *count,
        })
        .collect();
    DataIssues {
        plans_without_reports,
        reports_without_plans,
    }
}

fn recommendations(
    summary: &WoredaSummary,
    services: &BTreeMap<String, ServiceAchievement>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let rate = summary.achievement_rate;
    if rate < 40.0 {
        out.push(Recommendation {
            kind: RecommendationKind::Critical,
            service: None,
            message: "Overall performance is very low; immediate corrective action is required."
                .to_string(),
            action: "Intensify monitoring and on-site support to lift performance.".to_string(),
        });
    } else if rate < 60.0 {
        out.push(Recommendation {
            kind: RecommendationKind::Attention,
            service: None,
            message: "Performance is below expectations and needs improvement.".to_string(),
            action: "Targeted follow-up and support should bring performance up.".to_string(),
        });
    } else if rate >= 90.0 {
        out.push(Recommendation {
            kind: RecommendationKind::Success,
            service: None,
            message: "Excellent performance; this practice should be scaled up.".to_string(),
            action: "Share the woreda's good practices with other woredas.".to_string(),
        });
    }

    for (name, s) in services {
        if s.planned > 0 && s.achievement_rate < 40.0 {
            out.push(Recommendation {
                kind: RecommendationKind::ServiceUnderperforming,
                service: Some(name.clone()),
                message: format!(
                    "{} is performing below plan ({:.2}% achieved).",
                    name, s.achievement_rate
                ),
                action: format!("Review the obstacles in delivering {}.", name),
            });
        }
        if s.achievement_rate > 120.0 {
            out.push(Recommendation {
                kind: RecommendationKind::ServiceExceeded,
                service: Some(name.clone()),
                message: format!(
                    "{} exceeded its plan by {:.2}%.",
                    name,
                    s.achievement_rate - 100.0
                ),
                action: format!("Consider raising next year's plan for {}.", name),
            });
        }
    }
    out
}
