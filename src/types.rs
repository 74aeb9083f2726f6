use crate::calendar::{DateRange, EthiopianDate, Period};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

// ---------------------------------------------------------------------------
// Raw CSV rows
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RawPlanRow {
    #[serde(rename = "Woreda")]
    pub woreda: Option<String>,
    #[serde(rename = "FiscalYear")]
    pub fiscal_year: Option<String>,
    #[serde(rename = "Service")]
    pub service: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "AnnualPlan")]
    pub annual_plan: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawReportRow {
    #[serde(rename = "Service")]
    pub service: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Woreda")]
    pub woreda: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

/// Canonical woreda identifier. `"Woreda 5"`, `"woreda 5"` and `"5"` all
/// normalize to the key `"5"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WoredaKey(String);

impl WoredaKey {
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        let stripped = match trimmed.get(..7) {
            Some(prefix) if prefix.eq_ignore_ascii_case("woreda ") => &trimmed[7..],
            _ => trimmed,
        };
        WoredaKey(stripped.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric keys render the way the offices write them ("Woreda 5").
    pub fn display_name(&self) -> String {
        if !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_digit()) {
            format!("Woreda {}", self.0)
        } else {
            self.0.clone()
        }
    }

    fn number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for WoredaKey {
    // numeric keys first, in numeric order; named woredas after, alphabetically
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for WoredaKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for WoredaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub service_name: String,
    pub category: Option<String>,
    pub annual_quantity: u64,
}

impl PlanEntry {
    pub fn new(service_name: impl Into<String>, category: Option<&str>, annual_quantity: u64) -> Self {
        Self {
            service_name: service_name.into(),
            category: category.map(str::to_string),
            annual_quantity,
        }
    }
}

/// Annual plan of one woreda for one fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub woreda: WoredaKey,
    pub fiscal_year: i32,
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn new(woreda: &str, fiscal_year: i32, entries: Vec<PlanEntry>) -> Self {
        Self {
            woreda: WoredaKey::normalize(woreda),
            fiscal_year,
            entries,
        }
    }

    /// Services in first-seen order with their annual totals summed across
    /// categories.
    pub fn service_totals(&self) -> Vec<(&str, u64)> {
        let mut totals: Vec<(&str, u64)> = Vec::new();
        for entry in &self.entries {
            match totals.iter_mut().find(|(name, _)| *name == entry.service_name) {
                Some((_, total)) => *total += entry.annual_quantity,
                None => totals.push((entry.service_name.as_str(), entry.annual_quantity)),
            }
        }
        totals
    }

    /// Annual quantity planned for one category of a service.
    pub fn category_quantity(&self, service_name: &str, category: &str) -> u64 {
        self.entries
            .iter()
            .find(|e| e.service_name == service_name && e.category.as_deref() == Some(category))
            .map(|e| e.annual_quantity)
            .unwrap_or(0)
    }
}

/// Plans keyed by (woreda, fiscal year); at most one plan per key.
#[derive(Debug, Clone, Default)]
pub struct PlanBook {
    plans: BTreeMap<(WoredaKey, i32), Plan>,
}

impl PlanBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace the plan for its (woreda, fiscal year).
    /// Returns the plan it replaced.
    pub fn upsert(&mut self, plan: Plan) -> Option<Plan> {
        self.plans
            .insert((plan.woreda.clone(), plan.fiscal_year), plan)
    }

    pub fn get(&self, woreda: &WoredaKey, fiscal_year: i32) -> Option<&Plan> {
        self.plans.get(&(woreda.clone(), fiscal_year))
    }

    pub fn plans_for_year(&self, fiscal_year: i32) -> Vec<Plan> {
        self.plans
            .values()
            .filter(|p| p.fiscal_year == fiscal_year)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// One registered civil-registry transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub service_name: String,
    pub category: Option<String>,
    pub woreda: WoredaKey,
    pub occurred_at: chrono::NaiveDateTime,
}

impl Report {
    pub fn new(
        service_name: impl Into<String>,
        category: Option<&str>,
        woreda: &str,
        occurred_at: chrono::NaiveDateTime,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            category: category.map(str::to_string),
            woreda: WoredaKey::normalize(woreda),
            occurred_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl PerformanceTier {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 90.0 {
            PerformanceTier::Excellent
        } else if rate >= 75.0 {
            PerformanceTier::Good
        } else if rate >= 60.0 {
            PerformanceTier::Average
        } else if rate >= 40.0 {
            PerformanceTier::BelowAverage
        } else {
            PerformanceTier::Poor
        }
    }

    /// Label shown on the Amharic dashboards.
    pub fn amharic_label(self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "በጣም ጥሩ",
            PerformanceTier::Good => "ጥሩ",
            PerformanceTier::Average => "አማካይ",
            PerformanceTier::BelowAverage => "ከአማካይ በታች",
            PerformanceTier::Poor => "ደካማ",
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerformanceTier::Excellent => "Excellent",
            PerformanceTier::Good => "Good",
            PerformanceTier::Average => "Average",
            PerformanceTier::BelowAverage => "BelowAverage",
            PerformanceTier::Poor => "Poor",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAchievement {
    pub category: String,
    pub yearly_plan: u64,
    pub planned: u64,
    pub reported: u64,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAchievement {
    pub yearly_plan: u64,
    pub planned: u64,
    pub reported: u64,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
    pub category_breakdown: Option<Vec<CategoryAchievement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WoredaAnalysis {
    pub woreda: WoredaKey,
    pub display_name: String,
    pub planned: u64,
    pub reported: u64,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
    pub consistency: f64,
    pub performance_score: u64,
    /// Position in the achievement ranking; `None` when nothing was planned.
    pub ranking: Option<usize>,
    pub services: BTreeMap<String, ServiceAchievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWoredaPerformance {
    pub yearly_plan: u64,
    pub planned: u64,
    pub reported: u64,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAnalysis {
    pub service_name: String,
    pub yearly_plan_total: u64,
    pub total_planned: u64,
    pub total_reported: u64,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
    pub woreda_performance: BTreeMap<WoredaKey, ServiceWoredaPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallMetrics {
    pub total_planned: u64,
    pub total_reported: u64,
    pub overall_achievement_rate: f64,
    pub average_woreda_performance: f64,
    pub best_performing_woreda: Option<WoredaKey>,
    pub worst_performing_woreda: Option<WoredaKey>,
    pub total_woredas: usize,
    pub total_reports: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRankingEntry {
    pub rank: usize,
    pub woreda: WoredaKey,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
    pub planned: u64,
    pub reported: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeRankingEntry {
    pub rank: usize,
    pub woreda: WoredaKey,
    pub reported: u64,
    pub planned: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyRankingEntry {
    pub rank: usize,
    pub woreda: WoredaKey,
    pub consistency: f64,
    pub performance: PerformanceTier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRankings {
    pub by_achievement_rate: Vec<AchievementRankingEntry>,
    pub by_volume: Vec<VolumeRankingEntry>,
    pub by_consistency: Vec<ConsistencyRankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWithoutReports {
    pub woreda: WoredaKey,
    pub planned: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsWithoutPlan {
    pub woreda: WoredaKey,
    pub report_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIssues {
    pub plans_without_reports: Vec<PlanWithoutReports>,
    pub reports_without_plans: Vec<ReportsWithoutPlan>,
}

impl DataIssues {
    pub fn is_clean(&self) -> bool {
        self.plans_without_reports.is_empty() && self.reports_without_plans.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub fiscal_year: i32,
    pub period: Period,
    pub date_range: DateRange,
    pub overall_metrics: OverallMetrics,
    pub woreda_analysis: BTreeMap<WoredaKey, WoredaAnalysis>,
    pub service_analysis: Vec<ServiceAnalysis>,
    pub performance_rankings: PerformanceRankings,
    pub data_issues: DataIssues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecommendationKind {
    Critical,
    Attention,
    Success,
    ServiceUnderperforming,
    ServiceExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub service: Option<String>,
    pub message: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WoredaSummary {
    pub total_planned: u64,
    pub total_reported: u64,
    pub achievement_rate: f64,
    pub performance: PerformanceTier,
    pub report_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WoredaDetail {
    pub woreda: WoredaKey,
    pub display_name: String,
    pub fiscal_year: i32,
    pub period: Period,
    pub date_range: DateRange,
    pub summary: WoredaSummary,
    pub services: BTreeMap<String, ServiceAchievement>,
    pub recommendations: Vec<Recommendation>,
}

/// Report count for one category of a service on a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyServiceCount {
    pub service_name: String,
    /// Empty for uncategorized services.
    pub categories: Vec<DailyCategoryCount>,
    pub total: u64,
}

/// Per-service daily report counts, city-wide or for one woreda.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub ethiopian_date: EthiopianDate,
    pub woreda: Option<WoredaKey>,
    pub services: Vec<DailyServiceCount>,
    pub total: u64,
}

// ---------------------------------------------------------------------------
// Exported table rows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WoredaRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Woreda")]
    #[tabled(rename = "Woreda")]
    pub woreda: String,
    #[serde(rename = "Planned")]
    #[tabled(rename = "Planned")]
    pub planned: String,
    #[serde(rename = "Reported")]
    #[tabled(rename = "Reported")]
    pub reported: String,
    #[serde(rename = "AchievementRate")]
    #[tabled(rename = "AchievementRate")]
    pub achievement_rate: String,
    #[serde(rename = "Performance")]
    #[tabled(rename = "Performance")]
    pub performance: String,
    #[serde(rename = "Consistency")]
    #[tabled(rename = "Consistency")]
    pub consistency: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: u64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ServiceSummaryRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "YearlyPlan")]
    #[tabled(rename = "YearlyPlan")]
    pub yearly_plan: String,
    #[serde(rename = "Planned")]
    #[tabled(rename = "Planned")]
    pub planned: String,
    #[serde(rename = "Reported")]
    #[tabled(rename = "Reported")]
    pub reported: String,
    #[serde(rename = "AchievementRate")]
    #[tabled(rename = "AchievementRate")]
    pub achievement_rate: String,
    #[serde(rename = "Performance")]
    #[tabled(rename = "Performance")]
    pub performance: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DataIssueRow {
    #[serde(rename = "Woreda")]
    #[tabled(rename = "Woreda")]
    pub woreda: String,
    #[serde(rename = "Issue")]
    #[tabled(rename = "Issue")]
    pub issue: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WoredaServiceRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Planned")]
    #[tabled(rename = "Planned")]
    pub planned: String,
    #[serde(rename = "Reported")]
    #[tabled(rename = "Reported")]
    pub reported: String,
    #[serde(rename = "AchievementRate")]
    #[tabled(rename = "AchievementRate")]
    pub achievement_rate: String,
    #[serde(rename = "Performance")]
    #[tabled(rename = "Performance")]
    pub performance: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailySummaryRow {
    #[serde(rename = "Service")]
    #[tabled(rename = "Service")]
    pub service: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn woreda_names_normalize_to_one_key() {
        assert_eq!(WoredaKey::normalize("Woreda 5"), WoredaKey::normalize("5"));
        assert_eq!(WoredaKey::normalize(" woreda 05 ").as_str(), "05");
        assert_eq!(WoredaKey::normalize("Bole").as_str(), "Bole");
        assert_eq!(WoredaKey::normalize("5").display_name(), "Woreda 5");
        assert_eq!(WoredaKey::normalize("Bole").display_name(), "Bole");
    }

    #[test]
    fn woreda_keys_sort_numerically() {
        let mut keys: Vec<WoredaKey> = ["10", "2", "Bole", "1"]
            .iter()
            .map(|s| WoredaKey::normalize(s))
            .collect();
        keys.sort();
        let order: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(order, ["1", "2", "10", "Bole"]);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(PerformanceTier::from_rate(90.0), PerformanceTier::Excellent);
        assert_eq!(PerformanceTier::from_rate(89.99), PerformanceTier::Good);
        assert_eq!(PerformanceTier::from_rate(60.0), PerformanceTier::Average);
        assert_eq!(PerformanceTier::from_rate(40.0), PerformanceTier::BelowAverage);
        assert_eq!(PerformanceTier::from_rate(0.0), PerformanceTier::Poor);
        assert_eq!(PerformanceTier::from_rate(250.0), PerformanceTier::Excellent);
        assert_eq!(PerformanceTier::Poor.amharic_label(), "ደካማ");
        assert_eq!(PerformanceTier::BelowAverage.to_string(), "BelowAverage");
    }

    #[test]
    fn service_totals_sum_categories() {
        let plan = Plan::new(
            "Woreda 1",
            2017,
            vec![
                PlanEntry::new("ID Card", Some("new"), 120),
                PlanEntry::new("Residency", None, 40),
                PlanEntry::new("ID Card", Some("renewal"), 60),
                PlanEntry::new("ID Card", Some("replacement"), 0),
            ],
        );
        assert_eq!(plan.service_totals(), vec![("ID Card", 180), ("Residency", 40)]);
        assert_eq!(plan.category_quantity("ID Card", "renewal"), 60);
        assert_eq!(plan.category_quantity("ID Card", "lost"), 0);
    }

    #[test]
    fn upsert_replaces_whole_plan() {
        let mut book = PlanBook::new();
        book.upsert(Plan::new("3", 2017, vec![PlanEntry::new("Birth", None, 10)]));
        let previous = book.upsert(Plan::new(
            "Woreda 3",
            2017,
            vec![PlanEntry::new("Marriage", None, 4)],
        ));
        assert!(previous.is_some());
        assert_eq!(book.len(), 1);
        let plan = book.get(&WoredaKey::normalize("3"), 2017).unwrap();
        assert_eq!(plan.entries, vec![PlanEntry::new("Marriage", None, 4)]);
        assert!(book.plans_for_year(2016).is_empty());
    }
}
