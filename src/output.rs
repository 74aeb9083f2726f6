use crate::error::Result;
use crate::types::{
    AnalysisReport, DailySummary, DailySummaryRow, DataIssueRow, ServiceSummaryRow, WoredaDetail,
    WoredaRankingRow, WoredaServiceRow,
};
use crate::util::{format_int, format_number};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_table(rows, max_rows));
}

/// Woredas in achievement-rank order, followed by unranked (zero-plan) ones.
pub fn ranking_rows(report: &AnalysisReport) -> Vec<WoredaRankingRow> {
    report
        .performance_rankings
        .by_achievement_rate
        .iter()
        .filter_map(|entry| report.woreda_analysis.get(&entry.woreda))
        .chain(report.woreda_analysis.values().filter(|w| w.ranking.is_none()))
        .map(|w| WoredaRankingRow {
            rank: w.ranking.unwrap_or(0),
            woreda: w.display_name.clone(),
            planned: format_int(w.planned),
            reported: format_int(w.reported),
            achievement_rate: format_number(w.achievement_rate, 2),
            performance: w.performance.to_string(),
            consistency: format_number(w.consistency, 2),
            score: w.performance_score,
        })
        .collect()
}

pub fn service_rows(report: &AnalysisReport) -> Vec<ServiceSummaryRow> {
    report
        .service_analysis
        .iter()
        .map(|s| ServiceSummaryRow {
            service: s.service_name.clone(),
            yearly_plan: format_int(s.yearly_plan_total),
            planned: format_int(s.total_planned),
            reported: format_int(s.total_reported),
            achievement_rate: format_number(s.achievement_rate, 2),
            performance: s.performance.to_string(),
        })
        .collect()
}

pub fn issue_rows(report: &AnalysisReport) -> Vec<DataIssueRow> {
    let issues = &report.data_issues;
    let planned = issues.plans_without_reports.iter().map(|p| DataIssueRow {
        woreda: p.woreda.display_name(),
        issue: "Plan without reports".to_string(),
        count: format_int(p.planned),
    });
    let orphaned = issues.reports_without_plans.iter().map(|r| DataIssueRow {
        woreda: r.woreda.display_name(),
        issue: "Reports without plan".to_string(),
        count: format_int(r.report_count),
    });
    planned.chain(orphaned).collect()
}

/// One row per service, plus one per category for categorized services.
pub fn woreda_service_rows(detail: &WoredaDetail) -> Vec<WoredaServiceRow> {
    let mut rows = Vec::new();
    for (name, s) in &detail.services {
        rows.push(WoredaServiceRow {
            service: name.clone(),
            category: "-".to_string(),
            planned: format_int(s.planned),
            reported: format_int(s.reported),
            achievement_rate: format_number(s.achievement_rate, 2),
            performance: s.performance.to_string(),
        });
        for c in s.category_breakdown.iter().flatten() {
            rows.push(WoredaServiceRow {
                service: name.clone(),
                category: c.category.clone(),
                planned: format_int(c.planned),
                reported: format_int(c.reported),
                achievement_rate: format_number(c.achievement_rate, 2),
                performance: c.performance.to_string(),
            });
        }
    }
    rows
}

/// Category rows followed by a `Total` row for categorized services; a
/// single `-` row for the rest.
pub fn daily_rows(summary: &DailySummary) -> Vec<DailySummaryRow> {
    let mut rows = Vec::new();
    for s in &summary.services {
        if s.categories.is_empty() {
            rows.push(DailySummaryRow {
                service: s.service_name.clone(),
                category: "-".to_string(),
                count: s.total,
            });
            continue;
        }
        rows.extend(s.categories.iter().map(|c| DailySummaryRow {
            service: s.service_name.clone(),
            category: c.category.clone(),
            count: c.count,
        }));
        rows.push(DailySummaryRow {
            service: s.service_name.clone(),
            category: "Total".to_string(),
            count: s.total,
        });
    }
    rows
}
