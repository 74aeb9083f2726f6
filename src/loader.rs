// CSV loading for plans and reports.
//
// This is the system boundary: woreda names are normalized here, malformed
// rows are skipped and counted, and only typed records reach the analyzer.
use crate::calendar::parse_fiscal_year;
use crate::error::{AnalyticsError, Result};
use crate::types::{Plan, PlanBook, PlanEntry, RawPlanRow, RawReportRow, Report, WoredaKey};
use crate::util::{parse_timestamp_safe, parse_u64_safe};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    /// Plan rows for fiscal years other than the one requested.
    pub other_year_rows: usize,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    clean(value).ok_or(AnalyticsError::MissingField(field))
}

pub fn parse_plan_row(row: RawPlanRow) -> Result<(WoredaKey, i32, PlanEntry)> {
    let woreda = WoredaKey::normalize(&required(row.woreda, "Woreda")?);
    let fiscal_year = parse_fiscal_year(row.fiscal_year.as_deref().unwrap_or_default())?;
    let service_name = required(row.service, "Service")?;
    let annual_quantity = parse_u64_safe(row.annual_plan.as_deref())
        .ok_or_else(|| AnalyticsError::InvalidQuantity(row.annual_plan.unwrap_or_default()))?;
    let entry = PlanEntry {
        service_name,
        category: clean(row.category),
        annual_quantity,
    };
    Ok((woreda, fiscal_year, entry))
}

pub fn parse_report_row(row: RawReportRow) -> Result<Report> {
    let service_name = required(row.service, "Service")?;
    let woreda = WoredaKey::normalize(&required(row.woreda, "Woreda")?);
    let occurred_at = parse_timestamp_safe(row.date.as_deref())
        .ok_or_else(|| AnalyticsError::InvalidDate(row.date.unwrap_or_default()))?;
    Ok(Report {
        service_name,
        category: clean(row.category),
        woreda,
        occurred_at,
    })
}

/// Load plan rows (`Woreda,FiscalYear,Service,Category,AnnualPlan`) into a
/// [`PlanBook`], keeping only `fiscal_year` when one is given.
///
/// Rows sharing a (woreda, fiscal year) form that plan's entry list. The same
/// service/category appearing twice for one woreda is a conflicting plan and
/// fails the load.
pub fn load_plans(path: &Path, fiscal_year: Option<i32>) -> Result<(PlanBook, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut report = LoadReport::default();
    let mut grouped: BTreeMap<(WoredaKey, i32), Vec<PlanEntry>> = BTreeMap::new();

    for result in rdr.deserialize::<RawPlanRow>() {
        report.total_rows += 1;
        let parsed = result.map_err(AnalyticsError::from).and_then(parse_plan_row);
        let (woreda, year, entry) = match parsed {
            Ok(p) => p,
            Err(e) => {
                warn!(row = report.total_rows, "skipping plan row: {}", e);
                report.skipped_rows += 1;
                continue;
            }
        };
        if fiscal_year.is_some_and(|wanted| wanted != year) {
            report.other_year_rows += 1;
            continue;
        }

        let entries = grouped.entry((woreda.clone(), year)).or_default();
        if entries
            .iter()
            .any(|e| e.service_name == entry.service_name && e.category == entry.category)
        {
            return Err(AnalyticsError::DuplicatePlan {
                woreda: woreda.display_name(),
                service: match &entry.category {
                    Some(c) => format!("{} / {}", entry.service_name, c),
                    None => entry.service_name.clone(),
                },
            });
        }
        entries.push(entry);
        report.loaded_rows += 1;
    }

    let mut book = PlanBook::new();
    for ((woreda, year), entries) in grouped {
        debug!(woreda = %woreda, fiscal_year = year, entries = entries.len(), "plan loaded");
        book.upsert(Plan {
            woreda,
            fiscal_year: year,
            entries,
        });
    }
    info!(
        path = %path.display(),
        plans = book.len(),
        rows = report.total_rows,
        skipped = report.skipped_rows,
        "plans loaded"
    );
    Ok((book, report))
}

/// Load report rows (`Service,Category,Woreda,Date`).
pub fn load_reports(path: &Path) -> Result<(Vec<Report>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut report = LoadReport::default();
    let mut reports = Vec::new();

    for result in rdr.deserialize::<RawReportRow>() {
        report.total_rows += 1;
        match result.map_err(AnalyticsError::from).and_then(parse_report_row) {
            Ok(r) => {
                reports.push(r);
                report.loaded_rows += 1;
            }
            Err(e) => {
                warn!(row = report.total_rows, "skipping report row: {}", e);
                report.skipped_rows += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        reports = reports.len(),
        skipped = report.skipped_rows,
        "reports loaded"
    );
    Ok((reports, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn plans_group_by_woreda_and_year() {
        let file = write_csv(
            "Woreda,FiscalYear,Service,Category,AnnualPlan\n\
             Woreda 1,2017,ID Card,new,120\n\
             1,2017,ID Card,renewal,\"1,060\"\n\
             Woreda 2,2017,Birth,,300\n\
             Woreda 2,2016,Birth,,250\n\
             Woreda 3,2017,Birth,,lots\n",
        );
        let (book, report) = load_plans(file.path(), Some(2017)).unwrap();
        assert_eq!(report.total_rows, 5);
        assert_eq!(report.loaded_rows, 3);
        assert_eq!(report.other_year_rows, 1);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(book.len(), 2);

        let w1 = book.get(&WoredaKey::normalize("1"), 2017).unwrap();
        assert_eq!(w1.service_totals(), vec![("ID Card", 1180)]);
        let w2 = book.get(&WoredaKey::normalize("2"), 2017).unwrap();
        assert_eq!(w2.entries[0].category, None);
    }

    #[test]
    fn conflicting_plan_rows_fail() {
        let file = write_csv(
            "Woreda,FiscalYear,Service,Category,AnnualPlan\n\
             Woreda 1,2017,Birth,,10\n\
             1,2017,Birth,,12\n",
        );
        let err = load_plans(file.path(), None).unwrap_err();
        assert!(matches!(err, AnalyticsError::DuplicatePlan { .. }));
    }

    #[test]
    fn out_of_range_fiscal_years_are_skipped() {
        let file = write_csv(
            "Woreda,FiscalYear,Service,Category,AnnualPlan\n\
             Woreda 1,2147483647,Birth,,10\n\
             Woreda 1,0,Birth,,10\n\
             Woreda 1,2017,Birth,,10\n",
        );
        let (book, report) = load_plans(file.path(), None).unwrap();
        assert_eq!(report.skipped_rows, 2);
        assert_eq!(book.len(), 1);
        assert!(book.get(&WoredaKey::normalize("1"), 2017).is_some());
    }

    #[test]
    fn reports_skip_bad_dates() {
        let file = write_csv(
            "Service,Category,Woreda,Date\n\
             Birth,,Woreda 1,2024-10-01T08:00:00Z\n\
             ID Card,new,2,2024-10-02\n\
             Birth,,3,yesterday\n\
             ,,3,2024-10-02\n",
        );
        let (reports, report) = load_reports(file.path()).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.skipped_rows, 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].woreda.as_str(), "1");
        assert_eq!(reports[0].category, None);
        assert_eq!(reports[1].category.as_deref(), Some("new"));
    }

    #[test]
    fn row_errors_name_the_problem() {
        let row = RawReportRow {
            service: Some("Birth".into()),
            category: None,
            woreda: Some("4".into()),
            date: Some("31/12/2024".into()),
        };
        assert!(matches!(parse_report_row(row), Err(AnalyticsError::InvalidDate(d)) if d == "31/12/2024"));

        let row = RawPlanRow {
            woreda: Some("4".into()),
            fiscal_year: Some("E.C.".into()),
            service: Some("Birth".into()),
            category: None,
            annual_plan: Some("4".into()),
        };
        assert!(matches!(parse_plan_row(row), Err(AnalyticsError::InvalidFiscalYear(_))));

        let row = RawPlanRow {
            woreda: Some("  ".into()),
            fiscal_year: Some("2017".into()),
            service: Some("Birth".into()),
            category: None,
            annual_plan: Some("4".into()),
        };
        assert!(matches!(parse_plan_row(row), Err(AnalyticsError::MissingField("Woreda"))));
    }
}
