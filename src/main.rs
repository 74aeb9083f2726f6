// Command-line entry point.
//
// - `analyze` runs the full plan-vs-report analysis, exports JSON/CSV and
//   prints Markdown previews.
// - `woreda` prints one woreda's breakdown and recommendations.
// - `daily` counts one day's reports per service and category.
// - `calendar` and `targets` expose the calendar and quarterly-plan helpers.
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use registry_analytics::calendar::{
    fiscal_year_for, parse_fiscal_year, quarter_date_range, to_ethiopian, Period,
};
use registry_analytics::catalog::ServiceCatalog;
use registry_analytics::error::{AnalyticsError, Result};
use registry_analytics::types::{PlanBook, Report, WoredaKey};
use registry_analytics::util::{format_int, format_number, parse_date_safe};
use registry_analytics::{
    analyze, analyze_woreda, current_ethiopian_year, cumulative_quarterly_targets, daily_summary,
    loader, output, AnalysisRequest,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "registry_analytics")]
#[command(about = "Civil-registration plan achievement analytics over Ethiopian fiscal quarters")]
struct Cli {
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze all woredas and export the results
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Directory for analysis.json and the CSV tables
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Rows shown in each console preview
        #[arg(long, default_value = "10")]
        preview_rows: usize,
    },
    /// Detailed breakdown and recommendations for one woreda
    Woreda {
        /// Woreda name or number ("Woreda 5" or "5")
        woreda: String,

        #[command(flatten)]
        input: InputArgs,

        /// Also write the breakdown as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Per-service report counts for a single day
    Daily {
        /// Reports CSV (Service,Category,Woreda,Date)
        #[arg(long)]
        reports: PathBuf,

        /// Gregorian date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Limit the summary to one woreda
        #[arg(long)]
        woreda: Option<String>,

        /// Service catalog JSON; defaults to the registry service list
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Directory for daily_summary.csv
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Convert a Gregorian date and show its fiscal quarter windows
    Calendar {
        /// Gregorian date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Cumulative quarterly targets for an annual plan
    Targets {
        annual: u64,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Plans CSV (Woreda,FiscalYear,Service,Category,AnnualPlan)
    #[arg(long)]
    plans: PathBuf,

    /// Reports CSV (Service,Category,Woreda,Date)
    #[arg(long)]
    reports: PathBuf,

    /// Ethiopian fiscal year (1-9999); defaults to the current Ethiopian year
    #[arg(long, value_parser = parse_fiscal_year)]
    fiscal_year: Option<i32>,

    /// yearly, 1, 2, 3 or 4
    #[arg(long, default_value = "yearly")]
    period: Period,

    /// Service catalog JSON; defaults to the registry service list
    #[arg(long)]
    catalog: Option<PathBuf>,
}

struct LoadedInput {
    book: PlanBook,
    reports: Vec<Report>,
    catalog: ServiceCatalog,
    request: AnalysisRequest,
}

fn load_catalog(path: Option<&Path>) -> Result<ServiceCatalog> {
    match path {
        Some(path) => ServiceCatalog::from_json_file(path),
        None => Ok(ServiceCatalog::registry_default().clone()),
    }
}

fn date_or_today(raw: Option<&str>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => {
            parse_date_safe(Some(raw)).ok_or_else(|| AnalyticsError::InvalidDate(raw.to_string()))
        }
        None => Ok(Local::now().date_naive()),
    }
}

fn load_input(input: &InputArgs) -> Result<LoadedInput> {
    let fiscal_year = input.fiscal_year.unwrap_or_else(current_ethiopian_year);
    let request = AnalysisRequest::new(fiscal_year, input.period);
    let catalog = load_catalog(input.catalog.as_deref())?;

    let (book, plan_load) = loader::load_plans(&input.plans, Some(fiscal_year))?;
    let (reports, report_load) = loader::load_reports(&input.reports)?;

    println!(
        "Processing dataset... ({} plan rows, {} report rows)",
        format_int(plan_load.total_rows),
        format_int(report_load.total_rows)
    );
    if plan_load.skipped_rows + report_load.skipped_rows > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            format_int(plan_load.skipped_rows + report_load.skipped_rows)
        );
    }
    if plan_load.other_year_rows > 0 {
        println!(
            "Info: {} plan rows belong to other fiscal years.",
            format_int(plan_load.other_year_rows)
        );
    }
    println!();

    Ok(LoadedInput {
        book,
        reports,
        catalog,
        request,
    })
}

fn handle_analyze(input: &InputArgs, out_dir: &Path, preview_rows: usize) -> Result<()> {
    let loaded = load_input(input)?;
    let plans = loaded.book.plans_for_year(loaded.request.fiscal_year);
    let report = analyze(&plans, &loaded.reports, &loaded.catalog, loaded.request);

    std::fs::create_dir_all(out_dir)?;
    let rankings = output::ranking_rows(&report);
    let services = output::service_rows(&report);
    let issues = output::issue_rows(&report);
    output::write_json(&out_dir.join("analysis.json"), &report)?;
    output::write_csv(&out_dir.join("woreda_rankings.csv"), &rankings)?;
    output::write_csv(&out_dir.join("service_summary.csv"), &services)?;
    output::write_csv(&out_dir.join("data_issues.csv"), &issues)?;
    info!(out_dir = %out_dir.display(), "analysis exported");

    let note = format!(
        "Fiscal year {} E.C., {}: {}",
        report.fiscal_year,
        report.period.label(),
        report.date_range
    );
    output::preview_table("Woreda Achievement Ranking", Some(&note), &rankings, preview_rows);
    output::preview_table("Service Achievement Summary", None, &services, preview_rows);
    output::preview_table("Data Quality Issues", None, &issues, preview_rows);

    let m = &report.overall_metrics;
    println!("Overall Metrics (analysis.json):");
    println!(
        "  planned {}, reported {}, achievement {}%, average woreda {}%",
        format_int(m.total_planned),
        format_int(m.total_reported),
        format_number(m.overall_achievement_rate, 2),
        format_number(m.average_woreda_performance, 2)
    );
    if let (Some(best), Some(worst)) = (&m.best_performing_woreda, &m.worst_performing_woreda) {
        println!(
            "  best {}, worst {}",
            best.display_name(),
            worst.display_name()
        );
    }
    println!("(Full tables exported to {})\n", out_dir.display());
    Ok(())
}

fn handle_woreda(woreda: &str, input: &InputArgs, json: Option<&Path>) -> Result<()> {
    let loaded = load_input(input)?;
    let plans = loaded.book.plans_for_year(loaded.request.fiscal_year);
    let key = WoredaKey::normalize(woreda);
    let detail = analyze_woreda(&key, &plans, &loaded.reports, &loaded.catalog, loaded.request)?;

    if let Some(path) = json {
        output::write_json(path, &detail)?;
    }

    let rows = output::woreda_service_rows(&detail);
    let note = format!(
        "Fiscal year {} E.C., {}: {}",
        detail.fiscal_year,
        detail.period.label(),
        detail.date_range
    );
    output::preview_table(&detail.display_name, Some(&note), &rows, rows.len());
    println!(
        "Summary: planned {}, reported {}, achievement {}% ({}, {})",
        format_int(detail.summary.total_planned),
        format_int(detail.summary.total_reported),
        format_number(detail.summary.achievement_rate, 2),
        detail.summary.performance,
        detail.summary.performance.amharic_label()
    );
    println!(
        "Reports in window: {}\n",
        format_int(detail.summary.report_count)
    );
    for rec in &detail.recommendations {
        println!("- [{:?}] {}", rec.kind, rec.message);
        println!("  {}", rec.action);
    }
    Ok(())
}

fn handle_daily(
    reports: &Path,
    date: Option<&str>,
    woreda: Option<&str>,
    catalog: Option<&Path>,
    out_dir: &Path,
) -> Result<()> {
    let date = date_or_today(date)?;
    let catalog = load_catalog(catalog)?;
    let (reports, load) = loader::load_reports(reports)?;
    if load.skipped_rows > 0 {
        println!(
            "Note: {} rows skipped due to parse/validation errors.",
            format_int(load.skipped_rows)
        );
    }

    let woreda = woreda.map(WoredaKey::normalize);
    let summary = daily_summary(&reports, &catalog, date, woreda.as_ref());
    let rows = output::daily_rows(&summary);

    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join("daily_summary.csv");
    output::write_csv(&path, &rows)?;
    info!(path = %path.display(), "daily summary exported");

    let scope = match &summary.woreda {
        Some(key) => key.display_name(),
        None => "All woredas".to_string(),
    };
    let title = format!("Daily Report Summary: {}", scope);
    let note = format!("{} ({})", summary.date, summary.ethiopian_date);
    output::preview_table(&title, Some(&note), &rows, rows.len());
    println!("Total reports: {}\n", format_int(summary.total));
    Ok(())
}

fn handle_calendar(date: Option<&str>) -> Result<()> {
    let date = date_or_today(date)?;
    let et = to_ethiopian(date);
    let fiscal_year = fiscal_year_for(date);
    println!("Gregorian {} = {} ({})", date, et, et.month_name());
    println!("Fiscal year {} E.C.", fiscal_year);
    for period in Period::ALL {
        println!(
            "  {:<16} {}",
            period.label(),
            quarter_date_range(fiscal_year, period)
        );
    }
    Ok(())
}

fn handle_targets(annual: u64) {
    let t = cumulative_quarterly_targets(annual);
    println!("Annual plan {}", format_int(annual));
    println!("  Q1 {}", format_int(t.q1));
    println!("  Q2 {}", format_int(t.q2));
    println!("  Q3 {}", format_int(t.q3));
    println!("  Q4 {}", format_int(t.q4));
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    registry_analytics::init_tracing(cli.verbose);

    let result = match &cli.command {
        Command::Analyze {
            input,
            out_dir,
            preview_rows,
        } => handle_analyze(input, out_dir, *preview_rows),
        Command::Woreda {
            woreda,
            input,
            json,
        } => handle_woreda(woreda, input, json.as_deref()),
        Command::Daily {
            reports,
            date,
            woreda,
            catalog,
            out_dir,
        } => handle_daily(
            reports,
            date.as_deref(),
            woreda.as_deref(),
            catalog.as_deref(),
            out_dir,
        ),
        Command::Calendar { date } => handle_calendar(date.as_deref()),
        Command::Targets { annual } => {
            handle_targets(*annual);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
