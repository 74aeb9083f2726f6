use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use registry_analytics::calendar::{new_year_date, pagume_length};
use registry_analytics::types::PerformanceTier;
use registry_analytics::util::achievement_rate;
use registry_analytics::{
    analyze, cumulative_quarterly_targets, quarter_date_range, to_ethiopian, AnalysisRequest,
    Period, Plan, PlanEntry, Report, ServiceCatalog, WoredaKey,
};

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(12, 0, 0).unwrap()
}

#[test]
fn year_end_target_is_always_the_annual_plan() {
    for annual in (0..10_000u64).step_by(7) {
        let t = cumulative_quarterly_targets(annual);
        assert_eq!(t.q4, annual);
        assert!(t.q1 <= t.q2 && t.q2 <= t.q3);
    }
}

#[test]
fn zero_plan_never_divides() {
    for reported in [0u64, 1, 17, 1_000_000] {
        assert_eq!(achievement_rate(reported, 0), 0.0);
    }
    assert!(achievement_rate(11, 10) > 100.0);
}

#[test]
fn every_day_maps_to_a_valid_ethiopian_date() {
    let mut day = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2030, 12, 31).unwrap();
    let mut previous = to_ethiopian(day);
    while day < end {
        day += Duration::days(1);
        let et = to_ethiopian(day);
        assert!((1..=13).contains(&et.month), "{} -> {:?}", day, et);
        if et.month == 13 {
            assert!(et.day <= pagume_length(et.year), "{} -> {:?}", day, et);
        } else {
            assert!((1..=30).contains(&et.day));
        }
        if day == new_year_date(day.year()) {
            assert_eq!(et.year, previous.year + 1);
            assert_eq!((et.month, et.day), (1, 1));
        } else {
            assert_eq!(et.year, previous.year);
        }
        previous = et;
    }
}

#[test]
fn registry_catalog_categories_drive_breakdowns() {
    let catalog = ServiceCatalog::registry_default();
    let plans = vec![Plan::new(
        "Woreda 6",
        2017,
        vec![
            PlanEntry::new("ልደት", Some("በወቅቱ"), 400),
            PlanEntry::new("ልደት", Some("በዘገየ"), 100),
            PlanEntry::new("መሸኛ", None, 40),
        ],
    )];
    let window = quarter_date_range(2017, Period::Q3);
    let mut reports = Vec::new();
    for i in 0..90 {
        let when = noon(window.start + Duration::days(i));
        reports.push(Report::new("ልደት", Some("በወቅቱ"), "6", when));
    }
    for _ in 0..5 {
        reports.push(Report::new("ልደት", Some("በዘገየ"), "6", noon(window.end)));
    }
    for _ in 0..30 {
        reports.push(Report::new("መሸኛ", None, "6", noon(window.end)));
    }

    let report = analyze(&plans, &reports, catalog, AnalysisRequest::new(2017, Period::Q3));
    let w6 = &report.woreda_analysis[&WoredaKey::normalize("6")];
    let birth = &w6.services["ልደት"];
    // 500 / 4 = 125 per quarter
    assert_eq!(birth.planned, 375);
    assert_eq!(birth.reported, 95);
    let breakdown = birth.category_breakdown.as_ref().unwrap();
    assert_eq!(breakdown.len(), 3);
    assert_eq!(breakdown[0].planned, 300);
    assert_eq!(breakdown[1].planned, 75);
    assert_eq!(breakdown[2].planned, 0);

    let transfer = &w6.services["መሸኛ"];
    assert_eq!(transfer.planned, 30);
    assert_eq!(transfer.achievement_rate, 100.0);
    assert_eq!(transfer.performance, PerformanceTier::Excellent);
    assert_eq!(report.service_analysis.len(), catalog.len());
}

#[test]
fn repeated_analysis_serializes_identically() {
    let catalog = ServiceCatalog::registry_default();
    let plans: Vec<Plan> = (1..=12)
        .map(|w| {
            Plan::new(
                &format!("Woreda {}", w),
                2017,
                vec![
                    PlanEntry::new("መታወቂያ", Some("አዲስ"), 40 * w),
                    PlanEntry::new("የነዋሪነት ምዝገባ", None, 25),
                ],
            )
        })
        .collect();
    let start = quarter_date_range(2017, Period::Yearly).start;
    let reports: Vec<Report> = (0..600u64)
        .map(|i| {
            let woreda = format!("{}", i % 14 + 1);
            let service = if i % 3 == 0 { "የነዋሪነት ምዝገባ" } else { "መታወቂያ" };
            let category = if i % 3 == 0 { None } else { Some("አዲስ") };
            Report::new(service, category, &woreda, noon(start + Duration::days((i % 360) as i64)))
        })
        .collect();

    let request = AnalysisRequest::new(2017, Period::Yearly);
    let first = serde_json::to_string(&analyze(&plans, &reports, catalog, request)).unwrap();
    let second = serde_json::to_string(&analyze(&plans, &reports, catalog, request)).unwrap();
    assert_eq!(first, second);

    let report = analyze(&plans, &reports, catalog, request);
    let orphans: Vec<&str> = report
        .data_issues
        .reports_without_plans
        .iter()
        .map(|r| r.woreda.as_str())
        .collect();
    assert_eq!(orphans, ["13", "14"]);
}
