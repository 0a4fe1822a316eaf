use chrono::{Datelike, NaiveDate};
use profitability_analytics::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::fmt::Write;

const HEADER: &str =
    "Row ID,Order Date,Ship Date,Sales,Units,Gross Profit,Cost,Division,Product Name,State/Province";

struct Line<'a> {
    date: NaiveDate,
    sales: f64,
    units: f64,
    profit: f64,
    division: &'a str,
    product: &'a str,
    state: &'a str,
}

fn to_csv(lines: &[Line]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (i, l) in lines.iter().enumerate() {
        let ship = l.date + chrono::Duration::days(3);
        let sales = (l.sales * 100.0).round() / 100.0;
        let profit = (l.profit * 100.0).round() / 100.0;
        writeln!(
            out,
            "{},{},{},{:.2},{},{:.2},{:.2},{},{},{}",
            i + 1,
            l.date.format("%d-%m-%Y"),
            ship.format("%d-%m-%Y"),
            sales,
            l.units,
            profit,
            sales - profit,
            l.division,
            l.product,
            l.state
        )
        .unwrap();
    }
    out
}

/// Three years of monthly orders across a small catalog with a yearly cycle.
fn seasonal_history(seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 40.0).unwrap();
    let catalog = [
        ("Wonka Bar - Milk Chocolate", "Chocolate", "Texas", 0.45),
        ("Wonka Bar - Triple Dazzle Caramel", "Chocolate", "California", 0.40),
        ("Everlasting Gobstopper", "Sugar", "New York", 0.30),
        ("Laffy Taffy", "Sugar", "Ohio", 0.20),
        ("Kazookles", "Other", "Utah", 0.08),
    ];

    let mut lines = Vec::new();
    for t in 0..36 {
        let date = NaiveDate::from_ymd_opt(2021 + t / 12, (t % 12) as u32 + 1, 14).unwrap();
        let season = 300.0 * (2.0 * PI * (t % 12) as f64 / 12.0).sin();
        for (k, &(product, division, state, margin)) in catalog.iter().enumerate() {
            let base = 2000.0 - 300.0 * k as f64 + 15.0 * t as f64;
            let sales = (base + season + noise.sample(&mut rng)).max(10.0);
            lines.push(Line {
                date,
                sales,
                units: (sales / 4.0).round(),
                profit: sales * margin,
                division,
                product,
                state,
            });
        }
    }
    to_csv(&lines)
}

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

#[test]
fn test_full_pipeline_on_three_years_of_orders() {
    let pipeline = ProfitabilityPipeline::default();
    let dataset = pipeline
        .run_from_reader(seasonal_history(7).as_bytes())
        .unwrap();

    assert_eq!(dataset.len(), 180);

    for pair in dataset.records.windows(2) {
        assert!(pair[0].order_date <= pair[1].order_date);
    }

    for record in &dataset {
        let split = record.cost_breakdown.expect("cost split");
        assert!(approx(split.total(), record.cost.unwrap(), 1e-6));
        assert!(split.overhead >= 0.0);
        assert!(record.customer_id().unwrap().starts_with("CUST-"));
    }

    let insights = InsightReport::compute(&dataset);
    assert!(insights.is_complete(), "failures: {:?}", insights.failures);
    assert_eq!(insights.products.len(), 5);
    assert_eq!(insights.products[0].product_name, "Wonka Bar - Milk Chocolate");
    assert_eq!(insights.divisions[0].division, "Chocolate");
    assert_eq!(insights.monthly.len(), 36);
    assert_eq!(insights.monthly[0].month, "2021-01");
    assert_eq!(insights.cost_breakdown.len(), 3);

    let forecast = pipeline.forecaster().forecast(&dataset);
    assert!(!forecast.sales_method.is_fallback());
    assert!(!forecast.gross_profit_method.is_fallback());
    assert_eq!(forecast.historical().count(), 36);
    let projected: Vec<&ForecastPoint> = forecast.projected().collect();
    assert_eq!(projected.len(), 6);
    assert_eq!(projected[0].period, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    assert_eq!(projected[5].period, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());

    let report = pipeline.report(&dataset).to_string();
    assert!(report.contains("--- Pareto Analysis ---"));
    assert!(report.contains("out of 5"));
}

#[test]
fn test_holt_winters_tracks_noisy_seasonal_history() {
    let mut rng = StdRng::seed_from_u64(11);
    let noise = Normal::new(0.0, 25.0).unwrap();
    let truth = |t: usize| 5000.0 + 20.0 * t as f64 + 800.0 * (2.0 * PI * (t % 12) as f64 / 12.0).sin();

    let records = (0..36)
        .map(|t| {
            let sales = truth(t) + noise.sample(&mut rng);
            let mut r = TransactionRecord::new("Nerds", "Sugar", sales, 100.0, sales * 0.3);
            r.order_date = NaiveDate::from_ymd_opt(2020 + (t / 12) as i32, (t % 12) as u32 + 1, 1);
            r
        })
        .collect();
    let dataset = Dataset::new(records, false);

    let result = Forecaster::default().with_horizon(12).forecast(&dataset);
    assert!(matches!(result.sales_method, ForecastMethod::HoltWinters { .. }));

    for (h, point) in result.projected().enumerate() {
        let expected = truth(36 + h);
        assert!(
            (point.sales - expected).abs() < 0.1 * expected,
            "month {} expected {:.0}, got {:.0}",
            point.period.month(),
            expected,
            point.sales
        );
    }
}

#[test]
fn test_forecast_falls_back_below_two_years() {
    let records = (0..23)
        .map(|t| {
            let mut r = TransactionRecord::new("Nerds", "Sugar", 100.0 + t as f64, 1.0, 10.0 + t as f64);
            r.order_date = NaiveDate::from_ymd_opt(2021 + (t / 12) as i32, (t % 12) as u32 + 1, 3);
            r
        })
        .collect();
    let result = Forecaster::default().forecast(&Dataset::new(records, false));

    assert!(result.sales_method.is_fallback());
    assert!(result.gross_profit_method.is_fallback());
    for point in result.projected() {
        assert_eq!(point.sales, 122.0);
        assert_eq!(point.gross_profit, 32.0);
    }
}

#[test]
fn test_three_record_product_rollup() {
    let records = [(100.0, 20.0), (200.0, 40.0), (0.0, 0.0)]
        .iter()
        .map(|&(sales, profit)| TransactionRecord::new("Fun Dip", "Sugar", sales, 2.0, profit))
        .collect();
    let dataset = Enricher::default().enrich(Dataset::new(records, false));

    assert_eq!(dataset.records[2].derived.unwrap().gross_margin_pct, 0.0);

    let rows = product_profitability(&dataset).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(approx(rows[0].sales, 300.0, 1e-9));
    assert!(approx(rows[0].gross_profit, 60.0, 1e-9));
    assert!(approx(rows[0].gross_margin_pct, 20.0, 1e-9));
}

#[test]
fn test_price_scenario_on_enriched_record() {
    let mut record = TransactionRecord::new("Wonka Bar", "Chocolate", 100.0, 1.0, 0.0);
    record.cost = Some(100.0);
    record.cost_breakdown = Some(CostBreakdown {
        manufacturing: 70.0,
        shipping: 20.0,
        overhead: 10.0,
    });
    let dataset = Dataset::new(vec![record], true);

    let result = ScenarioSimulator::default().simulate(&dataset, ScenarioInput::new(0.0, 0.0, 10.0));
    assert!(approx(result.new_sales, 110.0, 1e-9));
    assert!(approx(result.new_cost(), 100.0, 1e-9));
    assert!(approx(result.new_profit, 10.0, 1e-9));
    assert!(approx(result.profit_change, 10.0 - result.original_profit, 1e-9));
}

#[test]
fn test_zero_scenario_reproduces_pipeline_totals() {
    let pipeline = ProfitabilityPipeline::default();
    let dataset = pipeline
        .run_from_reader(seasonal_history(3).as_bytes())
        .unwrap();

    let result = pipeline.simulator().simulate(&dataset, ScenarioInput::default());
    assert!(approx(result.new_sales, result.original_sales, 1e-6));
    assert!(approx(result.new_profit, result.original_profit, 1e-6));
    assert!(approx(result.new_margin, result.original_margin, 1e-9));
}

#[test]
fn test_pareto_is_monotone_and_complete() {
    let dataset = ProfitabilityPipeline::default()
        .run_from_reader(seasonal_history(5).as_bytes())
        .unwrap();
    let pareto = pareto_analysis(&dataset).unwrap();

    for pair in pareto.windows(2) {
        assert!(pair[1].cumulative_pct >= pair[0].cumulative_pct);
    }
    assert!(approx(pareto.last().unwrap().cumulative_pct, 100.0, 1e-9));
}

#[test]
fn test_enrichment_is_repeatable() {
    let csv = seasonal_history(9);
    let pipeline = ProfitabilityPipeline::default();
    let first = pipeline.run_from_reader(csv.as_bytes()).unwrap();
    let second = pipeline.run_from_reader(csv.as_bytes()).unwrap();
    assert_eq!(first, second);

    let mut config = PipelineConfig::default();
    config.enrichment.seed = 1234;
    let reseeded = ProfitabilityPipeline::new(config)
        .run_from_reader(csv.as_bytes())
        .unwrap();
    let ids = |d: &Dataset| d.iter().map(|r| r.customer_id().unwrap().to_string()).collect::<Vec<_>>();
    assert_ne!(ids(&first), ids(&reseeded));
}

#[test]
fn test_filtered_view_feeds_insights() {
    let dataset = ProfitabilityPipeline::default()
        .run_from_reader(seasonal_history(1).as_bytes())
        .unwrap();

    let chocolate = DatasetFilter::new()
        .divisions(["Chocolate"])
        .date_range(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
        .apply(&dataset);

    assert_eq!(chocolate.len(), 24);
    let divisions = division_performance(&chocolate).unwrap();
    assert_eq!(divisions.len(), 1);
    assert_eq!(divisions[0].division, "Chocolate");
    assert_eq!(monthly_trends(&chocolate).unwrap().len(), 12);
}

#[test]
fn test_config_round_trip_drives_pipeline() {
    let json = r#"{
        "date_format": "%d-%m-%Y",
        "forecast": { "horizon_months": 2, "seasonal_period": 12 },
        "insights": { "pareto_threshold_pct": 90.0, "low_margin_threshold_pct": 25.0, "top_n": 3 }
    }"#;
    let config = PipelineConfig::from_json_str(json).unwrap();
    assert_eq!(config.enrichment, EnrichmentConfig::default());

    let pipeline = ProfitabilityPipeline::try_new(config).unwrap();
    let dataset = pipeline
        .run_from_reader(seasonal_history(2).as_bytes())
        .unwrap();

    assert_eq!(pipeline.forecaster().forecast(&dataset).projected().count(), 2);
    let summary = pipeline.report(&dataset);
    assert_eq!(summary.top_states.len(), 3);
    assert_eq!(summary.pareto_threshold_pct, 90.0);

    let risks = pipeline.margin_risks(&dataset).unwrap();
    assert!(risks.iter().all(|r| r.gross_margin_pct() < 25.0));
}

#[test]
fn test_unreadable_source_halts() {
    let err = ProfitabilityPipeline::default()
        .run("/no/such/distributor.csv")
        .unwrap_err();
    assert!(matches!(err, ProfitabilityError::Io(_)));
}
