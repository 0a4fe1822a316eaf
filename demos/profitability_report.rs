use anyhow::Context;
use profitability_analytics::{
    InsightReport, PipelineConfig, ProfitabilityPipeline, ScenarioInput, SeriesType,
};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(data_path) = args.next() else {
        println!("Usage: profitability_report <sales.csv> [config.json]");
        return Ok(());
    };

    let config = match args.next() {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("reading config {}", path))?,
        None => PipelineConfig::default(),
    };

    println!("📊 Distributor Profitability Report");
    println!("═══════════════════════════════════════════════════════════════\n");

    let pipeline = ProfitabilityPipeline::try_new(config)?;
    let dataset = pipeline
        .run(&data_path)
        .with_context(|| format!("loading {}", data_path))?;
    println!("✅ Loaded {} cleaned records from {}\n", dataset.len(), data_path);

    println!("{}", pipeline.report(&dataset));

    let insights = InsightReport::compute(&dataset);
    for failure in &insights.failures {
        println!("⚠️  {} unavailable: {}", failure.insight, failure.reason);
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!("📈 Forecast");
    println!("═══════════════════════════════════════════════════════════════\n");

    let forecast = pipeline.forecaster().forecast(&dataset);
    if forecast.sales_method.is_fallback() {
        println!("   (sales: last-value fallback)");
    }
    if forecast.gross_profit_method.is_fallback() {
        println!("   (gross profit: last-value fallback)");
    }
    for point in forecast.series.iter().filter(|p| p.kind == SeriesType::Forecast) {
        println!(
            "   {}  sales {:>14.2}  gross profit {:>14.2}",
            point.period, point.sales, point.gross_profit
        );
    }
    println!();

    println!("═══════════════════════════════════════════════════════════════");
    println!("🧪 Scenarios");
    println!("═══════════════════════════════════════════════════════════════\n");

    let scenarios = [
        ("Manufacturing +10%", ScenarioInput::new(10.0, 0.0, 0.0)),
        ("Shipping +25%", ScenarioInput::new(0.0, 25.0, 0.0)),
        ("Price +5%", ScenarioInput::new(0.0, 0.0, 5.0)),
        ("Cost squeeze, price +3%", ScenarioInput::new(8.0, 15.0, 3.0)),
    ];
    let simulator = pipeline.simulator();
    for (label, input) in scenarios {
        let result = simulator.simulate(&dataset, input);
        println!(
            "   {:<26} profit {:>14.2} ({:+.2})  margin {:>6.2}% ({:+.2} pts)",
            label, result.new_profit, result.profit_change, result.new_margin, result.margin_change
        );
    }

    Ok(())
}
