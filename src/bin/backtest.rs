use clap::Parser;
use clawbot::backtest::{BacktestResult, Backtester, MarketScenario, SyntheticDataGenerator};
use clawbot::config::AppConfig;
use clawbot::execution::PaperExecutor;
use std::path::PathBuf;
use std::sync::Arc;

/// Replay historical or synthetic prices through the trading loop
#[derive(Debug, Parser)]
#[command(name = "backtest")]
struct Args {
    /// CSV file with `timestamp,price` rows; synthetic scenarios are used if omitted
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Starting balance (overrides configuration)
    #[arg(long)]
    balance: Option<f64>,

    /// Seed for paper fills and synthetic data
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Samples per synthetic scenario
    #[arg(long, default_value_t = 2000)]
    samples: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("clawbot=info")
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load()?;
    if let Some(balance) = args.balance {
        config.initial_balance = balance;
        config.validate()?;
    }

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║            CLAWBOT BACKTESTING SUITE                  ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let mut results: Vec<(String, BacktestResult)> = Vec::new();

    if let Some(path) = &args.csv {
        let backtester = Backtester::new(config.clone(), Arc::new(PaperExecutor::new(args.seed)));
        let result = backtester.run_csv(path).await?;
        results.push((path.display().to_string(), result));
    } else {
        for scenario in MarketScenario::ALL {
            let samples = SyntheticDataGenerator::new(args.seed).generate(
                scenario,
                args.samples,
                config.tick_interval_secs as i64,
            );
            let backtester =
                Backtester::new(config.clone(), Arc::new(PaperExecutor::new(args.seed)));

            match backtester.run(samples).await {
                Ok(result) => results.push((format!("{:?}", scenario), result)),
                Err(e) => eprintln!("❌ Backtest failed for {:?}: {}", scenario, e),
            }
        }
    }

    print_summary(&results);
    Ok(())
}

fn print_summary(results: &[(String, BacktestResult)]) {
    println!(
        "\n{:<30} {:>10} {:>8} {:>8} {:>12} {:>7}",
        "Run", "P&L", "Trades", "Win%", "Balance", "Paused"
    );
    println!("{}", "─".repeat(80));

    for (name, result) in results {
        println!(
            "{:<30} {:>10.4} {:>8} {:>8.1} {:>12.2} {:>7}",
            name,
            result.total_pnl,
            result.trades,
            result.win_rate,
            result.final_balance,
            if result.paused { "yes" } else { "no" }
        );
    }

    let total_trades: usize = results.iter().map(|(_, r)| r.trades).sum();
    println!("\n📊 Total trades: {}", total_trades);
    println!("\n═══════════════════════════════════════════════════════\n");
}
