use anyhow::Context;
use clawbot::config::AppConfig;
use clawbot::execution::{ExecutionProvider, HttpMarketClient, PaperExecutor};
use clawbot::telemetry::{self, LogBuffer, LogFilter};
use clawbot::Engine;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const LOG_EXPORT_LINES: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_buffer = LogBuffer::default();
    telemetry::setup_logging(log_buffer.clone());

    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing::info!("🚀 ClawBot starting");
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Balance: ${:.2}", config.initial_balance);
    tracing::info!("  Market: {}", config.provider.market);
    tracing::info!(
        "  Tick: {}s, trade interval: {}s",
        config.tick_interval_secs,
        config.trade_interval_secs
    );
    tracing::info!(
        "  Risk/trade: {}%, max drawdown: {}%, max size: ${:.2}",
        config.risk.risk_per_trade_pct,
        config.risk.max_drawdown_pct,
        config.risk.max_position_size
    );
    tracing::info!(
        "  Execution: {}",
        if config.provider.paper_trading {
            "paper"
        } else {
            "live"
        }
    );

    if config.provider.api_key.is_empty() {
        tracing::warn!("CLAWBOT_PROVIDER__API_KEY is not set; requests are unauthenticated");
    }

    let client = HttpMarketClient::new(&config.provider, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let executor: Arc<dyn ExecutionProvider> = if config.provider.paper_trading {
        Arc::new(PaperExecutor::new(config.provider.paper_seed))
    } else {
        Arc::new(client.clone())
    };

    let engine = Arc::new(Engine::from_config(&config, Arc::new(client), executor));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let engine_task = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .run(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        })
    };

    let status_period = config.status_interval();
    let mut status_ticker = interval_at(Instant::now() + status_period, status_period);
    status_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let export_period = config.log_export_interval();
    let mut export_ticker = interval_at(Instant::now() + export_period, export_period);
    export_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("\nPress Ctrl+C to stop...\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = status_ticker.tick() => {
                log_status(&engine);
            }
            _ = export_ticker.tick() => {
                println!("[LOG EXPORT]\n{}", export_logs(&log_buffer));
            }
        }
    }

    let _ = shutdown_tx.send(());
    if let Err(e) = engine_task.await {
        tracing::error!("Engine task exited abnormally: {}", e);
    }

    let final_status = engine.status();
    tracing::info!(
        "Final performance: {}",
        serde_json::to_string(&final_status.performance)?
    );

    println!("{}", export_logs(&log_buffer));

    tracing::info!("👋 ClawBot stopped");
    Ok(())
}

fn export_logs(buffer: &LogBuffer) -> String {
    buffer.export_csv(LogFilter {
        level: None,
        limit: Some(LOG_EXPORT_LINES),
    })
}

fn log_status(engine: &Engine) {
    let status = engine.status();

    tracing::info!("\n=== Status ===");
    tracing::info!(
        "  Circuit: paused={} losses={}",
        status.circuit.paused,
        status.circuit.consecutive_losses
    );
    tracing::info!(
        "  Risk: balance=${:.2} drawdown={:.2}% peak=${:.2} open={}",
        status.risk.balance,
        status.risk.drawdown_pct,
        status.risk.peak,
        status.risk.open_positions
    );
    tracing::info!(
        "  Performance: trades={} win_rate={:.1}% pnl=${:.2}",
        status.performance.total_trades,
        status.performance.win_rate,
        status.performance.total_pnl
    );
    match status.last_price {
        Some(price) => tracing::info!("  Last price: {:.4}", price),
        None => tracing::info!("  Last price: n/a"),
    }
}
