use anyhow::{Context, Result};
use cinema_rooms::config::Cli;
use cinema_rooms::report::{room_summary, sort_rows, write_report};
use cinema_rooms::{Crawler, ReqwestTransport};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    cinema_rooms::logging::setup(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.crawl_config()?;
    let transport = ReqwestTransport::new(cli.timeout())?;
    info!(
        cinema = %config.cinema,
        delay_ms = config.delay.as_millis() as u64,
        "starting crawl of {}",
        config.base_url
    );

    let mut crawler = Crawler::new(transport, config);
    let outcome = crawler.run().await;
    let mut rows = crawler.into_rows();

    if let Err(e) = outcome {
        // Keep whatever was revealed before the failure.
        if !rows.is_empty() {
            sort_rows(&mut rows);
            write_report(&cli.output, &rows, cli.format)
                .with_context(|| format!("writing partial report to {}", cli.output.display()))?;
            warn!(
                "partial report with {} row(s) written to {}",
                rows.len(),
                cli.output.display()
            );
        }
        return Err(e).context("crawl failed");
    }

    sort_rows(&mut rows);
    write_report(&cli.output, &rows, cli.format)
        .with_context(|| format!("writing report to {}", cli.output.display()))?;

    for (room, count) in room_summary(&rows) {
        let room = if room.is_empty() { "unknown" } else { room.as_str() };
        info!("room {room}: {count} screening(s)");
    }
    info!("{} row(s) written to {}", rows.len(), cli.output.display());
    Ok(())
}
