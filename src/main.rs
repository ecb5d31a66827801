use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Runtime;

use signal_sniper::engine::{InMemorySessionStore, SelectionStep, SessionStore, handle_input};
use signal_sniper::{
    AppConfig, Cli, Command, Instrument, ProgressEvent, RunOptions, StrategyRegistry, build_engine,
};

const CLI_SESSION: &str = "cli";

fn main() -> Result<()> {
    // A. Init Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // B. Parse Args
    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    // C. Config, loaded once and shared read-only
    let config = AppConfig::load(args.config.as_deref())?;
    let rt = Runtime::new().context("Failed to create Tokio runtime")?;

    match &args.command {
        Command::Strategies => {
            print_strategies(&config);
            Ok(())
        }
        Command::Instruments => {
            print_instruments(&config);
            Ok(())
        }
        Command::Analyze {
            instrument,
            strategy,
            run,
        } => rt.block_on(analyze(&config, instrument, strategy, run)),
        Command::Interactive { run } => match select_interactively(&config)? {
            Some((symbol, strategy)) => rt.block_on(analyze(&config, &symbol, &strategy, run)),
            None => Ok(()),
        },
    }
}

async fn analyze(config: &AppConfig, instrument: &str, strategy: &str, run: &RunOptions) -> Result<()> {
    let engine = build_engine(config, run)?;
    let progress = |event: &ProgressEvent| -> Result<()> {
        println!("... {}", event);
        Ok(())
    };

    let combined = engine.run_analysis(instrument, strategy, Some(&progress)).await?;

    if run.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&combined).context("Failed to serialize report")?
        );
    } else {
        println!("\n{}", combined.summary());
    }
    Ok(())
}

fn print_strategies(config: &AppConfig) {
    for policy in StrategyRegistry::from_config(config).policies() {
        let [primary, entry] = policy.timeframes();
        println!(
            "{:<10} primary {} ({} bars), entry {} ({} bars)",
            policy.kind(),
            primary.id(),
            primary.bars_requested,
            entry.id(),
            entry.bars_requested
        );
    }
}

fn print_instruments(config: &AppConfig) {
    for symbol in &config.instruments {
        let instrument = Instrument::new(symbol);
        println!(
            "{:<10} {:<8} pip {}",
            instrument.symbol,
            instrument.class.label(),
            instrument.pip_size()
        );
    }
}

/// Walk the selection steps on stdin. `None` when input ends before a choice is made.
fn select_interactively(config: &AppConfig) -> Result<Option<(String, String)>> {
    let instruments: Vec<Instrument> = config
        .instruments
        .iter()
        .map(|s| Instrument::new(s))
        .collect();
    let store = InMemorySessionStore::new();
    store.create(CLI_SESSION);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let step = match store.get(CLI_SESSION) {
            Some(step) => step,
            None => store.create(CLI_SESSION),
        };
        if let SelectionStep::Ready { symbol, strategy } = step {
            return Ok(Some((symbol, strategy.to_string())));
        }

        print!(
            "Choose a {} [{}] (or 'reset'): ",
            step.prompt(),
            step.options(&instruments).join(", ")
        );
        std::io::stdout().flush().context("Failed to write prompt")?;

        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line.context("Failed to read selection")?;
        if line.trim().eq_ignore_ascii_case("reset") {
            store.create(CLI_SESSION);
            continue;
        }
        if let Err(e) = handle_input(&store, CLI_SESSION, &line, &instruments) {
            println!("{}", e);
        }
    }
}
