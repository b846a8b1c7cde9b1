use anyhow::Result;
use clap::Parser;
use intentsim_lib::app::{AppConfig, Runner, StopSignal};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless intent-field particle simulation", long_about = None)]
struct Args {
    /// Config file path; created with defaults if missing.
    #[arg(short, long, default_value = "intentsim.toml")]
    config: String,

    /// Stop after this many ticks.
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Override the simulation seed.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Re-seed every tick for reproducible runs.
    #[arg(long)]
    deterministic: bool,

    /// Ignore any saved state and start a new universe.
    #[arg(long)]
    fresh: bool,

    /// Milliseconds between ticks.
    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long)]
    no_journal: bool,

    #[arg(long)]
    no_save: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(ticks) = self.ticks {
            config.runner.max_ticks = Some(ticks);
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if self.deterministic {
            config.simulation.deterministic = true;
        }
        if let Some(ms) = self.interval_ms {
            config.runner.tick_interval_ms = ms.max(1);
        }
        if self.no_journal {
            config.runner.journal_dir = None;
        }
        if self.no_save {
            config.runner.autosave_interval = 0;
            config.runner.save_on_exit = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    intentsim_core::init_logging();

    let mut config = AppConfig::load_or_create(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    let stop = StopSignal::new();
    stop.stop_on_ctrl_c();

    let mut runner = Runner::open(config, args.fresh)?;
    if let Some(warning) = runner.restore_warning() {
        eprintln!("Warning: {warning}");
    }

    let summary = runner.run(&stop).await?;
    runner.finish()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
