use anyhow::Context;
use clap::{Parser, ValueEnum};
use intentsim_core::{FieldAnalysis, SimulationConfig, Universe};
use intentsim_data::SimulationSnapshot;
use intentsim_io::persistence::decode_state;
use intentsim_io::{to_json, to_json_pretty, write_json_file, StateFormat};
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    GzJson,
    Rkyv,
}

impl From<Format> for StateFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => StateFormat::Json,
            Format::GzJson => StateFormat::GzJson,
            Format::Rkyv => StateFormat::Rkyv,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Print the statistics of a saved universe", long_about = None)]
struct Args {
    /// Saved state file.
    #[arg(default_value = "state/latest.bin")]
    input: String,

    #[arg(short, long, value_enum, default_value_t = Format::GzJson)]
    format: Format,

    /// TOML configuration the state was produced with.
    #[arg(short, long)]
    config: Option<String>,

    /// Include a field analysis.
    #[arg(long)]
    field: bool,

    #[arg(long)]
    pretty: bool,

    /// Write the report to a file (pretty JSON) instead of stdout.
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    snapshot: SimulationSnapshot,
    simulation_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<FieldAnalysis>,
}

fn load_config(path: Option<&str>) -> anyhow::Result<SimulationConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path))?;
            SimulationConfig::from_toml(&content).with_context(|| format!("parsing config {}", path))
        }
        None => Ok(SimulationConfig::default()),
    }
}

fn build_report(args: &Args) -> anyhow::Result<Report> {
    let config = load_config(args.config.as_deref())?;
    let bytes =
        std::fs::read(&args.input).with_context(|| format!("reading state {}", args.input))?;
    let state = decode_state(&bytes, args.format.into())
        .with_context(|| format!("decoding {} as {:?}", args.input, args.format))?;
    let simulation_time = state.simulation_time;
    let universe = Universe::restore(config, state).context("restoring universe")?;

    Ok(Report {
        snapshot: universe.snapshot().clone(),
        simulation_time,
        field: args.field.then(|| universe.analyze_field()),
    })
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let report = build_report(&args)?;
    if let Some(path) = &args.output {
        write_json_file(&report, path).with_context(|| format!("writing report {}", path))?;
        return Ok(());
    }
    let json = if args.pretty {
        to_json_pretty(&report)?
    } else {
        to_json(&report)?
    };
    println!("{}", json);
    Ok(())
}
