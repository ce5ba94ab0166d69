use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use glob::glob;
use incidentboard::{
    aggregate::totals_by_region,
    chart::{render_chart, Theme},
    export::{self, ExportName},
    filter::filter_range_or_bounds,
    process::{utils::format_thousands, Region},
    Config, FieldKey, Row, Session,
};
use std::{
    io,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Merge and summarise casualty CSV files", long_about = None)]
struct Cli {
    /// YAML config file (falls back to $INCIDENTBOARD_CONFIG)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge the inputs and write the unified table
    Merge(MergeArgs),
    /// Print key figures for the inputs
    Summary(InputArgs),
    /// Draw daily casualties per region
    Chart(ChartArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// CSV files; region is inferred from each file name
    #[arg(value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Glob patterns expanded to more CSV files
    #[arg(long = "glob")]
    patterns: Vec<String>,

    /// CSV files uploaded as Gaza daily data
    #[arg(long, value_hint = ValueHint::FilePath)]
    gaza: Vec<PathBuf>,

    /// CSV files uploaded as West Bank daily data
    #[arg(long = "west-bank", value_hint = ValueHint::FilePath)]
    west_bank: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
    Parquet,
}

impl Format {
    fn ext(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Parquet => "parquet",
        }
    }
}

#[derive(Args, Debug)]
struct MergeArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Export formats
    #[arg(short, long, value_enum, default_values_t = vec![Format::Csv])]
    format: Vec<Format>,

    /// Write one `<prefix>_<region>` file per region instead of a single
    /// timestamped file
    #[arg(long)]
    by_region: bool,

    /// Output directory (overrides config)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output image; `.png` for PNG, anything else is SVG
    #[arg(short, long, default_value = "daily_casualties.svg", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// First date shown (defaults to the earliest date)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date shown (defaults to the latest date)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Overrides the configured theme
    #[arg(long, value_enum)]
    theme: Option<Theme>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Command::Merge(args) => handle_merge(config, args),
        Command::Summary(args) => handle_summary(config, args),
        Command::Chart(args) => handle_chart(config, args),
    }
}

fn load_session(config: Config, input: &InputArgs) -> Result<Session> {
    let mut files = input.files.clone();
    for pattern in &input.patterns {
        let mut matched = 0;
        for entry in glob(pattern).with_context(|| format!("bad glob pattern {}", pattern))? {
            files.push(entry?);
            matched += 1;
        }
        if matched == 0 {
            warn!(pattern = %pattern, "glob matched no files");
        }
    }

    let mut session = Session::new(config);
    session.add_paths(
        input
            .gaza
            .iter()
            .map(|p| (p, Some(Region::Gaza)))
            .chain(input.west_bank.iter().map(|p| (p, Some(Region::WestBank))))
            .chain(files.iter().map(|p| (p, None))),
    );
    info!(files = session.uploads().len(), "loaded inputs");
    Ok(session)
}

const PROMPT: &str = "No data: pass one or more CSV files (or --gaza / --west-bank).";

fn handle_merge(config: Config, args: MergeArgs) -> Result<()> {
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    let prefix = config.export_prefix.clone();
    let session = load_session(config, &args.input)?;
    let Some(table) = session.unified() else {
        println!("{}", PROMPT);
        return Ok(());
    };

    let rows: Vec<_> = table.rows.iter().collect();
    let stamp = ExportName::Timestamped(Local::now().naive_local());
    for format in &args.format {
        let write: fn(&Path, &str, &[&Row]) -> Result<PathBuf> = match format {
            Format::Csv => export::write_csv_file,
            Format::Json => export::write_json,
            Format::Parquet => export::write_parquet,
        };
        if args.by_region {
            for path in export::write_per_region(&out_dir, &prefix, format.ext(), &rows, write)? {
                println!("Merged region data saved to {}", path.display());
            }
        } else {
            let path = write(&out_dir, &stamp.file_name(&prefix, format.ext()), &rows)?;
            println!("Merged {} rows saved to {}", rows.len(), path.display());
        }
    }
    Ok(())
}

fn handle_summary(config: Config, args: InputArgs) -> Result<()> {
    let session = load_session(config, &args)?;
    let (Some(table), Some(totals)) = (session.unified(), session.totals()) else {
        println!("{}", PROMPT);
        return Ok(());
    };

    for (file, map) in session.column_maps() {
        let missing: Vec<String> = map.missing().iter().map(|k| k.to_string()).collect();
        info!(file = %file, mapped = map.len(), missing = ?missing, "column mapping");
    }

    println!("Key Figures ({} rows)", table.len());
    for (label, value) in totals.key_figures() {
        println!("  {:<26}{:>12}", label, value);
    }
    if let Some((min, max)) = table.date_bounds() {
        println!("Dates: {} to {}", min, max);
    }
    println!("Killed by region:");
    for (region, t) in totals_by_region(table) {
        println!(
            "  {:<26}{:>12}",
            region,
            format_thousands(t.get(FieldKey::Killed))
        );
    }
    Ok(())
}

fn handle_chart(config: Config, args: ChartArgs) -> Result<()> {
    let theme = args.theme.unwrap_or(config.theme);
    let size = config.chart_size;
    let session = load_session(config, &args.input)?;
    let Some(table) = session.unified() else {
        println!("{}", PROMPT);
        return Ok(());
    };

    let (start, end, mut rows) = filter_range_or_bounds(table, args.from, args.to)?;
    rows.sort_by_key(|r| r.date);
    render_chart(&args.output, &rows, start, end, theme, size)?;
    println!("Chart written to {}", args.output.display());
    Ok(())
}
