use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use simple_wbd::{
    Client, ClientConfig, DataType, DateSpec, IndicatorFilter, InstrumentalOptions, Interval,
    Level, ResponseFormat, ResultSet, Table, storage,
};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "wbd",
    version,
    about = "Fetch World Bank climate and indicator data"
)]
struct Cli {
    /// Log every request (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Override the Indicators API base URL.
    #[arg(long, global = true)]
    indicator_url: Option<String>,
    /// Override the Climate Data API base URL.
    #[arg(long, global = true)]
    climate_url: Option<String>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Historical temperature or precipitation per place (place,period,value rows).
    Instrumental(InstrumentalArgs),
    /// Every data type and interval for the given places, pivoted into a table.
    ClimateTable(ClimateTableArgs),
    /// Indicator data for countries as a table.
    Dataset(DatasetArgs),
    /// List countries and aggregate regions.
    Countries,
    /// List indicators.
    Indicators(IndicatorsArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct InstrumentalArgs {
    /// Places separated by comma or semicolon: names, ISO codes or basin ids
    #[arg(short, long)]
    places: String,
    /// pr (precipitation) or tas (temperature)
    #[arg(short = 't', long = "type", default_value = "tas")]
    data_type: DataType,
    /// year, month or decade
    #[arg(short, long, default_value = "year")]
    interval: Interval,
    /// Response format requested from the API (json or csv)
    #[arg(long, default_value = "json")]
    api_format: ResponseFormat,
    /// Save results to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

#[derive(Args, Debug)]
struct ClimateTableArgs {
    #[arg(short, long)]
    places: String,
    /// Data types to fetch (default: all)
    #[arg(long, value_delimiter = ',')]
    types: Vec<DataType>,
    /// Intervals to fetch (default: all)
    #[arg(long, value_delimiter = ',')]
    intervals: Vec<Interval>,
    /// Levels spread across columns: country, type, interval (default: type,interval)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<Level>,
    /// Show yearly row labels as dates
    #[arg(long, default_value_t = false)]
    use_dates: bool,
    /// Save the table as CSV instead of printing it.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Indicator codes separated by comma or semicolon (e.g., SP.POP.TOTL)
    #[arg(short, long)]
    indicators: String,
    /// Countries separated by comma or semicolon (default: all)
    #[arg(short, long, default_value = "")]
    countries: String,
    /// Year (YYYY) or range (YYYY:YYYY)
    #[arg(short = 'd', long)]
    date: Option<String>,
    /// Dates as rows and countries as columns
    #[arg(long, default_value_t = false, conflicts_with = "metadata")]
    timeseries: bool,
    /// Append country catalogue columns (region, income level, ...)
    #[arg(long, default_value_t = false)]
    metadata: bool,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IndicatorsArgs {
    /// common or featured; omit for every indicator
    #[arg(long)]
    filter: Option<IndicatorFilter>,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.indicator_url {
        config.indicator_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(url) = cli.climate_url {
        config.climate_base_url = url.trim_end_matches('/').to_string();
    }
    let client = Client::new(config)?;

    match cli.cmd {
        Command::Instrumental(args) => cmd_instrumental(&client, args),
        Command::ClimateTable(args) => cmd_climate_table(&client, args),
        Command::Dataset(args) => cmd_dataset(&client, args),
        Command::Countries => {
            let rows = client.get_country_list(&[])?;
            emit_rows(&rows, None)
        }
        Command::Indicators(args) => {
            let rows = client.get_indicator_list(args.filter)?;
            emit_rows(&rows, None)
        }
    }
}

fn cmd_instrumental(client: &Client, args: InstrumentalArgs) -> Result<()> {
    let places = parse_list(&args.places);
    if places.is_empty() {
        bail!("at least one place required");
    }
    let opts = InstrumentalOptions {
        data_type: args.data_type,
        interval: args.interval,
        format: args.api_format,
    };
    let data = client
        .get_instrumental_with(places, &opts)
        .context("fetch instrumental data")?;

    match args.out.as_ref() {
        Some(path) => {
            save_result_set(&data, path, args.format)?;
            eprintln!("Saved {} places to {}", data.len(), path.display());
        }
        None => storage::write_csv(&data, io::stdout().lock())?,
    }
    Ok(())
}

fn save_result_set(data: &ResultSet<f64>, path: &Path, format: Option<OutFormat>) -> Result<()> {
    let fmt = match format {
        Some(OutFormat::Csv) => "csv",
        Some(OutFormat::Json) => "json",
        None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
    }
    .to_ascii_lowercase();
    match fmt.as_str() {
        "csv" => storage::save_csv(data, path)?,
        "json" => storage::save_json(data, path)?,
        other => bail!("unsupported format: {}", other),
    }
    Ok(())
}

fn cmd_climate_table(client: &Client, args: ClimateTableArgs) -> Result<()> {
    let places = parse_list(&args.places);
    let dataset = client.get_instrumental_dataset(places, &args.types, &args.intervals)?;
    let table = dataset.as_list(&args.columns, args.use_dates)?;
    emit_table(&table, args.out.as_deref())
}

fn cmd_dataset(client: &Client, args: DatasetArgs) -> Result<()> {
    let indicators = parse_list(&args.indicators);
    let countries = parse_list(&args.countries);
    let date = match &args.date {
        Some(s) => Some(
            DateSpec::parse(s)
                .ok_or_else(|| anyhow::anyhow!("invalid --date, expected YYYY or YYYY:YYYY"))?,
        ),
        None => None,
    };
    let dataset = if args.metadata {
        client.get_dataset_with_metadata(&indicators, countries, date)?
    } else {
        client.get_dataset(&indicators, countries, date)?
    };
    emit_table(
        &dataset.as_list_with(args.timeseries, args.metadata),
        args.out.as_deref(),
    )
}

fn emit_table(table: &Table, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            storage::save_table_csv(table, path)?;
            eprintln!("Saved {} rows to {}", table.len().saturating_sub(1), path.display());
        }
        None => storage::write_table_csv(table, io::stdout().lock())?,
    }
    Ok(())
}

fn emit_rows(rows: &[Vec<String>], out: Option<&Path>) -> Result<()> {
    let table: Table = rows
        .iter()
        .map(|r| r.iter().map(|s| simple_wbd::Cell::text(s.as_str())).collect())
        .collect();
    emit_table(&table, out)
}
