use clap::{Parser, Subcommand};
use rc_core::{Quantity, UnitConverter, UnitSystem};
use rc_form::{
    FileBlob, FormError, FormHandler, FormSession, FormValues, UploadedFiles, INPUT_JSON_FILE,
    INPUT_JSON_KEY, load_schema,
};
use rc_series::{
    ChartPalette, DEFAULT_MAX_POINTS, DEFAULT_SMOOTHING_WINDOW, DateRange, JsonFileSource,
    RatioKind, Row, RowFilter, SeriesError, StackOptions, ThemePreference, aggregate,
    build_stack, downsample, fetch_rows, filter_rows, parse_date, ratio_series,
    sorted_categories,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("Series error: {0}")]
    Series(#[from] SeriesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "rc-cli")]
#[command(about = "Reservoir case tooling - case input forms and production charts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a form schema
    ValidateSchema {
        /// Path to the schema (JSON or YAML)
        schema_path: PathBuf,
    },
    /// Render the form view after applying edits
    Form {
        /// Path to the schema (JSON or YAML)
        schema_path: PathBuf,
        /// Tab to show (defaults to the first tab)
        #[arg(long)]
        tab: Option<String>,
        /// Field edit as NAME=JSON (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// Build the submission and write it to a directory
    Submit {
        /// Path to the schema (JSON or YAML)
        schema_path: PathBuf,
        /// Field edit as NAME=JSON (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        /// File attachment as NAME=PATH (repeatable)
        #[arg(long = "file", value_parser = parse_assignment)]
        file: Vec<(String, String)>,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
    /// Stack per-category sums into chart geometry
    Stack {
        /// Saved query response (array, or wrapped in data/results/rows)
        rows_path: PathBuf,
        /// Category column (e.g. Layer)
        #[arg(long)]
        category: String,
        /// Date column
        #[arg(long)]
        date: String,
        /// Value column (e.g. Oil)
        #[arg(long)]
        value: String,
        /// Smoothing window in samples (1 disables smoothing)
        #[arg(long, default_value_t = DEFAULT_SMOOTHING_WINDOW)]
        window: usize,
        /// Fixed axis maximum
        #[arg(long)]
        max: Option<f64>,
        /// Quantity of the value column, for unit conversion
        #[arg(long)]
        quantity: Option<Quantity>,
        /// Target unit system (values are stored in field units)
        #[arg(long, default_value = "field")]
        units: UnitSystem,
        /// Only rows of this well (Identifier column)
        #[arg(long, default_value = RowFilter::ALL)]
        well: String,
        /// Only rows of this layer (Layer column)
        #[arg(long, default_value = RowFilter::ALL)]
        layer: String,
        /// Date range: 1y, 5y, 10y, 15y or all
        #[arg(long, default_value = "all")]
        range: DateRange,
        /// Colour palette
        #[arg(long, default_value = "default")]
        palette: ChartPalette,
        /// Dark theme colours
        #[arg(long)]
        dark: bool,
    },
    /// Water-oil or gas-oil ratio per category and date
    Ratio {
        /// Saved query response
        rows_path: PathBuf,
        /// wor or gor
        #[arg(long)]
        kind: RatioKind,
        /// Category column
        #[arg(long, default_value = "Layer")]
        category: String,
        /// Date column
        #[arg(long, default_value = "Date")]
        date: String,
    },
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

fn main() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateSchema { schema_path } => cmd_validate_schema(&schema_path),
        Commands::Form {
            schema_path,
            tab,
            set,
        } => cmd_form(&schema_path, tab.as_deref(), &set),
        Commands::Submit {
            schema_path,
            set,
            file,
            out,
        } => cmd_submit(&schema_path, &set, &file, &out),
        Commands::Stack {
            rows_path,
            category,
            date,
            value,
            window,
            max,
            quantity,
            units,
            well,
            layer,
            range,
            palette,
            dark,
        } => {
            let converter = quantity.map(|q| UnitConverter::from_field(q, units));
            let filters = [
                RowFilter::new("Identifier", well),
                RowFilter::new("Layer", layer),
            ];
            let options = StackOptions {
                smoothing_window: window,
                explicit_max: max,
                theme: ThemePreference { palette, dark },
                ..StackOptions::default()
            };
            cmd_stack(
                &rows_path,
                (category.as_str(), date.as_str(), value.as_str()),
                &filters,
                range,
                converter.as_ref(),
                &options,
            )
        }
        Commands::Ratio {
            rows_path,
            kind,
            category,
            date,
        } => cmd_ratio(&rows_path, kind, &category, &date),
    }
}

fn cmd_validate_schema(schema_path: &Path) -> CliResult<()> {
    println!("Validating schema: {}", schema_path.display());
    let schema = load_schema(schema_path)?;
    println!("✓ Schema is valid");
    for tab in &schema.tabs {
        let fields: usize = tab.sections.iter().map(|s| s.fields.len()).sum();
        println!(
            "  {} - {} ({} sections, {} fields)",
            tab.id,
            tab.label,
            tab.sections.len(),
            fields
        );
    }
    Ok(())
}

fn open_session(schema_path: &Path, edits: &[(String, String)]) -> CliResult<FormSession> {
    let schema = load_schema(schema_path)?;
    let mut session = FormSession::new(schema);
    for (name, raw) in edits {
        // Bare words are taken as strings so `--set wellModel=horizontal` works.
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        session.on_change(name, value);
    }
    Ok(session)
}

fn cmd_form(schema_path: &Path, tab: Option<&str>, edits: &[(String, String)]) -> CliResult<()> {
    let mut session = open_session(schema_path, edits)?;
    if let Some(tab) = tab
        && !session.set_active_tab(tab)
    {
        return Err(CliError::InvalidInput(format!("unknown tab '{tab}'")));
    }
    println!("{}", serde_json::to_string_pretty(&session.view())?);
    Ok(())
}

/// Writes submissions into a directory.
struct DirectoryWriter<'a> {
    out_dir: &'a Path,
    outcome: std::io::Result<()>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    field: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    bytes: usize,
}

impl DirectoryWriter<'_> {
    fn write(&self, files: &UploadedFiles) -> std::io::Result<()> {
        std::fs::create_dir_all(self.out_dir)?;
        let mut manifest = Vec::new();
        for (field, blob) in files {
            if field == INPUT_JSON_KEY {
                std::fs::write(self.out_dir.join(INPUT_JSON_FILE), &blob.bytes)?;
                continue;
            }
            manifest.push(ManifestEntry {
                field,
                file_name: &blob.file_name,
                content_type: &blob.content_type,
                bytes: blob.bytes.len(),
            });
        }
        let text = serde_json::to_string_pretty(&manifest).map_err(std::io::Error::other)?;
        std::fs::write(self.out_dir.join("files.json"), text)
    }
}

impl FormHandler for DirectoryWriter<'_> {
    fn on_submit(&mut self, _values: &FormValues, files: &UploadedFiles) {
        self.outcome = self.write(files);
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}

fn cmd_submit(
    schema_path: &Path,
    edits: &[(String, String)],
    attachments: &[(String, String)],
    out_dir: &Path,
) -> CliResult<()> {
    let mut session = open_session(schema_path, edits)?;
    for (name, path) in attachments {
        let path = Path::new(path);
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name.as_str())
            .to_string();
        let bytes = std::fs::read(path)?;
        session.attach_file(name, FileBlob::new(file_name, content_type_for(path), bytes));
    }

    let mut writer = DirectoryWriter {
        out_dir,
        outcome: Ok(()),
    };
    let submission = session.submit(&mut writer);
    writer.outcome?;

    println!("✓ Wrote {}", out_dir.join(INPUT_JSON_FILE).display());
    println!("  Values: {}", submission.values.len());
    println!("  Attached files: {}", submission.files.len() - 1);
    Ok(())
}

fn load_rows(rows_path: &Path) -> CliResult<Vec<Row>> {
    let source = JsonFileSource::new(rows_path);
    let rows = fetch_rows(&source, "SELECT *")?;
    tracing::info!(rows = rows.len(), path = %rows_path.display(), "loaded rows");
    Ok(rows)
}

fn cmd_stack(
    rows_path: &Path,
    (category_key, date_key, value_key): (&str, &str, &str),
    filters: &[RowFilter],
    range: DateRange,
    converter: Option<&UnitConverter>,
    options: &StackOptions,
) -> CliResult<()> {
    let rows = filter_rows(&load_rows(rows_path)?, filters);
    let today = chrono::Local::now().date_naive();
    let rows: Vec<Row> = rows
        .into_iter()
        .filter(|row| {
            row.get(date_key)
                .and_then(parse_date)
                .is_some_and(|d| range.contains(d, today))
        })
        .collect();

    let series = aggregate(&rows, category_key, date_key, value_key, converter);
    let categories = sorted_categories(&series);
    let series = downsample(&series, &categories, DEFAULT_MAX_POINTS);
    let chart = build_stack(&series, &categories, options);

    let svg: Vec<Value> = chart
        .layers
        .iter()
        .map(|l| json!({ "category": l.category, "color": l.color, "d": l.path.to_svg() }))
        .collect();
    let units = converter.map(|c| rc_core::unit_label(c.quantity, c.to));
    let output = json!({ "units": units, "chart": chart, "svg": svg });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_ratio(rows_path: &Path, kind: RatioKind, category_key: &str, date_key: &str) -> CliResult<()> {
    let rows = load_rows(rows_path)?;
    let series = ratio_series(
        &rows,
        category_key,
        date_key,
        kind.numerator_key(),
        kind.denominator_key(),
    );
    let ordered: Vec<Value> = sorted_categories(&series)
        .into_iter()
        .map(|category| json!({ "category": category, "points": series[&category] }))
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "kind": kind.to_string(), "series": ordered }))?
    );
    Ok(())
}
