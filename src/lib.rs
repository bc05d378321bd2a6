pub mod append;
pub mod categorical;
pub mod cli;
pub mod columns;
pub mod config;
pub mod data;
pub mod dedupe;
pub mod error;
pub mod inference;
pub mod io_utils;
pub mod join;
pub mod loader;
pub mod merge;
pub mod missing;
pub mod noise;
pub mod pipeline;
pub mod placeholders;
pub mod preview;
pub mod report;
pub mod stats;
pub mod store;
pub mod table;

use std::{
    env,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, CleaningOverrides, Commands, InputArgs},
    config::CleaningConfig,
    io_utils::printable_delimiter,
    loader::LoadOptions,
    merge::{MergeEngine, MergeRequest, MergeStrategy},
    pipeline::CleanedTable,
    store::{CsvDirectoryStore, RetryPolicy, save_with_retry},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tidytab", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Merge(args) => handle_merge(&args),
        Commands::MergeColumns(args) => handle_merge_columns(&args),
        Commands::Profile(args) => handle_profile(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let cleaned = clean_input(&args.source, Some(&args.overrides))?;

    let mut writer = io_utils::csv_writer(
        io_utils::open_output(args.output.as_deref())?,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    io_utils::write_table(&mut writer, &cleaned.table).context("Writing cleaned table")?;

    if let Some(path) = &args.report {
        write_json(path, &cleaned.report)
            .with_context(|| format!("Writing cleaning report to {path:?}"))?;
        info!("Cleaning report written to {path:?}");
    }

    if let (Some(store_dir), Some(dataset)) = (&args.store, &args.dataset) {
        let store = CsvDirectoryStore::new(store_dir);
        let attempts = save_with_retry(&store, dataset, &cleaned.table, &RetryPolicy::default())
            .with_context(|| format!("Saving dataset '{dataset}' to {store_dir:?}"))?;
        debug!("Saved dataset '{dataset}' after {attempts} attempt(s)");
    }
    Ok(())
}

fn handle_merge(args: &cli::MergeArgs) -> Result<()> {
    let strategy: MergeStrategy = args.strategy.parse()?;
    let cleaned = clean_input(&args.source, Some(&args.overrides))?;
    let request = MergeRequest {
        strategy,
        merge_column: args.on.clone(),
        join_type: args.join.into(),
        prefix_conflicting_columns: !args.no_prefix_conflicts,
    };

    let engine = MergeEngine::new(CsvDirectoryStore::new(&args.store));
    let (merged, metadata) = engine
        .merge(&args.dataset, &cleaned.table, &request)
        .with_context(|| format!("Merging {:?} into dataset '{}'", args.source.input, args.dataset))?;

    let target = if metadata.is_merged() {
        args.dataset.clone()
    } else {
        args.separate_dataset
            .clone()
            .unwrap_or_else(|| format!("{}_new", args.dataset))
    };
    save_with_retry(engine.store(), &target, &merged, &RetryPolicy::default())
        .with_context(|| format!("Saving dataset '{target}'"))?;
    info!(
        "Dataset '{target}' now holds {} row(s), {} column(s)",
        merged.row_count(),
        merged.column_count()
    );

    print_json(&metadata)
}

fn handle_merge_columns(args: &cli::MergeColumnsArgs) -> Result<()> {
    let cleaned = clean_input(&args.source, None)?;
    let engine = MergeEngine::new(CsvDirectoryStore::new(&args.store));
    let columns = engine
        .available_merge_columns(&args.dataset, &cleaned.table)
        .with_context(|| format!("Comparing columns with dataset '{}'", args.dataset))?;
    print_json(&columns)
}

fn handle_profile(args: &cli::ProfileArgs) -> Result<()> {
    let cleaned = clean_input(&args.source, Some(&args.overrides))?;
    let profiles = stats::profile_table(&cleaned.table);
    if args.json {
        return print_json(&profiles);
    }
    preview::print_table(&stats::profile_headers(), &stats::profile_rows(&profiles));
    info!("Profiled {} column(s)", profiles.len());
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let cleaned = clean_input(&args.source, Some(&args.overrides))?;
    print!("{}", preview::render_preview(&cleaned.table, args.rows));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        args.rows.min(cleaned.table.row_count()),
        cleaned.table.row_count(),
        args.source.input
    );
    Ok(())
}

fn clean_input(source: &InputArgs, overrides: Option<&CleaningOverrides>) -> Result<CleanedTable> {
    let config = resolve_config(source.config.as_deref(), overrides)?;
    let options = LoadOptions {
        delimiter: source.delimiter,
        encoding: io_utils::resolve_encoding(source.input_encoding.as_deref())?,
    };
    info!(
        "Cleaning '{}' with delimiter '{}'",
        source.input.display(),
        source
            .delimiter
            .map_or_else(|| "auto".to_string(), printable_delimiter)
    );
    let bytes = read_input(&source.input)?;
    pipeline::clean_bytes(&bytes, &options, &config)
        .with_context(|| format!("Cleaning {:?}", source.input))
}

fn resolve_config(path: Option<&Path>, overrides: Option<&CleaningOverrides>) -> Result<CleaningConfig> {
    let mut config = match path {
        Some(path) => CleaningConfig::load(path)
            .with_context(|| format!("Loading cleaning configuration from {path:?}"))?,
        None => CleaningConfig::default(),
    };
    if let Some(overrides) = overrides {
        if let Some(mode) = overrides.missing_mode {
            config.missing_mode = mode.into();
        }
        if let Some(threshold) = overrides.drop_threshold {
            config.drop_row_missing_threshold = threshold;
        }
        if overrides.keep_case {
            config.lowercase_categoricals = false;
        }
        if !overrides.date_cols.is_empty() {
            config
                .date_cols
                .get_or_insert_with(Default::default)
                .extend(overrides.date_cols.iter().cloned());
        }
    }
    config.validate().context("Validating cleaning configuration")?;
    Ok(config)
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if io_utils::is_dash(path) {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("Reading input from stdin")?;
        Ok(bytes)
    } else {
        std::fs::read(path).with_context(|| format!("Reading input file {path:?}"))
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing JSON output")?;
    println!("{rendered}");
    Ok(())
}
