use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::path::PathBuf;
use std::time::Instant;

use asn1_csv::batch::{
    convert_all, convert_file, expand_inputs, load_compiled_schema, parse_ext_list, save_compiled_schema,
};
use asn1_csv::config::{level_filter, Properties, Settings};
use asn1_csv::Schema;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Schema-driven ASN.1 BER/DER Decoder -> CSV (one row per repetition)",
    long_about = None
)]
struct Cli {
    /// Properties file with SCHEMA, DATA_TYPES, INPUT_FILE, OUTPUT_FILE, LOG_LEVEL, BUFFER_SIZE
    #[arg(long = "properties")]
    properties: Option<PathBuf>,

    /// Comma-separated column addresses, e.g. "REC_NO,79.0,79.19.2.*.1"
    #[arg(long = "schema")]
    schema: Option<String>,

    /// Comma-separated data types, one per schema column
    #[arg(long = "data-types")]
    data_types: Option<String>,

    /// Path to save the compiled binary schema
    #[arg(long = "compile-schema")]
    compile_schema: Option<PathBuf>,

    /// Path to load a pre-compiled binary schema
    #[arg(long = "load-compiled")]
    load_compiled: Option<PathBuf>,

    /// Single output CSV file (only with exactly one input file)
    #[arg(short = 'o', long = "output", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Output directory; each input becomes <name>.csv
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Optional: only decode files matching these extensions (comma-separated), e.g. "dat,ber"
    #[arg(long = "ext")]
    ext: Option<String>,

    /// Write buffer size in kilobytes
    #[arg(long = "buffer-kb")]
    buffer_kb: Option<usize>,

    /// Reject long-form lengths at or above this value (0 = no limit)
    #[arg(long = "max-length")]
    max_length: Option<usize>,

    /// Maximum nesting depth of constructed fields (0 = no limit)
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// ALL, INFO, OFF or error|warn|info|debug|trace
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// BER-encoded input files or directories (directories scanned recursively)
    inputs: Vec<PathBuf>,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.properties {
        Some(path) => {
            println!("Properties file: {:?}", path);
            Settings::from_properties(&Properties::load(path)?)?
        }
        None => Settings::default(),
    };

    if cli.schema.is_some() {
        settings.schema = cli.schema.clone();
    }
    if cli.data_types.is_some() {
        settings.data_types = cli.data_types.clone();
    }
    if cli.output.is_some() {
        settings.output_file = cli.output.clone();
    }
    if cli.log_level.is_some() {
        settings.log_level = cli.log_level.clone();
    }
    if let Some(kb) = cli.buffer_kb {
        if kb == 0 {
            bail!("--buffer-kb must be a positive integer");
        }
        settings.buffer_kb = Some(kb);
    }
    if cli.max_length.is_some() {
        settings.max_length = cli.max_length;
    }
    if cli.max_depth.is_some() {
        settings.max_depth = cli.max_depth;
    }
    Ok(settings)
}

fn init_logging(level_name: Option<&str>) {
    let level = level_name.map(level_filter);
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.flatten().unwrap_or(LevelFilter::Info));
    builder.parse_default_env();
    builder.init();

    if let (Some(name), Some(None)) = (level_name, level) {
        warn!("Invalid log level {:?}, using INFO", name);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let overall_start = Instant::now();

    let settings = load_settings(&cli)?;
    init_logging(settings.log_level.as_deref());

    // LOGIC: Decide whether to Load Binary or Parse Text
    let schema = if let Some(bin_path) = &cli.load_compiled {
        // FAST PATH: Load from binary
        println!("Loading pre-compiled schema from {:?}", bin_path);
        load_compiled_schema(bin_path)?
    } else {
        let columns = settings
            .schema
            .as_deref()
            .ok_or_else(|| anyhow!("Missing schema: use --schema, SCHEMA or --load-compiled"))?;
        let types = settings
            .data_types
            .as_deref()
            .ok_or_else(|| anyhow!("Missing data types: use --data-types or DATA_TYPES"))?;
        let parsed = Schema::new(columns, types).with_context(|| "Invalid schema")?;

        // OPTIONAL: Save to binary if requested
        if let Some(save_path) = &cli.compile_schema {
            println!("Saving compiled schema to {:?}", save_path);
            save_compiled_schema(&parsed, save_path)?;
            println!("Schema saved. You can now use --load-compiled next time.");
        }
        parsed
    };
    info!("Schema has {} column(s)", schema.column_count());

    let mut inputs = cli.inputs.clone();
    if inputs.is_empty() {
        inputs.extend(settings.input_file.clone());
    }
    if inputs.is_empty() {
        if cli.compile_schema.is_none() {
            eprintln!("No input files found.");
        }
        return Ok(());
    }

    let allowed_exts = cli.ext.as_deref().map(parse_ext_list);
    let input_files = expand_inputs(&inputs, allowed_exts.as_ref())
        .with_context(|| "Failed to expand input files/directories")?;

    if input_files.is_empty() {
        eprintln!("No input files found.");
        return Ok(());
    }

    println!("Found {} input files", input_files.len());

    let options = settings.parser_options();
    let buffer_bytes = settings.buffer_bytes();

    let results = match (&cli.output_dir, &settings.output_file) {
        (Some(out_dir), _) => {
            std::fs::create_dir_all(out_dir)?;
            convert_all(&schema, options, &input_files, out_dir, buffer_bytes)
        }
        (None, Some(out_file)) => {
            if input_files.len() != 1 {
                bail!(
                    "--output/OUTPUT_FILE takes exactly one input file, found {}; use --output-dir",
                    input_files.len()
                );
            }
            let in_path = input_files[0].clone();
            let res = convert_file(&schema, options, &in_path, out_file, buffer_bytes);
            vec![(in_path, res)]
        }
        (None, None) => bail!("You must provide either --output-dir or --output/OUTPUT_FILE"),
    };

    let mut total_records = 0u64;
    let mut failed = 0usize;
    for (path, res) in &results {
        match res {
            Ok(count) => {
                total_records += count;
                println!("Decoded {} csv rows from {:?}", count, path);
            }
            Err(e) => {
                failed += 1;
                eprintln!("Decoding failed for {:?}: {:#}", path, e);
            }
        }
    }

    println!("Total csv records extracted: {}", total_records);
    println!("Total elapsed wall time: {:.3} s", overall_start.elapsed().as_secs_f64());

    if failed > 0 {
        return Err(anyhow!("{} of {} file(s) failed", failed, results.len()));
    }
    Ok(())
}
