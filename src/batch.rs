//! File-level glue: input discovery, memory-mapped conversion, compiled schemas.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use memmap2::Mmap;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::parser::{Asn1CsvParser, ParserOptions};
use crate::schema::Schema;

pub fn expand_inputs(inputs: &[PathBuf], allowed_exts: Option<&HashSet<String>>) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for p in inputs {
        if p.is_file() {
            if should_include(p, allowed_exts) {
                files.push(p.clone());
            }
        } else if p.is_dir() {
            for entry in WalkDir::new(p).follow_links(false) {
                let entry = entry?;
                let path = entry.path();
                if path.is_file() && should_include(path, allowed_exts) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            return Err(anyhow!("Input path is not a file or directory: {:?}", p));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Parses a `--ext` value like `"ber, .DAT"` into lowercase extensions.
pub fn parse_ext_list(list: &str) -> HashSet<String> {
    list.split(',')
        .map(|x| x.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|x| !x.is_empty())
        .collect()
}

#[inline]
fn should_include(path: &Path, allowed_exts: Option<&HashSet<String>>) -> bool {
    let Some(set) = allowed_exts else { return true; };
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else { return false; };
    set.contains(&ext.to_ascii_lowercase())
}

pub fn output_path_for(in_path: &Path, out_dir: &Path) -> Result<PathBuf> {
    let file_name = in_path
        .file_name()
        .ok_or_else(|| anyhow!("Input path has no filename: {:?}", in_path))?
        .to_string_lossy()
        .to_string();
    Ok(out_dir.join(format!("{}.csv", file_name)))
}

/// Converts one input file into one CSV file. On failure the partial output is removed.
pub fn convert_file(
    schema: &Schema,
    options: ParserOptions,
    in_path: &Path,
    out_path: &Path,
    buffer_bytes: usize,
) -> Result<u64> {
    let start = Instant::now();
    let file = File::open(in_path).with_context(|| format!("Failed to open input file {:?}", in_path))?;
    let meta = file
        .metadata()
        .with_context(|| format!("Failed to stat input file {:?}", in_path))?;
    if !meta.is_file() {
        return Err(anyhow!("Input is not a regular file: {:?}", in_path));
    }
    let len = meta.len();
    // the input must be mapped before the output exists, so a bad input leaves nothing behind
    let mmap = if len == 0 {
        None
    } else {
        // SAFETY: the mapping is read-only and lives only for this call
        let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map input file {:?}", in_path))?;
        Some(map)
    };
    let data: &[u8] = mmap.as_deref().unwrap_or(&[]);

    let out_file = File::create(out_path).with_context(|| format!("Failed to create output file {:?}", out_path))?;
    let mut writer = BufWriter::with_capacity(buffer_bytes.max(1), out_file);

    let result = Asn1CsvParser::with_options(schema, options).parse(data, &mut writer);

    match result {
        Ok(rows) => {
            writer.flush()?;
            info!(
                "{:?} -> {:?}: {} row(s) in {:.3} s",
                in_path,
                out_path,
                rows,
                start.elapsed().as_secs_f64()
            );
            Ok(rows)
        }
        Err(e) => {
            drop(writer);
            if let Err(rm) = std::fs::remove_file(out_path) {
                warn!("could not remove partial output {:?}: {}", out_path, rm);
            }
            Err(e).with_context(|| format!("Decoding failed for {:?}", in_path))
        }
    }
}

/// Converts every file into `out_dir` in parallel, one parser per file.
///
/// Inputs whose output names collide (same file name in different
/// directories) are all rejected up front and none of them is written.
pub fn convert_all(
    schema: &Schema,
    options: ParserOptions,
    files: &[PathBuf],
    out_dir: &Path,
    buffer_bytes: usize,
) -> Vec<(PathBuf, Result<u64>)> {
    let targets: Vec<Result<PathBuf>> = files.iter().map(|p| output_path_for(p, out_dir)).collect();

    let mut claims: HashMap<&Path, usize> = HashMap::new();
    for out in targets.iter().flatten() {
        *claims.entry(out.as_path()).or_default() += 1;
    }

    files
        .par_iter()
        .zip(targets.par_iter())
        .map(|(p, target)| {
            let res = match target {
                Err(e) => Err(anyhow!("{:#}", e)),
                Ok(out) if claims[out.as_path()] > 1 => Err(anyhow!(
                    "Output {:?} would be shared by {} inputs; rename the inputs or convert them separately",
                    out,
                    claims[out.as_path()]
                )),
                Ok(out) => convert_file(schema, options, p, out, buffer_bytes),
            };
            (p.clone(), res)
        })
        .collect()
}

pub fn save_compiled_schema(schema: &Schema, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| "Failed to create schema dump file")?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, schema).with_context(|| "Failed to serialize schema")?;
    writer.flush()?;
    Ok(())
}

pub fn load_compiled_schema(path: &Path) -> Result<Schema> {
    let file = File::open(path).with_context(|| "Failed to open compiled schema")?;
    let schema: Schema = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| "Failed to deserialize schema")?;
    Ok(schema)
}
