//! Properties-file configuration.
//!
//! ```text
//! # ASN.1 to CSV schema, names are case-sensitive
//! SCHEMA=REC_NO,79.0,79.5,79.19.2.*.1,79.19.2.*.2
//! DATA_TYPES=INTEGER,INTEGER,TBCD_STRING,INTEGER,OCTET_STRING
//! INPUT_FILE=/data/in/cdr.ber
//! OUTPUT_FILE=/data/out/cdr.csv
//! LOG_LEVEL=INFO
//! BUFFER_SIZE=4
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use regex::Regex;

use crate::parser::{ParserOptions, DEFAULT_MAX_DEPTH};

pub const DEFAULT_BUFFER_KB: usize = 4;

#[derive(Debug, Default, Clone)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn parse(text: &str) -> Result<Self> {
        let entry_re = Regex::new(r"^\s*([^=:\s]+)\s*[=:]\s*(.*?)\s*$")?;
        let mut values = HashMap::new();

        for (n, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            let caps = entry_re
                .captures(line)
                .ok_or_else(|| anyhow!("line {}: expected KEY=VALUE, got {:?}", n + 1, line))?;
            values.insert(caps[1].to_string(), caps[2].to_string());
        }
        Ok(Self { values })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read properties file {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Invalid properties file {:?}", path))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Everything the converter can be told, from a properties file and/or flags.
#[derive(Debug, Default, Clone)]
pub struct Settings {
    pub schema: Option<String>,
    pub data_types: Option<String>,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub log_level: Option<String>,
    pub buffer_kb: Option<usize>,
    pub max_length: Option<usize>,
    pub max_depth: Option<usize>,
}

impl Settings {
    pub fn from_properties(props: &Properties) -> Result<Self> {
        Ok(Self {
            schema: props.get("SCHEMA").map(str::to_string),
            data_types: props.get("DATA_TYPES").map(str::to_string),
            input_file: props.get("INPUT_FILE").map(PathBuf::from),
            output_file: props.get("OUTPUT_FILE").map(PathBuf::from),
            log_level: props.get("LOG_LEVEL").map(str::to_string),
            buffer_kb: parse_positive(props, "BUFFER_SIZE")?,
            max_length: parse_count(props, "MAX_LENGTH")?,
            max_depth: parse_count(props, "MAX_DEPTH")?,
        })
    }

    pub fn buffer_bytes(&self) -> usize {
        self.buffer_kb.unwrap_or(DEFAULT_BUFFER_KB) * 1024
    }

    /// `MAX_LENGTH`/`MAX_DEPTH` of 0 turn the bound off.
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_length: self.max_length.filter(|&n| n > 0),
            max_depth: match self.max_depth {
                None => Some(DEFAULT_MAX_DEPTH),
                Some(0) => None,
                Some(n) => Some(n),
            },
        }
    }
}

fn parse_count(props: &Properties, key: &str) -> Result<Option<usize>> {
    props
        .get(key)
        .map(|v| {
            v.parse::<usize>()
                .with_context(|| format!("{} must be a non-negative integer, got {:?}", key, v))
        })
        .transpose()
}

fn parse_positive(props: &Properties, key: &str) -> Result<Option<usize>> {
    match parse_count(props, key)? {
        Some(0) => Err(anyhow!("{} must be a positive integer", key)),
        other => Ok(other),
    }
}

/// Maps a `LOG_LEVEL` value to a filter. Accepts `ALL`/`INFO`/`OFF` and the
/// usual level names, case-insensitively.
pub fn level_filter(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_uppercase().as_str() {
        "ALL" | "TRACE" | "FINEST" => Some(LevelFilter::Trace),
        "DEBUG" | "FINE" => Some(LevelFilter::Debug),
        "INFO" => Some(LevelFilter::Info),
        "WARN" | "WARNING" => Some(LevelFilter::Warn),
        "ERROR" | "SEVERE" => Some(LevelFilter::Error),
        "OFF" => Some(LevelFilter::Off),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_properties() {
        let text = "\
# comment
! also a comment

SCHEMA = REC_NO,79.0
DATA_TYPES:INTEGER,INTEGER
INPUT_FILE=/tmp/in.ber
LOG_LEVEL=
BUFFER_SIZE=16
";
        let props = Properties::parse(text).unwrap();
        assert_eq!(props.get("SCHEMA"), Some("REC_NO,79.0"));
        assert_eq!(props.get("DATA_TYPES"), Some("INTEGER,INTEGER"));
        assert_eq!(props.get("LOG_LEVEL"), None);
        assert_eq!(props.get("OUTPUT_FILE"), None);

        let settings = Settings::from_properties(&props).unwrap();
        assert_eq!(settings.input_file, Some(PathBuf::from("/tmp/in.ber")));
        assert_eq!(settings.buffer_bytes(), 16 * 1024);
        assert_eq!(settings.parser_options(), ParserOptions::default());
    }

    #[test]
    fn test_bad_line() {
        assert!(Properties::parse("SCHEMA").is_err());
    }

    #[test]
    fn test_numeric_settings() {
        let props = Properties::parse("BUFFER_SIZE=0").unwrap();
        assert!(Settings::from_properties(&props).is_err());

        let props = Properties::parse("BUFFER_SIZE=x").unwrap();
        assert!(Settings::from_properties(&props).is_err());

        let props = Properties::parse("MAX_LENGTH=1000\nMAX_DEPTH=0").unwrap();
        let opts = Settings::from_properties(&props).unwrap().parser_options();
        assert_eq!(opts.max_length, Some(1000));
        assert_eq!(opts.max_depth, None);
        assert_eq!(Settings::default().buffer_bytes(), DEFAULT_BUFFER_KB * 1024);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(level_filter("ALL"), Some(LevelFilter::Trace));
        assert_eq!(level_filter("info"), Some(LevelFilter::Info));
        assert_eq!(level_filter("OFF"), Some(LevelFilter::Off));
        assert_eq!(level_filter("LOUD"), None);
    }
}
