//! Schema-driven BER/DER to CSV conversion.
//!
//! Every primitive field of a BER value gets a dotted address built from the
//! tag numbers above it (`79.19.2.*.1`, with `*` for each enclosing universal
//! SEQUENCE). The schema maps addresses to CSV columns; fields outside any
//! SEQUENCE are repeated on every row of their record, fields inside one
//! produce a row per repetition.
//!
//! ```no_run
//! use asn1_csv::{Asn1CsvParser, Schema};
//!
//! let schema = Schema::new("REC_NO,79.0,79.19.2.*.1", "INTEGER,INTEGER,TBCD_STRING")?;
//! let data = std::fs::read("cdr.ber")?;
//! let rows = Asn1CsvParser::new(&schema).parse(&data, std::io::stdout().lock())?;
//! eprintln!("{} rows", rows);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod ber;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod parser;
pub mod record;
pub mod schema;
pub mod walker;
pub mod writer;

pub use error::{Asn1CsvError, Result};
pub use parser::{Asn1CsvParser, ParserOptions};
pub use schema::{DataType, Schema};
