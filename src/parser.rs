use std::io::{Read, Write};
use std::time::Instant;

use log::{debug, info};

use crate::error::Result;
use crate::record::RecordSet;
use crate::schema::Schema;
use crate::walker::AddressWalker;
use crate::writer::CsvWriter;

/// Low enough for a debug build to walk this deep on a 2 MiB worker stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Upper bound for long-form lengths. `None` disables the check.
    pub max_length: Option<usize>,
    /// Maximum nesting of constructed fields.
    pub max_depth: Option<usize>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_length: None,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

/// Converts a stream of back-to-back BER values into CSV rows.
///
/// One instance holds no state between calls; each `parse` owns its own
/// row store, so instances sharing a schema can run on separate threads.
pub struct Asn1CsvParser<'s> {
    schema: &'s Schema,
    options: ParserOptions,
}

impl<'s> Asn1CsvParser<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_options(schema, ParserOptions::default())
    }

    pub fn with_options(schema: &'s Schema, options: ParserOptions) -> Self {
        Self { schema, options }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Walks every top-level value in `data` and writes its rows to `out`.
    /// Returns the number of CSV rows written.
    pub fn parse<W: Write>(&self, data: &[u8], out: W) -> Result<u64> {
        let start = Instant::now();
        let mut walker = AddressWalker::new(data, &self.options);
        let mut records = RecordSet::new(self.schema);
        let mut writer = CsvWriter::new(out);

        let mut row_count: u64 = 0;
        let mut value_count: u64 = 0;
        while !walker.is_exhausted() {
            let offset = walker.offset();
            let tag = walker.walk_value(&mut records)?;
            let rows = records.finalize(row_count)?;
            writer.write_record(&records)?;
            records.purge();

            debug!("value #{} tag={} offset={} rows={}", value_count + 1, tag, offset, rows);
            row_count += rows as u64;
            value_count += 1;
        }
        writer.flush()?;

        info!(
            "{} value(s), {} row(s) in {:.3} s",
            value_count,
            row_count,
            start.elapsed().as_secs_f64()
        );
        Ok(row_count)
    }

    /// Same as [`parse`](Self::parse) for inputs that are not already in memory.
    ///
    /// The whole stream is buffered before parsing starts, so memory grows
    /// with the input size. Prefer [`parse`](Self::parse) over a memory map
    /// for large files.
    pub fn parse_reader<R: Read, W: Write>(&self, mut input: R, out: W) -> Result<u64> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        self.parse(&data, out)
    }
}
