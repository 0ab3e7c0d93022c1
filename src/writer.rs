use std::io::Write;

use crate::codec::decode_into;
use crate::error::Result;
use crate::record::RecordSet;

#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Writes finalized records as comma-separated lines. No header row, no
/// escaping beyond what the codec does.
pub struct CsvWriter<W: Write> {
    out: W,
    line: String,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: String::with_capacity(1024),
        }
    }

    /// Emits every row of `records`; returns how many lines were written.
    pub fn write_record(&mut self, records: &RecordSet<'_, '_>) -> Result<usize> {
        let headers = records.schema().headers();
        for row in records.rows() {
            self.line.clear();
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    self.line.push(',');
                }
                if let Some(value) = cell {
                    decode_into(&mut self.line, value, headers[i].data_type)?;
                }
            }
            self.line.push_str(LINE_SEPARATOR);
            self.out.write_all(self.line.as_bytes())?;
        }
        Ok(records.row_count())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
