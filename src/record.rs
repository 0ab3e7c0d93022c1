//! Row store for the top-level value currently being walked.
//!
//! Cells borrow from the input buffer wherever they can; only the synthetic
//! counter columns own their bytes.

use std::borrow::Cow;

use log::{debug, trace};

use crate::error::{Asn1CsvError, Result};
use crate::schema::{ColumnKind, Schema};

pub type Cell<'a> = Option<Cow<'a, [u8]>>;
pub type Row<'a> = Vec<Cell<'a>>;

#[derive(Debug)]
pub struct RecordSet<'s, 'a> {
    schema: &'s Schema,
    rows: Vec<Row<'a>>,
    master: Row<'a>,
    /// Next unfilled row per column, indexed like the header table.
    cursors: Vec<usize>,
}

impl<'s, 'a> RecordSet<'s, 'a> {
    pub fn new(schema: &'s Schema) -> Self {
        let n = schema.column_count();
        Self {
            schema,
            rows: Vec::new(),
            master: vec![None; n],
            cursors: vec![0; n],
        }
    }

    #[inline]
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    #[inline]
    pub fn rows(&self) -> &[Row<'a>] {
        &self.rows
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn add_empty_row(&mut self) {
        self.rows.push(vec![None; self.schema.column_count()]);
        trace!("row {} opened", self.rows.len());
    }

    fn columns(&self, address: &str) -> Result<&'s [usize]> {
        let schema: &'s Schema = self.schema;
        schema
            .columns_for(address)
            .ok_or_else(|| Asn1CsvError::UnknownColumn(address.to_string()))
    }

    /// Stores a value shared by every row of the record.
    pub fn populate_master(&mut self, address: &str, value: &'a [u8]) -> Result<()> {
        let columns = self.columns(address)?;
        if let Some(&column) = columns.iter().find(|&&c| self.master[c].is_some()) {
            return Err(Asn1CsvError::MasterCellAlreadySet {
                address: address.to_string(),
                column,
            });
        }
        for &column in columns {
            self.master[column] = Some(Cow::Borrowed(value));
        }
        Ok(())
    }

    /// Stores the next repetition of an iterated column, opening a row if needed.
    pub fn populate_iterated(&mut self, address: &str, value: &'a [u8]) -> Result<()> {
        let columns = self.columns(address)?;
        for &column in columns {
            let row = self.cursors[column];
            if row >= self.rows.len() {
                self.add_empty_row();
            }
            let cell = &mut self.rows[row][column];
            if cell.is_some() {
                return Err(Asn1CsvError::IteratedCellAlreadySet {
                    address: address.to_string(),
                    row,
                    column,
                });
            }
            *cell = Some(Cow::Borrowed(value));
            self.cursors[column] = row + 1;
        }
        Ok(())
    }

    /// Turns the accumulated cells into the final rows of this record.
    ///
    /// `running_row_counter` is the number of rows already emitted for the
    /// input; `REC_NO` continues from it. Returns the record's row count.
    pub fn finalize(&mut self, running_row_counter: u64) -> Result<usize> {
        if self.rows.is_empty() {
            self.add_empty_row();
        }
        let schema = self.schema;

        for header in schema.headers() {
            let column = header.column_index;
            match header.kind {
                ColumnKind::SubSequence => {
                    for (i, row) in self.rows.iter_mut().enumerate() {
                        row[column] = Some(counter_cell(i as u64 + 1));
                    }
                }
                ColumnKind::RecordNumber => {
                    for (i, row) in self.rows.iter_mut().enumerate() {
                        row[column] = Some(counter_cell(running_row_counter + i as u64 + 1));
                    }
                }
                _ => {}
            }
        }

        for (column, value) in self.master.iter().enumerate() {
            let Some(value) = value else { continue };
            for (row_index, row) in self.rows.iter_mut().enumerate() {
                if row[column].is_some() {
                    return Err(Asn1CsvError::MasterIteratedCollision {
                        row: row_index,
                        column,
                    });
                }
                row[column] = Some(value.clone());
            }
        }

        // explicit-sequence columns go last and overwrite
        for header in schema.headers() {
            let Some(source) = header.explicit_source_row else { continue };
            if source >= self.rows.len() {
                continue;
            }
            let column = header.column_index;
            let Some(value) = self.rows[source][column].clone() else { continue };
            for (row_index, row) in self.rows.iter_mut().enumerate() {
                if row_index != source {
                    row[column] = Some(value.clone());
                }
            }
        }

        debug!("record finalized with {} row(s)", self.rows.len());
        Ok(self.rows.len())
    }

    /// Drops every row and master value; the schema stays.
    pub fn purge(&mut self) {
        self.rows.clear();
        self.master.fill(None);
        self.cursors.fill(0);
    }
}

/// Synthetic counters are stored as 4-byte big-endian integers.
#[inline]
fn counter_cell<'a>(n: u64) -> Cow<'a, [u8]> {
    Cow::Owned((n as u32).to_be_bytes().to_vec())
}
