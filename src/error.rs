use thiserror::Error;

use crate::schema::DataType;

/// Every failure the decoder can raise. Any of them aborts the whole input.
#[derive(Debug, Error)]
pub enum Asn1CsvError {
    #[error("truncated input at offset {offset}: needed {needed} more byte(s)")]
    TruncatedInput { offset: usize, needed: usize },

    #[error("corrupted stream - invalid high tag number found at offset {offset}")]
    InvalidHighTagNumber { offset: usize },

    #[error("DER length more than 4 bytes: {size}")]
    LengthTooLarge { size: usize },

    #[error("corrupted stream - negative length found at offset {offset}")]
    NegativeLength { offset: usize },

    #[error("corrupted stream - out of bounds length found: {length} >= {limit}")]
    LengthOutOfBounds { length: usize, limit: usize },

    #[error("indefinite-length encoding is not supported (offset {offset})")]
    IndefiniteLength { offset: usize },

    #[error("nesting deeper than {limit} levels at offset {offset}")]
    NestingTooDeep { offset: usize, limit: usize },

    #[error("tag class {class} is not supported (offset {offset})")]
    UnsupportedTagClass { class: &'static str, offset: usize },

    #[error("constructed UNIVERSAL tag {tag} is invalid (offset {offset})")]
    InvalidUniversalType { tag: u32, offset: usize },

    #[error("schema has {columns} column(s) but {types} data type(s)")]
    DataTypeCountMismatch { columns: usize, types: usize },

    #[error("unknown data type '{0}'")]
    UnknownDataType(String),

    #[error("column header not found for address '{0}'")]
    UnknownColumn(String),

    #[error("master cell is not empty: address={address} col={column}")]
    MasterCellAlreadySet { address: String, column: usize },

    #[error("trying to overwrite iterated cell: address={address} row={row} col={column}")]
    IteratedCellAlreadySet {
        address: String,
        row: usize,
        column: usize,
    },

    #[error("cell populated both as master and iterated: row={row} col={column}")]
    MasterIteratedCollision { row: usize, column: usize },

    #[error("invalid {data_type} length: expected {expected} byte(s), got {actual}")]
    InvalidLength {
        data_type: DataType,
        expected: usize,
        actual: usize,
    },

    #[error("invalid IPV6_STRING char value {value} at nibble {index}")]
    InvalidEncodingChar { index: usize, value: u8 },

    #[error("schema pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Asn1CsvError>;
