//! Column schema: which walked addresses land in which CSV column, and how
//! each column's bytes are rendered.
//!
//! A schema is built from two comma-separated strings aligned 1:1, e.g.
//!
//! ```text
//! REC_NO,79.0,79.19.2.*.1,79.19.2.*.5[0]
//! INTEGER,INTEGER,INTEGER,OCTET_STRING
//! ```
//!
//! Once built it never changes; per-record state lives in [`crate::record::RecordSet`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Asn1CsvError, Result};

pub const REC_NO: &str = "REC_NO";
pub const SUB_SEQ: &str = "SUB_SEQ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    OctetString,
    TbcdString,
    Ia5String,
    Integer,
    IpString,
    Ipv6String,
    Boolean,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::OctetString => "OCTET_STRING",
            DataType::TbcdString => "TBCD_STRING",
            DataType::Ia5String => "IA5_STRING",
            DataType::Integer => "INTEGER",
            DataType::IpString => "IP_STRING",
            DataType::Ipv6String => "IPV6_STRING",
            DataType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Asn1CsvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OCTET_STRING" => Ok(DataType::OctetString),
            "TBCD_STRING" => Ok(DataType::TbcdString),
            "IA5_STRING" => Ok(DataType::Ia5String),
            "INTEGER" => Ok(DataType::Integer),
            "IP_STRING" => Ok(DataType::IpString),
            "IPV6_STRING" => Ok(DataType::Ipv6String),
            "BOOLEAN" => Ok(DataType::Boolean),
            other => Err(Asn1CsvError::UnknownDataType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// `REC_NO`: running row number across the whole input.
    RecordNumber,
    /// `SUB_SEQ`: 1-based row number inside one record.
    SubSequence,
    /// Address without `*`: one value per record.
    Master,
    /// Address with `*`: one value per repetition.
    Iterated,
    /// Text that is not an address; never populated.
    Unmatched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Specifier as written, including any `[N]` suffix.
    pub name: String,
    pub column_index: usize,
    pub data_type: DataType,
    pub kind: ColumnKind,
    /// Address with the `[N]` suffix stripped.
    pub address: Option<String>,
    pub explicit_source_row: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    headers: Vec<Header>,
    by_address: HashMap<String, Vec<usize>>,
}

impl Schema {
    pub fn new(schema: &str, data_types: &str) -> Result<Self> {
        let specifier_re = Regex::new(r"^((?:\d+|\*)(?:\.(?:\d+|\*))*)(?:\[(\d+)\])?$")?;

        let names: Vec<&str> = schema.split(',').map(str::trim).collect();
        let types: Vec<&str> = data_types.split(',').map(str::trim).collect();
        if names.len() != types.len() {
            return Err(Asn1CsvError::DataTypeCountMismatch {
                columns: names.len(),
                types: types.len(),
            });
        }

        let mut headers = Vec::with_capacity(names.len());
        let mut by_address: HashMap<String, Vec<usize>> = HashMap::new();

        for (column_index, (name, type_name)) in names.iter().zip(types.iter()).enumerate() {
            let data_type: DataType = type_name.parse()?;

            let (kind, address, explicit_source_row) = match *name {
                REC_NO => (ColumnKind::RecordNumber, None, None),
                SUB_SEQ => (ColumnKind::SubSequence, None, None),
                _ => match specifier_re.captures(name) {
                    Some(caps) => {
                        let address = caps[1].to_string();
                        let row = match caps.get(2) {
                            Some(m) => match m.as_str().parse::<usize>() {
                                Ok(n) => Some(n),
                                Err(_) => {
                                    warn!("column {} '{}': row index out of range, ignored", column_index, name);
                                    None
                                }
                            },
                            None => None,
                        };
                        let kind = if address.contains('*') {
                            ColumnKind::Iterated
                        } else {
                            ColumnKind::Master
                        };
                        (kind, Some(address), row)
                    }
                    None => {
                        warn!("column {} '{}' is not an address; it will stay empty", column_index, name);
                        (ColumnKind::Unmatched, None, None)
                    }
                },
            };

            if let Some(addr) = &address {
                by_address.entry(addr.clone()).or_default().push(column_index);
            }

            headers.push(Header {
                name: name.to_string(),
                column_index,
                data_type,
                kind,
                address,
                explicit_source_row,
            });
        }

        Ok(Self {
            headers,
            by_address,
        })
    }

    #[inline]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    #[inline]
    pub fn has_header(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    /// Columns bound to `address`, in schema order.
    #[inline]
    pub fn columns_for(&self, address: &str) -> Option<&[usize]> {
        self.by_address.get(address).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_header_table() {
        let schema = Schema::new(
            "REC_NO, SUB_SEQ,79.0,79.19.2.*.1,79.19.2.*.5[1]",
            "INTEGER,INTEGER,INTEGER,TBCD_STRING,OCTET_STRING",
        )
        .unwrap();

        assert_eq!(schema.column_count(), 5);
        let h = schema.headers();
        assert_eq!(h[0].kind, ColumnKind::RecordNumber);
        assert_eq!(h[1].kind, ColumnKind::SubSequence);
        assert_eq!(h[2].kind, ColumnKind::Master);
        assert_eq!(h[2].address.as_deref(), Some("79.0"));
        assert_eq!(h[3].kind, ColumnKind::Iterated);
        assert_eq!(h[3].data_type, DataType::TbcdString);
        assert_eq!(h[4].name, "79.19.2.*.5[1]");
        assert_eq!(h[4].address.as_deref(), Some("79.19.2.*.5"));
        assert_eq!(h[4].explicit_source_row, Some(1));
        assert_eq!(h[4].column_index, 4);

        assert!(schema.has_header("79.0"));
        assert!(schema.has_header("79.19.2.*.5"));
        assert!(!schema.has_header("79.19.2.*.5[1]"));
        assert!(!schema.has_header("REC_NO"));
    }

    #[test]
    fn test_shared_address() {
        let schema = Schema::new("1.*.2,1.*.2[0]", "INTEGER,INTEGER").unwrap();
        assert_eq!(schema.columns_for("1.*.2"), Some(&[0usize, 1][..]));
    }

    #[test]
    fn test_non_address_column_is_kept() {
        let schema = Schema::new("REC_SEQ,1", "INTEGER,INTEGER").unwrap();
        assert_eq!(schema.headers()[0].kind, ColumnKind::Unmatched);
        assert!(!schema.has_header("REC_SEQ"));
        assert_eq!(schema.column_count(), 2);
    }

    #[test]
    fn test_count_mismatch() {
        match Schema::new("1,2,3", "INTEGER,INTEGER") {
            Err(Asn1CsvError::DataTypeCountMismatch { columns, types }) => {
                assert_eq!((columns, types), (3, 2));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_data_type() {
        match Schema::new("1,2", "INTEGER,HEX_STRING") {
            Err(Asn1CsvError::UnknownDataType(name)) => assert_eq!(name, "HEX_STRING"),
            other => panic!("unexpected: {:?}", other),
        }
        // names are case-sensitive
        assert!(Schema::new("1", "integer").is_err());
    }

    #[test]
    fn test_data_type_names_round_trip() {
        for dt in [
            DataType::OctetString,
            DataType::TbcdString,
            DataType::Ia5String,
            DataType::Integer,
            DataType::IpString,
            DataType::Ipv6String,
            DataType::Boolean,
        ] {
            assert_eq!(dt.name().parse::<DataType>().unwrap(), dt);
        }
    }
}
