//! Embedding surface
//!
//! The bit-exact boundary the host's scripting layer marshals through:
//! case-insensitive type/operator parsing, scanner construction from
//! string options, paged result readout and the struct-search builder.
//! Binding these to an interpreter is the host's job; everything here is
//! plain typed Rust.

use crate::core::types::{Address, DataType, ScanError, ScanOp, ScanValue};
use crate::probe::MemoryProbe;
use crate::scanner::{Scanner, ScannerConfig, StructSearch};
use serde::Serialize;

/// Parses a data-type name, case-insensitive. `byte_array` and
/// `bytearray` are synonyms.
pub fn parse_data_type(name: &str) -> Result<DataType, ScanError> {
    match name.to_ascii_lowercase().as_str() {
        "byte" => Ok(DataType::Byte),
        "int" => Ok(DataType::Int),
        "float" => Ok(DataType::Float),
        "double" => Ok(DataType::Double),
        "bool" => Ok(DataType::Bool),
        "string" => Ok(DataType::String),
        "byte_array" | "bytearray" => Ok(DataType::ByteArray),
        "struct" => Ok(DataType::Struct),
        _ => Err(ScanError::UnknownDataType(name.to_string())),
    }
}

/// Parses a scan-operator name, case-insensitive
pub fn parse_scan_op(name: &str) -> Result<ScanOp, ScanError> {
    match name.to_ascii_lowercase().as_str() {
        "exact" => Ok(ScanOp::Exact),
        "not" => Ok(ScanOp::Not),
        "increased" => Ok(ScanOp::Increased),
        "decreased" => Ok(ScanOp::Decreased),
        "changed" => Ok(ScanOp::Changed),
        "unchanged" => Ok(ScanOp::Unchanged),
        _ => Err(ScanError::UnknownScanOp(name.to_string())),
    }
}

/// Creates a scanner over the current process from a type name and options
#[cfg(any(windows, target_os = "linux"))]
pub fn scanner_new(
    type_name: &str,
    config: ScannerConfig,
) -> Result<Scanner<crate::probe::OsProbe>, ScanError> {
    let data_type = parse_data_type(type_name)?;
    Ok(Scanner::new(data_type, config))
}

/// Creates a scanner over an explicit probe from a type name and options
pub fn scanner_with_probe<P: MemoryProbe + Sync>(
    probe: P,
    type_name: &str,
    config: ScannerConfig,
) -> Result<Scanner<P>, ScanError> {
    let data_type = parse_data_type(type_name)?;
    Ok(Scanner::with_probe(probe, data_type, config))
}

/// A struct field value as the embedding surface hands it over
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Scalar(ScanValue),
    Bytes(&'a [u8]),
}

impl StructSearch {
    /// Adds a field at `offset_from_base`. Scalar data types pair with
    /// [`FieldValue::Scalar`], sequence types with [`FieldValue::Bytes`].
    pub fn add_field(
        &mut self,
        offset_from_base: i32,
        data_type: DataType,
        value: FieldValue<'_>,
    ) -> Result<(), ScanError> {
        match (data_type, value) {
            (dt, FieldValue::Scalar(v)) if dt.is_scalar() => {
                self.add_scalar_field(offset_from_base, dt, v)
            }
            (dt, FieldValue::Bytes(bytes)) if dt.is_sequence() => {
                self.add_sequence_field(offset_from_base, bytes)
            }
            (DataType::Struct, _) => Err(ScanError::bad_config(
                "struct fields cannot nest struct types",
            )),
            (dt, _) => Err(ScanError::bad_config(format!(
                "field value does not match declared type {}",
                dt
            ))),
        }
    }
}

/// Paging request for [`Scanner::results_page`]
#[derive(Debug, Clone, Copy)]
pub struct ResultsQuery {
    pub offset: usize,
    pub limit: usize,
    /// Read live values back for sequence results; only meaningful after
    /// a `not` scan, rejected for struct scanners
    pub read_values: bool,
}

impl Default for ResultsQuery {
    fn default() -> Self {
        ResultsQuery {
            offset: 0,
            limit: 100,
            read_values: false,
        }
    }
}

/// A result value rendered for the embedding surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    Byte(u8),
    Int(i32),
    Float(f32),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
}

/// One row of a results page
#[derive(Debug, Clone, Serialize)]
pub struct ResultEntry {
    pub address: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ResultValue>,
}

/// A page of results plus paging metadata
#[derive(Debug, Clone, Serialize)]
pub struct ResultsPage {
    pub results: Vec<ResultEntry>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<P: MemoryProbe + Sync> Scanner<P> {
    /// Pages through the result store.
    ///
    /// Scalar scanners always carry their last-seen value. Sequence
    /// scanners carry a value only when `read_values` is set after a `not`
    /// scan (an `exact` scan's value would just repeat the pattern).
    /// Struct scanners never carry values.
    pub fn results_page(&self, query: ResultsQuery) -> Result<ResultsPage, ScanError> {
        let data_type = self.data_type();
        if query.read_values {
            if data_type.is_struct() {
                return Err(ScanError::bad_op(
                    "read_values is not supported for struct scanners",
                ));
            }
            if data_type.is_sequence() && self.last_scan_op() != ScanOp::Not {
                return Err(ScanError::bad_op(
                    "read_values for sequence scanners requires the last scan to be a not scan",
                ));
            }
        }

        let results = self
            .results_range(query.offset, query.limit)
            .iter()
            .map(|r| ResultEntry {
                address: r.address.as_u64(),
                value: self.render_value(r.address, r.value, query.read_values),
            })
            .collect();

        Ok(ResultsPage {
            results,
            total_count: self.result_count(),
            offset: query.offset,
            limit: query.limit,
        })
    }

    fn render_value(
        &self,
        address: Address,
        value: ScanValue,
        read_values: bool,
    ) -> Option<ResultValue> {
        match self.data_type() {
            DataType::Byte => Some(ResultValue::Byte(value.as_byte())),
            DataType::Int => Some(ResultValue::Int(value.as_int())),
            DataType::Float => Some(ResultValue::Float(value.as_float())),
            DataType::Double => Some(ResultValue::Double(value.as_double())),
            DataType::Bool => Some(ResultValue::Bool(value.as_bool())),
            DataType::String if read_values => self
                .read_sequence_bytes(address)
                .map(|b| ResultValue::Text(String::from_utf8_lossy(&b).into_owned())),
            DataType::ByteArray if read_values => {
                self.read_sequence_bytes(address).map(ResultValue::Bytes)
            }
            _ => None,
        }
    }
}
