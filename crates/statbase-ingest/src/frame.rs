//! In-memory tabular data
//!
//! A [`RawTable`] is one whole file held as a single Arrow `RecordBatch`. Files are
//! never streamed: both stages assume an extract fits in memory.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast, concat_batches};
use arrow::csv::{reader::Format, ReaderBuilder};
use arrow::datatypes::{DataType, Float64Type, Int64Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::category::Delimiter;
use crate::error::{IngestError, IngestResult};

const CSV_BATCH_ROWS: usize = 64 * 1024;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A whole source file, header-driven and column-typed
#[derive(Debug, Clone)]
pub struct RawTable {
    batch: RecordBatch,
}

impl RawTable {
    /// Parse delimited text with a header row.
    ///
    /// Column types are inferred from every row (integer, float, boolean or text);
    /// empty fields are null. `NaN` is inferred as a float, so a coordinate column with
    /// `NaN` markers stays numeric.
    pub fn from_csv(bytes: &[u8], delimiter: Delimiter) -> IngestResult<Self> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let format = Format::default()
            .with_header(true)
            .with_delimiter(delimiter.as_byte());

        let (schema, _) = format.infer_schema(Cursor::new(bytes), None)?;
        let schema: SchemaRef = Arc::new(schema);

        let reader = ReaderBuilder::new(schema.clone())
            .with_format(format)
            .with_batch_size(CSV_BATCH_ROWS)
            .build(Cursor::new(bytes))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            batch: concat_batches(&schema, &batches)?,
        })
    }

    /// Decode a Parquet object written by [`RawTable::to_parquet`] (or any Parquet file)
    pub fn from_parquet(bytes: impl Into<Bytes>) -> IngestResult<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes.into())?;
        let schema = builder.schema().clone();
        let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            batch: concat_batches(&schema, &batches)?,
        })
    }

    /// Encode as a single Parquet file, column names preserved.
    ///
    /// Identical tables encode to identical bytes.
    pub fn to_parquet(&self) -> IngestResult<Vec<u8>> {
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, self.batch.schema(), Some(props))?;
        writer.write(&self.batch)?;
        writer.close()?;

        Ok(buffer)
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect()
    }

    /// Look up a column by its header name
    pub fn column(&self, name: &str) -> IngestResult<Column> {
        let array = self
            .batch
            .column_by_name(name)
            .ok_or_else(|| IngestError::MissingColumn(name.to_string()))?;
        Column::normalized(array)
    }
}

impl From<RecordBatch> for RawTable {
    fn from(batch: RecordBatch) -> Self {
        Self { batch }
    }
}

/// One value read from a [`Column`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
}

/// A column widened to one of the types [`Cell`] can represent
#[derive(Debug, Clone)]
pub struct Column {
    array: ArrayRef,
}

impl Column {
    fn normalized(array: &ArrayRef) -> IngestResult<Self> {
        let array = match array.data_type() {
            DataType::Null | DataType::Boolean | DataType::Int64 | DataType::Float64 | DataType::Utf8 => {
                array.clone()
            },
            data_type if data_type.is_integer() => cast(array, &DataType::Int64)?,
            data_type if data_type.is_floating() => cast(array, &DataType::Float64)?,
            _ => cast(array, &DataType::Utf8)?,
        };
        Ok(Self { array })
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Value at `row`; `row` must be below [`Column::len`]
    pub fn cell(&self, row: usize) -> Cell<'_> {
        if self.array.is_null(row) {
            return Cell::Null;
        }
        match self.array.data_type() {
            DataType::Null => Cell::Null,
            DataType::Boolean => Cell::Bool(self.array.as_boolean().value(row)),
            DataType::Int64 => Cell::Int(self.array.as_primitive::<Int64Type>().value(row)),
            DataType::Float64 => Cell::Float(self.array.as_primitive::<Float64Type>().value(row)),
            _ => Cell::Text(self.array.as_string::<i32>().value(row)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringArray};
    use arrow::datatypes::{Field, Schema};

    const DEPARTMENT_CSV: &str = "\
DP;DPNOM;AÑO;Total Mujeres;Total Hombres
5;ANTIOQUIA;2019;3300000;3100000
5;ANTIOQUIA;2020;3350000;3150000
";

    #[test]
    fn test_from_csv_semicolon_with_types() {
        let table = RawTable::from_csv(DEPARTMENT_CSV.as_bytes(), Delimiter::Semicolon).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(
            table.column_names(),
            vec!["DP", "DPNOM", "AÑO", "Total Mujeres", "Total Hombres"]
        );
        assert_eq!(table.column("DP").unwrap().cell(0), Cell::Int(5));
        assert_eq!(table.column("DPNOM").unwrap().cell(1), Cell::Text("ANTIOQUIA"));
        assert_eq!(table.column("AÑO").unwrap().cell(1), Cell::Int(2020));
    }

    #[test]
    fn test_nan_marker_keeps_float_column() {
        let csv = "COD_MUNICIPIO,LATITUD\n5001,6.25\n5002,NaN\n5004,\n";
        let table = RawTable::from_csv(csv.as_bytes(), Delimiter::Comma).unwrap();
        let latitude = table.column("LATITUD").unwrap();

        assert_eq!(latitude.cell(0), Cell::Float(6.25));
        assert!(matches!(latitude.cell(1), Cell::Float(v) if v.is_nan()));
        assert_eq!(latitude.cell(2), Cell::Null);
    }

    #[test]
    fn test_wrong_delimiter_yields_single_column() {
        let table = RawTable::from_csv(DEPARTMENT_CSV.as_bytes(), Delimiter::Comma).unwrap();
        assert_eq!(table.column_names().len(), 1);
        assert!(matches!(table.column("DP"), Err(IngestError::MissingColumn(_))));
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"YEAR,CANTIDAD\n2020,3\n");
        let table = RawTable::from_csv(&bytes, Delimiter::Comma).unwrap();
        assert_eq!(table.column_names(), vec!["YEAR", "CANTIDAD"]);
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let table = RawTable::from_csv(b"YEAR,SUI_COUNTER,CODE_MUNICIPIO\n", Delimiter::Comma).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.column_names().len(), 3);
    }

    #[test]
    fn test_parquet_preserves_names_and_values() {
        let table = RawTable::from_csv(DEPARTMENT_CSV.as_bytes(), Delimiter::Semicolon).unwrap();
        let encoded = table.to_parquet().unwrap();
        let decoded = RawTable::from_parquet(encoded).unwrap();

        assert_eq!(decoded.column_names(), table.column_names());
        assert_eq!(decoded.num_rows(), 2);
        assert_eq!(decoded.column("Total Hombres").unwrap().cell(1), Cell::Int(3150000));
    }

    #[test]
    fn test_parquet_encoding_is_deterministic() {
        let first = RawTable::from_csv(DEPARTMENT_CSV.as_bytes(), Delimiter::Semicolon).unwrap();
        let second = RawTable::from_csv(DEPARTMENT_CSV.as_bytes(), Delimiter::Semicolon).unwrap();
        assert_eq!(first.to_parquet().unwrap(), second.to_parquet().unwrap());
    }

    #[test]
    fn test_narrow_integer_columns_are_widened() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("WEEK", DataType::Int32, true),
            Field::new("NAME", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![Some(7), None])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b")])),
            ],
        )
        .unwrap();
        let table = RawTable::from(batch);
        let week = table.column("WEEK").unwrap();

        assert_eq!(week.len(), 2);
        assert_eq!(week.cell(0), Cell::Int(7));
        assert_eq!(week.cell(1), Cell::Null);
    }
}
