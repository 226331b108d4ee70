//! Schema registry
//!
//! Static mapping from a file [`Category`] to the ordered tables its rows feed.
//! Each [`TableDescriptor`] bundles the DDL, the insert head, and the projection
//! from source columns to the insert's bound values.
//!
//! # Ordering
//!
//! Within a category, a table that references another by foreign key is listed
//! strictly after it. Tables referenced across categories (`municipalities` ->
//! `departments`) must have been loaded by an earlier file.

use std::collections::HashSet;

use crate::category::Category;
use crate::error::{IngestError, IngestResult};
use crate::frame::{Cell, RawTable};

mod tables;

pub use tables::{
    DEPARTMENTS, DEPARTMENTS_POPULATION_HISTORY, INTERFAMILY_VIOLENCE, MUNICIPALITIES,
    MUNICIPALITY_POPULATION_HISTORY, SUICIDES, SUICIDE_ATTEMPTS,
};

/// One bound value of an insert
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(Option<i32>),
    Numeric(Option<f64>),
    Text(Option<String>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            SqlValue::Integer(None) | SqlValue::Numeric(None) | SqlValue::Text(None)
        )
    }
}

/// Projected row, ordered like the insert's column list
pub type Row = Vec<SqlValue>;

/// Target type of a projected column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    /// NUMERIC latitude/longitude; `NaN` markers become null
    Coordinate,
}

impl ColumnKind {
    fn convert(self, cell: Cell<'_>) -> Result<SqlValue, String> {
        match self {
            ColumnKind::Integer => to_integer(cell).map(SqlValue::Integer),
            ColumnKind::Text => Ok(SqlValue::Text(to_text(cell))),
            ColumnKind::Coordinate => to_coordinate(cell).map(SqlValue::Numeric),
        }
    }
}

fn to_integer(cell: Cell<'_>) -> Result<Option<i32>, String> {
    match cell {
        Cell::Null => Ok(None),
        Cell::Int(value) => i32::try_from(value)
            .map(Some)
            .map_err(|_| format!("{} does not fit an INTEGER", value)),
        Cell::Float(value) if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 => {
            Ok(Some(value as i32))
        },
        Cell::Text(text) => text
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| format!("'{}' is not an integer", text)),
        other => Err(format!("{:?} is not an integer", other)),
    }
}

fn to_text(cell: Cell<'_>) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Text(text) => Some(text.to_string()),
        Cell::Int(value) => Some(value.to_string()),
        Cell::Float(value) => Some(value.to_string()),
        Cell::Bool(value) => Some(value.to_string()),
    }
}

fn to_coordinate(cell: Cell<'_>) -> Result<Option<f64>, String> {
    let value = match cell {
        Cell::Null => return Ok(None),
        Cell::Float(value) => value,
        Cell::Int(value) => value as f64,
        Cell::Text(text) => {
            let text = text.trim();
            if text.is_empty() || text.eq_ignore_ascii_case("nan") {
                return Ok(None);
            }
            text.parse::<f64>()
                .map_err(|_| format!("'{}' is not a coordinate", text))?
        },
        Cell::Bool(value) => return Err(format!("{} is not a coordinate", value)),
    };

    if value.is_nan() {
        Ok(None)
    } else if value.is_finite() {
        Ok(Some(value))
    } else {
        Err(format!("{} is not a finite coordinate", value))
    }
}

/// Source column feeding one insert column
#[derive(Debug, Clone, Copy)]
pub struct SourceColumn {
    pub source: &'static str,
    pub kind: ColumnKind,
}

const fn col(source: &'static str, kind: ColumnKind) -> SourceColumn {
    SourceColumn { source, kind }
}

/// Everything needed to load one relational table
#[derive(Debug)]
pub struct TableDescriptor {
    pub name: &'static str,
    /// Idempotent DDL (`CREATE TABLE IF NOT EXISTS`)
    pub create_statement: &'static str,
    /// `INSERT INTO t (c1, c2, ...)`; rows are bound as `VALUES` tuples after it
    pub insert_statement: &'static str,
    /// Source columns, in insert-column order
    pub columns: &'static [SourceColumn],
    /// Index of an integer column whose first occurrence wins; later duplicates are dropped
    pub natural_key: Option<usize>,
    /// Tables the DDL points at with `REFERENCES`
    pub references: &'static [&'static str],
}

impl TableDescriptor {
    /// Map the whole source table to the rows this table's insert expects.
    pub fn project(&self, raw: &RawTable) -> IngestResult<Vec<Row>> {
        let sources = self
            .columns
            .iter()
            .map(|column| raw.column(column.source))
            .collect::<IngestResult<Vec<_>>>()?;

        let mut seen_keys = HashSet::new();
        let mut rows = Vec::with_capacity(raw.num_rows());

        for row_index in 0..raw.num_rows() {
            let row = self
                .columns
                .iter()
                .zip(&sources)
                .map(|(column, source)| {
                    column
                        .kind
                        .convert(source.cell(row_index))
                        .map_err(|reason| IngestError::Projection {
                            table: self.name,
                            column: column.source.to_string(),
                            row: row_index,
                            reason,
                        })
                })
                .collect::<IngestResult<Row>>()?;

            if let Some(SqlValue::Integer(key)) = self.natural_key.map(|index| &row[index]) {
                if !seen_keys.insert(*key) {
                    continue;
                }
            }

            rows.push(row);
        }

        Ok(rows)
    }
}

static DEPARTMENT_TABLES: [&TableDescriptor; 2] = [&DEPARTMENTS, &DEPARTMENTS_POPULATION_HISTORY];
static MUNICIPALITIES_TABLES: [&TableDescriptor; 1] = [&MUNICIPALITIES];
static MUNICIPALITY_TABLES: [&TableDescriptor; 1] = [&MUNICIPALITY_POPULATION_HISTORY];
static SUICIDES_TABLES: [&TableDescriptor; 1] = [&SUICIDES];
static ATTEMPTS_TABLES: [&TableDescriptor; 1] = [&SUICIDE_ATTEMPTS];
static INTERFAMILY_TABLES: [&TableDescriptor; 1] = [&INTERFAMILY_VIOLENCE];

impl Category {
    /// Tables fed by files of this category, in load order
    pub fn tables(self) -> &'static [&'static TableDescriptor] {
        match self {
            Category::Department => &DEPARTMENT_TABLES,
            Category::Municipalities => &MUNICIPALITIES_TABLES,
            Category::Municipality => &MUNICIPALITY_TABLES,
            Category::Suicides => &SUICIDES_TABLES,
            Category::Attempts => &ATTEMPTS_TABLES,
            Category::Interfamily => &INTERFAMILY_TABLES,
        }
    }
}

/// Look up the tables for a category token; `None` for files outside the ingestion scope
pub fn resolve(token: &str) -> Option<&'static [&'static TableDescriptor]> {
    Category::from_token(token).map(Category::tables)
}
