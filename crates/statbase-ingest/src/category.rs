//! Filename categories
//!
//! A file's category is the part of its file name before the first underscore
//! (`preprocessed/department_2020.csv` -> `department`). Both stages derive it with
//! [`category_token`] so the transcoder's delimiter choice and the loader's table
//! lookup can never disagree about what a file is.

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

/// Extension written by the transcoder
pub const TRANSCODED_EXTENSION: &str = "parquet";

const RAW_EXTENSION: &str = ".csv";

/// Category token of an object key: final path segment up to the first `_`.
///
/// A file name without an underscore is its own token.
pub fn category_token(key: &str) -> &str {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name.split('_').next().unwrap_or(file_name)
}

/// Categories with tables in the relational store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Department reference rows plus yearly population per department
    Department,
    /// Municipality reference rows with coordinates
    Municipalities,
    /// Yearly population per municipality
    Municipality,
    Suicides,
    /// Weekly suicide attempts per municipality
    Attempts,
    /// Interfamily violence counts per municipality
    Interfamily,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Department,
        Category::Municipalities,
        Category::Municipality,
        Category::Suicides,
        Category::Attempts,
        Category::Interfamily,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.as_str() == token)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::from_token(category_token(key))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Department => "department",
            Category::Municipalities => "municipalities",
            Category::Municipality => "municipality",
            Category::Suicides => "suicides",
            Category::Attempts => "attempts",
            Category::Interfamily => "interfamily",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field delimiter of a raw extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    /// Semicolon-delimited sources are a fixed list; everything else is comma-separated.
    pub fn for_token(token: &str) -> Self {
        match token {
            "department" | "municipality" => Delimiter::Semicolon,
            _ => Delimiter::Comma,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }
}

/// Key the transcoded copy of `raw_key` is written to.
///
/// `preprocessed/sub/department_2020.csv` with prefixes `preprocessed`/`parquetized`
/// becomes `parquetized/sub/department_2020.parquet`.
pub fn transcoded_key(raw_key: &str, raw_prefix: &str, transcoded_prefix: &str) -> IngestResult<String> {
    let raw_prefix = raw_prefix.trim_end_matches('/');
    let rest = raw_key
        .strip_prefix(raw_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| IngestError::InvalidKey {
            key: raw_key.to_string(),
            reason: format!("expected a key under '{}/'", raw_prefix),
        })?;

    let stem = match rest.len().checked_sub(RAW_EXTENSION.len()) {
        Some(split) if rest.is_char_boundary(split) && rest[split..].eq_ignore_ascii_case(RAW_EXTENSION) => {
            &rest[..split]
        },
        _ => rest,
    };

    Ok(format!(
        "{}/{}.{}",
        transcoded_prefix.trim_end_matches('/'),
        stem,
        TRANSCODED_EXTENSION
    ))
}
