#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory ridership table.
//!
//! The check-in CSV is parsed once into a [`RidershipTable`]; every query
//! ([`RidershipTable::list`], [`RidershipTable::analytics`], ...) is a
//! read-only pass over the rows, so a table can be shared behind an `Arc`
//! by any number of concurrent readers.

pub mod analytics;
mod group;
pub mod query;

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use transit_map_ridership_models::RidershipRecord;

/// Default page size for the registrations listing.
pub const DEFAULT_LIMIT: usize = 1000;

/// Largest page size a caller may request.
pub const MAX_LIMIT: usize = 10_000;

/// Errors that can occur loading or querying ridership data.
#[derive(Debug, Error)]
pub enum RidershipError {
    /// The CSV file could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be parsed.
    #[error("CSV error at row {row}: {source}")]
    Csv {
        /// 1-based data row (header excluded).
        row: usize,
        /// Underlying parse failure.
        source: csv::Error,
    },

    /// A requested page size exceeds [`MAX_LIMIT`].
    #[error("limit {limit} exceeds the maximum of {MAX_LIMIT}")]
    LimitTooLarge {
        /// Requested limit.
        limit: usize,
    },
}

/// Offset/limit window over filtered rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    limit: usize,
    offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Builds a page, defaulting `limit` to [`DEFAULT_LIMIT`] and `offset`
    /// to 0.
    ///
    /// # Errors
    ///
    /// Returns [`RidershipError::LimitTooLarge`] if `limit` exceeds
    /// [`MAX_LIMIT`].
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Result<Self, RidershipError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit > MAX_LIMIT {
            return Err(RidershipError::LimitTooLarge { limit });
        }
        Ok(Self {
            limit,
            offset: offset.unwrap_or(0),
        })
    }

    /// Maximum rows on the page.
    #[must_use]
    pub const fn limit(self) -> usize {
        self.limit
    }

    /// Rows skipped before the page.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.offset
    }
}

/// The loaded check-in rows.
#[derive(Debug, Clone, Default)]
pub struct RidershipTable {
    records: Vec<RidershipRecord>,
}

impl RidershipTable {
    /// Loads the check-in CSV at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RidershipError`] if the file cannot be opened or any row
    /// fails to parse.
    pub fn load(path: &Path) -> Result<Self, RidershipError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        log::info!(
            "Loaded {} ridership records from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses check-in CSV from any reader. The first row must be the
    /// header.
    ///
    /// # Errors
    ///
    /// Returns [`RidershipError::Csv`] naming the first row that fails.
    pub fn from_reader(reader: impl Read) -> Result<Self, RidershipError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let records = csv_reader
            .deserialize::<RidershipRecord>()
            .enumerate()
            .map(|(i, row)| row.map_err(|source| RidershipError::Csv { row: i + 1, source }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { records })
    }

    /// Wraps already-parsed rows.
    #[must_use]
    pub const fn from_records(records: Vec<RidershipRecord>) -> Self {
        Self { records }
    }

    /// All rows in file order.
    #[must_use]
    pub fn records(&self) -> &[RidershipRecord] {
        &self.records
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::RidershipTable;

    pub const CSV: &str = "\
Date,Hour,Route,Total Count,By SmartCard,By QR,Number Of Busses,Operator
2024-03-01,7,10,120,100,20,4,BakuBus
2024-03-01,8,10,200,150,50,5,BakuBus
2024-03-01,8,2,90,60,30,3,Sahil
2024-03-02,7,2,60,30,30,3,Sahil
2024-03-02,8,A1,40,40,0,2,Ekspress
2024-03-02,9,10,80,70,10,0,BakuBus
";

    pub fn table() -> RidershipTable {
        RidershipTable::from_reader(CSV.as_bytes()).unwrap()
    }
}
