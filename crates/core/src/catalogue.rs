//! Catalogue loading.
//!
//! The catalogue is a comma separated file with a header row and exactly
//! [`COLUMN_COUNT`] columns:
//! `name, engine, horsepower, price, torque, car_type, rating, reliability,
//! zero_to_sixty, max_speed, image_ref`.
//!
//! Records keep file order; that order is the tie-breaker for every
//! downstream query.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::domain::car::{CarId, CarRecord, CarType, Engine};
use crate::errors::CatalogueError;
use crate::features::NumericColumn;
use crate::index::buckets::DecisionKey;

pub const COLUMN_COUNT: usize = 11;

pub const COLUMNS: [&str; COLUMN_COUNT] = [
    "name",
    "engine",
    "horsepower",
    "price",
    "torque",
    "car_type",
    "rating",
    "reliability",
    "zero_to_sixty",
    "max_speed",
    "image_ref",
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CatalogueOptions {
    /// Reject engine / car type values outside the known sets instead of
    /// loading them as `Other`.
    pub strict_enums: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    records: Vec<CarRecord>,
    positions: HashMap<String, CarId>,
}

impl Catalogue {
    pub fn load(path: impl AsRef<Path>, options: CatalogueOptions) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|source| CatalogueError::Io { path: path.to_path_buf(), source })?;
        let catalogue = Self::from_reader(file, options)?;

        info!(
            event_name = "catalogue.load.completed",
            path = %path.display(),
            records = catalogue.len(),
            unindexable = catalogue.unindexable_count(),
            "catalogue loaded"
        );
        Ok(catalogue)
    }

    pub fn from_reader<R: Read>(reader: R, options: CatalogueOptions) -> Result<Self, CatalogueError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers =
            reader.headers().map_err(|source| CatalogueError::Csv { line: 1, source })?.clone();
        if headers.len() != COLUMN_COUNT {
            return Err(CatalogueError::Malformed {
                line: 1,
                reason: format!(
                    "header has {} columns, expected {COLUMN_COUNT} ({})",
                    headers.len(),
                    COLUMNS.join(", ")
                ),
            });
        }

        let mut catalogue = Self::default();
        let mut first_lines: HashMap<String, u64> = HashMap::new();

        for (row_index, row) in reader.records().enumerate() {
            // Header is line 1; fall back to counting rows when csv has no position.
            let fallback_line = row_index as u64 + 2;
            let row = row.map_err(|source| CatalogueError::Csv {
                line: source.position().map_or(fallback_line, csv::Position::line),
                source,
            })?;
            let line = row.position().map_or(fallback_line, csv::Position::line);

            let record = parse_row(&row, line, options)?;
            if let Some(first_line) = first_lines.get(&record.name) {
                return Err(CatalogueError::DuplicateCar {
                    name: record.name,
                    first_line: *first_line,
                    line,
                });
            }
            first_lines.insert(record.name.clone(), line);
            catalogue.push(record);
        }

        Ok(catalogue)
    }

    /// Builds a catalogue from already typed records, applying the same
    /// identity and value rules as the file loader. Line numbers in errors
    /// count the header, so the first record is line 2.
    pub fn from_records(records: Vec<CarRecord>) -> Result<Self, CatalogueError> {
        let mut catalogue = Self::default();
        for (index, record) in records.into_iter().enumerate() {
            let line = index as u64 + 2;
            validate_record(&record, line)?;
            if let Some(first) = catalogue.positions.get(&record.name) {
                return Err(CatalogueError::DuplicateCar {
                    name: record.name,
                    first_line: first.0 as u64 + 2,
                    line,
                });
            }
            catalogue.push(record);
        }
        Ok(catalogue)
    }

    fn push(&mut self, record: CarRecord) {
        let id = CarId(self.records.len());
        self.positions.insert(record.name.clone(), id);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CarRecord] {
        &self.records
    }

    pub fn get(&self, id: CarId) -> Option<&CarRecord> {
        self.records.get(id.0)
    }

    pub fn position(&self, name: &str) -> Option<CarId> {
        self.positions.get(name).copied()
    }

    pub fn find(&self, name: &str) -> Option<&CarRecord> {
        self.position(name).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (CarId, &CarRecord)> + '_ {
        self.records.iter().enumerate().map(|(index, record)| (CarId(index), record))
    }

    /// Raw values of one numeric column in catalogue order.
    pub fn column(&self, column: NumericColumn) -> Vec<f64> {
        self.records.iter().map(|record| column.value(record)).collect()
    }

    /// Discretised view: one entry per record, `None` where the record has
    /// an `Other` engine or car type.
    pub fn decision_keys(&self) -> Vec<Option<DecisionKey>> {
        self.records.iter().map(DecisionKey::from_record).collect()
    }

    pub fn unindexable_count(&self) -> usize {
        self.records.iter().filter(|record| !record.is_indexable()).count()
    }
}

fn parse_row(
    row: &csv::StringRecord,
    line: u64,
    options: CatalogueOptions,
) -> Result<CarRecord, CatalogueError> {
    if row.len() != COLUMN_COUNT {
        return Err(CatalogueError::Malformed {
            line,
            reason: format!("row has {} columns, expected {COLUMN_COUNT}", row.len()),
        });
    }

    let field = |index: usize| row.get(index).unwrap_or_default();

    let name = field(0).to_owned();
    if name.is_empty() {
        return Err(malformed(line, "name is empty".to_owned()));
    }

    let engine = Engine::parse_lenient(field(1));
    let car_type = CarType::parse_lenient(field(5));
    if engine.is_other() || car_type.is_other() {
        if options.strict_enums {
            return Err(CatalogueError::Malformed {
                line,
                reason: format!(
                    "car `{name}` has unknown engine `{engine}` or car type `{car_type}`"
                ),
            });
        }
        warn!(
            event_name = "catalogue.load.unknown_enum",
            line,
            car = %name,
            engine = %engine,
            car_type = %car_type,
            "car will not be reachable through the decision index"
        );
    }

    let record = CarRecord {
        name,
        engine,
        horsepower: parse_number(field(2), "horsepower", line)?,
        price: parse_number(field(3), "price", line)?,
        torque: parse_number(field(4), "torque", line)?,
        car_type,
        rating: parse_number(field(6), "rating", line)?,
        reliability: parse_number(field(7), "reliability", line)?,
        zero_to_sixty: parse_number(field(8), "zero_to_sixty", line)?,
        max_speed: parse_number(field(9), "max_speed", line)?,
        image_ref: field(10).to_owned(),
    };
    validate_record(&record, line)?;
    Ok(record)
}

fn parse_number<T: FromStr>(raw: &str, column: &str, line: u64) -> Result<T, CatalogueError> {
    raw.parse::<T>()
        .map_err(|_| malformed(line, format!("{column} `{raw}` is not a valid number")))
}

/// Value rules every record obeys however it was built: a non-blank name,
/// positive integer columns, finite reals inside their ranges.
fn validate_record(record: &CarRecord, line: u64) -> Result<(), CatalogueError> {
    if record.name.trim().is_empty() {
        return Err(malformed(line, "name is empty".to_owned()));
    }

    let positive = [
        ("horsepower", u64::from(record.horsepower)),
        ("price", record.price),
        ("torque", u64::from(record.torque)),
        ("max_speed", u64::from(record.max_speed)),
    ];
    for (column, value) in positive {
        if value == 0 {
            return Err(malformed(line, format!("{column} must be positive, got 0")));
        }
    }

    check_real("rating", record.rating, line, |value| (0.0..=10.0).contains(&value))?;
    check_real("reliability", record.reliability, line, |value| (0.0..=5.0).contains(&value))?;
    check_real("zero_to_sixty", record.zero_to_sixty, line, |value| value > 0.0)?;
    Ok(())
}

fn check_real(
    column: &str,
    value: f64,
    line: u64,
    in_range: impl Fn(f64) -> bool,
) -> Result<(), CatalogueError> {
    if !value.is_finite() || !in_range(value) {
        return Err(malformed(line, format!("{column} `{value}` is out of range")));
    }
    Ok(())
}

fn malformed(line: u64, reason: String) -> CatalogueError {
    CatalogueError::Malformed { line, reason }
}
