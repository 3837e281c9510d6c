//! Reads plant tables from CSV files.
//!
//! Each file has a header row of column names and a leading label column
//! (`constraint`, `attribute` or `equation`).

use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use crate::tables::{AttributeTable, ConfigError, ConstraintTable, MassBalance, PlantConfig};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: constraint table needs Min and Max rows")]
    MissingBoundRow { path: PathBuf },
    #[error("{path}: invalid number {value:?} in row {row}")]
    BadNumber { path: PathBuf, row: String, value: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Paths to the four table files.
#[derive(Debug, Clone)]
pub struct PlantFiles {
    pub constraints: PathBuf,
    pub attributes: PathBuf,
    pub mass_balance_lhs: PathBuf,
    pub mass_balance_rhs: PathBuf,
}

impl PlantFiles {
    /// Conventional file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            constraints: dir.join("constraints.csv"),
            attributes: dir.join("attributes.csv"),
            mass_balance_lhs: dir.join("mass_balance_lhs.csv"),
            mass_balance_rhs: dir.join("mass_balance_rhs.csv"),
        }
    }
}

pub fn load_dir(dir: impl AsRef<Path>) -> Result<PlantConfig, LoadError> {
    load_files(&PlantFiles::in_dir(dir))
}

pub fn load_files(files: &PlantFiles) -> Result<PlantConfig, LoadError> {
    let config = PlantConfig::new(
        parse_constraints(&files.constraints, open(&files.constraints)?)?,
        parse_attributes(&files.attributes, open(&files.attributes)?)?,
        parse_mass_balance(
            (&files.mass_balance_lhs, open(&files.mass_balance_lhs)?),
            (&files.mass_balance_rhs, open(&files.mass_balance_rhs)?),
        )?,
    )?;
    tracing::debug!(
        variables = config.constraints.len(),
        equations = config.mass_balance.len(),
        bounds = config.constraints.defined_bounds(),
        "loaded plant tables"
    );
    Ok(config)
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Header (without the label column) and labelled rows of raw cells.
struct LabelledTable {
    columns: Vec<String>,
    rows: Vec<(String, Vec<String>)>,
}

fn read_table(path: &Path, reader: impl Read) -> Result<LabelledTable, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);

    let columns = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let mut cells = record.iter();
        let label = cells.next().unwrap_or_default().to_string();
        rows.push((label, cells.map(str::to_string).collect()));
    }
    Ok(LabelledTable { columns, rows })
}

fn parse_optional(path: &Path, row: &str, cell: &str) -> Result<Option<f64>, LoadError> {
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse().map(Some).map_err(|_| LoadError::BadNumber {
        path: path.to_path_buf(),
        row: row.to_string(),
        value: cell.to_string(),
    })
}

/// Empty or unparsable cells become NaN; table validation decides whether that is fatal.
fn parse_lenient(cells: &[String]) -> Vec<f64> {
    cells.iter().map(|c| c.parse().unwrap_or(f64::NAN)).collect()
}

fn parse_constraints(path: &Path, reader: impl Read) -> Result<ConstraintTable, LoadError> {
    let table = read_table(path, reader)?;
    let row = |label: &str| -> Result<Vec<Option<f64>>, LoadError> {
        let (_, cells) = table
            .rows
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .ok_or_else(|| LoadError::MissingBoundRow { path: path.to_path_buf() })?;
        cells.iter().map(|c| parse_optional(path, label, c)).collect()
    };
    let min = row("Min")?;
    let max = row("Max")?;
    Ok(ConstraintTable::new(table.columns, min, max)?)
}

fn parse_attributes(path: &Path, reader: impl Read) -> Result<AttributeTable, LoadError> {
    let table = read_table(path, reader)?;
    let rows = table
        .rows
        .into_iter()
        .map(|(label, cells)| {
            let values = parse_lenient(&cells);
            (label, values)
        })
        .collect();
    Ok(AttributeTable::new(table.columns, rows)?)
}

fn parse_mass_balance(
    lhs: (&Path, impl Read),
    rhs: (&Path, impl Read),
) -> Result<MassBalance, LoadError> {
    let lhs = read_table(lhs.0, lhs.1)?;
    let rhs = read_table(rhs.0, rhs.1)?;
    let equations = lhs.rows.iter().map(|(label, _)| label.clone()).collect();
    let lhs_rows = lhs.rows.iter().map(|(_, cells)| parse_lenient(cells)).collect();
    let rhs_rows = rhs.rows.iter().map(|(_, cells)| parse_lenient(cells)).collect();
    Ok(MassBalance::new(equations, lhs_rows, rhs_rows)?)
}

/// Reads demand vectors from a CSV with four numeric columns per row.
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<crate::tables::Demand>, LoadError> {
    let path = path.as_ref();
    parse_scenarios(path, open(path)?)
}

fn parse_scenarios(
    path: &Path,
    reader: impl Read,
) -> Result<Vec<crate::tables::Demand>, LoadError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let values = record
            .iter()
            .map(|cell| {
                cell.parse::<f64>().map_err(|_| LoadError::BadNumber {
                    path: path.to_path_buf(),
                    row: (i + 1).to_string(),
                    value: cell.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.push(crate::tables::Demand::from_slice(&values)?);
    }
    Ok(out)
}
