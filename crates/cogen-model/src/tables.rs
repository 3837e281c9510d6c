//! Plant configuration tables.
//!
//! Every table is validated when it is built, so code downstream of a
//! [`PlantConfig`] can index by position without re-checking shapes.

use thiserror::Error;

/// Number of steam-flow decision variables in the header network.
pub const N_VARIABLES: usize = 10;
/// Number of pressure stages in the attribute table.
pub const N_STAGES: usize = 4;
/// Length of the operating demand vector.
pub const DEMAND_LEN: usize = 4;
/// Attribute row holding per-stage enthalpy.
pub const ENTHALPY_ROW: &str = "BTU/LB";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{table}: expected {expected} columns, found {found}")]
    ColumnCount {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{table}: expected {expected} rows, found {found}")]
    RowCount {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{table}: row {row} has {found} values, expected {expected}")]
    RowLength {
        table: &'static str,
        row: String,
        expected: usize,
        found: usize,
    },
    #[error("{1}: missing required row {0}")]
    MissingRow(String, &'static str),
    #[error("{table}: missing required value in row {row}, column {column}")]
    MissingValue {
        table: &'static str,
        row: String,
        column: String,
    },
    #[error("constraint table: {variable} has Min {min} above Max {max}")]
    InvertedBounds { variable: String, min: f64, max: f64 },
    #[error("mass balance: {lhs} LHS equations but {rhs} RHS equations")]
    EquationMismatch { lhs: usize, rhs: usize },
    #[error("demand vector must hold finite values, got {0:?}")]
    NonFiniteDemand(Vec<f64>),
    #[error("expected {expected} values, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("constraint table: no variable in column {0}")]
    UnknownColumn(usize),
}

/// Per-variable `{Min, Max}` operating limits. Absent cells are `None`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintTable {
    names: Vec<String>,
    min: Vec<Option<f64>>,
    max: Vec<Option<f64>>,
}

impl ConstraintTable {
    pub fn new(
        names: Vec<String>,
        min: Vec<Option<f64>>,
        max: Vec<Option<f64>>,
    ) -> Result<Self, ConfigError> {
        if names.len() != N_VARIABLES {
            return Err(ConfigError::ColumnCount {
                table: "constraint table",
                expected: N_VARIABLES,
                found: names.len(),
            });
        }
        for (row, values) in [("Min", &min), ("Max", &max)] {
            if values.len() != names.len() {
                return Err(ConfigError::RowLength {
                    table: "constraint table",
                    row: row.to_string(),
                    expected: names.len(),
                    found: values.len(),
                });
            }
        }
        for (i, name) in names.iter().enumerate() {
            if let (Some(lo), Some(hi)) = (min[i], max[i]) {
                if lo > hi {
                    return Err(ConfigError::InvertedBounds {
                        variable: name.clone(),
                        min: lo,
                        max: hi,
                    });
                }
            }
            // Absent cells must be None, not NaN
            if min[i].is_some_and(f64::is_nan) || max[i].is_some_and(f64::is_nan) {
                return Err(ConfigError::MissingValue {
                    table: "constraint table",
                    row: "Min/Max".to_string(),
                    column: name.clone(),
                });
            }
        }
        Ok(Self { names, min, max })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn min(&self, variable: usize) -> Option<f64> {
        self.min.get(variable).copied().flatten()
    }

    pub fn max(&self, variable: usize) -> Option<f64> {
        self.max.get(variable).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of `Some` cells across both rows.
    pub fn defined_bounds(&self) -> usize {
        self.min.iter().chain(&self.max).filter(|v| v.is_some()).count()
    }

    /// Copy of the table with one Max cell replaced, validated like [`ConstraintTable::new`].
    pub fn with_max(self, variable: usize, value: Option<f64>) -> Result<Self, ConfigError> {
        let Self { names, min, mut max } = self;
        let cell = max.get_mut(variable).ok_or(ConfigError::UnknownColumn(variable))?;
        *cell = value;
        Self::new(names, min, max)
    }

    /// Copy of the table with one Min cell replaced, validated like [`ConstraintTable::new`].
    pub fn with_min(self, variable: usize, value: Option<f64>) -> Result<Self, ConfigError> {
        let Self { names, mut min, max } = self;
        let cell = min.get_mut(variable).ok_or(ConfigError::UnknownColumn(variable))?;
        *cell = value;
        Self::new(names, min, max)
    }
}

/// Named per-stage attributes. Must carry a finite [`ENTHALPY_ROW`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTable {
    stages: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl AttributeTable {
    pub fn new(stages: Vec<String>, rows: Vec<(String, Vec<f64>)>) -> Result<Self, ConfigError> {
        if stages.len() != N_STAGES {
            return Err(ConfigError::ColumnCount {
                table: "attribute table",
                expected: N_STAGES,
                found: stages.len(),
            });
        }
        for (name, values) in &rows {
            if values.len() != stages.len() {
                return Err(ConfigError::RowLength {
                    table: "attribute table",
                    row: name.clone(),
                    expected: stages.len(),
                    found: values.len(),
                });
            }
        }
        let (_, enthalpy) = rows
            .iter()
            .find(|(name, _)| name == ENTHALPY_ROW)
            .ok_or_else(|| ConfigError::MissingRow(ENTHALPY_ROW.to_string(), "attribute table"))?;
        if let Some(i) = enthalpy.iter().position(|h| !h.is_finite()) {
            return Err(ConfigError::MissingValue {
                table: "attribute table",
                row: ENTHALPY_ROW.to_string(),
                column: stages[i].clone(),
            });
        }
        Ok(Self { stages, rows })
    }

    /// Table holding only the enthalpy row.
    pub fn from_enthalpy(
        stages: Vec<String>,
        enthalpy: [f64; N_STAGES],
    ) -> Result<Self, ConfigError> {
        Self::new(stages, vec![(ENTHALPY_ROW.to_string(), enthalpy.to_vec())])
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub fn row(&self, name: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(row, _)| row == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Per-stage enthalpy, BTU/LB. Presence and finiteness are checked at construction.
    pub fn enthalpy(&self) -> [f64; N_STAGES] {
        let mut out = [0.0; N_STAGES];
        if let Some(values) = self.row(ENTHALPY_ROW) {
            out.copy_from_slice(&values[..N_STAGES]);
        }
        out
    }
}

/// Mass-balance coefficients: `lhs · x = rhs · demand`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MassBalance {
    equations: Vec<String>,
    lhs: Vec<Vec<f64>>,
    rhs: Vec<Vec<f64>>,
}

impl MassBalance {
    pub fn new(
        equations: Vec<String>,
        lhs: Vec<Vec<f64>>,
        rhs: Vec<Vec<f64>>,
    ) -> Result<Self, ConfigError> {
        if lhs.len() != rhs.len() {
            return Err(ConfigError::EquationMismatch {
                lhs: lhs.len(),
                rhs: rhs.len(),
            });
        }
        if equations.len() != lhs.len() {
            return Err(ConfigError::RowCount {
                table: "mass balance",
                expected: equations.len(),
                found: lhs.len(),
            });
        }
        for (i, name) in equations.iter().enumerate() {
            check_row("mass balance LHS", name, &lhs[i], N_VARIABLES)?;
            check_row("mass balance RHS", name, &rhs[i], DEMAND_LEN)?;
        }
        Ok(Self { equations, lhs, rhs })
    }

    pub fn equations(&self) -> &[String] {
        &self.equations
    }

    pub fn lhs(&self) -> &[Vec<f64>] {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Vec<f64>] {
        &self.rhs
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }
}

fn check_row(
    table: &'static str,
    row: &str,
    values: &[f64],
    expected: usize,
) -> Result<(), ConfigError> {
    if values.len() != expected {
        return Err(ConfigError::RowLength {
            table,
            row: row.to_string(),
            expected,
            found: values.len(),
        });
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(ConfigError::MissingValue {
            table,
            row: row.to_string(),
            column: i.to_string(),
        });
    }
    Ok(())
}

/// All tables for one plant. Read-only once built.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlantConfig {
    pub constraints: ConstraintTable,
    pub attributes: AttributeTable,
    pub mass_balance: MassBalance,
}

impl PlantConfig {
    pub fn new(
        constraints: ConstraintTable,
        attributes: AttributeTable,
        mass_balance: MassBalance,
    ) -> Result<Self, ConfigError> {
        // Column i of the LHS is column i of the constraint table
        if let Some(row) = mass_balance.lhs().iter().find(|row| row.len() != constraints.len()) {
            return Err(ConfigError::DimensionMismatch {
                expected: constraints.len(),
                found: row.len(),
            });
        }
        Ok(Self {
            constraints,
            attributes,
            mass_balance,
        })
    }

    /// Re-runs every constructor check, for tables that arrived by deserialization.
    pub fn revalidate(self) -> Result<Self, ConfigError> {
        let PlantConfig {
            constraints,
            attributes,
            mass_balance,
        } = self;
        Self::new(
            ConstraintTable::new(constraints.names, constraints.min, constraints.max)?,
            AttributeTable::new(attributes.stages, attributes.rows)?,
            MassBalance::new(mass_balance.equations, mass_balance.lhs, mass_balance.rhs)?,
        )
    }

    pub fn variable_names(&self) -> &[String] {
        self.constraints.names()
    }

    /// The reference plant shipped under `data/`.
    pub fn reference() -> Self {
        let names = [
            "F_PB", "F_PRV1", "F_TG1A", "F_PRV2", "F_TG1B", "F_TG2", "F_TC", "F_PRV3", "F_TG3",
            "F_VENT",
        ]
        .map(String::from)
        .to_vec();
        let min = vec![
            Some(500.0),
            None,
            Some(50.0),
            None,
            Some(25.0),
            Some(100.0),
            None,
            None,
            Some(50.0),
            Some(0.0),
        ];
        let max = [1450.0, 350.0, 400.0, 400.0, 350.0, 700.0, 50.0, 700.0, 500.0, 500.0]
            .map(Some)
            .to_vec();

        let stages = ["PB", "HP", "IP", "LP"].map(String::from).to_vec();
        let attributes = vec![
            ("PSIG".to_string(), vec![1250.0, 600.0, 150.0, 50.0]),
            ("DEGF".to_string(), vec![900.0, 700.0, 450.0, 320.0]),
            (ENTHALPY_ROW.to_string(), vec![1437.2, 1356.8, 1246.3, 1189.5]),
        ];

        let equations = ["supply", "pb_header", "hp_header", "ip_header", "lp_header"]
            .map(String::from)
            .to_vec();
        let lhs = vec![
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![1.0, -1.0, -1.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0, -1.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, -1.0],
        ];
        let rhs = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ];

        // Literal tables above satisfy every shape rule
        Self {
            constraints: ConstraintTable { names, min, max },
            attributes: AttributeTable { stages, rows: attributes },
            mass_balance: MassBalance { equations, lhs, rhs },
        }
    }
}

/// Operating scenario: `[boiler steam supply, HP load, IP load, LP load]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Demand([f64; DEMAND_LEN]);

impl Demand {
    /// Zero and negative entries are accepted; only non-finite values are rejected.
    pub fn new(values: [f64; DEMAND_LEN]) -> Result<Self, ConfigError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteDemand(values.to_vec()));
        }
        Ok(Self(values))
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, ConfigError> {
        let array: [f64; DEMAND_LEN] =
            values.try_into().map_err(|_| ConfigError::DimensionMismatch {
                expected: DEMAND_LEN,
                found: values.len(),
            })?;
        Self::new(array)
    }

    pub fn values(&self) -> &[f64; DEMAND_LEN] {
        &self.0
    }

    pub fn boiler_supply(&self) -> f64 {
        self.0[0]
    }

    pub fn hp_load(&self) -> f64 {
        self.0[1]
    }

    pub fn ip_load(&self) -> f64 {
        self.0[2]
    }

    pub fn lp_load(&self) -> f64 {
        self.0[3]
    }

    pub fn scaled(&self, alpha: f64) -> Self {
        Self(self.0.map(|v| v * alpha))
    }
}

impl std::ops::Add for Demand {
    type Output = Demand;

    fn add(self, other: Demand) -> Demand {
        let mut out = self.0;
        for (o, v) in out.iter_mut().zip(other.0) {
            *o += v;
        }
        Demand(out)
    }
}
