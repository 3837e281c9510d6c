//! Independent feasibility check of a decision vector against a [`CanonicalForm`].

use std::fmt;

use crate::builder::CanonicalForm;

/// Equality residual tolerance.
pub const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// How equality residuals are compared against [`RESIDUAL_TOLERANCE`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResidualCheck {
    /// `|Σ (A_eq·x − b_eq)|` below tolerance. Opposite-signed residuals can cancel.
    #[default]
    Summed,
    /// Every `|A_eq·x − b_eq|` row below tolerance.
    PerRow,
}

fn dot(row: &[f64], x: &[f64]) -> f64 {
    row.iter().zip(x).map(|(a, v)| a * v).sum()
}

fn shapes_match(form: &CanonicalForm, x: &[f64]) -> bool {
    let n = x.len();
    form.a_eq.len() == form.b_eq.len()
        && form.a_ineq.len() == form.b_ineq.len()
        && form.a_eq.iter().chain(&form.a_ineq).all(|row| row.len() == n)
}

/// Equality rows within tolerance (per `policy`) and every inequality row
/// `A_ineq·x <= b_ineq` with no slack. Mismatched shapes give `false`.
pub fn check_feasible(form: &CanonicalForm, x: &[f64], policy: ResidualCheck) -> bool {
    if !shapes_match(form, x) {
        return false;
    }
    let mut residuals = form.a_eq.iter().zip(&form.b_eq).map(|(row, b)| dot(row, x) - b);
    let equalities = match policy {
        ResidualCheck::Summed => residuals.sum::<f64>().abs() < RESIDUAL_TOLERANCE,
        ResidualCheck::PerRow => residuals.all(|r| r.abs() < RESIDUAL_TOLERANCE),
    };
    let inequalities = form.a_ineq.iter().zip(&form.b_ineq).all(|(row, b)| dot(row, x) <= *b);
    equalities && inequalities
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityRow {
    pub name: String,
    pub residual: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct InequalityRow {
    pub name: String,
    pub lhs: f64,
    pub rhs: f64,
    pub satisfied: bool,
}

/// Row-by-row breakdown behind a [`check_feasible`] verdict.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FeasibilityReport {
    pub policy: ResidualCheck,
    pub equalities: Vec<EqualityRow>,
    pub inequalities: Vec<InequalityRow>,
    pub feasible: bool,
}

impl FeasibilityReport {
    pub fn new(
        form: &CanonicalForm,
        x: &[f64],
        equations: &[String],
        policy: ResidualCheck,
    ) -> Self {
        let feasible = check_feasible(form, x, policy);
        let equalities = form
            .a_eq
            .iter()
            .zip(&form.b_eq)
            .enumerate()
            .map(|(i, (row, b))| EqualityRow {
                name: equations.get(i).cloned().unwrap_or_else(|| format!("eq{i}")),
                residual: dot(row, x) - b,
            })
            .collect();
        let inequalities = form
            .a_ineq
            .iter()
            .zip(&form.b_ineq)
            .enumerate()
            .map(|(i, (row, b))| {
                let lhs = dot(row, x);
                InequalityRow {
                    name: form.ineq_labels.get(i).cloned().unwrap_or_else(|| format!("ineq{i}")),
                    lhs,
                    rhs: *b,
                    satisfied: lhs <= *b,
                }
            })
            .collect();
        Self {
            policy,
            equalities,
            inequalities,
            feasible,
        }
    }

    pub fn violated(&self) -> impl Iterator<Item = &InequalityRow> {
        self.inequalities.iter().filter(|row| !row.satisfied)
    }
}

impl fmt::Display for FeasibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Equality residuals ({:?}):", self.policy)?;
        for row in &self.equalities {
            writeln!(f, "  {:<16} {:>14.3e}", row.name, row.residual)?;
        }
        let violated: Vec<_> = self.violated().collect();
        if violated.is_empty() {
            writeln!(f, "All {} inequality rows satisfied", self.inequalities.len())?;
        } else {
            writeln!(f, "Violated inequality rows:")?;
            for row in violated {
                writeln!(f, "  {:<16} {:>12.4} > {:>12.4}", row.name, row.lhs, row.rhs)?;
            }
        }
        write!(f, "Feasible: {}", self.feasible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::tables::{Demand, PlantConfig};

    /// Hand-built point for demand [1100, 20, 550, 400] strictly inside every bound.
    fn interior_point() -> Vec<f64> {
        // x0 = 1100, x1 + x2 + x5 = 1100, x1 + x2 + x6 - x3 - x4 = 20,
        // x3 + x4 + x5 - x6 - x7 - x8 = 550, x7 + x8 - x9 = 400
        vec![1100.0, 200.0, 300.0, 220.0, 260.0, 600.0, 0.0, 230.0, 300.0, 130.0]
    }

    fn form() -> CanonicalForm {
        let mut config = PlantConfig::reference();
        // Min 0 on the vent puts 0 on its boundary; drop it so every row is strict
        config.constraints = config.constraints.with_min(9, None).unwrap();
        ModelBuilder::new(&config).build(&Demand::new([1100.0, 20.0, 550.0, 400.0]).unwrap())
    }

    #[test]
    fn test_exact_point_is_feasible() {
        let form = form();
        let x = interior_point();
        for (row, rhs) in form.a_ineq.iter().zip(&form.b_ineq) {
            assert!(dot(row, &x) < *rhs);
        }
        assert!(check_feasible(&form, &x, ResidualCheck::Summed));
        assert!(check_feasible(&form, &x, ResidualCheck::PerRow));
    }

    #[test]
    fn test_exceeding_max_fails() {
        let form = form();
        let mut x = interior_point();
        // F_TG3 max is 500; shift within the LP balance so equalities still hold
        x[8] = 500.0 + 1e-6;
        x[7] = 400.0 + x[9] - x[8];
        x[5] = 600.0;
        x[3] = 550.0 + x[6] + x[7] + x[8] - x[4] - x[5];
        x[1] = 20.0 + x[3] + x[4] - x[2] - x[6];
        assert!(!check_feasible(&form, &x, ResidualCheck::Summed));

        let row = form.ineq_labels.iter().position(|l| l == "F_TG3_max").unwrap();
        assert!(dot(&form.a_ineq[row], &x) > form.b_ineq[row]);
    }

    #[test]
    fn test_summed_residuals_can_cancel() {
        let form = form();
        let mut x = interior_point();
        // Thermocompressor flow adds +1 to the HP header and -1 to the IP header
        x[6] = 1.0;
        let residual_sum: f64 = form.a_eq.iter().zip(&form.b_eq).map(|(r, b)| dot(r, &x) - b).sum();
        assert!(residual_sum.abs() < RESIDUAL_TOLERANCE);

        assert!(check_feasible(&form, &x, ResidualCheck::Summed));
        assert!(!check_feasible(&form, &x, ResidualCheck::PerRow));
    }

    #[test]
    fn test_zero_vector_is_not_feasible() {
        let form = form();
        assert!(!check_feasible(&form, &[0.0; 10], ResidualCheck::Summed));
    }

    #[test]
    fn test_wrong_length_is_not_feasible() {
        let form = form();
        assert!(!check_feasible(&form, &[0.0; 3], ResidualCheck::Summed));
        assert!(!check_feasible(&form, &[], ResidualCheck::PerRow));
    }

    #[test]
    fn test_nan_is_not_feasible() {
        let form = form();
        let mut x = interior_point();
        x[0] = f64::NAN;
        assert!(!check_feasible(&form, &x, ResidualCheck::Summed));
    }

    #[test]
    fn test_check_is_idempotent() {
        let form = form();
        let x = interior_point();
        let first = check_feasible(&form, &x, ResidualCheck::PerRow);
        let second = check_feasible(&form, &x, ResidualCheck::PerRow);
        assert_eq!(first, second);
    }

    #[test]
    fn test_report_agrees_with_check() {
        let form = form();
        let mut x = interior_point();
        x[8] = 600.0;
        let report = FeasibilityReport::new(&form, &x, &[], ResidualCheck::PerRow);
        assert_eq!(report.feasible, check_feasible(&form, &x, ResidualCheck::PerRow));
        assert!(report.violated().any(|row| row.name == "F_TG3_max"));
        assert_eq!(report.equalities[0].name, "eq0");
    }
}
