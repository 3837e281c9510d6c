//! Runs an LP backend on an already-built [`CanonicalForm`].

use std::fmt;
use std::str::FromStr;

use cogen_solver::{
    polish, ConstraintViolation, InteriorPointSolver, LpSolver, Solution, SolutionStatus, Solver,
};
use thiserror::Error;

use crate::builder::CanonicalForm;

/// Tolerance used by the precision-tuned interior point backend.
pub const PRECISE_TOLERANCE: f64 = 1e-9;

/// Snap distance for polishing, relative to `1 + |bound|`.
const POLISH_TOLERANCE: f64 = 1e-6;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Simplex,
    InteriorPoint,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Named general-purpose routine; non-optimal results keep whatever point it stopped at.
    General(Method),
    /// Interior point at 1e-9 tolerances; non-optimal results become the zero vector.
    Precise,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::General(Method::Simplex)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown backend {0:?} (expected simplex, interior-point or precise)")]
pub struct ParseBackendError(String);

impl FromStr for Method {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simplex" => Ok(Method::Simplex),
            "interior-point" | "interior_point" | "ipm" => Ok(Method::InteriorPoint),
            _ => Err(ParseBackendError(s.to_string())),
        }
    }
}

impl FromStr for Backend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("precise") {
            return Ok(Backend::Precise);
        }
        s.parse().map(Backend::General)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Simplex => f.write_str("simplex"),
            Method::InteriorPoint => f.write_str("interior-point"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::General(method) => method.fmt(f),
            Backend::Precise => f.write_str("precise"),
        }
    }
}

/// Per-call solver settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub abstol: f64,
    pub reltol: f64,
    pub feastol: f64,
    /// Newton steps for the interior point routine
    pub max_iterations: usize,
    /// Pivot limit for the simplex routine
    pub max_pivots: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            abstol: 1e-7,
            reltol: 1e-6,
            feastol: 1e-7,
            max_iterations: 100,
            max_pivots: 10_000,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct AdapterOutput {
    pub backend: Backend,
    pub status: SolutionStatus,
    pub message: String,
    /// Decision vector. Only trustworthy when `status` is optimal.
    pub values: Vec<f64>,
    pub iterations: usize,
    /// Rows the simplex phase 1 point still breaks when infeasible
    pub violations: Vec<ConstraintViolation>,
}

impl AdapterOutput {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}

/// Solves `form` with `backend`; never fails, non-optimal outcomes are data.
pub fn solve_form(
    form: &CanonicalForm,
    names: &[String],
    equations: &[String],
    backend: Backend,
    options: &SolverOptions,
) -> AdapterOutput {
    let problem = form.to_lp_problem(names, equations);
    let n = form.num_variables();

    let solver: Box<dyn LpSolver> = match backend {
        Backend::General(Method::Simplex) => {
            Box::new(Solver::new().with_max_iterations(options.max_pivots))
        }
        Backend::General(Method::InteriorPoint) => Box::new(
            InteriorPointSolver::new()
                .with_abstol(options.abstol)
                .with_reltol(options.reltol)
                .with_feastol(options.feastol)
                .with_max_iterations(options.max_iterations),
        ),
        Backend::Precise => Box::new(
            InteriorPointSolver::new()
                .with_abstol(PRECISE_TOLERANCE)
                .with_reltol(PRECISE_TOLERANCE)
                .with_feastol(options.feastol)
                .with_max_iterations(options.max_iterations),
        ),
    };

    let Solution {
        status,
        values,
        message,
        iterations,
        violations,
        ..
    } = solver.solve(&problem);

    let values = if status.is_optimal() {
        polish(&problem, &values, POLISH_TOLERANCE)
    } else {
        tracing::warn!(%backend, %status, %message, "solver did not reach an optimum");
        match backend {
            Backend::Precise => vec![0.0; n],
            Backend::General(_) => {
                let mut values = values;
                values.resize(n, f64::NAN);
                values
            }
        }
    };

    // The precise routine reports only its status string
    let message = if backend == Backend::Precise {
        status.as_str().to_string()
    } else {
        message
    };

    tracing::debug!(%backend, solver = solver.name(), %status, iterations, "solve finished");
    AdapterOutput {
        backend,
        status,
        message,
        values,
        iterations,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::tables::{Demand, PlantConfig};

    fn solve(demand: [f64; 4], backend: Backend) -> (CanonicalForm, AdapterOutput) {
        let config = PlantConfig::reference();
        let form = ModelBuilder::new(&config).build(&Demand::new(demand).unwrap());
        let out = solve_form(
            &form,
            config.variable_names(),
            config.mass_balance.equations(),
            backend,
            &SolverOptions::default(),
        );
        (form, out)
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!("simplex".parse::<Backend>().unwrap(), Backend::General(Method::Simplex));
        let ipm = Backend::General(Method::InteriorPoint);
        assert_eq!("interior-point".parse::<Backend>().unwrap(), ipm);
        assert_eq!("Precise".parse::<Backend>().unwrap(), Backend::Precise);
        assert!("glpk".parse::<Backend>().is_err());
        assert_eq!(Backend::General(Method::InteriorPoint).to_string(), "interior-point");
    }

    #[test]
    fn test_all_backends_reach_same_objective() {
        let backends = [
            Backend::General(Method::Simplex),
            Backend::General(Method::InteriorPoint),
            Backend::Precise,
        ];
        let mut objectives = Vec::new();
        for backend in backends {
            let (form, out) = solve([1100.0, 20.0, 550.0, 400.0], backend);
            assert!(out.is_optimal(), "{backend}: {}", out.message);
            assert_eq!(out.values.len(), 10);
            objectives.push(form.objective_value(&out.values));
        }
        // Default interior point tolerances stop at a 1e-6 relative gap
        let reference = objectives[0];
        assert!((objectives[1] - reference).abs() <= 1e-5 * reference.abs(), "{objectives:?}");
        assert!((objectives[2] - reference).abs() <= 1e-6 * reference.abs(), "{objectives:?}");
    }

    #[test]
    fn test_precise_infeasible_falls_back_to_zero() {
        // Boiler supply above its 1450 limit
        let (_, out) = solve([2000.0, 20.0, 550.0, 400.0], Backend::Precise);
        assert!(!out.is_optimal());
        assert_eq!(out.values, vec![0.0; 10]);
        assert_eq!(out.message, out.status.as_str());
    }

    #[test]
    fn test_simplex_infeasible_reports_status() {
        let (_, out) = solve([2000.0, 20.0, 550.0, 400.0], Backend::General(Method::Simplex));
        assert_eq!(out.status, SolutionStatus::Infeasible);
        assert_eq!(out.values.len(), 10);
        assert!(!out.message.is_empty());
    }

    #[test]
    fn test_simplex_infeasible_names_broken_rows() {
        // LP load far beyond what the LP turbine, PRV and boiler can pass
        let config = PlantConfig::reference();
        let (form, out) = solve([1100.0, 20.0, 550.0, 5000.0], Backend::General(Method::Simplex));
        assert_eq!(out.status, SolutionStatus::Infeasible);
        assert!(out.values.iter().all(|v| v.is_finite()), "{:?}", out.values);
        assert!(!out.violations.is_empty());
        for v in &out.violations {
            let known = config.mass_balance.equations().contains(&v.constraint)
                || form.ineq_labels.contains(&v.constraint);
            assert!(known, "unexpected row {}", v.constraint);
            assert!(v.violation_amount > 0.0);
        }
    }

    #[test]
    fn test_interior_point_detects_infeasible_demand() {
        // Zero boiler supply is below the 500 minimum
        for backend in [Backend::General(Method::InteriorPoint), Backend::Precise] {
            let (_, out) = solve([0.0, 0.0, 0.0, 0.0], backend);
            assert_eq!(out.status, SolutionStatus::Infeasible, "{backend}");
            assert_eq!(out.message, "primal infeasible", "{backend}");
            assert_eq!(out.values.len(), 10);
        }
        let (_, out) = solve([-10.0, 0.0, 0.0, 0.0], Backend::Precise);
        assert_eq!(out.status, SolutionStatus::Infeasible);
        assert_eq!(out.values, vec![0.0; 10]);
    }

    #[test]
    fn test_polished_values_respect_bounds() {
        let backend = Backend::General(Method::InteriorPoint);
        let (form, out) = solve([1415.0, 15.0, 250.0, 900.0], backend);
        assert!(out.is_optimal());
        for (row, rhs) in form.a_ineq.iter().zip(&form.b_ineq) {
            let lhs: f64 = row.iter().zip(&out.values).map(|(a, x)| a * x).sum();
            assert!(lhs <= *rhs, "{lhs} > {rhs}");
        }
    }
}
