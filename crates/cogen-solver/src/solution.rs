use std::fmt;

/// The result of solving an LP problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Values for each variable. Only meaningful when `status` is optimal;
    /// otherwise this holds whatever point the solver stopped at.
    pub values: Vec<f64>,
    /// Objective value of `values`
    pub objective_value: f64,
    /// Human-readable termination message
    pub message: String,
    /// Pivots (simplex) or Newton steps (interior point) performed
    pub iterations: usize,
    /// Constraint violations (populated when infeasible)
    pub violations: Vec<ConstraintViolation>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// The problem is unbounded
    Unbounded,
    /// The iteration limit was hit before convergence
    IterationLimit,
    /// Solver encountered a numerical error
    Error,
}

impl SolutionStatus {
    pub fn is_optimal(self) -> bool {
        self == SolutionStatus::Optimal
    }

    /// Status string in the vocabulary conic/interior-point codes report.
    pub fn as_str(self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "optimal",
            SolutionStatus::Infeasible => "primal infeasible",
            SolutionStatus::Unbounded => "dual infeasible",
            SolutionStatus::IterationLimit => "unknown",
            SolutionStatus::Error => "error",
        }
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about a violated constraint
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl Solution {
    pub fn optimal(values: Vec<f64>, objective_value: f64, iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            message: "Optimization terminated successfully.".to_string(),
            iterations,
            violations: Vec::new(),
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            values: Vec::new(),
            objective_value: f64::INFINITY,
            message: "The problem appears to be infeasible.".to_string(),
            iterations: 0,
            violations: Vec::new(),
        }
    }

    /// Infeasible, with the closest point found and the rows it breaks.
    pub fn infeasible_at(
        values: Vec<f64>,
        objective_value: f64,
        violations: Vec<ConstraintViolation>,
    ) -> Self {
        Self {
            values,
            objective_value,
            violations,
            ..Self::infeasible()
        }
    }

    pub fn unbounded() -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::NEG_INFINITY,
            message: "The problem appears to be unbounded.".to_string(),
            iterations: 0,
            violations: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SolutionStatus::Error,
            values: Vec::new(),
            objective_value: f64::NAN,
            message: message.into(),
            iterations: 0,
            violations: Vec::new(),
        }
    }

    pub fn stopped(
        status: SolutionStatus,
        values: Vec<f64>,
        objective_value: f64,
        iterations: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            values,
            objective_value,
            message: message.into(),
            iterations,
            violations: Vec::new(),
        }
    }
}
