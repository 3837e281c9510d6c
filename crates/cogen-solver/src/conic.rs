//! Interior point backend on the Clarabel conic solver.
//!
//! Clarabel solves `min q'x` subject to `Ax + s = b` with `s` in a product of
//! cones. Equality rows go into a zero cone and every other row, including
//! `x >= 0`, into one non-negative cone, so `>=` rows are negated on the way in.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};

use crate::problem::{ConstraintOp, LpProblem};
use crate::solution::{Solution, SolutionStatus};
use crate::LpSolver;

/// Interior point solver for linear programming problems
#[derive(Debug, Clone)]
pub struct InteriorPointSolver {
    /// Absolute duality-gap tolerance
    abstol: f64,
    /// Relative duality-gap tolerance
    reltol: f64,
    /// Primal and dual residual tolerance
    feastol: f64,
    /// Maximum Newton steps before giving up
    max_iterations: usize,
}

impl Default for InteriorPointSolver {
    fn default() -> Self {
        Self {
            abstol: 1e-7,
            reltol: 1e-6,
            feastol: 1e-7,
            max_iterations: 100,
        }
    }
}

impl InteriorPointSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abstol(mut self, tol: f64) -> Self {
        self.abstol = tol;
        self
    }

    pub fn with_reltol(mut self, tol: f64) -> Self {
        self.reltol = tol;
        self
    }

    pub fn with_feastol(mut self, tol: f64) -> Self {
        self.feastol = tol;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            return Solution::error(e.to_string());
        }
        let n = problem.num_variables();
        if n == 0 {
            return Solution::optimal(Vec::new(), 0.0, 0);
        }

        let form = ConicForm::from_problem(problem);
        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .tol_gap_abs(self.abstol)
            .tol_gap_rel(self.reltol)
            .tol_feas(self.feastol)
            .max_iter(u32::try_from(self.max_iterations).unwrap_or(u32::MAX))
            .build();
        let settings = match settings {
            Ok(settings) => settings,
            Err(e) => return Solution::error(format!("invalid solver settings: {e:?}")),
        };

        // Linear objective: the quadratic term is empty
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let solver = DefaultSolver::new(&p, &form.q, &form.a, &form.b, &form.cones, settings);
        let mut solver = match solver {
            Ok(solver) => solver,
            Err(e) => return Solution::error(format!("solver setup failed: {e:?}")),
        };
        solver.solve();

        let result = solver.solution;
        let iterations = result.iterations as usize;
        let values: Vec<f64> = result.x.iter().take(n).copied().collect();
        let objective_value = problem.evaluate(&values);
        let status = map_status(result.status);
        tracing::debug!(
            clarabel_status = ?result.status,
            %status,
            iterations,
            objective_value,
            "clarabel finished"
        );

        if status.is_optimal() {
            Solution::optimal(values, objective_value, iterations)
        } else {
            Solution::stopped(status, values, objective_value, iterations, status.as_str())
        }
    }
}

impl LpSolver for InteriorPointSolver {
    fn name(&self) -> &'static str {
        "interior-point"
    }

    fn solve(&self, problem: &LpProblem) -> Solution {
        InteriorPointSolver::solve(self, problem)
    }
}

/// Reduced-accuracy outcomes count as their full-accuracy counterpart;
/// optimal points are still checked downstream.
fn map_status(status: SolverStatus) -> SolutionStatus {
    match status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => SolutionStatus::Optimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            SolutionStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            SolutionStatus::Unbounded
        }
        SolverStatus::MaxIterations | SolverStatus::MaxTime => SolutionStatus::IterationLimit,
        _ => SolutionStatus::Error,
    }
}

/// Clarabel's `(q, A, b, cones)` for an [`LpProblem`].
struct ConicForm {
    q: Vec<f64>,
    a: CscMatrix<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConicForm {
    fn from_problem(problem: &LpProblem) -> Self {
        let n = problem.num_variables();
        let rows = problem.expanded_constraints();

        let mut equalities = Vec::new();
        let mut inequalities = Vec::new();
        for row in &rows {
            match row.op {
                ConstraintOp::Eq => equalities.push((row.coefficients.clone(), row.rhs)),
                ConstraintOp::Le => inequalities.push((row.coefficients.clone(), row.rhs)),
                ConstraintOp::Ge => {
                    let negated = row.coefficients.iter().map(|a| -a).collect();
                    inequalities.push((negated, -row.rhs));
                }
            }
        }
        // x >= 0 as -x <= 0
        for j in 0..n {
            let mut coeffs = vec![0.0; n];
            coeffs[j] = -1.0;
            inequalities.push((coeffs, 0.0));
        }

        let mut cones = Vec::new();
        if !equalities.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(equalities.len()));
        }
        cones.push(SupportedConeT::NonnegativeConeT(inequalities.len()));

        let (dense, b): (Vec<Vec<f64>>, Vec<f64>) =
            equalities.into_iter().chain(inequalities).unzip();

        let sign = if problem.objective.minimize { 1.0 } else { -1.0 };
        let q = problem.objective.coefficients.iter().map(|c| sign * c).collect();

        Self {
            q,
            a: column_major(&dense, n),
            b,
            cones,
        }
    }
}

/// Dense rows to compressed sparse column storage.
fn column_major(rows: &[Vec<f64>], n: usize) -> CscMatrix<f64> {
    let mut colptr = Vec::with_capacity(n + 1);
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();
    for j in 0..n {
        colptr.push(nzval.len());
        for (i, row) in rows.iter().enumerate() {
            let a = row.get(j).copied().unwrap_or(0.0);
            if a != 0.0 {
                rowval.push(i);
                nzval.push(a);
            }
        }
    }
    colptr.push(nzval.len());
    CscMatrix::new(rows.len(), n, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Bound;

    #[test]
    fn test_simple_maximization() {
        // Maximize 3x + 2y, x + y <= 4, x <= 3, y <= 3 -> x=3, y=1
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = InteriorPointSolver::new()
            .with_abstol(1e-9)
            .with_reltol(1e-9)
            .solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {}", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {}", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_equality_and_bounds() {
        // Maximize x + 2y subject to x + y = 5, y <= 3 -> x=2, y=3
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 2.0], false);
        problem.add_constraint("balance", vec![1.0, 1.0], ConstraintOp::Eq, 5.0);
        problem.set_bounds(vec![Bound::NON_NEGATIVE, Bound::new(0.0, 3.0)]);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_infeasible_is_reported() {
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.message, "primal infeasible");
    }

    #[test]
    fn test_unbounded_is_reported() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 0.0], false);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = InteriorPointSolver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_column_major_layout() {
        let a = column_major(&[vec![1.0, 0.0], vec![2.0, 3.0]], 2);
        assert_eq!(a.colptr, vec![0, 2, 3]);
        assert_eq!(a.rowval, vec![0, 1, 1]);
        assert_eq!(a.nzval, vec![1.0, 2.0, 3.0]);
    }
}
