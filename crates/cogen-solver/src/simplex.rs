use crate::problem::{Constraint, ConstraintOp, LpProblem};
use crate::solution::{ConstraintViolation, Solution, SolutionStatus};
use crate::LpSolver;

/// Simplex solver for linear programming problems
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum iterations before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        if let Err(e) = problem.validate() {
            return Solution::error(e.to_string());
        }
        let rows = problem.expanded_constraints();
        let mut tableau = self.build_tableau(problem.num_variables(), &rows, problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.has_artificial && !self.phase1(&mut tableau) {
            tracing::debug!(pivots = tableau.pivots, "phase 1 could not remove artificials");
            return self.infeasible_at_phase1_point(problem, &rows, &tableau);
        }

        // Phase 2: Optimize
        match self.phase2(&mut tableau) {
            SimplexResult::Optimal => {}
            SimplexResult::Unbounded => return Solution::unbounded(),
            SimplexResult::IterationLimit => {
                let values = self.extract_values(&tableau);
                let objective_value = problem.evaluate(&values);
                return Solution::stopped(
                    SolutionStatus::IterationLimit,
                    values,
                    objective_value,
                    tableau.pivots,
                    "Iteration limit reached.",
                );
            }
        }

        let values = self.extract_values(&tableau);
        let objective_value = problem.evaluate(&values);
        tracing::debug!(pivots = tableau.pivots, objective_value, "simplex optimal");
        Solution::optimal(values, objective_value, tableau.pivots)
    }

    /// The phase 1 optimum minimises the total artificial value, so the rows it
    /// still breaks are the ones no point can satisfy together with the rest.
    fn infeasible_at_phase1_point(
        &self,
        problem: &LpProblem,
        rows: &[Constraint],
        tableau: &Tableau,
    ) -> Solution {
        let values = self.extract_values(tableau);
        let objective_value = problem.evaluate(&values);
        let violations = self.find_violations(rows, &values);
        let mut solution = Solution::infeasible_at(values, objective_value, violations);
        solution.iterations = tableau.pivots;
        solution
    }

    /// Find which constraints are violated by a given solution
    fn find_violations(&self, rows: &[Constraint], values: &[f64]) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in rows {
            let lhs: f64 = c.coefficients.iter().zip(values).map(|(a, x)| a * x).sum();

            let (is_violated, violation_amount, description) = match c.op {
                ConstraintOp::Le => {
                    if lhs > c.rhs + self.tolerance {
                        let amt = lhs - c.rhs;
                        let text = format!(
                            "{} exceeds its limit of {:.2} by {:.2}",
                            c.name, c.rhs, amt
                        );
                        (true, amt, text)
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                ConstraintOp::Ge => {
                    if lhs < c.rhs - self.tolerance {
                        let amt = c.rhs - lhs;
                        let text = format!(
                            "{} is below its limit of {:.2} by {:.2}",
                            c.name, c.rhs, amt
                        );
                        (true, amt, text)
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                ConstraintOp::Eq => {
                    let diff = (lhs - c.rhs).abs();
                    if diff > self.tolerance {
                        let text = format!(
                            "{} requires exactly {:.2} but got {:.2}",
                            c.name, c.rhs, lhs
                        );
                        (true, diff, text)
                    } else {
                        (false, 0.0, String::new())
                    }
                }
            };

            if is_violated {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Worst first
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));

        violations
    }

    fn build_tableau(&self, n_vars: usize, rows: &[Constraint], problem: &LpProblem) -> Tableau {
        let n_constraints = rows.len();

        // Count slack and artificial variables needed
        let mut n_slack = 0;
        let mut n_artificial = 0;

        // A row whose RHS is negative is negated first, which turns <= into >=
        for c in rows {
            match (c.op, c.rhs < 0.0) {
                (ConstraintOp::Le, false) | (ConstraintOp::Ge, true) => n_slack += 1,
                (ConstraintOp::Le, true) | (ConstraintOp::Ge, false) => {
                    n_slack += 1; // surplus
                    n_artificial += 1;
                }
                (ConstraintOp::Eq, _) => n_artificial += 1,
            }
        }

        let total_cols = n_vars + n_slack + n_artificial + 1; // +1 for RHS
        let total_rows = n_constraints + 1; // +1 for objective

        let mut tableau = Tableau {
            data: vec![vec![0.0; total_cols]; total_rows],
            basic_vars: vec![0; n_constraints],
            n_vars,
            n_slack,
            n_artificial,
            has_artificial: n_artificial > 0,
            pivots: 0,
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = n_vars + n_slack;

        for (i, c) in rows.iter().enumerate() {
            for (j, &coef) in c.coefficients.iter().enumerate().take(n_vars) {
                tableau.data[i][j] = coef;
            }

            // RHS must be non-negative
            let flip = c.rhs < 0.0;
            if flip {
                for j in 0..n_vars {
                    tableau.data[i][j] = -tableau.data[i][j];
                }
            }
            tableau.data[i][total_cols - 1] = c.rhs.abs();

            match (c.op, flip) {
                (ConstraintOp::Le, false) => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                (ConstraintOp::Le, true) => {
                    tableau.data[i][slack_idx] = -1.0;
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                (ConstraintOp::Ge, false) => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
                (ConstraintOp::Ge, true) => {
                    tableau.data[i][slack_idx] = 1.0;
                    tableau.basic_vars[i] = slack_idx;
                    slack_idx += 1;
                }
                (ConstraintOp::Eq, _) => {
                    tableau.data[i][artificial_idx] = 1.0;
                    tableau.basic_vars[i] = artificial_idx;
                    artificial_idx += 1;
                }
            }
        }

        // Objective row (last row). Simplex maximizes, so minimization
        // coefficients are negated.
        let obj_row = n_constraints;
        for (j, &coef) in problem.objective.coefficients.iter().enumerate().take(n_vars) {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    fn phase1(&self, tableau: &mut Tableau) -> bool {
        // Auxiliary objective: maximize -sum(artificials)
        let n_constraints = tableau.data.len() - 1;
        let n_cols = tableau.data[0].len();
        let art_start = tableau.n_vars + tableau.n_slack;
        let rhs_col = n_cols - 1;

        let orig_obj = tableau.data[n_constraints].clone();

        for j in 0..n_cols {
            tableau.data[n_constraints][j] = 0.0;
        }
        for j in art_start..(art_start + tableau.n_artificial) {
            tableau.data[n_constraints][j] = -1.0;
        }

        // Price out the basic artificials
        for i in 0..n_constraints {
            if tableau.basic_vars[i] >= art_start {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] += tableau.data[i][j];
                }
            }
        }

        for _ in 0..self.max_iterations {
            let Some(pivot_col) = self.find_pivot_column(tableau) else {
                break;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                // Phase 1 is bounded below by zero; treat this as numerical trouble
                return false;
            };
            self.pivot(tableau, pivot_row, pivot_col);
        }

        let scale = 1.0
            + (0..n_constraints)
                .map(|i| tableau.data[i][rhs_col].abs())
                .fold(0.0, f64::max);
        for i in 0..n_constraints {
            let residual = tableau.data[i][rhs_col].abs();
            if tableau.basic_vars[i] >= art_start && residual > self.tolerance * scale {
                return false;
            }
        }

        self.drive_out_artificials(tableau);

        // Restore the phase 2 objective and price out the basis
        tableau.data[n_constraints] = orig_obj;
        for i in 0..n_constraints {
            let basic = tableau.basic_vars[i];
            let ratio = tableau.data[n_constraints][basic];
            if ratio.abs() > self.tolerance {
                for j in 0..n_cols {
                    tableau.data[n_constraints][j] -= ratio * tableau.data[i][j];
                }
            }
        }

        true
    }

    /// Pivot zero-level artificials out of the basis so phase 2 pivots
    /// cannot push them positive. Rows with no structural entry are
    /// redundant and keep their artificial at zero.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let n_constraints = tableau.data.len() - 1;
        let art_start = tableau.n_vars + tableau.n_slack;

        for i in 0..n_constraints {
            if tableau.basic_vars[i] < art_start {
                continue;
            }
            let entering = (0..art_start)
                .filter(|&j| tableau.data[i][j].abs() > self.tolerance)
                .max_by(|&a, &b| tableau.data[i][a].abs().total_cmp(&tableau.data[i][b].abs()));
            if let Some(col) = entering {
                self.pivot(tableau, i, col);
            }
        }
    }

    fn phase2(&self, tableau: &mut Tableau) -> SimplexResult {
        // Artificial columns never re-enter
        let exclude_from = tableau.n_vars + tableau.n_slack;

        for _ in 0..self.max_iterations {
            let Some(pivot_col) = self.find_pivot_column_excluding(tableau, exclude_from) else {
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };
            self.pivot(tableau, pivot_row, pivot_col);
        }
        SimplexResult::IterationLimit
    }

    fn find_pivot_column(&self, tableau: &Tableau) -> Option<usize> {
        self.find_pivot_column_excluding(tableau, tableau.data[0].len() - 1)
    }

    fn find_pivot_column_excluding(&self, tableau: &Tableau, exclude_from: usize) -> Option<usize> {
        let obj_row = tableau.data.len() - 1;

        // Most positive reduced cost
        let mut max_val = self.tolerance;
        let mut max_col = None;

        for j in 0..exclude_from {
            if tableau.data[obj_row][j] > max_val {
                max_val = tableau.data[obj_row][j];
                max_col = Some(j);
            }
        }

        max_col
    }

    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let n_constraints = tableau.data.len() - 1;
        let rhs_col = tableau.data[0].len() - 1;

        let mut min_ratio = f64::INFINITY;
        let mut min_row = None;

        for i in 0..n_constraints {
            let val = tableau.data[i][col];
            if val > self.tolerance {
                let ratio = tableau.data[i][rhs_col].max(0.0) / val;
                if ratio < min_ratio {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    fn pivot(&self, tableau: &mut Tableau, row: usize, col: usize) {
        let n_rows = tableau.data.len();
        let n_cols = tableau.data[0].len();

        tableau.basic_vars[row] = col;
        tableau.pivots += 1;

        let pivot_val = tableau.data[row][col];
        for j in 0..n_cols {
            tableau.data[row][j] /= pivot_val;
        }

        for i in 0..n_rows {
            if i != row {
                let factor = tableau.data[i][col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n_cols {
                    tableau.data[i][j] -= factor * tableau.data[row][j];
                }
            }
        }
    }

    fn extract_values(&self, tableau: &Tableau) -> Vec<f64> {
        let rhs_col = tableau.data[0].len() - 1;
        let mut values = vec![0.0; tableau.n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < tableau.n_vars {
                values[basic] = tableau.data[i][rhs_col];
            }
        }
        values
    }
}

impl LpSolver for Solver {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn solve(&self, problem: &LpProblem) -> Solution {
        Solver::solve(self, problem)
    }
}

struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    n_slack: usize,
    n_artificial: usize,
    has_artificial: bool,
    pivots: usize,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Bound, LpProblem};

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solver = Solver::new();
        let solution = solver.solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        let obj = solution.objective_value;
        assert!((obj - 11.0).abs() < 1e-6, "obj = {} (expected 11)", obj);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert!((solution.objective_value - 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_rhs_le_row() {
        // Minimize x subject to -x <= -2 (i.e. x >= 2)
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("x_min", vec![-1.0], ConstraintOp::Le, -2.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_equality_with_bounds() {
        // Maximize x + 2y subject to x + y = 5, y in [0, 3]
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 2.0], false);
        problem.add_constraint("balance", vec![1.0, 1.0], ConstraintOp::Eq, 5.0);
        problem.set_bounds(vec![Bound::NON_NEGATIVE, Bound::new(0.0, 3.0)]);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-9);
        assert!((solution.values[1] - 3.0).abs() < 1e-9);
        assert!((solution.objective_value - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_redundant_equalities() {
        // The second row is twice the first; phase 1 must leave it harmless
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("a", vec![1.0, 1.0], ConstraintOp::Eq, 2.0);
        problem.add_constraint("b", vec![2.0, 2.0], ConstraintOp::Eq, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] + solution.values[1] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vec!["x".to_string()]);
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solver = Solver::new();
        let solution = solver.solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!(!solution.message.is_empty());
        // Phase 1 stops at x = 3, two short of the lower row
        assert_eq!(solution.values.len(), 1);
        assert!((solution.values[0] - 3.0).abs() < 1e-9);
        assert_eq!(solution.violations.len(), 1);
        assert_eq!(solution.violations[0].constraint, "lower");
        assert!((solution.violations[0].violation_amount - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_equality_names_the_row() {
        // x + y = 10 cannot be met with x <= 3 and y <= 4 written as <= rows
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("balance", vec![1.0, 1.0], ConstraintOp::Eq, 10.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 4.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.values.len(), 2);
        let names: Vec<&str> = solution.violations.iter().map(|v| v.constraint.as_str()).collect();
        assert_eq!(names, ["balance"]);
        assert!((solution.violations[0].violation_amount - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new(vec!["x".to_string(), "y".to_string()]);
        problem.set_objective(vec![1.0, 0.0], false);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }
}
