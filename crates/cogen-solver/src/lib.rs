mod conic;
mod polish;
mod problem;
mod simplex;
mod solution;

pub use conic::InteriorPointSolver;
pub use polish::polish;
pub use problem::{Bound, Constraint, ConstraintOp, LpProblem, Objective, ProblemError};
pub use simplex::Solver;
pub use solution::{ConstraintViolation, Solution, SolutionStatus};

/// A solver backend that can be swapped behind one call site.
pub trait LpSolver {
    /// Short method name used in logs and reports
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &LpProblem) -> Solution;
}
