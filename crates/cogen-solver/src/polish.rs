//! Clean-up of optimal points returned by either solver.
//!
//! Solver output carries round-off: a variable sitting on its upper limit may
//! come back as `400.00000000000006` and equality rows may be off by a few
//! ulps of the right-hand side. Polishing snaps near-bound values onto the
//! bound they touch and then removes the remaining equality residual with a
//! minimum-norm correction over the variables that were not snapped.

use nalgebra::{DMatrix, DVector};

use crate::problem::{ConstraintOp, LpProblem};

const PASSES: usize = 3;

/// Box implied by the variable bounds and every single-variable row.
fn implied_box(problem: &LpProblem) -> (Vec<f64>, Vec<f64>) {
    let n = problem.num_variables();
    let mut lower: Vec<f64> = problem.bounds.iter().map(|b| b.lower.max(0.0)).collect();
    let mut upper: Vec<f64> = problem.bounds.iter().map(|b| b.upper).collect();
    lower.resize(n, 0.0);
    upper.resize(n, f64::INFINITY);

    for row in &problem.constraints {
        let mut nonzero = row.coefficients.iter().enumerate().filter(|(_, a)| **a != 0.0);
        let (Some((j, &a)), None) = (nonzero.next(), nonzero.next()) else {
            continue;
        };
        if j >= n {
            continue;
        }
        let limit = row.rhs / a;
        match (row.op, a > 0.0) {
            (ConstraintOp::Le, true) | (ConstraintOp::Ge, false) => upper[j] = upper[j].min(limit),
            (ConstraintOp::Le, false) | (ConstraintOp::Ge, true) => lower[j] = lower[j].max(limit),
            (ConstraintOp::Eq, _) => {
                lower[j] = limit;
                upper[j] = limit;
            }
        }
    }

    (lower, upper)
}

/// Returns a copy of `values` snapped to bounds and corrected onto the
/// equality rows. `tolerance` is relative to `1 + |bound|`.
pub fn polish(problem: &LpProblem, values: &[f64], tolerance: f64) -> Vec<f64> {
    let n = problem.num_variables();
    let mut x = values.to_vec();
    x.resize(n, 0.0);

    let (lower, upper) = implied_box(problem);
    let equalities: Vec<_> = problem
        .constraints
        .iter()
        .filter(|c| c.op == ConstraintOp::Eq)
        .collect();

    for pass in 0..PASSES {
        let mut pinned = vec![false; n];
        for j in 0..n {
            if upper[j].is_finite() && x[j] > upper[j] - tolerance * (1.0 + upper[j].abs()) {
                x[j] = upper[j];
                pinned[j] = true;
            } else if x[j] < lower[j] + tolerance * (1.0 + lower[j].abs()) {
                x[j] = lower[j];
                pinned[j] = true;
            }
        }

        let free: Vec<usize> = (0..n).filter(|&j| !pinned[j]).collect();
        if equalities.is_empty() || free.is_empty() {
            break;
        }

        let residual = DVector::from_iterator(
            equalities.len(),
            equalities.iter().map(|c| {
                let lhs: f64 = c.coefficients.iter().zip(&x).map(|(a, v)| a * v).sum();
                c.rhs - lhs
            }),
        );
        if residual.amax() == 0.0 {
            break;
        }

        let a_free = DMatrix::from_fn(equalities.len(), free.len(), |i, k| {
            equalities[i].coefficients.get(free[k]).copied().unwrap_or(0.0)
        });
        let Ok(step) = a_free.svd(true, true).solve(&residual, 1e-12) else {
            break;
        };
        for (k, &j) in free.iter().enumerate() {
            x[j] += step[k];
        }

        let inside = (0..n).all(|j| x[j] >= lower[j] && x[j] <= upper[j]);
        tracing::trace!(pass, inside, residual = residual.amax(), "polish pass");
        if inside {
            break;
        }
    }

    x
}
