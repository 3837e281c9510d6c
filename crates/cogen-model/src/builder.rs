//! Canonical LP construction for the steam header network.

use cogen_solver::{Bound, ConstraintOp, LpProblem};

use crate::tables::{Demand, PlantConfig, N_VARIABLES};

/// kBTU/hr to MW.
pub const KBTU_HR_TO_MW: f64 = 0.000293071;

/// Everything an LP backend needs: maximize `c·x` subject to
/// `a_eq·x = b_eq`, `a_ineq·x <= b_ineq` and `bounds`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalForm {
    pub c: Vec<f64>,
    pub a_eq: Vec<Vec<f64>>,
    pub b_eq: Vec<f64>,
    pub a_ineq: Vec<Vec<f64>>,
    pub b_ineq: Vec<f64>,
    pub bounds: Vec<Bound>,
    /// Label per inequality row, e.g. `F_TG1A_min`
    pub ineq_labels: Vec<String>,
}

impl CanonicalForm {
    pub fn num_variables(&self) -> usize {
        self.c.len()
    }

    /// Solver problem in the minimize-`-c` sense.
    pub fn to_lp_problem(&self, names: &[String], equations: &[String]) -> LpProblem {
        let mut problem = LpProblem::new(names.to_vec());
        problem.set_objective(self.c.iter().map(|v| -v).collect(), true);
        for (i, (row, rhs)) in self.a_eq.iter().zip(&self.b_eq).enumerate() {
            let name = equations.get(i).cloned().unwrap_or_else(|| format!("eq{i}"));
            problem.add_constraint(name, row.clone(), ConstraintOp::Eq, *rhs);
        }
        for (i, (row, rhs)) in self.a_ineq.iter().zip(&self.b_ineq).enumerate() {
            let name = self.ineq_labels.get(i).cloned().unwrap_or_else(|| format!("ineq{i}"));
            problem.add_constraint(name, row.clone(), ConstraintOp::Le, *rhs);
        }
        problem.set_bounds(self.bounds.clone());
        problem
    }

    /// `c·x`, electrical output in MW.
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.c.iter().zip(x).map(|(c, x)| c * x).sum()
    }
}

pub struct ModelBuilder<'a> {
    config: &'a PlantConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(config: &'a PlantConfig) -> Self {
        Self { config }
    }

    /// `A_eq` is the LHS table; `b_eq = RHS · demand`.
    pub fn equality_constraints(&self, demand: &Demand) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mass = &self.config.mass_balance;
        let a_eq = mass.lhs().to_vec();
        let b_eq = mass
            .rhs()
            .iter()
            .map(|row| row.iter().zip(demand.values()).map(|(r, d)| r * d).sum())
            .collect();
        (a_eq, b_eq)
    }

    /// One `-x_i <= -Min` row per defined Min and one `x_i <= Max` row per
    /// defined Max, in column order with Min first.
    pub fn inequality_constraints(&self) -> (Vec<Vec<f64>>, Vec<f64>, Vec<Bound>) {
        let (a_ineq, b_ineq, _) = self.inequality_rows();
        (a_ineq, b_ineq, vec![Bound::NON_NEGATIVE; self.n()])
    }

    fn inequality_rows(&self) -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let table = &self.config.constraints;
        let n = self.n();
        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut labels = Vec::new();

        for (i, name) in table.names().iter().enumerate() {
            if let Some(min) = table.min(i) {
                let mut row = vec![0.0; n];
                row[i] = -1.0;
                a.push(row);
                b.push(-min);
                labels.push(format!("{name}_min"));
            }
            if let Some(max) = table.max(i) {
                let mut row = vec![0.0; n];
                row[i] = 1.0;
                a.push(row);
                b.push(max);
                labels.push(format!("{name}_max"));
            }
        }
        (a, b, labels)
    }

    /// Turbine and thermocompressor enthalpy drops scaled to MW.
    pub fn objective(&self) -> Vec<f64> {
        let [h0, h1, h2, h3] = self.config.attributes.enthalpy();
        let drops: [f64; N_VARIABLES] = [
            0.0,
            0.0,
            h0 - h1,
            0.0,
            h1 - h2,
            h0 - h2,
            h2 - h1,
            0.0,
            h2 - h3,
            0.0,
        ];
        drops.iter().map(|d| d * KBTU_HR_TO_MW).collect()
    }

    pub fn build(&self, demand: &Demand) -> CanonicalForm {
        let (a_eq, b_eq) = self.equality_constraints(demand);
        let (a_ineq, b_ineq, ineq_labels) = self.inequality_rows();
        let form = CanonicalForm {
            c: self.objective(),
            a_eq,
            b_eq,
            a_ineq,
            b_ineq,
            bounds: vec![Bound::NON_NEGATIVE; self.n()],
            ineq_labels,
        };
        tracing::debug!(
            equalities = form.a_eq.len(),
            inequalities = form.a_ineq.len(),
            variables = form.num_variables(),
            "built canonical form"
        );
        form
    }

    fn n(&self) -> usize {
        self.config.variable_names().len()
    }
}
