//! The steam header model and the owned result of one solve.

use cogen_solver::{ConstraintViolation, SolutionStatus};

use crate::adapter::{solve_form, Backend, SolverOptions};
use crate::builder::{CanonicalForm, ModelBuilder};
use crate::report::SolutionTable;
use crate::tables::{ConfigError, ConstraintTable, Demand, PlantConfig};
use crate::validate::{check_feasible, FeasibilityReport, ResidualCheck};

/// Column of the PB→HP letdown valve.
pub const PRV1: usize = 1;
/// Column of the TG1 HP section.
pub const TG1A: usize = 2;
/// Column of the IP→LP letdown valve.
pub const PRV3: usize = 7;
/// Column of TG3.
pub const TG3: usize = 8;

#[derive(Debug, Clone)]
pub struct SteamSystem {
    config: PlantConfig,
    residual_check: ResidualCheck,
}

impl SteamSystem {
    pub fn new(config: PlantConfig) -> Self {
        Self {
            config,
            residual_check: ResidualCheck::default(),
        }
    }

    /// Residual policy baked into every [`SolveResult`] this system returns.
    pub fn with_residual_check(mut self, policy: ResidualCheck) -> Self {
        self.residual_check = policy;
        self
    }

    pub fn config(&self) -> &PlantConfig {
        &self.config
    }

    pub fn builder(&self) -> ModelBuilder<'_> {
        ModelBuilder::new(&self.config)
    }

    pub fn solve(&self, demand: &Demand, backend: Backend) -> SolveResult {
        self.solve_with(demand, backend, &SolverOptions::default())
    }

    pub fn solve_with(
        &self,
        demand: &Demand,
        backend: Backend,
        options: &SolverOptions,
    ) -> SolveResult {
        let form = self.builder().build(demand);
        self.solve_form(*demand, form, backend, options)
    }

    /// Solves an already-built form, so several backends can share one build.
    pub fn solve_form(
        &self,
        demand: Demand,
        form: CanonicalForm,
        backend: Backend,
        options: &SolverOptions,
    ) -> SolveResult {
        let output = solve_form(
            &form,
            self.config.variable_names(),
            self.config.mass_balance.equations(),
            backend,
            options,
        );
        let constraints = &self.config.constraints;
        let table = label(constraints, &form, &output.values, demand, self.residual_check);
        tracing::info!(
            %backend,
            status = %output.status,
            total_output = table.total_output,
            feasible = table.success,
            "scenario solved"
        );
        SolveResult {
            demand,
            form,
            backend,
            status: output.status,
            message: output.message,
            iterations: output.iterations,
            violations: output.violations,
            policy: self.residual_check,
            constraints: self.config.constraints.clone(),
            equations: self.config.mass_balance.equations().to_vec(),
            decision: output.values,
            table,
        }
    }
}

/// Everything produced by one solve. Owns its copy of the decision vector,
/// which may be overwritten for what-if exploration.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub demand: Demand,
    pub form: CanonicalForm,
    pub backend: Backend,
    pub status: SolutionStatus,
    pub message: String,
    pub iterations: usize,
    pub violations: Vec<ConstraintViolation>,
    policy: ResidualCheck,
    constraints: ConstraintTable,
    equations: Vec<String>,
    decision: Vec<f64>,
    table: SolutionTable,
}

fn label(
    constraints: &ConstraintTable,
    form: &CanonicalForm,
    decision: &[f64],
    demand: Demand,
    policy: ResidualCheck,
) -> SolutionTable {
    SolutionTable::new(
        constraints,
        decision,
        demand,
        form.objective_value(decision),
        check_feasible(form, decision, policy),
    )
}

/// Moves `delta` onto column `variable` (negative to take flow away).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shift {
    pub variable: usize,
    pub delta: f64,
}

/// Sends `amount` through the PB→HP letdown instead of TG1's HP section and
/// through the IP→LP letdown instead of TG3. Every header stays balanced.
pub fn default_detour(amount: f64) -> [Shift; 4] {
    [
        Shift { variable: TG1A, delta: -amount },
        Shift { variable: PRV1, delta: amount },
        Shift { variable: TG3, delta: -amount },
        Shift { variable: PRV3, delta: amount },
    ]
}

/// Yearly revenue lost running at `actual_mw` instead of `optimal_mw`.
pub fn lost_revenue(optimal_mw: f64, actual_mw: f64, price_per_mwh: f64, days: f64) -> f64 {
    (optimal_mw - actual_mw) * 24.0 * days * price_per_mwh
}

impl SolveResult {
    pub fn check_feasible(&self) -> bool {
        self.check_feasible_with(self.policy)
    }

    pub fn check_feasible_with(&self, policy: ResidualCheck) -> bool {
        check_feasible(&self.form, &self.decision, policy)
    }

    pub fn feasibility_report(&self) -> FeasibilityReport {
        FeasibilityReport::new(&self.form, &self.decision, &self.equations, self.policy)
    }

    pub fn residual_check(&self) -> ResidualCheck {
        self.policy
    }

    pub fn decision(&self) -> &[f64] {
        &self.decision
    }

    /// `c·x` in MW.
    pub fn total_output(&self) -> f64 {
        self.form.objective_value(&self.decision)
    }

    /// Labelled table for the current decision vector.
    pub fn report(&self) -> &SolutionTable {
        &self.table
    }

    /// Replaces the decision vector and rebuilds the labelled table.
    pub fn set_decision(&mut self, values: Vec<f64>) -> Result<(), ConfigError> {
        if values.len() != self.form.num_variables() {
            return Err(ConfigError::DimensionMismatch {
                expected: self.form.num_variables(),
                found: values.len(),
            });
        }
        self.table = label(&self.constraints, &self.form, &values, self.demand, self.policy);
        self.decision = values;
        Ok(())
    }

    pub fn apply_shifts(&mut self, shifts: &[Shift]) -> Result<(), ConfigError> {
        let n = self.form.num_variables();
        if let Some(bad) = shifts.iter().find(|s| s.variable >= n) {
            return Err(ConfigError::DimensionMismatch {
                expected: n,
                found: bad.variable + 1,
            });
        }
        let mut values = self.decision.clone();
        for shift in shifts {
            values[shift.variable] += shift.delta;
        }
        self.set_decision(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Method;

    const SIMPLEX: Backend = Backend::General(Method::Simplex);

    fn system() -> SteamSystem {
        SteamSystem::new(PlantConfig::reference())
    }

    fn demand(values: [f64; 4]) -> Demand {
        Demand::new(values).unwrap()
    }

    #[test]
    fn test_end_to_end_backends_agree() {
        let system = system();
        let d = demand([1100.0, 20.0, 550.0, 400.0]);
        let form = system.builder().build(&d);

        let options = SolverOptions::default();
        let simplex = system.solve_form(d, form.clone(), SIMPLEX, &options);
        let precise = system.solve_form(d, form, Backend::Precise, &options);

        assert!(simplex.status.is_optimal(), "{}", simplex.message);
        assert!(precise.status.is_optimal(), "{}", precise.message);
        assert!(simplex.check_feasible());
        assert!(precise.check_feasible());

        let a = simplex.total_output();
        let b = precise.total_output();
        assert!((a - b).abs() <= 1e-6 * a.abs(), "simplex {a} vs precise {b}");
        assert!(simplex.report().success);
    }

    #[test]
    fn test_precise_fallback_is_zero_and_checked() {
        let result = system().solve(&demand([2000.0, 20.0, 550.0, 400.0]), Backend::Precise);
        assert!(!result.status.is_optimal());
        assert_eq!(result.decision(), &[0.0; 10]);
        assert_eq!(result.total_output(), 0.0);
        // Zero violates the supply row and every positive Min
        assert!(!result.check_feasible());
        assert!(!result.report().success);
        assert_eq!(result.report().rows.len(), 10);
    }

    #[test]
    fn test_detour_keeps_balance_and_lowers_output() {
        let system = system();
        let mut result = system.solve(&demand([1100.0, 20.0, 550.0, 400.0]), SIMPLEX);
        let before = result.total_output();
        let before_x = result.decision().to_vec();

        result.apply_shifts(&default_detour(20.0)).unwrap();
        let after = result.total_output();
        let expected_drop = 20.0 * (result.form.c[TG1A] + result.form.c[TG3]);
        assert!((before - after - expected_drop).abs() < 1e-9);
        assert!((result.decision()[PRV1] - before_x[PRV1] - 20.0).abs() < 1e-12);

        let residuals: Vec<f64> = result
            .form
            .a_eq
            .iter()
            .zip(&result.form.b_eq)
            .map(|(row, b)| row.iter().zip(result.decision()).map(|(a, x)| a * x).sum::<f64>() - b)
            .collect();
        assert!(residuals.iter().all(|r| r.abs() < 1e-8), "{residuals:?}");
    }

    #[test]
    fn test_set_decision_rebuilds_table() {
        let mut result = system().solve(&demand([1100.0, 20.0, 550.0, 400.0]), SIMPLEX);
        let x = vec![1100.0, 200.0, 300.0, 220.0, 260.0, 600.0, 0.0, 230.0, 300.0, 130.0];
        result.set_decision(x.clone()).unwrap();

        let table = result.report();
        assert_eq!(table.get("F_TG2"), Some(600.0));
        assert!(table.success);
        assert!((table.total_output - result.form.objective_value(&x)).abs() < 1e-12);

        assert!(matches!(
            result.set_decision(vec![0.0; 3]),
            Err(ConfigError::DimensionMismatch { expected: 10, found: 3 })
        ));
        assert!(result.apply_shifts(&[Shift { variable: 10, delta: 1.0 }]).is_err());
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let backend = Backend::General(Method::InteriorPoint);
        let result = system().solve(&demand([900.0, 10.0, 400.0, 400.0]), backend);
        let first = result.check_feasible();
        let second = result.check_feasible();
        assert_eq!(first, second);
        let reported: Vec<f64> = result.report().rows.iter().map(|r| r.value).collect();
        assert_eq!(result.decision(), reported);
    }

    #[test]
    fn test_strict_residual_policy_is_carried() {
        let system = system().with_residual_check(ResidualCheck::PerRow);
        let result = system.solve(&demand([1100.0, 20.0, 550.0, 400.0]), SIMPLEX);
        assert_eq!(result.residual_check(), ResidualCheck::PerRow);
        assert!(result.check_feasible());
    }

    #[test]
    fn test_lost_revenue() {
        let lost = lost_revenue(40.0, 39.0, 50.0, 350.0);
        assert!((lost - 420_000.0).abs() < 1e-9);
    }
}
