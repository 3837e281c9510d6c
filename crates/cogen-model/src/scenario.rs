//! Independent solves over many demand vectors.

use rayon::prelude::*;

use crate::adapter::{Backend, SolverOptions};
use crate::system::{SolveResult, SteamSystem};
use crate::tables::Demand;

/// The five operating points the plant is routinely checked against.
pub const REFERENCE_SCENARIOS: [[f64; 4]; 5] = [
    [1100.0, 20.0, 550.0, 400.0],
    [900.0, 10.0, 400.0, 400.0],
    [1415.0, 15.0, 250.0, 900.0],
    [1000.0, 15.0, 250.0, 250.0],
    [800.0, 100.0, 350.0, 300.0],
];

pub fn reference_scenarios() -> Vec<Demand> {
    REFERENCE_SCENARIOS
        .iter()
        .filter_map(|values| Demand::new(*values).ok())
        .collect()
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub index: usize,
    pub result: SolveResult,
    pub feasible: bool,
}

/// Solves every demand in parallel; results keep input order.
pub fn run_scenarios(
    system: &SteamSystem,
    demands: &[Demand],
    backend: Backend,
    options: &SolverOptions,
) -> Vec<ScenarioOutcome> {
    demands
        .par_iter()
        .enumerate()
        .map(|(index, demand)| {
            let result = system.solve_with(demand, backend, options);
            let feasible = result.check_feasible();
            if !feasible {
                tracing::warn!(index, status = %result.status, "scenario failed feasibility check");
            }
            ScenarioOutcome { index, result, feasible }
        })
        .collect()
}
