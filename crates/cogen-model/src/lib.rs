pub mod adapter;
pub mod builder;
pub mod loader;
pub mod report;
pub mod scenario;
pub mod steam;
pub mod system;
pub mod tables;
pub mod validate;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use adapter::{
    solve_form, AdapterOutput, Backend, Method, ParseBackendError, SolverOptions, PRECISE_TOLERANCE,
};
pub use builder::{CanonicalForm, ModelBuilder, KBTU_HR_TO_MW};
pub use loader::{load_dir, load_files, load_scenarios, LoadError, PlantFiles};
pub use report::{SolutionRow, SolutionTable};
pub use scenario::{reference_scenarios, run_scenarios, ScenarioOutcome, REFERENCE_SCENARIOS};
pub use steam::{HeaderCondition, SteamError, SteamState};
pub use system::{default_detour, lost_revenue, Shift, SolveResult, SteamSystem};
pub use tables::{
    AttributeTable, ConfigError, ConstraintTable, Demand, MassBalance, PlantConfig, DEMAND_LEN,
    N_STAGES, N_VARIABLES,
};
pub use validate::{check_feasible, FeasibilityReport, ResidualCheck, RESIDUAL_TOLERANCE};

pub use cogen_solver::SolutionStatus;
