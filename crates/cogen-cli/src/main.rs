use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cogen_model::steam::{liquid_enthalpy, superheated_state};
use cogen_model::{
    default_detour, load_dir, load_scenarios, lost_revenue, reference_scenarios, run_scenarios,
    Backend, Demand, Method, ModelBuilder, ResidualCheck, SolveResult, SteamSystem,
    REFERENCE_SCENARIOS,
};
use rand::Rng;
use tracing_subscriber::FmtSubscriber;

mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(name = "cogen")]
#[command(about = "Optimal steam allocation for a cogeneration header network", long_about = None)]
struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "warn")]
    log_level: tracing::Level,
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PlantArgs {
    /// Directory holding the plant CSV tables
    #[arg(short, long)]
    data: Option<PathBuf>,
}

#[derive(clap::Args)]
struct DemandArgs {
    /// Boiler supply, HP, IP and LP loads
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = REFERENCE_SCENARIOS[0]
    )]
    demand: Vec<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one demand scenario
    Solve {
        #[command(flatten)]
        plant: PlantArgs,
        #[command(flatten)]
        demand: DemandArgs,
        /// simplex, interior-point or precise
        #[arg(short, long)]
        backend: Option<String>,
        /// Check every equality residual instead of their sum
        #[arg(long)]
        strict_residuals: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Solve one scenario with the simplex and precise interior point backends
    Compare {
        #[command(flatten)]
        plant: PlantArgs,
        #[command(flatten)]
        demand: DemandArgs,
    },
    /// Solve a batch of scenarios in parallel
    Scenarios {
        #[command(flatten)]
        plant: PlantArgs,
        /// CSV with one demand vector per row (defaults to the reference set)
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        backend: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Move flow off the optimum and report the lost revenue
    Perturb {
        #[command(flatten)]
        plant: PlantArgs,
        #[command(flatten)]
        demand: DemandArgs,
        /// Flow to detour, lb/hr (random in [15, 45) when omitted)
        #[arg(short, long)]
        amount: Option<f64>,
        /// Electricity price, $/MWh
        #[arg(long)]
        price: Option<f64>,
        /// Operating days per year
        #[arg(long)]
        days: Option<f64>,
    },
    /// Load and validate the plant tables
    Check {
        #[command(flatten)]
        plant: PlantArgs,
    },
    /// Steam enthalpy at header conditions
    Enthalpy {
        #[arg(long, allow_hyphen_values = true)]
        psig: f64,
        #[arg(long = "deg-f", allow_hyphen_values = true)]
        deg_f: f64,
        /// Compressed liquid instead of superheated steam
        #[arg(long)]
        liquid: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error installing logger: {}", e);
    }

    let settings = match &cli.config {
        Some(path) => match Settings::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let outcome = match cli.command {
        Commands::Solve {
            plant,
            demand,
            backend,
            strict_residuals,
            json,
        } => solve(&settings, &plant, &demand, backend.as_deref(), strict_residuals, json),
        Commands::Compare { plant, demand } => compare(&settings, &plant, &demand),
        Commands::Scenarios {
            plant,
            file,
            backend,
            json,
        } => scenarios(&settings, &plant, file.as_deref(), backend.as_deref(), json),
        Commands::Perturb {
            plant,
            demand,
            amount,
            price,
            days,
        } => perturb(&settings, &plant, &demand, amount, price, days),
        Commands::Check { plant } => check(&settings, &plant),
        Commands::Enthalpy { psig, deg_f, liquid } => enthalpy(psig, deg_f, liquid),
    };

    if let Err(e) = outcome {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn load_system(settings: &Settings, plant: &PlantArgs) -> Result<SteamSystem, String> {
    let dir = plant.data.as_deref().unwrap_or(&settings.data_dir);
    let config = load_dir(dir).map_err(|e| format!("Error loading plant tables: {}", e))?;
    Ok(SteamSystem::new(config))
}

fn parse_demand(args: &DemandArgs) -> Result<Demand, String> {
    Demand::from_slice(&args.demand).map_err(|e| format!("Invalid demand: {}", e))
}

fn parse_backend(settings: &Settings, flag: Option<&str>) -> Result<Backend, String> {
    flag.unwrap_or(&settings.backend).parse().map_err(|e| format!("{}", e))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| format!("Error encoding JSON: {}", e))?;
    println!("{}", text);
    Ok(())
}

fn print_result(title: &str, result: &SolveResult) {
    println!("========== {} ==========", title);
    println!("Solver: {} ({}, {} iterations)", result.backend, result.status, result.iterations);
    println!("Message: {}", result.message);
    for v in &result.violations {
        println!("  {}", v.description);
    }
    println!("{}", result.report());
    println!();
}

fn solve(
    settings: &Settings,
    plant: &PlantArgs,
    demand: &DemandArgs,
    backend: Option<&str>,
    strict_residuals: bool,
    json: bool,
) -> Result<(), String> {
    let policy = if strict_residuals {
        ResidualCheck::PerRow
    } else {
        ResidualCheck::Summed
    };
    let system = load_system(settings, plant)?.with_residual_check(policy);
    let demand = parse_demand(demand)?;
    let backend = parse_backend(settings, backend)?;

    let result = system.solve_with(&demand, backend, &settings.solver);
    if json {
        return print_json(&result);
    }
    print_result("LP Solution", &result);
    if !result.check_feasible() {
        println!("{}", result.feasibility_report());
    }
    Ok(())
}

fn compare(settings: &Settings, plant: &PlantArgs, demand: &DemandArgs) -> Result<(), String> {
    let system = load_system(settings, plant)?;
    let demand = parse_demand(demand)?;
    let form = system.builder().build(&demand);

    let simplex = system.solve_form(
        demand,
        form.clone(),
        Backend::General(Method::Simplex),
        &settings.solver,
    );
    let precise = system.solve_form(demand, form, Backend::Precise, &settings.solver);
    print_result("Simplex LP Solution", &simplex);
    print_result("Interior Point LP Solution", &precise);

    let a = simplex.total_output();
    let b = precise.total_output();
    let rel = (a - b).abs() / a.abs().max(b.abs()).max(f64::MIN_POSITIVE);
    println!("Simplex MW: {:.6}  Interior point MW: {:.6}  Relative difference: {:.2e}", a, b, rel);
    if rel <= 1e-6 {
        println!("Objectives agree");
    } else {
        println!("Objectives differ");
    }
    Ok(())
}

fn scenarios(
    settings: &Settings,
    plant: &PlantArgs,
    file: Option<&Path>,
    backend: Option<&str>,
    json: bool,
) -> Result<(), String> {
    let system = load_system(settings, plant)?;
    let backend = parse_backend(settings, backend)?;
    let demands = match file {
        Some(path) => load_scenarios(path).map_err(|e| format!("Error loading scenarios: {}", e))?,
        None => reference_scenarios(),
    };

    let outcomes = run_scenarios(&system, &demands, backend, &settings.solver);
    if json {
        return print_json(&outcomes);
    }
    for outcome in &outcomes {
        print_result(&format!("Scenario {}", outcome.index + 1), &outcome.result);
    }
    let passed = outcomes.iter().filter(|o| o.feasible).count();
    println!("{} of {} scenarios feasible", passed, outcomes.len());
    Ok(())
}

fn perturb(
    settings: &Settings,
    plant: &PlantArgs,
    demand: &DemandArgs,
    amount: Option<f64>,
    price: Option<f64>,
    days: Option<f64>,
) -> Result<(), String> {
    let system = load_system(settings, plant)?;
    let demand = parse_demand(demand)?;
    let backend = parse_backend(settings, None)?;
    let amount = amount.unwrap_or_else(|| rand::thread_rng().gen_range(15.0..45.0));
    let price = price.unwrap_or(settings.revenue.price_per_mwh);
    let days = days.unwrap_or(settings.revenue.days);

    let mut result = system.solve_with(&demand, backend, &settings.solver);
    if !result.status.is_optimal() {
        print_result("LP Solution", &result);
        return Err("No optimal solution to perturb".to_string());
    }
    print_result("Optimal LP Solution", &result);
    let optimal_mw = result.total_output();

    result
        .apply_shifts(&default_detour(amount))
        .map_err(|e| format!("Error applying detour: {}", e))?;
    println!("Detoured {:.1} lb/hr through the letdown valves", amount);
    println!("{}", result.report());
    let actual_mw = result.total_output();
    println!();
    println!("Optimal MW: {:.3}  Off-optimal MW: {:.3}", optimal_mw, actual_mw);
    println!("Constraints Satisfied: {}", result.check_feasible());
    println!("{}", "=".repeat(50));
    let lost = lost_revenue(optimal_mw, actual_mw, price, days);
    println!("Lost Revenue Per Year: {}", currency(lost));
    Ok(())
}

fn check(settings: &Settings, plant: &PlantArgs) -> Result<(), String> {
    let system = load_system(settings, plant)?;
    let config = system.config();
    let builder = ModelBuilder::new(config);
    let (a_ineq, _, _) = builder.inequality_constraints();

    println!("Variables:    {}", config.variable_names().join(", "));
    println!("Stages:       {}", config.attributes.stages().join(", "));
    println!("Equations:    {}", config.mass_balance.equations().join(", "));
    println!("Bound rows:   {}", a_ineq.len());
    println!("Enthalpy:     {:?}", config.attributes.enthalpy());
    let c: Vec<String> = builder.objective().iter().map(|v| format!("{:.5}", v)).collect();
    println!("Objective:    [{}]", c.join(", "));
    println!("Plant tables OK");
    Ok(())
}

fn enthalpy(psig: f64, deg_f: f64, liquid: bool) -> Result<(), String> {
    if liquid {
        let h = liquid_enthalpy(psig, deg_f).map_err(|e| e.to_string())?;
        println!("Liquid enthalpy: {:.2} BTU/lb", h);
    } else {
        let state = superheated_state(psig, deg_f).map_err(|e| e.to_string())?;
        println!("Enthalpy: {:.2} BTU/lb", state.enthalpy);
        println!("Entropy:  {:.4} BTU/lb-R", state.entropy);
    }
    Ok(())
}

/// `$1,234,567.89`
fn currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let text = format!("{:.2}", amount.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_grouping() {
        assert_eq!(currency(420_000.0), "$420,000.00");
        assert_eq!(currency(1234567.891), "$1,234,567.89");
        assert_eq!(currency(12.5), "$12.50");
        assert_eq!(currency(-1000.0), "-$1,000.00");
    }

    #[test]
    fn test_demand_flag_parsing() {
        let args = ["cogen", "solve", "--demand", "900,10,400,400", "--backend", "precise"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Solve { demand, backend, .. } => {
                assert_eq!(demand.demand, vec![900.0, 10.0, 400.0, 400.0]);
                assert_eq!(backend.as_deref(), Some("precise"));
            }
            _ => panic!("expected solve"),
        }
    }

    #[test]
    fn test_demand_defaults_to_first_scenario() {
        let cli = Cli::try_parse_from(["cogen", "compare"]).unwrap();
        match cli.command {
            Commands::Compare { demand, .. } => {
                assert_eq!(demand.demand, REFERENCE_SCENARIOS[0].to_vec())
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_backend_flag_overrides_settings() {
        let settings = Settings::default();
        assert_eq!(parse_backend(&settings, None).unwrap(), Backend::General(Method::Simplex));
        assert_eq!(parse_backend(&settings, Some("precise")).unwrap(), Backend::Precise);
        assert!(parse_backend(&settings, Some("glpk")).is_err());
    }
}
