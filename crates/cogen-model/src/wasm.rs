//! WASM bindings for browser-side topology rendering.

use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

use crate::adapter::Backend;
use crate::steam::superheated_enthalpy;
use crate::system::SteamSystem;
use crate::tables::{Demand, PlantConfig};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn solve_json(
    config: PlantConfig,
    demand: Float64Array,
    backend: &str,
) -> Result<JsValue, JsValue> {
    let demand = Demand::from_slice(&demand.to_vec()).map_err(js_err)?;
    let backend: Backend = backend.parse().map_err(js_err)?;
    let result = SteamSystem::new(config).solve(&demand, backend);
    serde_wasm_bindgen::to_value(&result).map_err(js_err)
}

/// Solve one demand vector against plant tables passed as JSON
#[wasm_bindgen]
pub fn solve_scenario(
    plant: JsValue,
    demand: Float64Array,
    backend: &str,
) -> Result<JsValue, JsValue> {
    let config: PlantConfig = serde_wasm_bindgen::from_value(plant).map_err(js_err)?;
    solve_json(config.revalidate().map_err(js_err)?, demand, backend)
}

/// Solve one demand vector against the reference plant
#[wasm_bindgen]
pub fn solve_reference(demand: Float64Array, backend: &str) -> Result<JsValue, JsValue> {
    solve_json(PlantConfig::reference(), demand, backend)
}

#[wasm_bindgen]
pub fn reference_plant() -> JsValue {
    serde_wasm_bindgen::to_value(&PlantConfig::reference()).unwrap_or(JsValue::NULL)
}

/// Superheated steam enthalpy in BTU/lb
#[wasm_bindgen]
pub fn steam_enthalpy(psig: f64, deg_f: f64) -> Result<f64, JsValue> {
    superheated_enthalpy(psig, deg_f).map_err(js_err)
}
