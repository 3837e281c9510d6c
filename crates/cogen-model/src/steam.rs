//! IAPWS-IF97 steam properties in plant units (psig, °F, BTU/lb).
//!
//! Used offline to derive the enthalpy row of an [`AttributeTable`] from
//! header pressures and temperatures.

use seuif97::{pt, OH, OS};
use thiserror::Error;

use crate::tables::{AttributeTable, ConfigError, ENTHALPY_ROW, N_STAGES};

pub const PSI_TO_MPA: f64 = 0.101325 / 14.69;
pub const MPA_TO_PSI: f64 = 1.0 / PSI_TO_MPA;
pub const BAR_TO_MPA: f64 = 0.1;
pub const MPA_TO_BAR: f64 = 1.0 / BAR_TO_MPA;
pub const KJKG_TO_BTULB: f64 = 0.42992;
pub const BTULB_TO_KJKG: f64 = 1.0 / KJKG_TO_BTULB;
pub const KJKGK_TO_BTULBR: f64 = 0.238846;
pub const BTULBR_TO_KJKGK: f64 = 1.0 / KJKGK_TO_BTULBR;
pub const LBGAL_TO_KGCM: f64 = 119.826;
pub const KGCM_TO_LBGAL: f64 = 1.0 / LBGAL_TO_KGCM;
/// kg/s of steam to lb/hr
pub const KGS_TO_LBHR: f64 = 7937.0;
pub const LBHR_TO_KGS: f64 = 1.0 / KGS_TO_LBHR;
pub const SCF_PER_LBMOL: f64 = 379.3;
/// Atmospheric pressure used for gauge conversions, psi
pub const ATMOSPHERE_PSI: f64 = 14.69;

const REGION_LIQUID: i32 = 1;
const REGION_SUPERHEATED: i32 = 2;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SteamError {
    #[error("IF97 has no {phase} state at {psig} psig, {deg_f} °F")]
    OutOfRange { phase: &'static str, psig: f64, deg_f: f64 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn f_to_k(f: f64) -> f64 {
    5.0 / 9.0 * (f + 459.67)
}

pub fn k_to_f(k: f64) -> f64 {
    k * 9.0 / 5.0 - 459.67
}

pub fn c_to_k(c: f64) -> f64 {
    c + 273.15
}

pub fn k_to_c(k: f64) -> f64 {
    k - 273.15
}

/// Gauge to absolute.
pub fn psia(psig: f64) -> f64 {
    psig + ATMOSPHERE_PSI
}

/// Absolute to gauge.
pub fn psig(psia: f64) -> f64 {
    psia - ATMOSPHERE_PSI
}

/// Enthalpy (BTU/lb) and entropy (BTU/lb·°R).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteamState {
    pub enthalpy: f64,
    pub entropy: f64,
}

fn if97_inputs(psig: f64, deg_f: f64) -> (f64, f64) {
    (PSI_TO_MPA * psia(psig), k_to_c(f_to_k(deg_f)))
}

pub fn superheated_state(psig: f64, deg_f: f64) -> Result<SteamState, SteamError> {
    let (p, t) = if97_inputs(psig, deg_f);
    let h = pt(p, t, (OH, REGION_SUPERHEATED));
    let s = pt(p, t, (OS, REGION_SUPERHEATED));
    if !h.is_finite() || !s.is_finite() {
        return Err(SteamError::OutOfRange {
            phase: "superheated",
            psig,
            deg_f,
        });
    }
    Ok(SteamState {
        enthalpy: h * KJKG_TO_BTULB,
        entropy: s * KJKGK_TO_BTULBR,
    })
}

/// Superheated steam enthalpy, BTU/lb.
pub fn superheated_enthalpy(psig: f64, deg_f: f64) -> Result<f64, SteamError> {
    superheated_state(psig, deg_f).map(|state| state.enthalpy)
}

/// Compressed liquid enthalpy, BTU/lb.
pub fn liquid_enthalpy(psig: f64, deg_f: f64) -> Result<f64, SteamError> {
    let (p, t) = if97_inputs(psig, deg_f);
    let h = pt(p, t, (OH, REGION_LIQUID));
    if !h.is_finite() {
        return Err(SteamError::OutOfRange {
            phase: "liquid",
            psig,
            deg_f,
        });
    }
    Ok(h * KJKG_TO_BTULB)
}

/// Pressure and temperature of one header.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCondition {
    pub name: String,
    pub psig: f64,
    pub deg_f: f64,
}

impl AttributeTable {
    /// `PSIG`, `DEGF` and an IF97-derived `BTU/LB` row for four headers.
    pub fn from_conditions(headers: &[HeaderCondition]) -> Result<Self, SteamError> {
        if headers.len() != N_STAGES {
            return Err(ConfigError::ColumnCount {
                table: "attribute table",
                expected: N_STAGES,
                found: headers.len(),
            }
            .into());
        }
        let enthalpy = headers
            .iter()
            .map(|h| superheated_enthalpy(h.psig, h.deg_f))
            .collect::<Result<Vec<_>, _>>()?;
        let stages = headers.iter().map(|h| h.name.clone()).collect();
        let rows = vec![
            ("PSIG".to_string(), headers.iter().map(|h| h.psig).collect()),
            ("DEGF".to_string(), headers.iter().map(|h| h.deg_f).collect()),
            (ENTHALPY_ROW.to_string(), enthalpy),
        ];
        Ok(AttributeTable::new(stages, rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_round_trip() {
        assert!((f_to_k(32.0) - 273.15).abs() < 1e-9);
        assert!((k_to_f(373.15) - 212.0).abs() < 1e-9);
        assert!((k_to_c(c_to_k(25.0)) - 25.0).abs() < 1e-12);
        assert_eq!(psig(psia(150.0)), 150.0);
    }

    #[test]
    fn test_superheated_enthalpy_matches_steam_tables() {
        // 600 psia / 700 °F is about 1350.6 BTU/lb in the ASME tables
        let h = superheated_enthalpy(psig(600.0), 700.0).unwrap();
        assert!((h - 1350.6).abs() < 3.0, "h = {h}");

        let state = superheated_state(psig(600.0), 700.0).unwrap();
        assert!((state.entropy - 1.5874).abs() < 0.01, "s = {}", state.entropy);
    }

    #[test]
    fn test_liquid_enthalpy() {
        // Subcooled water at 100 psig, 200 °F sits near 168 BTU/lb
        let h = liquid_enthalpy(100.0, 200.0).unwrap();
        assert!((h - 168.0).abs() < 2.0, "h = {h}");
    }

    #[test]
    fn test_attribute_table_from_conditions() {
        let headers = [
            ("PB", 1250.0, 900.0),
            ("HP", 600.0, 700.0),
            ("IP", 150.0, 450.0),
            ("LP", 50.0, 320.0),
        ]
            .map(|(name, psig, deg_f)| HeaderCondition {
                name: name.to_string(),
                psig,
                deg_f,
            });
        let table = AttributeTable::from_conditions(&headers).unwrap();
        let h = table.enthalpy();
        // Enthalpy falls through each letdown stage
        assert!(h[0] > h[1] && h[1] > h[2] && h[2] > h[3], "{h:?}");
        assert_eq!(table.row("PSIG"), Some(&[1250.0, 600.0, 150.0, 50.0][..]));
    }

    #[test]
    fn test_from_conditions_needs_four_headers() {
        let err = AttributeTable::from_conditions(&[]).unwrap_err();
        assert!(matches!(err, SteamError::Config(ConfigError::ColumnCount { .. })));
    }
}
