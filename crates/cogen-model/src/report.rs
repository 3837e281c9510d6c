//! Labelled presentation of a decision vector.

use std::fmt;

use crate::tables::{ConstraintTable, Demand};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    pub name: String,
    pub value: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionTable {
    pub rows: Vec<SolutionRow>,
    pub demand: Demand,
    /// Electrical output, MW
    pub total_output: f64,
    pub success: bool,
}

impl SolutionTable {
    pub fn new(
        constraints: &ConstraintTable,
        values: &[f64],
        demand: Demand,
        total_output: f64,
        success: bool,
    ) -> Self {
        let rows = constraints
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| SolutionRow {
                name: name.clone(),
                value: values.get(i).copied().unwrap_or(f64::NAN),
                min: constraints.min(i),
                max: constraints.max(i),
            })
            .collect();
        Self {
            rows,
            demand,
            total_output,
            success,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.rows.iter().find(|row| row.name == name).map(|row| row.value)
    }
}

impl fmt::Display for SolutionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10} {:>12}   {:>16}", "Variable", "Value", "Range")?;
        writeln!(f, "{}", "-".repeat(42))?;
        for row in &self.rows {
            let range = format!("[{}, {}]", row.min.unwrap_or(0.0), row.max.unwrap_or(0.0));
            writeln!(f, "{:<10} {:>12.2}   {:>16}", row.name, row.value, range)?;
        }
        writeln!(f)?;
        writeln!(f, "Boiler steam supply: {:>10.1}", self.demand.boiler_supply())?;
        writeln!(f, "HP steam load:       {:>10.1}", self.demand.hp_load())?;
        writeln!(f, "IP steam load:       {:>10.1}", self.demand.ip_load())?;
        writeln!(f, "LP steam load:       {:>10.1}", self.demand.lp_load())?;
        writeln!(f, "Total electrical output: {:.3} MW", self.total_output)?;
        if self.success {
            write!(f, "Optimization Successful")
        } else {
            write!(f, "Optimization Failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::PlantConfig;

    #[test]
    fn test_table_labels_follow_column_order() {
        let config = PlantConfig::reference();
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        let demand = Demand::new([1100.0, 20.0, 550.0, 400.0]).unwrap();
        let table = SolutionTable::new(&config.constraints, &values, demand, 12.5, true);

        assert_eq!(table.rows.len(), 10);
        assert_eq!(table.rows[2].name, "F_TG1A");
        assert_eq!(table.get("F_TG3"), Some(8.0));
        assert_eq!(table.rows[1].min, None);
    }

    #[test]
    fn test_display_shows_banner_and_absent_bounds_as_zero() {
        let config = PlantConfig::reference();
        let demand = Demand::new([1100.0, 20.0, 550.0, 400.0]).unwrap();
        let table = SolutionTable::new(&config.constraints, &[0.0; 10], demand, 0.0, false);
        let text = table.to_string();

        assert!(text.contains("[0, 350]"));
        assert!(text.contains("Total electrical output: 0.000 MW"));
        assert!(text.ends_with("Optimization Failed"));
    }
}
