use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod layout;
pub mod vehicles;

pub use layout::*;
pub use vehicles::*;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub simulation: SimulationParams,
    #[serde(default)]
    pub signal: SignalLayout,
    #[serde(default)]
    pub roundabout: RoundaboutLayout,
    #[serde(default)]
    pub vehicles: VehicleParams,
}

impl SimulationConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("loading configuration {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

impl Validate for SimulationConfig {
    fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.signal.validate()?;
        self.roundabout.validate()?;
        self.vehicles.validate()?;
        Ok(())
    }
}

pub trait Validate {
    fn validate(&self) -> Result<()>;
}
