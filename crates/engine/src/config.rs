//! Step-parameter configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Parameters of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepParameters {
    /// Maximum interaction distance, used uniformly for halo discovery
    /// and force computation.
    pub cull_radius: f32,
    /// Integration time step.
    pub delta_time: f32,
}

impl StepParameters {
    /// Benchmark parameters for a square world of the given edge length.
    pub fn for_space_size(space_size: f32) -> Self {
        Self {
            cull_radius: space_size / 4.0,
            delta_time: 0.2,
        }
    }

    /// Load parameters from a JSON file and validate them.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let contents = fs::read_to_string(path)?;
        let params: StepParameters = serde_json::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Reject parameters no simulation can run with.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.cull_radius > 0.0) {
            return Err(EngineError::InvalidParameters(format!(
                "cull radius must be positive, got {}",
                self.cull_radius
            )));
        }
        if !(self.delta_time > 0.0) {
            return Err(EngineError::InvalidParameters(format!(
                "delta time must be positive, got {}",
                self.delta_time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benchmark_parameters_scale_with_space_size() {
        let params = StepParameters::for_space_size(1000.0);
        assert_eq!(params.cull_radius, 250.0);
        assert_eq!(params.delta_time, 0.2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn validation_rejects_non_positive_values() {
        let bad_radius = StepParameters {
            cull_radius: 0.0,
            delta_time: 0.1,
        };
        assert!(bad_radius.validate().is_err());

        let bad_dt = StepParameters {
            cull_radius: 10.0,
            delta_time: -0.1,
        };
        assert!(bad_dt.validate().is_err());

        let nan = StepParameters {
            cull_radius: f32::NAN,
            delta_time: 0.1,
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn load_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "step-params-{}-{}.json",
            std::process::id(),
            line!()
        ));
        let params = StepParameters {
            cull_radius: 12.5,
            delta_time: 0.05,
        };
        fs::write(&path, serde_json::to_string(&params).unwrap()).unwrap();
        let loaded = StepParameters::load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, params);
    }

    #[test]
    fn load_rejects_invalid_file_contents() {
        let path = std::env::temp_dir().join(format!(
            "step-params-bad-{}-{}.json",
            std::process::id(),
            line!()
        ));
        fs::write(&path, "{\"cull_radius\": -1.0, \"delta_time\": 0.1}").unwrap();
        assert!(StepParameters::load(&path).is_err());
        fs::remove_file(&path).ok();
    }
}
