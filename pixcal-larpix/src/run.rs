//! Run-level parameters: data origin, readout clock and drift velocity.

use pixcal_core::{DriftModel, RunContext};
use serde::{Deserialize, Serialize};

/// Charge-readout clock tick [us].
pub const DEFAULT_CRS_TICKS_US: f64 = 0.1;
/// Electron drift velocity in LAr at 500 V/cm [mm/us].
pub const DEFAULT_V_DRIFT_MM_PER_US: f64 = 1.6;

/// Facts about the run being processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunData {
    /// Simulated (Monte Carlo) data.
    pub is_mc: bool,
    /// Charge-readout clock tick duration.
    pub crs_ticks: f64,
}

impl Default for RunData {
    fn default() -> Self {
        Self {
            is_mc: false,
            crs_ticks: DEFAULT_CRS_TICKS_US,
        }
    }
}

impl RunData {
    /// Sets the simulated-data flag.
    #[must_use]
    pub fn with_mc(mut self, is_mc: bool) -> Self {
        self.is_mc = is_mc;
        self
    }

    /// Sets the clock tick duration.
    #[must_use]
    pub fn with_crs_ticks(mut self, crs_ticks: f64) -> Self {
        self.crs_ticks = crs_ticks;
        self
    }
}

impl RunContext for RunData {
    fn is_simulated(&self) -> bool {
        self.is_mc
    }

    fn clock_tick_duration(&self) -> f64 {
        self.crs_ticks
    }
}

/// Liquid-argon drift parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftParams {
    pub v_drift: f64,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            v_drift: DEFAULT_V_DRIFT_MM_PER_US,
        }
    }
}

impl DriftParams {
    #[must_use]
    pub fn new(v_drift: f64) -> Self {
        Self { v_drift }
    }
}

impl DriftModel for DriftParams {
    fn drift_velocity(&self) -> f64 {
        self.v_drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let run: RunData = serde_json::from_str(r#"{"is_mc": true}"#).unwrap();
        assert!(run.is_simulated());
        assert_eq!(run.clock_tick_duration(), DEFAULT_CRS_TICKS_US);

        let drift: DriftParams = serde_json::from_str("{}").unwrap();
        assert_eq!(drift.drift_velocity(), DEFAULT_V_DRIFT_MM_PER_US);
    }
}
