//! Run configuration file.

use pixcal_algorithms::CalibHitConfig;
use pixcal_larpix::{DriftParams, RunData};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Everything the `process` and `resolve` commands need besides geometry.
///
/// ```json
/// {"stage": {"hits_dset_name": "charge/calib_prompt_hits", ...,
///            "pedestal_file": "ped.json"},
///  "run": {"is_mc": false, "crs_ticks": 0.1},
///  "drift": {"v_drift": 1.6}}
/// ```
///
/// Relative calibration paths resolve against the run file's directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub stage: CalibHitConfig,
    #[serde(default)]
    pub run: RunData,
    #[serde(default)]
    pub drift: DriftParams,
}

impl RunFile {
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut run_file: Self = serde_json::from_str(&contents)?;
        if let Some(base) = path.parent() {
            run_file.rebase(base);
        }
        Ok(run_file)
    }

    fn rebase(&mut self, base: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut().filter(|p| p.is_relative()) {
                *path = base.join(&*path);
            }
        };
        rebase(&mut self.stage.pedestal_file);
        rebase(&mut self.stage.configuration_file);
    }
}
