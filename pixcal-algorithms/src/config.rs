//! Hit-builder configuration.

use pixcal_core::Error as CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dataset names and calibration files for [`crate::CalibHitBuilder`].
///
/// Every dataset name is required in a config file; [`Default`] supplies
/// the conventional ND-LAr flow layout for programmatic use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibHitConfig {
    /// Output hit dataset.
    #[serde(alias = "calib_hits_dset_name")]
    pub hits_dset_name: String,
    /// Input packet dataset.
    pub packets_dset_name: String,
    /// Packet index dataset, `"{packets_dset_name}_index"` when unset.
    #[serde(default)]
    pub packets_index_name: Option<String>,
    /// Per-event t0 dataset.
    pub t0_dset_name: String,
    /// Event dataset referenced by the event -> hit table.
    pub events_dset_name: String,
    /// Time-corrected raw hit dataset.
    pub raw_hits_dset_name: String,
    /// Pedestal override file.
    #[serde(default)]
    pub pedestal_file: Option<PathBuf>,
    /// vref/vcm override file.
    #[serde(default)]
    pub configuration_file: Option<PathBuf>,
}

impl Default for CalibHitConfig {
    fn default() -> Self {
        Self {
            hits_dset_name: "charge/calib_prompt_hits".to_string(),
            packets_dset_name: "charge/packets".to_string(),
            packets_index_name: None,
            t0_dset_name: "combined/t0".to_string(),
            events_dset_name: "charge/events".to_string(),
            raw_hits_dset_name: "charge/raw_hits".to_string(),
            pedestal_file: None,
            configuration_file: None,
        }
    }
}

impl CalibHitConfig {
    /// Creates a configuration with the conventional dataset names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output hit dataset.
    #[must_use]
    pub fn with_hits_dset_name(mut self, name: impl Into<String>) -> Self {
        self.hits_dset_name = name.into();
        self
    }

    /// Sets the event dataset.
    #[must_use]
    pub fn with_events_dset_name(mut self, name: impl Into<String>) -> Self {
        self.events_dset_name = name.into();
        self
    }

    /// Sets the pedestal override file.
    #[must_use]
    pub fn with_pedestal_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pedestal_file = Some(path.into());
        self
    }

    /// Sets the vref/vcm override file.
    #[must_use]
    pub fn with_configuration_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.configuration_file = Some(path.into());
        self
    }

    /// Packet index dataset name.
    #[must_use]
    pub fn packets_index_name(&self) -> String {
        self.packets_index_name
            .clone()
            .unwrap_or_else(|| format!("{}_index", self.packets_dset_name))
    }

    /// Pedestal override file, if any.
    #[must_use]
    pub fn pedestal_file(&self) -> Option<&Path> {
        self.pedestal_file.as_deref()
    }

    /// vref/vcm override file, if any.
    #[must_use]
    pub fn configuration_file(&self) -> Option<&Path> {
        self.configuration_file.as_deref()
    }

    /// Checks that every dataset name is set.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigError`] naming the first empty field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let names = [
            ("hits_dset_name", &self.hits_dset_name),
            ("packets_dset_name", &self.packets_dset_name),
            ("t0_dset_name", &self.t0_dset_name),
            ("events_dset_name", &self.events_dset_name),
            ("raw_hits_dset_name", &self.raw_hits_dset_name),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(CoreError::ConfigError(format!("{field} must not be empty")));
            }
        }
        if self.packets_index_name.as_deref() == Some("") {
            return Err(CoreError::ConfigError(
                "packets_index_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_name_defaults_to_packets() {
        let config = CalibHitConfig::new();
        assert_eq!(config.packets_index_name(), "charge/packets_index");
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let config = CalibHitConfig::new().with_hits_dset_name("");
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("hits_dset_name"), "{err}");
        assert!(CalibHitConfig::new().validate().is_ok());
    }
}
