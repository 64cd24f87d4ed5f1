//! Per-channel ADC calibration tables.
//!
//! Two tables are kept: ADC reference voltages (`vref_mv`, `vcm_mv`) and
//! pedestals (`pedestal_mv`). Both fall back to a fixed default for channels
//! without an entry. Override files are JSON objects keyed by the decimal
//! channel unique-id:
//!
//! ```json
//! { "6400704704": { "vref_mv": 1300.0, "vcm_mv": 288.0 } }
//! { "6400704704": { "pedestal_mv": 580.0 } }
//! ```
//!
//! Simulated runs never read override files.

use crate::{Error, Result};
use pixcal_core::{ChannelCalibration, ChannelKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default ADC reference voltage [mV].
pub const DEFAULT_VREF_MV: f64 = 1300.0;
/// Default ADC common-mode voltage [mV].
pub const DEFAULT_VCM_MV: f64 = 288.0;
/// Default pedestal [mV].
pub const DEFAULT_PEDESTAL_MV: f64 = 580.0;

/// ADC voltage range of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdcConfig {
    pub vref_mv: f64,
    pub vcm_mv: f64,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            vref_mv: DEFAULT_VREF_MV,
            vcm_mv: DEFAULT_VCM_MV,
        }
    }
}

/// Baseline of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pedestal {
    pub pedestal_mv: f64,
}

impl Default for Pedestal {
    fn default() -> Self {
        Self {
            pedestal_mv: DEFAULT_PEDESTAL_MV,
        }
    }
}

/// Channel-keyed table with a default for unseen channels.
///
/// Lookups never insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable<T> {
    default: T,
    entries: HashMap<ChannelKey, T>,
}

impl<T: Default> Default for ChannelTable<T> {
    fn default() -> Self {
        Self::with_default(T::default())
    }
}

impl<T> ChannelTable<T> {
    /// Creates an empty table answering `default` for every channel.
    pub fn with_default(default: T) -> Self {
        Self {
            default,
            entries: HashMap::new(),
        }
    }

    /// Returns the entry for `key`, or the default.
    #[inline]
    pub fn get(&self, key: &ChannelKey) -> &T {
        self.entries.get(key).unwrap_or(&self.default)
    }

    /// Returns the explicit entry for `key`, if any.
    pub fn get_explicit(&self, key: &ChannelKey) -> Option<&T> {
        self.entries.get(key)
    }

    /// Sets an explicit entry, returning the previous one.
    pub fn insert(&mut self, key: ChannelKey, value: T) -> Option<T> {
        self.entries.insert(key, value)
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: DeserializeOwned> ChannelTable<T> {
    /// Merges entries from a JSON object keyed by decimal unique-id.
    ///
    /// Entries overwrite existing ones key by key. Keys that do not decode to
    /// a channel are skipped with a warning. Returns the number merged.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or an entry lacks a field.
    pub fn merge_json(&mut self, json: &str) -> Result<usize> {
        let raw: BTreeMap<String, T> = serde_json::from_str(json)?;
        Ok(self.merge_raw(raw))
    }

    /// Merges entries from a JSON file. See [`Self::merge_json`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is malformed.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: BTreeMap<String, T> = serde_json::from_reader(BufReader::new(file)).map_err(
            |source| Error::MalformedFile {
                path: path.to_path_buf(),
                source,
            },
        )?;
        Ok(self.merge_raw(raw))
    }

    fn merge_raw(&mut self, raw: BTreeMap<String, T>) -> usize {
        let mut merged = 0;
        for (key, value) in raw {
            match key.parse::<ChannelKey>() {
                Ok(channel) => {
                    self.entries.insert(channel, value);
                    merged += 1;
                }
                Err(e) => log::warn!("skipping calibration entry {key:?}: {e}"),
            }
        }
        merged
    }
}

/// ADC configuration and pedestal tables, resolved together per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTables {
    pub configuration: ChannelTable<AdcConfig>,
    pub pedestal: ChannelTable<Pedestal>,
}

impl CalibrationTables {
    /// Tables answering the defaults for every channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tables for a run, merging override files for real data.
    ///
    /// Nothing is read when `is_simulated` is true, even if paths are given.
    ///
    /// # Errors
    /// Returns an error if a given file cannot be read or is malformed.
    pub fn load(
        pedestal_file: Option<&Path>,
        configuration_file: Option<&Path>,
        is_simulated: bool,
    ) -> Result<Self> {
        let mut tables = Self::new();

        if is_simulated {
            if pedestal_file.is_some() || configuration_file.is_some() {
                log::info!("simulated run: ignoring calibration override files");
            }
            return Ok(tables);
        }

        if let Some(path) = pedestal_file {
            let n = tables.pedestal.merge_file(path)?;
            log::info!("loaded {n} pedestal entries from {}", path.display());
        }
        if let Some(path) = configuration_file {
            let n = tables.configuration.merge_file(path)?;
            log::info!("loaded {n} ADC configuration entries from {}", path.display());
        }

        Ok(tables)
    }

    /// Resolves the calibration for one channel.
    #[inline]
    #[must_use]
    pub fn resolve(&self, channel: &ChannelKey) -> ChannelCalibration {
        let adc = self.configuration.get(channel);
        let ped = self.pedestal.get(channel);
        ChannelCalibration::new(adc.vref_mv, adc.vcm_mv, ped.pedestal_mv)
    }
}
