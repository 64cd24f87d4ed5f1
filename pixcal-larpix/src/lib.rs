//! pixcal-larpix: LArPix calibration tables, tile geometry and run parameters.
//!
//! This crate provides the LArPix-specific providers the hit builder needs:
//!
//! - [`CalibrationTables`] - per-channel vref/vcm and pedestal with JSON overrides
//! - [`TileGeometry`] - pixel positions and anode tiles loaded from JSON
//! - [`RunData`] / [`DriftParams`] - run context and drift model

pub mod calibration;
mod error;
pub mod geometry;
pub mod run;

pub use calibration::{AdcConfig, CalibrationTables, ChannelTable, Pedestal};
pub use error::{Error, Result};
pub use geometry::{PixelPosition, Tile, TileGeometry};
pub use run::{DriftParams, RunData};

// Re-export core types for convenience
pub use pixcal_core::{ChannelCalibration, ChannelKey};
