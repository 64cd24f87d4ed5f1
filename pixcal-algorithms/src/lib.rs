//! pixcal-algorithms: Calibrated hit building for LArPix charge readout.
//!
//! This crate provides the per-chunk processing stages:
//! - **t0 assignment** - one event t0 repeated over the event's raw hits
//! - **Drift transform** - drift time to 3D position via the geometry
//! - **Hit builder** - charge/energy conversion, id allocation and references
//!
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
pub mod t0;
pub mod transform;

pub use builder::{CalibHitBuilder, ChunkHits, ChunkSummary, CLASSNAME, CLASS_VERSION};
pub use config::CalibHitConfig;
pub use error::{Error, Result};
pub use t0::{assign_hit_t0, fill_hit_t0};
pub use transform::{drift_position, HitPosition};

// Re-export core types for convenience
pub use pixcal_core::{CalibHit, Edge, Resources, SourceChunk};
