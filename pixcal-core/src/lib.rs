//! pixcal-core: Core traits and types for calibrated LArPix hit building.
//!
//! This crate provides the channel identity, the input and output record
//! types, the ADC charge conversion, and the collaborator traits (geometry,
//! run context, drift model, record store) the hit builder is written against.
//!

pub mod channel;
pub mod charge;
pub mod error;
pub mod event;
pub mod hit;
pub mod provider;
pub mod store;

pub use channel::ChannelKey;
pub use charge::{charge_from_dataword, energy_from_charge, ChannelCalibration};
pub use error::{Error, Result};
pub use event::{Packet, RawHit, SourceChunk, SourceEvent, T0, DATA_PACKET};
pub use hit::{CalibHit, Edge};
pub use provider::{DriftModel, Geometry, Resources, RunContext};
pub use store::{AttrValue, RecordStore};
