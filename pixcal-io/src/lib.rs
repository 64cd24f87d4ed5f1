//! pixcal-io: Record stores and input readers for pixcal.
//!
//! - [`MemoryStore`] keeps hits and reference tables in memory
//! - `Hdf5Store` (feature `hdf5`) writes them as columnar HDF5 groups
//! - [`read_chunks_json`] loads source chunks
//!

mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
mod reader;
mod store;

pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use hdf5::{read_hits_hdf5, read_refs_hdf5, Hdf5Store, Hdf5WriteOptions};
pub use reader::{parse_chunks_json, read_chunks_json};
pub use store::MemoryStore;
