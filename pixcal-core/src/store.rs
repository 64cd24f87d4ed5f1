//! Record-store interface.
//!
//! The store owns persistence: it allocates dense id ranges per dataset,
//! writes hit blocks into them and keeps reference tables between datasets.

use crate::hit::{CalibHit, Edge};
use crate::Result;
use std::fmt;
use std::ops::Range;

/// Scalar attribute value attached to a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Typed record store with dense id allocation and reference tables.
///
/// `reserve` takes `&mut self`: callers sharing a store across threads must
/// serialize access so allocated ranges never overlap.
pub trait RecordStore {
    /// Creates a hit dataset. Creating an existing dataset is an error.
    fn create_dataset(&mut self, dataset: &str) -> Result<()>;

    /// Creates the reference table `parent -> child`.
    fn create_ref(&mut self, parent: &str, child: &str) -> Result<()>;

    /// Allocates `count` consecutive record slots, returning their id range.
    fn reserve(&mut self, dataset: &str, count: usize) -> Result<Range<u64>>;

    /// Writes `hits` into a previously reserved slice.
    fn write_hits(&mut self, dataset: &str, slice: Range<u64>, hits: &[CalibHit]) -> Result<()>;

    /// Appends edges to the reference table `parent -> child`.
    fn write_ref(&mut self, parent: &str, child: &str, edges: &[Edge]) -> Result<()>;

    /// Sets scalar attributes on a dataset.
    fn set_attrs(&mut self, dataset: &str, attrs: &[(&str, AttrValue)]) -> Result<()>;
}
