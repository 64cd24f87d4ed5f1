//! Calibrated hit records and reference edges.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One calibrated prompt hit.
///
/// Coordinates follow the downstream convention: `x` is the drift axis and
/// `z` runs roughly along the beam.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibHit {
    /// Dense id, `slice.start + row`.
    pub id: u32,
    /// Drift-axis coordinate [mm].
    pub x: f64,
    /// Pixel y [mm].
    pub y: f64,
    /// Pixel x [mm], stored as z.
    pub z: f64,
    /// Hit timestamp minus event t0 [ticks].
    pub t_drift: f64,
    /// PPS packet timestamp.
    pub ts_pps: u64,
    /// Charge [ke-].
    #[cfg_attr(feature = "serde", serde(rename = "Q"))]
    pub q: f64,
    /// Energy [MeV].
    #[cfg_attr(feature = "serde", serde(rename = "E"))]
    pub e: f64,
}

/// Column names and units of the stored hit record, in layout order.
pub const CALIB_HIT_FIELDS: [(&str, &str); 8] = [
    ("id", "id"),
    ("x", "mm"),
    ("y", "mm"),
    ("z", "mm"),
    ("t_drift", "ticks"),
    ("ts_pps", "ticks"),
    ("Q", "ke-"),
    ("E", "MeV"),
];

/// Reference between a parent record and a child record in another dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    pub parent: u64,
    pub child: u64,
}

impl Edge {
    #[inline]
    #[must_use]
    pub fn new(parent: u64, child: u64) -> Self {
        Self { parent, child }
    }
}

impl From<(u64, u64)> for Edge {
    fn from((parent, child): (u64, u64)) -> Self {
        Self { parent, child }
    }
}
