//! Detector and run collaborators the hit builder consults.

use crate::channel::ChannelKey;
use crate::Result;

/// Detector geometry: pixel positions and anode planes.
///
/// Lengths are in the geometry's own unit (mm for the stored hits).
pub trait Geometry: Send + Sync {
    /// Pixel centre `(x, y)` for a channel.
    fn pixel_xy(&self, channel: ChannelKey) -> Result<(f64, f64)>;

    /// Pixel tile serving an io_group / io_channel pair.
    fn tile_id(&self, io_group: u8, io_channel: u8) -> Result<u32>;

    /// Drift-axis coordinate of charge that drifted `drift_distance` onto the
    /// tile serving `io_group` / `io_channel`.
    fn z_from_drift(&self, io_group: u8, io_channel: u8, drift_distance: f64) -> Result<f64>;
}

/// Run-level facts about the data being processed.
pub trait RunContext: Send + Sync {
    /// True for simulated data.
    fn is_simulated(&self) -> bool;

    /// Duration of one charge-readout clock tick (e.g. 0.1 us).
    fn clock_tick_duration(&self) -> f64;
}

/// Electron drift model.
pub trait DriftModel: Send + Sync {
    /// Drift velocity in geometry length units per clock-tick time unit.
    fn drift_velocity(&self) -> f64;
}

/// Borrowed set of collaborators for one processing call.
#[derive(Clone, Copy)]
pub struct Resources<'a> {
    pub geometry: &'a dyn Geometry,
    pub run: &'a dyn RunContext,
    pub drift: &'a dyn DriftModel,
}

impl<'a> Resources<'a> {
    #[must_use]
    pub fn new(
        geometry: &'a dyn Geometry,
        run: &'a dyn RunContext,
        drift: &'a dyn DriftModel,
    ) -> Self {
        Self {
            geometry,
            run,
            drift,
        }
    }

    /// Drift distance per tick of drift time.
    #[inline]
    #[must_use]
    pub fn drift_distance_per_tick(&self) -> f64 {
        self.drift.drift_velocity() * self.run.clock_tick_duration()
    }
}
