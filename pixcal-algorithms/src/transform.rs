//! Drift-time to 3D position.

use pixcal_core::{Packet, Resources, Result};

/// Position of one hit in stored-axis convention.
///
/// `x` is the drift-axis coordinate and `z` is the pixel x, so stored `z`
/// runs roughly along the beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPosition {
    /// Drift-axis coordinate.
    pub x: f64,
    /// Pixel y.
    pub y: f64,
    /// Pixel x.
    pub z: f64,
    /// Hit timestamp minus t0, in clock ticks.
    pub t_drift: f64,
    /// Anode tile the hit was collected on. Not part of the stored record.
    pub tile_id: u32,
}

/// Places a packet in 3D from its hit timestamp and the event t0.
///
/// # Errors
/// Returns an error if the geometry does not know the packet's channel or tile.
#[allow(clippy::cast_precision_loss)]
pub fn drift_position(
    packet: &Packet,
    ts_pps: u64,
    t0: f64,
    resources: &Resources<'_>,
) -> Result<HitPosition> {
    let t_drift = ts_pps as f64 - t0;
    let drift_distance = t_drift * resources.drift_distance_per_tick();

    let geometry = resources.geometry;
    let drift_coord = geometry.z_from_drift(packet.io_group, packet.io_channel, drift_distance)?;
    let (pix_x, pix_y) = geometry.pixel_xy(packet.channel())?;
    let tile_id = geometry.tile_id(packet.io_group, packet.io_channel)?;

    Ok(HitPosition {
        x: drift_coord,
        y: pix_y,
        z: pix_x,
        t_drift,
        tile_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pixcal_core::ChannelKey;
    use pixcal_larpix::{DriftParams, RunData, TileGeometry};

    const GEOMETRY: &str = r#"{
        "tiles": [{"tile_id": 7, "anode_z": -300.0, "drift_direction": 1.0, "io_channels": [[1, 1]]}],
        "pixels": [{"io_group": 1, "io_channel": 1, "chip_id": 11, "channel_id": 3, "x": -12.0, "y": 40.0}]
    }"#;

    #[test]
    fn test_axis_swap_and_drift() {
        let geometry = TileGeometry::from_json(GEOMETRY).unwrap();
        let run = RunData::default().with_crs_ticks(0.1);
        let drift = DriftParams::new(1.6);
        let resources = Resources::new(&geometry, &run, &drift);

        let packet = Packet::data(ChannelKey::new(1, 1, 11, 3), 50);
        let pos = drift_position(&packet, 1500, 1000.0, &resources).unwrap();

        assert_relative_eq!(pos.t_drift, 500.0);
        // 500 ticks * 0.1 us * 1.6 mm/us = 80 mm from the anode
        assert_relative_eq!(pos.x, -220.0, epsilon = 1e-9);
        assert_relative_eq!(pos.y, 40.0);
        assert_relative_eq!(pos.z, -12.0);
        assert_eq!(pos.tile_id, 7);
    }

    #[test]
    fn test_hit_before_t0_has_negative_drift() {
        let geometry = TileGeometry::from_json(GEOMETRY).unwrap();
        let run = RunData::default();
        let drift = DriftParams::default();
        let resources = Resources::new(&geometry, &run, &drift);

        let packet = Packet::data(ChannelKey::new(1, 1, 11, 3), 50);
        let pos = drift_position(&packet, 900, 1000.0, &resources).unwrap();
        assert_relative_eq!(pos.t_drift, -100.0);
        assert!(pos.x < -300.0);
    }

    #[test]
    fn test_unknown_channel_fails() {
        let geometry = TileGeometry::from_json(GEOMETRY).unwrap();
        let run = RunData::default();
        let drift = DriftParams::default();
        let resources = Resources::new(&geometry, &run, &drift);

        let packet = Packet::data(ChannelKey::new(1, 1, 11, 4), 50);
        assert!(drift_position(&packet, 900, 1000.0, &resources).is_err());
    }
}
