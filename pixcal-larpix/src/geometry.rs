//! Pixel tile geometry loaded from JSON.
//!
//! Schema:
//!
//! ```json
//! {
//!   "tiles": [
//!     { "tile_id": 1, "anode_z": -304.0, "drift_direction": 1.0,
//!       "io_channels": [[1, 1], [1, 2], [1, 3], [1, 4]] }
//!   ],
//!   "pixels": [
//!     { "io_group": 1, "io_channel": 1, "chip_id": 11, "channel_id": 0,
//!       "x": -153.0, "y": 12.4 }
//!   ]
//! }
//! ```
//!
//! Every pixel's io_group / io_channel must belong to a tile.

use crate::{Error, Result};
use pixcal_core::{ChannelKey, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One anode tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub tile_id: u32,
    /// Drift-axis position of the anode plane.
    pub anode_z: f64,
    /// Sign of the drift axis as seen from the anode, `+1` or `-1`.
    pub drift_direction: f64,
    /// `(io_group, io_channel)` pairs read out through this tile.
    pub io_channels: Vec<(u8, u8)>,
}

/// Centre of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPosition {
    pub io_group: u8,
    pub io_channel: u8,
    pub chip_id: u8,
    pub channel_id: u8,
    pub x: f64,
    pub y: f64,
}

impl PixelPosition {
    fn channel(&self) -> ChannelKey {
        ChannelKey::new(self.io_group, self.io_channel, self.chip_id, self.channel_id)
    }
}

#[derive(Deserialize)]
struct JsonGeometry {
    tiles: Vec<Tile>,
    #[serde(default)]
    pixels: Vec<PixelPosition>,
}

/// Pixel-plane geometry for a set of anode tiles.
#[derive(Debug, Clone, Default)]
pub struct TileGeometry {
    tiles: HashMap<u32, Tile>,
    tile_of_io: HashMap<(u8, u8), u32>,
    pixels: HashMap<ChannelKey, (f64, f64)>,
}

impl TileGeometry {
    /// Builds a geometry from tiles and pixels, validating consistency.
    ///
    /// # Errors
    /// Returns an error for duplicate tiles, io_channels claimed by two tiles,
    /// drift directions other than ±1, or pixels on unknown io_channels.
    pub fn new(tiles: Vec<Tile>, pixels: Vec<PixelPosition>) -> Result<Self> {
        let mut geometry = Self::default();

        for tile in tiles {
            if (tile.drift_direction.abs() - 1.0).abs() > f64::EPSILON {
                return Err(Error::InvalidGeometry(format!(
                    "tile {} drift_direction must be +1 or -1, got {}",
                    tile.tile_id, tile.drift_direction
                )));
            }
            for &io in &tile.io_channels {
                if let Some(other) = geometry.tile_of_io.insert(io, tile.tile_id) {
                    return Err(Error::InvalidGeometry(format!(
                        "io_group={} io_channel={} claimed by tiles {other} and {}",
                        io.0, io.1, tile.tile_id
                    )));
                }
            }
            let id = tile.tile_id;
            if geometry.tiles.insert(id, tile).is_some() {
                return Err(Error::InvalidGeometry(format!("duplicate tile_id {id}")));
            }
        }

        for pixel in pixels {
            if !geometry
                .tile_of_io
                .contains_key(&(pixel.io_group, pixel.io_channel))
            {
                return Err(Error::InvalidGeometry(format!(
                    "pixel {} is on an io_channel without a tile",
                    pixel.channel()
                )));
            }
            geometry.pixels.insert(pixel.channel(), (pixel.x, pixel.y));
        }

        Ok(geometry)
    }

    /// Loads a geometry from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is malformed, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let json: JsonGeometry =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                Error::MalformedFile {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        Self::new(json.tiles, json.pixels)
    }

    /// Loads a geometry from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let json: JsonGeometry = serde_json::from_str(json)?;
        Self::new(json.tiles, json.pixels)
    }

    /// Returns a tile by id.
    #[must_use]
    pub fn tile(&self, tile_id: u32) -> Option<&Tile> {
        self.tiles.get(&tile_id)
    }

    #[must_use]
    pub fn n_tiles(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn n_pixels(&self) -> usize {
        self.pixels.len()
    }
}

impl Geometry for TileGeometry {
    fn pixel_xy(&self, channel: ChannelKey) -> pixcal_core::Result<(f64, f64)> {
        self.pixels
            .get(&channel)
            .copied()
            .ok_or_else(|| pixcal_core::Error::UnknownChannel(channel.to_string()))
    }

    fn tile_id(&self, io_group: u8, io_channel: u8) -> pixcal_core::Result<u32> {
        self.tile_of_io
            .get(&(io_group, io_channel))
            .copied()
            .ok_or(pixcal_core::Error::UnknownTile {
                io_group,
                io_channel,
            })
    }

    fn z_from_drift(
        &self,
        io_group: u8,
        io_channel: u8,
        drift_distance: f64,
    ) -> pixcal_core::Result<f64> {
        let tile_id = self.tile_id(io_group, io_channel)?;
        let tile = self.tile(tile_id).ok_or(pixcal_core::Error::UnknownTile {
            io_group,
            io_channel,
        })?;
        Ok(tile.anode_z + tile.drift_direction * drift_distance)
    }
}
