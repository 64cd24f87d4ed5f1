//! Channel identity for LArPix readout.
//!
//! A physical channel is identified by four small integers. Lookups use the
//! structured [`ChannelKey`] directly; the packed decimal unique-id is only
//! needed to read calibration files that are keyed by it.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Multiplier applied to `io_group` in the packed unique-id.
pub const IO_CHANNEL_BASE: u64 = 100_000;
/// Multiplier applied to `(io_group, io_channel)` in the packed unique-id.
pub const CHIP_ID_BASE: u64 = 1000;
/// Multiplier applied to `(io_group, io_channel, chip_id)` in the packed unique-id.
pub const CHANNEL_ID_BASE: u64 = 64;

/// Unique physical readout channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelKey {
    /// Readout IO group (one per TPC module half).
    pub io_group: u8,
    /// IO channel within the group.
    pub io_channel: u8,
    /// ASIC id on the IO channel.
    pub chip_id: u8,
    /// Channel on the ASIC.
    pub channel_id: u8,
}

impl ChannelKey {
    /// Creates a new channel key.
    #[inline]
    #[must_use]
    pub fn new(io_group: u8, io_channel: u8, chip_id: u8, channel_id: u8) -> Self {
        Self {
            io_group,
            io_channel,
            chip_id,
            channel_id,
        }
    }

    /// Packs the key into the decimal unique-id used by calibration files:
    /// `((io_group * 100000 + io_channel) * 1000 + chip_id) * 64 + channel_id`.
    ///
    /// # Errors
    /// Returns [`Error::ChannelOutOfRange`] when `channel_id >= 64`, because the
    /// packed id would collide with a neighbouring chip.
    pub fn unique_id(&self) -> Result<u64> {
        if u64::from(self.channel_id) >= CHANNEL_ID_BASE {
            return Err(Error::ChannelOutOfRange {
                field: "channel_id",
                value: u64::from(self.channel_id),
                limit: CHANNEL_ID_BASE,
            });
        }
        // io_channel and chip_id are u8, always below their bases.
        Ok(((u64::from(self.io_group) * IO_CHANNEL_BASE + u64::from(self.io_channel))
            * CHIP_ID_BASE
            + u64::from(self.chip_id))
            * CHANNEL_ID_BASE
            + u64::from(self.channel_id))
    }

    /// Decodes a packed unique-id back into its components.
    ///
    /// # Errors
    /// Returns [`Error::InvalidUniqueId`] if any component does not fit in `u8`.
    pub fn from_unique_id(unique_id: u64) -> Result<Self> {
        let channel_id = unique_id % CHANNEL_ID_BASE;
        let rest = unique_id / CHANNEL_ID_BASE;
        let chip_id = rest % CHIP_ID_BASE;
        let rest = rest / CHIP_ID_BASE;
        let io_channel = rest % IO_CHANNEL_BASE;
        let io_group = rest / IO_CHANNEL_BASE;

        let narrow = |field: &str, value: u64| {
            u8::try_from(value).map_err(|_| {
                Error::InvalidUniqueId(format!("{unique_id}: {field}={value} does not fit u8"))
            })
        };

        Ok(Self {
            io_group: narrow("io_group", io_group)?,
            io_channel: narrow("io_channel", io_channel)?,
            chip_id: narrow("chip_id", chip_id)?,
            channel_id: narrow("channel_id", channel_id)?,
        })
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.io_group, self.io_channel, self.chip_id, self.channel_id
        )
    }
}

impl FromStr for ChannelKey {
    type Err = Error;

    /// Parses the decimal unique-id form used as calibration file keys.
    fn from_str(s: &str) -> Result<Self> {
        let unique_id = s
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::InvalidUniqueId(format!("{s:?}: {e}")))?;
        Self::from_unique_id(unique_id)
    }
}
