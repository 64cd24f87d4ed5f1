//! Input records: packets, raw hits and t0 references grouped per source event.
//!
//! Upstream stores hand over masked, fixed-width event rows. Here a masked
//! entry is `None`; compaction is "keep the `Some` rows, in order".

use crate::channel::ChannelKey;
use crate::{Error, Result};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Packet type carrying an ADC measurement.
pub const DATA_PACKET: u8 = 0;

/// One LArPix readout packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Packet {
    /// Packet type; only [`DATA_PACKET`] rows become hits.
    pub packet_type: u8,
    /// Raw 8-bit ADC count.
    pub dataword: u8,
    pub io_group: u8,
    pub io_channel: u8,
    pub chip_id: u8,
    pub channel_id: u8,
}

impl Packet {
    /// Creates a data packet.
    #[must_use]
    pub fn data(channel: ChannelKey, dataword: u8) -> Self {
        Self {
            packet_type: DATA_PACKET,
            dataword,
            io_group: channel.io_group,
            io_channel: channel.io_channel,
            chip_id: channel.chip_id,
            channel_id: channel.channel_id,
        }
    }

    /// Returns the channel this packet was read out on.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> ChannelKey {
        ChannelKey::new(self.io_group, self.io_channel, self.chip_id, self.channel_id)
    }

    /// Returns true for ADC data packets.
    #[inline]
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.packet_type == DATA_PACKET
    }
}

/// Time-corrected hit produced upstream, one per data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawHit {
    pub id: u64,
    /// PPS-aligned timestamp in clock ticks.
    pub ts_pps: u64,
}

impl RawHit {
    #[must_use]
    pub fn new(id: u64, ts_pps: u64) -> Self {
        Self { id, ts_pps }
    }
}

/// Drift-time zero point for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct T0 {
    pub ts: f64,
}

impl T0 {
    #[must_use]
    pub fn new(ts: f64) -> Self {
        Self { ts }
    }
}

/// Packets and raw hits of one source event. `None` marks a masked entry.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceEvent {
    #[cfg_attr(feature = "serde", serde(default))]
    pub packets: Vec<Option<Packet>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub raw_hits: Vec<Option<RawHit>>,
}

impl SourceEvent {
    #[must_use]
    pub fn new(packets: Vec<Option<Packet>>, raw_hits: Vec<Option<RawHit>>) -> Self {
        Self { packets, raw_hits }
    }

    /// Iterates over unmasked data packets, keeping their position in the group.
    pub fn data_packets(&self) -> impl Iterator<Item = (usize, &Packet)> {
        self.packets
            .iter()
            .enumerate()
            .filter_map(|(pos, p)| p.as_ref().filter(|p| p.is_data()).map(|p| (pos, p)))
    }

    /// Iterates over unmasked raw hits in order.
    pub fn valid_raw_hits(&self) -> impl Iterator<Item = &RawHit> {
        self.raw_hits.iter().flatten()
    }

    /// Number of unmasked raw hits.
    #[must_use]
    pub fn n_valid_raw_hits(&self) -> usize {
        self.raw_hits.iter().filter(|h| h.is_some()).count()
    }
}

/// A contiguous block of source events handed to the builder in one call.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceChunk {
    /// Id of the first source event in the chunk.
    #[cfg_attr(feature = "serde", serde(default))]
    pub source_start: u64,
    pub events: Vec<SourceEvent>,
    /// One t0 per event.
    pub t0: Vec<T0>,
}

impl SourceChunk {
    #[must_use]
    pub fn new(source_start: u64, events: Vec<SourceEvent>, t0: Vec<T0>) -> Self {
        Self {
            source_start,
            events,
            t0,
        }
    }

    /// One past the last source id, or `None` if it overflows `u64`.
    #[must_use]
    pub fn source_end(&self) -> Option<u64> {
        self.source_start.checked_add(self.events.len() as u64)
    }

    /// Absolute source ids covered by this chunk.
    ///
    /// # Errors
    /// Returns [`Error::SourceRangeOverflow`] if the ids run past `u64::MAX`.
    pub fn checked_source_slice(&self) -> Result<Range<u64>> {
        self.source_end()
            .map(|end| self.source_start..end)
            .ok_or(Error::SourceRangeOverflow {
                start: self.source_start,
                events: self.events.len(),
            })
    }

    /// Absolute source ids covered by this chunk, clamped at `u64::MAX`.
    #[must_use]
    pub fn source_slice(&self) -> Range<u64> {
        self.source_start..self.source_end().unwrap_or(u64::MAX)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of unmasked data packets across all events.
    #[must_use]
    pub fn n_data_packets(&self) -> usize {
        self.events.iter().map(|ev| ev.data_packets().count()).sum()
    }

    /// Total number of unmasked raw hits across all events.
    #[must_use]
    pub fn n_valid_raw_hits(&self) -> usize {
        self.events.iter().map(SourceEvent::n_valid_raw_hits).sum()
    }
}
