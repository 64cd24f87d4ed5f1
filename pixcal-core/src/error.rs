//! Error types for pixcal-core.

use thiserror::Error;

/// Result type alias for pixcal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for pixcal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The chunk carries a different number of events than t0 records.
    #[error("event dividers for raw hits and t0 inconsistent: {events} events, {t0s} t0 records")]
    EventCountMismatch { events: usize, t0s: usize },

    /// An event's valid packets and valid raw hits cannot be aligned row by row.
    #[error(
        "event {event}: {packets} valid data packets but {raw_hits} valid raw hits; rows cannot be aligned"
    )]
    AlignmentMismatch {
        event: usize,
        packets: usize,
        raw_hits: usize,
    },

    /// A calibration column differs in length from the dataword column.
    #[error("{column} column has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A chunk's source ids run past `u64::MAX`.
    #[error("source range starting at {start} with {events} events overflows u64")]
    SourceRangeOverflow { start: u64, events: usize },

    /// A channel component does not fit the unique-id encoding.
    #[error("channel component {field}={value} out of range (must be < {limit})")]
    ChannelOutOfRange {
        field: &'static str,
        value: u64,
        limit: u64,
    },

    /// A unique-id does not decode into valid channel components.
    #[error("invalid channel unique id: {0}")]
    InvalidUniqueId(String),

    /// Allocated hit id does not fit the `u32` id column.
    #[error("hit id {0} exceeds u32 range")]
    IdOverflow(u64),

    /// Geometry has no pixel for the channel.
    #[error("no pixel geometry for channel {0}")]
    UnknownChannel(String),

    /// Geometry has no tile for the io_group / io_channel pair.
    #[error("no tile for io_group={io_group} io_channel={io_channel}")]
    UnknownTile { io_group: u8, io_channel: u8 },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Record store error.
    #[error("record store error: {0}")]
    Store(String),
}
