//! Event-to-hit t0 assignment.
//!
//! Each event carries one t0. Every unmasked raw hit of the event gets that
//! t0, so `t_drift` is approximate when several light triggers fall inside
//! one event window.

use pixcal_core::{Error, Result, SourceEvent, T0};

/// Expands per-event t0 values onto the compacted raw-hit rows.
///
/// The returned vector has one entry per unmasked raw hit, in event order,
/// so row `i` lines up with the `i`-th unmasked raw hit of the chunk.
///
/// # Errors
/// Returns [`Error::EventCountMismatch`] if `events` and `t0` differ in length.
pub fn assign_hit_t0(events: &[SourceEvent], t0: &[T0]) -> Result<Vec<f64>> {
    let counts: Vec<usize> = events.iter().map(SourceEvent::n_valid_raw_hits).collect();
    fill_hit_t0(&counts, t0)
}

/// [`assign_hit_t0`] over precomputed valid-hit counts per event.
///
/// # Errors
/// Returns [`Error::EventCountMismatch`] if `valid_counts` and `t0` differ in length.
pub fn fill_hit_t0(valid_counts: &[usize], t0: &[T0]) -> Result<Vec<f64>> {
    if valid_counts.len() != t0.len() {
        return Err(Error::EventCountMismatch {
            events: valid_counts.len(),
            t0s: t0.len(),
        });
    }

    let total = valid_counts.iter().sum();
    let mut hit_t0 = Vec::with_capacity(total);
    let mut first = 0;
    for (event, (&n, t0)) in valid_counts.iter().zip(t0).enumerate() {
        let last = first + n;
        log::trace!("event {event}: {n} hits -> [{first}, {last}) t0={}", t0.ts);
        hit_t0.resize(last, t0.ts);
        first = last;
    }
    Ok(hit_t0)
}
