//! Calibrated prompt-hit builder.
//!
//! Turns each chunk of source events into calibrated hits: data packets are
//! paired row by row with the event's raw hits, given the event t0, placed
//! in 3D and converted to charge and energy. Hits are written as one block
//! into a freshly reserved id range, followed by the source -> hit and
//! event -> hit reference tables.

use crate::config::CalibHitConfig;
use crate::t0::assign_hit_t0;
use crate::transform::drift_position;
use crate::Result;
use pixcal_core::charge::{charges_from_datawords, energy_from_charge};
use pixcal_core::{
    AttrValue, CalibHit, Edge, Error as CoreError, Packet, RecordStore, Resources, RunContext,
    SourceChunk,
};
use pixcal_larpix::CalibrationTables;
use rayon::prelude::*;
use std::ops::Range;

/// Class name recorded on the output dataset.
pub const CLASSNAME: &str = "CalibHitBuilder";
/// Output layout version recorded on the output dataset.
pub const CLASS_VERSION: &str = "1.0.0";

/// One data packet paired with its raw hit and t0.
#[derive(Debug, Clone, Copy)]
struct HitRow {
    source_id: u64,
    packet: Packet,
    ts_pps: u64,
    t0: f64,
}

/// Hits computed for a chunk before ids are allocated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkHits {
    /// Hits with `id` set to the row index within the chunk.
    pub hits: Vec<CalibHit>,
    /// Source event id of each hit row.
    pub source_ids: Vec<u64>,
}

impl ChunkHits {
    /// Number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the chunk produced no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Rebases hit ids onto an allocated slice.
    ///
    /// # Errors
    /// Returns [`CoreError::IdOverflow`] if an id exceeds `u32`, or
    /// [`CoreError::Store`] if the slice length does not match.
    pub fn assign_ids(&mut self, slice: &Range<u64>) -> std::result::Result<(), CoreError> {
        let n = slice.end.saturating_sub(slice.start);
        if n != self.hits.len() as u64 {
            return Err(CoreError::Store(format!(
                "reserved {n} slots for {} hits",
                self.hits.len()
            )));
        }
        for (id, hit) in slice.clone().zip(self.hits.iter_mut()) {
            hit.id = u32::try_from(id).map_err(|_| CoreError::IdOverflow(id))?;
        }
        Ok(())
    }

    /// Source -> hit edges, in packet order.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.source_ids
            .iter()
            .zip(&self.hits)
            .map(|(&source, hit)| Edge::new(source, u64::from(hit.id)))
            .collect()
    }
}

/// Outcome of one [`CalibHitBuilder::run`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSummary {
    /// Id range allocated for the chunk's hits.
    pub slice: Range<u64>,
    /// Number of events in the chunk.
    pub n_events: usize,
}

impl ChunkSummary {
    /// Number of hits written.
    #[must_use]
    pub fn n_hits(&self) -> u64 {
        self.slice.end - self.slice.start
    }
}

/// Builds calibrated hits from LArPix packets.
///
/// Calibration tables are fixed at construction and only read afterwards,
/// so one builder can be shared across chunk workers.
#[derive(Debug, Clone)]
pub struct CalibHitBuilder {
    config: CalibHitConfig,
    tables: CalibrationTables,
}

impl CalibHitBuilder {
    /// Creates a builder, loading calibration overrides for real data.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or a configured
    /// calibration file cannot be read or parsed.
    pub fn new(config: CalibHitConfig, run: &dyn RunContext) -> Result<Self> {
        config.validate()?;
        let tables = CalibrationTables::load(
            config.pedestal_file(),
            config.configuration_file(),
            run.is_simulated(),
        )?;
        Ok(Self { config, tables })
    }

    /// Creates a builder with explicit calibration tables.
    ///
    /// # Errors
    /// Returns an error if the config is invalid.
    pub fn with_tables(config: CalibHitConfig, tables: CalibrationTables) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, tables })
    }

    /// Builder configuration.
    #[must_use]
    pub fn config(&self) -> &CalibHitConfig {
        &self.config
    }

    /// Calibration tables in use.
    #[must_use]
    pub fn tables(&self) -> &CalibrationTables {
        &self.tables
    }

    /// Creates the output dataset and reference tables and records the
    /// builder's provenance on the output dataset.
    ///
    /// # Errors
    /// Returns an error if the store rejects any of the operations.
    pub fn init<S: RecordStore + ?Sized>(&self, source_name: &str, store: &mut S) -> Result<()> {
        let cfg = &self.config;
        let path_attr = |path: Option<&std::path::Path>| {
            AttrValue::from(path.map(|p| p.display().to_string()).unwrap_or_default())
        };

        store.create_dataset(&cfg.hits_dset_name)?;
        store.set_attrs(
            &cfg.hits_dset_name,
            &[
                ("classname", AttrValue::from(CLASSNAME)),
                ("class_version", AttrValue::from(CLASS_VERSION)),
                ("source_dset", AttrValue::from(source_name)),
                ("packets_dset", AttrValue::from(cfg.packets_dset_name.as_str())),
                ("packets_index", AttrValue::from(cfg.packets_index_name())),
                ("t0_dset", AttrValue::from(cfg.t0_dset_name.as_str())),
                ("pedestal_file", path_attr(cfg.pedestal_file())),
                ("configuration_file", path_attr(cfg.configuration_file())),
            ],
        )?;

        store.create_ref(source_name, &cfg.hits_dset_name)?;
        store.create_ref(&cfg.hits_dset_name, &cfg.packets_dset_name)?;
        if cfg.events_dset_name != source_name {
            store.create_ref(&cfg.events_dset_name, &cfg.hits_dset_name)?;
        }

        log::debug!(
            "initialized {} from {source_name} ({} pedestal, {} ADC overrides)",
            cfg.hits_dset_name,
            self.tables.pedestal.len(),
            self.tables.configuration.len()
        );
        Ok(())
    }

    /// Computes the calibrated hits of a chunk without touching a store.
    ///
    /// A chunk without valid data packets yields no hits, whatever raw hits
    /// it carries.
    ///
    /// # Errors
    /// Returns an error if the chunk's events and t0 records differ in
    /// number, if its source ids overflow, if an event's data packets and raw
    /// hits cannot be paired, or if the geometry lacks a channel.
    pub fn build(&self, chunk: &SourceChunk, resources: &Resources<'_>) -> Result<ChunkHits> {
        let hit_t0 = assign_hit_t0(&chunk.events, &chunk.t0)?;
        let source_ids = chunk.checked_source_slice()?;
        if chunk.n_data_packets() == 0 {
            return Ok(ChunkHits::default());
        }

        let mut rows = Vec::with_capacity(hit_t0.len());
        let mut offset = 0;
        for (event_idx, (event, source_id)) in chunk.events.iter().zip(source_ids).enumerate() {
            let n_packets = event.data_packets().count();
            let n_raw = event.n_valid_raw_hits();
            if n_packets != n_raw {
                return Err(CoreError::AlignmentMismatch {
                    event: event_idx,
                    packets: n_packets,
                    raw_hits: n_raw,
                }
                .into());
            }
            for (k, ((_, packet), raw)) in
                event.data_packets().zip(event.valid_raw_hits()).enumerate()
            {
                rows.push(HitRow {
                    source_id,
                    packet: *packet,
                    ts_pps: raw.ts_pps,
                    t0: hit_t0[offset + k],
                });
            }
            offset += n_raw;
        }

        let positions = rows
            .par_iter()
            .map(|r| drift_position(&r.packet, r.ts_pps, r.t0, resources))
            .collect::<pixcal_core::Result<Vec<_>>>()?;

        let n = rows.len();
        let (mut datawords, mut vref, mut vcm, mut pedestal) = (
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        );
        for r in &rows {
            let calib = self.tables.resolve(&r.packet.channel());
            datawords.push(r.packet.dataword);
            vref.push(calib.vref_mv);
            vcm.push(calib.vcm_mv);
            pedestal.push(calib.pedestal_mv);
        }
        let charges = charges_from_datawords(&datawords, &vref, &vcm, &pedestal)?;

        let hits = rows
            .iter()
            .zip(positions)
            .zip(charges)
            .enumerate()
            .map(|(row, ((r, pos), q))| {
                let id = u32::try_from(row).map_err(|_| CoreError::IdOverflow(row as u64))?;
                Ok(CalibHit {
                    id,
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                    t_drift: pos.t_drift,
                    ts_pps: r.ts_pps,
                    q,
                    e: energy_from_charge(q),
                })
            })
            .collect::<pixcal_core::Result<Vec<CalibHit>>>()?;
        let source_ids = rows.iter().map(|r| r.source_id).collect();

        Ok(ChunkHits { hits, source_ids })
    }

    /// Processes one chunk: builds hits, reserves their ids, writes the hit
    /// block and both reference tables.
    ///
    /// Nothing is reserved or written if the chunk fails validation.
    ///
    /// # Errors
    /// Returns an error from [`Self::build`] or from the store.
    pub fn run<S: RecordStore + ?Sized>(
        &self,
        source_name: &str,
        chunk: &SourceChunk,
        store: &mut S,
        resources: &Resources<'_>,
    ) -> Result<ChunkSummary> {
        let cfg = &self.config;
        let mut built = self.build(chunk, resources)?;

        let slice = store.reserve(&cfg.hits_dset_name, built.len())?;
        built.assign_ids(&slice)?;
        store.write_hits(&cfg.hits_dset_name, slice.clone(), &built.hits)?;

        let edges = built.edges();
        store.write_ref(source_name, &cfg.hits_dset_name, &edges)?;
        // source and event datasets are usually the same table
        if cfg.events_dset_name != source_name {
            store.write_ref(&cfg.events_dset_name, &cfg.hits_dset_name, &edges)?;
        }

        log::debug!(
            "chunk {:?}: {} hits -> {}[{}..{})",
            chunk.source_slice(),
            built.len(),
            cfg.hits_dset_name,
            slice.start,
            slice.end
        );

        Ok(ChunkSummary {
            slice,
            n_events: chunk.len(),
        })
    }
}
