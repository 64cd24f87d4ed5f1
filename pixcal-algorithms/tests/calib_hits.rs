use approx::assert_relative_eq;
use pixcal_algorithms::{CalibHitBuilder, CalibHitConfig, Error, CLASSNAME, CLASS_VERSION};
use pixcal_core::{
    AttrValue, ChannelKey, Edge, Packet, RawHit, Resources, SourceChunk, SourceEvent, T0,
};
use pixcal_io::MemoryStore;
use pixcal_larpix::{CalibrationTables, DriftParams, RunData, TileGeometry};
use std::io::Write;
use tempfile::NamedTempFile;

const SOURCE: &str = "charge/raw_events";
const HITS: &str = "charge/calib_prompt_hits";
const EVENTS: &str = "charge/events";

const GEOMETRY: &str = r#"{
    "tiles": [
        {"tile_id": 1, "anode_z": -300.0, "drift_direction": 1.0, "io_channels": [[1, 1]]},
        {"tile_id": 2, "anode_z": 300.0, "drift_direction": -1.0, "io_channels": [[1, 2]]}
    ],
    "pixels": [
        {"io_group": 1, "io_channel": 1, "chip_id": 11, "channel_id": 3, "x": -12.0, "y": 40.0},
        {"io_group": 1, "io_channel": 1, "chip_id": 11, "channel_id": 4, "x": -8.0, "y": 40.0},
        {"io_group": 1, "io_channel": 2, "chip_id": 12, "channel_id": 0, "x": 5.0, "y": -3.0}
    ]
}"#;

fn ch_a() -> ChannelKey {
    ChannelKey::new(1, 1, 11, 3)
}

fn ch_b() -> ChannelKey {
    ChannelKey::new(1, 1, 11, 4)
}

fn ch_c() -> ChannelKey {
    ChannelKey::new(1, 2, 12, 0)
}

/// Event whose packets are all valid data packets, each with a raw hit.
fn event(hits: &[(ChannelKey, u8, u64)]) -> SourceEvent {
    let packets = hits
        .iter()
        .map(|&(ch, dw, _)| Some(Packet::data(ch, dw)))
        .collect();
    let raw_hits = hits
        .iter()
        .enumerate()
        .map(|(i, &(_, _, ts))| Some(RawHit::new(i as u64, ts)))
        .collect();
    SourceEvent::new(packets, raw_hits)
}

fn chunk(source_start: u64, events: Vec<SourceEvent>, t0: &[f64]) -> SourceChunk {
    SourceChunk::new(source_start, events, t0.iter().map(|&ts| T0::new(ts)).collect())
}

struct Fixture {
    geometry: TileGeometry,
    run: RunData,
    drift: DriftParams,
}

impl Fixture {
    fn new() -> Self {
        Self {
            geometry: TileGeometry::from_json(GEOMETRY).unwrap(),
            run: RunData::default().with_crs_ticks(0.1),
            drift: DriftParams::new(1.6),
        }
    }

    fn resources(&self) -> Resources<'_> {
        Resources::new(&self.geometry, &self.run, &self.drift)
    }

    fn builder(&self, config: CalibHitConfig) -> CalibHitBuilder {
        CalibHitBuilder::new(config, &self.run).unwrap()
    }
}

fn init_store(builder: &CalibHitBuilder) -> MemoryStore {
    let mut store = MemoryStore::new();
    builder.init(SOURCE, &mut store).unwrap();
    store
}

#[test]
fn test_default_calibration_charge() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(
        0,
        vec![event(&[(ch_a(), 128, 1500), (ch_c(), 128, 1600)])],
        &[1000.0],
    );
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();

    let hits = store.hits(HITS).unwrap();
    assert_eq!(hits.len(), 2);
    for hit in hits {
        assert_relative_eq!(hit.q, 53.5, epsilon = 1e-9);
        assert_relative_eq!(hit.e, 53.5 * 23.6e-6, epsilon = 1e-12);
    }
    assert_eq!(hits[0].ts_pps, 1500);
    assert_eq!(hits[1].ts_pps, 1600);
}

#[test]
fn test_position_and_drift() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(
        0,
        vec![
            event(&[(ch_a(), 50, 1500)]),
            event(&[(ch_c(), 50, 2500)]),
        ],
        &[1000.0, 2000.0],
    );
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();

    let hits = store.hits(HITS).unwrap();
    // 500 ticks * 0.1 us * 1.6 mm/us = 80 mm away from each anode
    assert_relative_eq!(hits[0].t_drift, 500.0);
    assert_relative_eq!(hits[0].x, -220.0, epsilon = 1e-9);
    assert_relative_eq!(hits[0].y, 40.0);
    assert_relative_eq!(hits[0].z, -12.0);

    assert_relative_eq!(hits[1].t_drift, 500.0);
    assert_relative_eq!(hits[1].x, 220.0, epsilon = 1e-9);
    assert_relative_eq!(hits[1].y, -3.0);
    assert_relative_eq!(hits[1].z, 5.0);
}

#[test]
fn test_empty_chunk_produces_nothing() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(4, vec![event(&[]), event(&[])], &[10.0, 20.0]);
    let summary = builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();

    assert_eq!(summary.n_hits(), 0);
    assert_eq!(summary.n_events, 2);
    assert_eq!(store.len(HITS), 0);
    assert!(store.refs(SOURCE, HITS).unwrap().is_empty());
    assert!(store.refs(EVENTS, HITS).unwrap().is_empty());
}

#[test]
fn test_pedestal_override_changes_one_channel() {
    let uid = ch_a().unique_id().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"{uid}": {{"pedestal_mv": 600.0}}}}"#).unwrap();

    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new().with_pedestal_file(file.path()));
    let mut store = init_store(&builder);

    let c = chunk(0, vec![event(&[(ch_a(), 128, 10), (ch_b(), 128, 10)])], &[0.0]);
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();

    let hits = store.hits(HITS).unwrap();
    assert_relative_eq!(hits[0].q, 48.5, epsilon = 1e-9);
    assert_relative_eq!(hits[1].q, 53.5, epsilon = 1e-9);
}

#[test]
fn test_configuration_override() {
    let uid = ch_b().unique_id().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"{uid}": {{"vref_mv": 1556.0, "vcm_mv": 288.0}}}}"#).unwrap();

    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new().with_configuration_file(file.path()));
    let mut store = init_store(&builder);

    let c = chunk(0, vec![event(&[(ch_a(), 128, 10), (ch_b(), 128, 10)])], &[0.0]);
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();

    let hits = store.hits(HITS).unwrap();
    assert_relative_eq!(hits[0].q, 53.5, epsilon = 1e-9);
    // 128/256 * (1556 - 288) + 288 - 580 = 342 mV
    assert_relative_eq!(hits[1].q, 85.5, epsilon = 1e-9);
}

#[test]
fn test_ids_are_dense_across_chunks() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let first = chunk(
        0,
        vec![
            event(&[(ch_a(), 100, 10), (ch_b(), 100, 11)]),
            event(&[(ch_c(), 100, 12)]),
        ],
        &[0.0, 0.0],
    );
    let second = chunk(
        2,
        vec![
            event(&[(ch_a(), 90, 20), (ch_a(), 91, 21), (ch_b(), 92, 22)]),
            event(&[(ch_c(), 93, 23), (ch_c(), 94, 24)]),
        ],
        &[5.0, 6.0],
    );

    let s1 = builder.run(SOURCE, &first, &mut store, &fx.resources()).unwrap();
    let s2 = builder.run(SOURCE, &second, &mut store, &fx.resources()).unwrap();
    assert_eq!(s1.slice, 0..3);
    assert_eq!(s2.slice, 3..8);

    let ids: Vec<u32> = store.hits(HITS).unwrap().iter().map(|h| h.id).collect();
    assert_eq!(ids, (0..8).collect::<Vec<u32>>());
    assert!(store.is_complete(HITS));
}

#[test]
fn test_edges_follow_packet_order() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(
        10,
        vec![
            event(&[(ch_a(), 100, 10), (ch_b(), 100, 11)]),
            event(&[]),
            event(&[(ch_c(), 100, 12)]),
        ],
        &[0.0, 0.0, 0.0],
    );
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();

    let expected = vec![Edge::new(10, 0), Edge::new(10, 1), Edge::new(12, 2)];
    assert_eq!(store.refs(SOURCE, HITS).unwrap(), expected.as_slice());
    assert_eq!(store.refs(EVENTS, HITS).unwrap(), expected.as_slice());
}

#[test]
fn test_masked_and_non_data_packets_are_skipped() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let mut trigger = Packet::data(ch_b(), 0);
    trigger.packet_type = 7;
    let ev = SourceEvent::new(
        vec![
            Some(Packet::data(ch_a(), 128)),
            None,
            Some(trigger),
            Some(Packet::data(ch_c(), 128)),
        ],
        vec![
            Some(RawHit::new(0, 1100)),
            None,
            None,
            Some(RawHit::new(1, 1200)),
        ],
    );
    let c = chunk(0, vec![ev], &[1000.0]);
    assert_eq!(c.n_data_packets(), 2);

    let summary = builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();
    assert_eq!(summary.n_hits(), 2);

    let hits = store.hits(HITS).unwrap();
    assert_eq!(hits[0].ts_pps, 1100);
    assert_eq!(hits[1].ts_pps, 1200);
    assert_relative_eq!(hits[1].t_drift, 200.0);
}

#[test]
fn test_t0_count_mismatch_writes_nothing() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(
        0,
        vec![event(&[(ch_a(), 1, 1)]), event(&[(ch_b(), 1, 1)])],
        &[0.0],
    );
    let err = builder
        .run(SOURCE, &c, &mut store, &fx.resources())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CoreError(pixcal_core::Error::EventCountMismatch { events: 2, t0s: 1 })
    ));
    assert_eq!(store.len(HITS), 0);
    assert!(store.refs(SOURCE, HITS).unwrap().is_empty());

    // the count check also applies when there is nothing to calibrate
    let empty = chunk(0, vec![event(&[])], &[]);
    assert!(builder
        .run(SOURCE, &empty, &mut store, &fx.resources())
        .is_err());
}

#[test]
fn test_alignment_mismatch_is_reported() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let ev = SourceEvent::new(
        vec![
            Some(Packet::data(ch_a(), 1)),
            Some(Packet::data(ch_b(), 1)),
        ],
        vec![Some(RawHit::new(0, 5)), None],
    );
    let c = chunk(0, vec![event(&[(ch_c(), 1, 1)]), ev], &[0.0, 0.0]);
    let err = builder
        .run(SOURCE, &c, &mut store, &fx.resources())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CoreError(pixcal_core::Error::AlignmentMismatch {
            event: 1,
            packets: 2,
            raw_hits: 1
        })
    ));
    assert_eq!(store.len(HITS), 0);
}

#[test]
fn test_unknown_pixel_fails_chunk() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(0, vec![event(&[(ChannelKey::new(1, 1, 11, 9), 1, 1)])], &[0.0]);
    assert!(builder.run(SOURCE, &c, &mut store, &fx.resources()).is_err());
    assert_eq!(store.len(HITS), 0);
}

#[test]
fn test_simulated_run_ignores_calibration_files() {
    let config = CalibHitConfig::new()
        .with_pedestal_file("/nonexistent/pedestal.json")
        .with_configuration_file("/nonexistent/config.json");

    let real = RunData::default();
    assert!(CalibHitBuilder::new(config.clone(), &real).is_err());

    let mut fx = Fixture::new();
    fx.run = fx.run.with_mc(true);
    let builder = fx.builder(config);
    let mut store = init_store(&builder);

    let c = chunk(0, vec![event(&[(ch_a(), 128, 10)])], &[0.0]);
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();
    assert_relative_eq!(store.hits(HITS).unwrap()[0].q, 53.5, epsilon = 1e-9);
}

#[test]
fn test_init_records_metadata_and_refs() {
    let config = CalibHitConfig::new().with_pedestal_file("ped.json");
    let builder = CalibHitBuilder::with_tables(config, CalibrationTables::new()).unwrap();
    let store = init_store(&builder);

    let attr = |name: &str| store.attr(HITS, name).cloned();
    assert_eq!(attr("classname"), Some(AttrValue::from(CLASSNAME)));
    assert_eq!(attr("class_version"), Some(AttrValue::from(CLASS_VERSION)));
    assert_eq!(attr("source_dset"), Some(AttrValue::from(SOURCE)));
    assert_eq!(attr("packets_dset"), Some(AttrValue::from("charge/packets")));
    assert_eq!(attr("t0_dset"), Some(AttrValue::from("combined/t0")));
    assert_eq!(attr("pedestal_file"), Some(AttrValue::from("ped.json")));
    assert_eq!(attr("configuration_file"), Some(AttrValue::from("")));

    assert!(store.has_ref(SOURCE, HITS));
    assert!(store.has_ref(HITS, "charge/packets"));
    assert!(store.has_ref(EVENTS, HITS));
}

#[test]
fn test_source_as_event_dataset_writes_one_table() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new().with_events_dset_name(SOURCE));
    let mut store = init_store(&builder);
    assert!(store.has_ref(SOURCE, HITS));
    assert!(!store.has_ref(EVENTS, HITS));

    let c = chunk(3, vec![event(&[(ch_a(), 1, 1)])], &[0.0]);
    builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();
    assert_eq!(store.refs(SOURCE, HITS).unwrap(), &[Edge::new(3, 0)]);
    assert!(store.refs(EVENTS, HITS).is_none());
}

#[test]
fn test_raw_hits_without_data_packets_produce_no_hits() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let ev = SourceEvent::new(vec![None], vec![Some(RawHit::new(0, 10))]);
    let c = chunk(4, vec![ev], &[0.0]);
    assert_eq!(c.n_data_packets(), 0);
    assert_eq!(c.n_valid_raw_hits(), 1);

    let summary = builder.run(SOURCE, &c, &mut store, &fx.resources()).unwrap();
    assert_eq!(summary.n_hits(), 0);
    assert_eq!(summary.n_events, 1);
    assert_eq!(store.len(HITS), 0);
    assert!(store.refs(SOURCE, HITS).unwrap().is_empty());
    assert!(store.refs(EVENTS, HITS).unwrap().is_empty());

    // the t0 count is still checked
    let ev = SourceEvent::new(vec![None], vec![Some(RawHit::new(0, 10))]);
    let c = chunk(4, vec![ev], &[]);
    assert!(builder.run(SOURCE, &c, &mut store, &fx.resources()).is_err());
}

#[test]
fn test_source_id_overflow_fails_chunk() {
    let fx = Fixture::new();
    let builder = fx.builder(CalibHitConfig::new());
    let mut store = init_store(&builder);

    let c = chunk(
        u64::MAX,
        vec![event(&[(ch_a(), 1, 1)]), event(&[(ch_b(), 1, 1)])],
        &[0.0, 0.0],
    );
    let err = builder
        .run(SOURCE, &c, &mut store, &fx.resources())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CoreError(pixcal_core::Error::SourceRangeOverflow { events: 2, .. })
    ));
    assert_eq!(store.len(HITS), 0);
}
