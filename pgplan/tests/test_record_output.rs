use chrono::FixedOffset;
use pgplan::config::{build_probe_config, OffsetsFile, Tuning};
use pgplan::nodetags::NodeTags;
use pgplan::profiling::{EventProcessor, OutputFormat, WallClock};
use pgplan_common::{PlanEvent, EVENT_ADD_PATH, EVENT_CREATE_PLAN};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn ring_item(event: &PlanEvent) -> Vec<u8> {
    // SAFETY: PlanEvent is repr(C) plain integers without padding
    #[allow(unsafe_code)]
    let bytes = unsafe {
        std::slice::from_raw_parts(
            (event as *const PlanEvent).cast::<u8>(),
            std::mem::size_of::<PlanEvent>(),
        )
    };
    bytes.to_vec()
}

/// A hash join of two base relations, as the probes would report it
fn join_records() -> Vec<PlanEvent> {
    let seq_scan = PlanEvent {
        pid: 4242,
        event_type: EVENT_ADD_PATH,
        timestamp_ns: 1_000,
        path_ptr: 0x5000,
        parent_rel_ptr: 0x1000,
        path_type: 335,
        startup_cost: 0f64.to_bits(),
        total_cost: 35.5f64.to_bits(),
        rows: 2550f64.to_bits(),
        parent_relid: 1,
        relid: 16384,
        ..PlanEvent::EMPTY
    };
    let material = PlanEvent {
        timestamp_ns: 1_100,
        path_ptr: 0x5200,
        parent_rel_ptr: 0x1100,
        path_type: 353,
        parent_relid: 2,
        relid: 16390,
        ..seq_scan
    };
    let hash_join = PlanEvent {
        timestamp_ns: 1_200,
        path_ptr: 0x6000,
        parent_rel_ptr: 0x1200,
        path_type: 348,
        total_cost: 80.25f64.to_bits(),
        parent_relid: 0,
        relid: 0,
        join_type: 1,
        outer_path_ptr: 0x5000,
        inner_path_ptr: 0x5200,
        outer_path_type: 335,
        inner_path_type: 353,
        outer_relid: 1,
        outer_rel_oid: 16384,
        inner_relid: 2,
        inner_rel_oid: 16390,
        ..seq_scan
    };
    let chosen = PlanEvent { event_type: EVENT_CREATE_PLAN, timestamp_ns: 2_000, ..hash_join };
    vec![seq_scan, material, hash_join, chosen]
}

#[test]
fn test_fixture_offsets_build_probe_config() {
    let tags = NodeTags::load(&fixture("nodetags.h")).expect("nodetags fixture");
    let offsets = OffsetsFile::load(&fixture("offsets_pg16.json")).expect("offsets fixture");

    let child_tag = tags.resolve("T_MaterialPath").unwrap();
    let tuning = Tuning { child_tags: vec![child_tag], ..Tuning::default() };
    let config = build_probe_config(offsets.into(), &tuning).unwrap();

    assert!(config.is_loaded());
    assert_eq!(config.offsets.reloptinfo_relid, 96);
    assert!(config.emits_child(353));
    assert!(!config.emits_child(335));
}

#[test]
fn test_json_records_stitch_into_a_plan_tree() {
    let tags = NodeTags::load(&fixture("nodetags.h")).unwrap();
    let mut processor =
        EventProcessor::new(OutputFormat::Json, tags, &[4242], WallClock::with_offset(0), Vec::new());
    for event in join_records() {
        processor.process_bytes(&ring_item(&event)).unwrap();
    }
    assert_eq!(processor.stats.add_path, 3);
    assert_eq!(processor.stats.create_plan, 1);

    let out = String::from_utf8(processor.into_inner()).unwrap();
    let records: Vec<serde_json::Value> =
        out.lines().map(|line| serde_json::from_str(line).expect("valid JSON line")).collect();
    assert_eq!(records.len(), 4);

    let join = &records[2];
    assert_eq!(join["path_type"], "T_HashPath");
    assert_eq!(join["join_type_name"], "JOIN_LEFT");
    assert_eq!(join["parent_rti"], 0);
    assert_eq!(join["outer_rel_oid"], 16384);
    assert_eq!(join["inner_rel_oid"], 16390);
    assert_eq!(join["total_cost"], 80.25);

    // Children are found by address
    let outer = records.iter().find(|r| r["path_ptr"] == join["outer_path_ptr"]).unwrap();
    let inner = records.iter().find(|r| r["path_ptr"] == join["inner_path_ptr"]).unwrap();
    assert_eq!(outer["path_type"], "T_Path");
    assert_eq!(outer["rows"], 2550);
    assert_eq!(inner["path_type"], "T_MaterialPath");

    assert_eq!(records[3]["event_type"], "CREATE_PLAN");
    assert_eq!(records[3]["path_ptr"], join["path_ptr"]);
}

#[test]
fn test_text_output_to_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let tags = NodeTags::load(&fixture("nodetags.h")).unwrap();
    let writer = std::fs::File::create(file.path()).unwrap();
    let clock = WallClock::with_offset(0).in_zone(FixedOffset::east_opt(0).unwrap());
    let mut processor = EventProcessor::new(OutputFormat::Text, tags, &[], clock, writer);
    processor.write_header("/usr/lib/postgresql/16/bin/postgres", &[]).unwrap();
    for event in join_records() {
        processor.process_event(&event).unwrap();
    }
    drop(processor);

    let text = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5 + 4);
    assert_eq!(lines[2], "Binary: /usr/lib/postgresql/16/bin/postgres");
    assert_eq!(
        lines[5],
        "[00:00:00.000] [PID 4242] ADD_PATH: T_Path \
         (startup=0.00, total=35.50, rows=2550, parent_rti=1, parent_oid=16384)"
    );
    assert!(lines[7].contains("join=JOIN_LEFT, outer_rti=1, outer_oid=16384, inner_rti=2, inner_oid=16390"));
    assert!(lines[8].ends_with("CREATE_PLAN: T_HashPath (startup=0.00, total=80.25) [CHOSEN]"));
}

#[test]
fn test_other_backends_are_filtered() {
    let mut processor = EventProcessor::new(
        OutputFormat::Json,
        NodeTags::new(),
        &[1],
        WallClock::with_offset(0),
        Vec::new(),
    );
    for event in join_records() {
        processor.process_event(&event).unwrap();
    }
    assert_eq!(processor.stats.filtered, 4);
    assert!(processor.into_inner().is_empty());
}
