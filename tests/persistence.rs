use intentsim_core::{SimulationConfig, Universe};
use intentsim_io::persistence::{decode_state, encode_state, save_universe};
use intentsim_io::{load_or_initialize, FileStore, MemoryStore, StateFormat, StateStore};

fn config() -> SimulationConfig {
    SimulationConfig {
        seed: Some(77),
        initial_particles: 40,
        ..Default::default()
    }
}

fn evolved(ticks: usize) -> Universe {
    let mut universe = Universe::new(config()).unwrap();
    for _ in 0..ticks {
        universe.tick();
    }
    universe
}

#[test]
fn test_restore_reproduces_exported_state() {
    let universe = evolved(40);
    let state = universe.export_state();

    for format in [StateFormat::Json, StateFormat::GzJson, StateFormat::Rkyv] {
        let bytes = encode_state(&state, format).unwrap();
        let decoded = decode_state(&bytes, format).unwrap();
        let restored = Universe::restore(config(), decoded).unwrap();

        assert_eq!(restored.particles().len(), universe.particles().len(), "{:?}", format);
        assert_eq!(restored.field().dimensions(), universe.field().dimensions());
        assert_eq!(restored.frame(), universe.frame());
        assert_eq!(restored.interactions_count(), universe.interactions_count());
        assert_eq!(restored.export_state(), state);
        assert_eq!(restored.snapshot().cluster_count, universe.snapshot().cluster_count);
    }
}

#[test]
fn test_restored_snapshot_keeps_cluster_statistics() {
    let config = SimulationConfig {
        seed: Some(0),
        initial_particles: 150,
        ..Default::default()
    };
    let mut universe = Universe::new(config.clone()).unwrap();
    for _ in 0..60 {
        universe.tick();
    }
    let restored = Universe::restore(config, universe.export_state()).unwrap();

    let (live, back) = (universe.snapshot(), restored.snapshot());
    assert_eq!(back.cluster_count, live.cluster_count);
    assert_eq!(back.average_cluster_size, live.average_cluster_size);
    assert_eq!(back.cluster_entropy_delta, live.cluster_entropy_delta);
    assert_eq!(back.information_density, live.information_density);
    assert_eq!(back.complexity_index, live.complexity_index);
    assert_eq!(restored.clusters().len(), universe.clusters().len());
}

#[test]
fn test_json_uses_camel_case_contract() {
    let state = evolved(3).export_state();
    let json = String::from_utf8(encode_state(&state, StateFormat::Json).unwrap()).unwrap();
    for key in ["\"particles\"", "\"intentField\"", "\"interactionsCount\"", "\"frameCount\"", "\"simulationTime\""] {
        assert!(json.contains(key), "missing {}", key);
    }
}

#[test]
fn test_corrupt_state_starts_fresh_with_warning() {
    let dir = std::env::temp_dir().join(format!("intentsim-it-{}", uuid::Uuid::new_v4()));
    let store = FileStore::open(&dir).unwrap();
    save_universe(&store, "latest", &evolved(5), StateFormat::GzJson).unwrap();

    let mut bytes = store.get("latest").unwrap().unwrap();
    bytes.truncate(bytes.len() / 2);
    store.set("latest", &bytes).unwrap();

    let restored = load_or_initialize(&store, "latest", config(), StateFormat::GzJson).unwrap();
    assert!(restored.warning.is_some());
    assert_eq!(restored.universe.frame(), 0);
    assert_eq!(restored.universe.particles().len(), 40);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_ragged_field_is_rejected_on_load() {
    let store = MemoryStore::new();
    let mut state = evolved(2).export_state();
    state.intent_field[0].pop();
    store
        .set("latest", &encode_state(&state, StateFormat::Json).unwrap())
        .unwrap();

    let restored = load_or_initialize(&store, "latest", config(), StateFormat::Json).unwrap();
    let warning = restored.warning.expect("ragged field must be reported");
    assert!(warning.contains("latest"));
    assert_eq!(restored.universe.frame(), 0);
}
