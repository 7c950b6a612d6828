//! Benchmarks for the storyboard project engine.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shotdeck::persist::{decode_bundle, encode_bundle};
use shotdeck::{ProjectState, ProjectStore, Scene, SceneGroup};

fn board(groups: usize, scenes_per_group: usize) -> ProjectStore {
    let mut number = 0;
    let scene_groups = (0..groups)
        .map(|g| {
            let scenes = (0..scenes_per_group)
                .map(|_| {
                    number += 1;
                    Scene::new(number)
                        .with_description(format!("scene {}", number))
                        .with_visual_prompt(format!("a detailed storyboard frame, shot {}", number))
                })
                .collect();
            SceneGroup::new(format!("Sequence {:02}", g + 1)).with_scenes(scenes)
        })
        .collect();
    ProjectStore::with_state(ProjectState {
        script_text: "INT. OFFICE - DAY\nA long script.".to_string(),
        scene_groups,
        ..Default::default()
    })
}

fn bench_move_scene(c: &mut Criterion) {
    c.bench_function("move_scene_within_group", |b| {
        let mut store = board(4, 25);
        b.iter(|| {
            store.move_scene(0, 0, 0, Some(24)).unwrap();
            store.move_scene(0, 23, 0, Some(0)).unwrap();
        })
    });
}

fn bench_split_merge(c: &mut Criterion) {
    c.bench_function("split_then_merge", |b| {
        let mut store = board(1, 50);
        b.iter(|| {
            store.split_group(0, 25).unwrap();
            store.merge_group_with_previous(1).unwrap();
        })
    });
}

fn bench_create_snapshot(c: &mut Criterion) {
    c.bench_function("create_snapshot_100_scenes", |b| {
        let mut store = board(4, 25);
        b.iter(|| {
            black_box(store.create_snapshot(None));
        })
    });
}

fn bench_encode_bundle(c: &mut Criterion) {
    c.bench_function("encode_bundle_100_scenes", |b| {
        let store = board(4, 25);
        b.iter(|| black_box(encode_bundle(&store).unwrap()))
    });
}

fn bench_migrate_legacy(c: &mut Criterion) {
    // Legacy flat payload with 100 scenes and no ids.
    let scenes: Vec<String> = (1..=100)
        .map(|i| {
            format!(
                r#"{{"sceneNumber":{},"description":"scene {}","visualPrompt":"prompt {}"}}"#,
                i, i, i
            )
        })
        .collect();
    let legacy = format!(r#"{{"script":"s","scenes":[{}]}}"#, scenes.join(","));

    c.bench_function("migrate_legacy_flat_100", |b| {
        b.iter(|| black_box(decode_bundle(&legacy).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_move_scene,
    bench_split_merge,
    bench_create_snapshot,
    bench_encode_bundle,
    bench_migrate_legacy
);
criterion_main!(benches);
