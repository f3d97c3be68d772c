use criterion::{criterion_group, criterion_main, Criterion};
use stack_matrix::core::config::{PipelineKind, PipelineProfile};
use stack_matrix::core::manifest::{ManifestSection, ReleaseManifest};
use stack_matrix::core::resolver::{resolve, SelectionMode};
use stack_matrix::reporting::render_pipeline;
use std::hint::black_box;

fn large_manifest() -> ReleaseManifest {
    let releases = (0..18).map(|minor| (format!("8.{minor}"), format!("8.{minor}.3")));
    let snapshots = (0..18)
        .map(|minor| (format!("8.{minor}"), format!("8.{minor}.4-SNAPSHOT")))
        .chain([
            ("8.future".to_string(), "8.18.0-SNAPSHOT".to_string()),
            ("main".to_string(), "9.0.0-SNAPSHOT".to_string()),
        ]);
    ReleaseManifest::new(
        ManifestSection::from_pairs(releases),
        ManifestSection::from_pairs(snapshots),
    )
}

fn bench_resolve(c: &mut Criterion) {
    let manifest = large_manifest();
    let single = SelectionMode::SingleTrack("8.17".to_string());

    c.bench_function("resolve_single_track", |b| {
        b.iter(|| resolve(black_box(&manifest), black_box(&single)))
    });
    c.bench_function("resolve_all_tracks", |b| {
        b.iter(|| resolve(black_box(&manifest), black_box(&SelectionMode::AllTracks)))
    });
}

fn bench_render(c: &mut Criterion) {
    let manifest = large_manifest();
    let profile = PipelineProfile::builtin(PipelineKind::Build);

    c.bench_function("build_and_render_scheduled_pipeline", |b| {
        b.iter(|| {
            let document = profile
                .build_document(&manifest, &SelectionMode::AllTracks)
                .unwrap();
            render_pipeline(black_box(&document)).unwrap()
        })
    });
}

criterion_group!(benches, bench_resolve, bench_render);
criterion_main!(benches);
