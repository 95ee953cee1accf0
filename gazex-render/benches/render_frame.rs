use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use gazex_core::{SessionPhase, Stimulus, StimulusRole};
use gazex_mapping::ScreenMarkerLayout;
use gazex_render::{SceneView, SkiaRenderer};
use gazex_timing::HighPrecisionTimer;

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

fn stimuli() -> Vec<Stimulus> {
    (0..11)
        .map(|id| Stimulus {
            id,
            role: if id == 10 {
                StimulusRole::Target
            } else {
                StimulusRole::Distractor
            },
            position: (-600.0 + 120.0 * id as f32, if id % 2 == 0 { 150.0 } else { -150.0 }),
            radius: 100.0,
        })
        .collect()
}

fn harness() -> (SkiaRenderer, Vec<u8>, HighPrecisionTimer) {
    let r = SkiaRenderer::new(WIDTH, HEIGHT, 0.75, None).expect("renderer");
    let fb = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

pub fn bench_trial_frame(c: &mut Criterion) {
    let layout = ScreenMarkerLayout::new([0, 1, 2, 3], 200.0, (WIDTH, HEIGHT));
    let stimuli = stimuli();

    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    g.bench_function("trial_frame", |b| {
        b.iter_batched(
            harness,
            |(mut r, mut fb, mut t)| {
                let view = SceneView {
                    phase: SessionPhase::Running,
                    status: None,
                    markers: layout.markers(),
                    stimuli: &stimuli,
                    gaze_cursor: Some((12.0, -40.0)),
                    progress: Some((3, 10)),
                };
                let stats = r.render_frame(&view, &mut fb, &mut t);
                black_box(stats).ok();
            },
            BatchSize::LargeInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_trial_frame);
criterion_main!(benches);
