use crate::config::ExperimentConfig;
use gazex_core::{Stimulus, StimulusRole};
use rand::Rng;

/// One trial's stimulus set. The target is always the last stimulus so that
/// drawing in order puts it on top.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub id: usize,
    pub stimuli: Vec<Stimulus>,
    pub hit: bool,
}

impl Trial {
    pub fn new(id: usize, stimuli: Vec<Stimulus>) -> Self {
        Self {
            id,
            stimuli,
            hit: false,
        }
    }

    pub fn target(&self) -> Option<&Stimulus> {
        self.stimuli.iter().find(|s| s.is_target())
    }

    pub fn distractors(&self) -> impl Iterator<Item = &Stimulus> {
        self.stimuli.iter().filter(|s| !s.is_target())
    }
}

/// Draws `distractor_count` distractors and one target, each axis uniform
/// and independent, inside the display inset by marker size plus radius.
/// Stimuli may overlap each other.
pub fn randomize_stimuli<R: Rng>(
    rng: &mut R,
    config: &ExperimentConfig,
    display_size: (u32, u32),
) -> Vec<Stimulus> {
    let inset = 2.0 * (config.target_radius + config.marker_size);
    let span_x = (display_size.0 as f32 - inset).max(0.0);
    let span_y = (display_size.1 as f32 - inset).max(0.0);

    let draw = |rng: &mut R| {
        let u: f32 = rng.random();
        let v: f32 = rng.random();
        ((u - 0.5) * span_x, (v - 0.5) * span_y)
    };

    let mut stimuli: Vec<Stimulus> = (0..config.distractor_count)
        .map(|id| Stimulus {
            id,
            role: StimulusRole::Distractor,
            position: draw(rng),
            radius: config.target_radius,
        })
        .collect();
    stimuli.push(Stimulus {
        id: config.distractor_count,
        role: StimulusRole::Target,
        position: draw(rng),
        radius: config.target_radius,
    });
    stimuli
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn exactly_one_target_drawn_last() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = ExperimentConfig::default();
        let stimuli = randomize_stimuli(&mut rng, &config, (1920, 1080));
        assert_eq!(stimuli.len(), config.distractor_count + 1);
        assert_eq!(stimuli.iter().filter(|s| s.is_target()).count(), 1);
        assert!(stimuli.last().unwrap().is_target());
    }

    #[test]
    fn stimuli_stay_clear_of_markers() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = ExperimentConfig::default();
        let (w, h) = (1920.0f32, 1080.0f32);
        for _ in 0..200 {
            for s in randomize_stimuli(&mut rng, &config, (1920, 1080)) {
                let limit_x = w / 2.0 - config.marker_size - s.radius;
                let limit_y = h / 2.0 - config.marker_size - s.radius;
                assert!(s.position.0.abs() <= limit_x);
                assert!(s.position.1.abs() <= limit_y);
            }
        }
    }

    #[test]
    fn tiny_display_collapses_to_center() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = ExperimentConfig::default();
        for s in randomize_stimuli(&mut rng, &config, (400, 300)) {
            assert_eq!(s.position, (0.0, 0.0));
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let config = ExperimentConfig::default();
        let a = randomize_stimuli(&mut StdRng::seed_from_u64(3), &config, (1920, 1080));
        let b = randomize_stimuli(&mut StdRng::seed_from_u64(3), &config, (1920, 1080));
        assert_eq!(a, b);
    }
}
