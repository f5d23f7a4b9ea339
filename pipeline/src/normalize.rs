use ml::dataset::Dataset;
use rand::{seq::SliceRandom, Rng};

use crate::{
    data::Sample,
    error::{PipelineErr, Result},
};

/// Min/max bounds of one training run.
///
/// Computed once while normalizing and reused unchanged for every later
/// denormalization of the same run; they travel with the trained model so the
/// evaluator can never pick up stale or recomputed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub input_min: f32,
    pub input_max: f32,
    pub label_min: f32,
    pub label_max: f32,
}

impl Bounds {
    /// Maps a horsepower value into [0, 1].
    pub fn norm_input(&self, v: f32) -> f32 {
        (v - self.input_min) / (self.input_max - self.input_min)
    }

    /// Maps an mpg value into [0, 1].
    pub fn norm_label(&self, v: f32) -> f32 {
        (v - self.label_min) / (self.label_max - self.label_min)
    }

    /// Maps a normalized input back to horsepower.
    pub fn denorm_input(&self, v: f32) -> f32 {
        v * (self.input_max - self.input_min) + self.input_min
    }

    /// Maps a normalized prediction back to mpg.
    pub fn denorm_label(&self, v: f32) -> f32 {
        v * (self.label_max - self.label_min) + self.label_min
    }
}

/// Shuffles the samples in place and rescales both dimensions to [0, 1] with
/// min/max scaling.
///
/// # Arguments
/// * `samples` - The working set; shuffled as a side effect.
/// * `rng` - The generator driving the shuffle.
///
/// # Returns
/// The normalized dataset plus the bounds of this run, or `DegenerateData`
/// if either dimension has zero range.
pub fn prepare<R: Rng>(samples: &mut [Sample], rng: &mut R) -> Result<(Dataset, Bounds)> {
    if samples.is_empty() {
        return Err(PipelineErr::Ml(ml::MlErr::EmptyDataset));
    }

    samples.shuffle(rng);

    let inputs: Vec<f32> = samples.iter().map(|s| s.horsepower).collect();
    let labels: Vec<f32> = samples.iter().map(|s| s.mpg).collect();

    let (input_min, input_max) = min_max(&inputs);
    let (label_min, label_max) = min_max(&labels);

    if input_max == input_min {
        return Err(PipelineErr::DegenerateData {
            what: "horsepower",
            value: input_min,
        });
    }
    if label_max == label_min {
        return Err(PipelineErr::DegenerateData {
            what: "mpg",
            value: label_min,
        });
    }

    let bounds = Bounds {
        input_min,
        input_max,
        label_min,
        label_max,
    };

    let xs = inputs.iter().map(|&v| bounds.norm_input(v)).collect();
    let ys = labels.iter().map(|&v| bounds.norm_label(v)).collect();
    let dataset = Dataset::new(xs, ys, 1, 1)?;

    Ok((dataset, bounds))
}

fn min_max(values: &[f32]) -> (f32, f32) {
    values.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &v| {
        (min.min(v), max.max(v))
    })
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn two_sample_scenario() {
        let mut samples = vec![
            Sample {
                horsepower: 100.0,
                mpg: 20.0,
            },
            Sample {
                horsepower: 50.0,
                mpg: 30.0,
            },
        ];

        let (dataset, bounds) = prepare(&mut samples, &mut rng()).unwrap();

        assert_eq!(bounds.input_min, 50.0);
        assert_eq!(bounds.input_max, 100.0);
        assert_eq!(bounds.label_min, 20.0);
        assert_eq!(bounds.label_max, 30.0);

        // The shuffle decides which comes first, but the set is {0, 1}.
        let mut xs = dataset.xs().to_vec();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(xs, vec![0.0, 1.0]);
    }

    #[test]
    fn denormalize_inverts_normalize() {
        let mut samples: Vec<Sample> = (0..20)
            .map(|i| Sample {
                horsepower: 40.0 + 7.5 * i as f32,
                mpg: 9.0 + 1.25 * i as f32,
            })
            .collect();
        let originals = samples.clone();

        let (_, bounds) = prepare(&mut samples, &mut rng()).unwrap();

        for s in &originals {
            let hp = bounds.denorm_input(bounds.norm_input(s.horsepower));
            let mpg = bounds.denorm_label(bounds.norm_label(s.mpg));
            assert!((hp - s.horsepower).abs() < 1e-3);
            assert!((mpg - s.mpg).abs() < 1e-4);
        }
    }

    #[test]
    fn zero_range_is_rejected() {
        let mut samples = vec![
            Sample {
                horsepower: 95.0,
                mpg: 20.0,
            },
            Sample {
                horsepower: 95.0,
                mpg: 30.0,
            },
        ];

        let err = prepare(&mut samples, &mut rng()).unwrap_err();
        assert!(matches!(
            err,
            PipelineErr::DegenerateData {
                what: "horsepower",
                ..
            }
        ));
    }

    #[test]
    fn same_seed_same_shuffle() {
        let make = || -> Vec<Sample> {
            (0..50)
                .map(|i| Sample {
                    horsepower: 40.0 + i as f32,
                    mpg: 10.0 + (i % 7) as f32,
                })
                .collect()
        };

        let mut a = make();
        let mut b = make();
        prepare(&mut a, &mut StdRng::seed_from_u64(5)).unwrap();
        prepare(&mut b, &mut StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(a, b);
    }
}
