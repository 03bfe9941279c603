//! Synthetic project data for demos and tests

use crate::types::{Dataset, ProjectRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates projects with metrics drawn uniformly from typical ranges:
/// CO2 100-1000, energy 10-50, jobs 10-99, social 1-10, governance 5-10,
/// investment 1-10.
#[derive(Debug, Clone, Default)]
pub struct SampleGenerator {
    seed: Option<u64>,
}

impl SampleGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// `n` projects named `Project 1` .. `Project n`
    pub fn generate(&self, n: usize) -> Dataset {
        let projects = match self.seed {
            Some(seed) => draw(&mut StdRng::seed_from_u64(seed), n),
            None => draw(&mut rand::rng(), n),
        };
        Dataset::new(projects)
    }
}

fn draw<R: Rng>(rng: &mut R, n: usize) -> Vec<ProjectRecord> {
    (0..n)
        .map(|i| ProjectRecord {
            name: format!("Project {}", i + 1),
            co2_reduction: rng.random_range(100.0..1000.0),
            energy_savings: rng.random_range(10.0..50.0),
            job_creation: rng.random_range(10..100),
            social_impact: rng.random_range(1.0..10.0),
            governance_score: rng.random_range(5.0..10.0),
            investment: rng.random_range(1.0..10.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_values_in_range() {
        let data = SampleGenerator::seeded(42).generate(50);
        assert_eq!(data.len(), 50);
        assert!(data.validate().is_ok());

        for p in data.iter() {
            assert!((100.0..1000.0).contains(&p.co2_reduction));
            assert!((10.0..50.0).contains(&p.energy_savings));
            assert!((10..100).contains(&p.job_creation));
            assert!((1.0..10.0).contains(&p.social_impact));
            assert!((5.0..10.0).contains(&p.governance_score));
            assert!((1.0..10.0).contains(&p.investment));
        }
        assert_eq!(data.projects()[0].name, "Project 1");
        assert_eq!(data.projects()[49].name, "Project 50");
    }

    #[test]
    fn test_seed_reproduces_dataset() {
        assert_eq!(SampleGenerator::seeded(7).generate(10), SampleGenerator::seeded(7).generate(10));
        assert_ne!(SampleGenerator::seeded(7).generate(10), SampleGenerator::seeded(8).generate(10));
    }

    #[test]
    fn test_zero_projects() {
        assert!(SampleGenerator::new(None).generate(0).is_empty());
    }
}
