//! # Reference Samplers
//!
//! Classical minimisers for [`BinaryQuadraticModel`]s. The production
//! solver for large CoMP instances is an external annealer; these exist to
//! verify models and to serve as baselines.
//!
//! - [`ExactSolver`]: Gray-code enumeration of every assignment.
//! - [`SimulatedAnnealing`]: Metropolis single-flip sweeps over a geometric
//!   inverse-temperature schedule. Reads run in parallel with the
//!   `parallel` feature.
//!
//! ## Example
//!
//! ```rust
//! use comp_core::bqm::BinaryQuadraticModel;
//! use comp_core::solver::{ExactSolver, Sampler};
//!
//! let bqm = BinaryQuadraticModel::from_ising(vec![1.0, -1.0], vec![(0, 1, 0.5)], 0.0).unwrap();
//! let result = ExactSolver::default().sample(&bqm).unwrap();
//! assert_eq!(result.first().unwrap().values, vec![-1, 1]);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bqm::{BinaryQuadraticModel, Vartype};
use crate::error::{Error, Result};

/// Largest model [`ExactSolver`] will enumerate.
pub const MAX_EXACT_VARIABLES: usize = 20;

/// One assignment and its energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub values: Vec<i8>,
    pub energy: f64,
}

/// Samples ordered by ascending energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    vartype: Vartype,
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new(vartype: Vartype, mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.energy.total_cmp(&b.energy));
        Self { vartype, samples }
    }

    pub fn vartype(&self) -> Vartype {
        self.vartype
    }

    /// Lowest-energy sample.
    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Convert every sample to `vartype` (`s = 2x - 1`).
    pub fn change_vartype(self, vartype: Vartype) -> Self {
        if self.vartype == vartype {
            return self;
        }
        let samples = self
            .samples
            .into_iter()
            .map(|s| Sample {
                values: s
                    .values
                    .iter()
                    .map(|&v| match vartype {
                        Vartype::Spin => 2 * v - 1,
                        Vartype::Binary => (v + 1) / 2,
                    })
                    .collect(),
                energy: s.energy,
            })
            .collect();
        Self { vartype, samples }
    }
}

/// Something that minimises a binary quadratic model.
pub trait Sampler {
    fn name(&self) -> &str;

    fn sample(&self, bqm: &BinaryQuadraticModel) -> Result<SampleSet>;
}

/// Brute-force enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExactSolver {
    /// How many of the lowest-energy assignments to return.
    pub num_best: usize,
}

impl Default for ExactSolver {
    fn default() -> Self {
        Self { num_best: 16 }
    }
}

impl Sampler for ExactSolver {
    fn name(&self) -> &str {
        "exact"
    }

    fn sample(&self, bqm: &BinaryQuadraticModel) -> Result<SampleSet> {
        let n = bqm.num_variables();
        if n > MAX_EXACT_VARIABLES {
            return Err(Error::ProblemTooLarge {
                variables: n,
                max: MAX_EXACT_VARIABLES,
            });
        }
        let vartype = bqm.vartype();
        let [low, high] = vartype.values();
        let adj = bqm.adjacency();

        let mut state = vec![low; n];
        let mut energy = bqm.energy_unchecked(&state);
        let mut visited: Vec<(f64, u32)> = Vec::with_capacity(1 << n);
        visited.push((energy, 0));

        for k in 1u32..(1u32 << n) {
            let i = k.trailing_zeros() as usize;
            energy += flip_delta(bqm, &adj, &state, i);
            state[i] = if state[i] == low { high } else { low };
            visited.push((energy, k ^ (k >> 1)));
        }

        visited.sort_by(|a, b| a.0.total_cmp(&b.0));
        let samples = visited
            .into_iter()
            .take(self.num_best.max(1))
            .map(|(_, code)| {
                let values: Vec<i8> = (0..n)
                    .map(|i| if code >> i & 1 == 1 { high } else { low })
                    .collect();
                let energy = bqm.energy_unchecked(&values);
                Sample { values, energy }
            })
            .collect();

        let set = SampleSet::new(vartype, samples);
        debug!(
            variables = n,
            ground_energy = set.first().map(|s| s.energy),
            "exact enumeration complete"
        );
        Ok(set)
    }
}

/// Simulated annealing sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedAnnealing {
    /// Independent annealing runs.
    pub num_reads: usize,
    /// Full sweeps over all variables per read.
    pub num_sweeps: usize,
    /// Inverse temperature `(hot, cold)`; derived from the biases when unset.
    pub beta_range: Option<(f64, f64)>,
    /// Base seed; read `r` uses `seed + r`.
    pub seed: Option<u64>,
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self {
            num_reads: 10,
            num_sweeps: 1000,
            beta_range: None,
            seed: None,
        }
    }
}

impl SimulatedAnnealing {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Default schedule endpoints: the largest single-flip energy change is
    /// accepted with probability 1/2 at the hot end, the smallest with 1/100
    /// at the cold end.
    pub fn default_beta_range(bqm: &BinaryQuadraticModel) -> (f64, f64) {
        let adj = bqm.adjacency();
        let max_delta = (0..bqm.num_variables())
            .map(|i| 2.0 * (bqm.linear(i).abs() + adj[i].iter().map(|(_, b)| b.abs()).sum::<f64>()))
            .fold(0.0, f64::max);
        let min_delta = bqm
            .linear_biases()
            .iter()
            .copied()
            .chain(bqm.interactions().map(|t| t.bias))
            .map(f64::abs)
            .filter(|b| *b > 0.0)
            .fold(f64::INFINITY, f64::min)
            * 2.0;

        if max_delta == 0.0 || !min_delta.is_finite() {
            return (0.1, 1.0);
        }
        let hot = std::f64::consts::LN_2 / max_delta;
        let cold = (100.0f64).ln() / min_delta;
        (hot, cold.max(hot))
    }

    fn schedule(&self, bqm: &BinaryQuadraticModel) -> Result<Vec<f64>> {
        let (hot, cold) = self.beta_range.unwrap_or_else(|| Self::default_beta_range(bqm));
        if !(hot > 0.0 && cold >= hot && cold.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "beta range must satisfy 0 < hot <= cold, got ({}, {})",
                hot, cold
            )));
        }
        let steps = self.num_sweeps.max(1);
        if steps == 1 {
            return Ok(vec![cold]);
        }
        let ratio = (cold / hot).powf(1.0 / (steps - 1) as f64);
        Ok((0..steps).map(|k| hot * ratio.powi(k as i32)).collect())
    }

    fn anneal(bqm: &BinaryQuadraticModel, adj: &[Vec<(usize, f64)>], betas: &[f64], seed: u64) -> Sample {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = bqm.num_variables();
        let mut spins: Vec<i8> = (0..n).map(|_| if rng.gen_bool(0.5) { 1 } else { -1 }).collect();

        for &beta in betas {
            for i in 0..n {
                let delta = flip_delta(bqm, adj, &spins, i);
                if delta <= 0.0 || rng.gen::<f64>() < (-beta * delta).exp() {
                    spins[i] = -spins[i];
                }
            }
        }

        let energy = bqm.energy_unchecked(&spins);
        Sample { values: spins, energy }
    }
}

impl Sampler for SimulatedAnnealing {
    fn name(&self) -> &str {
        "simulated_annealing"
    }

    fn sample(&self, bqm: &BinaryQuadraticModel) -> Result<SampleSet> {
        if self.num_reads == 0 {
            return Err(Error::InvalidParameter("num_reads must be at least 1".into()));
        }
        let spin = bqm.to_spin();
        let adj = spin.adjacency();
        let betas = self.schedule(&spin)?;
        let base = self.seed.unwrap_or_else(rand::random);

        #[cfg(feature = "parallel")]
        let samples: Vec<Sample> = (0..self.num_reads)
            .into_par_iter()
            .map(|r| Self::anneal(&spin, &adj, &betas, base.wrapping_add(r as u64)))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let samples: Vec<Sample> = (0..self.num_reads)
            .map(|r| Self::anneal(&spin, &adj, &betas, base.wrapping_add(r as u64)))
            .collect();

        let set = SampleSet::new(Vartype::Spin, samples).change_vartype(bqm.vartype());
        debug!(
            variables = bqm.num_variables(),
            reads = self.num_reads,
            sweeps = self.num_sweeps,
            best_energy = set.first().map(|s| s.energy),
            "simulated annealing complete"
        );
        Ok(set)
    }
}

/// Energy change from flipping variable `i` of `state`.
fn flip_delta(bqm: &BinaryQuadraticModel, adj: &[Vec<(usize, f64)>], state: &[i8], i: usize) -> f64 {
    let field: f64 = bqm.linear(i)
        + adj[i]
            .iter()
            .map(|&(j, b)| b * f64::from(state[j]))
            .sum::<f64>();
    match bqm.vartype() {
        Vartype::Spin => -2.0 * f64::from(state[i]) * field,
        Vartype::Binary => f64::from(1 - 2 * state[i]) * field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustrated_chain() -> BinaryQuadraticModel {
        BinaryQuadraticModel::from_ising(
            vec![0.2, -0.5, 0.1, 0.4, -0.3],
            vec![(0, 1, 1.0), (1, 2, -0.8), (2, 3, 0.6), (3, 4, -1.2), (0, 4, 0.7), (1, 3, 0.3)],
            1.5,
        )
        .unwrap()
    }

    fn brute_force_min(bqm: &BinaryQuadraticModel) -> f64 {
        let n = bqm.num_variables();
        let [low, high] = bqm.vartype().values();
        (0..1usize << n)
            .map(|bits| {
                let s: Vec<i8> = (0..n).map(|i| if bits >> i & 1 == 1 { high } else { low }).collect();
                bqm.energy(&s).unwrap()
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_exact_finds_ground_state() {
        let bqm = frustrated_chain();
        let set = ExactSolver::default().sample(&bqm).unwrap();
        let best = set.first().unwrap();
        assert!((best.energy - brute_force_min(&bqm)).abs() < 1e-12);
        assert!((bqm.energy(&best.values).unwrap() - best.energy).abs() < 1e-12);
    }

    #[test]
    fn test_exact_samples_sorted_and_complete() {
        let bqm = frustrated_chain();
        let set = ExactSolver { num_best: 100 }.sample(&bqm).unwrap();
        assert_eq!(set.len(), 32);
        for w in set.samples().windows(2) {
            assert!(w[0].energy <= w[1].energy);
        }
    }

    #[test]
    fn test_exact_binary_model() {
        let bqm = frustrated_chain().to_binary();
        let set = ExactSolver::default().sample(&bqm).unwrap();
        assert_eq!(set.vartype(), Vartype::Binary);
        assert!((set.first().unwrap().energy - brute_force_min(&bqm)).abs() < 1e-12);
    }

    #[test]
    fn test_exact_too_large() {
        let bqm = BinaryQuadraticModel::new(MAX_EXACT_VARIABLES + 1, Vartype::Spin);
        assert_eq!(
            ExactSolver::default().sample(&bqm).unwrap_err(),
            Error::ProblemTooLarge { variables: 21, max: 20 }
        );
    }

    #[test]
    fn test_annealing_reaches_ground_state() {
        let bqm = frustrated_chain();
        let sa = SimulatedAnnealing { num_reads: 8, num_sweeps: 200, ..Default::default() }.with_seed(11);
        let set = sa.sample(&bqm).unwrap();
        assert_eq!(set.len(), 8);
        assert!((set.first().unwrap().energy - brute_force_min(&bqm)).abs() < 1e-12);
    }

    #[test]
    fn test_annealing_is_deterministic_with_seed() {
        let bqm = frustrated_chain();
        let sa = SimulatedAnnealing { num_reads: 4, num_sweeps: 50, ..Default::default() }.with_seed(5);
        assert_eq!(sa.sample(&bqm).unwrap(), sa.sample(&bqm).unwrap());
    }

    #[test]
    fn test_annealing_binary_model_returns_binary_values() {
        let bqm = frustrated_chain().to_binary();
        let sa = SimulatedAnnealing { num_reads: 4, num_sweeps: 200, ..Default::default() }.with_seed(2);
        let set = sa.sample(&bqm).unwrap();
        assert_eq!(set.vartype(), Vartype::Binary);
        let best = set.first().unwrap();
        assert!(best.values.iter().all(|&v| v == 0 || v == 1));
        assert!((bqm.energy(&best.values).unwrap() - best.energy).abs() < 1e-9);
    }

    #[test]
    fn test_annealing_rejects_bad_parameters() {
        let bqm = frustrated_chain();
        let zero_reads = SimulatedAnnealing { num_reads: 0, ..Default::default() };
        assert!(matches!(zero_reads.sample(&bqm), Err(Error::InvalidParameter(_))));
        let inverted = SimulatedAnnealing { beta_range: Some((2.0, 1.0)), ..Default::default() };
        assert!(matches!(inverted.sample(&bqm), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_default_beta_range_ordering() {
        let (hot, cold) = SimulatedAnnealing::default_beta_range(&frustrated_chain());
        assert!(hot > 0.0 && cold > hot);
        let empty = BinaryQuadraticModel::new(3, Vartype::Spin);
        assert_eq!(SimulatedAnnealing::default_beta_range(&empty), (0.1, 1.0));
    }
}
