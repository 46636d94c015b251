//! Decoder comparison
//!
//! Scores decoded symbols against the transmitted ones and runs the
//! side-by-side comparison of BQM samplers and linear filters over a set
//! of decoding instances supplied by the caller.

use std::collections::{BTreeMap, BTreeSet};

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::filters::{self, FilterMethod};
use crate::matrix::ChannelMatrix;
use crate::solver::Sampler;
use crate::transform::ChannelToQubo;

/// Fewest instances a comparison accepts.
pub const MIN_RUNS: usize = 3;

/// Percentage (rounded to the nearest integer) of positions where
/// `decoded` matches `transmitted`.
pub fn success_rate<T: PartialEq>(decoded: &[T], transmitted: &[T]) -> Result<u32> {
    if decoded.len() != transmitted.len() {
        return Err(Error::shape("success_rate", transmitted.len(), decoded.len()));
    }
    if transmitted.is_empty() {
        return Err(Error::InvalidInput("no transmitted symbols to compare".into()));
    }
    let matches = decoded.iter().zip(transmitted).filter(|(a, b)| a == b).count();
    Ok((100.0 * matches as f64 / transmitted.len() as f64).round() as u32)
}

/// Success rate of every named decoding.
pub fn compare_signals<T: PartialEq>(
    decoded: &BTreeMap<String, Vec<T>>,
    transmitted: &[T],
) -> Result<BTreeMap<String, u32>> {
    decoded
        .iter()
        .map(|(name, v)| success_rate(v, transmitted).map(|r| (name.clone(), r)))
        .collect()
}

/// One decoding problem with known ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub channel: ChannelMatrix,
    pub received: Vec<Complex64>,
    pub transmitted: Vec<Complex64>,
}

impl Instance {
    /// Noiseless instance `y = H·v`.
    pub fn noiseless(channel: ChannelMatrix, transmitted: Vec<Complex64>) -> Result<Self> {
        let received = channel.mul_vec(&transmitted)?;
        Ok(Self { channel, received, transmitted })
    }

    /// Instance with additive noise `y = H·v + n`.
    pub fn with_noise(channel: ChannelMatrix, transmitted: Vec<Complex64>, noise: &[Complex64]) -> Result<Self> {
        let mut received = channel.mul_vec(&transmitted)?;
        if noise.len() != received.len() {
            return Err(Error::shape("Instance::with_noise", received.len(), noise.len()));
        }
        for (r, n) in received.iter_mut().zip(noise) {
            *r += n;
        }
        Ok(Self { channel, received, transmitted })
    }
}

/// Per-method success rates, one entry per instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub results: BTreeMap<String, Vec<u32>>,
}

impl ComparisonReport {
    pub fn runs(&self, method: &str) -> Option<&[u32]> {
        self.results.get(method).map(Vec::as_slice)
    }

    /// Mean success rate of `method` over all runs.
    pub fn mean(&self, method: &str) -> Option<f64> {
        let runs = self.results.get(method)?;
        if runs.is_empty() {
            return None;
        }
        Some(runs.iter().map(|&r| f64::from(r)).sum::<f64>() / runs.len() as f64)
    }

    fn record(&mut self, method: &str, rate: u32) {
        self.results.entry(method.to_string()).or_default().push(rate);
    }
}

/// Runs samplers on the BQM and linear filters on each instance.
///
/// Results are reported under each sampler's label (its name unless given
/// with [`Comparison::labeled_sampler`]) and each filter's name; labels
/// must be unique.
pub struct Comparison {
    transformer: ChannelToQubo,
    samplers: Vec<(String, Box<dyn Sampler + Send + Sync>)>,
    filters: Vec<FilterMethod>,
    snr_over_nt: f64,
    seed: u64,
    runs: Option<usize>,
}

impl Comparison {
    pub fn new(transformer: ChannelToQubo) -> Self {
        Self {
            transformer,
            samplers: Vec::new(),
            filters: Vec::new(),
            snr_over_nt: f64::INFINITY,
            seed: 0,
            runs: None,
        }
    }

    pub fn sampler(self, sampler: impl Sampler + Send + Sync + 'static) -> Self {
        let label = sampler.name().to_string();
        self.labeled_sampler(label, sampler)
    }

    /// Add a sampler reported under `label`.
    pub fn labeled_sampler(
        mut self,
        label: impl Into<String>,
        sampler: impl Sampler + Send + Sync + 'static,
    ) -> Self {
        self.samplers.push((label.into(), Box::new(sampler)));
        self
    }

    pub fn filters(mut self, methods: &[FilterMethod]) -> Self {
        self.filters = methods.to_vec();
        self
    }

    /// SNR per transmitter used by the MMSE filter.
    pub fn snr_over_nt(mut self, snr: f64) -> Self {
        self.snr_over_nt = snr;
        self
    }

    /// Seed for breaking filter-decision ties.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Require exactly `runs` instances.
    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = Some(runs);
        self
    }

    fn check_labels(&self) -> Result<()> {
        let labels = self
            .samplers
            .iter()
            .map(|(label, _)| label.as_str())
            .chain(self.filters.iter().map(|m| m.name()));
        let mut seen = BTreeSet::new();
        for label in labels {
            if !seen.insert(label) {
                return Err(Error::InvalidParameter(format!("duplicate decoder label {}", label)));
            }
        }
        Ok(())
    }

    pub fn run(&self, instances: &[Instance]) -> Result<ComparisonReport> {
        if instances.len() < MIN_RUNS {
            return Err(Error::InvalidParameter(format!(
                "minimum supported runs is {}; got {}",
                MIN_RUNS,
                instances.len()
            )));
        }
        if let Some(runs) = self.runs {
            if instances.len() != runs {
                return Err(Error::InvalidParameter(format!(
                    "configured for {} runs; got {} instances",
                    runs,
                    instances.len()
                )));
            }
        }
        self.check_labels()?;
        let modulation = self.transformer.config().modulation;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut report = ComparisonReport::default();

        for (run, inst) in instances.iter().enumerate() {
            let nt = inst.channel.cols();
            if inst.transmitted.len() != nt {
                return Err(Error::shape("Instance::transmitted", nt, inst.transmitted.len()));
            }

            let bqm = self.transformer.transform(&inst.channel, &inst.received)?;
            for (label, sampler) in &self.samplers {
                let set = sampler.sample(&bqm)?;
                let best = set
                    .first()
                    .ok_or_else(|| Error::InvalidInput(format!("{} returned no samples", label)))?;
                let decoded = self.transformer.decode(&best.values, nt)?;
                report.record(label, success_rate(&decoded, &inst.transmitted)?);
            }

            for &method in &self.filters {
                let w = filters::linear_filter(&inst.channel, method, self.snr_over_nt)?;
                let decoded = filters::decide_symbols(&w, &inst.received, modulation, &mut rng)?;
                report.record(method.name(), success_rate(&decoded, &inst.transmitted)?);
            }
            debug!(run, transmitters = nt, variables = bqm.num_variables(), "comparison run complete");
        }

        for (method, runs) in &report.results {
            info!(
                method = %method,
                runs = runs.len(),
                mean_success = report.mean(method).unwrap_or(0.0),
                "decoded with average success rate"
            );
        }
        Ok(report)
    }
}
