//! # Channel-to-QUBO Transformer
//!
//! Turns a MIMO decoding instance `y = H·v + n` into a spin-valued binary
//! quadratic model whose energy is the squared residual `‖y − H·v‖²`.
//!
//! For real spins `v`:
//!
//! ```text
//! ‖y − Hv‖² = yᴴy − 2·Σ_i Re(Hᴴy)_i v_i + Σ_i Σ_j Re(HᴴH)_ij v_i v_j
//!
//! linear     h_i  = −2·Re(Hᴴy)_i
//! quadratic  J_ij =  2·Re(HᴴH)_ij          (i < j)
//! offset          =  yᴴy + Σ_i Re(HᴴH)_ii  (v_i² = 1)
//! ```
//!
//! Complex alphabets are first rewritten as the real system
//! `[Re y; Im y] = [[Re H, −Im H], [Im H, Re H]]·[Re v; Im v]` and the
//! amplitude encoding of [`Modulation`] is folded into the channel, after
//! which the same expansion applies.
//!
//! ## Example
//!
//! ```rust
//! use comp_core::matrix::ChannelMatrix;
//! use comp_core::transform::ChannelToQubo;
//! use num_complex::Complex64;
//!
//! let h = ChannelMatrix::identity(2);
//! let y = vec![Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)];
//! let bqm = ChannelToQubo::default().transform(&h, &y).unwrap();
//! assert_eq!(bqm.quadratic(0, 1), 0.0);
//! assert_eq!(bqm.energy(&[1, -1]).unwrap(), 0.0);
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bqm::{BinaryQuadraticModel, Vartype};
use crate::error::{Error, Result};
use crate::matrix::{self, ChannelMatrix};
use crate::modulation::Modulation;

/// Transformer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Symbol alphabet of the transmitters.
    pub modulation: Modulation,
    /// Keep the `v`-independent constant so that energies equal the
    /// squared residual. Dropping it leaves the minimiser unchanged.
    pub keep_offset: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            modulation: Modulation::Bpsk,
            keep_offset: true,
        }
    }
}

/// Channel-to-QUBO transformer.
#[derive(Debug, Clone, Default)]
pub struct ChannelToQubo {
    config: TransformConfig,
}

impl ChannelToQubo {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn with_modulation(modulation: Modulation) -> Self {
        Self::new(TransformConfig {
            modulation,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Build the spin model for channel `h` and received vector `y`.
    pub fn transform(&self, h: &ChannelMatrix, y: &[Complex64]) -> Result<BinaryQuadraticModel> {
        validate(h, y)?;

        let modulation = self.config.modulation;
        let (h_eff, y_eff) = if modulation.is_complex() {
            let h_real = h.to_real_equivalent();
            let a = modulation.amplitude_matrix(h_real.cols());
            (h_real.mul_mat(&a)?, matrix::to_real_equivalent(y))
        } else {
            (h.clone(), y.to_vec())
        };

        let gram = h_eff.gram();
        let matched = h_eff.hermitian().mul_vec(&y_eff)?;
        let n = h_eff.cols();

        let mut bqm = BinaryQuadraticModel::new(n, Vartype::Spin);
        for (i, r) in matched.iter().enumerate() {
            bqm.add_linear(i, -2.0 * r.re)?;
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let g = gram.get(i, j).re;
                if g != 0.0 {
                    bqm.add_quadratic(i, j, 2.0 * g)?;
                }
            }
        }
        if self.config.keep_offset {
            let trace: f64 = (0..n).map(|i| gram.get(i, i).re).sum();
            bqm.add_offset(matrix::norm_sqr(&y_eff) + trace);
        }

        debug!(
            modulation = %modulation,
            receivers = h.rows(),
            transmitters = h.cols(),
            variables = bqm.num_variables(),
            interactions = bqm.num_interactions(),
            "built spin-encoded MIMO model"
        );
        Ok(bqm)
    }

    /// Map a spin assignment of the model back to transmitted symbols.
    pub fn decode(&self, spins: &[i8], num_transmitters: usize) -> Result<Vec<Complex64>> {
        self.config.modulation.spins_to_symbols(spins, num_transmitters)
    }

    /// Spin assignment that encodes `symbols`.
    pub fn encode(&self, symbols: &[Complex64]) -> Result<Vec<i8>> {
        self.config.modulation.symbols_to_spins(symbols)
    }
}

/// BPSK model with the offset kept.
pub fn spin_encoded_mimo(h: &ChannelMatrix, y: &[Complex64]) -> Result<BinaryQuadraticModel> {
    ChannelToQubo::default().transform(h, y)
}

/// Squared residual `‖y − H·v‖²`.
pub fn squared_error(h: &ChannelMatrix, y: &[Complex64], v: &[Complex64]) -> Result<f64> {
    validate(h, y)?;
    let hv = h.mul_vec(v)?;
    Ok(y.iter().zip(&hv).map(|(a, b)| (a - b).norm_sqr()).sum())
}

fn validate(h: &ChannelMatrix, y: &[Complex64]) -> Result<()> {
    if h.is_empty() {
        return Err(Error::InvalidInput(format!(
            "channel matrix is empty ({}x{})",
            h.rows(),
            h.cols()
        )));
    }
    if h.rows() != y.len() {
        return Err(Error::shape("received vector", h.rows(), y.len()));
    }
    if !h.is_finite() || !matrix::is_finite(y) {
        return Err(Error::InvalidInput("non-finite entry in channel or received vector".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn real(v: &[f64]) -> Vec<Complex64> {
        v.iter().map(|&x| c(x, 0.0)).collect()
    }

    fn all_spins(n: usize) -> impl Iterator<Item = Vec<i8>> {
        (0..1usize << n).map(move |bits| {
            (0..n).map(|i| if bits >> i & 1 == 1 { 1 } else { -1 }).collect()
        })
    }

    #[test]
    fn test_identity_channel_has_no_cross_terms() {
        let h = ChannelMatrix::identity(2);
        let y = real(&[1.0, -1.0]);
        let bqm = spin_encoded_mimo(&h, &y).unwrap();

        assert_eq!(bqm.quadratic(0, 1), 0.0);
        assert_eq!(bqm.num_interactions(), 0);
        assert_eq!(bqm.linear(0), -2.0);
        assert_eq!(bqm.linear(1), 2.0);

        let best = all_spins(2)
            .min_by(|a, b| bqm.energy(a).unwrap().total_cmp(&bqm.energy(b).unwrap()))
            .unwrap();
        assert_eq!(best, vec![1, -1]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let h = ChannelMatrix::zeros(3, 2);
        let err = spin_encoded_mimo(&h, &real(&[1.0, 1.0])).unwrap_err();
        assert_eq!(
            err,
            Error::ShapeMismatch { context: "received vector", expected: 3, actual: 2 }
        );
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        let empty = ChannelMatrix::zeros(0, 0);
        assert!(matches!(spin_encoded_mimo(&empty, &[]), Err(Error::InvalidInput(_))));

        let h = ChannelMatrix::identity(2);
        let y = vec![c(f64::NAN, 0.0), c(1.0, 0.0)];
        assert!(matches!(spin_encoded_mimo(&h, &y), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_energy_equals_squared_error() {
        let h = ChannelMatrix::new(
            3,
            2,
            vec![c(0.8, 0.2), c(-0.3, 0.5), c(0.1, -0.4), c(0.9, 0.1), c(0.4, 0.4), c(-0.6, 0.2)],
        )
        .unwrap();
        let y = vec![c(0.3, -0.2), c(1.1, 0.7), c(-0.5, 0.05)];
        let bqm = spin_encoded_mimo(&h, &y).unwrap();
        for s in all_spins(2) {
            let v: Vec<Complex64> = s.iter().map(|&x| c(f64::from(x), 0.0)).collect();
            let expected = squared_error(&h, &y, &v).unwrap();
            assert!((bqm.energy(&s).unwrap() - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_drop_offset_keeps_minimiser() {
        let h = ChannelMatrix::from_real(2, 2, &[1.0, 0.4, -0.2, 0.7]).unwrap();
        let y = real(&[0.9, -1.3]);
        let kept = spin_encoded_mimo(&h, &y).unwrap();
        let dropped = ChannelToQubo::new(TransformConfig { keep_offset: false, ..Default::default() })
            .transform(&h, &y)
            .unwrap();
        assert_eq!(dropped.offset(), 0.0);
        for s in all_spins(2) {
            let diff = kept.energy(&s).unwrap() - dropped.energy(&s).unwrap();
            assert!((diff - kept.offset()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_qpsk_noiseless_ground_state() {
        let h = ChannelMatrix::new(2, 2, vec![c(0.7, -0.3), c(0.4, 0.6), c(-0.2, 0.8), c(0.5, -0.1)])
            .unwrap();
        let tx = vec![c(1.0, -1.0), c(-1.0, -1.0)];
        let y = h.mul_vec(&tx).unwrap();
        let transformer = ChannelToQubo::with_modulation(Modulation::Qpsk);
        let bqm = transformer.transform(&h, &y).unwrap();
        assert_eq!(bqm.num_variables(), 4);

        let truth = transformer.encode(&tx).unwrap();
        assert!(bqm.energy(&truth).unwrap().abs() < 1e-10);
        for s in all_spins(4) {
            assert!(bqm.energy(&s).unwrap() >= -1e-10);
        }
        assert_eq!(transformer.decode(&truth, 2).unwrap(), tx);
    }

    #[test]
    fn test_16qam_energy_equals_squared_error() {
        let h = ChannelMatrix::new(1, 1, vec![c(0.6, 0.3)]).unwrap();
        let y = vec![c(1.7, -0.4)];
        let transformer = ChannelToQubo::with_modulation(Modulation::Qam16);
        let bqm = transformer.transform(&h, &y).unwrap();
        for s in all_spins(4) {
            let v = transformer.decode(&s, 1).unwrap();
            let expected = squared_error(&h, &y, &v).unwrap();
            assert!((bqm.energy(&s).unwrap() - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_64qam_energy_equals_squared_error() {
        let h = ChannelMatrix::new(2, 1, vec![c(0.5, -0.2), c(0.1, 0.4)]).unwrap();
        let y = vec![c(2.3, -3.1), c(-1.2, 0.6)];
        let transformer = ChannelToQubo::with_modulation(Modulation::Qam64);
        let bqm = transformer.transform(&h, &y).unwrap();
        assert_eq!(bqm.num_variables(), 6);
        for s in all_spins(6) {
            let v = transformer.decode(&s, 1).unwrap();
            let expected = squared_error(&h, &y, &v).unwrap();
            assert!((bqm.energy(&s).unwrap() - expected).abs() < 1e-9);
        }

        let tx = vec![c(-5.0, 7.0)];
        let noiseless = h.mul_vec(&tx).unwrap();
        let bqm = transformer.transform(&h, &noiseless).unwrap();
        let truth = transformer.encode(&tx).unwrap();
        assert!(bqm.energy(&truth).unwrap().abs() < 1e-9);
    }
}
