//! Classical linear MIMO decoders
//!
//! Each decoder is a filter matrix `W` (transmitters x receivers) applied
//! to the received vector, followed by a hard BPSK decision:
//!
//! ```text
//! matched filter : W = Hᴴ
//! zero-forcing   : W = pinv(H)
//! MMSE           : W = Hᴴ pinv(H Hᴴ + I / (SNR/Nt))
//! v̂ = sign(Re(W·y))
//! ```
//!
//! A transmitter with no path to any receiver yields an exact zero; its
//! decision is drawn uniformly from `{+1, −1}`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::matrix::ChannelMatrix;
use crate::modulation::Modulation;

/// Linear filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterMethod {
    #[serde(rename = "matched_filter")]
    MatchedFilter,
    #[serde(rename = "zero_forcing")]
    ZeroForcing,
    #[serde(rename = "MMSE")]
    Mmse,
}

impl FilterMethod {
    pub const ALL: [FilterMethod; 3] = [
        FilterMethod::MatchedFilter,
        FilterMethod::ZeroForcing,
        FilterMethod::Mmse,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterMethod::MatchedFilter => "matched_filter",
            FilterMethod::ZeroForcing => "zero_forcing",
            FilterMethod::Mmse => "MMSE",
        }
    }
}

impl fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FilterMethod::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::UnsupportedFilter(s.to_string()))
    }
}

/// Matched filter `Hᴴ`.
pub fn matched_filter(h: &ChannelMatrix) -> ChannelMatrix {
    h.hermitian()
}

/// Zero-forcing filter, the Moore-Penrose pseudo-inverse of `H`.
///
/// Transmitters with no path to any receiver get an all-zero filter row.
pub fn zero_forcing(h: &ChannelMatrix) -> Result<ChannelMatrix> {
    h.pseudo_inverse().map_err(|e| match e {
        Error::SingularMatrix(_) => Error::SingularMatrix("zero-forcing filter"),
        other => other,
    })
}

/// MMSE filter `Hᴴ·pinv(H Hᴴ + I/snr)` for a per-transmitter SNR.
///
/// `f64::INFINITY` gives the noiseless limit `Hᴴ·pinv(H Hᴴ) = pinv(H)`,
/// which is computed directly.
pub fn mmse(h: &ChannelMatrix, snr_over_nt: f64) -> Result<ChannelMatrix> {
    if snr_over_nt.is_nan() || snr_over_nt <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "SNR/Nt must be positive, got {}",
            snr_over_nt
        )));
    }
    let singular = |e: Error| match e {
        Error::SingularMatrix(_) => Error::SingularMatrix("MMSE filter"),
        other => other,
    };
    if snr_over_nt.is_infinite() {
        return h.pseudo_inverse().map_err(singular);
    }
    let hh = h.hermitian();
    let regularised = hh
        .gram()
        .add_diagonal(Complex64::new(1.0 / snr_over_nt, 0.0))?;
    hh.mul_mat(&regularised.pseudo_inverse().map_err(singular)?)
}

/// Build the filter matrix for `method`.
pub fn linear_filter(h: &ChannelMatrix, method: FilterMethod, snr_over_nt: f64) -> Result<ChannelMatrix> {
    let w = match method {
        FilterMethod::MatchedFilter => matched_filter(h),
        FilterMethod::ZeroForcing => zero_forcing(h)?,
        FilterMethod::Mmse => mmse(h, snr_over_nt)?,
    };
    debug!(method = %method, rows = w.rows(), cols = w.cols(), "created linear filter");
    Ok(w)
}

/// Build one filter per requested method.
pub fn create_filters(
    h: &ChannelMatrix,
    methods: &[FilterMethod],
    snr_over_nt: f64,
) -> Result<BTreeMap<FilterMethod, ChannelMatrix>> {
    methods
        .iter()
        .map(|&m| linear_filter(h, m, snr_over_nt).map(|w| (m, w)))
        .collect()
}

/// Hard BPSK decisions `sign(Re(W·y))`, zeros resolved with `rng`.
pub fn apply_filter<R: Rng + ?Sized>(w: &ChannelMatrix, y: &[Complex64], rng: &mut R) -> Result<Vec<i8>> {
    let estimate = w.mul_vec(y)?;
    Ok(estimate
        .iter()
        .map(|z| {
            if z.re > 0.0 {
                1
            } else if z.re < 0.0 {
                -1
            } else if rng.gen_bool(0.5) {
                1
            } else {
                -1
            }
        })
        .collect())
}

/// Hard symbol decisions for any square alphabet: each real dimension of
/// `W·y` is sliced to the nearest amplitude level, ties broken with `rng`.
/// BPSK decisions ignore the imaginary part.
pub fn decide_symbols<R: Rng + ?Sized>(
    w: &ChannelMatrix,
    y: &[Complex64],
    modulation: Modulation,
    rng: &mut R,
) -> Result<Vec<Complex64>> {
    let estimate = w.mul_vec(y)?;
    let mut slice = |x: f64| {
        modulation.slice_level(x).unwrap_or_else(|| {
            let mid = x.round();
            if rng.gen_bool(0.5) {
                mid + 1.0
            } else {
                mid - 1.0
            }
        })
    };
    Ok(estimate
        .iter()
        .map(|z| {
            let re = slice(z.re);
            let im = if modulation.is_complex() { slice(z.im) } else { 0.0 };
            Complex64::new(re, im)
        })
        .collect())
}

/// Apply every filter in `filters` to `y`.
pub fn apply_filters<R: Rng + ?Sized>(
    filters: &BTreeMap<FilterMethod, ChannelMatrix>,
    y: &[Complex64],
    rng: &mut R,
) -> Result<BTreeMap<FilterMethod, Vec<i8>>> {
    filters
        .iter()
        .map(|(&m, w)| apply_filter(w, y, rng).map(|v| (m, v)))
        .collect()
}
