//! Complex matrix helpers for MIMO channels
//!
//! Small, dense, row-major complex matrices. Channel matrices in a CoMP
//! network are a few hundred entries wide at most, so everything here is
//! straightforward O(n³) arithmetic without a BLAS backend.
//!
//! ## Example
//!
//! ```rust
//! use comp_core::matrix::ChannelMatrix;
//! use num_complex::Complex64;
//!
//! let h = ChannelMatrix::identity(2);
//! let x = vec![Complex64::new(1.0, 0.0), Complex64::new(-1.0, 0.0)];
//! let y = h.mul_vec(&x).unwrap();
//! assert_eq!(y, x);
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Pivot magnitude below which a matrix is treated as singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Relative pivot magnitude below which a row counts as dependent.
const RANK_EPS: f64 = 1e-10;

/// Channel matrix (rows = receive antennas, cols = transmit antennas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMatrix {
    rows: usize,
    cols: usize,
    /// Flat storage, row-major.
    data: Vec<Complex64>,
}

impl ChannelMatrix {
    /// Create from flat row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<Complex64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::shape("ChannelMatrix::new", rows * cols, data.len()));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create from a real-valued row-major slice.
    pub fn from_real(rows: usize, cols: usize, data: &[f64]) -> Result<Self> {
        Self::new(rows, cols, data.iter().map(|&v| Complex64::new(v, 0.0)).collect())
    }

    /// Create from nested rows. All rows must have equal length.
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::shape("ChannelMatrix::from_rows", cols, row.len()));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![ZERO; rows * cols] }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = ONE;
        }
        m
    }

    /// Number of receive antennas.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of transmit antennas.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Get element H[r][c].
    pub fn get(&self, r: usize, c: usize) -> Complex64 {
        self.data[r * self.cols + c]
    }

    /// Set element H[r][c].
    pub fn set(&mut self, r: usize, c: usize, val: Complex64) {
        self.data[r * self.cols + c] = val;
    }

    /// True when every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|z| z.re.is_finite() && z.im.is_finite())
    }

    /// True when every entry has a zero imaginary part.
    pub fn is_real(&self) -> bool {
        self.data.iter().all(|z| z.im == 0.0)
    }

    /// Compute H^H (conjugate transpose).
    pub fn hermitian(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.get(r, c).conj();
            }
        }
        out
    }

    /// Multiply every entry by a scalar.
    pub fn scale(&self, factor: Complex64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&z| z * factor).collect(),
        }
    }

    /// Matrix-vector multiply: H * x.
    pub fn mul_vec(&self, x: &[Complex64]) -> Result<Vec<Complex64>> {
        if x.len() != self.cols {
            return Err(Error::shape("ChannelMatrix::mul_vec", self.cols, x.len()));
        }
        let mut out = vec![ZERO; self.rows];
        for (r, o) in out.iter_mut().enumerate() {
            for (c, xc) in x.iter().enumerate() {
                *o += self.get(r, c) * xc;
            }
        }
        Ok(out)
    }

    /// Matrix multiply: self * other.
    pub fn mul_mat(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(Error::shape("ChannelMatrix::mul_mat", self.cols, other.rows));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(r, k);
                if a == ZERO {
                    continue;
                }
                for c in 0..other.cols {
                    out.data[r * other.cols + c] += a * other.get(k, c);
                }
            }
        }
        Ok(out)
    }

    /// Gram matrix H^H * H (cols x cols).
    pub fn gram(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.cols);
        for i in 0..self.cols {
            for j in i..self.cols {
                let mut sum = ZERO;
                for r in 0..self.rows {
                    sum += self.get(r, i).conj() * self.get(r, j);
                }
                out.data[i * self.cols + j] = sum;
                out.data[j * self.cols + i] = sum.conj();
            }
        }
        out
    }

    /// Add `value` to every diagonal entry of a square matrix.
    pub fn add_diagonal(&self, value: Complex64) -> Result<Self> {
        if self.rows != self.cols {
            return Err(Error::shape("ChannelMatrix::add_diagonal", self.rows, self.cols));
        }
        let mut out = self.clone();
        for i in 0..self.rows {
            out.data[i * self.cols + i] += value;
        }
        Ok(out)
    }

    /// Gauss-Jordan inverse with partial pivoting.
    pub fn inverse(&self) -> Result<Self> {
        if self.rows != self.cols {
            return Err(Error::shape("ChannelMatrix::inverse", self.rows, self.cols));
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        // Relative to the largest entry.
        let scale = self.data.iter().map(|z| z.norm()).fold(0.0, f64::max);
        let threshold = SINGULAR_EPS * scale.max(f64::MIN_POSITIVE);

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a.get(x, col).norm().total_cmp(&a.get(y, col).norm()))
                .unwrap_or(col);
            if a.get(pivot, col).norm() <= threshold {
                return Err(Error::SingularMatrix("ChannelMatrix::inverse"));
            }
            if pivot != col {
                a.swap_rows(pivot, col);
                inv.swap_rows(pivot, col);
            }

            let p = ONE / a.get(col, col);
            for c in 0..n {
                a.data[col * n + c] *= p;
                inv.data[col * n + c] *= p;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a.get(r, col);
                if factor == ZERO {
                    continue;
                }
                for c in 0..n {
                    let av = a.get(col, c);
                    let iv = inv.get(col, c);
                    a.data[r * n + c] -= factor * av;
                    inv.data[r * n + c] -= factor * iv;
                }
            }
        }
        Ok(inv)
    }

    /// Reduced row echelon form and its pivot columns.
    ///
    /// Pivots at or below `RANK_EPS` times the largest entry count as zero;
    /// rows past the last pivot are left (numerically) zero.
    pub fn row_echelon(&self) -> (Self, Vec<usize>) {
        let (m, n) = (self.rows, self.cols);
        let mut a = self.clone();
        let scale = self.data.iter().map(|z| z.norm()).fold(0.0, f64::max);
        let threshold = RANK_EPS * scale.max(f64::MIN_POSITIVE);

        let mut pivots = Vec::new();
        let mut row = 0;
        for col in 0..n {
            if row == m {
                break;
            }
            let best = (row..m)
                .max_by(|&x, &y| a.get(x, col).norm().total_cmp(&a.get(y, col).norm()))
                .unwrap_or(row);
            if a.get(best, col).norm() <= threshold {
                for r in row..m {
                    a.set(r, col, ZERO);
                }
                continue;
            }
            a.swap_rows(best, row);

            let p = ONE / a.get(row, col);
            for c in col..n {
                a.data[row * n + c] *= p;
            }
            for r in 0..m {
                if r == row {
                    continue;
                }
                let factor = a.get(r, col);
                if factor == ZERO {
                    continue;
                }
                for c in col..n {
                    let v = a.get(row, c);
                    a.data[r * n + c] -= factor * v;
                }
            }
            pivots.push(col);
            row += 1;
        }
        (a, pivots)
    }

    /// Numerical rank.
    pub fn rank(&self) -> usize {
        self.row_echelon().1.len()
    }

    /// Moore-Penrose pseudo-inverse of a matrix of any rank.
    ///
    /// With the full-rank factorisation `H = C·F` (`C` the pivot columns of
    /// `H`, `F` the nonzero rows of its echelon form):
    /// `H⁺ = Fᴴ (F Fᴴ)⁻¹ (Cᴴ C)⁻¹ Cᴴ`.
    pub fn pseudo_inverse(&self) -> Result<Self> {
        let (echelon, pivots) = self.row_echelon();
        if pivots.is_empty() {
            return Ok(Self::zeros(self.cols, self.rows));
        }
        let c = self.select_columns(&pivots);
        let f_h = echelon.top_rows(pivots.len()).hermitian();

        let c_pinv = c.gram().inverse()?.mul_mat(&c.hermitian())?;
        let f_pinv = f_h.mul_mat(&f_h.gram().inverse()?)?;
        f_pinv.mul_mat(&c_pinv)
    }

    /// Frobenius norm.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
    }

    /// Real-valued equivalent `[[Re H, -Im H], [Im H, Re H]]`.
    pub fn to_real_equivalent(&self) -> Self {
        let (nr, nt) = (self.rows, self.cols);
        let mut out = Self::zeros(2 * nr, 2 * nt);
        for r in 0..nr {
            for c in 0..nt {
                let z = self.get(r, c);
                out.set(r, c, Complex64::new(z.re, 0.0));
                out.set(r, c + nt, Complex64::new(-z.im, 0.0));
                out.set(r + nr, c, Complex64::new(z.im, 0.0));
                out.set(r + nr, c + nt, Complex64::new(z.re, 0.0));
            }
        }
        out
    }

    fn select_columns(&self, columns: &[usize]) -> Self {
        let mut out = Self::zeros(self.rows, columns.len());
        for r in 0..self.rows {
            for (k, &c) in columns.iter().enumerate() {
                out.set(r, k, self.get(r, c));
            }
        }
        out
    }

    fn top_rows(&self, count: usize) -> Self {
        Self {
            rows: count,
            cols: self.cols,
            data: self.data[..count * self.cols].to_vec(),
        }
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }
}

/// Squared Euclidean norm of a complex vector.
pub fn norm_sqr(v: &[Complex64]) -> f64 {
    v.iter().map(|z| z.norm_sqr()).sum()
}

/// Stack a complex vector as `[Re v; Im v]`.
pub fn to_real_equivalent(v: &[Complex64]) -> Vec<Complex64> {
    v.iter()
        .map(|z| Complex64::new(z.re, 0.0))
        .chain(v.iter().map(|z| Complex64::new(z.im, 0.0)))
        .collect()
}

/// True when every entry is finite.
pub fn is_finite(v: &[Complex64]) -> bool {
    v.iter().all(|z| z.re.is_finite() && z.im.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn assert_close(a: &ChannelMatrix, b: &ChannelMatrix, tol: f64) {
        assert_eq!((a.rows(), a.cols()), (b.rows(), b.cols()));
        for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
            assert!((x - y).norm() < tol, "{:?} vs {:?}", x, y);
        }
    }

    #[test]
    fn test_new_rejects_bad_length() {
        let err = ChannelMatrix::new(2, 2, vec![ONE; 3]).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows = vec![vec![ONE, ONE], vec![ONE]];
        assert!(ChannelMatrix::from_rows(&rows).is_err());
    }

    #[test]
    fn test_hermitian() {
        let h = ChannelMatrix::new(2, 2, vec![c(1.0, 2.0), c(3.0, 4.0), c(5.0, 6.0), c(7.0, 8.0)])
            .unwrap();
        let hh = h.hermitian();
        assert_eq!(hh.get(0, 0), c(1.0, -2.0));
        assert_eq!(hh.get(0, 1), c(5.0, -6.0));
        assert_eq!(hh.get(1, 0), c(3.0, -4.0));
    }

    #[test]
    fn test_gram_matches_product() {
        let h = ChannelMatrix::new(
            3,
            2,
            vec![c(0.8, 0.2), c(-0.3, 0.5), c(0.1, -0.4), c(0.9, 0.1), c(0.0, 1.0), c(0.5, 0.5)],
        )
        .unwrap();
        let expected = h.hermitian().mul_mat(&h).unwrap();
        assert_close(&h.gram(), &expected, 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let m = ChannelMatrix::new(
            3,
            3,
            vec![
                c(2.0, 0.5), c(0.3, -0.1), c(0.0, 1.0),
                c(-0.4, 0.2), c(1.5, 0.0), c(0.7, 0.3),
                c(0.1, 0.1), c(0.2, -0.6), c(1.1, 0.4),
            ],
        )
        .unwrap();
        let inv = m.inverse().unwrap();
        assert_close(&m.mul_mat(&inv).unwrap(), &ChannelMatrix::identity(3), 1e-10);
    }

    #[test]
    fn test_inverse_needs_pivoting() {
        let m = ChannelMatrix::from_real(2, 2, &[0.0, 1.0, 1.0, 0.0]).unwrap();
        let inv = m.inverse().unwrap();
        assert_close(&inv, &m, 1e-12);
    }

    #[test]
    fn test_inverse_singular() {
        let m = ChannelMatrix::from_real(2, 2, &[1.0, 2.0, 2.0, 4.0]).unwrap();
        assert_eq!(m.inverse().unwrap_err(), Error::SingularMatrix("ChannelMatrix::inverse"));
    }

    #[test]
    fn test_pseudo_inverse_tall_and_wide() {
        let tall = ChannelMatrix::from_real(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let p = tall.pseudo_inverse().unwrap();
        assert_eq!((p.rows(), p.cols()), (2, 3));
        assert_close(&p.mul_mat(&tall).unwrap(), &ChannelMatrix::identity(2), 1e-10);

        let wide = tall.hermitian();
        let p = wide.pseudo_inverse().unwrap();
        assert_close(&wide.mul_mat(&p).unwrap(), &ChannelMatrix::identity(2), 1e-10);
    }

    fn assert_penrose(h: &ChannelMatrix, p: &ChannelMatrix) {
        let hp = h.mul_mat(p).unwrap();
        let ph = p.mul_mat(h).unwrap();
        assert_close(&hp.mul_mat(h).unwrap(), h, 1e-10);
        assert_close(&ph.mul_mat(p).unwrap(), p, 1e-10);
        assert_close(&hp.hermitian(), &hp, 1e-10);
        assert_close(&ph.hermitian(), &ph, 1e-10);
    }

    #[test]
    fn test_pseudo_inverse_rank_deficient() {
        // Tall, second column unconnected.
        let h = ChannelMatrix::new(3, 2, vec![c(1.0, 0.5), ZERO, c(-0.4, 0.2), ZERO, c(0.3, -0.7), ZERO])
            .unwrap();
        assert_eq!(h.rank(), 1);
        let p = h.pseudo_inverse().unwrap();
        assert_eq!((p.rows(), p.cols()), (2, 3));
        assert_penrose(&h, &p);
        for col in 0..3 {
            assert_eq!(p.get(1, col), ZERO);
        }

        let dependent = ChannelMatrix::from_real(2, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0]).unwrap();
        assert_eq!(dependent.rank(), 1);
        assert_penrose(&dependent, &dependent.pseudo_inverse().unwrap());
    }

    #[test]
    fn test_pseudo_inverse_of_singular_gram() {
        // H Hᴴ of a tall full-rank channel is rank deficient.
        let h = ChannelMatrix::new(
            3,
            2,
            vec![c(0.9, 0.1), c(0.4, -0.2), c(-0.3, 0.5), c(0.8, 0.2), c(0.2, 0.1), c(-0.5, 0.4)],
        )
        .unwrap();
        let outer = h.hermitian().gram();
        assert_eq!(outer.rank(), 2);
        assert!(outer.inverse().is_err());
        assert_penrose(&outer, &outer.pseudo_inverse().unwrap());
    }

    #[test]
    fn test_pseudo_inverse_of_zero_matrix() {
        let p = ChannelMatrix::zeros(2, 3).pseudo_inverse().unwrap();
        assert_eq!(p, ChannelMatrix::zeros(3, 2));
    }

    #[test]
    fn test_mul_vec_shape() {
        let h = ChannelMatrix::identity(2);
        assert!(h.mul_vec(&[ONE; 3]).unwrap_err().is_shape_error());
    }

    #[test]
    fn test_real_equivalent_preserves_product() {
        let h = ChannelMatrix::new(2, 2, vec![c(0.7, -0.3), c(0.4, 0.6), c(-0.2, 0.8), c(0.5, -0.1)])
            .unwrap();
        let x = vec![c(1.0, -1.0), c(-1.0, 1.0)];
        let y = h.mul_vec(&x).unwrap();
        let yr = h.to_real_equivalent().mul_vec(&to_real_equivalent(&x)).unwrap();
        assert_eq!(yr.len(), 4);
        for (a, b) in to_real_equivalent(&y).iter().zip(&yr) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_frobenius_norm() {
        let h = ChannelMatrix::identity(2);
        assert!((h.frobenius_norm() - 2.0f64.sqrt()).abs() < 1e-12);
    }
}
