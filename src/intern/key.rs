//! Hashable construction keys.
//!
//! Floating-point arguments are keyed by bit pattern. `-0.0` collapses onto
//! `0.0`; NaN and infinities make the whole key unhashable, in which case the
//! value bypasses its registry.

use nalgebra::DMatrix;

/// One normalized construction argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Int(i64),
    Real(u64),
    Reals(Box<[u64]>),
    /// Column-major entries of a `rows × cols` matrix.
    Matrix {
        rows: usize,
        cols: usize,
        data: Box<[u64]>,
    },
    Token(u64),
    /// Serial id of an interned transform.
    Node(u64),
}

/// The full normalized argument tuple of one construction.
pub type InternKey = Box<[KeyPart]>;

/// Bit pattern of a finite float, with both zeros mapped to `+0.0`.
#[inline]
pub fn float_bits(x: f64) -> Option<u64> {
    if !x.is_finite() {
        None
    } else if x == 0.0 {
        Some(0.0f64.to_bits())
    } else {
        Some(x.to_bits())
    }
}

/// Incremental builder for an [`InternKey`].
#[derive(Debug)]
pub struct KeyBuilder {
    parts: Vec<KeyPart>,
    hashable: bool,
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self {
            parts: Vec::with_capacity(4),
            hashable: true,
        }
    }

    pub fn int(mut self, v: i64) -> Self {
        self.parts.push(KeyPart::Int(v));
        self
    }

    pub fn dim(self, v: usize) -> Self {
        self.int(v as i64)
    }

    pub fn real(mut self, v: f64) -> Self {
        match float_bits(v) {
            Some(bits) => self.parts.push(KeyPart::Real(bits)),
            None => self.hashable = false,
        }
        self
    }

    pub fn reals(mut self, vs: &[f64]) -> Self {
        match vs.iter().map(|&v| float_bits(v)).collect::<Option<Vec<_>>>() {
            Some(bits) => self.parts.push(KeyPart::Reals(bits.into_boxed_slice())),
            None => self.hashable = false,
        }
        self
    }

    pub fn matrix(mut self, m: &DMatrix<f64>) -> Self {
        match m.iter().map(|&v| float_bits(v)).collect::<Option<Vec<_>>>() {
            Some(bits) => self.parts.push(KeyPart::Matrix {
                rows: m.nrows(),
                cols: m.ncols(),
                data: bits.into_boxed_slice(),
            }),
            None => self.hashable = false,
        }
        self
    }

    pub fn token(mut self, raw: u64) -> Self {
        self.parts.push(KeyPart::Token(raw));
        self
    }

    pub fn node(mut self, id: u64) -> Self {
        self.parts.push(KeyPart::Node(id));
        self
    }

    /// The finished key, or `None` if any argument was unhashable.
    pub fn finish(self) -> Option<InternKey> {
        self.hashable.then(|| self.parts.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_zero_collapses() {
        assert_eq!(float_bits(-0.0), float_bits(0.0));
        let a = KeyBuilder::new().reals(&[0.0, 1.0]).finish();
        let b = KeyBuilder::new().reals(&[-0.0, 1.0]).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn non_finite_is_unhashable() {
        assert!(KeyBuilder::new().dim(2).real(f64::NAN).finish().is_none());
        assert!(KeyBuilder::new().reals(&[1.0, f64::INFINITY]).finish().is_none());
        let m = DMatrix::from_element(2, 1, f64::NEG_INFINITY);
        assert!(KeyBuilder::new().matrix(&m).finish().is_none());
    }

    #[test]
    fn matrix_shape_is_part_of_key() {
        let row = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let col = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        assert_ne!(
            KeyBuilder::new().matrix(&row).finish(),
            KeyBuilder::new().matrix(&col).finish()
        );
    }
}
