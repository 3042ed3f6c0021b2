//! Dynamic construction from positional/keyword arguments.
//!
//! This is the entry point used when the variant and its arguments are only
//! known at run time (mesh readers, element tables). Arguments are normalized
//! against [`TransformKind::params`] and then handed to the typed
//! constructors, so both paths share one registry key per distinct value.

use nalgebra::DMatrix;

use super::{RootToken, Transform, TransformKind};
use crate::intern::{Arg, Args, normalize};
use crate::transform_error::TransformError;

impl Transform {
    /// Build (or fetch the live interned instance of) a transform of `kind`.
    pub fn construct(kind: TransformKind, args: Args) -> Result<Transform, TransformError> {
        let values = normalize(kind, kind.params(), args)?;
        let names = kind.params();
        let get = |i: usize| ArgRef {
            kind,
            name: names[i].name,
            value: &values[i],
        };
        match kind {
            TransformKind::Identity => Ok(Transform::identity(get(0).dim()?)),
            TransformKind::Root => Ok(Transform::root(get(0).dim()?, get(1).token()?)),
            TransformKind::ScaleUniform => {
                Ok(Transform::scale_uniform(get(0).dim()?, get(1).real()?))
            }
            TransformKind::Scale => Ok(Transform::scale(get(0).reals()?)),
            TransformKind::Linear => Transform::linear(get(0).matrix()?, get(1).sign()?),
            TransformKind::Slice => Transform::slice(
                get(0).dim()?,
                get(1).int()?,
                get(2).int()?,
                get(3).int()?,
            ),
            TransformKind::Affine => Transform::affine(get(0).reals()?, &get(1).transform()?),
            TransformKind::Point => Transform::point(get(0).sign()?),
        }
    }
}

struct ArgRef<'a> {
    kind: TransformKind,
    name: &'static str,
    value: &'a Arg,
}

impl ArgRef<'_> {
    fn wrong_type(&self, expected: &str) -> TransformError {
        TransformError::invalid(
            self.kind,
            format!(
                "argument `{}` must be {expected}, got {}",
                self.name,
                self.value.type_name()
            ),
        )
    }

    fn int(&self) -> Result<i64, TransformError> {
        match self.value {
            Arg::Int(v) => Ok(*v),
            _ => Err(self.wrong_type("an integer")),
        }
    }

    fn dim(&self) -> Result<usize, TransformError> {
        let v = self.int()?;
        usize::try_from(v).map_err(|_| {
            TransformError::invalid(
                self.kind,
                format!("argument `{}` must be non-negative, got {v}", self.name),
            )
        })
    }

    fn sign(&self) -> Result<i8, TransformError> {
        let v = self.int()?;
        i8::try_from(v).map_err(|_| {
            TransformError::invalid(self.kind, format!("argument `{}` out of range: {v}", self.name))
        })
    }

    fn real(&self) -> Result<f64, TransformError> {
        match self.value {
            Arg::Real(v) => Ok(*v),
            Arg::Int(v) => Ok(*v as f64),
            _ => Err(self.wrong_type("a real number")),
        }
    }

    fn reals(&self) -> Result<Vec<f64>, TransformError> {
        match self.value {
            Arg::Reals(v) => Ok(v.clone()),
            _ => Err(self.wrong_type("a vector")),
        }
    }

    fn matrix(&self) -> Result<DMatrix<f64>, TransformError> {
        match self.value {
            Arg::Matrix(m) => Ok(m.clone()),
            _ => Err(self.wrong_type("a matrix")),
        }
    }

    fn token(&self) -> Result<RootToken, TransformError> {
        match self.value {
            Arg::Token(t) => Ok(*t),
            _ => Err(self.wrong_type("a root token")),
        }
    }

    fn transform(&self) -> Result<Transform, TransformError> {
        match self.value {
            Arg::Transform(t) => Ok(t.clone()),
            _ => Err(self.wrong_type("a transform")),
        }
    }
}
