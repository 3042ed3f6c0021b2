//! Construction arguments and their normalization.
//!
//! A construction call carries positional and keyword arguments. Before a
//! registry lookup they are resolved against the declared parameter list of
//! the kind being built: positionals fill parameters in order, keywords fill
//! by name, defaults fill the rest. Unknown keywords, duplicates, surplus
//! positionals and missing required parameters are rejected.

use nalgebra::DMatrix;

use crate::transform::{RootToken, Transform, TransformKind};
use crate::transform_error::TransformError;

/// A declared constructor parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    /// Integer default; `None` means the parameter is required.
    pub default: Option<i64>,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, default: i64) -> Self {
        Self {
            name,
            default: Some(default),
        }
    }
}

/// A single argument value.
#[derive(Clone, Debug)]
pub enum Arg {
    Int(i64),
    Real(f64),
    Reals(Vec<f64>),
    Matrix(DMatrix<f64>),
    Token(RootToken),
    Transform(Transform),
}

impl Arg {
    pub fn type_name(&self) -> &'static str {
        match self {
            Arg::Int(_) => "integer",
            Arg::Real(_) => "real",
            Arg::Reals(_) => "vector",
            Arg::Matrix(_) => "matrix",
            Arg::Token(_) => "root token",
            Arg::Transform(_) => "transform",
        }
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Int(i64::from(v))
    }
}

impl From<usize> for Arg {
    fn from(v: usize) -> Self {
        Arg::Int(v as i64)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Real(v)
    }
}

impl From<Vec<f64>> for Arg {
    fn from(v: Vec<f64>) -> Self {
        Arg::Reals(v)
    }
}

impl From<&[f64]> for Arg {
    fn from(v: &[f64]) -> Self {
        Arg::Reals(v.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Arg {
    fn from(v: [f64; N]) -> Self {
        Arg::Reals(v.to_vec())
    }
}

impl From<DMatrix<f64>> for Arg {
    fn from(v: DMatrix<f64>) -> Self {
        Arg::Matrix(v)
    }
}

impl From<RootToken> for Arg {
    fn from(v: RootToken) -> Self {
        Arg::Token(v)
    }
}

impl From<Transform> for Arg {
    fn from(v: Transform) -> Self {
        Arg::Transform(v)
    }
}

impl From<&Transform> for Arg {
    fn from(v: &Transform) -> Self {
        Arg::Transform(v.clone())
    }
}

/// Positional and keyword arguments of one construction call.
#[derive(Clone, Debug, Default)]
pub struct Args {
    positional: Vec<Arg>,
    keyword: Vec<(String, Arg)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Arg>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.keyword.push((name.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve `args` against `params`, returning one value per parameter.
pub fn normalize(
    kind: TransformKind,
    params: &[Param],
    args: Args,
) -> Result<Vec<Arg>, TransformError> {
    let Args {
        positional,
        keyword,
    } = args;
    if positional.len() > params.len() {
        return Err(TransformError::invalid(
            kind,
            format!(
                "takes at most {} arguments, got {}",
                params.len(),
                positional.len()
            ),
        ));
    }

    let mut slots: Vec<Option<Arg>> = positional.into_iter().map(Some).collect();
    slots.resize(params.len(), None);

    for (name, value) in keyword {
        let idx = params
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| TransformError::invalid(kind, format!("unknown argument `{name}`")))?;
        if slots[idx].is_some() {
            return Err(TransformError::invalid(
                kind,
                format!("got multiple values for argument `{name}`"),
            ));
        }
        slots[idx] = Some(value);
    }

    slots
        .into_iter()
        .zip(params)
        .map(|(slot, param)| match (slot, param.default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(Arg::Int(default)),
            (None, None) => Err(TransformError::invalid(
                kind,
                format!("missing mandatory argument `{}`", param.name),
            )),
        })
        .collect()
}
