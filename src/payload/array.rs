//! array.rs
//! The labelled array moved through the resolution graph.
//! Data is shared behind `Arc`, so clones never copy the buffer.

use super::kernel::{self, BinaryOp};
use crate::diagnostics::ComputeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Free-form attributes attached to rules and payloads.
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float64,
    Int64,
    Bool,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::Float64 => "float64",
            DType::Int64 => "int64",
            DType::Bool => "bool",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    F64(Arc<Vec<f64>>),
    I64(Arc<Vec<i64>>),
    Bool(Arc<Vec<bool>>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::F64(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn dtype(&self) -> DType {
        match self {
            Values::F64(_) => DType::Float64,
            Values::I64(_) => DType::Int64,
            Values::Bool(_) => DType::Bool,
        }
    }
}

impl From<Vec<f64>> for Values {
    fn from(v: Vec<f64>) -> Self { Values::F64(Arc::new(v)) }
}

impl From<Vec<i64>> for Values {
    fn from(v: Vec<i64>) -> Self { Values::I64(Arc::new(v)) }
}

impl From<Vec<bool>> for Values {
    fn from(v: Vec<bool>) -> Self { Values::Bool(Arc::new(v)) }
}

/// A named, dimensioned array with an attribute map.
///
/// `deferred` marks data backed by a lazy graph. Nothing in the resolver
/// inspects the buffer, so a deferred array stays deferred.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    pub name: Option<String>,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Values,
    pub attrs: Metadata,
    pub deferred: bool,
}

enum Alignment {
    Same,
    RhsScalar(f64),
    LhsScalar(f64),
}

impl DataArray {
    pub fn new<D: Into<String>>(dims: impl IntoIterator<Item = D>, shape: Vec<usize>, values: impl Into<Values>) -> Self {
        Self {
            name: None,
            dims: dims.into_iter().map(Into::into).collect(),
            shape,
            values: values.into(),
            attrs: Metadata::new(),
            deferred: false,
        }
    }

    /// One-dimensional float array along `dim`.
    pub fn from_vec(dim: &str, values: Vec<f64>) -> Self {
        let len = values.len();
        Self::new([dim], vec![len], values)
    }

    /// Zero-dimensional float array.
    pub fn scalar(value: f64) -> Self {
        Self::new(Vec::<String>::new(), Vec::new(), vec![value])
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
    pub fn dtype(&self) -> DType { self.values.dtype() }

    /// Checks that dims, shape and buffer length agree.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.dims.len() != self.shape.len() {
            return Err(format!("{} dims {:?} for a {}-d shape {:?}", self.dims.len(), self.dims, self.shape.len(), self.shape));
        }
        let expected: usize = self.shape.iter().product();
        if expected != self.len() {
            return Err(format!("shape {:?} holds {} elements but the buffer has {}", self.shape, expected, self.len()));
        }
        Ok(())
    }

    pub fn as_f64(&self) -> Result<&[f64], ComputeError> {
        match &self.values {
            Values::F64(v) => Ok(v.as_slice()),
            other => Err(ComputeError::DTypeMismatch {
                name: self.display_name().to_string(),
                expected: DType::Float64.to_string(),
                actual: other.dtype().to_string(),
            }),
        }
    }

    /// The single value of a size-1 float array.
    pub fn item(&self) -> Result<f64, ComputeError> {
        match self.as_f64()? {
            [v] => Ok(*v),
            v => Err(ComputeError::msg(format!("\"{}\" has {} elements, expected one", self.display_name(), v.len()))),
        }
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    fn derived(&self, values: Vec<f64>) -> Self {
        Self {
            name: None,
            dims: self.dims.clone(),
            shape: self.shape.clone(),
            values: values.into(),
            attrs: Metadata::new(),
            deferred: self.deferred,
        }
    }

    fn align(&self, other: &DataArray) -> Result<Alignment, ComputeError> {
        if self.shape == other.shape {
            return Ok(Alignment::Same);
        }
        if other.len() == 1 {
            return Ok(Alignment::RhsScalar(other.as_f64()?[0]));
        }
        if self.len() == 1 {
            return Ok(Alignment::LhsScalar(self.as_f64()?[0]));
        }
        Err(ComputeError::ShapeMismatch { lhs: self.shape.clone(), rhs: other.shape.clone() })
    }

    fn binary(&self, other: &DataArray, op: BinaryOp) -> Result<DataArray, ComputeError> {
        let lhs = self.as_f64()?;
        let rhs = other.as_f64()?;
        let out = match self.align(other)? {
            Alignment::Same => self.derived(kernel::zip(op, lhs, rhs)),
            Alignment::RhsScalar(r) => self.derived(kernel::zip_scalar(op, lhs, r)),
            Alignment::LhsScalar(l) => other.derived(kernel::scalar_zip(op, l, rhs)),
        };
        Ok(out.with_deferred(self.deferred || other.deferred))
    }

    pub fn try_add(&self, other: &DataArray) -> Result<DataArray, ComputeError> { self.binary(other, BinaryOp::Add) }
    pub fn try_sub(&self, other: &DataArray) -> Result<DataArray, ComputeError> { self.binary(other, BinaryOp::Sub) }
    pub fn try_mul(&self, other: &DataArray) -> Result<DataArray, ComputeError> { self.binary(other, BinaryOp::Mul) }
    pub fn try_div(&self, other: &DataArray) -> Result<DataArray, ComputeError> { self.binary(other, BinaryOp::Div) }

    pub fn scale(&self, factor: f64) -> Result<DataArray, ComputeError> {
        Ok(self.derived(kernel::zip_scalar(BinaryOp::Mul, self.as_f64()?, factor)))
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Result<DataArray, ComputeError> {
        Ok(self.derived(self.as_f64()?.iter().map(|&v| f(v)).collect()))
    }

    /// Element-wise combination with the same broadcasting rules as arithmetic.
    pub fn zip_map(&self, other: &DataArray, f: impl Fn(f64, f64) -> f64) -> Result<DataArray, ComputeError> {
        let lhs = self.as_f64()?;
        let rhs = other.as_f64()?;
        let out = match self.align(other)? {
            Alignment::Same => self.derived(lhs.iter().zip(rhs).map(|(&l, &r)| f(l, r)).collect()),
            Alignment::RhsScalar(r) => self.derived(lhs.iter().map(|&l| f(l, r)).collect()),
            Alignment::LhsScalar(l) => other.derived(rhs.iter().map(|&r| f(l, r)).collect()),
        };
        Ok(out.with_deferred(self.deferred || other.deferred))
    }

    pub fn powf(&self, exponent: f64) -> Result<DataArray, ComputeError> {
        self.map(|v| v.powf(exponent))
    }

    /// Replaces every element for which `pred` holds with NaN.
    pub fn mask_where(&self, pred: impl Fn(f64) -> bool) -> Result<DataArray, ComputeError> {
        self.map(|v| if pred(v) { f64::NAN } else { v })
    }

    /// NaN passes through unchanged.
    pub fn clip(&self, lo: f64, hi: f64) -> Result<DataArray, ComputeError> {
        self.map(|v| if v.is_nan() { v } else { v.clamp(lo, hi) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_broadcasts_scalars() {
        let t = DataArray::from_vec("x", vec![1.0, 2.0, 3.0]);
        let k = DataArray::scalar(10.0);

        let sum = t.try_add(&k).unwrap();
        assert_eq!(sum.as_f64().unwrap(), &[11.0, 12.0, 13.0]);
        assert_eq!(sum.dims, vec!["x".to_string()]);

        let ratio = k.try_div(&t).unwrap();
        assert_eq!(ratio.shape, vec![3]);
        assert_eq!(ratio.as_f64().unwrap()[1], 5.0);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let a = DataArray::from_vec("x", vec![1.0, 2.0]);
        let b = DataArray::from_vec("x", vec![1.0, 2.0, 3.0]);
        assert_eq!(
            a.try_mul(&b).unwrap_err(),
            ComputeError::ShapeMismatch { lhs: vec![2], rhs: vec![3] }
        );
    }

    #[test]
    fn test_non_float_arrays_reject_arithmetic() {
        let flags = DataArray::new(["x"], vec![2], vec![true, false]).named("flags");
        let err = flags.scale(2.0).unwrap_err();
        assert!(err.to_string().contains("dtype bool"), "Msg: {}", err);
    }

    #[test]
    fn test_check_shape_detects_inconsistent_buffers() {
        let mut arr = DataArray::from_vec("x", vec![1.0, 2.0]);
        assert!(arr.check_shape().is_ok());
        arr.shape = vec![3];
        assert!(arr.check_shape().unwrap_err().contains("buffer has 2"));
        arr.dims.push("y".into());
        assert!(arr.check_shape().is_err());
    }

    #[test]
    fn test_mask_and_clip_preserve_nan() {
        let arr = DataArray::from_vec("x", vec![-1.0, 50.0, 150.0]);
        let masked = arr.mask_where(|v| v <= 0.0).unwrap();
        assert!(masked.as_f64().unwrap()[0].is_nan());
        let clipped = masked.clip(0.0, 100.0).unwrap();
        let v = clipped.as_f64().unwrap();
        assert!(v[0].is_nan());
        assert_eq!(&v[1..], &[50.0, 100.0]);
    }

    #[test]
    fn test_deferred_flag_propagates_through_arithmetic() {
        let lazy = DataArray::from_vec("x", vec![1.0]).with_deferred(true);
        let eager = DataArray::from_vec("x", vec![2.0]);
        assert!(eager.try_add(&lazy).unwrap().deferred);
    }
}
