//! Fields: total mappings from discretization locations to values.
//!
//! A [`Field`] is a named, dimensioned `Vec` holding one value per location.
//! Stage builders consume and produce typed fields; the pipeline collects
//! the results into a [`FieldSet`] of type-erased [`OutputField`]s that the
//! writer persists.

use crate::dimension::Dimension;
use crate::error::{Error, Result};
use crate::types::{SymmTensor, Tensor, Vec3};
use indexmap::IndexMap;
use rayon::prelude::*;

/// Algebraic kind of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar,
    Vector,
    SymmTensor,
    Tensor,
}

impl FieldKind {
    /// Human-readable kind name.
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Scalar => "scalar",
            FieldKind::Vector => "vector",
            FieldKind::SymmTensor => "symmTensor",
            FieldKind::Tensor => "tensor",
        }
    }

    /// Number of stored components per location.
    pub fn n_components(self) -> usize {
        match self {
            FieldKind::Scalar => 1,
            FieldKind::Vector => 3,
            FieldKind::SymmTensor => 6,
            FieldKind::Tensor => 9,
        }
    }
}

/// Values of one field, tagged with their kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    Scalar(Vec<f64>),
    Vector(Vec<Vec3>),
    SymmTensor(Vec<SymmTensor>),
    Tensor(Vec<Tensor>),
}

impl FieldData {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldData::Scalar(_) => FieldKind::Scalar,
            FieldData::Vector(_) => FieldKind::Vector,
            FieldData::SymmTensor(_) => FieldKind::SymmTensor,
            FieldData::Tensor(_) => FieldKind::Tensor,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldData::Scalar(v) => v.len(),
            FieldData::Vector(v) => v.len(),
            FieldData::SymmTensor(v) => v.len(),
            FieldData::Tensor(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value type that can be stored in a field.
pub trait FieldValue: Copy + Send + Sync + 'static {
    const KIND: FieldKind;

    fn into_data(values: Vec<Self>) -> FieldData;

    fn from_data(data: &FieldData) -> Option<&[Self]>;
}

impl FieldValue for f64 {
    const KIND: FieldKind = FieldKind::Scalar;

    fn into_data(values: Vec<Self>) -> FieldData {
        FieldData::Scalar(values)
    }

    fn from_data(data: &FieldData) -> Option<&[Self]> {
        match data {
            FieldData::Scalar(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl FieldValue for Vec3 {
    const KIND: FieldKind = FieldKind::Vector;

    fn into_data(values: Vec<Self>) -> FieldData {
        FieldData::Vector(values)
    }

    fn from_data(data: &FieldData) -> Option<&[Self]> {
        match data {
            FieldData::Vector(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl FieldValue for SymmTensor {
    const KIND: FieldKind = FieldKind::SymmTensor;

    fn into_data(values: Vec<Self>) -> FieldData {
        FieldData::SymmTensor(values)
    }

    fn from_data(data: &FieldData) -> Option<&[Self]> {
        match data {
            FieldData::SymmTensor(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

impl FieldValue for Tensor {
    const KIND: FieldKind = FieldKind::Tensor;

    fn into_data(values: Vec<Self>) -> FieldData {
        FieldData::Tensor(values)
    }

    fn from_data(data: &FieldData) -> Option<&[Self]> {
        match data {
            FieldData::Tensor(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

/// A named, dimensioned field with one value per location.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    name: String,
    dimension: Dimension,
    values: Vec<T>,
}

impl<T: FieldValue> Field<T> {
    /// Create a field from per-location values.
    pub fn new(name: impl Into<String>, dimension: Dimension, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            dimension,
            values,
        }
    }

    /// Field holding the same value at every location.
    pub fn uniform(name: impl Into<String>, dimension: Dimension, n: usize, value: T) -> Self {
        Self::new(name, dimension, vec![value; n])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a location.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.values.get(idx)
    }

    /// Rename the field, keeping values and dimension.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check that this field covers exactly `expected` locations.
    pub fn check_len(&self, expected: usize) -> Result<()> {
        if self.values.len() != expected {
            return Err(Error::FieldLength {
                name: self.name.clone(),
                expected,
                found: self.values.len(),
            });
        }
        Ok(())
    }

    /// Pointwise map into a new field, in parallel over locations.
    pub fn map<U, F>(&self, name: impl Into<String>, dimension: Dimension, f: F) -> Field<U>
    where
        U: FieldValue,
        F: Fn(&T) -> U + Send + Sync,
    {
        Field::new(name, dimension, self.values.par_iter().map(f).collect())
    }
}

/// A type-erased field ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputField {
    pub dimension: Dimension,
    pub data: FieldData,
}

impl OutputField {
    pub fn kind(&self) -> FieldKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Typed view of the values, if the kind matches.
    pub fn values<T: FieldValue>(&self) -> Option<&[T]> {
        T::from_data(&self.data)
    }
}

impl<T: FieldValue> From<Field<T>> for OutputField {
    fn from(field: Field<T>) -> Self {
        OutputField {
            dimension: field.dimension,
            data: T::into_data(field.values),
        }
    }
}

/// Ordered collection of derived fields for one snapshot.
///
/// Every field in the set covers the same number of locations; insertion
/// order is preserved so writers and feature tables see a stable layout.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    n_locations: usize,
    fields: IndexMap<String, OutputField>,
}

impl FieldSet {
    pub fn new(n_locations: usize) -> Self {
        Self {
            n_locations,
            fields: IndexMap::new(),
        }
    }

    pub fn n_locations(&self) -> usize {
        self.n_locations
    }

    /// Number of fields in the set.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert a typed field under its own name, replacing any previous entry.
    pub fn insert<T: FieldValue>(&mut self, field: Field<T>) -> Result<()> {
        field.check_len(self.n_locations)?;
        let name = field.name.clone();
        self.fields.insert(name, field.into());
        Ok(())
    }

    /// Insert an already type-erased field.
    pub fn insert_output(&mut self, name: impl Into<String>, field: OutputField) -> Result<()> {
        let name = name.into();
        if field.len() != self.n_locations {
            return Err(Error::FieldLength {
                name,
                expected: self.n_locations,
                found: field.len(),
            });
        }
        self.fields.insert(name, field);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OutputField> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Typed values of a field.
    pub fn values<T: FieldValue>(&self, name: &str) -> Option<&[T]> {
        self.fields.get(name).and_then(|f| f.values::<T>())
    }

    /// Scalar values of a field.
    pub fn scalar(&self, name: &str) -> Option<&[f64]> {
        self.values::<f64>(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
