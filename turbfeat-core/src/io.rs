//! Field loading and writing seams.
//!
//! Case storage is owned by the caller. The pipeline reads primary fields
//! through [`FieldSource`] and hands derived fields to a [`FieldSink`].
//! In-memory implementations of both are provided for studies, bindings and
//! tests.

use crate::dimension::{dims, Dimension};
use crate::error::{Error, Result};
use crate::field::{Field, FieldData, FieldSet, FieldValue, OutputField};
use crate::types::{SymmTensor, Vec3};
use std::collections::HashMap;

/// Source of primary fields at a snapshot time.
pub trait FieldSource: Send + Sync {
    /// Look up a stored field, if present.
    fn get(&self, name: &str, time: &str) -> Option<&OutputField>;

    /// Whether the field is present at the given time.
    fn contains(&self, name: &str, time: &str) -> bool {
        self.get(name, time).is_some()
    }

    /// Load a scalar field.
    fn load_scalar(&self, name: &str, time: &str) -> Result<Field<f64>> {
        load_typed(self, name, time)
    }

    /// Load a vector field.
    fn load_vector(&self, name: &str, time: &str) -> Result<Field<Vec3>> {
        load_typed(self, name, time)
    }

    /// Load a symmetric tensor field.
    fn load_symm_tensor(&self, name: &str, time: &str) -> Result<Field<SymmTensor>> {
        load_typed(self, name, time)
    }
}

fn load_typed<T, S>(source: &S, name: &str, time: &str) -> Result<Field<T>>
where
    T: FieldValue,
    S: FieldSource + ?Sized,
{
    let stored = source
        .get(name, time)
        .ok_or_else(|| Error::missing(name, time))?;
    let values = stored.values::<T>().ok_or_else(|| Error::FieldKind {
        name: name.to_string(),
        expected: T::KIND.name(),
        found: stored.kind().name(),
    })?;
    Ok(Field::new(name, stored.dimension, values.to_vec()))
}

/// Destination for derived fields.
pub trait FieldSink {
    fn write_field(&mut self, time: &str, name: &str, field: &OutputField) -> Result<()>;

    /// Write every field of a set, in insertion order.
    fn write_all(&mut self, time: &str, fields: &FieldSet) -> Result<()> {
        for (name, field) in fields.iter() {
            self.write_field(time, name, field)?;
        }
        Ok(())
    }
}

/// In-memory case storage keyed by (time, field name).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    fields: HashMap<(String, String), OutputField>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a typed field at a time.
    pub fn insert<T: FieldValue>(&mut self, time: &str, field: Field<T>) {
        let name = field.name().to_string();
        self.fields.insert((time.to_string(), name), field.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: FieldValue>(mut self, time: &str, field: Field<T>) -> Self {
        self.insert(time, field);
        self
    }

    /// Store raw values with a dimension.
    pub fn insert_data(&mut self, time: &str, name: &str, dimension: Dimension, data: FieldData) {
        self.fields.insert(
            (time.to_string(), name.to_string()),
            OutputField { dimension, data },
        );
    }

    /// Insert a solver field, tagging it with the dimension its name implies.
    ///
    /// Names the pipeline does not read are stored as dimensionless.
    pub fn insert_input(&mut self, time: &str, name: &str, data: FieldData) {
        let dimension = dims::of_input(name).unwrap_or(dims::DIMENSIONLESS);
        self.insert_data(time, name, dimension, data);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldSource for MemorySource {
    fn get(&self, name: &str, time: &str) -> Option<&OutputField> {
        self.fields.get(&(time.to_string(), name.to_string()))
    }
}

/// In-memory writer; also usable as a [`FieldSource`] for chained runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    written: MemorySource,
    order: Vec<(String, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// (time, name) pairs in the order they were written.
    pub fn written(&self) -> &[(String, String)] {
        &self.order
    }

    pub fn into_source(self) -> MemorySource {
        self.written
    }
}

impl FieldSink for MemorySink {
    fn write_field(&mut self, time: &str, name: &str, field: &OutputField) -> Result<()> {
        self.written
            .insert_data(time, name, field.dimension, field.data.clone());
        self.order.push((time.to_string(), name.to_string()));
        Ok(())
    }
}

impl FieldSource for MemorySink {
    fn get(&self, name: &str, time: &str) -> Option<&OutputField> {
        self.written.get(name, time)
    }
}
