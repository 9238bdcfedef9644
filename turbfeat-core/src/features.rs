//! Feature tables for machine-learning consumers.
//!
//! Two layouts are produced from a [`FieldSet`]:
//! - [`FeatureStack`]: the q, λ, T, I1 and I2 families stacked per location,
//!   in index order;
//! - [`FeatureTable`]: flat named columns, one per component, with the
//!   component suffixes `_1.._3` for vectors, `_11,_12,_13,_22,_23,_33` for
//!   symmetric tensors and `_11.._33` for general tensors.

use crate::basis::{N_INTEGRITY, N_LAMBDA, N_POPE};
use crate::error::{Error, Result};
use crate::field::{FieldData, FieldSet, FieldValue};
use crate::turbulence::{q_name, N_Q};
use crate::types::SymmTensor;
use indexmap::IndexMap;
use std::io::Write;

/// Component suffixes of a symmetric tensor, in storage order.
pub const SYMM_SUFFIXES: [&str; 6] = ["11", "12", "13", "22", "23", "33"];

/// Component suffixes of a general tensor, row by row.
pub const TENSOR_SUFFIXES: [&str; 9] = ["11", "12", "13", "21", "22", "23", "31", "32", "33"];

/// Feature families stacked per location.
///
/// Families absent from the set (a variant that does not compute the basis)
/// are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStack {
    pub n_locations: usize,
    /// q1..qn per location; n is the number of consecutive q fields present.
    pub q: Vec<Vec<f64>>,
    pub lambda: Option<Vec<[f64; N_LAMBDA]>>,
    pub t: Option<Vec<[SymmTensor; N_POPE]>>,
    pub i1: Option<Vec<[f64; N_INTEGRITY]>>,
    pub i2: Option<Vec<[f64; N_INTEGRITY]>>,
}

impl FeatureStack {
    pub fn from_field_set(set: &FieldSet) -> Self {
        let n = set.n_locations();

        let q_fields: Vec<&[f64]> = (1..=N_Q)
            .map_while(|i| set.scalar(&q_name(i)))
            .collect();
        let q = (0..n)
            .map(|loc| q_fields.iter().map(|f| f[loc]).collect())
            .collect();

        Self {
            n_locations: n,
            q,
            lambda: stack::<f64, _, N_LAMBDA>(set, |i| format!("lambda{}", i)),
            t: stack::<SymmTensor, _, N_POPE>(set, |i| format!("T{}", i)),
            i1: stack::<f64, _, N_INTEGRITY>(set, |i| format!("I1_{}", i)),
            i2: stack::<f64, _, N_INTEGRITY>(set, |i| format!("I2_{}", i)),
        }
    }

    /// Number of q features per location.
    pub fn n_q(&self) -> usize {
        self.q.first().map_or(0, |row| row.len())
    }
}

/// Stack fields `name(1)..name(M)`; `None` unless all of them are present.
fn stack<T, F, const M: usize>(set: &FieldSet, name: F) -> Option<Vec<[T; M]>>
where
    T: FieldValue,
    F: Fn(usize) -> String,
{
    let fields: Vec<&[T]> = (1..=M)
        .map(|i| set.values::<T>(&name(i)))
        .collect::<Option<_>>()?;
    Some(
        (0..set.n_locations())
            .map(|loc| std::array::from_fn(|j| fields[j][loc]))
            .collect(),
    )
}

/// Flat named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    n_rows: usize,
    columns: IndexMap<String, Vec<f64>>,
}

impl FeatureTable {
    /// Flatten the named fields of a set, in the given order.
    pub fn from_fields(set: &FieldSet, names: &[&str]) -> Result<Self> {
        let mut table = Self {
            n_rows: set.n_locations(),
            columns: IndexMap::new(),
        };
        for &name in names {
            let field = set
                .get(name)
                .ok_or_else(|| Error::UnknownFeature(name.to_string()))?;
            match &field.data {
                FieldData::Scalar(v) => {
                    table.columns.insert(name.to_string(), v.clone());
                }
                FieldData::Vector(v) => {
                    for c in 0..3 {
                        table.columns.insert(
                            format!("{}_{}", name, c + 1),
                            v.iter().map(|x| x[c]).collect(),
                        );
                    }
                }
                FieldData::SymmTensor(v) => {
                    for (c, suffix) in SYMM_SUFFIXES.iter().enumerate() {
                        table.columns.insert(
                            format!("{}_{}", name, suffix),
                            v.iter().map(|x| x.0[c]).collect(),
                        );
                    }
                }
                FieldData::Tensor(v) => {
                    for (c, suffix) in TENSOR_SUFFIXES.iter().enumerate() {
                        let (i, j) = (c / 3, c % 3);
                        table.columns.insert(
                            format!("{}_{}", name, suffix),
                            v.iter().map(|x| x[(i, j)]).collect(),
                        );
                    }
                }
            }
        }
        Ok(table)
    }

    /// Flatten every field of the set.
    pub fn from_field_set(set: &FieldSet) -> Self {
        let names: Vec<&str> = set.names().collect();
        // Every name comes from the set itself
        Self::from_fields(set, &names).unwrap_or_default()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        let header: Vec<&str> = self.column_names().collect();
        writeln!(writer, "{}", header.join(","))?;
        for row in 0..self.n_rows {
            let line: Vec<String> = self.columns.values().map(|c| c[row].to_string()).collect();
            writeln!(writer, "{}", line.join(","))?;
        }
        Ok(())
    }
}
