//! Python bindings for the TurbFeat feature pipeline.
//!
//! This crate provides PyO3 bindings exposing turbfeat-core functionality to Python.
//! The bindings follow a minimal wrapper pattern - most logic stays in Rust.
//!
//! Array layouts:
//! - scalars: 1D arrays of length N
//! - vectors: Nx3 arrays
//! - symmetric tensors: Nx6 arrays `[xx, xy, xz, yy, yz, zz]`
//! - general tensors: Nx9 arrays, row by row

use numpy::{PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;

use turbfeat_core::basis::IntegrityFields;
use turbfeat_core::config::{AntisymmetricSource, Dissipation, Viscosity};
use turbfeat_core::eddy_viscosity::EddyViscosityFit;
use turbfeat_core::turbulence::Guards;
use turbfeat_core::{
    run, Boundary, Error as CoreError, Field, FieldData, FieldSet, MemorySource, PipelineConfig,
    PipelineStats, SymmTensor, Tensor, UniformGrid, Variant, Vec3,
};

fn to_py_err(e: CoreError) -> PyErr {
    match e {
        CoreError::MissingField { .. } | CoreError::UnknownFeature(_) => {
            PyKeyError::new_err(e.to_string())
        }
        CoreError::FieldLength { .. }
        | CoreError::FieldKind { .. }
        | CoreError::Grid(_)
        | CoreError::InvalidConfig(_)
        | CoreError::Json(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Uniform cell-centred grid for Python.
#[pyclass(name = "UniformGrid")]
#[derive(Clone)]
pub struct PyUniformGrid {
    inner: UniformGrid,
}

#[pymethods]
impl PyUniformGrid {
    /// Create a grid.
    ///
    /// Args:
    ///     shape: Cells per direction (nx, ny, nz)
    ///     spacing: Cell size per direction (dx, dy, dz)
    ///     origin: Lower corner of the domain
    ///     walls: Boundary planes that are walls ("x_min", "x_max", "y_min", ...)
    #[new]
    #[pyo3(signature = (shape, spacing, origin=(0.0, 0.0, 0.0), walls=Vec::new()))]
    fn new(
        shape: (usize, usize, usize),
        spacing: (f64, f64, f64),
        origin: (f64, f64, f64),
        walls: Vec<String>,
    ) -> PyResult<Self> {
        let mut grid = UniformGrid::new(
            [shape.0, shape.1, shape.2],
            Vec3::new(spacing.0, spacing.1, spacing.2),
        )
        .map_err(to_py_err)?
        .with_origin(Vec3::new(origin.0, origin.1, origin.2));

        for wall in &walls {
            let boundary = match wall.as_str() {
                "x_min" => Boundary::XMin,
                "x_max" => Boundary::XMax,
                "y_min" => Boundary::YMin,
                "y_max" => Boundary::YMax,
                "z_min" => Boundary::ZMin,
                "z_max" => Boundary::ZMax,
                _ => {
                    return Err(PyValueError::new_err(format!(
                        "Unknown wall: {}. Valid walls: x_min, x_max, y_min, y_max, z_min, z_max",
                        wall
                    )))
                }
            };
            grid = grid.with_wall(boundary);
        }
        Ok(Self { inner: grid })
    }

    #[getter]
    fn n_cells(&self) -> usize {
        self.inner.n_cells()
    }

    #[getter]
    fn shape(&self) -> (usize, usize, usize) {
        let [nx, ny, nz] = self.inner.dims();
        (nx, ny, nz)
    }

    /// Get cell centres as Nx3 numpy array.
    #[getter]
    fn cell_centres<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        let data: Vec<Vec<f64>> = self
            .inner
            .cell_centres()
            .iter()
            .map(|c| vec![c[0], c[1], c[2]])
            .collect();
        PyArray2::from_vec2(py, &data)
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to create array: {}", e)))
    }

    fn __repr__(&self) -> String {
        let [nx, ny, nz] = self.inner.dims();
        let h = self.inner.spacing();
        format!(
            "UniformGrid(shape=({}, {}, {}), spacing=({:.3e}, {:.3e}, {:.3e}))",
            nx, ny, nz, h[0], h[1], h[2]
        )
    }
}

/// Pipeline configuration for Python.
#[pyclass(name = "PipelineConfig")]
#[derive(Clone)]
pub struct PyPipelineConfig {
    inner: PipelineConfig,
}

#[pymethods]
impl PyPipelineConfig {
    /// Create a configuration.
    ///
    /// Args:
    ///     variant: "rans", "rans_omega_lean", "les" or "dns"
    ///     antisymmetric_source: "pressure_gradient", "omega_gradient" or "both" (rans only)
    ///     dissipation: "omega" or "epsilon", the variable stored in the case
    ///     nu: Uniform molecular viscosity; None reads the "nu" field
    ///     write_integrity_basis: Also return B1..B47
    ///     write_inputs: Echo p and wallDistance (and tau for dns)
    ///     eddy_viscosity_fit: Fit the optimal eddy viscosity (les/dns only)
    ///     n_threads: Worker threads (0 = auto-detect)
    #[new]
    #[pyo3(signature = (
        variant="rans",
        antisymmetric_source=None,
        dissipation="omega",
        nu=None,
        write_integrity_basis=false,
        write_inputs=true,
        eddy_viscosity_fit=false,
        n_threads=0
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        variant: &str,
        antisymmetric_source: Option<&str>,
        dissipation: &str,
        nu: Option<f64>,
        write_integrity_basis: bool,
        write_inputs: bool,
        eddy_viscosity_fit: bool,
        n_threads: usize,
    ) -> PyResult<Self> {
        let variant = match variant {
            "rans" => Variant::Rans,
            "rans_omega_lean" => Variant::RansOmegaLean,
            "les" => Variant::Les,
            "dns" => Variant::Dns,
            _ => {
                return Err(PyValueError::new_err(format!(
                    "Unknown variant: {}. Valid variants: rans, rans_omega_lean, les, dns",
                    variant
                )))
            }
        };
        let antisymmetric_source = match antisymmetric_source {
            None => None,
            Some("pressure_gradient") => Some(AntisymmetricSource::PressureGradient),
            Some("omega_gradient") => Some(AntisymmetricSource::OmegaGradient),
            Some("both") => Some(AntisymmetricSource::Both),
            Some(other) => {
                return Err(PyValueError::new_err(format!(
                    "Unknown antisymmetric source: {}. \
                     Valid: pressure_gradient, omega_gradient, both",
                    other
                )))
            }
        };
        let dissipation = match dissipation {
            "omega" => Dissipation::Omega,
            "epsilon" => Dissipation::Epsilon,
            _ => {
                return Err(PyValueError::new_err(format!(
                    "Unknown dissipation: {}. Valid: omega, epsilon",
                    dissipation
                )))
            }
        };

        let mut inner = PipelineConfig {
            variant,
            antisymmetric_source,
            dissipation,
            viscosity: nu.map_or(Viscosity::Field, Viscosity::Uniform),
            n_threads,
            ..PipelineConfig::default()
        };
        inner.output.write_integrity_basis = write_integrity_basis;
        inner.output.write_inputs = write_inputs;
        inner.output.eddy_viscosity_fit = eddy_viscosity_fit;
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Parse a JSON configuration.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let inner = PipelineConfig::from_json_str(json).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json_string().map_err(to_py_err)
    }

    #[getter]
    fn variant(&self) -> &str {
        match self.inner.variant {
            Variant::Rans => "rans",
            Variant::RansOmegaLean => "rans_omega_lean",
            Variant::Les => "les",
            Variant::Dns => "dns",
        }
    }

    #[getter]
    fn n_threads(&self) -> usize {
        self.inner.n_threads
    }

    fn __repr__(&self) -> String {
        format!(
            "PipelineConfig(variant='{}', n_threads={})",
            self.variant(),
            self.inner.n_threads
        )
    }
}

/// Pipeline run statistics.
#[pyclass(name = "PipelineStats")]
#[derive(Clone)]
pub struct PyPipelineStats {
    inner: PipelineStats,
}

#[pymethods]
impl PyPipelineStats {
    #[getter]
    fn n_locations(&self) -> usize {
        self.inner.n_locations
    }

    #[getter]
    fn n_fields(&self) -> usize {
        self.inner.n_fields
    }

    /// Total wall-clock time in seconds.
    #[getter]
    fn total_time(&self) -> f64 {
        self.inner.total.as_secs_f64()
    }

    /// Wall-clock time per stage in seconds, in execution order.
    #[getter]
    fn stage_times(&self) -> Vec<(String, f64)> {
        self.inner
            .stage_timings
            .iter()
            .map(|(name, d)| (name.to_string(), d.as_secs_f64()))
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "PipelineStats(locations={}, fields={}, total_time={:.3}s)",
            self.inner.n_locations,
            self.inner.n_fields,
            self.inner.total.as_secs_f64()
        )
    }
}

fn vectors_from_array(name: &str, array: &PyReadonlyArray2<f64>) -> PyResult<Vec<Vec3>> {
    let view = array.as_array();
    if view.ncols() != 3 {
        return Err(PyValueError::new_err(format!("{} must be Nx3 array", name)));
    }
    Ok(view
        .rows()
        .into_iter()
        .map(|r| Vec3::new(r[0], r[1], r[2]))
        .collect())
}

fn symm_tensors_from_array(name: &str, array: &PyReadonlyArray2<f64>) -> PyResult<Vec<SymmTensor>> {
    let view = array.as_array();
    if view.ncols() != 6 {
        return Err(PyValueError::new_err(format!("{} must be Nx6 array", name)));
    }
    Ok(view
        .rows()
        .into_iter()
        .map(|r| SymmTensor::new([r[0], r[1], r[2], r[3], r[4], r[5]]))
        .collect())
}

fn tensors_from_array(name: &str, array: &PyReadonlyArray2<f64>) -> PyResult<Vec<Tensor>> {
    let view = array.as_array();
    if view.ncols() != 9 {
        return Err(PyValueError::new_err(format!("{} must be Nx9 array", name)));
    }
    Ok(view
        .rows()
        .into_iter()
        .map(|r| Tensor::from_iterator(r.iter().copied()).transpose())
        .collect())
}

fn array2_from_rows<'py>(py: Python<'py>, rows: Vec<Vec<f64>>) -> PyResult<PyObject> {
    let array = PyArray2::from_vec2(py, &rows)
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to create array: {}", e)))?;
    Ok(array.into_any().unbind())
}

/// Convert every derived field to a numpy array, keyed by field name.
fn field_set_to_dict(py: Python<'_>, fields: &FieldSet) -> PyResult<HashMap<String, PyObject>> {
    let mut dict = HashMap::with_capacity(fields.len());
    for (name, field) in fields.iter() {
        let array = match &field.data {
            FieldData::Scalar(v) => PyArray1::from_vec(py, v.clone()).into_any().unbind(),
            FieldData::Vector(v) => {
                array2_from_rows(py, v.iter().map(|x| x.iter().copied().collect()).collect())?
            }
            FieldData::SymmTensor(v) => {
                array2_from_rows(py, v.iter().map(|t| t.0.iter().copied().collect()).collect())?
            }
            FieldData::Tensor(v) => array2_from_rows(
                py,
                v.iter()
                    .map(|t| t.transpose().iter().copied().collect())
                    .collect(),
            )?,
        };
        dict.insert(name.to_string(), array);
    }
    Ok(dict)
}

/// Compute the derived fields of one snapshot.
///
/// Args:
///     config: Pipeline configuration
///     grid: Uniform grid providing gradients and wall distance
///     scalars: Scalar input fields by name (k, omega, nut, p, ...)
///     vectors: Nx3 vector input fields by name (U, UMean)
///     symm_tensors: Nx6 symmetric tensor input fields by name (tau, UPrime2Mean)
///
/// Returns:
///     (dict of derived fields by name, PipelineStats)
#[pyfunction]
#[pyo3(signature = (config, grid, scalars, vectors, symm_tensors=HashMap::new()))]
fn run_pipeline(
    py: Python<'_>,
    config: &PyPipelineConfig,
    grid: &PyUniformGrid,
    scalars: HashMap<String, PyReadonlyArray1<f64>>,
    vectors: HashMap<String, PyReadonlyArray2<f64>>,
    symm_tensors: HashMap<String, PyReadonlyArray2<f64>>,
) -> PyResult<(HashMap<String, PyObject>, PyPipelineStats)> {
    const TIME: &str = "0";
    let mut source = MemorySource::new();
    for (name, array) in &scalars {
        let values: Vec<f64> = array.as_array().iter().copied().collect();
        source.insert_input(TIME, name, FieldData::Scalar(values));
    }
    for (name, array) in &vectors {
        let values = vectors_from_array(name, array)?;
        source.insert_input(TIME, name, FieldData::Vector(values));
    }
    for (name, array) in &symm_tensors {
        let values = symm_tensors_from_array(name, array)?;
        source.insert_input(TIME, name, FieldData::SymmTensor(values));
    }

    let core_config = config.inner.clone();
    let core_grid = grid.inner.clone();
    let output = py
        .allow_threads(move || run(&core_config, &source, &core_grid, TIME))
        .map_err(to_py_err)?;

    let fields = field_set_to_dict(py, &output.fields)?;
    Ok((fields, PyPipelineStats { inner: output.stats }))
}

/// Invariants of the 47-tensor integrity basis.
///
/// Args:
///     shat: Nx9 non-dimensional strain rate
///     rhat: Nx9 non-dimensional rotation rate
///     ax: Nx9 first antisymmetric generator
///     ay: Nx9 second antisymmetric generator
///
/// Returns:
///     (I1, I2), each an Nx47 array
#[pyfunction]
fn integrity_basis_invariants<'py>(
    py: Python<'py>,
    shat: PyReadonlyArray2<f64>,
    rhat: PyReadonlyArray2<f64>,
    ax: PyReadonlyArray2<f64>,
    ay: PyReadonlyArray2<f64>,
) -> PyResult<(PyObject, PyObject)> {
    let s = tensors_from_array("shat", &shat)?;
    let r = tensors_from_array("rhat", &rhat)?;
    let x = tensors_from_array("ax", &ax)?;
    let y = tensors_from_array("ay", &ay)?;
    let n = s.len();
    if r.len() != n || x.len() != n || y.len() != n {
        return Err(PyValueError::new_err(
            "shat, rhat, ax and ay must have the same number of rows",
        ));
    }

    let (i1, i2) = py
        .allow_threads(move || {
            let fields = IntegrityFields::compute(&s, &r, &x, &y, false)?;
            let rows = |columns: &[Field<f64>]| -> Vec<Vec<f64>> {
                (0..n)
                    .map(|i| columns.iter().map(|c| c.values()[i]).collect())
                    .collect()
            };
            Ok::<_, CoreError>((rows(&fields.i1), rows(&fields.i2)))
        })
        .map_err(to_py_err)?;
    Ok((array2_from_rows(py, i1)?, array2_from_rows(py, i2)?))
}

/// Optimal non-negative eddy viscosity of reference anisotropy data.
///
/// Args:
///     s: Nx6 strain rate
///     a: Nx6 anisotropy
///     k: Optional turbulent kinetic energy, enables bperp_nnls
///
/// Returns:
///     dict with nut_nnls, r2_nnls, aperp_nnls and (with k) bperp_nnls
#[pyfunction]
#[pyo3(signature = (s, a, k=None))]
fn eddy_viscosity_fit(
    py: Python<'_>,
    s: PyReadonlyArray2<f64>,
    a: PyReadonlyArray2<f64>,
    k: Option<PyReadonlyArray1<f64>>,
) -> PyResult<HashMap<String, PyObject>> {
    let s = symm_tensors_from_array("s", &s)?;
    let a = symm_tensors_from_array("a", &a)?;
    let k: Option<Vec<f64>> = k.map(|k| k.as_array().iter().copied().collect());

    let fit = EddyViscosityFit::optimal(&s, &a, k.as_deref(), &Guards::default())
        .map_err(to_py_err)?;

    let mut fields = FieldSet::new(s.len());
    fields.insert(fit.nut).map_err(to_py_err)?;
    if let Some(r2) = fit.r2 {
        fields.insert(r2).map_err(to_py_err)?;
    }
    fields.insert(fit.aperp).map_err(to_py_err)?;
    if let Some(bperp) = fit.bperp {
        fields.insert(bperp).map_err(to_py_err)?;
    }
    field_set_to_dict(py, &fields)
}

/// Get library version.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Python module definition.
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyUniformGrid>()?;
    m.add_class::<PyPipelineConfig>()?;
    m.add_class::<PyPipelineStats>()?;
    m.add_function(wrap_pyfunction!(run_pipeline, m)?)?;
    m.add_function(wrap_pyfunction!(integrity_basis_invariants, m)?)?;
    m.add_function(wrap_pyfunction!(eddy_viscosity_fit, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    Ok(())
}
