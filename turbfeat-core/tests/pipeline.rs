//! End-to-end runs of every variant on analytic fields over a uniform grid.
//!
//! Velocity fields are linear in space so the finite-difference gradients
//! are exact, including at the boundary cells.

use approx::assert_relative_eq;
use turbfeat_core::config::{AntisymmetricSource, Dissipation, Viscosity};
use turbfeat_core::{
    dims, run, run_and_write, Boundary, Error, FeatureStack, FeatureTable, Field, FieldSet,
    FieldSource, MemorySink, MemorySource, PipelineConfig, SymmTensor, Tensor, UniformGrid,
    Variant, Vec3,
};

const TIME: &str = "1000";
const NU: f64 = 1.5e-5;

fn grid() -> UniformGrid {
    UniformGrid::new([3, 4, 2], Vec3::new(0.5, 0.25, 1.0))
        .unwrap()
        .with_wall(Boundary::YMin)
        .with_wall(Boundary::YMax)
}

fn linear_velocity(grid: &UniformGrid, g: Tensor) -> Vec<Vec3> {
    // U_j = Σ_i x_i G_ij
    grid.cell_centres()
        .iter()
        .map(|x| g.transpose() * x)
        .collect()
}

fn pure_strain() -> Tensor {
    Tensor::from_diagonal(&Vec3::new(1.0, -0.5, -0.5))
}

fn rans_source(grid: &UniformGrid, g: Tensor) -> MemorySource {
    let centres = grid.cell_centres();
    let n = grid.n_cells();
    MemorySource::new()
        .with(TIME, Field::new("U", dims::VELOCITY, linear_velocity(grid, g)))
        .with(
            TIME,
            Field::new("p", dims::KINEMATIC_PRESSURE, centres.iter().map(|c| 0.1 * c[0]).collect()),
        )
        .with(
            TIME,
            Field::new(
                "k",
                dims::SPECIFIC_ENERGY,
                centres.iter().map(|c| 0.2 + 0.1 * c[1]).collect(),
            ),
        )
        .with(
            TIME,
            Field::new("omega", dims::RATE, centres.iter().map(|c| 50.0 - 10.0 * c[1]).collect()),
        )
        .with(TIME, Field::uniform("nut", dims::KINEMATIC_VISCOSITY, n, 1e-3))
}

fn rans_config() -> PipelineConfig {
    PipelineConfig {
        viscosity: Viscosity::Uniform(NU),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_pure_strain_scenario() {
    let grid = grid();
    let source = rans_source(&grid, pure_strain());
    let fields = run(&rans_config(), &source, &grid, TIME).unwrap().fields;

    let s = fields.values::<SymmTensor>("S").unwrap();
    let r = fields.values::<Tensor>("R").unwrap();
    for (s, r) in s.iter().zip(r) {
        assert_relative_eq!(s.to_tensor(), pure_strain(), epsilon = 1e-12);
        assert_eq!(*r, Tensor::zeros());
    }

    for q1 in fields.scalar("q1").unwrap() {
        assert_relative_eq!(*q1, -0.5, epsilon = 1e-12);
    }

    // Every Pope tensor with a rotation factor vanishes exactly
    for i in [2, 4, 5, 6, 7, 8, 9, 10] {
        let t = fields.values::<SymmTensor>(&format!("T{}", i)).unwrap();
        assert!(t.iter().all(|t| *t == SymmTensor::zero()), "T{} is not zero", i);
    }
    for name in ["lambda2", "lambda4", "lambda5"] {
        assert!(fields.scalar(name).unwrap().iter().all(|l| *l == 0.0));
    }

    // T1 = Ŝ = T_t_nut·S
    let t1 = fields.values::<SymmTensor>("T1").unwrap();
    let t_t_nut = fields.scalar("T_t_nut").unwrap();
    for (t1, t) in t1.iter().zip(t_t_nut) {
        assert_relative_eq!(t1.to_tensor(), pure_strain() * *t, epsilon = 1e-12);
    }
}

#[test]
fn test_rans_feature_values() {
    let grid = grid();
    let g = Tensor::new(0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    let source = rans_source(&grid, g);
    let fields = run(&rans_config(), &source, &grid, TIME).unwrap().fields;

    let k = source.load_scalar("k", TIME).unwrap();
    let omega = source.load_scalar("omega", TIME).unwrap();
    let epsilon = fields.scalar("epsilon").unwrap();
    for ((k, w), e) in k.values().iter().zip(omega.values()).zip(epsilon) {
        assert_relative_eq!(*e, 0.09 * k * w, max_relative = 1e-12);
    }

    // Simple shear: equal strain and rotation magnitudes
    for q1 in fields.scalar("q1").unwrap() {
        assert_relative_eq!(*q1, 0.0, epsilon = 1e-12);
    }

    // U = (2y, 0, 0) so DU/Dt = U·∇U = 0 and gradU[0][1] = 2
    for (dudt, grad_u) in fields
        .values::<Vec3>("DUDt")
        .unwrap()
        .iter()
        .zip(fields.values::<Tensor>("gradU").unwrap())
    {
        assert_relative_eq!(*dudt, Vec3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(grad_u[(0, 1)], 2.0, epsilon = 1e-12);
    }

    let y = fields.scalar("wallDistance").unwrap();
    assert_relative_eq!(y[0], 0.125);
    for (b, turb_r) in fields
        .values::<SymmTensor>("b")
        .unwrap()
        .iter()
        .zip(fields.values::<SymmTensor>("turbR").unwrap())
    {
        assert_relative_eq!(b.trace(), 0.0, epsilon = 1e-12);
        assert!(turb_r.0.iter().all(|c| c.is_finite()));
    }
    for i in 1..=9 {
        assert!(fields
            .scalar(&format!("q{}", i))
            .unwrap()
            .iter()
            .all(|q| q.is_finite()));
    }
}

#[test]
fn test_rans_field_order() {
    let grid = grid();
    let fields = run(&rans_config(), &rans_source(&grid, pure_strain()), &grid, TIME)
        .unwrap()
        .fields;
    let names: Vec<&str> = fields.names().collect();
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();

    assert_eq!(names[0], "T1");
    assert!(position("T10") < position("I1_1"));
    assert!(position("I1_47") < position("I2_1"));
    assert!(position("I2_47") < position("q1"));
    assert!(position("q9") < position("S"));
    assert!(position("S") < position("Shat"));
    assert!(position("Rhat") < position("R"));
    assert!(position("lambda5") < position("gradp"));
    assert_eq!(names.last(), Some(&"b"));
    assert_eq!(fields.len(), 10 + 47 + 47 + 9 + 4 + 3 + 5 + 4 + 1 + 4 + 2 + 1 + 1 + 1 + 3);
}

fn assert_basis_square(fields: &FieldSet, basis: &str, generator: &str) {
    let b = fields.values::<Tensor>(basis).unwrap();
    let x = fields.values::<Tensor>(generator).unwrap();
    for (b, x) in b.iter().zip(x) {
        assert_relative_eq!(*b, x * x, epsilon = 1e-14, max_relative = 1e-12);
    }
}

#[test]
fn test_both_antisymmetric_families() {
    let grid = grid();
    let mut config = rans_config();
    config.antisymmetric_source = Some(AntisymmetricSource::Both);
    config.output.write_integrity_basis = true;
    let fields = run(&config, &rans_source(&grid, pure_strain()), &grid, TIME)
        .unwrap()
        .fields;

    for name in ["Ap", "Aphat", "Ao", "Aohat", "Ak", "Akhat", "B1", "B47"] {
        assert!(fields.contains(name), "missing {}", name);
    }

    // Âo generates the basis: B4 = Âo²
    assert_basis_square(&fields, "B4", "Aohat");
}

#[test]
fn test_pressure_gradient_basis() {
    let grid = grid();
    let mut config = rans_config();
    config.antisymmetric_source = Some(AntisymmetricSource::PressureGradient);
    config.output.write_integrity_basis = true;
    let fields = run(&config, &rans_source(&grid, pure_strain()), &grid, TIME)
        .unwrap()
        .fields;
    assert!(!fields.contains("Ao"));
    assert_basis_square(&fields, "B4", "Aphat");

    // ∇p = (0.1, 0, 0)
    let ap = fields.values::<Tensor>("Ap").unwrap();
    assert_relative_eq!(ap[0][(1, 2)], -0.1, epsilon = 1e-12);
    assert_relative_eq!(ap[0][(2, 1)], 0.1, epsilon = 1e-12);
}

#[test]
fn test_epsilon_dissipation() {
    let grid = grid();
    let n = grid.n_cells();
    let source = MemorySource::new()
        .with(TIME, Field::new("U", dims::VELOCITY, linear_velocity(&grid, pure_strain())))
        .with(TIME, Field::uniform("p", dims::KINEMATIC_PRESSURE, n, 0.0))
        .with(TIME, Field::uniform("k", dims::SPECIFIC_ENERGY, n, 0.5))
        .with(TIME, Field::uniform("epsilon", dims::DISSIPATION_RATE, n, 0.9))
        .with(TIME, Field::uniform("nut", dims::KINEMATIC_VISCOSITY, n, 1e-3))
        .with(TIME, Field::uniform("nu", dims::KINEMATIC_VISCOSITY, n, NU));
    let config = PipelineConfig {
        dissipation: Dissipation::Epsilon,
        ..PipelineConfig::default()
    };

    let fields = run(&config, &source, &grid, TIME).unwrap().fields;
    assert!(!fields.contains("epsilon"));
    for w in fields.scalar("omega").unwrap() {
        assert_relative_eq!(*w, 0.9 / (0.09 * 0.5), max_relative = 1e-12);
    }
    for t in fields.scalar("T_t_ke").unwrap() {
        assert_relative_eq!(*t, 0.5 / 0.9, max_relative = 1e-12);
    }
}

#[test]
fn test_missing_tke() {
    let grid = grid();
    let n = grid.n_cells();
    let source = MemorySource::new()
        .with(TIME, Field::new("U", dims::VELOCITY, vec![Vec3::zeros(); n]))
        .with(TIME, Field::uniform("p", dims::KINEMATIC_PRESSURE, n, 0.0));

    let err = run(&rans_config(), &source, &grid, TIME).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingField { ref name, ref time } if name == "k" && time == TIME
    ));
    assert_eq!(err.to_string(), format!("required field 'k' missing at time {}", TIME));
}

#[test]
fn test_wrong_field_length() {
    let grid = grid();
    let source = rans_source(&grid, pure_strain())
        .with(TIME, Field::uniform("nut", dims::KINEMATIC_VISCOSITY, 3, 1e-3));
    let err = run(&rans_config(), &source, &grid, TIME).unwrap_err();
    assert!(matches!(err, Error::FieldLength { expected: 24, found: 3, .. }));
}

#[test]
fn test_omega_lean() {
    let grid = grid();
    let config = PipelineConfig {
        variant: Variant::RansOmegaLean,
        ..rans_config()
    };
    let fields = run(&config, &rans_source(&grid, pure_strain()), &grid, TIME)
        .unwrap()
        .fields;
    assert!(!fields.contains("q5"));
    assert!(!fields.contains("T1"));

    // turbR is uniform in x and z, so only ∂/∂y contributes
    let div = fields.values::<Vec3>("divturbR").unwrap();
    assert!(div.iter().all(|d| d[0].is_finite() && d[1].is_finite()));
    let grad_nut = fields.values::<Vec3>("gradnut").unwrap();
    assert!(grad_nut.iter().all(|g| *g == Vec3::zeros()));
}

fn shear_stress(s: &Tensor, k: f64, nut: f64) -> SymmTensor {
    let tau = Tensor::identity() * (2.0 / 3.0 * k) - s * (2.0 * nut);
    SymmTensor::from_tensor(&tau)
}

#[test]
fn test_dns_small_tke_guard() {
    let grid = UniformGrid::new([2, 1, 1], Vec3::new(1.0, 1.0, 1.0)).unwrap();
    let tau = vec![
        SymmTensor::new([1.0e-12, 0.3e-12, 0.0, 0.6e-12, 0.0, 0.4e-12]),
        SymmTensor::new([0.4, 0.1, 0.0, 0.3, 0.0, 0.3]),
    ];
    let source = MemorySource::new()
        .with(TIME, Field::new("U", dims::VELOCITY, vec![Vec3::zeros(); 2]))
        .with(TIME, Field::new("tau", dims::SPECIFIC_ENERGY, tau.clone()));
    let config = PipelineConfig::for_variant(Variant::Dns);

    let fields = run(&config, &source, &grid, TIME).unwrap().fields;
    let k = fields.scalar("k").unwrap();
    assert_relative_eq!(k[0], 1e-12, max_relative = 1e-12);

    let a = fields.values::<SymmTensor>("a").unwrap();
    let b = fields.values::<SymmTensor>("b").unwrap();
    // max(1e-10, 2·1e-12) = 1e-10
    assert_relative_eq!(b[0].0, a[0].0 / 1e-10, max_relative = 1e-12);
    assert_relative_eq!(b[1].0, a[1].0 / 1.0, max_relative = 1e-12);
    assert_eq!(fields.values::<SymmTensor>("tau").unwrap(), tau.as_slice());
}

#[test]
fn test_dns_eddy_viscosity_fit() {
    let grid = grid();
    let g = Tensor::new(0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    let s = 0.5 * (g + g.transpose());
    let tau = vec![shear_stress(&s, 0.3, 0.02); grid.n_cells()];
    let source = MemorySource::new()
        .with(TIME, Field::new("U", dims::VELOCITY, linear_velocity(&grid, g)))
        .with(TIME, Field::new("tau", dims::SPECIFIC_ENERGY, tau));
    let mut config = PipelineConfig::for_variant(Variant::Dns);
    config.output.eddy_viscosity_fit = true;

    let fields = run(&config, &source, &grid, TIME).unwrap().fields;
    for nut in fields.scalar("nut_nnls").unwrap() {
        assert_relative_eq!(*nut, 0.02, max_relative = 1e-10);
    }
    for r2 in fields.scalar("r2_nnls").unwrap() {
        assert_relative_eq!(*r2, 1.0, epsilon = 1e-10);
    }
    for pfv in fields.values::<Vec3>("pfv").unwrap() {
        assert_relative_eq!(*pfv, Vec3::zeros(), epsilon = 1e-10);
    }
}

#[test]
fn test_les_stress() {
    let grid = grid();
    let n = grid.n_cells();
    let g = Tensor::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    let resolved = SymmTensor::new([0.2, -0.05, 0.0, 0.1, 0.0, 0.1]);
    let source = MemorySource::new()
        .with(TIME, Field::new("UMean", dims::VELOCITY, linear_velocity(&grid, g)))
        .with(TIME, Field::uniform("UPrime2Mean", dims::SPECIFIC_ENERGY, n, resolved))
        .with(TIME, Field::uniform("kMean", dims::SPECIFIC_ENERGY, n, 0.01))
        .with(TIME, Field::uniform("nutMean", dims::KINEMATIC_VISCOSITY, n, 1e-4));
    let config = PipelineConfig::for_variant(Variant::Les);

    let fields = run(&config, &source, &grid, TIME).unwrap().fields;
    let names: Vec<&str> = fields.names().collect();
    assert_eq!(
        names,
        vec![
            "subgrid_tauMean", "tauMean", "aMean", "bMean", "kMean_tauMean", "gradUMean", "SMean",
            "RMean",
        ]
    );

    let s = 0.5 * (g + g.transpose());
    let subgrid = shear_stress(&s, 0.01, 1e-4);
    let tau = fields.values::<SymmTensor>("tauMean").unwrap();
    assert_relative_eq!(tau[0].0, resolved.0 + subgrid.0, epsilon = 1e-14);
    let k_tau = fields.scalar("kMean_tauMean").unwrap();
    assert_relative_eq!(k_tau[0], 0.5 * (0.4 + 0.02), max_relative = 1e-12);
}

#[test]
fn test_feature_stack_of_rans_run() {
    let grid = grid();
    let fields = run(&rans_config(), &rans_source(&grid, pure_strain()), &grid, TIME)
        .unwrap()
        .fields;
    let stack = FeatureStack::from_field_set(&fields);
    assert_eq!(stack.n_q(), 9);
    assert_eq!(stack.q.len(), grid.n_cells());
    assert!(stack.lambda.is_some());
    assert!(stack.t.is_some());
    assert_eq!(stack.i1.as_ref().map(|i| i.len()), Some(grid.n_cells()));

    let table = FeatureTable::from_fields(&fields, &["q1", "q2", "b"]).unwrap();
    assert_eq!(table.n_columns(), 2 + 6);
    assert_eq!(table.n_rows(), grid.n_cells());
}

#[test]
fn test_written_fields_can_be_reread() {
    let grid = grid();
    let mut sink = MemorySink::new();
    let stats = run_and_write(
        &rans_config(),
        &rans_source(&grid, pure_strain()),
        &grid,
        &mut sink,
        TIME,
    )
    .unwrap();
    assert_eq!(stats.n_locations, grid.n_cells());
    assert!(!stats.stage_timings.is_empty());

    let reread = sink.into_source();
    let q1 = reread.load_scalar("q1", TIME).unwrap();
    assert_eq!(q1.len(), grid.n_cells());
    assert!(reread.load_symm_tensor("T3", TIME).is_ok());
    assert!(matches!(
        reread.load_vector("q1", TIME),
        Err(Error::FieldKind { .. })
    ));
}
