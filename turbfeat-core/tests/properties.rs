//! Property-based tests for the tensor algebra using proptest
//!
//! These tests verify invariants hold across random velocity gradients:
//! - S symmetric, R antisymmetric, S - R recovers the gradient
//! - Pope basis tensors symmetric and traceless
//! - Basis invariants and λ unchanged under a rigid rotation of all generators
//! - Guarded features finite at zero k, ε, ω and S
//! - Invariants that vanish identically for planar flow

use approx::relative_eq;
use nalgebra::Rotation3;
use proptest::prelude::*;
use turbfeat_core::basis::{invariants, lambdas, pope_basis, Generators, N_INTEGRITY};
use turbfeat_core::eddy_viscosity::nnls_fit;
use turbfeat_core::kinematics::{rotation_rate, strain_rate};
use turbfeat_core::turbulence::{anisotropy, eddy_viscosity_stress, q_features, Guards, QInputs};
use turbfeat_core::types::{antisymmetric_from_vector, skew, symm};
use turbfeat_core::{SymmTensor, Tensor, Vec3};

const TOL: f64 = 1e-9;

fn tensor() -> impl Strategy<Value = Tensor> {
    prop::array::uniform9(-1.0f64..1.0).prop_map(|c| Tensor::from_row_slice(&c))
}

fn vector() -> impl Strategy<Value = Vec3> {
    prop::array::uniform3(-1.0f64..1.0).prop_map(|c| Vec3::from_row_slice(&c))
}

/// Proper rotation from a scaled axis (zero axis is the identity).
fn rotation() -> impl Strategy<Value = Tensor> {
    prop::array::uniform3(-3.0f64..3.0)
        .prop_map(|c| Rotation3::from_scaled_axis(Vec3::from_row_slice(&c)).into_inner())
}

fn generators(g: &Tensor, x: &Vec3, y: &Vec3) -> Generators {
    Generators {
        s: strain_rate(g).to_tensor(),
        r: rotation_rate(g),
        x: antisymmetric_from_vector(x),
        y: antisymmetric_from_vector(y),
    }
}

/// Velocity gradient and scalar gradients confined to the x-y plane.
fn planar_generators() -> impl Strategy<Value = Generators> {
    (
        prop::array::uniform4(-1.0f64..1.0),
        prop::array::uniform2(-1.0f64..1.0),
        prop::array::uniform2(-1.0f64..1.0),
    )
        .prop_map(|(g, x, y)| {
            let g = Tensor::new(g[0], g[1], 0.0, g[2], g[3], 0.0, 0.0, 0.0, 0.0);
            generators(&g, &Vec3::new(x[0], x[1], 0.0), &Vec3::new(y[0], y[1], 0.0))
        })
}

fn rotate(q: &Tensor, t: &Tensor) -> Tensor {
    q * t * q.transpose()
}

fn close(a: f64, b: f64) -> bool {
    relative_eq!(a, b, epsilon = TOL, max_relative = TOL)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_strain_and_rotation_split_gradient(g in tensor()) {
        let s = strain_rate(&g).to_tensor();
        let r = rotation_rate(&g);
        prop_assert!(relative_eq!(s, s.transpose()));
        prop_assert!(relative_eq!(r, -r.transpose()));
        prop_assert!(relative_eq!(s - r, g, epsilon = 1e-14));
        prop_assert!(relative_eq!(s, symm(&g), epsilon = 1e-15));
        prop_assert!(relative_eq!(r, -skew(&g), epsilon = 1e-15));
    }

    #[test]
    fn prop_pope_basis_symmetric_traceless(g in tensor()) {
        // Incompressible part only
        let g = g - Tensor::identity() * (g.trace() / 3.0);
        let s = strain_rate(&g).to_tensor();
        let r = rotation_rate(&g);
        for (i, t) in pope_basis(&s, &r).iter().enumerate() {
            prop_assert!(
                relative_eq!(*t, t.transpose(), epsilon = TOL),
                "T{} not symmetric",
                i + 1
            );
            prop_assert!(t.trace().abs() < TOL, "T{} has trace {}", i + 1, t.trace());
        }
    }

    #[test]
    fn prop_integrity_invariants_rotation_invariant(
        g in tensor(),
        x in vector(),
        y in vector(),
        q in rotation(),
    ) {
        let original = generators(&g, &x, &y);
        let rotated = Generators {
            s: rotate(&q, &original.s),
            r: rotate(&q, &original.r),
            x: rotate(&q, &original.x),
            y: rotate(&q, &original.y),
        };
        let before = original.integrity_basis();
        let after = rotated.integrity_basis();
        for i in 0..N_INTEGRITY {
            let (i1, i2) = invariants(&before[i]);
            let (j1, j2) = invariants(&after[i]);
            prop_assert!(close(i1, j1), "I1 of B{}: {} vs {}", i + 1, i1, j1);
            prop_assert!(close(i2, j2), "I2 of B{}: {} vs {}", i + 1, i2, j2);
        }
    }

    #[test]
    fn prop_lambdas_rotation_invariant(g in tensor(), q in rotation()) {
        let s = strain_rate(&g).to_tensor();
        let r = rotation_rate(&g);
        let before = lambdas(&s, &r);
        let after = lambdas(&rotate(&q, &s), &rotate(&q, &r));
        for (a, b) in before.iter().zip(after.iter()) {
            prop_assert!(close(*a, *b));
        }
    }

    #[test]
    fn prop_guarded_features_finite(
        g in prop_oneof![Just(Tensor::zeros()), tensor()],
        k in prop_oneof![Just(0.0), 0.0f64..1.0],
        epsilon in prop_oneof![Just(0.0), 0.0f64..1.0],
        omega in prop_oneof![Just(0.0), 0.0f64..100.0],
        y in 0.0f64..1.0,
        grad_k in vector(),
        grad_omega in vector(),
    ) {
        let guards = Guards::default();
        let s = strain_rate(&g).to_tensor();
        let r = rotation_rate(&g);
        let turb_r = eddy_viscosity_stress(k, 1e-3, &s);
        let (a, b) = anisotropy(&turb_r, k, &guards);
        prop_assert!(b.iter().all(|c| c.is_finite()));
        prop_assert!(a.trace().abs() < TOL);

        let q = q_features(
            &QInputs {
                k,
                epsilon,
                omega,
                nu: 1.5e-5,
                y,
                s: &s,
                r: &r,
                turb_r: &turb_r,
                grad_k: &grad_k,
                grad_omega: &grad_omega,
            },
            &guards,
        );
        for (i, v) in q.iter().enumerate() {
            prop_assert!(v.is_finite(), "q{} = {}", i + 1, v);
        }
    }

    #[test]
    fn prop_planar_flow_degenerate_invariants(g in planar_generators()) {
        let b = g.integrity_basis();
        // tr(RRSRSS), I2 of XXSRSS and I2 of YYRS
        prop_assert!(invariants(&b[7]).0.abs() < 1e-12);
        prop_assert!(invariants(&b[24]).1.abs() < 1e-12);
        prop_assert!(invariants(&b[28]).1.abs() < 1e-12);
    }

    #[test]
    fn prop_nnls_viscosity_non_negative(s in tensor(), a in tensor()) {
        let s = SymmTensor::from_tensor(&symm(&s));
        let a = SymmTensor::from_tensor(&symm(&a));
        let fit = nnls_fit(&s, &a);
        prop_assert!(fit.nut >= 0.0);
        prop_assert!(fit.r2 <= 1.0 + 1e-12);
    }
}
