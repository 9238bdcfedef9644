//! The feature-extraction pipeline for one snapshot.
//!
//! ```text
//! load fields ─┬─> kinematics ─> turbulence ─> nondim ─> basis ─> FieldSet
//! operators  ──┘
//! ```
//!
//! All four variants run through [`run`]; the configured
//! [`Capabilities`] decide where the Reynolds stress comes from, whether the
//! tensor basis is built and which fields are handed back. Stage results are
//! plain values passed to the next stage, and every stage maps over locations
//! with rayon.
//!
//! # Inputs by variant
//!
//! | variant | fields read |
//! |---|---|
//! | rans, rans_omega_lean | `U`, `p`, `k`, `omega` or `epsilon`, `nut`, `nu` (unless uniform) |
//! | les | `UMean`, `UPrime2Mean`, `kMean`, `nutMean` |
//! | dns | `U`, `tau` |

use crate::basis::{IntegrityFields, PopeFields};
use crate::config::{
    AntisymmetricSource, Capabilities, Dissipation, PipelineConfig, ReynoldsStressSource,
    Viscosity,
};
use crate::dimension::{dims, Dimension};
use crate::discretization::Discretization;
use crate::eddy_viscosity::EddyViscosityFit;
use crate::error::Result;
use crate::field::{Field, FieldSet};
use crate::io::{FieldSink, FieldSource};
use crate::kinematics::KinematicFields;
use crate::nondim::{AntisymmetricPair, GradientSource, ScaledKinematics};
use crate::turbulence::{
    epsilon_from_omega, omega_from_epsilon, DnsStress, Guards, LesStress, RansInputs,
    RansTurbulence,
};
use crate::types::{SymmTensor, Tensor, Vec3};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Timings and sizes of a run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub n_locations: usize,
    pub n_fields: usize,
    /// (stage, wall time) in execution order.
    pub stage_timings: Vec<(&'static str, Duration)>,
    pub total: Duration,
}

/// Derived fields of one snapshot.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub fields: FieldSet,
    pub stats: PipelineStats,
}

/// Compute every derived field of the configured variant at `time`.
///
/// Fails with [`Error::MissingField`](crate::Error::MissingField) as soon as
/// a mandatory input is absent; nothing is returned for a partial run.
pub fn run<S, D>(
    config: &PipelineConfig,
    source: &S,
    discretization: &D,
    time: &str,
) -> Result<PipelineOutput>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
{
    config.validate()?;

    if config.n_threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.n_threads)
            .build()?;
        debug!("Running pipeline on {} threads", config.n_threads);
        pool.install(|| run_stages(config, source, discretization, time))
    } else {
        run_stages(config, source, discretization, time)
    }
}

/// [`run`], then hand every derived field to `sink`.
pub fn run_and_write<S, D, W>(
    config: &PipelineConfig,
    source: &S,
    discretization: &D,
    sink: &mut W,
    time: &str,
) -> Result<PipelineStats>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
    W: FieldSink + ?Sized,
{
    let output = run(config, source, discretization, time)?;
    info!("Writing extra {} fields....", label(config));
    sink.write_all(time, &output.fields)?;
    info!("Finished writing extra {} fields.", label(config));
    Ok(output.stats)
}

fn label(config: &PipelineConfig) -> &'static str {
    match config.capabilities().reynolds_stress {
        ReynoldsStressSource::EddyViscosity => "RANS",
        ReynoldsStressSource::ResolvedPlusSubgrid => "LES",
        ReynoldsStressSource::Direct => "DNS",
    }
}

struct StageTimer {
    start: Instant,
    lap: Instant,
    n_locations: usize,
    timings: Vec<(&'static str, Duration)>,
}

impl StageTimer {
    fn new(n_locations: usize) -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap: now,
            n_locations,
            timings: Vec::new(),
        }
    }

    fn stage(&mut self, name: &'static str) {
        let elapsed = self.lap.elapsed();
        debug!("{}: {:?} for {} locations", name, elapsed, self.n_locations);
        self.timings.push((name, elapsed));
        self.lap = Instant::now();
    }

    fn finish(self, fields: &FieldSet) -> PipelineStats {
        PipelineStats {
            n_locations: self.n_locations,
            n_fields: fields.len(),
            stage_timings: self.timings,
            total: self.start.elapsed(),
        }
    }
}

fn run_stages<S, D>(
    config: &PipelineConfig,
    source: &S,
    discretization: &D,
    time: &str,
) -> Result<PipelineOutput>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
{
    let n = discretization.n_locations();
    if n == 0 {
        warn!("Discretization has no locations, every field will be empty");
    }
    let caps = config.capabilities();
    info!("Time = {}", time);
    info!("Calculating extra {} fields....", label(config));

    let mut timer = StageTimer::new(n);
    let mut out = FieldSet::new(n);
    let ctx = Context {
        config,
        caps,
        source,
        discretization,
        time,
        n,
    };

    match caps.reynolds_stress {
        ReynoldsStressSource::EddyViscosity => rans(&ctx, &mut out, &mut timer)?,
        ReynoldsStressSource::ResolvedPlusSubgrid => les(&ctx, &mut out, &mut timer)?,
        ReynoldsStressSource::Direct => dns(&ctx, &mut out, &mut timer)?,
    }

    let stats = timer.finish(&out);
    info!(
        "Calculated {} fields at {} locations in {:?}",
        stats.n_fields, stats.n_locations, stats.total
    );
    Ok(PipelineOutput { fields: out, stats })
}

struct Context<'a, S: ?Sized, D: ?Sized> {
    config: &'a PipelineConfig,
    caps: Capabilities,
    source: &'a S,
    discretization: &'a D,
    time: &'a str,
    n: usize,
}

impl<S, D> Context<'_, S, D>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
{
    fn guards(&self) -> &Guards {
        &self.config.guards
    }

    fn scalar(&self, name: &str) -> Result<Field<f64>> {
        let field = self.source.load_scalar(name, self.time)?;
        field.check_len(self.n)?;
        Ok(field)
    }

    fn vector(&self, name: &str) -> Result<Field<Vec3>> {
        let field = self.source.load_vector(name, self.time)?;
        field.check_len(self.n)?;
        Ok(field)
    }

    fn symm_tensor(&self, name: &str) -> Result<Field<SymmTensor>> {
        let field = self.source.load_symm_tensor(name, self.time)?;
        field.check_len(self.n)?;
        Ok(field)
    }

    fn viscosity(&self) -> Result<Field<f64>> {
        match self.config.viscosity {
            Viscosity::Uniform(nu) => Ok(Field::uniform(
                "nu",
                dims::KINEMATIC_VISCOSITY,
                self.n,
                nu,
            )),
            Viscosity::Field => self.scalar("nu"),
        }
    }

    /// (ε, ω); the one not stored in the case is derived from k.
    fn dissipation(&self, k: &Field<f64>) -> Result<(Field<f64>, Field<f64>)> {
        let guards = *self.guards();
        let k = k.values();
        match self.config.dissipation {
            Dissipation::Omega => {
                let omega = self.scalar("omega")?;
                let epsilon = omega
                    .values()
                    .par_iter()
                    .zip(k.par_iter())
                    .map(|(w, k)| epsilon_from_omega(*k, *w))
                    .collect();
                Ok((Field::new("epsilon", dims::DISSIPATION_RATE, epsilon), omega))
            }
            Dissipation::Epsilon => {
                let epsilon = self.scalar("epsilon")?;
                let omega = epsilon
                    .values()
                    .par_iter()
                    .zip(k.par_iter())
                    .map(|(e, k)| omega_from_epsilon(*k, *e, &guards))
                    .collect();
                Ok((epsilon, Field::new("omega", dims::RATE, omega)))
            }
        }
    }

    fn grad(&self, field: &Field<f64>, name: &str, dimension: Dimension) -> Field<Vec3> {
        Field::new(name, dimension, self.discretization.grad_scalar(field.values()))
    }

    fn kinematics(&self, u: &Field<Vec3>) -> Result<KinematicFields> {
        let raw = self.discretization.grad_vector(u.values());
        KinematicFields::compute(u, &raw)
    }

    fn divergence(&self, field: &Field<SymmTensor>, name: &str) -> Field<Vec3> {
        let tensors: Vec<Tensor> = field.values().iter().map(|t| t.to_tensor()).collect();
        Field::new(name, dims::ACCELERATION, self.discretization.div_tensor(&tensors))
    }

    /// Optimal eddy-viscosity fit of reference data, if configured.
    fn eddy_viscosity_fit(
        &self,
        s: &Field<SymmTensor>,
        a: &Field<SymmTensor>,
        k: &Field<f64>,
        out: &mut FieldSet,
    ) -> Result<()> {
        if !self.config.output.eddy_viscosity_fit {
            return Ok(());
        }
        let fit =
            EddyViscosityFit::optimal(s.values(), a.values(), Some(k.values()), self.guards())?;
        let pfv = fit.perturbation_force(self.discretization)?;
        out.insert(fit.nut)?;
        if let Some(r2) = fit.r2 {
            out.insert(r2)?;
        }
        out.insert(fit.aperp)?;
        if let Some(bperp) = fit.bperp {
            out.insert(bperp)?;
        }
        out.insert(pfv)?;
        Ok(())
    }
}

fn rans<S, D>(ctx: &Context<'_, S, D>, out: &mut FieldSet, timer: &mut StageTimer) -> Result<()>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
{
    let guards = *ctx.guards();
    let write_inputs = ctx.config.output.write_inputs;

    let u = ctx.vector("U")?;
    let p = ctx.scalar("p")?;
    let k = ctx.scalar("k")?;
    let (epsilon, omega) = ctx.dissipation(&k)?;
    let nut = ctx.scalar("nut")?;
    let nu = ctx.viscosity()?;
    let y = Field::new("wallDistance", dims::LENGTH, ctx.discretization.wall_distance());
    y.check_len(ctx.n)?;
    timer.stage("load");

    let kin = ctx.kinematics(&u)?;
    let grad_p = ctx.grad(&p, "gradp", dims::ACCELERATION);
    let grad_k = ctx.grad(&k, "gradk", dims::ACCELERATION);
    let grad_omega = ctx.grad(&omega, "gradomega", dims::OMEGA_GRADIENT);
    timer.stage("kinematics");

    let turb = RansTurbulence::compute(
        &RansInputs {
            k: k.values(),
            epsilon: epsilon.values(),
            omega: omega.values(),
            nut: nut.values(),
            nu: nu.values(),
            y: y.values(),
            s: kin.s.values(),
            r: kin.r.values(),
            grad_k: grad_k.values(),
            grad_omega: grad_omega.values(),
        },
        &guards,
    )?;
    timer.stage("turbulence");

    if ctx.caps.extra_gradients {
        let div_turb_r = ctx.divergence(&turb.turb_r, "divturbR");
        let grad_epsilon = ctx.grad(&epsilon, "gradepsilon", dims::DISSIPATION_GRADIENT);
        let grad_nut = ctx.grad(&nut, "gradnut", dims::VISCOSITY_GRADIENT);
        timer.stage("gradients");

        out.insert(turb.turb_r)?;
        out.insert(div_turb_r)?;
        for q in turb.q.into_iter().take(ctx.caps.n_q) {
            out.insert(q)?;
        }
        out.insert(kin.s)?;
        out.insert(kin.r)?;
        out.insert(grad_p)?;
        out.insert(grad_k)?;
        out.insert(kin.grad_u)?;
        out.insert(grad_epsilon)?;
        out.insert(grad_nut)?;
        out.insert(grad_omega)?;
        if write_inputs {
            out.insert(p)?;
        }
        out.insert(epsilon)?;
        out.insert(kin.dudt)?;
        if write_inputs {
            out.insert(y)?;
        }
        out.insert(turb.t_t_ke)?;
        return Ok(());
    }

    let mut pairs = Vec::new();
    let mut hats = None;
    if let Some(antisymmetric) = ctx.caps.antisymmetric {
        let scaled =
            ScaledKinematics::compute(turb.t_t_nut.values(), kin.s.values(), kin.r.values())?;

        let mut sources = Vec::new();
        if matches!(
            antisymmetric,
            AntisymmetricSource::OmegaGradient | AntisymmetricSource::Both
        ) {
            sources.push((GradientSource::Omega, grad_omega.values(), turb.c_ao.values()));
        }
        if matches!(
            antisymmetric,
            AntisymmetricSource::PressureGradient | AntisymmetricSource::Both
        ) {
            sources.push((GradientSource::Pressure, grad_p.values(), turb.c_ak.values()));
        }
        sources.push((GradientSource::Tke, grad_k.values(), turb.c_ak.values()));
        for (source, grad, scale) in sources {
            pairs.push(AntisymmetricPair::compute(source, grad, scale)?);
        }
        timer.stage("nondim");

        // Âo whenever it is computed, otherwise Âp; Ây is always Âk
        let x = &pairs[0].a_hat;
        let y_hat = &pairs[pairs.len() - 1].a_hat;
        let pope = PopeFields::compute(scaled.shat.values(), scaled.rhat.values())?;
        let integrity = IntegrityFields::compute(
            scaled.shat.values(),
            scaled.rhat.values(),
            x.values(),
            y_hat.values(),
            ctx.config.output.write_integrity_basis,
        )?;
        timer.stage("basis");
        hats = Some((scaled, pope, integrity));
    }

    let mut pope_lambdas = None;
    let mut scaled_fields = None;
    if let Some((scaled, pope, integrity)) = hats {
        for t in pope.t {
            out.insert(t)?;
        }
        for i1 in integrity.i1 {
            out.insert(i1)?;
        }
        for i2 in integrity.i2 {
            out.insert(i2)?;
        }
        for b in integrity.basis.into_iter().flatten() {
            out.insert(b)?;
        }
        pope_lambdas = Some(pope.lambda);
        scaled_fields = Some(scaled);
    }

    for q in turb.q.into_iter().take(ctx.caps.n_q) {
        out.insert(q)?;
    }
    out.insert(kin.s)?;
    if let Some(scaled) = scaled_fields {
        out.insert(scaled.shat)?;
        out.insert(scaled.rhat)?;
    }
    out.insert(kin.r)?;
    out.insert(turb.t_t_ke)?;
    out.insert(turb.t_t_nut)?;
    out.insert(turb.t_k)?;
    for lambda in pope_lambdas.into_iter().flatten() {
        out.insert(lambda)?;
    }
    out.insert(grad_p)?;
    out.insert(grad_k)?;
    out.insert(kin.grad_u)?;
    out.insert(grad_omega)?;
    if write_inputs {
        out.insert(p)?;
    }
    for pair in pairs.iter() {
        out.insert(pair.a.clone())?;
    }
    for pair in pairs {
        out.insert(pair.a_hat)?;
    }
    out.insert(turb.c_ak)?;
    out.insert(turb.c_ao)?;
    match ctx.config.dissipation {
        Dissipation::Omega => out.insert(epsilon)?,
        Dissipation::Epsilon => out.insert(omega)?,
    }
    out.insert(kin.dudt)?;
    if write_inputs {
        out.insert(y)?;
    }
    out.insert(turb.turb_r)?;
    out.insert(turb.a)?;
    out.insert(turb.b)?;
    Ok(())
}

fn les<S, D>(ctx: &Context<'_, S, D>, out: &mut FieldSet, timer: &mut StageTimer) -> Result<()>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
{
    let u_mean = ctx.vector("UMean")?;
    let u_prime2_mean = ctx.symm_tensor("UPrime2Mean")?;
    let k_mean = ctx.scalar("kMean")?;
    let nut_mean = ctx.scalar("nutMean")?;
    timer.stage("load");

    let kin = ctx.kinematics(&u_mean)?.with_suffix("Mean");
    timer.stage("kinematics");

    let stress = LesStress::compute(
        u_prime2_mean.values(),
        k_mean.values(),
        nut_mean.values(),
        kin.s.values(),
        ctx.guards(),
    )?;
    timer.stage("turbulence");

    ctx.eddy_viscosity_fit(&kin.s, &stress.a, &stress.k_tau, out)?;
    if ctx.config.output.eddy_viscosity_fit {
        timer.stage("eddy viscosity fit");
    }

    out.insert(stress.subgrid_tau)?;
    out.insert(stress.tau)?;
    out.insert(stress.a)?;
    out.insert(stress.b)?;
    out.insert(stress.k_tau)?;
    out.insert(kin.grad_u)?;
    out.insert(kin.s)?;
    out.insert(kin.r)?;
    Ok(())
}

fn dns<S, D>(ctx: &Context<'_, S, D>, out: &mut FieldSet, timer: &mut StageTimer) -> Result<()>
where
    S: FieldSource + ?Sized,
    D: Discretization + ?Sized,
{
    let u = ctx.vector("U")?;
    let tau = ctx.symm_tensor("tau")?;
    timer.stage("load");

    let stress = DnsStress::compute(tau.values(), ctx.guards());
    let kin = ctx.kinematics(&u)?;
    timer.stage("kinematics");

    ctx.eddy_viscosity_fit(&kin.s, &stress.a, &stress.k, out)?;
    if ctx.config.output.eddy_viscosity_fit {
        timer.stage("eddy viscosity fit");
    }

    if ctx.config.output.write_inputs {
        out.insert(tau)?;
    }
    out.insert(stress.a)?;
    out.insert(stress.b)?;
    out.insert(stress.k)?;
    out.insert(kin.grad_u)?;
    out.insert(kin.s)?;
    out.insert(kin.r)?;
    Ok(())
}
