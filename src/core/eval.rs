/// Evaluator: renders a [`Template`] against a [`Snapshot`].
///
/// Evaluation is all-or-nothing: the first failing value aborts the whole
/// line and no partial text is returned.

use std::fmt;
use thiserror::Error;

use super::ast::{AggregateKind, AggregateTag, Group, Item, Node, Template};
use super::orbit::OrbitError;
use crate::schema::snapshot::Snapshot;
use crate::schema::tag::{ParticleTag, SimTag, ValueKind};
use crate::schema::vector::Vec3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("could not get the orbit of particle {index}: {source}")]
    OrbitDegenerate { index: usize, source: OrbitError },
    #[error("cannot reduce {tag:?} over an empty particle set")]
    EmptyAggregate { tag: ParticleTag },
}

/// A resolved tag value, formatted per its [`ValueKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'s> {
    Scalar(f64),
    Vector(Vec3),
    Text(&'s str),
    Integer(u64),
}

impl Value<'_> {
    fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            _ => None,
        }
    }

    fn as_vector(&self) -> Option<Vec3> {
        match self {
            Value::Vector(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug keeps the decimal point on whole numbers: `4.0`, not `4`.
            Value::Scalar(x) => write!(f, "{:?}", x),
            Value::Vector(v) => write!(f, "({:?}|{:?}|{:?})", v.x, v.y, v.z),
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// Render one report line. No trailing newline is added.
pub fn evaluate<S: Snapshot + ?Sized>(template: &Template, snapshot: &S) -> Result<String, EvalError> {
    let eval = Evaluator { snapshot };
    let mut out = String::new();
    for node in &template.nodes {
        eval.node(node, &mut out)?;
    }
    Ok(out)
}

impl Template {
    pub fn evaluate<S: Snapshot + ?Sized>(&self, snapshot: &S) -> Result<String, EvalError> {
        evaluate(self, snapshot)
    }
}

struct Evaluator<'s, S: ?Sized> {
    snapshot: &'s S,
}

impl<'s, S: Snapshot + ?Sized> Evaluator<'s, S> {
    fn node(&self, node: &Node, out: &mut String) -> Result<(), EvalError> {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Simulation(tag) => out.push_str(&self.simulation(*tag).to_string()),
            Node::Aggregate(agg) => out.push_str(&self.aggregate(*agg)?.to_string()),
            Node::Group(group) => self.group(group, out)?,
        }
        Ok(())
    }

    fn group(&self, group: &Group, out: &mut String) -> Result<(), EvalError> {
        let count = self.snapshot.particle_count();
        // Aggregates do not depend on the iteration; reduce each one once.
        let mut reduced: Vec<Option<String>> = vec![None; group.items.len()];
        for index in 0..count {
            let start = out.len();
            for (item, cached) in group.items.iter().zip(reduced.iter_mut()) {
                self.item(item, index, cached, out)?;
            }
            if index + 1 == count {
                if let Some(sep) = group.trailing_separator() {
                    if out[start..].ends_with(sep) {
                        out.truncate(out.len() - sep.len());
                    }
                }
            }
        }
        Ok(())
    }

    fn item(
        &self,
        item: &Item,
        index: usize,
        cached: &mut Option<String>,
        out: &mut String,
    ) -> Result<(), EvalError> {
        match item {
            Item::Literal(text) => out.push_str(text),
            Item::Simulation(tag) => out.push_str(&self.simulation(*tag).to_string()),
            Item::Particle(tag) => out.push_str(&self.particle(*tag, index)?.to_string()),
            Item::Aggregate(agg) => {
                if cached.is_none() {
                    *cached = Some(self.aggregate(*agg)?.to_string());
                }
                out.push_str(cached.as_deref().unwrap_or_default());
            }
        }
        Ok(())
    }

    fn simulation(&self, tag: SimTag) -> Value<'s> {
        let snap = self.snapshot;
        match tag {
            SimTag::Name => Value::Text(snap.name()),
            SimTag::Time => Value::Scalar(snap.time()),
            SimTag::LastStep => Value::Scalar(snap.last_dt()),
            SimTag::ParticleCount => Value::Integer(snap.particle_count() as u64),
            SimTag::Integrator => Value::Text(snap.integrator()),
            SimTag::Gravity => Value::Scalar(snap.gravity()),
            SimTag::StepCount => Value::Integer(snap.step_count()),
            SimTag::WallTime => Value::Scalar(snap.wall_time()),
            SimTag::WallResolution => Value::Scalar(snap.wall_resolution()),
        }
    }

    fn particle(&self, tag: ParticleTag, index: usize) -> Result<Value<'s>, EvalError> {
        let snap = self.snapshot;
        let p = &snap.particles()[index];
        let orbit = || {
            snap.orbit(index)
                .map_err(|source| EvalError::OrbitDegenerate { index, source })
        };

        let value = match tag {
            ParticleTag::Mass => Value::Scalar(p.mass),
            ParticleTag::Radius => Value::Scalar(p.radius),
            ParticleTag::Name => Value::Text(&p.name),
            ParticleTag::Hash => Value::Integer(u64::from(p.id.0)),
            ParticleTag::SemiMajorAxis => Value::Scalar(orbit()?.semi_major_axis),
            ParticleTag::Eccentricity => Value::Scalar(orbit()?.eccentricity),
            ParticleTag::Inclination => Value::Scalar(orbit()?.inclination),
            ParticleTag::AscendingNode => Value::Scalar(orbit()?.ascending_node),
            ParticleTag::Pericenter => Value::Scalar(orbit()?.pericenter),
            ParticleTag::TrueAnomaly => Value::Scalar(orbit()?.true_anomaly),
            ParticleTag::MeanAnomaly => Value::Scalar(orbit()?.mean_anomaly),
            ParticleTag::PosX => Value::Scalar(p.position.x),
            ParticleTag::PosY => Value::Scalar(p.position.y),
            ParticleTag::PosZ => Value::Scalar(p.position.z),
            ParticleTag::VelX => Value::Scalar(p.velocity.x),
            ParticleTag::VelY => Value::Scalar(p.velocity.y),
            ParticleTag::VelZ => Value::Scalar(p.velocity.z),
            ParticleTag::AccX => Value::Scalar(p.acceleration.x),
            ParticleTag::AccY => Value::Scalar(p.acceleration.y),
            ParticleTag::AccZ => Value::Scalar(p.acceleration.z),
            ParticleTag::Distance => Value::Scalar(p.distance()),
            ParticleTag::PrimaryDistance => Value::Scalar(orbit()?.distance),
            ParticleTag::EccX => Value::Scalar(orbit()?.ecc_vector.x),
            ParticleTag::EccY => Value::Scalar(orbit()?.ecc_vector.y),
            ParticleTag::EccZ => Value::Scalar(orbit()?.ecc_vector.z),
            ParticleTag::EccVector => Value::Vector(orbit()?.ecc_vector),
            ParticleTag::AngMom => Value::Scalar(orbit()?.ang_mom_magnitude()),
            ParticleTag::AngMomX => Value::Scalar(orbit()?.ang_mom.x),
            ParticleTag::AngMomY => Value::Scalar(orbit()?.ang_mom.y),
            ParticleTag::AngMomZ => Value::Scalar(orbit()?.ang_mom.z),
            ParticleTag::AngMomVector => Value::Vector(orbit()?.ang_mom),
        };
        Ok(value)
    }

    fn aggregate(&self, agg: AggregateTag) -> Result<Value<'s>, EvalError> {
        let tag = agg.tag();
        let count = self.snapshot.particle_count();
        if count == 0 {
            return Err(EvalError::EmptyAggregate { tag });
        }

        let samples = (0..count)
            .map(|i| self.particle(tag, i))
            .collect::<Result<Vec<_>, _>>()?;

        if tag.kind() == ValueKind::Vector3 {
            let vectors: Vec<Vec3> = samples.iter().filter_map(Value::as_vector).collect();
            let component = |f: fn(&Vec3) -> f64| -> f64 {
                let xs: Vec<f64> = vectors.iter().map(f).collect();
                reduce(agg.kind(), &xs)
            };
            Ok(Value::Vector(Vec3::new(
                component(|v| v.x),
                component(|v| v.y),
                component(|v| v.z),
            )))
        } else {
            let xs: Vec<f64> = samples.iter().filter_map(Value::as_scalar).collect();
            Ok(Value::Scalar(reduce(agg.kind(), &xs)))
        }
    }
}

/// Mean, or population standard deviation, of a non-empty sample.
fn reduce(kind: AggregateKind, xs: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    match kind {
        AggregateKind::Average => mean,
        AggregateKind::StdDev => {
            let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            var.sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::orbit::Orbit;
    use std::cell::Cell;
    use crate::schema::particle::{Particle, ParticleId};

    /// Snapshot with hand-picked orbits, so exact output can be asserted.
    struct FixedOrbits {
        particles: Vec<Particle>,
        orbits: Vec<Result<Orbit, OrbitError>>,
        orbit_calls: Cell<usize>,
    }

    fn orbit(a: f64, h: Vec3) -> Orbit {
        Orbit {
            distance: a,
            speed: 1.0,
            semi_major_axis: a,
            eccentricity: 0.0,
            inclination: 0.0,
            ascending_node: 0.0,
            pericenter: 0.0,
            true_anomaly: 0.0,
            mean_anomaly: 0.0,
            mean_motion: 1.0,
            period: 1.0,
            ang_mom: h,
            ecc_vector: Vec3::ZERO,
        }
    }

    impl FixedOrbits {
        fn new(masses: &[f64]) -> Self {
            let particles = masses
                .iter()
                .enumerate()
                .map(|(i, m)| Particle::new(ParticleId(i as u32 + 1), &format!("p{}", i), *m))
                .collect::<Vec<_>>();
            let orbits = (0..masses.len())
                .map(|i| Ok(orbit(i as f64 + 1.0, Vec3::new(0.0, 0.0, 2.0 * i as f64 + 1.0))))
                .collect();
            Self {
                particles,
                orbits,
                orbit_calls: Cell::new(0),
            }
        }
    }

    impl Snapshot for FixedOrbits {
        fn particles(&self) -> &[Particle] {
            &self.particles
        }
        fn name(&self) -> &str {
            "demo"
        }
        fn time(&self) -> f64 {
            6.5
        }
        fn last_dt(&self) -> f64 {
            0.01
        }
        fn integrator(&self) -> &str {
            "ias15"
        }
        fn gravity(&self) -> f64 {
            1.0
        }
        fn step_count(&self) -> u64 {
            42
        }
        fn wall_time(&self) -> f64 {
            0.5
        }
        fn wall_resolution(&self) -> f64 {
            1e-9
        }
        fn orbit(&self, index: usize) -> Result<Orbit, OrbitError> {
            self.orbit_calls.set(self.orbit_calls.get() + 1);
            self.orbits[index]
        }
    }

    fn render(src: &str, snap: &FixedOrbits) -> Result<String, EvalError> {
        Template::parse(src).unwrap().evaluate(snap)
    }

    #[test]
    fn literals_pass_through() {
        let snap = FixedOrbits::new(&[1.0]);
        let template = Template::parse(", ; /\\\t").unwrap();
        assert_eq!(evaluate(&template, &snap).unwrap(), ", ; /\\\t");
    }

    #[test]
    fn simulation_values() {
        let snap = FixedOrbits::new(&[1.0, 1.0, 1.0]);
        assert_eq!(
            render("#sn #si #sc #sts #st #sG #sdt", &snap).unwrap(),
            "demo ias15 3 42 6.5 1.0 0.01"
        );
    }

    #[test]
    fn trailing_separator_is_elided() {
        let snap = FixedOrbits::new(&[1.0, 1.0, 1.0]);
        assert_eq!(render("{#pa,}", &snap).unwrap(), "1.0,2.0,3.0");
    }

    #[test]
    fn separator_kept_when_group_is_not_last() {
        let snap = FixedOrbits::new(&[1.0, 1.0, 1.0]);
        assert_eq!(render("{#pa,};", &snap).unwrap(), "1.0,2.0,3.0,;");
    }

    #[test]
    fn group_without_trailing_literal_is_untouched() {
        let snap = FixedOrbits::new(&[1.0, 1.0]);
        assert_eq!(render("{#pn,#ph}", &snap).unwrap(), "p0,1p1,2");
    }

    #[test]
    fn group_repeats_items_per_particle() {
        let snap = FixedOrbits::new(&[2.0, 4.0]);
        assert_eq!(
            render("#st: {#pn/#pm; } ", &snap).unwrap(),
            "6.5: p0/2.0; p1/4.0;  "
        );
    }

    #[test]
    fn average_and_std_dev() {
        let snap = FixedOrbits::new(&[2.0, 4.0, 6.0]);
        assert_eq!(render("#am", &snap).unwrap(), "4.0");
        let sd: f64 = render("#dm", &snap).unwrap().parse().unwrap();
        assert!((sd - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((sd - 1.633).abs() < 1e-3);
    }

    #[test]
    fn aggregate_of_single_particle_has_zero_spread() {
        let snap = FixedOrbits::new(&[5.0]);
        assert_eq!(render("#am,#dm", &snap).unwrap(), "5.0,0.0");
    }

    #[test]
    fn vectors_render_as_triplets() {
        let snap = FixedOrbits::new(&[1.0, 1.0]);
        assert_eq!(
            render("{#pjv;}", &snap).unwrap(),
            "(0.0|0.0|1.0);(0.0|0.0|3.0)"
        );
        assert_eq!(render("#ajv", &snap).unwrap(), "(0.0|0.0|2.0)");
        assert_eq!(render("#djv", &snap).unwrap(), "(0.0|0.0|1.0)");
    }

    #[test]
    fn aggregate_inside_group_uses_all_particles() {
        let snap = FixedOrbits::new(&[2.0, 4.0]);
        assert_eq!(render("{#pm/#am,}", &snap).unwrap(), "2.0/3.0,4.0/3.0");
    }

    #[test]
    fn aggregate_inside_group_is_reduced_once() {
        let snap = FixedOrbits::new(&[1.0, 1.0, 1.0]);
        assert_eq!(
            render("{#pa/#aa,}", &snap).unwrap(),
            "1.0/2.0,2.0/2.0,3.0/2.0"
        );
        // One orbit per particle for `#pa`, plus one pass for `#aa`.
        assert_eq!(snap.orbit_calls.get(), 6);
    }

    #[test]
    fn empty_snapshot_aggregate_fails() {
        let snap = FixedOrbits::new(&[]);
        assert_eq!(
            render("#am", &snap),
            Err(EvalError::EmptyAggregate {
                tag: ParticleTag::Mass
            })
        );
    }

    #[test]
    fn empty_snapshot_group_is_empty() {
        let snap = FixedOrbits::new(&[]);
        assert_eq!(render("#sc:{#pm,}", &snap).unwrap(), "0:");
    }

    #[test]
    fn degenerate_orbit_aborts_the_line() {
        let mut snap = FixedOrbits::new(&[1.0, 1.0, 1.0]);
        snap.orbits[1] = Err(OrbitError::Coincident);
        assert_eq!(
            render("#st, {#pa,}", &snap),
            Err(EvalError::OrbitDegenerate {
                index: 1,
                source: OrbitError::Coincident
            })
        );
        assert!(render("#aa", &snap).is_err());
        // Values that need no orbit are unaffected.
        assert_eq!(render("{#pm,}", &snap).unwrap(), "1.0,1.0,1.0");
    }

    #[test]
    fn reduce_population_std_dev() {
        assert_eq!(reduce(AggregateKind::StdDev, &[1.0, 3.0]), 1.0);
        assert_eq!(reduce(AggregateKind::Average, &[1.0, 3.0]), 2.0);
    }
}
