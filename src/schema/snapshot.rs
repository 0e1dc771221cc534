/// Read-only simulation state consumed by the evaluator.

use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use thiserror::Error;

use super::particle::{Particle, ParticleId};
use super::vector::Vec3;
use crate::core::orbit::{particle_from_elements, Elements, Orbit, OrbitError};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("duplicate particle id {0:?}")]
    DuplicateId(ParticleId),
    #[error("primary particle {0:?} is not in the snapshot")]
    MissingPrimary(ParticleId),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Everything a report template can ask of a running simulation.
///
/// Implementations never hand out mutable state; the evaluator only
/// reads. `orbit` has a default that derives elements against
/// [`Snapshot::reference_body`].
pub trait Snapshot {
    fn particles(&self) -> &[Particle];

    fn name(&self) -> &str;
    fn time(&self) -> f64;
    fn last_dt(&self) -> f64;
    fn integrator(&self) -> &str;
    fn gravity(&self) -> f64;
    fn step_count(&self) -> u64;
    /// Seconds of wall time since the run started.
    fn wall_time(&self) -> f64;
    /// Seconds per tick of the wall clock.
    fn wall_resolution(&self) -> f64;

    fn particle_count(&self) -> usize {
        self.particles().len()
    }

    /// The body orbits are measured against.
    fn reference_body(&self) -> Particle {
        barycenter(self.particles())
    }

    fn orbit(&self, index: usize) -> Result<Orbit, OrbitError> {
        let reference = self.reference_body();
        Orbit::derive(self.gravity(), &self.particles()[index], &reference)
    }
}

/// A pseudo-particle carrying the total mass at the center of mass.
pub fn barycenter(particles: &[Particle]) -> Particle {
    let mut com = Particle::new(ParticleId(u32::MAX), "barycenter", 0.0);
    let mut weighted_pos = Vec3::ZERO;
    let mut weighted_vel = Vec3::ZERO;
    for p in particles {
        com.mass += p.mass;
        weighted_pos = weighted_pos + p.position * p.mass;
        weighted_vel = weighted_vel + p.velocity * p.mass;
    }
    if com.mass > 0.0 {
        com.position = weighted_pos / com.mass;
        com.velocity = weighted_vel / com.mass;
    }
    com
}

/// An owned snapshot, loaded from RON/JSON or assembled in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub last_dt: f64,
    #[serde(default)]
    pub integrator: String,
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default)]
    pub step_count: u64,
    #[serde(default)]
    pub wall_time: f64,
    #[serde(default = "default_wall_resolution")]
    pub wall_resolution: f64,
    /// Orbits are measured against this particle; the barycenter when unset.
    #[serde(default)]
    pub primary: Option<ParticleId>,
    pub particles: Vec<Particle>,
}

fn default_gravity() -> f64 {
    1.0
}

fn default_wall_resolution() -> f64 {
    1e-9
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            name: String::new(),
            time: 0.0,
            last_dt: 0.0,
            integrator: String::new(),
            gravity: default_gravity(),
            step_count: 0,
            wall_time: 0.0,
            wall_resolution: default_wall_resolution(),
            primary: None,
            particles: Vec::new(),
        }
    }
}

impl SimulationState {
    /// Load a snapshot from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<SimulationState, SnapshotError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a snapshot from a RON string.
    pub fn parse_ron(input: &str) -> Result<SimulationState, SnapshotError> {
        let state: SimulationState = ron::from_str(input)?;
        state.validate()?;
        Ok(state)
    }

    /// Particle ids must be unique, and a configured primary must exist.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen = FxHashSet::default();
        for p in &self.particles {
            if !seen.insert(p.id) {
                return Err(SnapshotError::DuplicateId(p.id));
            }
        }
        match self.primary {
            Some(id) if !seen.contains(&id) => Err(SnapshotError::MissingPrimary(id)),
            _ => Ok(()),
        }
    }

    pub fn index_of(&self, id: ParticleId) -> Option<usize> {
        self.particles.iter().position(|p| p.id == id)
    }

    pub fn primary_particle(&self) -> Option<&Particle> {
        self.primary
            .and_then(|id| self.index_of(id))
            .map(|i| &self.particles[i])
    }

    /// Shift positions and velocities so the barycenter sits at rest at
    /// the origin.
    pub fn move_to_com(&mut self) {
        let com = barycenter(&self.particles);
        for p in &mut self.particles {
            p.position = p.position - com.position;
            p.velocity = p.velocity - com.velocity;
        }
    }

    /// A unit-mass black hole (id 0) with `count` light stars on
    /// eccentric, nearly coplanar orbits, in the barycentric frame.
    pub fn eccentric_disk<R: Rng + ?Sized>(rng: &mut R, count: usize) -> SimulationState {
        let bh = Particle::new(ParticleId(0), "bh", 1.0);
        let mut particles = Vec::with_capacity(count + 1);
        particles.push(bh.clone());

        for i in 1..=count {
            let elements = Elements {
                semi_major_axis: rng.gen_range(1.1..1.7),
                eccentricity: rng.gen_range(0.65..0.75),
                inclination: normal(rng, 3e-2),
                ascending_node: 0.0,
                pericenter: 0.0,
                true_anomaly: normal(rng, PI / 4.0) + PI,
            };
            let mut star = particle_from_elements(1.0, &bh, ParticleId(i as u32), 1e-3, &elements);
            star.name = format!("star{}", i);
            particles.push(star);
        }

        let mut state = SimulationState {
            name: "eccentric_disk".to_string(),
            integrator: "ias15".to_string(),
            particles,
            ..SimulationState::default()
        };
        state.move_to_com();
        state
    }
}

/// Normal deviate with zero mean and the given variance (Box-Muller).
fn normal<R: Rng + ?Sized>(rng: &mut R, variance: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos() * variance.sqrt()
}

impl Snapshot for SimulationState {
    fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn last_dt(&self) -> f64 {
        self.last_dt
    }

    fn integrator(&self) -> &str {
        &self.integrator
    }

    fn gravity(&self) -> f64 {
        self.gravity
    }

    fn step_count(&self) -> u64 {
        self.step_count
    }

    fn wall_time(&self) -> f64 {
        self.wall_time
    }

    fn wall_resolution(&self) -> f64 {
        self.wall_resolution
    }

    fn reference_body(&self) -> Particle {
        match self.primary_particle() {
            Some(p) => p.clone(),
            None => barycenter(&self.particles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_body() -> SimulationState {
        SimulationState {
            particles: vec![
                Particle::new(ParticleId(1), "star", 3.0),
                Particle::new(ParticleId(2), "planet", 1.0)
                    .at(Vec3::new(4.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
            ],
            ..SimulationState::default()
        }
    }

    #[test]
    fn barycenter_is_mass_weighted() {
        let com = barycenter(&two_body().particles);
        assert_eq!(com.mass, 4.0);
        assert_eq!(com.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(com.velocity, Vec3::new(0.0, 0.25, 0.0));
    }

    #[test]
    fn barycenter_of_nothing_is_massless() {
        assert_eq!(barycenter(&[]).mass, 0.0);
    }

    #[test]
    fn reference_prefers_primary() {
        let mut state = two_body();
        assert_eq!(state.reference_body().mass, 4.0);
        state.primary = Some(ParticleId(1));
        assert_eq!(state.reference_body().name, "star");
    }

    #[test]
    fn primary_orbits_itself_is_degenerate() {
        let mut state = two_body();
        state.primary = Some(ParticleId(1));
        assert_eq!(state.orbit(0), Err(OrbitError::Coincident));
        assert!(state.orbit(1).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut state = two_body();
        state.particles[1].id = ParticleId(1);
        assert!(matches!(state.validate(), Err(SnapshotError::DuplicateId(ParticleId(1)))));
    }

    #[test]
    fn validate_rejects_missing_primary() {
        let mut state = two_body();
        state.primary = Some(ParticleId(9));
        assert!(matches!(state.validate(), Err(SnapshotError::MissingPrimary(ParticleId(9)))));
    }

    #[test]
    fn parse_ron_applies_defaults() {
        let state = SimulationState::parse_ron(
            r#"(
                name: "disk",
                time: 2.5,
                particles: [
                    (id: (1), name: "bh", mass: 1.0, position: (x: 0.0, y: 0.0, z: 0.0)),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(state.name, "disk");
        assert_eq!(state.gravity, 1.0);
        assert_eq!(state.particle_count(), 1);
        assert!(state.primary.is_none());
    }

    #[test]
    fn eccentric_disk_is_seeded_and_barycentric() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let disk = SimulationState::eccentric_disk(&mut StdRng::seed_from_u64(7), 25);
        let again = SimulationState::eccentric_disk(&mut StdRng::seed_from_u64(7), 25);
        assert_eq!(disk.particles, again.particles);
        assert_eq!(disk.particle_count(), 26);
        assert_eq!(disk.particles[3].name, "star3");

        let com = barycenter(&disk.particles);
        assert!(com.position.length() < 1e-12);
        assert!(com.velocity.length() < 1e-12);

        for i in 1..disk.particle_count() {
            let orbit = disk.orbit(i).unwrap();
            assert!(orbit.eccentricity > 0.5 && orbit.eccentricity < 0.9);
        }
    }

    #[test]
    fn load_fixture_snapshot() {
        let path = std::path::PathBuf::from("tests/fixtures/three_body.ron");
        let state = SimulationState::load_from_ron(&path).unwrap();
        assert_eq!(state.particles.len(), 3);
        assert_eq!(state.primary, Some(ParticleId(1)));
        assert_eq!(state.primary_particle().map(|p| p.name.as_str()), Some("sun"));
    }
}
