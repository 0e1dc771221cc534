use serde::{Deserialize, Serialize};

use super::vector::Vec3;

/// Newtype wrapper for particle ids (the particle "hash").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId(pub u32);

/// A single body in a simulation snapshot.
///
/// Only the state a report can ask for is carried; integrator-private
/// data stays with the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: ParticleId,
    #[serde(default)]
    pub name: String,
    pub mass: f64,
    #[serde(default)]
    pub radius: f64,
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default)]
    pub acceleration: Vec3,
}

impl Particle {
    /// A point mass at rest at the origin.
    pub fn new(id: ParticleId, name: &str, mass: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            mass,
            radius: 0.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
        }
    }

    pub fn at(mut self, position: Vec3, velocity: Vec3) -> Self {
        self.position = position;
        self.velocity = velocity;
        self
    }

    /// Distance from the coordinate origin.
    pub fn distance(&self) -> f64 {
        self.position.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_creation() {
        let p = Particle::new(ParticleId(7), "earth", 3e-6)
            .at(Vec3::new(3.0, 4.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(p.id, ParticleId(7));
        assert_eq!(p.name, "earth");
        assert_eq!(p.distance(), 5.0);
        assert_eq!(p.acceleration, Vec3::ZERO);
    }

    #[test]
    fn ron_defaults_optional_fields() {
        let p: Particle =
            ron::from_str("(id: (3), mass: 1.0, position: (x: 1.0, y: 0.0, z: 0.0))").unwrap();
        assert_eq!(p.id, ParticleId(3));
        assert!(p.name.is_empty());
        assert_eq!(p.radius, 0.0);
        assert_eq!(p.velocity, Vec3::ZERO);
    }
}
