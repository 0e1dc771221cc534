/// Orbit derivation: classical elements of a particle relative to a
/// reference body, and the inverse construction used to set up systems.

use serde::Serialize;
use std::f64::consts::PI;
use thiserror::Error;

use crate::schema::particle::{Particle, ParticleId};
use crate::schema::vector::Vec3;

/// Below this, masses, distances, eccentricities and node-vector lengths
/// count as zero.
const TINY: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrbitError {
    #[error("the reference body has no mass")]
    ZeroMass,
    #[error("the particle is in the same place as the reference body")]
    Coincident,
}

/// Orbital elements and the vectors they were derived from.
///
/// Angles are radians. `ascending_node`, `pericenter` and `true_anomaly`
/// lie in `(-pi, pi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orbit {
    /// Distance to the reference body.
    pub distance: f64,
    /// Relative speed.
    pub speed: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ascending_node: f64,
    pub pericenter: f64,
    pub true_anomaly: f64,
    pub mean_anomaly: f64,
    /// Signed mean motion; negative for hyperbolic orbits.
    pub mean_motion: f64,
    pub period: f64,
    /// Specific angular momentum.
    pub ang_mom: Vec3,
    pub ecc_vector: Vec3,
}

impl Orbit {
    /// Magnitude of the specific angular momentum.
    pub fn ang_mom_magnitude(&self) -> f64 {
        self.ang_mom.length()
    }

    /// Derive the orbit of `particle` around `reference`.
    ///
    /// The gravitational parameter is `g * (m + M)`; a reference with no
    /// mass, or a particle sitting on top of it, has no defined orbit.
    pub fn derive(g: f64, particle: &Particle, reference: &Particle) -> Result<Orbit, OrbitError> {
        if reference.mass <= TINY {
            return Err(OrbitError::ZeroMass);
        }

        let mu = g * (particle.mass + reference.mass);
        let r = particle.position - reference.position;
        let v = particle.velocity - reference.velocity;

        let d = r.length();
        if d <= TINY {
            return Err(OrbitError::Coincident);
        }

        let v2 = v.length_squared();
        let vcirc2 = mu / d;
        let a = -mu / (v2 - 2.0 * vcirc2);

        let h = r.cross(v);
        let hmag = h.length();

        let vr = r.dot(v) / d;
        let e_vec = (r * (v2 - vcirc2) - v * (d * vr)) / mu;
        let e = e_vec.length();

        let n = a.signum() * (mu / (a * a * a)).abs().sqrt();
        let period = 2.0 * PI / n;

        let inc = acos2(h.z, hmag, 1.0);

        // Node vector, z-hat x h.
        let node = Vec3::new(-h.y, h.x, 0.0);
        let nmag = node.length();
        let equatorial = nmag <= TINY;
        let circular = e <= TINY;

        let ascending_node = if equatorial {
            0.0
        } else {
            acos2(node.x, nmag, node.y)
        };

        let pericenter = match (circular, equatorial) {
            (true, _) => 0.0,
            (false, false) => acos2(node.dot(e_vec), nmag * e, e_vec.z),
            // Longitude of pericenter, measured in the direction of motion.
            (false, true) => e_vec.y.atan2(e_vec.x) * h.z.signum(),
        };

        let true_anomaly = match (circular, equatorial) {
            (false, _) => acos2(e_vec.dot(r), e * d, vr),
            // Argument of latitude.
            (true, false) => acos2(node.dot(r), nmag * d, r.z),
            // True longitude.
            (true, true) => r.y.atan2(r.x) * h.z.signum(),
        };

        let mean_anomaly = mean_from_true(true_anomaly, e);

        Ok(Orbit {
            distance: d,
            speed: v2.sqrt(),
            semi_major_axis: a,
            eccentricity: e,
            inclination: inc,
            ascending_node,
            pericenter,
            true_anomaly,
            mean_anomaly,
            mean_motion: n,
            period,
            ang_mom: h,
            ecc_vector: e_vec,
        })
    }
}

/// Elements used to place a new particle on an orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ascending_node: f64,
    pub pericenter: f64,
    pub true_anomaly: f64,
}

/// Build a particle of mass `mass` on the orbit described by `elements`
/// around `primary`.
pub fn particle_from_elements(
    g: f64,
    primary: &Particle,
    id: ParticleId,
    mass: f64,
    elements: &Elements,
) -> Particle {
    let Elements {
        semi_major_axis: a,
        eccentricity: e,
        inclination: inc,
        ascending_node: big_omega,
        pericenter: omega,
        true_anomaly: f,
    } = *elements;

    let r = a * (1.0 - e * e) / (1.0 + e * f.cos());
    let v0 = (g * (mass + primary.mass) / (a * (1.0 - e * e))).sqrt();

    let (so, co) = big_omega.sin_cos();
    let (sw, cw) = omega.sin_cos();
    let (sf, cf) = f.sin_cos();
    let (si, ci) = inc.sin_cos();

    // sin/cos of the argument of latitude
    let su = sw * cf + cw * sf;
    let cu = cw * cf - sw * sf;

    let position = Vec3::new(
        r * (co * cu - so * su * ci),
        r * (so * cu + co * su * ci),
        r * su * si,
    );
    let velocity = Vec3::new(
        v0 * ((e + cf) * (-ci * cw * so - co * sw) - sf * (cw * co - ci * sw * so)),
        v0 * ((e + cf) * (ci * cw * co - so * sw) - sf * (cw * so + ci * sw * co)),
        v0 * ((e + cf) * cw * si - sf * si * sw),
    );

    Particle::new(id, "", mass).at(
        primary.position + position,
        primary.velocity + velocity,
    )
}

/// `acos(num / denom)` clamped into range, with the sign taken from
/// `disambiguator`.
fn acos2(num: f64, denom: f64, disambiguator: f64) -> f64 {
    let cos = (num / denom).clamp(-1.0, 1.0);
    let angle = cos.acos();
    if disambiguator < 0.0 {
        -angle
    } else {
        angle
    }
}

fn mean_from_true(f: f64, e: f64) -> f64 {
    if e < 1.0 - TINY {
        let ea = 2.0 * (((1.0 - e) / (1.0 + e)).sqrt() * (f / 2.0).tan()).atan();
        ea - e * ea.sin()
    } else if e > 1.0 + TINY {
        let ha = 2.0 * (((e - 1.0) / (e + 1.0)).sqrt() * (f / 2.0).tan()).atanh();
        e * ha.sinh() - ha
    } else {
        // Barker's equation
        let d = (f / 2.0).tan();
        d + d * d * d / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sun() -> Particle {
        Particle::new(ParticleId(0), "sun", 1.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn circular_orbit_in_plane() {
        let p = Particle::new(ParticleId(1), "p", 0.0)
            .at(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let o = Orbit::derive(1.0, &p, &sun()).unwrap();
        assert!(close(o.semi_major_axis, 1.0));
        assert!(close(o.eccentricity, 0.0));
        assert!(close(o.inclination, 0.0));
        assert!(close(o.distance, 1.0));
        assert!(close(o.ang_mom_magnitude(), 1.0));
        assert!(close(o.period, 2.0 * PI));
    }

    #[test]
    fn elements_survive_a_round_trip() {
        let elements = Elements {
            semi_major_axis: 1.4,
            eccentricity: 0.7,
            inclination: 0.3,
            ascending_node: 0.4,
            pericenter: 1.1,
            true_anomaly: 2.5,
        };
        let p = particle_from_elements(1.0, &sun(), ParticleId(1), 1e-3, &elements);
        let o = Orbit::derive(1.0, &p, &sun()).unwrap();
        assert!(close(o.semi_major_axis, 1.4));
        assert!(close(o.eccentricity, 0.7));
        assert!(close(o.inclination, 0.3));
        assert!(close(o.ascending_node, 0.4));
        assert!(close(o.pericenter, 1.1));
        assert!(close(o.true_anomaly, 2.5));
    }

    #[test]
    fn eccentricity_vector_points_at_pericenter() {
        let elements = Elements {
            semi_major_axis: 2.0,
            eccentricity: 0.5,
            inclination: 0.0,
            ascending_node: 0.0,
            pericenter: 0.0,
            true_anomaly: 1.0,
        };
        let p = particle_from_elements(1.0, &sun(), ParticleId(1), 0.0, &elements);
        let o = Orbit::derive(1.0, &p, &sun()).unwrap();
        assert!(close(o.ecc_vector.x, 0.5));
        assert!(close(o.ecc_vector.y, 0.0));
        assert!(close(o.ecc_vector.z, 0.0));
    }

    #[test]
    fn mean_anomaly_at_apocenter_is_pi() {
        let elements = Elements {
            semi_major_axis: 1.0,
            eccentricity: 0.3,
            inclination: 0.2,
            ascending_node: 0.0,
            pericenter: 0.5,
            true_anomaly: PI - 1e-9,
        };
        let p = particle_from_elements(1.0, &sun(), ParticleId(1), 0.0, &elements);
        let o = Orbit::derive(1.0, &p, &sun()).unwrap();
        assert!((o.mean_anomaly.abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn hyperbolic_orbit_has_negative_axis() {
        let p = Particle::new(ParticleId(1), "p", 0.0)
            .at(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0));
        let o = Orbit::derive(1.0, &p, &sun()).unwrap();
        assert!(o.semi_major_axis < 0.0);
        assert!(o.eccentricity > 1.0);
        assert!(o.mean_motion < 0.0);
    }

    #[test]
    fn massless_reference_fails() {
        let p = Particle::new(ParticleId(1), "p", 1.0).at(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        let reference = Particle::new(ParticleId(0), "ghost", 0.0);
        assert_eq!(Orbit::derive(1.0, &p, &reference), Err(OrbitError::ZeroMass));
    }

    #[test]
    fn coincident_reference_fails() {
        let p = Particle::new(ParticleId(1), "p", 1.0);
        assert_eq!(Orbit::derive(1.0, &p, &sun()), Err(OrbitError::Coincident));
    }
}
