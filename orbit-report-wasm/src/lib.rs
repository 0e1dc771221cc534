//! WASM bindings for orbit-report: powers the interactive format playground.

use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

use orbit_report::core::ast::Template;
use orbit_report::schema::particle::ParticleId;
use orbit_report::schema::snapshot::{SimulationState, Snapshot};
use orbit_report::schema::tag::{ParticleTag, SimTag, ValueKind};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct Validation {
    ok: bool,
    error: Option<String>,
    offset: Option<usize>,
    canonical: Option<String>,
}

#[derive(serde::Serialize)]
struct TagInfo {
    token: String,
    description: &'static str,
    kind: &'static str,
    aggregable: bool,
}

#[derive(serde::Serialize)]
struct ParticleInfo {
    id: u32,
    name: String,
    mass: f64,
    semi_major_axis: Option<f64>,
    eccentricity: Option<f64>,
}

#[derive(serde::Serialize)]
struct SnapshotInfo {
    name: String,
    time: f64,
    primary: Option<u32>,
    particles: Vec<ParticleInfo>,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------
fn kind_label(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Scalar => "scalar",
        ValueKind::Vector3 => "vector",
        ValueKind::String => "string",
        ValueKind::Integer => "integer",
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// Check a format without rendering it. Returns a JSON `Validation`.
#[wasm_bindgen]
pub fn validate_format(format: &str) -> Result<String, JsError> {
    let validation = match Template::parse(format) {
        Ok(template) => Validation {
            ok: true,
            error: None,
            offset: None,
            canonical: Some(template.to_string()),
        },
        Err(e) => Validation {
            ok: false,
            error: Some(e.to_string()),
            offset: Some(e.offset()),
            canonical: None,
        },
    };
    to_json(&validation)
}

/// Return a JSON array describing every value token.
#[wasm_bindgen]
pub fn tag_vocabulary() -> Result<String, JsError> {
    let mut tags: Vec<TagInfo> = SimTag::ALL
        .iter()
        .map(|t| TagInfo {
            token: format!("#s{}", t.code()),
            description: t.description(),
            kind: kind_label(t.kind()),
            aggregable: false,
        })
        .collect();
    tags.extend(ParticleTag::ALL.iter().map(|t| TagInfo {
        token: format!("#p{}", t.code()),
        description: t.description(),
        kind: kind_label(t.kind()),
        aggregable: t.is_aggregable(),
    }));
    to_json(&tags)
}

// ---------------------------------------------------------------------------
// ReportDemo, the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ReportDemo {
    state: SimulationState,
}

#[wasm_bindgen]
impl ReportDemo {
    /// Start from a generated eccentric disk.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, stars: usize) -> ReportDemo {
        let mut rng = StdRng::seed_from_u64(seed);
        ReportDemo {
            state: SimulationState::eccentric_disk(&mut rng, stars),
        }
    }

    /// Replace the snapshot with one described by a JSON string.
    ///
    /// Expected JSON shape:
    /// ```json
    /// {
    ///   "name": "pair",
    ///   "time": 0.0,
    ///   "primary": 1,
    ///   "particles": [
    ///     { "id": 1, "name": "star", "mass": 1.0, "position": { "x": 0, "y": 0, "z": 0 } }
    ///   ]
    /// }
    /// ```
    pub fn load_snapshot(&mut self, snapshot_json: &str) -> Result<(), JsError> {
        let state: SimulationState = serde_json::from_str(snapshot_json)
            .map_err(|e| JsError::new(&format!("Invalid snapshot JSON: {e}")))?;
        state
            .validate()
            .map_err(|e| JsError::new(&format!("Invalid snapshot: {e}")))?;
        self.state = state;
        Ok(())
    }

    /// Measure orbits against particle `id`, or the barycenter when `None`.
    pub fn set_primary(&mut self, id: Option<u32>) -> Result<(), JsError> {
        match id {
            None => self.state.primary = None,
            Some(id) => {
                let id = ParticleId(id);
                if self.state.index_of(id).is_none() {
                    return Err(JsError::new(&format!("No particle with id {}", id.0)));
                }
                self.state.primary = Some(id);
            }
        }
        Ok(())
    }

    /// Render one report line.
    pub fn render(&self, format: &str) -> Result<String, JsError> {
        let template =
            Template::parse(format).map_err(|e| JsError::new(&format!("Format error: {e}")))?;
        template
            .evaluate(&self.state)
            .map_err(|e| JsError::new(&format!("Evaluation error: {e}")))
    }

    /// Return a JSON description of the current snapshot.
    pub fn snapshot_info(&self) -> Result<String, JsError> {
        let particles = self
            .state
            .particles
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let orbit = self.state.orbit(i).ok();
                ParticleInfo {
                    id: p.id.0,
                    name: p.name.clone(),
                    mass: p.mass,
                    semi_major_axis: orbit.map(|o| o.semi_major_axis),
                    eccentricity: orbit.map(|o| o.eccentricity),
                }
            })
            .collect();

        to_json(&SnapshotInfo {
            name: self.state.name.clone(),
            time: self.state.time,
            primary: self.state.primary.map(|id| id.0),
            particles,
        })
    }
}
