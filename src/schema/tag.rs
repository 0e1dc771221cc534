use serde::Serialize;

/// The shape of the value a tag resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    /// One floating-point number.
    Scalar,
    /// Three floating-point numbers, rendered as `(x|y|z)`.
    Vector3,
    String,
    Integer,
}

/// The first character after `#` in a value token: which scope the
/// token is resolved against, or which reduction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Selector {
    Average,
    StdDev,
    Particle,
    Simulation,
}

impl Selector {
    pub const ALL: [Selector; 4] = [
        Self::Average,
        Self::StdDev,
        Self::Particle,
        Self::Simulation,
    ];

    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'a' => Some(Self::Average),
            'd' => Some(Self::StdDev),
            'p' => Some(Self::Particle),
            's' => Some(Self::Simulation),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Average => 'a',
            Self::StdDev => 'd',
            Self::Particle => 'p',
            Self::Simulation => 's',
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Average => "Global Average",
            Self::StdDev => "Global Standard Deviation",
            Self::Particle => "Particle",
            Self::Simulation => "Simulation",
        }
    }
}

/// Simulation-scope tags (`#s..`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SimTag {
    Name,
    Time,
    LastStep,
    ParticleCount,
    Integrator,
    Gravity,
    StepCount,
    WallTime,
    WallResolution,
}

impl SimTag {
    pub const ALL: [SimTag; 9] = [
        Self::Name,
        Self::Time,
        Self::LastStep,
        Self::ParticleCount,
        Self::Integrator,
        Self::Gravity,
        Self::StepCount,
        Self::WallTime,
        Self::WallResolution,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.code() == code)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Name => "n",
            Self::Time => "t",
            Self::LastStep => "dt",
            Self::ParticleCount => "c",
            Self::Integrator => "i",
            Self::Gravity => "G",
            Self::StepCount => "ts",
            Self::WallTime => "w",
            Self::WallResolution => "wr",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Time => "Current Time",
            Self::LastStep => "Last dt",
            Self::ParticleCount => "Particle Count",
            Self::Integrator => "Integrator Name",
            Self::Gravity => "Gravitational Constant",
            Self::StepCount => "Current Timestep",
            Self::WallTime => "Current Wall Time",
            Self::WallResolution => "Wall Time Resolution",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Name | Self::Integrator => ValueKind::String,
            Self::ParticleCount | Self::StepCount => ValueKind::Integer,
            _ => ValueKind::Scalar,
        }
    }
}

/// Particle-scope tags (`#p..`, and the reducible ones under `#a..`/`#d..`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParticleTag {
    Mass,
    Radius,
    Name,
    Hash,
    SemiMajorAxis,
    Eccentricity,
    Inclination,
    AscendingNode,
    Pericenter,
    TrueAnomaly,
    MeanAnomaly,
    PosX,
    PosY,
    PosZ,
    VelX,
    VelY,
    VelZ,
    AccX,
    AccY,
    AccZ,
    Distance,
    PrimaryDistance,
    EccX,
    EccY,
    EccZ,
    EccVector,
    AngMom,
    AngMomX,
    AngMomY,
    AngMomZ,
    AngMomVector,
}

impl ParticleTag {
    pub const ALL: [ParticleTag; 31] = [
        Self::Mass,
        Self::Radius,
        Self::Name,
        Self::Hash,
        Self::SemiMajorAxis,
        Self::Eccentricity,
        Self::Inclination,
        Self::AscendingNode,
        Self::Pericenter,
        Self::TrueAnomaly,
        Self::MeanAnomaly,
        Self::PosX,
        Self::PosY,
        Self::PosZ,
        Self::VelX,
        Self::VelY,
        Self::VelZ,
        Self::AccX,
        Self::AccY,
        Self::AccZ,
        Self::Distance,
        Self::PrimaryDistance,
        Self::EccX,
        Self::EccY,
        Self::EccZ,
        Self::EccVector,
        Self::AngMom,
        Self::AngMomX,
        Self::AngMomY,
        Self::AngMomZ,
        Self::AngMomVector,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.code() == code)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Mass => "m",
            Self::Radius => "r",
            Self::Name => "n",
            Self::Hash => "h",
            Self::SemiMajorAxis => "a",
            Self::Eccentricity => "e",
            Self::Inclination => "i",
            Self::AscendingNode => "O",
            Self::Pericenter => "o",
            Self::TrueAnomaly => "f",
            Self::MeanAnomaly => "M",
            Self::PosX => "x",
            Self::PosY => "y",
            Self::PosZ => "z",
            Self::VelX => "vx",
            Self::VelY => "vy",
            Self::VelZ => "vz",
            Self::AccX => "ax",
            Self::AccY => "ay",
            Self::AccZ => "az",
            Self::Distance => "R",
            Self::PrimaryDistance => "Rc",
            Self::EccX => "ex",
            Self::EccY => "ey",
            Self::EccZ => "ez",
            Self::EccVector => "ev",
            Self::AngMom => "j",
            Self::AngMomX => "jx",
            Self::AngMomY => "jy",
            Self::AngMomZ => "jz",
            Self::AngMomVector => "jv",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Mass => "Mass",
            Self::Radius => "Radius",
            Self::Name => "Name",
            Self::Hash => "Hash",
            Self::SemiMajorAxis => "Semi-Major Axis",
            Self::Eccentricity => "Eccentricity",
            Self::Inclination => "Inclination",
            Self::AscendingNode => "Longitude of Ascending Node",
            Self::Pericenter => "Argument of Pericenter",
            Self::TrueAnomaly => "True Anomaly",
            Self::MeanAnomaly => "Mean Anomaly",
            Self::PosX => "X Position",
            Self::PosY => "Y Position",
            Self::PosZ => "Z Position",
            Self::VelX => "X Velocity",
            Self::VelY => "Y Velocity",
            Self::VelZ => "Z Velocity",
            Self::AccX => "X Acceleration",
            Self::AccY => "Y Acceleration",
            Self::AccZ => "Z Acceleration",
            Self::Distance => "Distance from Origin",
            Self::PrimaryDistance => "Distance from Primary Particle",
            Self::EccX => "X Eccentricity Vector Component",
            Self::EccY => "Y Eccentricity Vector Component",
            Self::EccZ => "Z Eccentricity Vector Component",
            Self::EccVector => "3-Component Eccentricity Vector",
            Self::AngMom => "Magnitude of Angular Momentum",
            Self::AngMomX => "X Angular Momentum Vector Component",
            Self::AngMomY => "Y Angular Momentum Vector Component",
            Self::AngMomZ => "Z Angular Momentum Vector Component",
            Self::AngMomVector => "3-Component Angular Momentum Vector",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Name => ValueKind::String,
            Self::Hash => ValueKind::Integer,
            Self::EccVector | Self::AngMomVector => ValueKind::Vector3,
            _ => ValueKind::Scalar,
        }
    }

    /// Whether the value needs an orbit derived against the reference body.
    pub fn is_orbital(&self) -> bool {
        matches!(
            self,
            Self::SemiMajorAxis
                | Self::Eccentricity
                | Self::Inclination
                | Self::AscendingNode
                | Self::Pericenter
                | Self::TrueAnomaly
                | Self::MeanAnomaly
                | Self::PrimaryDistance
                | Self::EccX
                | Self::EccY
                | Self::EccZ
                | Self::EccVector
                | Self::AngMom
                | Self::AngMomX
                | Self::AngMomY
                | Self::AngMomZ
                | Self::AngMomVector
        )
    }

    /// Names and hashes identify a single particle; they cannot be
    /// averaged or spread.
    pub fn is_aggregable(&self) -> bool {
        matches!(self.kind(), ValueKind::Scalar | ValueKind::Vector3)
    }
}
