//! Declarative scene description for the gearsim ecosystem.
//!
//! A [`Scene`] lists gears by name together with the meshing connections
//! between them. It carries no runtime state (no angular velocities, no
//! physics handles); the kernel turns a scene into a live gear train.

use serde::{Deserialize, Serialize};

/// 3D vector with f64 components (scene units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new Vec3.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// The kind of a gear, which decides its active rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GearKind {
    /// Straight-cut gear rotating about its face axis.
    Spur,
    /// Conical gear rotating about its face axis.
    Bevel,
    /// Screw-like gear rotating about its length axis.
    Worm,
}

impl GearKind {
    /// Whether this kind has a tooth count (Spur and Bevel).
    pub fn is_toothed(self) -> bool {
        !matches!(self, GearKind::Worm)
    }

    /// Lowercase display name.
    pub fn as_str(self) -> &'static str {
        match self {
            GearKind::Spur => "spur",
            GearKind::Bevel => "bevel",
            GearKind::Worm => "worm",
        }
    }
}

impl std::fmt::Display for GearKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_direction() -> i8 {
    1
}

/// A gear in the scene.
///
/// Unset numeric fields fall back to the kernel defaults for the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearDef {
    /// Unique name within the scene.
    pub name: String,
    /// Gear kind.
    pub kind: GearKind,
    /// Tooth count (Spur/Bevel only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teeth: Option<u32>,
    /// Pitch radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Length along the rotation axis (Worm only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    /// Commanded speed magnitude in rad/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Rotation sense, `1` or `-1`.
    #[serde(default = "default_direction")]
    pub direction: i8,
    /// Whether this gear is driven by its own commanded speed.
    #[serde(default)]
    pub driver: bool,
    /// Placement; randomized in the plane when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
}

impl GearDef {
    /// Create a definition with only a name and kind set.
    pub fn new(name: impl Into<String>, kind: GearKind) -> Self {
        Self {
            name: name.into(),
            kind,
            teeth: None,
            radius: None,
            length: None,
            speed: None,
            direction: 1,
            driver: false,
            position: None,
        }
    }
}

/// A meshing connection between two named gears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDef {
    /// First gear name.
    pub a: String,
    /// Second gear name.
    pub b: String,
}

impl ConnectionDef {
    /// Create a connection between two gear names.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }
}

/// A gearsim scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Format version string (e.g. "0.1").
    pub version: String,
    /// Gears in creation order.
    #[serde(default)]
    pub gears: Vec<GearDef>,
    /// Connections in creation order.
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            gears: Vec::new(),
            connections: Vec::new(),
        }
    }
}

impl Scene {
    /// Create a new empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
