//! Gear entities and their kinematic attributes.

use gearsim_ir::GearKind;
use nalgebra::Vector3;

use crate::error::{GearError, Result};

/// Smallest tooth count a toothed gear may have.
pub const MIN_TEETH: u32 = 6;
/// Largest tooth count a toothed gear may have.
pub const MAX_TEETH: u32 = 512;
/// Tooth count for new Spur/Bevel gears.
pub const DEFAULT_TEETH: u32 = 12;
/// Pitch radius for new gears.
pub const DEFAULT_RADIUS: f64 = 5.0;
/// Length of new Worm gears.
pub const DEFAULT_WORM_LENGTH: f64 = 10.0;
/// Commanded speed for new gears (rad/s).
pub const DEFAULT_SPEED: f64 = 1.0;
/// Thickness of Spur/Bevel gear bodies along the face axis.
pub const FACE_WIDTH: f64 = 2.0;

/// Rotation sense of a gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// `+1`
    #[default]
    Forward,
    /// `-1`
    Reverse,
}

impl Direction {
    /// `1.0` or `-1.0`.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = GearError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            1 => Ok(Direction::Forward),
            -1 => Ok(Direction::Reverse),
            other => Err(GearError::OutOfRange {
                attribute: "direction",
                value: f64::from(other),
                bound: "must be 1 or -1",
            }),
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

/// A body-local rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Local X: the length axis of a Worm.
    X,
    /// Local Y.
    Y,
    /// Local Z: the face axis of a Spur or Bevel.
    Z,
}

impl Axis {
    /// The axis a gear of `kind` rotates about.
    pub fn for_kind(kind: GearKind) -> Self {
        match kind {
            GearKind::Spur | GearKind::Bevel => Axis::Z,
            GearKind::Worm => Axis::X,
        }
    }

    /// Component index into a `Vector3`.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = 1.0;
        v
    }
}

/// Creation parameters for [`GearTrain::add_gear`](crate::GearTrain::add_gear).
///
/// Fields left as `None` take the defaults for the gear's kind. Supplying
/// `teeth` for a Worm or `length` for a Spur/Bevel is an
/// [`InvalidKind`](GearError::InvalidKind) error.
#[derive(Debug, Clone, PartialEq)]
pub struct GearParams {
    /// Optional unique display name.
    pub name: Option<String>,
    /// Tooth count (Spur/Bevel).
    pub teeth: Option<u32>,
    /// Pitch radius.
    pub radius: Option<f64>,
    /// Length along the rotation axis (Worm).
    pub length: Option<f64>,
    /// Commanded speed magnitude (rad/s).
    pub speed: f64,
    /// Rotation sense.
    pub direction: Direction,
    /// Whether the gear drives itself from `speed * direction`.
    pub driver: bool,
    /// Placement; the origin when `None`.
    pub position: Option<Vector3<f64>>,
}

impl Default for GearParams {
    fn default() -> Self {
        Self {
            name: None,
            teeth: None,
            radius: None,
            length: None,
            speed: DEFAULT_SPEED,
            direction: Direction::Forward,
            driver: false,
            position: None,
        }
    }
}

impl GearParams {
    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the tooth count.
    pub fn with_teeth(mut self, teeth: u32) -> Self {
        self.teeth = Some(teeth);
        self
    }

    /// Set the pitch radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Set the worm length.
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    /// Set the commanded speed magnitude.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the rotation sense.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Mark as a driver gear.
    pub fn driver(mut self) -> Self {
        self.driver = true;
        self
    }

    /// Set the placement.
    pub fn at(mut self, position: Vector3<f64>) -> Self {
        self.position = Some(position);
        self
    }
}

/// A gear instance and its kinematic state.
#[derive(Debug, Clone, PartialEq)]
pub struct Gear {
    name: Option<String>,
    kind: GearKind,
    teeth: Option<u32>,
    radius: f64,
    length: Option<f64>,
    speed: f64,
    direction: Direction,
    driver: bool,
    position: Vector3<f64>,
    angular_velocity: Vector3<f64>,
}

impl Gear {
    /// Build a gear from parameters, validating every bound.
    pub fn new(kind: GearKind, params: GearParams) -> Result<Self> {
        let teeth = match (kind.is_toothed(), params.teeth) {
            (true, teeth) => Some(check_teeth(teeth.unwrap_or(DEFAULT_TEETH))?),
            (false, None) => None,
            (false, Some(_)) => {
                return Err(GearError::InvalidKind {
                    attribute: "teeth",
                    kind,
                })
            }
        };
        let length = match (kind, params.length) {
            (GearKind::Worm, length) => Some(check_positive(
                "length",
                length.unwrap_or(DEFAULT_WORM_LENGTH),
            )?),
            (_, None) => None,
            (_, Some(_)) => {
                return Err(GearError::InvalidKind {
                    attribute: "length",
                    kind,
                })
            }
        };

        Ok(Self {
            name: params.name,
            kind,
            teeth,
            radius: check_positive("radius", params.radius.unwrap_or(DEFAULT_RADIUS))?,
            length,
            speed: check_speed(params.speed)?,
            direction: params.direction,
            driver: params.driver,
            position: check_position(params.position.unwrap_or_else(Vector3::zeros))?,
            angular_velocity: Vector3::zeros(),
        })
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Gear kind.
    pub fn kind(&self) -> GearKind {
        self.kind
    }

    /// Tooth count; `None` for Worm gears.
    pub fn teeth(&self) -> Option<u32> {
        self.teeth
    }

    /// Pitch radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Length along the rotation axis; `None` for Spur/Bevel gears.
    pub fn length(&self) -> Option<f64> {
        self.length
    }

    /// Commanded speed magnitude (rad/s).
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Rotation sense.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether this gear drives itself.
    pub fn is_driver(&self) -> bool {
        self.driver
    }

    /// Placement.
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Current angular velocity (rad/s).
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    /// The axis this gear rotates about.
    pub fn active_axis(&self) -> Axis {
        Axis::for_kind(self.kind)
    }

    /// Angular velocity component on the active axis.
    pub fn active_rate(&self) -> f64 {
        self.angular_velocity[self.active_axis().index()]
    }

    /// Signed commanded rate: `speed * direction`.
    pub fn commanded_rate(&self) -> f64 {
        self.speed * self.direction.sign()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn set_teeth(&mut self, teeth: u32) -> Result<()> {
        if !self.kind.is_toothed() {
            return Err(GearError::InvalidKind {
                attribute: "teeth",
                kind: self.kind,
            });
        }
        self.teeth = Some(check_teeth(teeth)?);
        Ok(())
    }

    pub(crate) fn set_radius(&mut self, radius: f64) -> Result<()> {
        self.radius = check_positive("radius", radius)?;
        Ok(())
    }

    pub(crate) fn set_length(&mut self, length: f64) -> Result<()> {
        if self.kind != GearKind::Worm {
            return Err(GearError::InvalidKind {
                attribute: "length",
                kind: self.kind,
            });
        }
        self.length = Some(check_positive("length", length)?);
        Ok(())
    }

    pub(crate) fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.speed = check_speed(speed)?;
        Ok(())
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn set_driver(&mut self, driver: bool) {
        self.driver = driver;
    }

    pub(crate) fn set_position(&mut self, position: Vector3<f64>) -> Result<()> {
        self.position = check_position(position)?;
        Ok(())
    }

    pub(crate) fn set_angular_velocity(&mut self, angular_velocity: Vector3<f64>) {
        self.angular_velocity = angular_velocity;
    }

    /// Replace the angular velocity with `rate` on the active axis only.
    pub(crate) fn set_active_rate(&mut self, rate: f64) {
        self.angular_velocity = self.active_axis().unit() * rate;
    }
}

fn check_teeth(teeth: u32) -> Result<u32> {
    if (MIN_TEETH..=MAX_TEETH).contains(&teeth) {
        Ok(teeth)
    } else {
        Err(GearError::OutOfRange {
            attribute: "teeth",
            value: f64::from(teeth),
            bound: "must be between 6 and 512",
        })
    }
}

fn check_positive(attribute: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GearError::OutOfRange {
            attribute,
            value,
            bound: "must be finite and > 0",
        })
    }
}

fn check_speed(speed: f64) -> Result<f64> {
    if speed.is_finite() && speed >= 0.0 {
        Ok(speed)
    } else {
        Err(GearError::OutOfRange {
            attribute: "speed",
            value: speed,
            bound: "must be finite and >= 0",
        })
    }
}

fn check_position(position: Vector3<f64>) -> Result<Vector3<f64>> {
    match position.iter().find(|c| !c.is_finite()) {
        Some(&bad) => Err(GearError::OutOfRange {
            attribute: "position",
            value: bad,
            bound: "components must be finite",
        }),
        None => Ok(position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_kind() {
        let spur = Gear::new(GearKind::Spur, GearParams::default()).unwrap();
        assert_eq!(spur.teeth(), Some(DEFAULT_TEETH));
        assert_eq!(spur.length(), None);
        assert_eq!(spur.active_axis(), Axis::Z);

        let worm = Gear::new(GearKind::Worm, GearParams::default()).unwrap();
        assert_eq!(worm.teeth(), None);
        assert_eq!(worm.length(), Some(DEFAULT_WORM_LENGTH));
        assert_eq!(worm.active_axis(), Axis::X);
    }

    #[test]
    fn kind_gated_params() {
        let err = Gear::new(GearKind::Worm, GearParams::default().with_teeth(20)).unwrap_err();
        assert_eq!(
            err,
            GearError::InvalidKind {
                attribute: "teeth",
                kind: GearKind::Worm
            }
        );

        let err = Gear::new(GearKind::Bevel, GearParams::default().with_length(3.0)).unwrap_err();
        assert!(matches!(err, GearError::InvalidKind { attribute: "length", .. }));
    }

    #[test]
    fn teeth_bounds() {
        assert!(Gear::new(GearKind::Spur, GearParams::default().with_teeth(6)).is_ok());
        let err = Gear::new(GearKind::Spur, GearParams::default().with_teeth(5)).unwrap_err();
        assert!(matches!(err, GearError::OutOfRange { attribute: "teeth", .. }));

        let mut gear = Gear::new(GearKind::Spur, GearParams::default()).unwrap();
        assert!(gear.set_teeth(513).is_err());
        assert_eq!(gear.teeth(), Some(DEFAULT_TEETH));
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = Gear::new(GearKind::Spur, GearParams::default().with_speed(f64::NAN)).unwrap_err();
        assert!(matches!(err, GearError::OutOfRange { attribute: "speed", .. }));

        let err = Gear::new(GearKind::Spur, GearParams::default().with_radius(0.0)).unwrap_err();
        assert!(matches!(err, GearError::OutOfRange { attribute: "radius", .. }));

        let err = Gear::new(
            GearKind::Spur,
            GearParams::default().at(Vector3::new(0.0, f64::INFINITY, 0.0)),
        )
        .unwrap_err();
        assert!(matches!(err, GearError::OutOfRange { attribute: "position", .. }));
    }

    #[test]
    fn direction_conversion() {
        assert_eq!(Direction::try_from(-1).unwrap(), Direction::Reverse);
        assert_eq!(i8::from(Direction::Forward), 1);
        assert!(Direction::try_from(0).is_err());
        assert_eq!(Direction::Reverse.sign(), -1.0);
    }

    #[test]
    fn commanded_rate_and_active_rate() {
        let mut gear = Gear::new(
            GearKind::Worm,
            GearParams::default()
                .with_speed(3.0)
                .with_direction(Direction::Reverse),
        )
        .unwrap();
        assert_eq!(gear.commanded_rate(), -3.0);

        gear.set_active_rate(2.5);
        assert_eq!(gear.angular_velocity(), Vector3::new(2.5, 0.0, 0.0));
        assert_eq!(gear.active_rate(), 2.5);
    }
}
