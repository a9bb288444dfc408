#![warn(missing_docs)]

//! Gear-train kinematics for the gearsim simulator.
//!
//! The kernel keeps a set of Spur, Bevel and Worm gears, the meshing
//! connections between them, and derives the angular velocity of every
//! driven gear from the drivers it meshes with. Physics and rendering are
//! consumed through the [`PhysicsStepper`] and [`Renderer`] traits.
//!
//! # Example
//!
//! ```
//! use gearsim_ir::GearKind;
//! use gearsim_kernel::{propagate, GearParams, GearTrain};
//! use nalgebra::Vector3;
//!
//! let mut train = GearTrain::new();
//! let a = train.add_gear(GearKind::Spur, GearParams::default().with_teeth(12).driver()).unwrap();
//! let b = train.add_gear(GearKind::Spur, GearParams::default().with_teeth(24)).unwrap();
//! train.connect(a, b).unwrap();
//!
//! train.set_angular_velocity(a, Vector3::new(0.0, 0.0, 2.0)).unwrap();
//! propagate(&mut train);
//! assert_eq!(train.gear(b).unwrap().active_rate(), -1.0);
//! ```

pub mod config;
pub mod error;
pub mod gear;
pub mod graph;
pub mod physics;
pub mod propagate;
pub mod sim;
pub mod store;
pub mod train;

pub use config::{ConfigError, SimConfig};
pub use error::{GearError, Missing, Result};
pub use gear::{Axis, Direction, Gear, GearParams};
pub use gearsim_ir::GearKind;
pub use graph::{ConnectionGraph, ConnectionId, Connections, Coupling, HalfEdge};
pub use physics::{KinematicStepper, NullRenderer, PhysicsStepper, Renderer};
pub use propagate::{apply_driver_commands, propagate, PropagationReport};
pub use sim::{Edit, FrameReport, Simulation};
pub use store::{GearId, GearStore};
pub use train::{GearTrain, RemovedGear};
