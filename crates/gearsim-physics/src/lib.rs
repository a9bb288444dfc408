#![warn(missing_docs)]

//! Rapier3d physics for gearsim.
//!
//! [`RapierStepper`] implements the kernel's
//! [`PhysicsStepper`](gearsim_kernel::PhysicsStepper): every gear becomes a
//! dynamic rigid body pinned to a fixed anchor by an axle joint about its
//! active axis, and every connection becomes a rope joint that keeps the two
//! gear centres from drifting apart.
//!
//! # Example
//!
//! ```ignore
//! use gearsim_kernel::{NullRenderer, SimConfig, Simulation};
//! use gearsim_physics::RapierStepper;
//!
//! let config = SimConfig::default();
//! let mut sim = Simulation::new(config.clone(), RapierStepper::from_config(&config), NullRenderer)?;
//! sim.load_scene(&scene)?;
//! for _ in 0..60 {
//!     sim.frame();
//! }
//! ```

mod colliders;
mod joints;
mod world;

pub use colliders::{gear_shape, shape_rotation};
pub use world::RapierStepper;
