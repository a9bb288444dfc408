//! Error types for gear train editing.

use std::fmt;

use gearsim_ir::GearKind;
use thiserror::Error;

use crate::graph::ConnectionId;
use crate::store::GearId;

/// The thing a [`GearError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// A gear id that is not (or no longer) in the store.
    Gear(GearId),
    /// No edge exists between the two gears.
    Edge(GearId, GearId),
    /// A connection id that is not (or no longer) in the graph.
    Connection(ConnectionId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Gear(id) => write!(f, "gear {id:?}"),
            Missing::Edge(a, b) => write!(f, "connection between {a:?} and {b:?}"),
            Missing::Connection(id) => write!(f, "connection {id:?}"),
        }
    }
}

/// Errors returned by gear store and connection graph operations.
///
/// All of these are recoverable by the caller; none leave the train in a
/// partially modified state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GearError {
    /// Referenced gear or connection does not exist.
    #[error("{0} not found")]
    NotFound(Missing),

    /// An edge between the unordered pair already exists.
    #[error("gears {0:?} and {1:?} are already connected")]
    DuplicateConnection(GearId, GearId),

    /// Attempted to connect a gear to itself.
    #[error("cannot connect gear {0:?} to itself")]
    SelfConnection(GearId),

    /// Attribute edit does not apply to the gear's kind.
    #[error("{attribute} does not apply to {kind} gears")]
    InvalidKind {
        /// Attribute being edited.
        attribute: &'static str,
        /// Kind of the gear.
        kind: GearKind,
    },

    /// Numeric property outside its declared bound.
    #[error("{attribute} = {value} is out of range ({bound})")]
    OutOfRange {
        /// Attribute being edited.
        attribute: &'static str,
        /// Rejected value.
        value: f64,
        /// Human-readable bound.
        bound: &'static str,
    },

    /// A scene connection references a gear name that was never declared.
    #[error("unknown gear name: {0}")]
    UnknownName(String),

    /// Two gears share the same name.
    #[error("duplicate gear name: {0}")]
    DuplicateName(String),
}

/// Result type for gear train operations.
pub type Result<T> = std::result::Result<T, GearError>;
