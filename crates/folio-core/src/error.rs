//! Error types for portfolio operations.

use crate::id::EntityId;
use std::fmt;
use thiserror::Error;

/// The kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Color,
    Gradient,
    Style,
    Property,
    Shape,
    Sketch,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Color => "color",
            EntityKind::Gradient => "gradient",
            EntityKind::Style => "style",
            EntityKind::Property => "property",
            EntityKind::Shape => "shape",
            EntityKind::Sketch => "sketch",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FolioError {
    /// A relink lookup found no entity with the original's identity in the
    /// new collections. The clone is incomplete and must not be used.
    #[error("dangling {kind} reference {id} while relinking")]
    DanglingReference { kind: EntityKind, id: EntityId },

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },

    #[error("shape {0} does not support point editing")]
    NotEditable(EntityId),

    /// Property connections can only be made on colors, styles and shapes.
    #[error("{0} is not a color, style or shape")]
    NotConnectable(EntityId),
}

impl FolioError {
    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        FolioError::NotFound { kind, id }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
