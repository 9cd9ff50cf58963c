//! Error types for the combat simulation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all combat simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// The entity exists but lacks a component the operation needs.
    #[error("Entity {entity} has no {component} component")]
    MissingComponent {
        /// Entity that was addressed.
        entity: u64,
        /// Name of the missing component.
        component: &'static str,
    },

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file parsing error.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// No actor template registered under this name.
    #[error("Unknown actor template: {0}")]
    UnknownTemplate(String),

    /// The path oracle could not connect the two points.
    #[error("No path from ({from_x:.1}, {from_y:.1}) to ({to_x:.1}, {to_y:.1})")]
    PathNotFound {
        /// Start x.
        from_x: f32,
        /// Start y.
        from_y: f32,
        /// Goal x.
        to_x: f32,
        /// Goal y.
        to_y: f32,
    },

    /// Invalid simulation state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
