//! Error handling for jtple.
//! Defines the error type and result alias used throughout the crate.

use thiserror::Error;

/// Kind of marker that failed to provide a required `name` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Template,
    Variable,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerKind::Template => write!(f, "template"),
            MarkerKind::Variable => write!(f, "variable"),
        }
    }
}

/// Custom error types for jtple operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    /// Markup could not be read into a document
    #[error("Parse error: {0}.")]
    ParseError(String),

    /// Represents errors that occur during configuration parsing or processing
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// A selector string outside the supported grammar
    #[error("Invalid selector '{selector}': {reason}.")]
    Selector { selector: String, reason: String },

    /// A template or variable marker lacks its `name` attribute
    #[error("A {kind} marker must have a name (<{tag}> element).")]
    MissingName { kind: MarkerKind, tag: String },

    /// No template is registered under the requested name
    #[error("Template not found: '{name}'.")]
    NotFound { name: String },

    /// No live template carries the requested identity
    #[error("No template with identity '{identity}'.")]
    IdentityNotFound { identity: String },

    /// `add_tpl` was asked for a slot the template does not have
    #[error("Template '{template}' has no sub-template slot '{slot}'.")]
    UnknownSlot { template: String, slot: String },

    /// A template contains a marker for itself, directly or through others
    #[error("Circular template nesting: {chain}.")]
    CircularTemplate { chain: String },

    /// The template owns no variable with the requested name
    #[error("Template '{template}' has no variable '{variable}'.")]
    UnknownVariable { template: String, variable: String },

    /// A value of the wrong shape for its key
    #[error("Invalid value for '{key}': {reason}.")]
    ValueError { key: String, reason: String },

    /// A stale or foreign template handle
    #[error("Unknown template handle #{id}.")]
    UnknownTemplate { id: usize },

    /// An event binding names a handler that was never registered
    #[error("No event handler registered as '{name}'.")]
    UnknownHandler { name: String },

    /// A move that would place a subtree inside itself
    #[error("Cannot move node {node} under node {target}, which lies inside it.")]
    HierarchyError { node: usize, target: usize },

    /// Registered definitions back every later instance and stay in place
    #[error("Template '{name}' is a registered definition and cannot be removed.")]
    DefinitionRemoval { name: String },

    /// A handler reported a failure
    #[error("Event handler failed: {0}.")]
    HandlerError(String),
}

impl Error {
    /// True for the recoverable lookup-miss and malformed-slot conditions.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::IdentityNotFound { .. }
                | Error::UnknownSlot { .. }
                | Error::UnknownVariable { .. }
        )
    }
}

/// Convenience type alias for Results with jtple's Error as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Default error handler that prints the error and exits the program.
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
