//! jtple is an HTML fragment templating library.
//! It scans a document for template markers, keeps a value-free stamp of each
//! named template and hands out populated copies, including nested and
//! repeated sub-templates.

/// Command-line interface module for the jtple binary
pub mod cli;

/// Configuration handling: which selectors mark templates and variables
/// Supports JSON and YAML formats (jtple.json, jtple.yml, jtple.yaml)
pub mod config;

/// Arena-backed document model and markup serialization
pub mod dom;

/// Error types and handling for jtple
pub mod error;

/// Collision-checked random identity tokens
pub mod identity;

/// HTML parsing into the document model
pub mod parser;

/// Template discovery, instantiation, population and event dispatch
pub mod registry;

/// Tag, class, id and attribute selectors
pub mod selector;

/// Templates, their markers and the scrub algorithm
pub mod template;

/// Substitutable variables
pub mod variable;

pub use config::Config;
pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use registry::{Event, Registry};
pub use template::{Template, TemplateId};
pub use variable::{Variable, VariableValue};
