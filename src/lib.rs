//! Uniform adaptor over the OKS schema kernel and the Conffwk data framework,
//! plus a bidirectional branch tree for inspecting class hierarchies.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

pub use diagnostics::{Diagnostics, Finding, LogDiagnostics, MemoryDiagnostics, SharedDiagnostics};
pub use error::{AdaptorError, Result};

pub use logic::{
    object_labels, render_outline, to_dot, to_graph, tree_to_value, Branch, BranchKey,
    ConfigTree, OksSchemaTree, SchemaDataInteraction,
};

pub use model::*;

pub use store::{
    ClassObjectLifecycle, ClassObjectManager, ConfigBackend, Configuration, ConffwkBackend,
    ConffwkObject, NamedObject, NamedObjectLifecycle, NamedObjectManager, ObjectLifecycle,
    ObjectManager, ObjectModifier, OksBackend, OksClass, OksProperty,
};
