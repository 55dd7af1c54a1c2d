//! Command registration, resolution and execution.
//!
//! Modules of declarations are loaded by the [`DiscoveryLoader`] into the
//! shared [`Registry`]. The [`Executor`] resolves a command path against the
//! registry with a [`PathResolver`] and invokes the command it names.

pub mod builtins;
pub mod catalog;
pub mod converters;
pub mod definitions;
pub mod executor;
pub mod loader;
pub mod path;
pub mod registry;

pub use catalog::{root_scope, Command, CommandCatalog, ScopeType};
pub use converters::{Converter, ConverterDecl, ConverterRegistry, FnConverter};
pub use definitions::{
    CommandDecl, CommandMeta, Context, Invocation, Owner, ParamDecl, ParamDefault, TargetDecl,
};
pub use executor::{Executor, InvocationError};
pub use loader::{DiscoveryLoader, LoaderState, Module};
pub use path::{split_path, split_segment, EscapeSet, PathResolver, Resolved};
pub use registry::{Diagnostic, Registry};
