//! The command catalog: every loaded command, grouped by scope type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::converters::Converter;
use super::definitions::{CommandFn, GetterFn, ParamDefault, SetterFn};
use crate::error::DefinitionError;
use crate::value::{Root, ValueType};

/// Identity of the namespace a command belongs to.
pub type ScopeType = ValueType;

/// Returns the scope type holding all global commands.
pub fn root_scope() -> ScopeType {
    ValueType::of::<Root>()
}

/// A validated parameter with its converter resolved.
#[derive(Clone)]
pub(crate) struct Parameter {
    pub(crate) display_name: String,
    pub(crate) ty: ValueType,
    pub(crate) default: ParamDefault,
    pub(crate) converter: Arc<dyn Converter>,
}

#[derive(Clone)]
pub(crate) struct FunctionTarget {
    pub(crate) params: Vec<Parameter>,
    pub(crate) required: usize,
    pub(crate) call: Arc<CommandFn>,
}

#[derive(Clone)]
pub(crate) struct PropertyTarget {
    pub(crate) ty: ValueType,
    /// Display name of the value a setter receives.
    pub(crate) key: String,
    pub(crate) converter: Option<Arc<dyn Converter>>,
    pub(crate) get: Option<Arc<GetterFn>>,
    pub(crate) set: Option<Arc<SetterFn>>,
}

#[derive(Clone)]
pub(crate) enum Target {
    Function(FunctionTarget),
    Property(PropertyTarget),
}

/// A loaded, immutable command.
#[derive(Clone)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) format: String,
    pub(crate) scope: ScopeType,
    pub(crate) allow_scoping: bool,
    pub(crate) aggregate_trailing: bool,
    pub(crate) origin: String,
    pub(crate) target: Target,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Usage string such as `greet [First] [Second]`.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn scope(&self) -> ScopeType {
        self.scope
    }

    /// Where the command was declared, as `module::name (file:line)`.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn allows_scoping(&self) -> bool {
        self.allow_scoping
    }

    pub fn aggregates_trailing(&self) -> bool {
        self.aggregate_trailing
    }

    pub fn is_property(&self) -> bool {
        matches!(self.target, Target::Property(_))
    }

    /// Display names of the declared parameters, in order.
    pub fn parameter_names(&self) -> Vec<&str> {
        match &self.target {
            Target::Function(f) => f.params.iter().map(|p| p.display_name.as_str()).collect(),
            Target::Property(_) => Vec::new(),
        }
    }

    /// Number of parameters that must be supplied.
    pub fn required_parameters(&self) -> usize {
        match &self.target {
            Target::Function(f) => f.required,
            Target::Property(_) => 0,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("format", &self.format)
            .field("scope", &self.scope)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Scope type → commands declared on it.
///
/// Append-only: commands are never replaced or removed once registered.
#[derive(Default)]
pub struct CommandCatalog {
    by_scope: HashMap<ScopeType, HashMap<String, Arc<Command>>>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `command` under its scope type.
    ///
    /// The first registration of a name wins; a later command with the same
    /// name in the same scope is rejected with both declaration sites.
    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, DefinitionError> {
        let commands = self.by_scope.entry(command.scope).or_default();
        if let Some(existing) = commands.get(&command.name) {
            return Err(DefinitionError::DuplicateCommand {
                name: command.name.clone(),
                existing: existing.origin.clone(),
                duplicate: command.origin,
            });
        }
        let command = Arc::new(command);
        commands.insert(command.name.clone(), Arc::clone(&command));
        Ok(command)
    }

    pub fn lookup(&self, scope: ScopeType, name: &str) -> Option<Arc<Command>> {
        self.by_scope.get(&scope)?.get(name).cloned()
    }

    pub fn contains(&self, scope: ScopeType, name: &str) -> bool {
        self.by_scope
            .get(&scope)
            .is_some_and(|commands| commands.contains_key(name))
    }

    /// All commands in `scope`; empty for a scope nothing was declared on.
    pub fn all_in(&self, scope: ScopeType) -> Vec<Arc<Command>> {
        self.by_scope
            .get(&scope)
            .map(|commands| commands.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every scope type with at least one command.
    pub fn scope_types(&self) -> Vec<ScopeType> {
        self.by_scope
            .iter()
            .filter(|(_, commands)| !commands.is_empty())
            .map(|(scope, _)| *scope)
            .collect()
    }

    /// Total number of commands across all scopes.
    pub fn len(&self) -> usize {
        self.by_scope.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
