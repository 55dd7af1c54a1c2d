//! The shared registry: command catalog, converters and load diagnostics.
//!
//! Declarations are validated here before they reach the catalog. The
//! [`DiscoveryLoader`](super::loader::DiscoveryLoader) is the only writer;
//! once loading settles every lookup is a read.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use super::catalog::{
    root_scope, Command, CommandCatalog, FunctionTarget, Parameter, PropertyTarget, ScopeType,
    Target,
};
use super::converters::{Converter, ConverterRegistry};
use super::definitions::{display_parameter_name, CommandDecl, Owner, ParamDefault, TargetDecl};
use super::loader::Module;
use super::path::EscapeSet;
use crate::error::DefinitionError;
use crate::value::{Root, Value, ValueType};

/// A definition problem found while loading a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Module the declaration came from.
    pub module: String,
    /// Name of the offending command or converter.
    pub subject: String,
    pub error: DefinitionError,
}

/// Commands, converters and diagnostics shared by the loader and executor.
pub struct Registry {
    catalog: RwLock<CommandCatalog>,
    converters: RwLock<ConverterRegistry>,
    diagnostics: Mutex<Vec<Diagnostic>>,
    /// Held exclusively while a batch loads, shared while a path executes.
    batch: RwLock<()>,
    escape: EscapeSet,
    root: Value,
}

impl Registry {
    pub fn new(escape: EscapeSet) -> Self {
        Self {
            catalog: RwLock::new(CommandCatalog::new()),
            converters: RwLock::new(ConverterRegistry::new()),
            diagnostics: Mutex::new(Vec::new()),
            batch: RwLock::new(()),
            escape,
            root: Value::object(Root),
        }
    }

    /// The root scope instance every path starts from.
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn escape_set(&self) -> &EscapeSet {
        &self.escape
    }

    pub fn lookup(&self, scope: ScopeType, name: &str) -> Option<Arc<Command>> {
        self.catalog().lookup(scope, name)
    }

    pub fn commands_in(&self, scope: ScopeType) -> Vec<Arc<Command>> {
        self.catalog().all_in(scope)
    }

    pub fn scope_types(&self) -> Vec<ScopeType> {
        self.catalog().scope_types()
    }

    pub fn command_count(&self) -> usize {
        self.catalog().len()
    }

    pub fn converter(&self, ty: ValueType) -> Option<Arc<dyn Converter>> {
        self.converters().lookup(ty)
    }

    /// Every definition problem reported so far, oldest first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keeps module batches from applying while the guard is alive, so a
    /// resolution never observes a half-loaded batch.
    pub(crate) fn settled(&self) -> RwLockReadGuard<'_, ()> {
        self.batch.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog(&self) -> RwLockReadGuard<'_, CommandCatalog> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog_mut(&self) -> RwLockWriteGuard<'_, CommandCatalog> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn converters(&self) -> RwLockReadGuard<'_, ConverterRegistry> {
        self.converters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn converters_mut(&self) -> RwLockWriteGuard<'_, ConverterRegistry> {
        self.converters.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, module: &str, subject: &str, error: DefinitionError) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                module: module.to_string(),
                subject: subject.to_string(),
                error,
            });
    }

    /// Loads one batch of modules: every converter first, then every command.
    ///
    /// Invalid declarations are reported and skipped; the rest of the batch
    /// still loads.
    pub(crate) fn load_batch(&self, modules: Vec<Module>) {
        let _batch = self.batch.write().unwrap_or_else(PoisonError::into_inner);
        let mut pending_commands = Vec::with_capacity(modules.len());

        {
            let mut converters = self.converters_mut();
            for module in modules {
                let (name, converter_decls, command_decls) = module.into_parts();
                for decl in converter_decls {
                    let subject = decl.name().to_string();
                    if let Err(error) = converters.register(decl) {
                        warn!("Unable to load the parameter converter {subject}\n{error}");
                        self.report(&name, &subject, error);
                    }
                }
                pending_commands.push((name, command_decls));
            }
        }

        for (module, decls) in pending_commands {
            for decl in decls {
                let subject = decl.meta.name.clone();
                let result = self
                    .build_command(decl, &module)
                    .and_then(|command| self.catalog_mut().register(command));
                match result {
                    Ok(command) => info!("Loaded command '{}'", command.name()),
                    Err(error) => {
                        warn!("Unable to create console command '{subject}'\n{error}");
                        self.report(&module, &subject, error);
                    }
                }
            }
        }
    }

    /// Validates a declaration and resolves its converters.
    fn build_command(&self, decl: CommandDecl, module: &str) -> Result<Command, DefinitionError> {
        let CommandDecl {
            meta,
            owner,
            target,
            site,
        } = decl;

        self.validate_name(&meta.name)?;

        let scope = match owner {
            Owner::Root => root_scope(),
            Owner::Scope(scope) => scope,
            Owner::Generic { type_name, global } => {
                return Err(if global {
                    DefinitionError::GlobalInGenericScope { owner: type_name }
                } else {
                    DefinitionError::GenericScope { owner: type_name }
                });
            }
        };

        let converters = self.converters();
        let (target, format) = match target {
            TargetDecl::Function { params, call } => {
                let mut resolved = Vec::with_capacity(params.len());
                let mut format = meta.name.clone();
                for (i, param) in params.into_iter().enumerate() {
                    let converter = converters
                        .lookup(param.ty)
                        .ok_or_else(|| DefinitionError::NoConverter(param.ty.name().to_string()))?;
                    if let ParamDefault::Value(default) = &param.default {
                        if default.value_type() != param.ty {
                            return Err(DefinitionError::DefaultTypeMismatch {
                                parameter: param.name,
                                expected: param.ty.name().to_string(),
                                actual: default.value_type().name().to_string(),
                            });
                        }
                    }
                    let display_name = meta
                        .parameter_names
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| display_parameter_name(&param.name));
                    format.push_str(&format!(" [{display_name}]"));
                    resolved.push(Parameter {
                        display_name,
                        ty: param.ty,
                        default: param.default,
                        converter,
                    });
                }
                let required = resolved
                    .iter()
                    .filter(|p| matches!(p.default, ParamDefault::Required))
                    .count();
                (
                    Target::Function(FunctionTarget {
                        params: resolved,
                        required,
                        call,
                    }),
                    format,
                )
            }
            TargetDecl::Property { ty, get, set } => {
                let converter = match set {
                    Some(_) => Some(
                        converters
                            .lookup(ty)
                            .ok_or_else(|| DefinitionError::NoConverter(ty.name().to_string()))?,
                    ),
                    None => None,
                };
                let key = meta
                    .parameter_names
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Value".to_string());
                let format = if set.is_some() {
                    format!("{} [{key}]", meta.name)
                } else {
                    meta.name.clone()
                };
                (
                    Target::Property(PropertyTarget {
                        ty,
                        key,
                        converter,
                        get,
                        set,
                    }),
                    format,
                )
            }
        };

        Ok(Command {
            origin: format!("{module}::{} ({}:{})", meta.name, site.file(), site.line()),
            name: meta.name,
            help: meta.help,
            format,
            scope,
            allow_scoping: meta.allow_scoping,
            aggregate_trailing: meta.aggregate_trailing,
            target,
        })
    }

    fn validate_name(&self, name: &str) -> Result<(), DefinitionError> {
        let first = name.chars().next().ok_or(DefinitionError::EmptyName)?;
        if name.contains(' ') {
            return Err(DefinitionError::NameContainsSpace);
        }
        if name.contains('.') {
            return Err(DefinitionError::NameContainsPeriod);
        }
        if self.escape.contains(first) {
            return Err(DefinitionError::NameStartsWithEscape(first));
        }
        Ok(())
    }
}
