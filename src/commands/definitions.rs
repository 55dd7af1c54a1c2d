//! Command declarations.
//!
//! A [`CommandDecl`] carries everything the loader needs to build a command:
//! the metadata a user attaches to it ([`CommandMeta`]), the scope that owns
//! it ([`Owner`]) and the callable target. Declarations are inert until a
//! module containing them is loaded, at which point they are validated and
//! turned into catalog entries.

use std::any::Any;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use anyhow::anyhow;

use super::path::PathResolver;
use super::registry::Registry;
use crate::console::ConsoleLog;
use crate::error::DefinitionError;
use crate::value::{Value, ValueType};

/// Signature of a function-backed command body.
pub type CommandFn = dyn Fn(&Invocation<'_>) -> anyhow::Result<Option<Value>> + Send + Sync;

/// Signature of a property getter.
pub type GetterFn = dyn Fn(&Invocation<'_>) -> anyhow::Result<Option<Value>> + Send + Sync;

/// Signature of a property setter.
pub type SetterFn = dyn Fn(&Invocation<'_>, Value) -> anyhow::Result<()> + Send + Sync;

/// User-facing metadata attached to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMeta {
    /// The name the command is called by.
    pub name: String,
    /// Text shown by `help <command>`.
    pub help: String,
    /// Display names overriding the derived parameter names, in order.
    pub parameter_names: Vec<String>,
    /// Whether the command may be used as a non-terminal path segment.
    pub allow_scoping: bool,
    /// Whether extra tokens are appended onto the final parameter.
    pub aggregate_trailing: bool,
}

impl CommandMeta {
    /// Creates metadata with scoping and trailing aggregation enabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            parameter_names: Vec::new(),
            allow_scoping: true,
            aggregate_trailing: true,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_scoping(mut self, allow: bool) -> Self {
        self.allow_scoping = allow;
        self
    }

    pub fn aggregate_trailing(mut self, aggregate: bool) -> Self {
        self.aggregate_trailing = aggregate;
        self
    }
}

/// The scope a command is declared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// A global command, reachable from the root scope.
    Root,
    /// A command reachable through an instance of the given scope type.
    Scope(ValueType),
    /// A command declared on a generic type whose parameters are not
    /// resolved. Always rejected at load time; `global` distinguishes a
    /// static command from an instance command in the rejection message.
    Generic { type_name: String, global: bool },
}

impl Owner {
    /// Returns the command scope for instances of `S`.
    pub fn scope<S: Any>() -> Self {
        Self::Scope(ValueType::of::<S>())
    }
}

/// Default behaviour of a parameter the user did not supply.
#[derive(Debug, Clone)]
pub enum ParamDefault {
    /// The parameter must be supplied.
    Required,
    /// The parameter falls back to the given value.
    Value(Value),
    /// The parameter is optional and has no value when omitted.
    Absent,
}

/// A declared parameter of a function-backed command.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub ty: ValueType,
    pub default: ParamDefault,
}

impl ParamDecl {
    /// A parameter that must be supplied.
    pub fn required<T: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::of::<T>(),
            default: ParamDefault::Required,
        }
    }

    /// A parameter that defaults to `value` when omitted.
    pub fn with_default<T>(name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        Self {
            name: name.into(),
            ty: ValueType::of::<T>(),
            default: ParamDefault::Value(Value::new(value)),
        }
    }

    /// A parameter that is simply absent when omitted.
    pub fn optional<T: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ValueType::of::<T>(),
            default: ParamDefault::Absent,
        }
    }

    /// A parameter with an explicitly typed default value.
    pub fn with_default_value(name: impl Into<String>, ty: ValueType, value: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            default: ParamDefault::Value(value),
        }
    }
}

/// The callable behind a declaration.
#[derive(Clone)]
pub enum TargetDecl {
    Function {
        params: Vec<ParamDecl>,
        call: Arc<CommandFn>,
    },
    Property {
        ty: ValueType,
        get: Option<Arc<GetterFn>>,
        set: Option<Arc<SetterFn>>,
    },
}

impl fmt::Debug for TargetDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function { params, .. } => f
                .debug_struct("Function")
                .field("params", params)
                .finish_non_exhaustive(),
            Self::Property { ty, get, set } => f
                .debug_struct("Property")
                .field("ty", ty)
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
        }
    }
}

/// A command waiting to be validated and registered.
#[derive(Debug, Clone)]
pub struct CommandDecl {
    pub meta: CommandMeta,
    pub owner: Owner,
    pub target: TargetDecl,
    pub site: &'static Location<'static>,
}

impl CommandDecl {
    /// Declares a function-backed command on an arbitrary owner.
    #[track_caller]
    pub fn function<F>(meta: CommandMeta, owner: Owner, params: Vec<ParamDecl>, call: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self {
            meta,
            owner,
            target: TargetDecl::Function {
                params,
                call: Arc::new(call),
            },
            site: Location::caller(),
        }
    }

    /// Declares a global command.
    #[track_caller]
    pub fn global<F>(meta: CommandMeta, params: Vec<ParamDecl>, call: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self::function(meta, Owner::Root, params, call)
    }

    /// Declares a command on instances of `S`. The body receives the scope
    /// instance already downcast.
    #[track_caller]
    pub fn scoped<S, F>(meta: CommandMeta, params: Vec<ParamDecl>, call: F) -> Self
    where
        S: Any + Send + Sync,
        F: Fn(&S, &Invocation<'_>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self::function(meta, Owner::scope::<S>(), params, move |inv| {
            let scope = inv.scope_as::<S>()?;
            call(scope, inv)
        })
    }

    /// Declares a property-backed command with raw accessors.
    #[track_caller]
    pub fn property(
        meta: CommandMeta,
        owner: Owner,
        ty: ValueType,
        get: Option<Arc<GetterFn>>,
        set: Option<Arc<SetterFn>>,
    ) -> Self {
        Self {
            meta,
            owner,
            target: TargetDecl::Property { ty, get, set },
            site: Location::caller(),
        }
    }

    /// Declares a read-only property on instances of `S`.
    ///
    /// The getter's result is also what the command yields as a sub-scope,
    /// which makes this the usual way to expose a child object.
    #[track_caller]
    pub fn scoped_getter<S, T, G>(meta: CommandMeta, get: G) -> Self
    where
        S: Any + Send + Sync,
        T: Any,
        G: Fn(&S) -> Option<Value> + Send + Sync + 'static,
    {
        let getter: Arc<GetterFn> = Arc::new(move |inv: &Invocation<'_>| -> anyhow::Result<Option<Value>> {
            let scope = inv.scope_as::<S>()?;
            Ok(get(scope))
        });
        Self::property(meta, Owner::scope::<S>(), ValueType::of::<T>(), Some(getter), None)
    }

    /// Declares a readable and writable property on instances of `S`.
    #[track_caller]
    pub fn scoped_property<S, T, G, W>(meta: CommandMeta, get: G, set: W) -> Self
    where
        S: Any + Send + Sync,
        T: Any + Send + Sync + Clone + fmt::Display,
        G: Fn(&S) -> T + Send + Sync + 'static,
        W: Fn(&S, T) + Send + Sync + 'static,
    {
        let getter: Arc<GetterFn> = Arc::new(move |inv: &Invocation<'_>| -> anyhow::Result<Option<Value>> {
            let scope = inv.scope_as::<S>()?;
            Ok(Some(Value::new(get(scope))))
        });
        let setter: Arc<SetterFn> = Arc::new(move |inv: &Invocation<'_>, value: Value| -> anyhow::Result<()> {
            let scope = inv.scope_as::<S>()?;
            let typed = value
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| anyhow!("property value is not a {}", ValueType::of::<T>()))?;
            set(scope, typed);
            Ok(())
        });
        Self::property(
            meta,
            Owner::scope::<S>(),
            ValueType::of::<T>(),
            Some(getter),
            Some(setter),
        )
    }

    /// Declares a readable and writable global property.
    #[track_caller]
    pub fn global_property<T, G, W>(meta: CommandMeta, get: G, set: W) -> Self
    where
        T: Any + Send + Sync + Clone + fmt::Display,
        G: Fn() -> T + Send + Sync + 'static,
        W: Fn(T) + Send + Sync + 'static,
    {
        let getter: Arc<GetterFn> =
            Arc::new(move |_: &Invocation<'_>| -> anyhow::Result<Option<Value>> {
                Ok(Some(Value::new(get())))
            });
        let setter: Arc<SetterFn> = Arc::new(move |_: &Invocation<'_>, value: Value| -> anyhow::Result<()> {
            let typed = value
                .downcast_ref::<T>()
                .cloned()
                .ok_or_else(|| anyhow!("property value is not a {}", ValueType::of::<T>()))?;
            set(typed);
            Ok(())
        });
        Self::property(meta, Owner::Root, ValueType::of::<T>(), Some(getter), Some(setter))
    }

    /// Returns the declared command name.
    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

/// Shared state every invocation can reach.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub log: &'a ConsoleLog,
    /// Whether unhandled failures propagate instead of being caught.
    pub debug: bool,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, log: &'a ConsoleLog, debug: bool) -> Self {
        Self {
            registry,
            log,
            debug,
        }
    }

    /// Returns a path resolver sharing this context.
    pub fn resolver(&self) -> PathResolver<'a> {
        PathResolver::new(*self)
    }
}

/// Arguments and environment of a single command invocation.
pub struct Invocation<'a> {
    pub(crate) command: &'a str,
    pub(crate) scope: &'a Value,
    pub(crate) args: Vec<Option<Value>>,
    pub(crate) ctx: Context<'a>,
}

impl<'a> Invocation<'a> {
    /// Name of the command being invoked.
    pub fn command(&self) -> &str {
        self.command
    }

    /// The scope instance the command runs against.
    pub fn scope(&self) -> &Value {
        self.scope
    }

    /// Borrows the scope instance as an `S`.
    pub fn scope_as<S: Any>(&self) -> Result<&'a S, DefinitionError> {
        self.scope
            .downcast_ref::<S>()
            .ok_or_else(|| DefinitionError::ScopeMismatch {
                command: self.command.to_string(),
                expected: ValueType::of::<S>().name().to_string(),
                actual: self.scope.value_type().name().to_string(),
            })
    }

    /// Returns the converted argument at `index`.
    ///
    /// Fails if the argument is absent or has a different type.
    pub fn arg<T: Any>(&self, index: usize) -> anyhow::Result<&T> {
        let value = self
            .args
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| anyhow!("argument {index} of '{}' is absent", self.command))?;
        value.downcast_ref::<T>().ok_or_else(|| {
            anyhow!(
                "argument {index} of '{}' is a {}, not a {}",
                self.command,
                value.value_type(),
                ValueType::of::<T>()
            )
        })
    }

    /// Returns the argument at `index` if it was supplied (or defaulted).
    pub fn opt_arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.args
            .get(index)
            .and_then(Option::as_ref)
            .and_then(Value::downcast_ref::<T>)
    }

    /// Raw argument values, `None` for absent optional parameters.
    pub fn args(&self) -> &[Option<Value>] {
        &self.args
    }

    pub fn registry(&self) -> &'a Registry {
        self.ctx.registry
    }

    pub fn log(&self) -> &'a ConsoleLog {
        self.ctx.log
    }

    pub fn context(&self) -> Context<'a> {
        self.ctx
    }
}

/// Converts a declared parameter name into its display form.
///
/// `first_name`, `firstName` and `FirstName` all become `First Name`.
pub fn display_parameter_name(name: &str) -> String {
    let mut output = String::with_capacity(name.len() + 4);
    let mut capitalize_next = true;
    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !output.is_empty() && !output.ends_with(' ') {
                output.push(' ');
            }
            capitalize_next = true;
            continue;
        }
        if c.is_uppercase() && !output.is_empty() && !output.ends_with(' ') {
            output.push(' ');
        }
        if capitalize_next {
            output.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            output.push(c);
        }
    }
    output.trim_end().to_string()
}
