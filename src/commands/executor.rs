//! Command execution.
//!
//! Execution runs in three stages:
//! 1. Resolve the path to a command, its raw tokens and a scope instance
//! 2. Check arity, aggregate trailing tokens and convert every token
//! 3. Invoke the target and classify any failure
//!
//! User and definition errors are written to the console log. Unhandled
//! failures (untyped errors and panics) are reported generically unless the
//! console runs in debug mode, where they propagate to the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use thiserror::Error;
use tracing::{error, warn};

use super::catalog::{Command, FunctionTarget, PropertyTarget, Target};
use super::definitions::{Context, Invocation, ParamDefault};
use super::loader::DiscoveryLoader;
use super::path::last_segment_name;
use super::registry::Registry;
use crate::console::ConsoleLog;
use crate::error::{ConsoleError, DefinitionError, Result, UserError};
use crate::value::Value;

/// A classified failure of a single invocation.
#[derive(Error, Debug)]
pub enum InvocationError {
    #[error("Error in command definition for command '{command}': {error}")]
    Definition {
        command: String,
        error: DefinitionError,
    },

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Unhandled error attempting to execute command '{command}': {error}\nSee error log for more details")]
    Unhandled {
        command: String,
        error: anyhow::Error,
    },
}

impl InvocationError {
    /// Sorts an error raised by a command body into its family.
    pub fn classify(command: &str, error: anyhow::Error) -> Self {
        // Already classified by a nested resolution or execution.
        let error = match error.downcast::<InvocationError>() {
            Ok(classified) => return classified,
            Err(error) => error,
        };
        let error = match error.downcast::<UserError>() {
            Ok(user) => return Self::User(user),
            Err(error) => error,
        };
        match error.downcast::<DefinitionError>() {
            Ok(definition) => Self::Definition {
                command: command.to_string(),
                error: definition,
            },
            Err(error) => Self::Unhandled {
                command: command.to_string(),
                error,
            },
        }
    }

    fn definition(command: &str, error: DefinitionError) -> Self {
        Self::Definition {
            command: command.to_string(),
            error,
        }
    }
}

/// Runs `f`, turning a panic into an unhandled error unless in debug mode.
fn guarded<T>(
    ctx: Context<'_>,
    command: &str,
    f: impl FnOnce() -> std::result::Result<T, InvocationError>,
) -> std::result::Result<T, InvocationError> {
    if ctx.debug {
        return f();
    }
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(InvocationError::Unhandled {
            command: command.to_string(),
            error: anyhow!("panicked: {}", panic_message(payload.as_ref())),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

impl Command {
    /// Executes the command against `scope` with raw `tokens`.
    pub fn execute(
        &self,
        tokens: &[String],
        scope: &Value,
        ctx: Context<'_>,
    ) -> std::result::Result<Option<Value>, InvocationError> {
        guarded(ctx, &self.name, || match &self.target {
            Target::Function(function) => self.call_function(function, tokens, scope, ctx),
            Target::Property(property) => self.access_property(property, tokens, scope, ctx),
        })
    }

    /// Returns the scope this command yields when used as an intermediate
    /// path segment. Commands with scoping disabled never yield one.
    ///
    /// A property given tokens assigns them and yields no scope.
    pub fn get_subscope(
        &self,
        tokens: &[String],
        scope: &Value,
        ctx: Context<'_>,
    ) -> std::result::Result<Option<Value>, InvocationError> {
        if !self.allow_scoping {
            return Ok(None);
        }
        self.execute(tokens, scope, ctx)
    }

    fn invocation<'a>(
        &'a self,
        scope: &'a Value,
        args: Vec<Option<Value>>,
        ctx: Context<'a>,
    ) -> Invocation<'a> {
        Invocation {
            command: &self.name,
            scope,
            args,
            ctx,
        }
    }

    fn call_function(
        &self,
        function: &FunctionTarget,
        tokens: &[String],
        scope: &Value,
        ctx: Context<'_>,
    ) -> std::result::Result<Option<Value>, InvocationError> {
        if tokens.len() < function.required {
            return Err(self.insufficient(function).into());
        }

        let mut tokens = tokens.to_vec();
        if self.aggregate_trailing && !function.params.is_empty() {
            let last = function.params.len() - 1;
            if tokens.len() > function.params.len() {
                let trailing = tokens.split_off(last);
                tokens.push(trailing.join(" "));
            }
        }

        let mut args = Vec::with_capacity(function.params.len());
        for (i, param) in function.params.iter().enumerate() {
            let arg = match tokens.get(i) {
                Some(token) => {
                    let value = param.converter.convert(token).ok_or_else(|| {
                        UserError::ParameterParse {
                            parameter: param.display_name.clone(),
                            expected: param.ty.name().to_string(),
                        }
                    })?;
                    if value.value_type() != param.ty {
                        return Err(InvocationError::definition(
                            &self.name,
                            DefinitionError::ConverterReturnedWrongType {
                                converter: param.converter.name().to_string(),
                                expected: param.ty.name().to_string(),
                                actual: value.value_type().name().to_string(),
                            },
                        ));
                    }
                    Some(value)
                }
                None => match &param.default {
                    ParamDefault::Value(value) => Some(value.clone()),
                    ParamDefault::Absent => None,
                    ParamDefault::Required => return Err(self.insufficient(function).into()),
                },
            };
            args.push(arg);
        }

        (function.call)(&self.invocation(scope, args, ctx))
            .map_err(|e| InvocationError::classify(&self.name, e))
    }

    fn access_property(
        &self,
        property: &PropertyTarget,
        tokens: &[String],
        scope: &Value,
        ctx: Context<'_>,
    ) -> std::result::Result<Option<Value>, InvocationError> {
        let token = if self.aggregate_trailing {
            (!tokens.is_empty()).then(|| tokens.join(" "))
        } else {
            tokens.first().cloned()
        };

        let (Some(token), Some(set), Some(converter)) =
            (token, &property.set, &property.converter)
        else {
            return match &property.get {
                Some(get) => get(&self.invocation(scope, Vec::new(), ctx))
                    .map_err(|e| InvocationError::classify(&self.name, e)),
                None => Ok(None),
            };
        };

        let value = converter
            .convert(&token)
            .ok_or_else(|| UserError::ParameterParse {
                parameter: property.key.clone(),
                expected: property.ty.name().to_string(),
            })?;
        if value.value_type() != property.ty {
            return Err(InvocationError::definition(
                &self.name,
                DefinitionError::ConverterReturnedWrongType {
                    converter: converter.name().to_string(),
                    expected: property.ty.name().to_string(),
                    actual: value.value_type().name().to_string(),
                },
            ));
        }

        set(&self.invocation(scope, Vec::new(), ctx), value)
            .map_err(|e| InvocationError::classify(&self.name, e))?;
        Ok(None)
    }

    fn insufficient(&self, function: &FunctionTarget) -> UserError {
        UserError::InsufficientParameters {
            command: self.name.clone(),
            required: function.required,
            names: function
                .params
                .iter()
                .take(function.required)
                .map(|p| p.display_name.clone())
                .collect(),
        }
    }
}

/// Resolves and runs command paths once loading has settled.
#[derive(Clone)]
pub struct Executor {
    loader: DiscoveryLoader,
    log: Arc<ConsoleLog>,
    debug: bool,
}

impl Executor {
    pub fn new(loader: DiscoveryLoader, log: Arc<ConsoleLog>, debug: bool) -> Self {
        Self { loader, log, debug }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.loader.registry()
    }

    /// Executes `path`, waiting first for any in-flight module batch.
    ///
    /// User and definition errors are logged and yield `Ok(None)`. An
    /// unhandled failure yields `Err` only in debug mode.
    pub async fn execute(&self, path: &str) -> Result<Option<Value>> {
        self.loader.wait_idle().await;
        self.run(path)
    }

    /// Blocking counterpart of [`execute`](Self::execute) for callers
    /// outside the async runtime.
    pub fn execute_blocking(&self, path: &str) -> Result<Option<Value>> {
        self.loader.wait_idle_blocking();
        self.run(path)
    }

    fn run(&self, path: &str) -> Result<Option<Value>> {
        let path = path.trim();
        let registry = self.loader.registry();
        // A batch submitted after the idle wait applies before or after this
        // execution, never during it.
        let _settled = registry.settled();
        let ctx = Context::new(registry, &self.log, self.debug);

        let outcome = ctx.resolver().resolve(path).and_then(|resolved| match resolved {
            Some(resolved) => resolved
                .command
                .execute(&resolved.tokens, &resolved.scope, ctx),
            None => Err(UserError::NotACommand(last_segment_name(
                path,
                registry.escape_set(),
            ))
            .into()),
        });

        match outcome {
            Ok(value) => Ok(value),
            Err(InvocationError::Unhandled { command, error }) if self.debug => {
                Err(ConsoleError::unhandled(command, format!("{error:#}")))
            }
            Err(err) => {
                match &err {
                    InvocationError::Unhandled { error: cause, .. } => error!("{cause:?}"),
                    InvocationError::Definition { .. } => warn!("{err}"),
                    InvocationError::User(_) => {}
                }
                self.log.error(err.to_string());
                Ok(None)
            }
        }
    }
}
