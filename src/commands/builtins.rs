//! Commands and converters every console loads: `help` and `commands`.

use std::sync::Arc;

use super::catalog::{root_scope, Command};
use super::converters::builtin_converters;
use super::definitions::{CommandDecl, CommandMeta, Invocation, ParamDecl};
use super::loader::Module;
use crate::console::{ERROR_COLOR, HIGHLIGHT_COLOR};
use crate::value::Value;

/// Name of the module holding the built-in converters and commands.
pub const MODULE_NAME: &str = "builtins";

/// The built-in module.
pub fn module() -> Module {
    Module::new(MODULE_NAME)
        .converters(builtin_converters())
        .command(help_command())
        .command(commands_command())
}

fn help_command() -> CommandDecl {
    CommandDecl::global(
        CommandMeta::new("help")
            .help("Lists the loaded commands, or shows how to use a single command")
            .parameter_names(["Command"])
            .allow_scoping(false),
        vec![ParamDecl::optional::<String>("command")],
        |inv| -> anyhow::Result<Option<Value>> {
            match inv.opt_arg::<String>(0) {
                Some(path) => describe_command(inv, path)?,
                None => list_root_commands(inv),
            }
            Ok(None)
        },
    )
}

fn commands_command() -> CommandDecl {
    CommandDecl::global(
        CommandMeta::new("commands")
            .help("Lists the commands of every scope, or of the scope the given path resolves to")
            .parameter_names(["Scope"])
            .allow_scoping(false),
        vec![ParamDecl::optional::<String>("scope")],
        |inv| -> anyhow::Result<Option<Value>> {
            match inv.opt_arg::<String>(0) {
                Some(path) => list_scope(inv, path)?,
                None => list_all_scopes(inv),
            }
            Ok(None)
        },
    )
}

fn sorted(mut commands: Vec<Arc<Command>>) -> Vec<Arc<Command>> {
    commands.sort_by(|a, b| a.name().cmp(b.name()));
    commands
}

fn list_root_commands(inv: &Invocation<'_>) {
    let log = inv.log();
    log.log("The following commands are loaded -");
    for command in sorted(inv.registry().commands_in(root_scope())) {
        log.log(format!(" {}", command.name()));
    }
}

/// Describes the command `path` resolves to. Trailing tokens are ignored.
fn describe_command(inv: &Invocation<'_>, path: &str) -> anyhow::Result<()> {
    let log = inv.log();
    match inv.context().resolver().resolve(path)? {
        Some(resolved) => {
            log.log_colored(resolved.command.format(), HIGHLIGHT_COLOR);
            if !resolved.command.help().is_empty() {
                log.log(resolved.command.help());
            }
        }
        None => log.log_colored(format!("No command by the name '{path}'"), ERROR_COLOR),
    }
    Ok(())
}

fn list_all_scopes(inv: &Invocation<'_>) {
    let registry = inv.registry();
    let root = root_scope();
    let mut scopes = registry.scope_types();
    // Root first, then alphabetical.
    scopes.sort_by(|a, b| {
        (*a != root)
            .cmp(&(*b != root))
            .then_with(|| a.name().cmp(b.name()))
    });

    let log = inv.log();
    for scope in scopes {
        log.log(format!("{}:", scope.name()));
        for command in sorted(registry.commands_in(scope)) {
            log.log(format!("\t{}", command.format()));
        }
    }
}

fn list_scope(inv: &Invocation<'_>, path: &str) -> anyhow::Result<()> {
    let log = inv.log();
    match inv.context().resolver().resolve_scope(path)? {
        Some(scope) => {
            for command in sorted(inv.registry().commands_in(scope.value_type())) {
                log.log(format!(" {}", command.format()));
            }
        }
        None => log.log_colored(format!("No scope by the name '{path}'"), ERROR_COLOR),
    }
    Ok(())
}
