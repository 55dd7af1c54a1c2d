//! Integration tests for the `help` and `commands` built-ins.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use scoped_console::console::{Console, ERROR_COLOR, HIGHLIGHT_COLOR};
use scoped_console::demo::{self, Fleet};

use super::{console, log_texts};

fn demo_console() -> Console {
    let console = console();
    console.load_modules_blocking([demo::module(Arc::new(Fleet::with_ships(["Aurora"])))]);
    console
}

/// Log output produced after the echoed input line.
async fn output_of(console: &Console, path: &str) -> Vec<String> {
    let before = console.log().cursor();
    console.try_execute_command(path).await.unwrap();
    let (lines, _) = console.log().lines_since(before);
    lines.into_iter().skip(1).map(|line| line.text).collect()
}

#[tokio::test]
async fn test_help_lists_root_commands() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "help").await,
        vec![
            "The following commands are loaded -",
            " commands",
            " fleet",
            " help",
        ]
    );
}

#[tokio::test]
async fn test_help_for_command() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "help help").await,
        vec![
            "help [Command]",
            "Lists the loaded commands, or shows how to use a single command",
        ]
    );
    let lines = console.log().lines();
    assert_eq!(lines[1].color, Some(HIGHLIGHT_COLOR));
}

#[tokio::test]
async fn test_help_resolves_argument_with_tokens() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "help fleet extra").await,
        vec!["fleet", "The fleet. Use as a scope: fleet.ships"]
    );
    assert_eq!(console.log().lines()[1].color, Some(HIGHLIGHT_COLOR));
}

#[tokio::test]
async fn test_help_for_unknown_command() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "help warp").await,
        vec!["No command by the name 'warp'"]
    );
    assert_eq!(console.log().lines()[0].color, Some(ERROR_COLOR));
}

#[tokio::test]
async fn test_commands_lists_every_scope() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "commands").await,
        vec![
            "Root:",
            "\tcommands [Scope]",
            "\tfleet",
            "\thelp [Command]",
            "Crew:",
            "\tadd [Name] [Role]",
            "\tlist",
            "Fleet:",
            "\tlaunch [Name]",
            "\tship [Name]",
            "\tships",
            "Ship:",
            "\tcrew",
            "\tdock [Docked]",
            "\thull [Value]",
            "\tspeed [Knots]",
            "\tstatus",
        ]
    );
}

#[tokio::test]
async fn test_commands_for_scope_path() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "commands fleet").await,
        vec![" launch [Name]", " ship [Name]", " ships"]
    );
}

#[tokio::test]
async fn test_commands_for_unknown_scope() {
    let console = demo_console();
    assert_eq!(
        output_of(&console, "commands nowhere").await,
        vec!["No scope by the name 'nowhere'"]
    );
}

#[tokio::test]
async fn test_builtins_cannot_be_used_as_scopes() {
    let console = demo_console();
    console.try_execute_command("help.fleet").await.unwrap();
    let texts = log_texts(&console);
    assert_eq!(texts.last().unwrap(), "'fleet' is not a valid command");
}
