//! Integration tests for dotted scope traversal, using the demo fleet.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use scoped_console::commands::{CommandDecl, CommandMeta, Module, ParamDecl};
use scoped_console::console::Console;
use scoped_console::demo::{self, Fleet};
use scoped_console::value::{Color, Value};

use super::{console, last_line, log_texts};

fn fleet_console() -> (Console, Arc<Fleet>) {
    let console = console();
    let fleet = Arc::new(Fleet::with_ships(["Aurora", "Borealis"]));
    console.load_modules_blocking([demo::module(Arc::clone(&fleet))]);
    assert!(console.diagnostics().is_empty(), "{:?}", console.diagnostics());
    (console, fleet)
}

#[tokio::test]
async fn test_property_set_through_two_scopes() {
    let (console, fleet) = fleet_console();
    let result = console
        .try_execute_command("fleet.ship Aurora.speed 12.5")
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(fleet.get("Aurora").unwrap().speed(), 12.5);
    assert_eq!(fleet.get("Borealis").unwrap().speed(), 0.0);

    let speed = console
        .try_execute_command("fleet.ship Aurora.speed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(speed.downcast_ref::<f64>(), Some(&12.5));
    assert_eq!(last_line(&console), "12.5");
}

#[tokio::test]
async fn test_property_parse_failure_uses_override_name() {
    let (console, _) = fleet_console();
    console
        .try_execute_command("fleet.ship Aurora.speed fast")
        .await
        .unwrap();
    assert_eq!(
        last_line(&console),
        "Could not parse parameter Knots - Knots must be a valid f64"
    );
}

#[tokio::test]
async fn test_color_property() {
    let (console, fleet) = fleet_console();
    console
        .try_execute_command("fleet.ship Borealis.hull #FF512F")
        .await
        .unwrap();
    assert_eq!(
        fleet.get("Borealis").unwrap().hull(),
        Color::rgb(0xFF, 0x51, 0x2F)
    );
}

#[tokio::test]
async fn test_third_level_scope() {
    let (console, fleet) = fleet_console();
    console
        .try_execute_command("fleet.ship Aurora.crew.add Ada Pilot")
        .await
        .unwrap();
    console
        .try_execute_command("fleet.ship Aurora.crew.add Grace")
        .await
        .unwrap();
    assert_eq!(
        fleet.get("Aurora").unwrap().crew().roster(),
        vec!["Ada (Pilot)", "Grace (Deckhand)"]
    );

    console
        .try_execute_command("fleet.ship Aurora.crew.list")
        .await
        .unwrap();
    let texts = log_texts(&console);
    assert_eq!(texts[texts.len() - 2..], [" Ada (Pilot)".to_string(), " Grace (Deckhand)".to_string()]);
}

#[tokio::test]
async fn test_failed_hop_logs_error_and_stops() {
    let (console, _) = fleet_console();
    let result = console
        .try_execute_command("fleet.ship Nope.speed 3")
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(
        log_texts(&console),
        vec![
            ">> fleet.ship Nope.speed 3",
            "No ship named 'Nope'",
            "'speed' is not a valid command",
        ]
    );
}

#[tokio::test]
async fn test_scoping_disallowed_command_yields_no_scope() {
    let (console, fleet) = fleet_console();
    console
        .try_execute_command("fleet.ship Aurora.dock.speed 4")
        .await
        .unwrap();
    assert_eq!(last_line(&console), "'speed' is not a valid command");
    assert_eq!(fleet.get("Aurora").unwrap().speed(), 0.0);
}

#[tokio::test]
async fn test_command_not_in_scope() {
    let (console, _) = fleet_console();
    // `speed` lives on ships, not on the fleet.
    console.try_execute_command("fleet.speed 3").await.unwrap();
    assert_eq!(last_line(&console), "'speed' is not a valid command");
}

#[tokio::test]
async fn test_same_name_in_different_scopes() {
    let (console, _) = fleet_console();
    console.load_modules_blocking([Module::new("root-status").command(CommandDecl::global(
        CommandMeta::new("status"),
        vec![],
        |_| Ok(Some(Value::new("all systems nominal".to_string()))),
    ))]);
    assert!(console.diagnostics().is_empty());

    let root = console.try_execute_command("status").await.unwrap().unwrap();
    assert_eq!(root.downcast_ref::<String>().unwrap(), "all systems nominal");

    let ship = console
        .try_execute_command("fleet.ship Aurora.status")
        .await
        .unwrap()
        .unwrap();
    assert!(ship.downcast_ref::<String>().unwrap().starts_with("Aurora (docked"));
}

#[tokio::test]
async fn test_function_result_is_next_scope() {
    let console = console();
    #[derive(Debug)]
    struct Counter(u32);
    console.load_modules_blocking([Module::new("counters")
        .command(CommandDecl::global(
            CommandMeta::new("counter"),
            vec![ParamDecl::required::<u32>("start")],
            |inv| Ok(Some(Value::object(Counter(*inv.arg::<u32>(0)?)))),
        ))
        .command(CommandDecl::scoped::<Counter, _>(
            CommandMeta::new("next"),
            vec![],
            |counter, _| Ok(Some(Value::new(counter.0 + 1))),
        ))]);

    let value = console
        .try_execute_command("counter 41.next")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.downcast_ref::<u32>(), Some(&42));
}
