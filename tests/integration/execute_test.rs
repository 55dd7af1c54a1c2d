//! Integration tests for command execution through the console.

use pretty_assertions::assert_eq;
use scoped_console::commands::{CommandDecl, CommandMeta, Module, ParamDecl};
use scoped_console::config::ConsoleConfig;
use scoped_console::console::{Console, ERROR_COLOR};
use scoped_console::error::{ConsoleError, UserError};
use scoped_console::value::{Color, Value};

use super::{console, last_line, log_texts};

fn greeter() -> Module {
    Module::new("greeter")
        .command(CommandDecl::global(
            CommandMeta::new("greet").help("Greets two people"),
            vec![
                ParamDecl::required::<String>("first"),
                ParamDecl::required::<String>("second"),
            ],
            |inv| {
                let message = format!(
                    "Hello {} and {}",
                    inv.arg::<String>(0)?,
                    inv.arg::<String>(1)?
                );
                Ok(Some(Value::new(message)))
            },
        ))
        .command(CommandDecl::global(
            CommandMeta::new("enable"),
            vec![ParamDecl::required::<bool>("enabled")],
            |inv| Ok(Some(Value::new(*inv.arg::<bool>(0)?))),
        ))
        .command(CommandDecl::global(
            CommandMeta::new("paint"),
            vec![ParamDecl::required::<Color>("color")],
            |inv| Ok(Some(Value::new(*inv.arg::<Color>(0)?))),
        ))
}

fn loaded_console() -> Console {
    let console = console();
    console.load_modules_blocking([greeter()]);
    console
}

#[tokio::test]
async fn test_missing_parameters_message() {
    let console = loaded_console();
    assert!(console.try_execute_command("greet").await.unwrap().is_none());
    assert_eq!(
        last_line(&console),
        "Command 'greet' requires at least 2 parameters: [First] and [Second]"
    );
    assert_eq!(console.log().lines()[0].color, Some(ERROR_COLOR));
}

#[tokio::test]
async fn test_trailing_tokens_aggregated() {
    let console = loaded_console();
    let value = console
        .try_execute_command("greet Ada Grace Hopper")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        value.downcast_ref::<String>().unwrap(),
        "Hello Ada and Grace Hopper"
    );
}

#[tokio::test]
async fn test_bool_forms() {
    let console = loaded_console();
    for token in ["Y", "yes", "true"] {
        let value = console
            .try_execute_command(&format!("enable {token}"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value.downcast_ref::<bool>(), Some(&true), "{token}");
    }

    assert!(console.try_execute_command("enable maybe").await.unwrap().is_none());
    assert_eq!(
        last_line(&console),
        "Could not parse parameter Enabled - Enabled must be a valid bool"
    );
}

#[tokio::test]
async fn test_color_parameter() {
    let console = loaded_console();
    let value = console
        .try_execute_command("paint #FFFCD1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.downcast_ref::<Color>(), Some(&Color::rgb(0xFF, 0xFC, 0xD1)));
    assert_eq!(last_line(&console), "#FFFCD1");
}

#[tokio::test]
async fn test_unknown_command() {
    let console = loaded_console();
    assert!(console.try_execute_command("launch now").await.unwrap().is_none());
    assert_eq!(
        log_texts(&console),
        vec![">> launch now", "'launch' is not a valid command"]
    );
}

#[tokio::test]
async fn test_unknown_first_segment_resolves_to_none() {
    let console = loaded_console();
    assert!(console.try_execute_command("nowhere.greet a b").await.unwrap().is_none());
    // No traversal error is logged, only the unknown command.
    assert_eq!(
        log_texts(&console),
        vec![">> nowhere.greet a b", "'greet' is not a valid command"]
    );
}

#[tokio::test]
async fn test_input_is_trimmed() {
    let console = loaded_console();
    let value = console
        .try_execute_command("   enable  no   ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.downcast_ref::<bool>(), Some(&false));
}

#[tokio::test]
async fn test_rejection_from_body() {
    let console = console();
    console.load_modules_blocking([Module::new("strict").command(CommandDecl::global(
        CommandMeta::new("withdraw"),
        vec![ParamDecl::required::<u32>("amount")],
        |inv| {
            let amount = *inv.arg::<u32>(0)?;
            if amount > 100 {
                return Err(UserError::rejected(format!("Cannot withdraw {amount}")).into());
            }
            Ok(Some(Value::new(amount)))
        },
    ))]);

    assert!(console.try_execute_command("withdraw 500").await.unwrap().is_none());
    assert_eq!(last_line(&console), "Cannot withdraw 500");
    assert!(console.try_execute_command("withdraw -1").await.unwrap().is_none());
    assert_eq!(
        last_line(&console),
        "Could not parse parameter Amount - Amount must be a valid u32"
    );
}

fn exploding() -> Module {
    Module::new("explosive").command(CommandDecl::global(
        CommandMeta::new("explode"),
        vec![],
        |_| Err(anyhow::anyhow!("boom")),
    ))
}

#[tokio::test]
async fn test_unhandled_error_caught_in_production() {
    let console = console();
    console.load_modules_blocking([exploding()]);
    assert!(console.try_execute_command("explode").await.unwrap().is_none());
    let texts = log_texts(&console);
    assert_eq!(
        texts[texts.len() - 2..],
        [
            "Unhandled error attempting to execute command 'explode': boom".to_string(),
            "See error log for more details".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unhandled_error_propagates_in_debug() {
    let config = ConsoleConfig {
        debug: true,
        ..Default::default()
    };
    let console = Console::new(&config).unwrap();
    console.load_modules_blocking([exploding()]);
    let err = console.try_execute_command("explode").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Unhandled { .. }));
    assert_eq!(
        err.to_string(),
        "Unhandled error attempting to execute command 'explode': boom"
    );
}

#[test]
fn test_blocking_execution_outside_async() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let console = Console::with_runtime(&ConsoleConfig::default(), runtime.handle().clone()).unwrap();
    console.submit_modules([greeter()]);
    let value = console
        .try_execute_command_blocking("greet a b")
        .unwrap()
        .unwrap();
    assert_eq!(value.downcast_ref::<String>().unwrap(), "Hello a and b");
}
