//! Integration tests for background module loading.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use scoped_console::commands::{
    root_scope, CommandDecl, CommandMeta, Converter, ConverterDecl, FnConverter, LoaderState,
    Module, ParamDecl,
};
use scoped_console::config::ConsoleConfig;
use scoped_console::console::Console;
use scoped_console::error::DefinitionError;
use scoped_console::value::{Value, ValueType};

use super::console;

/// A one-shot latch.
#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Knots(u32);

impl fmt::Display for Knots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kn", self.0)
    }
}

fn noop(name: &str) -> CommandDecl {
    CommandDecl::global(CommandMeta::new(name), vec![], |_| Ok(None))
}

#[tokio::test]
async fn test_submitted_module_available_to_next_execute() {
    let console = console();
    console.submit_modules([Module::new("greeter").command(CommandDecl::global(
        CommandMeta::new("greet"),
        vec![ParamDecl::required::<String>("who")],
        |inv| Ok(Some(Value::new(format!("Hello, {}", inv.arg::<String>(0)?)))),
    ))]);

    // Execution waits for the in-flight batch.
    let value = console.try_execute_command("greet world").await.unwrap();
    assert_eq!(
        value.unwrap().downcast_ref::<String>().map(String::as_str),
        Some("Hello, world")
    );
}

#[tokio::test]
async fn test_resubmission_is_noop() {
    let console = console();
    assert_eq!(console.submit_modules([Module::new("m").command(noop("once"))]), 1);
    console.wait_loaded().await;
    let count = console.registry().command_count();

    assert_eq!(console.submit_modules([Module::new("m").command(noop("once"))]), 0);
    console.wait_loaded().await;
    assert_eq!(console.registry().command_count(), count);
    assert!(console.diagnostics().is_empty());
}

#[tokio::test]
async fn test_duplicate_across_modules_keeps_first() {
    let console = console();
    let first = CommandDecl::global(CommandMeta::new("foo").help("first"), vec![], |_| Ok(None));
    let second =
        CommandDecl::global(CommandMeta::new("foo").help("second"), vec![], |_| Ok(None));
    console.load_modules_blocking([
        Module::new("alpha").command(first),
        Module::new("beta").command(second),
    ]);

    let foo = console.registry().lookup(root_scope(), "foo").unwrap();
    assert_eq!(foo.help(), "first");

    let diagnostics = console.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].module, "beta");
    match &diagnostics[0].error {
        DefinitionError::DuplicateCommand {
            name,
            existing,
            duplicate,
        } => {
            assert_eq!(name, "foo");
            assert!(existing.starts_with("alpha::foo ("));
            assert!(duplicate.starts_with("beta::foo ("));
        }
        other => panic!("unexpected diagnostic: {other:?}"),
    }
}

#[tokio::test]
async fn test_converters_load_before_commands_in_batch() {
    let console = console();
    // The command is listed in the module before its converter's module.
    let uses_knots = Module::new("uses").command(CommandDecl::global(
        CommandMeta::new("cruise"),
        vec![ParamDecl::required::<Knots>("speed")],
        |inv| Ok(Some(Value::new(inv.arg::<Knots>(0)?.clone()))),
    ));
    let provides_knots = Module::new("provides").converter(ConverterDecl::from_fn(
        "KnotsConverter",
        |token: &str| token.parse().ok().map(Knots),
    ));
    console.load_modules_blocking([uses_knots, provides_knots]);

    assert!(console.diagnostics().is_empty());
    let value = console.try_execute_command("cruise 12").await.unwrap().unwrap();
    assert_eq!(value.downcast_ref::<Knots>(), Some(&Knots(12)));
    assert_eq!(super::last_line(&console), "12 kn");
}

#[tokio::test]
async fn test_excluded_module_never_loads() {
    let config = ConsoleConfig {
        excluded_modules: vec!["secret".to_string()],
        ..Default::default()
    };
    let console = Console::new(&config).unwrap();
    assert_eq!(console.submit_modules([Module::new("secret").command(noop("hidden"))]), 0);
    console.wait_loaded().await;
    assert!(console.registry().lookup(root_scope(), "hidden").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submissions_during_loading_share_one_worker() {
    let console = console();
    let before = console.loader().workers_started();

    let entered = Arc::new(Gate::default());
    let release = Arc::new(Gate::default());
    let (entered_by_worker, released_for_worker) = (Arc::clone(&entered), Arc::clone(&release));
    let slow = Module::new("slow")
        .converter(ConverterDecl::with_factory(
            ValueType::of::<Knots>(),
            "SlowKnotsConverter",
            move || {
                entered_by_worker.open();
                released_for_worker.wait();
                Some(Arc::new(FnConverter::new("SlowKnotsConverter", |t: &str| {
                    t.parse().ok().map(Knots)
                })) as Arc<dyn Converter>)
            },
        ))
        .command(noop("alpha"));

    assert_eq!(console.submit_modules([slow]), 1);
    entered.wait();
    assert_eq!(console.loader().state(), LoaderState::Loading);

    assert_eq!(console.submit_modules([Module::new("fast").command(noop("beta"))]), 1);
    release.open();
    console.wait_loaded().await;

    assert_eq!(console.loader().state(), LoaderState::Idle);
    assert!(console.registry().lookup(root_scope(), "alpha").is_some());
    assert!(console.registry().lookup(root_scope(), "beta").is_some());
    assert_eq!(console.loader().workers_started(), before + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_disjoint_submissions_all_land() {
    let console = console();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let console = console.clone();
            thread::spawn(move || {
                console.submit_modules([Module::new(format!("module{i}"))
                    .command(noop(&format!("command{i}")))]);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    console.wait_loaded().await;
    for i in 0..8 {
        let name = format!("command{i}");
        assert!(
            console.registry().lookup(root_scope(), &name).is_some(),
            "{name} missing"
        );
    }
    assert!(console.diagnostics().is_empty());
}
