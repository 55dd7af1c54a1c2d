//! The console: the execution interface in front of the command registry.
//!
//! A [`Console`] owns the registry, the loader, the visible log and the
//! input history. Built-in commands are loaded when it is created; further
//! modules are submitted in the background or loaded synchronously.

mod history;
mod log;

pub use history::InputHistory;
pub use log::{ConsoleLog, LogLine, ERROR_COLOR, HIGHLIGHT_COLOR};

use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tracing::info;

use crate::commands::{builtins, Diagnostic, DiscoveryLoader, Executor, Module, Registry};
use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use crate::value::Value;

struct Inner {
    loader: DiscoveryLoader,
    executor: Executor,
    log: Arc<ConsoleLog>,
    history: Mutex<InputHistory>,
}

/// Handle to a running console. Cheap to clone.
#[derive(Clone)]
pub struct Console {
    inner: Arc<Inner>,
}

impl Console {
    /// Creates a console on the current tokio runtime.
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ConsoleError::runtime(format!("No tokio runtime available: {e}")))?;
        Self::with_runtime(config, runtime)
    }

    /// Creates a console whose loader runs on `runtime`.
    pub fn with_runtime(config: &ConsoleConfig, runtime: Handle) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(Registry::new(config.escape_set()));
        let loader = DiscoveryLoader::new(registry, config.excluded_modules.clone(), runtime);
        let log = Arc::new(ConsoleLog::new(config.max_log_lines));
        let executor = Executor::new(loader.clone(), Arc::clone(&log), config.debug);

        loader.load_blocking([builtins::module()]);
        info!(
            commands = loader.registry().command_count(),
            "Console initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                loader,
                executor,
                log,
                history: Mutex::new(InputHistory::new(config.max_input_history)),
            }),
        })
    }

    /// Queues modules for background loading.
    pub fn submit_modules(&self, modules: impl IntoIterator<Item = Module>) -> usize {
        self.inner.loader.submit(modules)
    }

    /// Loads modules before returning.
    pub fn load_modules_blocking(&self, modules: impl IntoIterator<Item = Module>) -> usize {
        self.inner.loader.load_blocking(modules)
    }

    /// Completes once every submitted module has been loaded.
    pub async fn wait_loaded(&self) {
        self.inner.loader.wait_idle().await;
    }

    /// Executes a command path typed by the user.
    ///
    /// Echoes the input to the log, records it in the input history and logs
    /// the textual result. Empty input is rejected.
    pub async fn try_execute_command(&self, path: &str) -> Result<Option<Value>> {
        self.record_input(path)?;
        let result = self.inner.executor.execute(path).await?;
        self.log_result(result.as_ref());
        Ok(result)
    }

    /// Blocking counterpart of [`try_execute_command`](Self::try_execute_command).
    pub fn try_execute_command_blocking(&self, path: &str) -> Result<Option<Value>> {
        self.record_input(path)?;
        let result = self.inner.executor.execute_blocking(path)?;
        self.log_result(result.as_ref());
        Ok(result)
    }

    fn record_input(&self, path: &str) -> Result<()> {
        if path.trim().is_empty() {
            return Err(ConsoleError::input("command path cannot be empty"));
        }
        self.inner.log.log(format!(">> {path}"));
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path);
        Ok(())
    }

    fn log_result(&self, result: Option<&Value>) {
        if let Some(value) = result {
            self.inner.log.log(value.render());
        }
    }

    /// The input `index` entries back, 0 being the most recent.
    pub fn input_history_at(&self, index: usize) -> Option<String> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .map(str::to_string)
    }

    pub fn input_history_len(&self) -> usize {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn log(&self) -> &Arc<ConsoleLog> {
        &self.inner.log
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.inner.loader.registry()
    }

    pub fn loader(&self) -> &DiscoveryLoader {
        &self.inner.loader
    }

    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// Definition problems reported while loading modules.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.registry().diagnostics()
    }
}
