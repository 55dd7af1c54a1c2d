//! Background loading of command modules.
//!
//! Modules are queued by [`DiscoveryLoader::submit`] and drained by a single
//! worker on the blocking pool. The worker swaps out the whole pending queue,
//! loads that batch, and repeats until a swap comes back empty. Submissions
//! made while a batch is loading are picked up by the next drain cycle of the
//! same worker.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error};

use super::converters::ConverterDecl;
use super::definitions::CommandDecl;
use super::registry::Registry;

/// A named group of converter and command declarations.
#[derive(Debug)]
pub struct Module {
    name: String,
    converters: Vec<ConverterDecl>,
    commands: Vec<CommandDecl>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            converters: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn converter(mut self, decl: ConverterDecl) -> Self {
        self.converters.push(decl);
        self
    }

    pub fn converters(mut self, decls: impl IntoIterator<Item = ConverterDecl>) -> Self {
        self.converters.extend(decls);
        self
    }

    pub fn command(mut self, decl: CommandDecl) -> Self {
        self.commands.push(decl);
        self
    }

    pub fn commands(mut self, decls: impl IntoIterator<Item = CommandDecl>) -> Self {
        self.commands.extend(decls);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ConverterDecl>, Vec<CommandDecl>) {
        (self.name, self.converters, self.commands)
    }
}

/// Whether a batch is currently being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    Loading,
}

#[derive(Default)]
struct Queue {
    pending: Vec<Module>,
    /// Every module name ever accepted, loaded or still pending.
    recorded: HashSet<String>,
    /// Set while a drain loop owns the queue.
    active: bool,
}

struct Shared {
    registry: Arc<Registry>,
    excluded: HashSet<String>,
    queue: Mutex<Queue>,
    idle: Condvar,
    state: watch::Sender<LoaderState>,
    workers_started: AtomicUsize,
    runtime: Handle,
}

/// Coalescing module loader with at most one active worker.
#[derive(Clone)]
pub struct DiscoveryLoader {
    shared: Arc<Shared>,
}

impl DiscoveryLoader {
    /// Creates a loader writing into `registry`.
    ///
    /// Modules named in `excluded` are never loaded. Workers run on the
    /// blocking pool of `runtime`.
    pub fn new(
        registry: Arc<Registry>,
        excluded: impl IntoIterator<Item = String>,
        runtime: Handle,
    ) -> Self {
        let (state, _) = watch::channel(LoaderState::Idle);
        Self {
            shared: Arc::new(Shared {
                registry,
                excluded: excluded.into_iter().collect(),
                queue: Mutex::new(Queue::default()),
                idle: Condvar::new(),
                state,
                workers_started: AtomicUsize::new(0),
                runtime,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.shared.registry
    }

    /// Queues every module not seen before and starts a worker if none is
    /// running. Returns the number of modules queued.
    pub fn submit(&self, modules: impl IntoIterator<Item = Module>) -> usize {
        let mut queue = self.shared.lock();
        let queued = self.shared.enqueue(&mut queue, modules);
        if queued > 0 && !queue.active {
            self.shared.activate(&mut queue);
            drop(queue);
            let shared = Arc::clone(&self.shared);
            self.shared.runtime.spawn_blocking(move || shared.drain());
        }
        queued
    }

    /// Loads `modules` before returning.
    ///
    /// Runs the drain loop on the calling thread, or waits for the active
    /// worker to absorb the modules if one is already running.
    pub fn load_blocking(&self, modules: impl IntoIterator<Item = Module>) -> usize {
        let mut queue = self.shared.lock();
        let queued = self.shared.enqueue(&mut queue, modules);
        if queue.active {
            drop(queue);
            self.wait_idle_blocking();
        } else if queued > 0 {
            self.shared.activate(&mut queue);
            drop(queue);
            self.shared.drain();
        }
        queued
    }

    /// Completes once no batch is loading.
    pub async fn wait_idle(&self) {
        let mut state = self.shared.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = state.wait_for(|s| *s == LoaderState::Idle).await;
    }

    /// Blocks the calling thread until no batch is loading.
    pub fn wait_idle_blocking(&self) {
        let mut queue = self.shared.lock();
        while queue.active {
            queue = self
                .shared
                .idle
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn state(&self) -> LoaderState {
        *self.shared.state.borrow()
    }

    /// Whether a module with this name has been accepted.
    pub fn is_loaded(&self, module: &str) -> bool {
        self.shared.lock().recorded.contains(module)
    }

    /// Number of drain loops started over the loader's lifetime.
    pub fn workers_started(&self) -> usize {
        self.shared.workers_started.load(Ordering::SeqCst)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, queue: &mut Queue, modules: impl IntoIterator<Item = Module>) -> usize {
        let mut queued = 0;
        for module in modules {
            if self.excluded.contains(module.name()) {
                debug!("Skipping excluded module '{}'", module.name());
                continue;
            }
            if !queue.recorded.insert(module.name().to_string()) {
                debug!("Module '{}' already submitted", module.name());
                continue;
            }
            queue.pending.push(module);
            queued += 1;
        }
        queued
    }

    fn activate(&self, queue: &mut Queue) {
        queue.active = true;
        self.workers_started.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(LoaderState::Loading);
    }

    fn drain(&self) {
        loop {
            let batch = {
                let mut queue = self.lock();
                if queue.pending.is_empty() {
                    queue.active = false;
                    self.state.send_replace(LoaderState::Idle);
                    self.idle.notify_all();
                    return;
                }
                std::mem::take(&mut queue.pending)
            };

            debug!(modules = batch.len(), "Loading module batch");
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| self.registry.load_batch(batch)));
            if result.is_err() {
                error!("Module batch panicked while loading; continuing with the next batch");
            }
        }
    }
}
