//! Mounted route guards.
//!
//! A `RouteGuard` owns a watcher task for its whole lifetime. The task runs
//! one resolution cycle on mount and a fresh one on every session change or
//! explicit refresh. A cycle still in flight when the next trigger arrives is
//! dropped (cancelled) and its generation goes stale, so only the newest
//! resolution can ever reach the state.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use gatehouse_events::Subscription;

use crate::area::AreaConfig;
use crate::engine::{GuardContext, GuardEngine};
use crate::render::View;
use crate::session::SessionChange;
use crate::state::{Generation, GuardMachine, GuardState};

struct Shared {
    engine: GuardEngine,
    machine: Mutex<GuardMachine>,
    state_tx: watch::Sender<GuardState>,
}

impl Shared {
    fn begin(&self) -> Generation {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = machine.begin();
        self.state_tx.send_replace(GuardState::Pending);
        generation
    }

    fn settle(&self, generation: Generation, next: GuardState) {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        match machine.settle(generation, next) {
            Ok(state) => {
                tracing::info!(
                    area = %self.engine.area().name,
                    %generation,
                    state = state.label(),
                    "guard settled"
                );
                self.state_tx.send_replace(state.clone());
            }
            Err(rejected) => {
                tracing::debug!(area = %self.engine.area().name, %rejected, "discarding resolution");
            }
        }
    }
}

/// Re-evaluation triggers: provider notifications plus manual refreshes.
struct Triggers {
    changes: Subscription<SessionChange>,
    changes_open: bool,
    refresh: mpsc::UnboundedReceiver<()>,
}

impl Triggers {
    /// Wait for the next trigger. `false` once nothing can trigger again.
    async fn next(&mut self) -> bool {
        loop {
            tokio::select! {
                change = self.changes.recv(), if self.changes_open => match change {
                    Some(change) => {
                        tracing::debug!(event = ?change.event, "session change");
                        return true;
                    }
                    None => self.changes_open = false,
                },
                request = self.refresh.recv() => return request.is_some(),
            }
        }
    }
}

async fn run(shared: Arc<Shared>, mut triggers: Triggers) {
    loop {
        let generation = shared.begin();
        let evaluation = shared.engine.evaluate();
        tokio::pin!(evaluation);

        let verdict = tokio::select! {
            biased;
            more = triggers.next() => {
                if more {
                    tracing::debug!(area = %shared.engine.area().name, %generation, "resolution superseded");
                    continue;
                }
                evaluation.await
            }
            verdict = &mut evaluation => verdict,
        };
        shared.settle(generation, verdict.state);

        if !triggers.next().await {
            return;
        }
    }
}

/// A guard over one area, wrapping the protected `children`.
///
/// Must be mounted inside a tokio runtime. Dropping the guard (or calling
/// [`RouteGuard::unmount`]) cancels any in-flight resolution and releases the
/// session subscription.
pub struct RouteGuard<C> {
    children: C,
    shared: Arc<Shared>,
    state_rx: watch::Receiver<GuardState>,
    refresh_tx: mpsc::UnboundedSender<()>,
    watcher: Option<JoinHandle<()>>,
}

impl<C> RouteGuard<C> {
    pub fn mount(context: GuardContext, area: Arc<AreaConfig>, children: C) -> Self {
        // Subscribe before the first evaluation so no change slips between them.
        let changes = context.sessions().subscribe();
        let (state_tx, state_rx) = watch::channel(GuardState::Pending);
        let (refresh_tx, refresh) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            engine: GuardEngine::new(area, context),
            machine: Mutex::new(GuardMachine::new()),
            state_tx,
        });

        tracing::debug!(area = %shared.engine.area().name, "guard mounted");

        let watcher = tokio::spawn(run(
            shared.clone(),
            Triggers {
                changes,
                changes_open: true,
                refresh,
            },
        ));

        Self {
            children,
            shared,
            state_rx,
            refresh_tx,
            watcher: Some(watcher),
        }
    }

    pub fn area(&self) -> &AreaConfig {
        self.shared.engine.area()
    }

    pub fn state(&self) -> GuardState {
        self.state_rx.borrow().clone()
    }

    /// Watch state changes (each cycle publishes `Pending`, then its result).
    pub fn subscribe_state(&self) -> watch::Receiver<GuardState> {
        self.state_rx.clone()
    }

    /// Wait for the next state change. `None` once the watcher is gone.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.state_rx.changed().await.ok()?;
        Some(self.state_rx.borrow_and_update().clone())
    }

    /// Wait until the current cycle settles.
    pub async fn settled(&self) -> GuardState {
        let mut rx = self.state_rx.clone();
        match rx.wait_for(|s| !s.is_pending()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    pub fn render(&self) -> View<'_, C> {
        View::of(&self.state_rx.borrow(), &self.children)
    }

    /// Re-run the pipeline without a session change (e.g. after an admin edit).
    pub fn refresh(&self) {
        let _ = self.refresh_tx.send(());
    }

    /// Tear down and wait until the watcher is gone.
    pub async fn unmount(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            let _ = watcher.await;
        }
        tracing::debug!(area = %self.area().name, "guard unmounted");
    }
}

impl<C> Drop for RouteGuard<C> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
