//! Search-as-you-type.
//!
//! [`QueryDebouncer`] collapses a burst of input changes into one navigation
//! once the input has been quiet for the configured delay. It never reads a
//! clock itself: callers pass `now`, which keeps it testable on logical time.
//! [`QueryNavigator`] runs it on a tokio task with `sleep_until` as the
//! cancellable timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::Config;

/// Downstream effect of a settled query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    /// Input was cleared: go back to the home view
    Home,
    /// Navigate to the results for this query
    Search(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending,
}

#[derive(Debug, Clone)]
pub struct QueryDebouncer {
    delay: Duration,
    latest_input: String,
    /// At most one armed timer; re-arming replaces it
    deadline: Option<Instant>,
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest_input: String::new(),
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn latest_input(&self) -> &str {
        &self.latest_input
    }

    pub fn state(&self) -> DebounceState {
        match self.deadline {
            Some(_) => DebounceState::Pending,
            None => DebounceState::Idle,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Records the input and re-arms the timer from `now`
    pub fn on_input_changed(&mut self, text: impl Into<String>, now: Instant) {
        self.latest_input = text.into();
        self.deadline = Some(now + self.delay);
    }

    /// Fires if the timer has expired by `now`, returning to idle.
    ///
    /// A whitespace-only input counts as cleared.
    pub fn fire(&mut self, now: Instant) -> Option<NavigationAction> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                let query = self.latest_input.trim();
                if query.is_empty() {
                    Some(NavigationAction::Home)
                } else {
                    Some(NavigationAction::Search(query.to_string()))
                }
            }
            _ => None,
        }
    }

    /// Cancels any pending timer without firing
    pub fn teardown(&mut self) {
        self.deadline = None;
    }
}

/// Receiver of settled navigation actions
pub trait NavigationSink: Send + 'static {
    fn navigate(&mut self, action: NavigationAction);
}

impl NavigationSink for mpsc::UnboundedSender<NavigationAction> {
    fn navigate(&mut self, action: NavigationAction) {
        if self.send(action).is_err() {
            tracing::debug!("Navigation receiver dropped");
        }
    }
}

enum NavigatorCommand {
    Input(String),
    Teardown,
}

/// Spawns debounced navigators
pub struct QueryNavigator;

impl QueryNavigator {
    /// Starts a navigator task delivering actions to `sink`
    pub fn spawn<S: NavigationSink>(delay: Duration, sink: S) -> QueryNavigatorHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_navigator(QueryDebouncer::new(delay), rx, sink));
        QueryNavigatorHandle { tx, task: Some(task) }
    }

    /// Starts a navigator with the configured `SEARCH_DEBOUNCE_MS` delay
    pub fn from_config<S: NavigationSink>(config: &Config, sink: S) -> QueryNavigatorHandle {
        Self::spawn(config.search_debounce(), sink)
    }
}

async fn run_navigator<S: NavigationSink>(
    mut debouncer: QueryDebouncer,
    mut commands: mpsc::UnboundedReceiver<NavigatorCommand>,
    mut sink: S,
) {
    loop {
        let command = match debouncer.deadline() {
            Some(deadline) => {
                tokio::select! {
                    command = commands.recv() => command,
                    _ = sleep_until(deadline) => {
                        if let Some(action) = debouncer.fire(Instant::now()) {
                            tracing::debug!(action = ?action, "Debounced query settled");
                            sink.navigate(action);
                        }
                        continue;
                    }
                }
            }
            None => commands.recv().await,
        };

        match command {
            Some(NavigatorCommand::Input(text)) => debouncer.on_input_changed(text, Instant::now()),
            Some(NavigatorCommand::Teardown) | None => {
                debouncer.teardown();
                break;
            }
        }
    }
}

/// Owner-side handle; dropping it tears the navigator down
pub struct QueryNavigatorHandle {
    tx: mpsc::UnboundedSender<NavigatorCommand>,
    task: Option<JoinHandle<()>>,
}

impl QueryNavigatorHandle {
    pub fn input(&self, text: impl Into<String>) {
        let _ = self.tx.send(NavigatorCommand::Input(text.into()));
    }

    /// Cancels any pending timer and waits for the task to stop
    pub async fn teardown(mut self) {
        let _ = self.tx.send(NavigatorCommand::Teardown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Query navigator task failed");
            }
        }
    }
}

impl Drop for QueryNavigatorHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(NavigatorCommand::Teardown);
    }
}
