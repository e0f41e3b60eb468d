//! # Supervisor: owns the registered tasks and starts/stops them as a group.
//!
//! ## Architecture
//! ```text
//! add_task(t)  ──► [tasks lock] push (duplicate id/name rejected)
//!
//! start():  [lifecycle lock] Stopped? ─► running = true
//!              ├─► t0.start()  t1.start() ... tN.start()   (failures logged, fan-out continues)
//!              └─► spawn monitor(interval)
//!
//! stop():   [lifecycle lock] Running? ─► running = false
//!              ├─► t0.stop()   t1.stop()  ... tN.stop()    (failures logged, fan-out continues)
//!              └─► monitor.shutdown()   (joined)
//!
//! monitor: every tick
//!   ├─ task stopped running since last tick? ─► warn once
//!   └─ every 100 ticks                        ─► debug heartbeat
//! ```
//!
//! ## Rules
//! - `Stopped → Running → Stopped`; no other observable state.
//! - `start()` / `stop()` are idempotent and linearized by one async lock.
//! - The task list lock guards O(1)-ish work only; task lifecycle calls run on a snapshot.
//! - A task failure never aborts the process or the fan-out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RuntimeError;
use crate::mailbox::TaskIdentity;
use crate::tasks::{TaskRef, Worker};

/// Monitor ticks between heartbeat log lines.
const HEARTBEAT_TICKS: u64 = 100;

type TaskList = Arc<Mutex<Vec<TaskRef>>>;

fn snapshot(tasks: &TaskList) -> Vec<TaskRef> {
    tasks.lock().unwrap_or_else(|p| p.into_inner()).clone()
}

/// Coordinates the lifecycle of every registered task.
pub struct Supervisor {
    identity: TaskIdentity,
    tasks: TaskList,
    lifecycle: tokio::sync::Mutex<()>,
    running: AtomicBool,
    monitor: Worker,
    monitor_interval: Duration,
}

impl Supervisor {
    /// Creates a stopped supervisor whose monitor ticks every `monitor_interval`.
    pub fn new(monitor_interval: Duration) -> Self {
        Self {
            identity: TaskIdentity::SUPERVISOR,
            tasks: Arc::new(Mutex::new(Vec::new())),
            lifecycle: tokio::sync::Mutex::new(()),
            running: AtomicBool::new(false),
            monitor: Worker::new(TaskIdentity::SUPERVISOR.name()),
            monitor_interval,
        }
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<TaskRef>> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Registers `task`. Allowed before and after `start()`; a task added while
    /// running is started on the next `start()` after a `stop()`.
    ///
    /// Rejects a task whose id or name is already registered.
    pub fn add_task(&self, task: TaskRef) -> Result<(), RuntimeError> {
        let mut tasks = self.tasks();
        if tasks
            .iter()
            .any(|t| t.id() == task.id() || t.name() == task.name())
        {
            return Err(RuntimeError::TaskAlreadyRegistered {
                id: task.id(),
                name: task.name().to_string(),
            });
        }
        info!(task = %task.identity(), "task registered");
        tasks.push(task);
        Ok(())
    }

    /// Linear lookup by name.
    pub fn get_task_by_name(&self, name: &str) -> Option<TaskRef> {
        self.tasks().iter().find(|t| t.name() == name).cloned()
    }

    /// Linear lookup by id.
    pub fn get_task_by_id(&self, id: u32) -> Option<TaskRef> {
        self.tasks().iter().find(|t| t.id() == id).cloned()
    }

    /// Snapshot of every registered task, in registration order.
    pub fn get_all_tasks(&self) -> Vec<TaskRef> {
        snapshot(&self.tasks)
    }

    /// Starts every task in registration order, then the monitor.
    ///
    /// No-op when already running.
    pub async fn start(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_running() {
            return;
        }
        self.running.store(true, Ordering::Release);

        let tasks = self.get_all_tasks();
        info!(tasks = tasks.len(), "starting tasks");
        for task in &tasks {
            if let Err(e) = task.start().await {
                error!(task = %task.identity(), error = %e, label = e.as_label(), "task failed to start");
            }
        }

        let list = Arc::clone(&self.tasks);
        let interval = self.monitor_interval;
        self.monitor
            .spawn(move |token| monitor(list, interval, token));
        info!("supervisor running");
    }

    /// Stops every task, then joins the monitor.
    ///
    /// No-op when not running.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        if !self.is_running() {
            return;
        }
        self.running.store(false, Ordering::Release);

        let tasks = self.get_all_tasks();
        info!(tasks = tasks.len(), "stopping tasks");
        for task in &tasks {
            if let Err(e) = task.stop().await {
                error!(task = %task.identity(), error = %e, label = e.as_label(), "task failed to stop");
            }
        }

        if let Err(e) = self.monitor.shutdown().await {
            error!(error = %e, "supervisor monitor ended abnormally");
        }
        info!("supervisor stopped");
    }
}

async fn monitor(tasks: TaskList, interval: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u64 = 0;
    let mut reported: HashSet<u32> = HashSet::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        ticks += 1;

        let tasks = snapshot(&tasks);
        for task in &tasks {
            if task.is_running() {
                reported.remove(&task.id());
            } else if reported.insert(task.id()) {
                warn!(task = %task.identity(), "task is not running");
            }
        }
        if ticks % HEARTBEAT_TICKS == 0 {
            debug!(ticks, tasks = tasks.len(), "supervisor heartbeat");
        }
    }
}
