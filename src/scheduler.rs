use chrono::{Datelike, NaiveDate, Timelike};
use chrono_tz::Tz;
use hourglass_rs::{SafeTimeProvider, TimeSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::dunning::DunningJobs;
use crate::notify::Notifier;
use crate::store::Store;

/// fire once per month on a fixed local day and time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySchedule {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

type Job = Box<dyn Fn(&SafeTimeProvider) + Send + Sync>;

struct Task {
    name: String,
    schedule: MonthlySchedule,
    job: Job,
}

struct SchedulerInner {
    tz: Tz,
    tasks: Mutex<Vec<Task>>,
    last_fired: Mutex<HashMap<String, NaiveDate>>,
}

impl SchedulerInner {
    /// fire every task whose local fire time has passed today and which has
    /// not fired yet today. late or repeated ticks are safe: a task fires at
    /// most once per local day, and the jobs themselves are idempotent.
    fn run_due(&self, time: &SafeTimeProvider) -> Vec<String> {
        let local = time.now().with_timezone(&self.tz);
        let today = local.date_naive();
        let mut fired = Vec::new();

        let tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!(error = %e, "scheduler task table unavailable");
                return fired;
            }
        };

        for task in tasks.iter() {
            if local.day() != task.schedule.day {
                continue;
            }
            if (local.hour(), local.minute()) < (task.schedule.hour, task.schedule.minute) {
                continue;
            }
            let already_fired = self
                .last_fired
                .lock()
                .map(|m| m.get(&task.name) == Some(&today))
                .unwrap_or(true);
            if already_fired {
                continue;
            }

            tracing::info!(task = %task.name, date = %today, "firing scheduled task");
            (task.job)(time);

            if let Ok(mut m) = self.last_fired.lock() {
                m.insert(task.name.clone(), today);
            }
            fired.push(task.name.clone());
        }

        fired
    }
}

/// process-scoped scheduler owning named recurring tasks, with explicit
/// start/stop lifecycle. collaborators are injected into the jobs at
/// registration time rather than reached for globally.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(tz: Tz) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                tz,
                tasks: Mutex::new(Vec::new()),
                last_fired: Mutex::new(HashMap::new()),
            }),
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn register<F>(&self, name: impl Into<String>, schedule: MonthlySchedule, job: F)
    where
        F: Fn(&SafeTimeProvider) + Send + Sync + 'static,
    {
        if let Ok(mut tasks) = self.inner.tasks.lock() {
            tasks.push(Task {
                name: name.into(),
                schedule,
                job: Box::new(job),
            });
        }
    }

    pub fn task_names(&self) -> Vec<String> {
        self.inner
            .tasks
            .lock()
            .map(|t| t.iter().map(|task| task.name.clone()).collect())
            .unwrap_or_default()
    }

    /// run any due tasks against an injected time source; used directly in
    /// tests and by the polling thread with system time
    pub fn run_due(&self, time: &SafeTimeProvider) -> Vec<String> {
        self.inner.run_due(time)
    }

    /// spawn the polling thread; a no-op if already running
    pub fn start(&mut self, poll: Duration) {
        if self.handle.is_some() {
            return;
        }
        self.stop.store(false, Ordering::Relaxed);

        let inner = self.inner.clone();
        let stop = self.stop.clone();
        self.handle = Some(std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let time = SafeTimeProvider::new(TimeSource::System);
                inner.run_due(&time);
                std::thread::sleep(poll);
            }
        }));
    }

    /// signal the polling thread and wait for it to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// wire the five standing billing triggers from the dunning jobs:
/// statement generation shortly after period close, reminders through the
/// due window, and the lock sweep after the deadline
pub fn standing_jobs(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, tz: Tz) -> Scheduler {
    let scheduler = Scheduler::new(tz);
    let jobs = DunningJobs::new(store, notifier, tz);
    let window = jobs.billing().clock().window;

    let generate = jobs.clone();
    scheduler.register(
        "monthly-statements",
        MonthlySchedule { day: 1, hour: 0, minute: 5 },
        move |time| {
            if let Err(e) = generate.generate_statements(time) {
                tracing::error!(error = %e, "statement generation run failed");
            }
        },
    );

    for day in window.reminder_days {
        let remind = jobs.clone();
        scheduler.register(
            format!("payment-reminder-{day:02}"),
            MonthlySchedule { day, hour: 8, minute: 0 },
            move |time| {
                if let Err(e) = remind.send_reminders(time) {
                    tracing::error!(error = %e, "reminder run failed");
                }
            },
        );
    }

    let sweep = jobs;
    scheduler.register(
        "lock-sweep",
        MonthlySchedule { day: window.lock_day, hour: 0, minute: 0 },
        move |time| {
            if let Err(e) = sweep.lock_sweep(time) {
                tracing::error!(error = %e, "lock sweep run failed");
            }
        },
    );

    scheduler
}
