//! Time-driven jobs.
//!
//! The hourly, daily, weekly and monthly jobs follow cron expressions evaluated in
//! the configured time zone; the outage escalation check runs on a fixed
//! interval. Each job has its own [`JobGuard`]: a firing that arrives while the
//! previous run of the same job is still in flight is skipped, never queued.

use crate::{
    config::{ScheduleConfig, parse_schedule},
    core::{monitor::Monitor, notify::Notifier},
    errors::Result,
};
use chrono_tz::Tz;
use cron::Schedule;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// A scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Outage / overheat / liveness check
    Hourly,
    /// Urgent outage escalation
    Escalation,
    /// Best day, milestone and cleaning checks
    Daily,
    /// Previous week's report
    Weekly,
    /// Previous month's report
    Monthly,
}

impl Job {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Escalation => "escalation",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Runs the job once and returns the messages to broadcast.
    pub async fn run(self, monitor: &Monitor) -> Result<Vec<String>> {
        match self {
            Self::Hourly => monitor.hourly_check().await,
            Self::Escalation => monitor.escalation_check().await,
            Self::Daily => monitor.daily_check().await,
            Self::Weekly => Ok(vec![monitor.weekly_report().await?]),
            Self::Monthly => Ok(vec![monitor.monthly_report().await?]),
        }
    }
}

/// Reentrancy guard for one job.
#[derive(Debug, Default)]
pub struct JobGuard {
    busy: AtomicBool,
}

impl JobGuard {
    /// Claims the job. Returns `None` while a previous run still holds it.
    #[must_use]
    pub fn try_acquire(self: &Arc<Self>) -> Option<JobPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobPermit {
                guard: Arc::clone(self),
            })
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of a run; releases the guard when dropped.
#[derive(Debug)]
pub struct JobPermit {
    guard: Arc<JobGuard>,
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// Runs `job` and hands every resulting message to `notifier`.
///
/// Failures are logged and end the run; nothing is sent for a failed run.
pub async fn run_and_notify(job: Job, monitor: &Monitor, notifier: &dyn Notifier) {
    match job.run(monitor).await {
        Ok(messages) => {
            debug!("Job {} produced {} message(s)", job.name(), messages.len());
            for text in messages {
                notifier.send(&text).await;
            }
        }
        Err(e) => error!("Job {} failed: {}", job.name(), e),
    }
}

/// Starts one run of `job` in the background unless the previous run is still going.
pub fn fire(
    job: Job,
    guard: &Arc<JobGuard>,
    monitor: &Arc<Monitor>,
    notifier: &Arc<dyn Notifier>,
) -> Option<JoinHandle<()>> {
    let Some(permit) = guard.try_acquire() else {
        warn!("Job {} still running, skipping this firing", job.name());
        return None;
    };

    let monitor = Arc::clone(monitor);
    let notifier = Arc::clone(notifier);
    Some(tokio::spawn(async move {
        let _permit = permit;
        run_and_notify(job, &monitor, notifier.as_ref()).await;
    }))
}

fn spawn_cron_job(
    job: Job,
    schedule: Schedule,
    tz: Tz,
    monitor: Arc<Monitor>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let guard = Arc::new(JobGuard::default());
        info!("Job {} scheduled", job.name());

        loop {
            let now = monitor.now().with_timezone(&tz);
            let Some(next) = schedule.after(&now).next() else {
                warn!("Job {} has no upcoming run, stopping", job.name());
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            debug!("Job {} next run at {}", job.name(), next);
            tokio::time::sleep(wait).await;

            fire(job, &guard, &monitor, &notifier);
        }
    })
}

fn spawn_interval_job(
    job: Job,
    period: Duration,
    monitor: Arc<Monitor>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let guard = Arc::new(JobGuard::default());
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Job {} started (every {}s)", job.name(), period.as_secs());

        loop {
            interval.tick().await;
            fire(job, &guard, &monitor, &notifier);
        }
    })
}

/// Spawns every scheduled job. Fails without spawning anything if a cron
/// expression does not parse.
pub fn spawn_scheduler(
    monitor: &Arc<Monitor>,
    notifier: &Arc<dyn Notifier>,
    config: &ScheduleConfig,
) -> Result<Vec<JoinHandle<()>>> {
    let cron_jobs = [
        (Job::Hourly, parse_schedule(&config.hourly)?),
        (Job::Daily, parse_schedule(&config.daily)?),
        (Job::Weekly, parse_schedule(&config.weekly)?),
        (Job::Monthly, parse_schedule(&config.monthly)?),
    ];
    let tz = monitor.tz();

    let mut handles: Vec<JoinHandle<()>> = cron_jobs
        .into_iter()
        .map(|(job, schedule)| {
            spawn_cron_job(job, schedule, tz, Arc::clone(monitor), Arc::clone(notifier))
        })
        .collect();
    handles.push(spawn_interval_job(
        Job::Escalation,
        Duration::from_secs(config.escalation_interval_secs),
        Arc::clone(monitor),
        Arc::clone(notifier),
    ));

    info!("Scheduler started with {} jobs", handles.len());
    Ok(handles)
}
