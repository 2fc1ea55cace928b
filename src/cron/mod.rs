//! In-memory scheduler for one-shot and recurring reminder jobs.
//!
//! Jobs live only for the life of the process. A one-second tick scans the
//! table; due jobs are removed (one-shot) or re-armed (recurring) inside the
//! same critical section that found them due, and the fire callback runs
//! after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bus::{InboundMessage, MessageBus};
use crate::error::{PicoError, Result};

/// Tick resolution of [`Scheduler::run`].
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Snapshot of a scheduled job, as handed to the fire callback.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub message: String,
    pub fire_at: DateTime<Utc>,
    /// Channel the job was scheduled from
    pub channel: String,
    /// Chat the job was scheduled from
    pub chat_id: String,
    pub recurring: bool,
    /// Re-arm interval for recurring jobs, zero otherwise
    #[serde(with = "duration_millis")]
    pub interval: Duration,
}

impl Job {
    /// Time left until the job fires, zero when already due.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.fire_at - now).to_std().unwrap_or_default()
    }
}

/// Invoked once per fire with a copy of the job.
pub type FireCallback = Arc<dyn Fn(Job) + Send + Sync>;

/// Sender id stamped on reminder messages.
pub const REMINDER_SENDER: &str = "cron";

/// The synthetic inbound message a fired job turns into.
pub fn reminder_message(job: &Job) -> InboundMessage {
    InboundMessage::new(
        &job.channel,
        REMINDER_SENDER,
        &job.chat_id,
        &format!(
            "[Scheduled reminder fired] {} - Please relay this to the user in a friendly way.",
            job.message
        ),
    )
}

/// A fire callback that injects [`reminder_message`] into the bus.
///
/// Inside a Tokio runtime the publish happens on a spawned task and waits
/// for inbound capacity. Outside one it is a non-blocking publish.
pub fn bus_callback(bus: Arc<MessageBus>) -> FireCallback {
    Arc::new(move |job: Job| {
        let msg = reminder_message(&job);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let bus = Arc::clone(&bus);
                handle.spawn(async move {
                    if let Err(e) = bus.publish_inbound(msg).await {
                        warn!(job = %job.id, error = %e, "Failed to deliver reminder");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = bus.try_publish_inbound(msg) {
                    warn!(job = %job.id, error = %e, "Failed to deliver reminder");
                }
            }
        }
    })
}

#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, Job>,
    next_id: u64,
}

/// Scheduler holding the job table and the fire callback.
pub struct Scheduler {
    table: Mutex<JobTable>,
    callback: FireCallback,
}

impl Scheduler {
    /// Create a scheduler that calls `callback` for every fired job.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use picobot::cron::Scheduler;
    ///
    /// let scheduler = Scheduler::new(Arc::new(|job| println!("fired {}", job.name)));
    /// let id = scheduler.add("tea", "Tea is ready", Duration::from_secs(180), "cli", "direct");
    /// assert_eq!(id, "job-1");
    /// assert_eq!(scheduler.list().len(), 1);
    /// ```
    pub fn new(callback: FireCallback) -> Self {
        Self {
            table: Mutex::new(JobTable::default()),
            callback,
        }
    }

    fn lock(&self) -> MutexGuard<'_, JobTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(
        &self,
        name: &str,
        message: &str,
        after: Duration,
        channel: &str,
        chat_id: &str,
        recurring: bool,
    ) -> String {
        let fire_at = Utc::now()
            + chrono::Duration::from_std(after).unwrap_or_else(|_| chrono::Duration::zero());
        let mut table = self.lock();
        table.next_id += 1;
        let id = format!("job-{}", table.next_id);
        table.jobs.insert(
            id.clone(),
            Job {
                id: id.clone(),
                name: name.to_string(),
                message: message.to_string(),
                fire_at,
                channel: channel.to_string(),
                chat_id: chat_id.to_string(),
                recurring,
                interval: if recurring { after } else { Duration::ZERO },
            },
        );
        id
    }

    /// Schedule a job that fires once after `delay`. Returns its id.
    pub fn add(
        &self,
        name: &str,
        message: &str,
        delay: Duration,
        channel: &str,
        chat_id: &str,
    ) -> String {
        let id = self.insert(name, message, delay, channel, chat_id, false);
        info!(job_id = %id, job_name = %name, delay = %format_duration(delay), "Scheduled job");
        id
    }

    /// Schedule a job that fires every `interval` until cancelled. Returns its id.
    pub fn add_recurring(
        &self,
        name: &str,
        message: &str,
        interval: Duration,
        channel: &str,
        chat_id: &str,
    ) -> String {
        let id = self.insert(name, message, interval, channel, chat_id, true);
        info!(
            job_id = %id,
            job_name = %name,
            interval = %format_duration(interval),
            "Scheduled recurring job"
        );
        id
    }

    /// Remove a job by id. Returns `true` if it existed.
    pub fn cancel(&self, id: &str) -> bool {
        let removed = self.lock().jobs.remove(id).is_some();
        if removed {
            info!(job_id = %id, "Cancelled job");
        }
        removed
    }

    /// Remove the first job with the given name. Returns `true` if one existed.
    pub fn cancel_by_name(&self, name: &str) -> bool {
        let mut table = self.lock();
        let id = table
            .jobs
            .values()
            .find(|job| job.name == name)
            .map(|job| job.id.clone());
        match id {
            Some(id) => {
                table.jobs.remove(&id);
                info!(job_id = %id, job_name = %name, "Cancelled job");
                true
            }
            None => false,
        }
    }

    /// Pending jobs, soonest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.lock().jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire every job due at `now` and return the fired snapshots.
    ///
    /// A job is due when `now` is strictly after its fire time.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<Job> {
        let fired: Vec<Job> = {
            let mut table = self.lock();
            let due: Vec<String> = table
                .jobs
                .values()
                .filter(|job| now > job.fire_at)
                .map(|job| job.id.clone())
                .collect();

            let mut fired = Vec::with_capacity(due.len());
            for id in due {
                let rearm = table.jobs.get(&id).map(|job| job.recurring);
                match rearm {
                    Some(true) => {
                        if let Some(job) = table.jobs.get_mut(&id) {
                            fired.push(job.clone());
                            job.fire_at = now
                                + chrono::Duration::from_std(job.interval)
                                    .unwrap_or_else(|_| chrono::Duration::zero());
                        }
                    }
                    Some(false) => {
                        if let Some(job) = table.jobs.remove(&id) {
                            fired.push(job);
                        }
                    }
                    None => {}
                }
            }
            fired
        };

        for job in &fired {
            info!(job_id = %job.id, job_name = %job.name, "Firing job");
            (self.callback)(job.clone());
        }
        fired
    }

    /// Tick every second until `shutdown` flips to `true` or its sender drops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("Scheduler started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let fired = self.tick(Utc::now());
                    if !fired.is_empty() {
                        debug!(count = fired.len(), "Scheduler tick fired jobs");
                    }
                }
            }
        }

        info!("Scheduler stopped");
    }
}

/// Parse a duration such as `90s`, `2m`, `1h30m`, `1.5h` or `250ms`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(PicoError::Tool("empty duration".into()));
    }
    let invalid = || PicoError::Tool(format!("invalid duration {:?}", input));

    let mut total_ms = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let ms_per_unit = match &rest[..unit_len] {
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total_ms += value * ms_per_unit;
    }

    Ok(Duration::from_millis(total_ms.round() as u64))
}

/// Render a duration compactly: `250ms`, `45s`, `2m0s`, `1h30m0s`.
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        return format!("{}ms", total_ms);
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let millis = total_ms % 60_000;
    let seconds = if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        let s = format!("{:.3}", millis as f64 / 1000.0);
        format!("{}s", s.trim_end_matches('0'))
    };

    if hours > 0 {
        format!("{}h{}m{}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}", minutes, seconds)
    } else {
        seconds
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recording() -> (Arc<Mutex<Vec<Job>>>, Scheduler) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let scheduler = Scheduler::new(Arc::new(move |job| sink.lock().unwrap().push(job)));
        (fired, scheduler)
    }

    #[test]
    fn test_reminder_message_addressing() {
        let (_fired, s) = recording();
        s.add("tea", "Tea is ready", Duration::from_secs(60), "telegram", "42");
        let msg = reminder_message(&s.list()[0]);
        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.chat_id, "42");
        assert_eq!(msg.sender_id, "cron");
        assert_eq!(
            msg.content,
            "[Scheduled reminder fired] Tea is ready - Please relay this to the user in a friendly way."
        );
    }

    #[tokio::test]
    async fn test_bus_callback_publishes_inbound() {
        let bus = Arc::new(MessageBus::with_buffer_size(4));
        let s = Scheduler::new(bus_callback(Arc::clone(&bus)));
        s.add("stretch", "Stand up", Duration::from_millis(10), "cli", "direct");

        let fire_at = s.list()[0].fire_at;
        assert_eq!(s.tick(fire_at + ms(1)).len(), 1);

        let msg = tokio::time::timeout(Duration::from_secs(1), bus.consume_inbound())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.sender_id, "cron");
        assert!(msg.content.contains("Stand up"));
    }

    fn ms(n: i64) -> chrono::Duration {
        chrono::Duration::milliseconds(n)
    }

    #[test]
    fn test_ids_are_sequential() {
        let (_fired, s) = recording();
        assert_eq!(s.add("a", "m", Duration::from_secs(1), "cli", "c"), "job-1");
        assert_eq!(
            s.add_recurring("b", "m", Duration::from_secs(1), "cli", "c"),
            "job-2"
        );
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_one_shot_fires_exactly_once() {
        let (fired, s) = recording();
        s.add("tea", "Tea is ready", Duration::from_millis(100), "telegram", "42");
        let fire_at = s.list()[0].fire_at;

        assert!(s.tick(fire_at).is_empty(), "due only strictly after fire time");
        let first = s.tick(fire_at + ms(1));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].message, "Tea is ready");
        assert_eq!(first[0].chat_id, "42");
        assert!(s.tick(fire_at + ms(2000)).is_empty());

        assert_eq!(fired.lock().unwrap().len(), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancelled_job_never_fires() {
        let (fired, s) = recording();
        let id = s.add("x", "never", Duration::from_millis(100), "cli", "c");
        let fire_at = s.list()[0].fire_at;

        assert!(s.cancel(&id));
        assert!(!s.cancel(&id));
        assert!(s.tick(fire_at + ms(5000)).is_empty());
        assert!(fired.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recurring_rearms_until_cancelled() {
        let (fired, s) = recording();
        s.add_recurring("ping", "again", Duration::from_secs(10), "cli", "c");
        let mut now = s.list()[0].fire_at;

        for _ in 0..3 {
            now = now + ms(1);
            assert_eq!(s.tick(now).len(), 1);
            let next = s.list()[0].fire_at;
            assert_eq!(next, now + chrono::Duration::seconds(10));
            now = next;
        }
        assert!(s.cancel_by_name("ping"));
        assert!(s.tick(now + chrono::Duration::seconds(60)).is_empty());
        assert_eq!(fired.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_cancel_by_name_and_list_order() {
        let (_fired, s) = recording();
        s.add("late", "m", Duration::from_secs(600), "cli", "c");
        s.add("soon", "m", Duration::from_secs(5), "cli", "c");

        let names: Vec<_> = s.list().into_iter().map(|j| j.name).collect();
        assert_eq!(names, vec!["soon", "late"]);

        assert!(s.cancel_by_name("late"));
        assert!(!s.cancel_by_name("late"));
        assert_eq!(s.len(), 1);
    }

    #[tokio::test]
    async fn test_run_fires_and_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let s = Arc::new(Scheduler::new(Arc::new(move |_job| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        s.add("soon", "m", Duration::from_millis(100), "cli", "c");

        let (tx, rx) = watch::channel(false);
        let runner = Arc::clone(&s);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let _ = tx.send(true);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m0s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
    }
}
