//! Scheduler service for periodic pipeline runs.
//!
//! The service owns exactly one job slot, named [`JOB_NAME`], and the path of
//! the schedule file. The file is the single source of truth:
//! [`ScheduleService::get_schedule`] always reads it back, and
//! [`ScheduleService::set_schedule`] overwrites it wholesale after replacing
//! the job.
//!
//! Pipeline runs are serialized by one run lock. A timer tick that finds a
//! run in flight is skipped; [`ScheduleService::run_now`] waits its turn.

use crate::error::{PipelineError, ScheduleError};
use crate::models::{ScheduleConfig, ScheduleKind, ScheduleSpec};
use crate::pipeline::RunPipeline;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub const JOB_NAME: &str = "blog_generator";

const DEFAULT_INTERVAL_HOURS: u32 = 24;
const DEFAULT_DAY_OF_WEEK: &str = "*";
const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Days of the week a cron trigger fires on, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySet([bool; 7]);

impl DaySet {
    /// Parse a `day_of_week` expression.
    ///
    /// Accepts `*`, day names `mon`..`sun`, numbers `0`..`6` (0 is Monday),
    /// comma separated lists and ranges such as `mon-fri` or `fri-mon`.
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let invalid = || ScheduleError::InvalidDayOfWeek(expr.to_string());
        let mut days = [false; 7];

        for token in expr.split(',').map(|t| t.trim().to_ascii_lowercase()) {
            if token == "*" {
                days = [true; 7];
                continue;
            }
            match token.split_once('-') {
                Some((start, end)) => {
                    let start = parse_day(start).ok_or_else(invalid)?;
                    let end = parse_day(end).ok_or_else(invalid)?;
                    let mut day = start;
                    loop {
                        days[day] = true;
                        if day == end {
                            break;
                        }
                        day = (day + 1) % 7;
                    }
                }
                None => days[parse_day(&token).ok_or_else(invalid)?] = true,
            }
        }

        if days.iter().any(|d| *d) {
            Ok(Self(days))
        } else {
            Err(invalid())
        }
    }

    pub fn contains(&self, day: chrono::Weekday) -> bool {
        self.0[day.num_days_from_monday() as usize]
    }
}

fn parse_day(token: &str) -> Option<usize> {
    let token = token.trim();
    DAY_NAMES
        .iter()
        .position(|name| *name == token)
        .or_else(|| token.parse::<usize>().ok().filter(|n| *n < 7))
}

/// First `hour:minute` on an allowed day strictly after `after`.
pub fn next_cron_fire(
    after: NaiveDateTime,
    days: &DaySet,
    hour: u32,
    minute: u32,
) -> Option<NaiveDateTime> {
    (0..=7)
        .filter_map(|offset| after.date().checked_add_signed(ChronoDuration::days(offset)))
        .filter(|date| days.contains(date.weekday()))
        .filter_map(|date| date.and_hms_opt(hour, minute, 0))
        .find(|candidate| *candidate > after)
}

/// When the job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Interval { hours: u32 },
    Cron { days: DaySet, hour: u32, minute: u32 },
}

impl Trigger {
    /// How long to sleep from `now` until the next fire time.
    pub fn delay_until_next(&self, now: DateTime<Local>) -> Option<Duration> {
        match self {
            Trigger::Interval { hours } => Some(Duration::from_secs(u64::from(*hours) * 3600)),
            Trigger::Cron { days, hour, minute } => {
                let next = next_cron_fire(now.naive_local(), days, *hour, *minute)?;
                let delta = match Local.from_local_datetime(&next).earliest() {
                    Some(at) => at - now,
                    // Fire time falls in a DST gap.
                    None => next - now.naive_local(),
                };
                delta.to_std().ok()
            }
        }
    }
}

/// Fill in defaults and validate.
///
/// Returns the config exactly as it will be persisted, plus the trigger to
/// register (none when disabled).
pub fn normalize(
    config: &ScheduleConfig,
) -> Result<(ScheduleConfig, Option<Trigger>), ScheduleError> {
    if !config.enabled {
        return Ok((ScheduleConfig::disabled(), None));
    }

    let spec = &config.schedule;
    match spec.kind.unwrap_or(ScheduleKind::Interval) {
        ScheduleKind::Interval => {
            let hours = spec.hours.unwrap_or(DEFAULT_INTERVAL_HOURS);
            if hours == 0 {
                return Err(ScheduleError::InvalidHours(hours));
            }
            Ok((
                ScheduleConfig::enabled(ScheduleSpec::interval(hours)),
                Some(Trigger::Interval { hours }),
            ))
        }
        ScheduleKind::Cron => {
            let day_of_week = spec
                .day_of_week
                .clone()
                .unwrap_or_else(|| DEFAULT_DAY_OF_WEEK.to_string());
            let hour = spec.hour.unwrap_or(0);
            let minute = spec.minute.unwrap_or(0);
            if hour > 23 {
                return Err(ScheduleError::InvalidHour(hour));
            }
            if minute > 59 {
                return Err(ScheduleError::InvalidMinute(minute));
            }
            let days = DaySet::parse(&day_of_week)?;
            Ok((
                ScheduleConfig::enabled(ScheduleSpec::cron(day_of_week, hour, minute)),
                Some(Trigger::Cron { days, hour, minute }),
            ))
        }
    }
}

/// The registered job and the trigger it was built from.
struct ActiveJob {
    trigger: Trigger,
    handle: JoinHandle<()>,
}

pub struct ScheduleService<R> {
    path: PathBuf,
    runner: Arc<R>,
    run_lock: Arc<Mutex<()>>,
    /// Also serializes schedule updates, from validation through the save.
    job: Mutex<Option<ActiveJob>>,
}

impl<R: RunPipeline> ScheduleService<R> {
    pub fn new(path: impl Into<PathBuf>, runner: Arc<R>) -> Self {
        Self {
            path: path.into(),
            runner,
            run_lock: Arc::new(Mutex::new(())),
            job: Mutex::new(None),
        }
    }

    /// Build the service and re-register the persisted job, if any.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>, runner: Arc<R>) -> Self {
        let service = Self::new(path.as_ref(), runner);
        let config = service.get_schedule().await;
        if config.enabled {
            match normalize(&config) {
                Ok((active, trigger)) => {
                    service.replace_job(&mut *service.job.lock().await, trigger);
                    info!(job = JOB_NAME, schedule = ?active.schedule, "Restored schedule");
                }
                Err(e) => error!(error = %e, "Persisted schedule is invalid; not scheduling"),
            }
        } else {
            info!("No active schedule");
        }
        service
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted schedule, or the disabled default when there is none.
    pub async fn get_schedule(&self) -> ScheduleConfig {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No schedule file");
                return ScheduleConfig::disabled();
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Error loading schedule");
                return ScheduleConfig::disabled();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            error!(path = %self.path.display(), error = %e, "Error loading schedule");
            ScheduleConfig::disabled()
        })
    }

    /// Replace the job with one built from `config` and persist it.
    ///
    /// Invalid input is rejected before the current job is touched. A failed
    /// save is logged but does not fail the call. Concurrent updates are
    /// applied one at a time, so the running job always matches the file.
    ///
    /// # Arguments
    ///
    /// * `config` - The requested schedule. Missing trigger fields get their
    ///   defaults; `enabled: false` drops every trigger field.
    ///
    /// # Returns
    ///
    /// The schedule as persisted, or a [`ScheduleError`] naming the first
    /// invalid field.
    #[instrument(level = "info", skip_all, fields(enabled = config.enabled))]
    pub async fn set_schedule(&self, config: ScheduleConfig) -> Result<ScheduleConfig, ScheduleError> {
        let mut job = self.job.lock().await;
        let (active, trigger) = normalize(&config)?;
        self.replace_job(&mut job, trigger);
        self.persist(&active).await;
        Ok(active)
    }

    /// Run the pipeline now, after any run already in flight.
    pub async fn run_now(&self) -> Result<PathBuf, PipelineError> {
        let _guard = self.run_lock.lock().await;
        info!(job = JOB_NAME, "Manual run starting");
        self.runner.run_once().await
    }

    fn replace_job(&self, job: &mut Option<ActiveJob>, trigger: Option<Trigger>) {
        if let Some(old) = job.take() {
            old.handle.abort();
            info!(job = JOB_NAME, "Removed existing job");
        }
        if let Some(trigger) = trigger {
            info!(job = JOB_NAME, ?trigger, "Registering job");
            let handle = tokio::spawn(job_loop(
                trigger.clone(),
                Arc::clone(&self.runner),
                Arc::clone(&self.run_lock),
            ));
            *job = Some(ActiveJob { trigger, handle });
        }
    }

    async fn persist(&self, config: &ScheduleConfig) {
        let json = match serde_json::to_string_pretty(config) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Error serializing schedule");
                return;
            }
        };
        // Write beside the target and rename, so readers never see a partial file.
        let staging = staging_path(&self.path);
        let saved = match fs::write(&staging, json).await {
            Ok(()) => fs::rename(&staging, &self.path).await,
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => debug!(path = %self.path.display(), "Saved schedule"),
            Err(e) => error!(path = %self.path.display(), error = %e, "Error saving schedule"),
        }
    }

    #[cfg(test)]
    async fn has_job(&self) -> bool {
        self.job.lock().await.is_some()
    }

    #[cfg(test)]
    async fn active_trigger(&self) -> Option<Trigger> {
        self.job.lock().await.as_ref().map(|job| job.trigger.clone())
    }
}

impl<R> Drop for ScheduleService<R> {
    fn drop(&mut self) {
        if let Some(job) = self.job.get_mut().take() {
            job.handle.abort();
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}

async fn job_loop<R: RunPipeline>(trigger: Trigger, runner: Arc<R>, run_lock: Arc<Mutex<()>>) {
    loop {
        let Some(delay) = trigger.delay_until_next(Local::now()) else {
            error!(job = JOB_NAME, ?trigger, "Could not compute next fire time; stopping job");
            return;
        };
        debug!(job = JOB_NAME, secs = delay.as_secs(), "Next run scheduled");
        tokio::time::sleep(delay).await;
        start_tick(&runner, &run_lock);
    }
}

/// Start one scheduled run in the background unless a run is in flight.
///
/// The run is detached from the job loop so that replacing the schedule
/// does not cancel it.
fn start_tick<R: RunPipeline>(runner: &Arc<R>, run_lock: &Arc<Mutex<()>>) -> Option<JoinHandle<()>> {
    let Ok(guard) = Arc::clone(run_lock).try_lock_owned() else {
        warn!(job = JOB_NAME, "Previous run still in progress; skipping this tick");
        return None;
    };
    let runner = Arc::clone(runner);
    Some(tokio::spawn(async move {
        let _guard = guard;
        info!(job = JOB_NAME, "Scheduled run starting");
        let _ = runner.run_once().await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingRunner {
        runs: AtomicUsize,
    }

    impl RunPipeline for CountingRunner {
        async fn run_once(&self) -> Result<PathBuf, PipelineError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from("output/posts/2024-06-01-x.md"))
        }
    }

    fn service(dir: &tempfile::TempDir) -> ScheduleService<CountingRunner> {
        ScheduleService::new(dir.path().join("schedule.json"), Arc::default())
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_interval_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service(&tmp);
        let config = ScheduleConfig::enabled(ScheduleSpec::interval(6));

        assert_eq!(service.set_schedule(config.clone()).await.unwrap(), config);
        assert_eq!(service.get_schedule().await, config);
        assert!(service.has_job().await);

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(service.path()).unwrap()).unwrap();
        assert_eq!(
            on_disk,
            serde_json::json!({"enabled": true, "schedule": {"type": "interval", "hours": 6}})
        );
    }

    #[tokio::test]
    async fn test_disable_clears_schedule_detail() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service(&tmp);
        service
            .set_schedule(ScheduleConfig::enabled(ScheduleSpec::interval(6)))
            .await
            .unwrap();

        let mut off = ScheduleConfig::enabled(ScheduleSpec::interval(6));
        off.enabled = false;
        service.set_schedule(off).await.unwrap();

        assert_eq!(service.get_schedule().await, ScheduleConfig::disabled());
        assert!(!service.has_job().await);
        assert_eq!(
            serde_json::to_value(service.get_schedule().await).unwrap(),
            serde_json::json!({"enabled": false, "schedule": {}})
        );
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_file_reads_as_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service(&tmp);
        assert_eq!(service.get_schedule().await, ScheduleConfig::disabled());

        std::fs::write(service.path(), "{not json").unwrap();
        assert_eq!(service.get_schedule().await, ScheduleConfig::disabled());
    }

    #[tokio::test]
    async fn test_defaults_are_filled_in() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service(&tmp);

        let active = service
            .set_schedule(ScheduleConfig::enabled(ScheduleSpec::default()))
            .await
            .unwrap();
        assert_eq!(active.schedule, ScheduleSpec::interval(24));

        let cron_only = ScheduleSpec {
            kind: Some(ScheduleKind::Cron),
            ..ScheduleSpec::default()
        };
        let active = service
            .set_schedule(ScheduleConfig::enabled(cron_only))
            .await
            .unwrap();
        assert_eq!(active.schedule, ScheduleSpec::cron("*", 0, 0));
    }

    #[tokio::test]
    async fn test_invalid_schedule_keeps_previous_job() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service(&tmp);
        let good = ScheduleConfig::enabled(ScheduleSpec::interval(6));
        service.set_schedule(good.clone()).await.unwrap();

        let cases = [
            (ScheduleSpec::interval(0), ScheduleError::InvalidHours(0)),
            (ScheduleSpec::cron("mon", 24, 0), ScheduleError::InvalidHour(24)),
            (ScheduleSpec::cron("mon", 9, 60), ScheduleError::InvalidMinute(60)),
            (
                ScheduleSpec::cron("funday", 9, 0),
                ScheduleError::InvalidDayOfWeek("funday".into()),
            ),
        ];
        for (spec, expected) in cases {
            let err = service
                .set_schedule(ScheduleConfig::enabled(spec))
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), expected.to_string());
        }

        assert_eq!(service.get_schedule().await, good);
        assert!(service.has_job().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_keep_job_and_file_in_step() {
        let tmp = tempfile::tempdir().unwrap();
        let service = Arc::new(service(&tmp));

        for _ in 0..100 {
            let first = tokio::spawn({
                let service = Arc::clone(&service);
                async move {
                    service
                        .set_schedule(ScheduleConfig::enabled(ScheduleSpec::interval(6)))
                        .await
                }
            });
            let second = tokio::spawn({
                let service = Arc::clone(&service);
                async move {
                    service
                        .set_schedule(ScheduleConfig::enabled(ScheduleSpec::interval(12)))
                        .await
                }
            });
            first.await.unwrap().unwrap();
            second.await.unwrap().unwrap();

            let raw = std::fs::read_to_string(service.path()).unwrap();
            let on_disk: ScheduleConfig = serde_json::from_str(&raw).unwrap();
            let (_, expected) = normalize(&on_disk).unwrap();
            assert!(on_disk.enabled);
            assert_eq!(service.active_trigger().await, expected);
        }
        assert!(!staging_path(service.path()).exists());
    }

    #[tokio::test]
    async fn test_load_restores_enabled_schedule() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("schedule.json");
        std::fs::write(
            &path,
            r#"{"enabled": true, "schedule": {"type": "cron", "day_of_week": "mon-fri", "hour": 9, "minute": 30}}"#,
        )
        .unwrap();

        let service = ScheduleService::load(&path, Arc::new(CountingRunner::default())).await;
        assert!(service.has_job().await);
        assert_eq!(
            service.get_schedule().await,
            ScheduleConfig::enabled(ScheduleSpec::cron("mon-fri", 9, 30))
        );
    }

    #[tokio::test]
    async fn test_load_without_schedule_registers_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let service =
            ScheduleService::load(tmp.path().join("schedule.json"), Arc::new(CountingRunner::default()))
                .await;
        assert!(!service.has_job().await);
        assert!(!service.path().exists());
    }

    #[tokio::test]
    async fn test_run_now_invokes_runner_once() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = Arc::new(CountingRunner::default());
        let service = ScheduleService::new(tmp.path().join("schedule.json"), Arc::clone(&runner));

        let path = service.run_now().await.unwrap();
        assert_eq!(path, PathBuf::from("output/posts/2024-06-01-x.md"));
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
        // Independent of the persisted schedule.
        assert_eq!(service.get_schedule().await, ScheduleConfig::disabled());
    }

    #[tokio::test]
    async fn test_tick_is_skipped_while_a_run_is_in_flight() {
        let runner = Arc::new(CountingRunner::default());
        let run_lock = Arc::new(Mutex::new(()));

        let held = run_lock.lock().await;
        assert!(start_tick(&runner, &run_lock).is_none());
        drop(held);

        start_tick(&runner, &run_lock).unwrap().await.unwrap();
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_day_set_parsing() {
        let all = DaySet::parse("*").unwrap();
        assert!(all.contains(Weekday::Mon) && all.contains(Weekday::Sun));

        let listed = DaySet::parse("MON, wed").unwrap();
        assert!(listed.contains(Weekday::Mon));
        assert!(listed.contains(Weekday::Wed));
        assert!(!listed.contains(Weekday::Tue));

        assert_eq!(DaySet::parse("0-4").unwrap(), DaySet::parse("mon-fri").unwrap());
        assert_eq!(DaySet::parse("6").unwrap(), DaySet::parse("sun").unwrap());

        let wrapped = DaySet::parse("fri-mon").unwrap();
        for day in [Weekday::Fri, Weekday::Sat, Weekday::Sun, Weekday::Mon] {
            assert!(wrapped.contains(day));
        }
        assert!(!wrapped.contains(Weekday::Wed));
    }

    #[test]
    fn test_day_set_rejects_garbage() {
        for expr in ["", "7", "funday", "mon-", "mon,,tue"] {
            assert!(DaySet::parse(expr).is_err(), "{expr:?} should be rejected");
        }
    }

    #[test]
    fn test_next_cron_fire() {
        // 2024-06-01 is a Saturday.
        let weekdays = DaySet::parse("mon-fri").unwrap();
        assert_eq!(
            next_cron_fire(at(2024, 6, 1, 10, 0), &weekdays, 9, 30),
            Some(at(2024, 6, 3, 9, 30))
        );

        let every_day = DaySet::parse("*").unwrap();
        assert_eq!(
            next_cron_fire(at(2024, 6, 1, 10, 0), &every_day, 12, 0),
            Some(at(2024, 6, 1, 12, 0))
        );
        assert_eq!(
            next_cron_fire(at(2024, 6, 1, 12, 0), &every_day, 12, 0),
            Some(at(2024, 6, 2, 12, 0))
        );

        let saturday = DaySet::parse("sat").unwrap();
        assert_eq!(
            next_cron_fire(at(2024, 6, 1, 10, 0), &saturday, 10, 0),
            Some(at(2024, 6, 8, 10, 0))
        );
    }

    #[test]
    fn test_interval_delay() {
        let trigger = Trigger::Interval { hours: 6 };
        assert_eq!(
            trigger.delay_until_next(Local::now()),
            Some(Duration::from_secs(6 * 3600))
        );
    }

    #[test]
    fn test_daily_cron_delay_is_within_a_day() {
        let trigger = Trigger::Cron {
            days: DaySet::parse("*").unwrap(),
            hour: 3,
            minute: 15,
        };
        let delay = trigger.delay_until_next(Local::now()).unwrap();
        assert!(delay <= Duration::from_secs(25 * 3600));
    }
}
