// dbbackup/src/schedule/logic.rs
use chrono::{DateTime, Days, Local, LocalResult, NaiveTime, TimeDelta, TimeZone};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::Schedule;

/// Next instant strictly after `now` whose wall-clock time in `now`'s zone is `at`.
///
/// If today's occurrence is at or before `now` the run moves to tomorrow. An
/// ambiguous local time (clocks going back) resolves to its earlier instant;
/// a skipped one (clocks going forward) is pushed past the gap.
pub fn next_daily_run<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let local_now = now.naive_local();
    let mut date = local_now.date();
    if date.and_time(at) <= local_now {
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    }
    let candidate = date.and_time(at);

    let tz = now.timezone();
    match tz.from_local_datetime(&candidate) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(candidate + TimeDelta::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&candidate)),
    }
}

// Returns false if cancelled before the delay elapsed.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}

/// Drives `run` according to `schedule` until `cancel` fires.
///
/// A failed run is reported and the loop carries on with the next cycle.
/// A run in progress is never interrupted; cancellation is observed between
/// runs. Returns how many runs were started.
pub async fn run_schedule<F, Fut>(schedule: Schedule, cancel: CancellationToken, mut run: F) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    println!("Scheduler started: {schedule}");
    tracing::info!(%schedule, "Scheduler started");

    let mut runs: u64 = 0;
    loop {
        if let Schedule::DailyAt(at) = schedule {
            let now = Local::now();
            let next = next_daily_run(&now, at);
            println!("Next backup at {}", next.format("%Y-%m-%d %H:%M:%S"));
            tracing::info!(next_run = %next.format("%Y-%m-%d %H:%M:%S %:z"), "Waiting for next backup");

            let wait = (next - now).to_std().unwrap_or_default();
            if !sleep_or_cancel(wait, &cancel).await {
                break;
            }
        }
        if cancel.is_cancelled() {
            break;
        }

        runs += 1;
        tracing::info!(run = runs, "Scheduled backup starting");
        match run().await {
            Ok(()) => tracing::info!(run = runs, "Scheduled backup finished"),
            Err(e) => {
                println!("Scheduled backup failed: {e:#}");
                tracing::error!(run = runs, error = %format!("{e:#}"), "Scheduled backup failed");
            }
        }

        if let Schedule::Every(interval) = schedule {
            if !sleep_or_cancel(interval, &cancel).await {
                break;
            }
        }
    }

    println!("Scheduler stopped after {runs} run(s).");
    tracing::info!(runs, "Scheduler stopped");
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_daily_time_already_passed_rolls_to_tomorrow() {
        assert_eq!(next_daily_run(&utc(5, 10, 0), at(9, 0)), utc(6, 9, 0));
    }

    #[test]
    fn test_daily_time_later_today() {
        assert_eq!(next_daily_run(&utc(5, 10, 0), at(11, 0)), utc(5, 11, 0));
    }

    #[test]
    fn test_daily_time_exactly_now_rolls_to_tomorrow() {
        assert_eq!(next_daily_run(&utc(5, 10, 0), at(10, 0)), utc(6, 10, 0));
    }

    #[test]
    fn test_daily_rolls_over_month_end() {
        assert_eq!(next_daily_run(&utc(31, 23, 30), at(0, 15)).to_string(), "2024-04-01 00:15:00 UTC");
    }

    #[tokio::test]
    async fn test_interval_loop_survives_failed_runs() {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let mut calls = 0u32;

        let runs = run_schedule(
            Schedule::Every(Duration::from_millis(5)),
            cancel.clone(),
            || {
                calls += 1;
                let n = calls;
                let stop = stop.clone();
                async move {
                    if n == 3 {
                        stop.cancel();
                    }
                    if n == 1 {
                        anyhow::bail!("mysqldump failed: exit status: 2");
                    }
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(runs, 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        for schedule in [
            Schedule::Every(Duration::from_secs(3600)),
            Schedule::DailyAt(at(3, 0)),
        ] {
            let runs = run_schedule(schedule, cancel.clone(), || async {
                Err(anyhow::anyhow!("no run expected"))
            })
            .await;
            assert_eq!(runs, 0);
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_daily_wait() {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.cancel();
        });

        // The next occurrence is at least a minute away, so only cancellation ends the wait.
        let in_two_minutes = (Local::now() + TimeDelta::minutes(2)).time();
        let runs = run_schedule(Schedule::DailyAt(in_two_minutes), cancel, || async { Ok(()) }).await;
        assert_eq!(runs, 0);
    }
}
