use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use cron::Schedule;
use tracing::info;

/// Midnight UTC on the first of every month.
pub const MONTHLY_SCHEDULE: &str = "0 0 0 1 * *";
/// Midnight UTC on January 1st.
pub const ANNUAL_SCHEDULE: &str = "0 0 0 1 1 *";
/// Every minute, for `DISTRIBUTOR_DEBUG=1` runs.
pub const DEBUG_SCHEDULE: &str = "0 * * * * *";
/// Daily at 01:00 UTC, after the monthly window has settled.
pub const RETRY_SCHEDULE: &str = "0 0 1 * * *";

/// Sleeps until each upcoming fire time of `expression` and runs `job`.
/// The job's own duration shifts the next fire only past slots it overlaps.
pub async fn run_cron_loop<F, Fut>(name: &str, expression: &str, job: F) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let schedule = Schedule::from_str(expression)
        .with_context(|| format!("invalid cron expression for {name}: {expression}"))?;

    info!(job = name, expression, "cron job scheduled");

    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            bail!("cron expression for {name} has no upcoming fire times");
        };

        let wait = (next - Utc::now())
            .to_std()
            .unwrap_or(Duration::from_secs(0));
        tokio::time::sleep(wait).await;

        info!(job = name, "cron trigger fired");
        job().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn all_schedules_parse() {
        for expression in [MONTHLY_SCHEDULE, ANNUAL_SCHEDULE, DEBUG_SCHEDULE, RETRY_SCHEDULE] {
            assert!(Schedule::from_str(expression).is_ok(), "{expression}");
        }
    }

    #[test]
    fn monthly_fires_at_midnight_on_the_first() {
        let schedule = Schedule::from_str(MONTHLY_SCHEDULE).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();
        assert_eq!((next.month(), next.day()), (9, 1));
        assert_eq!((next.hour(), next.minute(), next.second()), (0, 0, 0));
    }

    #[test]
    fn annual_fires_on_january_first() {
        let schedule = Schedule::from_str(ANNUAL_SCHEDULE).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();
        assert_eq!((next.year(), next.month(), next.day()), (2027, 1, 1));
    }

    #[test]
    fn debug_fires_every_minute() {
        let schedule = Schedule::from_str(DEBUG_SCHEDULE).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 30).unwrap();
        let next = schedule.after(&after).next().unwrap();
        assert_eq!((next.minute(), next.second()), (1, 0));
    }
}
