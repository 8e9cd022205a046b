//! Daily trigger scheduler.
//!
//! One armed trigger per live schedule record. Each trigger is a tokio task
//! that sleeps until the next occurrence of its `HH:MM` in the configured
//! timezone, then reports the schedule id over an unbounded channel. The
//! runtime consumes those events and decides what a firing means; this
//! module only keeps wall clocks.
//!
//! The armed set is rebuilt from scratch after every store mutation, so it
//! is always consistent with the store as of the last mutation.

use chrono::{DateTime, LocalResult, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use bossbot_types::ScheduleRecord;

struct Trigger {
    schedule_id: String,
    handle: JoinHandle<()>,
}

/// Owns the process-wide set of armed triggers.
pub struct Scheduler {
    tz: Tz,
    fire_tx: mpsc::UnboundedSender<String>,
    triggers: Mutex<Vec<Trigger>>,
}

impl Scheduler {
    /// Fired schedule ids are sent over `fire_tx`.
    pub fn new(tz: Tz, fire_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tz,
            fire_tx,
            triggers: Mutex::new(Vec::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Disarm everything, then arm one trigger per record. Records whose
    /// time does not parse as a valid clock time are skipped silently.
    pub async fn rebuild(&self, records: &[ScheduleRecord]) {
        let mut triggers = self.triggers.lock().await;
        for trigger in triggers.drain(..) {
            trigger.handle.abort();
        }
        for record in records {
            let Ok(time) = NaiveTime::parse_from_str(&record.time, "%H:%M") else {
                debug!(schedule_id = %record.id, time = %record.time, "Unarmable time, skipping");
                continue;
            };
            let schedule_id = record.id.clone();
            let tz = self.tz;
            let fire_tx = self.fire_tx.clone();
            let task_id = schedule_id.clone();
            let handle = tokio::spawn(async move {
                loop {
                    let now = Utc::now();
                    let next = next_occurrence(tz, time, now);
                    let wait = (next - now).to_std().unwrap_or_default();
                    tokio::time::sleep(wait).await;
                    if fire_tx.send(task_id.clone()).is_err() {
                        break;
                    }
                }
            });
            debug!(schedule_id = %schedule_id, time = %record.time, "Trigger armed");
            triggers.push(Trigger {
                schedule_id,
                handle,
            });
        }
        info!("Armed {} trigger(s)", triggers.len());
    }

    /// Disarm the trigger for one schedule, if armed.
    pub async fn disarm(&self, schedule_id: &str) {
        let mut triggers = self.triggers.lock().await;
        triggers.retain(|t| {
            if t.schedule_id == schedule_id {
                t.handle.abort();
                false
            } else {
                true
            }
        });
    }

    /// Disarm every trigger.
    pub async fn disarm_all(&self) {
        let mut triggers = self.triggers.lock().await;
        for trigger in triggers.drain(..) {
            trigger.handle.abort();
        }
    }

    pub async fn armed_count(&self) -> usize {
        self.triggers.lock().await.len()
    }

    pub async fn is_armed(&self, schedule_id: &str) -> bool {
        self.triggers
            .lock()
            .await
            .iter()
            .any(|t| t.schedule_id == schedule_id)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Ok(triggers) = self.triggers.try_lock() {
            for trigger in triggers.iter() {
                trigger.handle.abort();
            }
        }
    }
}

/// Next instant at which the given local clock time occurs, strictly after
/// `now`. A nonexistent local time (DST spring-forward gap) rolls to the
/// next day; an ambiguous one (fall-back) takes the earlier instant.
pub fn next_occurrence(tz: Tz, time: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    let mut date = local_now.date_naive();
    if local_now.time() >= time {
        match date.succ_opt() {
            Some(d) => date = d,
            None => return now + chrono::Duration::days(1),
        }
    }
    loop {
        match tz.from_local_datetime(&date.and_time(time)) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earlier, _) => return earlier.with_timezone(&Utc),
            LocalResult::None => match date.succ_opt() {
                Some(d) => date = d,
                None => return now + chrono::Duration::days(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, time: &str) -> ScheduleRecord {
        ScheduleRecord {
            id: id.into(),
            time: time.into(),
            channel_id: "111".into(),
            role_id: "222".into(),
            boss: None,
            message: "msg".into(),
            image: None,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
            .and_utc()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_occurrence_later_today() {
        // São Paulo is UTC-3 year-round since 2019. 12:00 UTC = 09:00 local;
        // 18:30 local is still ahead, so it fires the same day at 21:30 UTC.
        let tz = chrono_tz::America::Sao_Paulo;
        let now = utc(2024, 6, 10, 12, 0);
        let next = next_occurrence(tz, hm(18, 30), now);
        assert_eq!(next, utc(2024, 6, 10, 21, 30));
    }

    #[test]
    fn test_next_occurrence_rolls_to_tomorrow() {
        let tz = chrono_tz::America::Sao_Paulo;
        // 23:00 UTC = 20:00 local, past 18:30; next occurrence is tomorrow.
        let now = utc(2024, 6, 10, 23, 0);
        let next = next_occurrence(tz, hm(18, 30), now);
        assert_eq!(next, utc(2024, 6, 11, 21, 30));
    }

    #[test]
    fn test_next_occurrence_exact_minute_goes_to_next_day() {
        let tz = chrono_tz::America::Sao_Paulo;
        // Exactly 18:30:00 local: strictly-after semantics push a day out,
        // so a trigger that just fired cannot fire again before tomorrow.
        let now = utc(2024, 6, 10, 21, 30);
        let next = next_occurrence(tz, hm(18, 30), now);
        assert_eq!(next, utc(2024, 6, 11, 21, 30));
    }

    #[test]
    fn test_next_occurrence_dst_gap_skips_day() {
        // New York, 2024-03-10: 02:30 local does not exist (clocks jump
        // 02:00 -> 03:00). The occurrence rolls to March 11.
        let tz = chrono_tz::America::New_York;
        let now = utc(2024, 3, 10, 1, 0); // 20:00 EST March 9
        let next = next_occurrence(tz, hm(2, 30), now);
        let local = next.with_timezone(&tz);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(local.time(), hm(2, 30));
    }

    #[test]
    fn test_next_occurrence_dst_ambiguous_takes_earlier() {
        // New York, 2024-11-03: 01:30 local happens twice; earlier (EDT,
        // UTC-4) instant wins.
        let tz = chrono_tz::America::New_York;
        let now = utc(2024, 11, 3, 1, 0);
        let next = next_occurrence(tz, hm(1, 30), now);
        assert_eq!(next, utc(2024, 11, 3, 5, 30)); // 01:30 EDT
    }

    #[tokio::test]
    async fn test_rebuild_arms_one_trigger_per_record() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(chrono_tz::America::Sao_Paulo, tx);
        scheduler
            .rebuild(&[record("1", "18:30"), record("2", "07:00")])
            .await;
        assert_eq!(scheduler.armed_count().await, 2);
        assert!(scheduler.is_armed("1").await);
        assert!(scheduler.is_armed("2").await);
    }

    #[tokio::test]
    async fn test_rebuild_skips_unparsable_times() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(chrono_tz::America::Sao_Paulo, tx);
        scheduler
            .rebuild(&[record("1", "25:99"), record("2", "abc"), record("3", "07:00")])
            .await;
        assert_eq!(scheduler.armed_count().await, 1);
        assert!(scheduler.is_armed("3").await);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_set() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(chrono_tz::America::Sao_Paulo, tx);
        scheduler.rebuild(&[record("1", "18:30")]).await;
        scheduler.rebuild(&[record("2", "19:00")]).await;
        assert_eq!(scheduler.armed_count().await, 1);
        assert!(!scheduler.is_armed("1").await);
        assert!(scheduler.is_armed("2").await);
    }

    #[tokio::test]
    async fn test_disarm_single() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(chrono_tz::America::Sao_Paulo, tx);
        scheduler
            .rebuild(&[record("1", "18:30"), record("2", "19:00")])
            .await;
        scheduler.disarm("1").await;
        assert_eq!(scheduler.armed_count().await, 1);
        assert!(!scheduler.is_armed("1").await);
    }

    #[tokio::test]
    async fn test_disarm_all() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(chrono_tz::America::Sao_Paulo, tx);
        scheduler
            .rebuild(&[record("1", "18:30"), record("2", "19:00")])
            .await;
        scheduler.disarm_all().await;
        assert_eq!(scheduler.armed_count().await, 0);
    }
}
