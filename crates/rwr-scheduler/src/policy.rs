//! Reset policy resolver — when does the next reset (and its warning) happen?
//! Pure calendar arithmetic on local wall-clock time, whole-second resolution.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use rwr_core::{ResetConfig, ResetType};

/// Result of resolving a policy against "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextReset {
    /// Always strictly after the `now` it was computed from.
    pub reset_at: NaiveDateTime,
    /// Present only when warnings are enabled and the warning instant is still ahead.
    pub warning_at: Option<NaiveDateTime>,
}

/// Compute the next reset instant and warning instant for `policy`.
pub fn compute_next_reset(now: NaiveDateTime, policy: &ResetConfig) -> NextReset {
    let time = NaiveTime::from_hms_opt(policy.restart_time.min(23), 0, 0).unwrap_or_default();
    let today_slot = now.date().and_time(time);

    // Next occurrence of the restart hour, today or tomorrow
    let candidate = if today_slot <= now {
        today_slot + Duration::days(1)
    } else {
        today_slot
    };

    let reset_at = match policy.reset_type {
        ResetType::Daily => candidate,
        ResetType::Weekly => {
            let target = i64::from(policy.reset_day.clamp(1, 7));
            let current = i64::from(now.weekday().number_from_monday());
            let mut days_until = (target - current).rem_euclid(7);
            if days_until == 0 && today_slot <= now {
                days_until = 7;
            }
            today_slot + Duration::days(days_until)
        }
        ResetType::Monthly => next_monthly(now, today_slot, policy.reset_day.clamp(1, 31), time)
            .unwrap_or(candidate),
    };

    let warning_at = if policy.reset_warning_time > 0 {
        let at = reset_at - Duration::minutes(i64::from(policy.reset_warning_time));
        (now < at).then_some(at)
    } else {
        None
    };

    NextReset {
        reset_at,
        warning_at,
    }
}

fn next_monthly(
    now: NaiveDateTime,
    today_slot: NaiveDateTime,
    reset_day: u32,
    time: NaiveTime,
) -> Option<NaiveDateTime> {
    let (mut year, mut month) = (now.year(), now.month());
    if now.day() > reset_day || (now.day() == reset_day && today_slot <= now) {
        (year, month) = following_month(year, month);
    }

    let at = month_slot(year, month, reset_day, time)?;
    if at > now {
        return Some(at);
    }
    // Clamping pulled the slot onto a day that has already passed (e.g. day 31 on Apr 30)
    let (year, month) = following_month(year, month);
    month_slot(year, month, reset_day, time)
}

fn month_slot(year: i32, month: u32, reset_day: u32, time: NaiveTime) -> Option<NaiveDateTime> {
    let day = reset_day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(time))
}

fn following_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 { (year + 1, 1) } else { (year, month + 1) }
}

/// Number of days in `month` of `year`, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}
