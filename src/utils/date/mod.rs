// Date utility functions
// Julian day numbers and minute offsets used for fast day/slot comparison

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike};

pub const MINUTES_PER_HOUR: u32 = 60;
pub const MINUTES_PER_DAY: u32 = MINUTES_PER_HOUR * 24;
pub const HOURS_PER_DAY: u32 = 24;

/// Offset between chrono's day count from 0001-01-01 (CE day 1) and the
/// astronomical Julian day number at that date.
const JULIAN_DAY_CE_OFFSET: i32 = 1_721_425;

/// Returns the Julian day number for a calendar date.
///
/// The value only depends on the date, never on the timezone or DST state,
/// so two instants fall on the same displayed day exactly when their local
/// dates produce the same number.
pub fn julian_day(date: NaiveDate) -> i32 {
    date.num_days_from_ce() + JULIAN_DAY_CE_OFFSET
}

/// Inverse of [`julian_day`].
pub fn date_from_julian_day(julian_day: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(julian_day - JULIAN_DAY_CE_OFFSET)
}

/// Julian day of `instant` as seen in its own timezone.
pub fn julian_day_of<Tz: TimeZone>(instant: &DateTime<Tz>) -> i32 {
    julian_day(instant.date_naive())
}

/// Minutes elapsed since local midnight.
pub fn minutes_since_midnight<Tz: TimeZone>(instant: &DateTime<Tz>) -> u32 {
    let time = instant.time();
    time.hour() * MINUTES_PER_HOUR + time.minute()
}

/// Resolves a local wall-clock time in `zone`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times
/// inside a DST gap are pushed forward by the gap, the way a normalising
/// calendar treats 02:30 on a spring-forward day.
pub fn resolve_local<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Start of the given hour on the given Julian day in `zone`.
pub fn instant_at_hour<Tz: TimeZone>(zone: &Tz, julian_day: i32, hour: u32) -> Option<DateTime<Tz>> {
    let date = date_from_julian_day(julian_day)?;
    let naive = date.and_hms_opt(hour.min(HOURS_PER_DAY - 1), 0, 0)?;
    resolve_local(zone, naive)
}

/// Half-open `[start, end)` window covering the local day `date` in `zone`.
pub fn day_window<Tz: TimeZone>(zone: &Tz, date: NaiveDate) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let start = resolve_local(zone, date.and_hms_opt(0, 0, 0)?)?;
    let next = date.succ_opt()?;
    let end = resolve_local(zone, next.and_hms_opt(0, 0, 0)?)?;
    Some((start, end))
}

/// Adds one hour of wall-clock time, the way a calendar "hour++ and
/// normalize" does, rather than 3600 elapsed seconds.
pub fn add_wall_clock_hour<Tz: TimeZone>(instant: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let zone = instant.timezone();
    resolve_local(&zone, instant.naive_local() + Duration::hours(1))
}
