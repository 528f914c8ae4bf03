use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

pub const DEFAULT_DAY_COUNT: u32 = 7;

/// Walks `count` calendar days forward from `anchor`. Hidden weekend days are
/// skipped, not replaced, so the window may come back shorter than `count`.
pub fn visible_range(anchor: NaiveDate, count: u32, include_weekends: bool) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for offset in 0..count {
        let date = anchor + Duration::days(offset.into());
        if !include_weekends && is_weekend(date) {
            continue;
        }
        dates.push(date);
    }
    dates
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn shift_by_days(anchor: NaiveDate, delta: i64) -> NaiveDate {
    anchor + Duration::days(delta)
}

/// Monday on or before `reference`. A Sunday maps six days back.
pub fn start_of_week(reference: NaiveDate) -> NaiveDate {
    let days_from_monday = reference.weekday().number_from_monday() as i64 - 1;
    reference - Duration::days(days_from_monday)
}

pub fn previous_week(anchor: NaiveDate) -> NaiveDate {
    shift_by_days(anchor, -7)
}

pub fn next_week(anchor: NaiveDate) -> NaiveDate {
    shift_by_days(anchor, 7)
}

pub fn previous_period(anchor: NaiveDate, count: u32) -> NaiveDate {
    shift_by_days(anchor, -period_days(count))
}

pub fn next_period(anchor: NaiveDate, count: u32) -> NaiveDate {
    shift_by_days(anchor, period_days(count))
}

pub fn today_anchor() -> NaiveDate {
    start_of_week(Local::now().date_naive())
}

fn period_days(count: u32) -> i64 {
    if count == 0 {
        DEFAULT_DAY_COUNT.into()
    } else {
        count.into()
    }
}

/// "Jan 1, 2024 - Jan 5, 2024" over the first and last visible date.
pub fn range_label(range: &[NaiveDate]) -> String {
    let (Some(first), Some(last)) = (range.first(), range.last()) else {
        return String::new();
    };
    format!("{} - {}", long_label(*first), long_label(*last))
}

fn long_label(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Column header form, e.g. "Mon Jan 1".
pub fn day_label(date: NaiveDate) -> String {
    date.format("%a %b %-d").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};

    use super::{
        next_period, next_week, previous_period, previous_week, range_label, shift_by_days,
        start_of_week, visible_range,
    };

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("test date should be valid")
    }

    #[test]
    fn full_window_has_exact_length_and_consecutive_days() {
        let anchor = day(2024, 2, 26);
        let range = visible_range(anchor, 14, true);
        assert_eq!(range.len(), 14);
        for (offset, date) in range.iter().enumerate() {
            assert_eq!(*date, shift_by_days(anchor, offset as i64));
        }
    }

    #[test]
    fn hidden_weekends_are_skipped_without_backfill() {
        // 2024-01-01 is a Monday, so one weekend falls inside the window.
        let range = visible_range(day(2024, 1, 1), 7, false);
        assert_eq!(
            range,
            vec![
                day(2024, 1, 1),
                day(2024, 1, 2),
                day(2024, 1, 3),
                day(2024, 1, 4),
                day(2024, 1, 5),
            ]
        );
    }

    #[test]
    fn zero_count_yields_empty_range() {
        assert!(visible_range(day(2024, 1, 1), 0, true).is_empty());
    }

    #[test]
    fn start_of_week_is_monday_and_idempotent() {
        for offset in 0..14 {
            let reference = shift_by_days(day(2024, 3, 1), offset);
            let monday = start_of_week(reference);
            assert_eq!(monday.weekday(), Weekday::Mon);
            assert!(monday <= reference);
            assert_eq!(start_of_week(monday), monday);
        }
    }

    #[test]
    fn start_of_week_maps_sunday_six_days_back() {
        // 2024-01-07 is a Sunday.
        assert_eq!(start_of_week(day(2024, 1, 7)), day(2024, 1, 1));
    }

    #[test]
    fn shift_by_days_round_trips() {
        let anchor = day(2024, 12, 28);
        for delta in [-400, -31, -1, 0, 1, 7, 365] {
            assert_eq!(shift_by_days(shift_by_days(anchor, delta), -delta), anchor);
        }
    }

    #[test]
    fn shift_by_days_rolls_over_month_and_year() {
        assert_eq!(shift_by_days(day(2023, 12, 31), 1), day(2024, 1, 1));
        assert_eq!(shift_by_days(day(2024, 3, 1), -1), day(2024, 2, 29));
    }

    #[test]
    fn week_navigation_moves_seven_days_regardless_of_count() {
        let anchor = day(2024, 5, 15);
        assert_eq!(next_week(anchor), day(2024, 5, 22));
        assert_eq!(previous_week(anchor), day(2024, 5, 8));
    }

    #[test]
    fn period_navigation_uses_count_with_seven_day_fallback() {
        let anchor = day(2024, 5, 1);
        assert_eq!(next_period(anchor, 14), day(2024, 5, 15));
        assert_eq!(previous_period(anchor, 14), day(2024, 4, 17));
        assert_eq!(next_period(anchor, 0), day(2024, 5, 8));
        assert_eq!(previous_period(anchor, 0), day(2024, 4, 24));
    }

    #[test]
    fn range_label_formats_first_and_last_date() {
        let range = visible_range(day(2024, 1, 1), 7, false);
        assert_eq!(range_label(&range), "Jan 1, 2024 - Jan 5, 2024");
    }

    #[test]
    fn range_label_is_empty_for_empty_range() {
        assert_eq!(range_label(&[]), "");
    }
}
