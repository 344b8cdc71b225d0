//! Tenor arithmetic used to place pillars, and the evaluation-date context
//! that moving curves follow.

use std::cell::Cell;
use std::rc::Rc;

use ql_core::{register_with, Error, ObserverFn};
use ql_time::{Date, ScopedEvaluationDate, Settings, TimeUnit};

fn date(y: u16, m: u8, d: u8) -> Date {
    Date::from_ymd(y, m, d).unwrap()
}

#[test]
fn deposit_and_swap_tenors_from_spot() {
    let spot = date(2025, 1, 2);
    let tenors = [
        (1, TimeUnit::Weeks, date(2025, 1, 9)),
        (3, TimeUnit::Months, date(2025, 4, 2)),
        (6, TimeUnit::Months, date(2025, 7, 2)),
        (12, TimeUnit::Months, date(2026, 1, 2)),
        (2, TimeUnit::Years, date(2027, 1, 2)),
        (30, TimeUnit::Years, date(2055, 1, 2)),
    ];
    for (n, unit, expected) in tenors {
        assert_eq!(spot.advance(n, unit).unwrap(), expected, "{n}{unit}");
    }
}

#[test]
fn month_end_spot_rolls_to_shorter_months() {
    let spot = date(2024, 1, 31);
    let rolled: Vec<Date> = (1..=4)
        .map(|k| spot.advance(k, TimeUnit::Months).unwrap())
        .collect();
    assert_eq!(
        rolled,
        [date(2024, 2, 29), date(2024, 3, 31), date(2024, 4, 30), date(2024, 5, 31)]
    );
    // each roll starts from the spot, not from the previous roll
    assert_eq!(date(2024, 2, 29).advance(1, TimeUnit::Months).unwrap(), date(2024, 3, 29));
    assert_eq!(date(2024, 2, 29).advance(1, TimeUnit::Years).unwrap(), date(2025, 2, 28));
    assert_eq!(spot.advance(-2, TimeUnit::Months).unwrap(), date(2023, 11, 30));
}

#[test]
fn fixed_leg_schedule_has_strictly_increasing_dates() {
    let start = date(2025, 8, 31);
    let schedule: Vec<Date> = (0..=20)
        .map(|k| start.advance(6 * k, TimeUnit::Months).unwrap())
        .collect();
    assert!(schedule.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(schedule[1], date(2026, 2, 28));
    assert_eq!(schedule[20], date(2035, 8, 31));
}

#[test]
fn day_differences() {
    let d = date(2024, 12, 30);
    assert_eq!(d.add_days(3).unwrap(), date(2025, 1, 2));
    assert_eq!(date(2025, 1, 2) - d, 3);
    assert_eq!(d - date(2025, 1, 2), -3);
    assert_eq!(date(2025, 1, 1) - date(2024, 1, 1), 366);
    assert_eq!(date(2026, 1, 1) - date(2025, 1, 1), 365);
}

#[test]
fn dates_outside_the_calendar_are_rejected() {
    assert!(matches!(Date::from_ymd(2025, 2, 29), Err(Error::Date(_))));
    assert!(matches!(Date::from_ymd(2025, 0, 1), Err(Error::Date(_))));
    assert!(matches!(Date::from_ymd(1899, 12, 31), Err(Error::Date(_))));
    assert!(matches!(Date::MAX.add_days(1), Err(Error::Date(_))));
    assert!(matches!(Date::MIN.add_days(-1), Err(Error::Date(_))));
    assert!(matches!(
        date(2190, 1, 2).advance(10, TimeUnit::Years),
        Err(Error::Date(_))
    ));
}

#[test]
fn pillar_labels() {
    let d = date(2030, 1, 2);
    assert_eq!(d.to_string(), "2030-01-02");
    assert_eq!(format!("{d:?}"), "Date(2030-01-02)");
    assert_eq!(d.ymd(), (2030, 1, 2));
    assert_eq!(format!("{}{}", 5, TimeUnit::Years), "5Y");
}

#[test]
fn evaluation_date_notifies_on_change_only() {
    let settings = Settings::new(date(2025, 1, 2));
    let hits = Rc::new(Cell::new(0));
    let observer = {
        let hits = Rc::clone(&hits);
        ObserverFn::shared(move || {
            hits.set(hits.get() + 1);
            Ok(())
        })
    };
    register_with(&observer, &*settings);

    settings.set_evaluation_date(date(2025, 1, 2)).unwrap();
    assert_eq!(hits.get(), 0);
    settings.set_evaluation_date(date(2025, 1, 3)).unwrap();
    assert_eq!(hits.get(), 1);

    {
        let _guard = ScopedEvaluationDate::new(&settings);
        settings.set_evaluation_date(date(2030, 1, 2)).unwrap();
        assert_eq!(hits.get(), 2);
    }
    assert_eq!(settings.evaluation_date(), date(2025, 1, 3));
    assert_eq!(hits.get(), 3);
}
