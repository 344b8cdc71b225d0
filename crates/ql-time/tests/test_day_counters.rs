//! Integration tests for the `DayCounter` contract and the actual/fixed
//! conventions.

use approx::assert_abs_diff_eq;
use ql_time::{Actual360, Actual365Fixed, Date, DayCounter};

fn date(y: u16, m: u8, d: u8) -> Date {
    Date::from_ymd(y, m, d).unwrap()
}

#[test]
fn test_actual_365_fixed() {
    let dc = Actual365Fixed;
    let cases = [
        (date(2003, 11, 1), date(2004, 5, 1), 182.0 / 365.0),
        (date(1999, 2, 1), date(1999, 7, 1), 150.0 / 365.0),
        (date(2000, 1, 1), date(2001, 1, 1), 366.0 / 365.0),
        (date(2001, 1, 1), date(2002, 1, 1), 1.0),
    ];
    for (d1, d2, expected) in cases {
        assert_abs_diff_eq!(dc.year_fraction(d1, d2), expected, epsilon = 1e-15);
    }
    assert_eq!(dc.name(), "Actual/365 (Fixed)");
}

#[test]
fn test_actual_360() {
    let dc = Actual360;
    let cases = [
        (date(2003, 11, 1), date(2004, 5, 1), 182.0 / 360.0),
        (date(2024, 2, 1), date(2024, 3, 1), 29.0 / 360.0),
        (date(2023, 2, 1), date(2023, 3, 1), 28.0 / 360.0),
    ];
    for (d1, d2, expected) in cases {
        assert_abs_diff_eq!(dc.year_fraction(d1, d2), expected, epsilon = 1e-15);
    }
    assert_eq!(dc.name(), "Actual/360");
}

#[test]
fn year_fraction_is_antisymmetric() {
    let d1 = date(2025, 1, 2);
    for days in [1, 30, 365, 1000] {
        let d2 = d1.add_days(days).unwrap();
        for dc in [&Actual360 as &dyn DayCounter, &Actual365Fixed] {
            assert_eq!(dc.day_count(d1, d2), days as i64);
            assert_abs_diff_eq!(dc.year_fraction(d1, d2), -dc.year_fraction(d2, d1));
        }
    }
    assert_eq!(Actual365Fixed.year_fraction(d1, d1), 0.0);
}
