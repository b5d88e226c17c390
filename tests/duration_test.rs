use annual_report::duration::{describe_duration, duration_between, DurationError};

fn span(start: &str, end: &str) -> String {
    duration_between(start, end)
        .unwrap_or_else(|e| panic!("{} .. {} should be valid: {}", start, end, e))
        .to_string()
}

#[test]
fn test_same_day_counts_as_one_day() {
    assert_eq!(span("2024-05-17", "2024-05-17"), "1 day");
    assert_eq!(span("2000-01-01", "2000-01-01"), "1 day");
}

#[test]
fn test_end_before_start_is_an_error() {
    assert_eq!(
        duration_between("2024-05-17", "2024-05-16"),
        Err(DurationError::EndBeforeStart)
    );
    assert_eq!(describe_duration("2024-05-17", "2024-05-16"), "");
}

#[test]
fn test_unparseable_dates() {
    assert!(matches!(
        duration_between("17/05/2024", "2024-06-01"),
        Err(DurationError::Unparseable(_))
    ));
    assert_eq!(describe_duration("2024-02-30", "2024-03-01"), "");
    assert_eq!(describe_duration("", "2024-03-01"), "", "blank start gives blank duration");
}

#[test]
fn test_month_end_borrowing() {
    assert_eq!(span("2023-01-31", "2023-03-01"), "1 month");
    assert_eq!(span("2023-01-31", "2023-02-01"), "1 day");
    assert_eq!(span("2023-01-15", "2023-02-10"), "26 days");
}

#[test]
fn test_leap_year_boundary() {
    assert_eq!(span("2020-02-29", "2021-03-01"), "1 year 1 day");
    assert_eq!(span("2020-02-29", "2020-03-01"), "1 day");
    assert_eq!(span("2019-02-28", "2020-02-29"), "1 year 1 day");
}

#[test]
fn test_leap_day_start_outside_february() {
    assert_eq!(span("2020-02-29", "2021-01-29"), "11 months");
    assert_eq!(span("2020-02-29", "2021-12-29"), "1 year 10 months");
    assert_eq!(span("2020-02-29", "2020-12-29"), "10 months");
    assert_eq!(span("2020-02-29", "2021-02-28"), "1 year");
}

#[test]
fn test_plural_forms_and_zero_components() {
    assert_eq!(span("2021-01-15", "2023-04-25"), "2 years 3 months 10 days");
    assert_eq!(span("2022-06-01", "2023-06-01"), "1 year");
    assert_eq!(span("2022-06-01", "2022-08-01"), "2 months");
}
