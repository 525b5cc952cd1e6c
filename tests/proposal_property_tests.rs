//! Property-based tests for proposal details validation, semester
//! classification and edit diffing
//!
//! This module uses the proptest crate to verify that draft validation
//! and the derived-field logic hold across a wide range of randomly
//! generated inputs, not just hand-picked cases.

use chrono::Datelike;
use proptest::prelude::*;

use event_approval::event::{EventCategory, EventDetails, EventUpdate, TimeStamp};
use event_approval::semester;

// PROPERTY TEST STRATEGIES

fn category_strategy() -> impl Strategy<Value = EventCategory> {
    prop_oneof![
        Just(EventCategory::Technical),
        Just(EventCategory::Cultural),
        Just(EventCategory::Sports),
    ]
}

/// Strategy to generate a start/end pair in order within one month
fn ordered_dates_strategy() -> impl Strategy<Value = (TimeStamp<chrono::Utc>, TimeStamp<chrono::Utc>)>
{
    (2020i32..=2030, 1u32..=12).prop_flat_map(|(year, month)| {
        (1u32..=13, 14u32..=28).prop_map(move |(day1, day2)| {
            (
                TimeStamp::new_with(year, month, day1, 9, 0, 0),
                TimeStamp::new_with(year, month, day2, 21, 0, 0),
            )
        })
    })
}

/// Strategy to generate a start/end pair in reversed order
fn reversed_dates_strategy() -> impl Strategy<Value = (TimeStamp<chrono::Utc>, TimeStamp<chrono::Utc>)>
{
    (2020i32..=2030, 1u32..=12).prop_flat_map(|(year, month)| {
        (14u32..=28, 1u32..=13).prop_map(move |(day1, day2)| {
            (
                TimeStamp::new_with(year, month, day1, 9, 0, 0),
                TimeStamp::new_with(year, month, day2, 21, 0, 0),
            )
        })
    })
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{2,30}"
}

fn details_strategy() -> impl Strategy<Value = EventDetails> {
    (
        name_strategy(),
        name_strategy(),
        category_strategy(),
        name_strategy(),
        ordered_dates_strategy(),
        1u64..=500_000,
        1u32..=5_000,
    )
        .prop_map(
            |(name, club, category, venue, (start, end), amount, participants)| {
                EventDetails::new()
                    .set_name(name)
                    .set_club(club)
                    .set_category(category)
                    .set_venue(venue)
                    .set_start_date(start)
                    .set_end_date(end)
                    .set_contact("Organizer", "organizer@campus.edu", "5555555555")
                    .add_budget_line("general", amount)
                    .set_expected_participants(participants)
            },
        )
}

// PROPERTY TESTS

proptest! {
    /// Property: any fully populated draft with ordered dates validates.
    #[test]
    fn prop_complete_details_validate(details in details_strategy()) {
        prop_assert!(details.validate().is_ok(), "{:?}", details.validate().err());
    }

    /// Property: reversed start/end dates always fail validation.
    #[test]
    fn prop_reversed_dates_always_fail(
        details in details_strategy(),
        (start, end) in reversed_dates_strategy(),
    ) {
        let draft = details.set_start_date(start).set_end_date(end);
        prop_assert!(draft.validate().is_err());
    }

    /// Property: a zero participant count always fails validation.
    #[test]
    fn prop_zero_participants_always_fail(details in details_strategy()) {
        let draft = details.set_expected_participants(0);
        prop_assert!(draft.validate().is_err());
    }
}

// SEMESTER CLASSIFIER PROPERTIES

proptest! {
    /// Property: classification is total and the season always matches
    /// the calendar half the date falls in.
    #[test]
    fn prop_semester_season_matches_month(
        year in 2000i32..=2100,
        month in 1u32..=12,
        day in 1u32..=28,
    ) {
        let date = TimeStamp::new_with(year, month, day, 12, 0, 0).to_datetime_utc();
        let term = semester::classify(date);

        if month >= 8 {
            prop_assert_eq!(&term.academic_year, &format!("{}-{}", year, year + 1));
            prop_assert!(term.semester.starts_with("Autumn"));
        } else {
            prop_assert_eq!(&term.academic_year, &format!("{}-{}", year - 1, year));
            prop_assert!(term.semester.starts_with("Spring"));
        }

        // the label always embeds the academic year bucket
        prop_assert!(term.semester.ends_with(&term.academic_year));
    }

    /// Property: classification only depends on the month and year, never
    /// on the day or time of day.
    #[test]
    fn prop_semester_ignores_day_of_month(
        year in 2000i32..=2100,
        month in 1u32..=12,
        day_a in 1u32..=28,
        day_b in 1u32..=28,
    ) {
        let a = semester::classify(TimeStamp::new_with(year, month, day_a, 0, 0, 0).to_datetime_utc());
        let b = semester::classify(TimeStamp::new_with(year, month, day_b, 23, 59, 59).to_datetime_utc());
        prop_assert_eq!(a, b);
    }
}

// EDIT DIFF PROPERTIES

proptest! {
    /// Property: applying a no-op update never records a diff.
    #[test]
    fn prop_identity_update_records_no_diff(details in details_strategy()) {
        let mut edited = details.clone();
        let update = EventUpdate {
            name: Some(details.name.clone()),
            club: Some(details.club.clone()),
            venue: Some(details.venue.clone()),
            start_date: details.start_date.clone(),
            end_date: details.end_date.clone(),
            budget: Some(details.budget.clone()),
            expected_participants: Some(details.expected_participants),
            ..EventUpdate::default()
        };

        let changes = update.apply(&mut edited);
        prop_assert!(changes.is_empty(), "unexpected diffs: {:?}", changes);
        prop_assert_eq!(edited, details);
    }

    /// Property: renaming records exactly one diff carrying the old and
    /// new values.
    #[test]
    fn prop_rename_records_one_diff(
        details in details_strategy(),
        new_name in name_strategy(),
    ) {
        prop_assume!(details.name != new_name);

        let mut edited = details.clone();
        let update = EventUpdate {
            name: Some(new_name.clone()),
            ..EventUpdate::default()
        };
        let changes = update.apply(&mut edited);

        prop_assert_eq!(changes.len(), 1);
        prop_assert_eq!(&changes[0].field, "name");
        prop_assert_eq!(&changes[0].old, &details.name);
        prop_assert_eq!(&changes[0].new, &new_name);
        prop_assert_eq!(&edited.name, &new_name);
    }

    /// Property: moving the start date within the same day applies the
    /// new time but records no diff; moving it across days records one.
    #[test]
    fn prop_start_date_diff_is_day_granular(
        year in 2020i32..=2030,
        month in 1u32..=12,
        day in 1u32..=27,
        hour in 0u32..=23,
    ) {
        let original = TimeStamp::new_with(year, month, day, 9, 0, 0);
        let same_day = TimeStamp::new_with(year, month, day, hour, 30, 0);
        let next_day = TimeStamp::new_with(year, month, day + 1, 9, 0, 0);
        prop_assert_eq!(original.to_datetime_utc().day(), day);

        let mut details = EventDetails::new().set_start_date(original.clone());
        let update = EventUpdate {
            start_date: Some(same_day.clone()),
            ..EventUpdate::default()
        };
        prop_assert!(update.apply(&mut details).is_empty());
        prop_assert_eq!(details.start_date.clone(), Some(same_day));

        let update = EventUpdate {
            start_date: Some(next_day),
            ..EventUpdate::default()
        };
        prop_assert_eq!(update.apply(&mut details).len(), 1);
    }
}
