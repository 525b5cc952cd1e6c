//! Academic term classification for event dates.

use chrono::{DateTime, Datelike, Utc};

/// A semester label together with its academic year bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub semester: String,
    pub academic_year: String,
}

/// Classify a date into its semester and academic year.
///
/// The academic year runs August through the following July. Dates in
/// August to December belong to the Autumn semester of the year starting
/// that August; dates in January to July belong to the Spring semester of
/// the year that started the previous August. The season prefix always
/// matches the half of the academic year the date falls in.
pub fn classify(date: DateTime<Utc>) -> Term {
    let year = date.year();
    let (season, span) = if date.month() >= 8 {
        ("Autumn", format!("{}-{}", year, year + 1))
    } else {
        ("Spring", format!("{}-{}", year - 1, year))
    };

    Term {
        semester: format!("{season} {span}"),
        academic_year: span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn autumn_dates_bucket_into_starting_year() {
        let term = classify(date(2024, 8, 15));
        assert_eq!(term.semester, "Autumn 2024-2025");
        assert_eq!(term.academic_year, "2024-2025");
    }

    #[test]
    fn spring_dates_bucket_into_previous_year() {
        let term = classify(date(2024, 3, 10));
        assert_eq!(term.semester, "Spring 2023-2024");
        assert_eq!(term.academic_year, "2023-2024");
    }

    #[test]
    fn july_august_boundary() {
        assert_eq!(classify(date(2025, 7, 31)).academic_year, "2024-2025");
        assert_eq!(classify(date(2025, 8, 1)).academic_year, "2025-2026");
    }

    #[test]
    fn december_january_boundary_stays_in_one_year() {
        let december = classify(date(2024, 12, 31));
        let january = classify(date(2025, 1, 1));

        assert_eq!(december.academic_year, "2024-2025");
        assert_eq!(january.academic_year, "2024-2025");
        assert_eq!(december.semester, "Autumn 2024-2025");
        assert_eq!(january.semester, "Spring 2024-2025");
    }
}
