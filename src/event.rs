//! Event details: the descriptive half of a proposal document, its
//! builder-style constructor and the edit/diff machinery.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum EventCategory {
    #[n(0)]
    Technical,
    #[n(1)]
    Cultural,
    #[n(2)]
    Sports,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Technical => "technical",
            EventCategory::Cultural => "cultural",
            EventCategory::Sports => "sports",
        }
    }
}

impl std::str::FromStr for EventCategory {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical" => Ok(EventCategory::Technical),
            "cultural" => Ok(EventCategory::Cultural),
            "sports" => Ok(EventCategory::Sports),
            other => Err(WorkflowError::Validation(format!(
                "unknown event category: {other}"
            ))),
        }
    }
}

/// One line of the proposal budget. Order of lines is preserved.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct BudgetLine {
    #[n(0)]
    pub label: String,
    #[n(1)]
    pub amount: u64,
}

impl BudgetLine {
    pub fn new(label: impl Into<String>, amount: u64) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Day-granularity comparison, used when diffing date fields on edit.
    pub fn same_day(&self, other: &Self) -> bool {
        self.0.date_naive() == other.0.date_naive()
    }
    pub fn ymd_string(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Descriptive fields of an event proposal. Doubles as the draft builder:
/// chain the setters, then the service validates on submit.
#[derive(Debug, Clone, Default, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct EventDetails {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub club: String,
    #[n(2)]
    pub category: Option<EventCategory>,
    #[n(3)]
    pub venue: String,
    #[n(4)]
    pub start_date: Option<TimeStamp<Utc>>,
    #[n(5)]
    pub end_date: Option<TimeStamp<Utc>>,
    #[n(6)]
    pub contact_name: String,
    #[n(7)]
    pub contact_email: String,
    #[n(8)]
    pub contact_phone: String,
    #[n(9)]
    pub budget: Vec<BudgetLine>,
    #[n(10)]
    pub expected_participants: u32,
    #[n(11)]
    pub description: String,
    #[n(12)]
    pub requirements: Vec<String>,
}

impl EventDetails {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
    pub fn set_club(mut self, club: impl Into<String>) -> Self {
        self.club = club.into();
        self
    }
    pub fn set_category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = venue.into();
        self
    }
    pub fn set_start_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }
    pub fn set_end_date(mut self, date: TimeStamp<Utc>) -> Self {
        self.end_date = Some(date);
        self
    }
    pub fn set_contact(
        mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        self.contact_name = name.into();
        self.contact_email = email.into();
        self.contact_phone = phone.into();
        self
    }
    pub fn add_budget_line(mut self, label: impl Into<String>, amount: u64) -> Self {
        self.budget.push(BudgetLine::new(label, amount));
        self
    }
    pub fn set_expected_participants(mut self, count: u32) -> Self {
        self.expected_participants = count;
        self
    }
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
    /// Requirement tags form a set: duplicates are dropped, insertion
    /// order is kept.
    pub fn add_requirement(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.requirements.contains(&tag) {
            self.requirements.push(tag);
        }
        self
    }

    /// Checks that the proposal draft is complete enough to enter the
    /// approval chain.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Validation("event name is required".into()));
        }
        if self.club.trim().is_empty() {
            return Err(WorkflowError::Validation("club name is required".into()));
        }
        if self.category.is_none() {
            return Err(WorkflowError::Validation(
                "event category is required".into(),
            ));
        }
        if self.venue.trim().is_empty() {
            return Err(WorkflowError::Validation("venue is required".into()));
        }
        if self.contact_email.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "organizer contact email is required".into(),
            ));
        }
        let (start, end) = match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(WorkflowError::Validation(
                    "start and end dates are required".into(),
                ));
            }
        };
        if start > end {
            return Err(WorkflowError::Validation(
                "start date must not be after end date".into(),
            ));
        }
        if self.budget.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one budget line is required".into(),
            ));
        }
        if self.budget.iter().any(|line| line.label.trim().is_empty()) {
            return Err(WorkflowError::Validation(
                "budget lines need a label".into(),
            ));
        }
        if self.expected_participants == 0 {
            return Err(WorkflowError::Validation(
                "expected participant count must be positive".into(),
            ));
        }

        Ok(())
    }
}

/// One field diff inside an [`crate::proposal::EditRecord`]. The record's
/// `changes` vector keeps these in the order the fields were touched, so
/// the audit trail stays introspectable.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct FieldChange {
    #[n(0)]
    pub field: String,
    #[n(1)]
    pub old: String,
    #[n(2)]
    pub new: String,
}

/// Partial update applied by the owner during an edit. `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub club: Option<String>,
    pub category: Option<EventCategory>,
    pub venue: Option<String>,
    pub start_date: Option<TimeStamp<Utc>>,
    pub end_date: Option<TimeStamp<Utc>>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub budget: Option<Vec<BudgetLine>>,
    pub expected_participants: Option<u32>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
}

fn render_budget(lines: &[BudgetLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{}: {}", line.label, line.amount))
        .collect::<Vec<_>>()
        .join("; ")
}

impl EventUpdate {
    /// Apply the update to `details`, returning one [`FieldChange`] per
    /// field whose value actually changed. Date fields are diffed at day
    /// granularity; everything else by equality.
    pub fn apply(&self, details: &mut EventDetails) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        let mut diff_string = |field: &str, slot: &mut String, new: &Option<String>| {
            if let Some(new) = new {
                if slot != new {
                    changes.push(FieldChange {
                        field: field.to_string(),
                        old: slot.clone(),
                        new: new.clone(),
                    });
                    *slot = new.clone();
                }
            }
        };

        diff_string("name", &mut details.name, &self.name);
        diff_string("club", &mut details.club, &self.club);
        diff_string("venue", &mut details.venue, &self.venue);
        diff_string("contact_name", &mut details.contact_name, &self.contact_name);
        diff_string(
            "contact_email",
            &mut details.contact_email,
            &self.contact_email,
        );
        diff_string(
            "contact_phone",
            &mut details.contact_phone,
            &self.contact_phone,
        );
        diff_string("description", &mut details.description, &self.description);

        if let Some(category) = self.category {
            if details.category != Some(category) {
                changes.push(FieldChange {
                    field: "category".into(),
                    old: details.category.map(|c| c.as_str().to_string()).unwrap_or_default(),
                    new: category.as_str().to_string(),
                });
                details.category = Some(category);
            }
        }

        if let Some(new_start) = &self.start_date {
            let changed = !details
                .start_date
                .as_ref()
                .is_some_and(|old| old.same_day(new_start));
            if changed {
                changes.push(FieldChange {
                    field: "start_date".into(),
                    old: details
                        .start_date
                        .as_ref()
                        .map(|t| t.ymd_string())
                        .unwrap_or_default(),
                    new: new_start.ymd_string(),
                });
            }
            details.start_date = Some(new_start.clone());
        }

        if let Some(new_end) = &self.end_date {
            let changed = !details
                .end_date
                .as_ref()
                .is_some_and(|old| old.same_day(new_end));
            if changed {
                changes.push(FieldChange {
                    field: "end_date".into(),
                    old: details
                        .end_date
                        .as_ref()
                        .map(|t| t.ymd_string())
                        .unwrap_or_default(),
                    new: new_end.ymd_string(),
                });
            }
            details.end_date = Some(new_end.clone());
        }

        if let Some(budget) = &self.budget {
            if &details.budget != budget {
                changes.push(FieldChange {
                    field: "budget".into(),
                    old: render_budget(&details.budget),
                    new: render_budget(budget),
                });
                details.budget = budget.clone();
            }
        }

        if let Some(count) = self.expected_participants {
            if details.expected_participants != count {
                changes.push(FieldChange {
                    field: "expected_participants".into(),
                    old: details.expected_participants.to_string(),
                    new: count.to_string(),
                });
                details.expected_participants = count;
            }
        }

        if let Some(requirements) = &self.requirements {
            if &details.requirements != requirements {
                changes.push(FieldChange {
                    field: "requirements".into(),
                    old: details.requirements.join(", "),
                    new: requirements.join(", "),
                });
                details.requirements = requirements.clone();
            }
        }

        changes
    }
}
