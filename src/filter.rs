//! Read-side visibility, search, sorting and pagination over proposal
//! documents. The pending predicate here is the sequential gate the
//! listing layer enforces; the write side applies the same
//! predecessor check before accepting a decision.

use chrono::{DateTime, Utc};

use crate::proposal::{ApprovalStatus, EventProposal, EventStatus};
use crate::role::{Caller, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest events first. The default.
    #[default]
    StartDateDesc,
    StartDateAsc,
    /// Lexicographic by event name, case-insensitive.
    Name,
}

/// Search, scoping and pagination options shared by every list operation.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub search: Option<String>,
    pub semester: Option<String>,
    pub academic_year: Option<String>,
    pub sort: SortOrder,
    /// 1-based page number; only meaningful together with `limit`.
    pub page: Option<usize>,
    /// Page size. When absent the whole result set comes back as one page.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of results plus the same page grouped by semester label for
/// display, groups ordered by first appearance in the page.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub applications: Vec<EventProposal>,
    pub grouped_by_semester: Vec<(String, Vec<EventProposal>)>,
    pub pagination: Pagination,
}

/// A proposal is pending for `role` when that role's step awaits a
/// decision (or holds an unanswered query) and every earlier step in the
/// chain has approved.
pub fn pending_for(proposal: &EventProposal, role: Role) -> bool {
    let Ok(gated) = proposal.predecessors_approved(role) else {
        return false;
    };
    let Ok(step) = proposal.step(role) else {
        return false;
    };
    gated && matches!(step.status, ApprovalStatus::Pending | ApprovalStatus::Query)
}

/// A proposal counts as approved for `role` while it is still open and
/// the event has not already ended.
pub fn approved_for(proposal: &EventProposal, role: Role, now: DateTime<Utc>) -> bool {
    let Ok(step) = proposal.step(role) else {
        return false;
    };
    step.status == ApprovalStatus::Approved
        && proposal.status != EventStatus::Closed
        && proposal
            .details
            .end_date
            .as_ref()
            .is_some_and(|end| end.to_datetime_utc() >= now)
}

pub fn rejected_for(proposal: &EventProposal, role: Role) -> bool {
    proposal
        .step(role)
        .is_ok_and(|step| step.status == ApprovalStatus::Rejected)
}

/// General secretaries are split across the three event categories; a
/// caller with a stored category only sees proposals of that category.
/// Every other caller sees everything.
pub fn category_matches(proposal: &EventProposal, caller: &Caller) -> bool {
    if caller.role != Role::GeneralSecretary {
        return true;
    }
    match caller.category {
        Some(category) => proposal.details.category == Some(category),
        None => true,
    }
}

fn matches_search(proposal: &EventProposal, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    [
        &proposal.details.name,
        &proposal.details.club,
        &proposal.details.contact_name,
        &proposal.details.venue,
        &proposal.details.description,
    ]
    .into_iter()
    .any(|hay| hay.to_lowercase().contains(&needle))
}

fn group_by_semester(page: &[EventProposal]) -> Vec<(String, Vec<EventProposal>)> {
    let mut groups: Vec<(String, Vec<EventProposal>)> = Vec::new();
    for proposal in page {
        match groups.iter_mut().find(|(label, _)| *label == proposal.semester) {
            Some((_, bucket)) => bucket.push(proposal.clone()),
            None => groups.push((proposal.semester.clone(), vec![proposal.clone()])),
        }
    }
    groups
}

/// Apply search, scoping filters, sorting and pagination to a candidate
/// set that already passed the relevant visibility predicate.
pub fn apply(mut items: Vec<EventProposal>, filter: &ListFilter) -> ListPage {
    if let Some(semester) = &filter.semester {
        items.retain(|p| &p.semester == semester);
    }
    if let Some(year) = &filter.academic_year {
        items.retain(|p| &p.academic_year == year);
    }
    if let Some(needle) = filter.search.as_deref() {
        let needle = needle.trim();
        if !needle.is_empty() {
            items.retain(|p| matches_search(p, needle));
        }
    }

    // Vec::sort_by is stable, so equal keys keep their scan order.
    match filter.sort {
        SortOrder::StartDateDesc => {
            items.sort_by(|a, b| b.details.start_date.cmp(&a.details.start_date));
        }
        SortOrder::StartDateAsc => {
            items.sort_by(|a, b| a.details.start_date.cmp(&b.details.start_date));
        }
        SortOrder::Name => {
            items.sort_by_key(|p| p.details.name.to_lowercase());
        }
    }

    let total_count = items.len();
    let (page_items, pagination) = match filter.limit {
        Some(limit) if limit > 0 => {
            let total_pages = total_count.div_ceil(limit);
            let current_page = filter.page.unwrap_or(1).max(1);
            let offset = (current_page - 1).saturating_mul(limit);
            let page_items: Vec<EventProposal> =
                items.into_iter().skip(offset).take(limit).collect();
            (
                page_items,
                Pagination {
                    current_page,
                    total_pages,
                    total_count,
                    has_next: current_page < total_pages,
                    has_prev: current_page > 1 && total_pages > 0,
                },
            )
        }
        _ => (
            items,
            Pagination {
                current_page: 1,
                total_pages: 1,
                total_count,
                has_next: false,
                has_prev: false,
            },
        ),
    };

    let grouped_by_semester = group_by_semester(&page_items);

    ListPage {
        applications: page_items,
        grouped_by_semester,
        pagination,
    }
}

/// Distinct semester labels across the given proposals, newest first.
/// Backs the semester dropdowns on the list views.
pub fn semester_options(items: &[EventProposal]) -> Vec<String> {
    let mut seen: Vec<(String, Option<crate::event::TimeStamp<Utc>>)> = Vec::new();
    for proposal in items {
        let start = proposal.details.start_date.clone();
        match seen.iter_mut().find(|(label, _)| *label == proposal.semester) {
            Some((_, newest)) => {
                if start > *newest {
                    *newest = start;
                }
            }
            None => seen.push((proposal.semester.clone(), start)),
        }
    }
    seen.sort_by(|a, b| b.1.cmp(&a.1));
    seen.into_iter().map(|(label, _)| label).collect()
}
