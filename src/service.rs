//! Service layer API for event proposal workflow operations
use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};

use crate::error::WorkflowError;
use crate::event::{EventDetails, EventUpdate, TimeStamp};
use crate::filter::{self, ListFilter, ListPage};
use crate::notify::Notifier;
use crate::proposal::{
    ApprovalStatus, EditRecord, EventProposal, EventStatus, QueryRecord, QueryStatus,
};
use crate::role::{Caller, Role, RoleDirectory};
use crate::utils;

/// Reason string stamped on every owner edit audit record.
const EDIT_REASON: &str = "Proposal edited by club secretary";

/// An approver's decision on their step of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

pub struct EventService {
    db: Arc<sled::Db>,
    directory: RoleDirectory,
    notifier: Arc<dyn Notifier>,
}

impl EventService {
    pub fn new(db: Arc<sled::Db>, directory: RoleDirectory, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            directory,
            notifier,
        }
    }

    /// Load a proposal document from the database
    fn load(&self, event_id: &str) -> Result<EventProposal, WorkflowError> {
        EventProposal::load_from_db(&self.db, event_id)
    }

    /// Decode every proposal document. Listing works over a full prefix
    /// scan; the store holds one CBOR blob per proposal.
    fn scan_all(&self) -> Result<Vec<EventProposal>, WorkflowError> {
        let mut proposals = Vec::new();
        for entry in self.db.scan_prefix(utils::EVENT_HRP.as_bytes()) {
            let (_, raw) = entry?;
            proposals.push(minicbor::decode(raw.as_ref())?);
        }
        Ok(proposals)
    }

    /// Mail delivery is strictly best-effort: the triggering mutation has
    /// already committed, so a failed send is logged and dropped.
    fn notify(&self, to: &str, subject: &str, body: &str) {
        if to.is_empty() {
            warn!("dropping notification with empty recipient: {subject}");
            return;
        }
        if let Err(e) = self.notifier.send(to, subject, body) {
            warn!("notification to {to} failed: {e}");
        }
    }

    fn notify_role(&self, role: Role, subject: &str, body: &str) {
        match self.directory.mailbox(role) {
            Some(address) => self.notify(address, subject, body),
            None => warn!("no mailbox configured for {role}"),
        }
    }

    /// Submit a new event proposal into the approval chain
    pub fn submit_event(
        &self,
        details: EventDetails,
        caller: &Caller,
    ) -> Result<EventProposal, WorkflowError> {
        if caller.role != Role::ClubSecretary {
            return Err(WorkflowError::InvalidRole(format!(
                "only a club secretary may submit proposals, not {}",
                caller.role
            )));
        }

        // Validates the draft and seeds the chain with the owner's own
        // step approved.
        let proposal = EventProposal::new(caller.user_id.clone(), details)?;
        proposal.save_to_db(&self.db)?;

        debug!(
            "submitted proposal {} ({})",
            proposal.id, proposal.details.name
        );

        if let Some(next) = Role::ClubSecretary.next_in_chain() {
            self.notify_role(
                next,
                "New event proposal awaiting review",
                &format!(
                    "{} by {} is waiting for your review.",
                    proposal.details.name, proposal.details.club
                ),
            );
        }

        Ok(proposal)
    }

    pub fn get_event(&self, event_id: &str) -> Result<EventProposal, WorkflowError> {
        self.load(event_id)
    }

    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EventProposal>, WorkflowError> {
        let mut proposals = self.scan_all()?;
        proposals.retain(|p| p.owner_id == owner_id);
        proposals.sort_by(|a, b| b.details.start_date.cmp(&a.details.start_date));
        Ok(proposals)
    }

    /// Record an approver's decision on their step of the chain.
    ///
    /// The write side verifies the same sequential gate the pending lists
    /// use: a role can only decide once every predecessor has approved,
    /// and only while its own step is still pending. A rejection halts
    /// the chain permanently; there is no un-reject path.
    pub fn advance_approval(
        &self,
        event_id: &str,
        caller: &Caller,
        decision: Decision,
        comment: &str,
    ) -> Result<EventProposal, WorkflowError> {
        let role = caller.role;
        if role == Role::ClubSecretary {
            return Err(WorkflowError::InvalidRole(
                "the submitting role's step is fixed at approved".into(),
            ));
        }

        let mut proposal = self.load(event_id)?;

        if !proposal.predecessors_approved(role)? {
            return Err(WorkflowError::InvalidState(format!(
                "earlier approvals are still outstanding before {role}"
            )));
        }
        let step = proposal.step_mut(role)?;
        if step.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "step for {role} is not pending"
            )));
        }

        step.status = match decision {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        };
        step.comment = comment.to_string();

        proposal.save_to_db(&self.db)?;

        match decision {
            Decision::Approve => match role.next_in_chain() {
                Some(next) => self.notify_role(
                    next,
                    "Event proposal needs review",
                    &format!(
                        "{} has been approved by {} and now waits on you.",
                        proposal.details.name, role
                    ),
                ),
                None => self.notify(
                    &proposal.details.contact_email,
                    "Event proposal fully approved",
                    &format!(
                        "{} has cleared the full approval chain.",
                        proposal.details.name
                    ),
                ),
            },
            Decision::Reject => self.notify(
                &proposal.details.contact_email,
                "Event proposal rejected",
                &format!(
                    "{} was rejected by {}: {}",
                    proposal.details.name, role, comment
                ),
            ),
        }

        Ok(proposal)
    }

    /// Pause the caller's own pending decision by raising a query against
    /// the proposal. Only the owner's reply re-opens the step.
    pub fn raise_query(
        &self,
        event_id: &str,
        caller: &Caller,
        text: &str,
    ) -> Result<QueryRecord, WorkflowError> {
        let role = caller.role;
        if role == Role::ClubSecretary {
            return Err(WorkflowError::InvalidRole(
                "the proposal owner cannot raise a query against itself".into(),
            ));
        }

        let mut proposal = self.load(event_id)?;

        let contact = proposal.details.contact_email.clone();
        let step = proposal.step_mut(role)?;
        if step.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "step for {role} is not pending"
            )));
        }

        step.status = ApprovalStatus::Query;
        step.comment = format!("Query raised: {text}");

        let query = QueryRecord::new(role, text, contact.clone(), false)?;
        proposal.queries.push(query.clone());
        proposal.save_to_db(&self.db)?;

        self.notify(
            &contact,
            "Query raised on your event proposal",
            &format!("{role} asks: {text}"),
        );

        Ok(query)
    }

    /// Answer a pending pre-approval query as the proposal owner. The
    /// asker's step returns to pending so they can decide again.
    ///
    /// Post-approval queries have no reply path; they stay on the
    /// proposal as a notification log for oversight.
    pub fn reply_to_query(
        &self,
        event_id: &str,
        query_id: &str,
        caller: &Caller,
        response: &str,
    ) -> Result<QueryRecord, WorkflowError> {
        let mut proposal = self.load(event_id)?;

        if caller.role != Role::ClubSecretary {
            return Err(WorkflowError::InvalidRole(format!(
                "only the club secretary may answer queries, not {}",
                caller.role
            )));
        }
        if caller.user_id != proposal.owner_id {
            return Err(WorkflowError::InvalidRole(
                "only the proposal owner may answer its queries".into(),
            ));
        }

        let query = proposal
            .find_query_mut(query_id)
            .ok_or_else(|| WorkflowError::NotFound(query_id.to_string()))?;
        if query.status != QueryStatus::Pending {
            return Err(WorkflowError::InvalidState(
                "query has already been answered".into(),
            ));
        }
        if query.post_approval {
            return Err(WorkflowError::InvalidState(
                "post-approval queries cannot be answered".into(),
            ));
        }

        query.status = QueryStatus::Answered;
        query.response = Some(response.to_string());
        query.answered_at = Some(TimeStamp::now());
        let asker = query.asker_role;
        let answered = query.clone();

        // Re-open the asker's decision now that their question is
        // resolved.
        let step = proposal.step_mut(asker)?;
        step.status = ApprovalStatus::Pending;
        step.comment.clear();

        proposal.save_to_db(&self.db)?;

        self.notify_role(
            asker,
            "Query answered",
            &format!(
                "The club secretary answered your query on {}: {}",
                proposal.details.name, response
            ),
        );

        Ok(answered)
    }

    /// Raise an oversight query against a fully-approved proposal. No
    /// approval step changes; the record is informational.
    pub fn raise_post_approval_query(
        &self,
        event_id: &str,
        caller: &Caller,
        text: &str,
    ) -> Result<QueryRecord, WorkflowError> {
        if !caller.role.is_oversight() {
            return Err(WorkflowError::InvalidRole(format!(
                "{} may not raise post-approval queries",
                caller.role
            )));
        }

        let mut proposal = self.load(event_id)?;
        if !proposal.fully_approved() {
            return Err(WorkflowError::InvalidState(
                "event is not fully approved".into(),
            ));
        }

        let contact = proposal.details.contact_email.clone();
        let query = QueryRecord::new(caller.role, text, contact.clone(), true)?;
        proposal.queries.push(query.clone());
        proposal.save_to_db(&self.db)?;

        self.notify(
            &contact,
            "Post-approval query on your event",
            &format!("{} asks: {}", caller.role, text),
        );

        Ok(query)
    }

    /// Apply an owner edit: diff the provided fields, refresh the cached
    /// semester when the start date moved, append one audit record for
    /// the whole edit, and re-open unsettled steps.
    ///
    /// Already-approved steps keep their approval and queried steps stay
    /// queried; an edit only resets steps still awaiting a first
    /// decision or previously rejected.
    pub fn edit_event(
        &self,
        event_id: &str,
        caller: &Caller,
        update: &EventUpdate,
    ) -> Result<EventProposal, WorkflowError> {
        let mut proposal = self.load(event_id)?;

        if caller.role != Role::ClubSecretary {
            return Err(WorkflowError::InvalidRole(format!(
                "only the club secretary may edit proposals, not {}",
                caller.role
            )));
        }
        if caller.user_id != proposal.owner_id {
            return Err(WorkflowError::InvalidRole(
                "only the proposal owner may edit it".into(),
            ));
        }

        let old_start = proposal.details.start_date.clone();
        let changes = update.apply(&mut proposal.details);
        proposal.details.validate()?;

        let start_moved = match (&old_start, &proposal.details.start_date) {
            (Some(old), Some(new)) => !old.same_day(new),
            (a, b) => a != b,
        };
        if start_moved {
            proposal.reclassify();
        }

        if !changes.is_empty() {
            proposal.edit_history.push(EditRecord {
                edited_at: TimeStamp::now(),
                edited_by: caller.user_id.clone(),
                changes,
                reason: EDIT_REASON.to_string(),
            });
        }

        proposal.reopen_unsettled_steps();
        proposal.save_to_db(&self.db)?;

        Ok(proposal)
    }

    pub fn edit_history(&self, event_id: &str) -> Result<Vec<EditRecord>, WorkflowError> {
        Ok(self.load(event_id)?.edit_history)
    }

    /// Close a fully-approved event once the closing window has opened.
    /// Closing is terminal; there is no reopen operation.
    pub fn close_event(
        &self,
        event_id: &str,
        caller: &Caller,
        closer_display_name: Option<&str>,
    ) -> Result<EventProposal, WorkflowError> {
        if !caller.role.is_oversight() {
            return Err(WorkflowError::InvalidRole(format!(
                "{} may not close events",
                caller.role
            )));
        }

        let mut proposal = self.load(event_id)?;
        if proposal.status == EventStatus::Closed {
            return Err(WorkflowError::InvalidState(
                "event is already closed".into(),
            ));
        }
        if !proposal.fully_approved() {
            return Err(WorkflowError::InvalidState(
                "event is not fully approved".into(),
            ));
        }

        let now = TimeStamp::now();
        if !proposal.can_close(caller.role, now.to_datetime_utc()) {
            return Err(WorkflowError::InvalidState(
                "closing window has not opened yet".into(),
            ));
        }

        let closed_by = closer_display_name
            .map(str::to_string)
            .or_else(|| (!caller.name.is_empty()).then(|| caller.name.clone()))
            .unwrap_or_else(|| "Unknown".to_string());

        proposal.status = EventStatus::Closed;
        proposal.closed_by = Some(closed_by.clone());
        proposal.closed_at = Some(now);
        proposal.save_to_db(&self.db)?;

        self.notify(
            &proposal.details.contact_email,
            "Event closed",
            &format!(
                "{} has been closed by {}.",
                proposal.details.name, closed_by
            ),
        );

        Ok(proposal)
    }

    /// Proposals waiting on the caller's decision, chain order respected.
    pub fn list_pending(
        &self,
        caller: &Caller,
        options: &ListFilter,
    ) -> Result<ListPage, WorkflowError> {
        let role = caller.role;
        if role.hierarchy_index().is_none() {
            return Err(WorkflowError::InvalidRole(format!(
                "{role} holds no position in the approval chain"
            )));
        }

        let mut candidates = self.scan_all()?;
        candidates.retain(|p| filter::pending_for(p, role) && filter::category_matches(p, caller));
        Ok(filter::apply(candidates, options))
    }

    /// Proposals the caller has approved that are still open and not yet
    /// past their end date.
    pub fn list_approved(
        &self,
        caller: &Caller,
        options: &ListFilter,
    ) -> Result<ListPage, WorkflowError> {
        let role = caller.role;
        if role.hierarchy_index().is_none() {
            return Err(WorkflowError::InvalidRole(format!(
                "{role} holds no position in the approval chain"
            )));
        }

        let now = Utc::now();
        let mut candidates = self.scan_all()?;
        candidates
            .retain(|p| filter::approved_for(p, role, now) && filter::category_matches(p, caller));
        Ok(filter::apply(candidates, options))
    }

    pub fn list_rejected(
        &self,
        caller: &Caller,
        options: &ListFilter,
    ) -> Result<ListPage, WorkflowError> {
        let role = caller.role;
        if role.hierarchy_index().is_none() {
            return Err(WorkflowError::InvalidRole(format!(
                "{role} holds no position in the approval chain"
            )));
        }

        let mut candidates = self.scan_all()?;
        candidates.retain(|p| filter::rejected_for(p, role) && filter::category_matches(p, caller));
        Ok(filter::apply(candidates, options))
    }

    /// Closed events, visible to oversight roles only.
    pub fn list_closed(
        &self,
        caller: &Caller,
        options: &ListFilter,
    ) -> Result<ListPage, WorkflowError> {
        if !caller.role.is_oversight() {
            return Err(WorkflowError::InvalidRole(format!(
                "{} may not list closed events",
                caller.role
            )));
        }

        let mut candidates = self.scan_all()?;
        candidates.retain(|p| p.status == EventStatus::Closed);
        Ok(filter::apply(candidates, options))
    }

    /// Distinct semester labels among proposals the caller can see,
    /// newest first. Feeds the semester filter dropdowns.
    pub fn semester_options(&self, caller: &Caller) -> Result<Vec<String>, WorkflowError> {
        let mut candidates = self.scan_all()?;
        candidates.retain(|p| filter::category_matches(p, caller));
        Ok(filter::semester_options(&candidates))
    }
}
