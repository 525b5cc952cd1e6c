//! The event proposal document: approval chain, queries, audit trail and
//! sled persistence.

use chrono::{DateTime, Utc};

use crate::error::WorkflowError;
use crate::event::{EventDetails, FieldChange, TimeStamp};
use crate::role::Role;
use crate::semester;
use crate::utils;

/// Days before the event's end date at which closing becomes permitted.
/// The pre-window is deliberate slack so oversight can schedule closure
/// ahead of the literal end date.
pub const CLOSE_WINDOW_DAYS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum ApprovalStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
    #[n(3)]
    Query,
}

/// One role's decision record within the chain.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalStep {
    #[n(0)]
    pub role: Role,
    #[n(1)]
    pub status: ApprovalStatus,
    #[n(2)]
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum EventStatus {
    #[n(0)]
    Open,
    #[n(1)]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum QueryStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Answered,
}

/// A question raised by an approver (pre-approval) or an oversight role
/// (post-approval). Answered in place; otherwise append-only.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct QueryRecord {
    #[n(0)]
    pub query_id: String,
    #[n(1)]
    pub asker_role: Role,
    #[n(2)]
    pub text: String,
    #[n(3)]
    pub responder_email: String,
    #[n(4)]
    pub status: QueryStatus,
    #[n(5)]
    pub response: Option<String>,
    #[n(6)]
    pub raised_at: TimeStamp<Utc>,
    #[n(7)]
    pub answered_at: Option<TimeStamp<Utc>>,
    #[n(8)]
    pub post_approval: bool,
}

impl QueryRecord {
    pub fn new(
        asker_role: Role,
        text: impl Into<String>,
        responder_email: impl Into<String>,
        post_approval: bool,
    ) -> Result<Self, WorkflowError> {
        Ok(Self {
            query_id: utils::new_uuid_to_bech32(utils::QUERY_HRP)?,
            asker_role,
            text: text.into(),
            responder_email: responder_email.into(),
            status: QueryStatus::Pending,
            response: None,
            raised_at: TimeStamp::now(),
            answered_at: None,
            post_approval,
        })
    }
}

/// One entry of the edit audit trail. Never mutated after append.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct EditRecord {
    #[n(0)]
    pub edited_at: TimeStamp<Utc>,
    #[n(1)]
    pub edited_by: String,
    #[n(2)]
    pub changes: Vec<FieldChange>,
    #[n(3)]
    pub reason: String,
}

/// A full event proposal document as stored in sled, one CBOR blob per
/// proposal keyed by its id.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct EventProposal {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub owner_id: String,
    #[n(2)]
    pub details: EventDetails,
    #[n(3)]
    pub semester: String,
    #[n(4)]
    pub academic_year: String,
    #[n(5)]
    pub approvals: Vec<ApprovalStep>,
    #[n(6)]
    pub queries: Vec<QueryRecord>,
    #[n(7)]
    pub status: EventStatus,
    #[n(8)]
    pub closed_by: Option<String>,
    #[n(9)]
    pub closed_at: Option<TimeStamp<Utc>>,
    #[n(10)]
    pub edit_history: Vec<EditRecord>,
}

impl EventProposal {
    /// Create a new proposal with a freshly minted id. The submitter's own
    /// step enters the chain already approved; every other step starts
    /// pending. The chain always holds exactly one step per hierarchy
    /// role, in hierarchy order.
    pub fn new(owner_id: String, details: EventDetails) -> Result<Self, WorkflowError> {
        details.validate()?;

        let Some(start) = details.start_date.clone() else {
            return Err(WorkflowError::Validation(
                "start and end dates are required".into(),
            ));
        };
        let term = semester::classify(start.to_datetime_utc());

        let approvals = Role::hierarchy()
            .iter()
            .map(|&role| {
                if role == Role::ClubSecretary {
                    ApprovalStep {
                        role,
                        status: ApprovalStatus::Approved,
                        comment: "Self approved".to_string(),
                    }
                } else {
                    ApprovalStep {
                        role,
                        status: ApprovalStatus::Pending,
                        comment: String::new(),
                    }
                }
            })
            .collect();

        Ok(Self {
            id: utils::new_uuid_to_bech32(utils::EVENT_HRP)?,
            owner_id,
            details,
            semester: term.semester,
            academic_year: term.academic_year,
            approvals,
            queries: Vec::new(),
            status: EventStatus::Open,
            closed_by: None,
            closed_at: None,
            edit_history: Vec::new(),
        })
    }

    /// Look up the approval step for a role, failing fast on roles outside
    /// the chain.
    pub fn step(&self, role: Role) -> Result<&ApprovalStep, WorkflowError> {
        self.approvals
            .iter()
            .find(|step| step.role == role)
            .ok_or_else(|| WorkflowError::InvalidRole(role.to_string()))
    }

    pub fn step_mut(&mut self, role: Role) -> Result<&mut ApprovalStep, WorkflowError> {
        self.approvals
            .iter_mut()
            .find(|step| step.role == role)
            .ok_or_else(|| WorkflowError::InvalidRole(role.to_string()))
    }

    /// True when every hierarchy step, including the last, is approved.
    pub fn fully_approved(&self) -> bool {
        self.approvals
            .iter()
            .all(|step| step.status == ApprovalStatus::Approved)
    }

    /// True when every step strictly before `role` in chain order is
    /// approved. Used by the write-side gate and the read-side pending
    /// filter alike.
    pub fn predecessors_approved(&self, role: Role) -> Result<bool, WorkflowError> {
        let idx = role
            .hierarchy_index()
            .ok_or_else(|| WorkflowError::InvalidRole(role.to_string()))?;
        Ok(self
            .approvals
            .iter()
            .take(idx)
            .all(|step| step.status == ApprovalStatus::Approved))
    }

    /// Re-open every non-owner step that is neither approved nor holding a
    /// query. Approved steps survive an edit; queried steps stay with
    /// their asker until answered.
    pub fn reopen_unsettled_steps(&mut self) {
        for step in &mut self.approvals {
            if step.role == Role::ClubSecretary {
                continue;
            }
            if !matches!(
                step.status,
                ApprovalStatus::Approved | ApprovalStatus::Query
            ) {
                step.status = ApprovalStatus::Pending;
                step.comment.clear();
            }
        }
    }

    /// Recompute the cached semester bucket from the current start date.
    pub fn reclassify(&mut self) {
        if let Some(start) = &self.details.start_date {
            let term = semester::classify(start.to_datetime_utc());
            self.semester = term.semester;
            self.academic_year = term.academic_year;
        }
    }

    pub fn find_query_mut(&mut self, query_id: &str) -> Option<&mut QueryRecord> {
        self.queries
            .iter_mut()
            .find(|query| query.query_id == query_id)
    }

    /// Whether `role` may close this proposal at `now`: oversight role,
    /// still open, fully approved, and inside the closing window that
    /// opens [`CLOSE_WINDOW_DAYS`] before the end date.
    pub fn can_close(&self, role: Role, now: DateTime<Utc>) -> bool {
        let Some(end) = &self.details.end_date else {
            return false;
        };
        role.is_oversight()
            && self.status == EventStatus::Open
            && self.fully_approved()
            && now >= end.to_datetime_utc() - chrono::Duration::days(CLOSE_WINDOW_DAYS)
    }

    /// Load a proposal document from the database
    pub fn load_from_db(db: &sled::Db, event_id: &str) -> Result<Self, WorkflowError> {
        let Some(raw) = db.get(event_id.as_bytes())? else {
            return Err(WorkflowError::NotFound(event_id.to_string()));
        };
        Ok(minicbor::decode(raw.as_ref())?)
    }

    /// Save the proposal document back under its id
    pub fn save_to_db(&self, db: &sled::Db) -> Result<(), WorkflowError> {
        db.insert(self.id.as_bytes(), minicbor::to_vec(self)?)?;
        Ok(())
    }
}
