//! Campus event proposal approval engine.
//!
//! Event proposals travel a fixed chain of approver roles, one decision
//! record per role. Approvers can pause their decision with a query that
//! only the proposal owner answers; owners can edit a proposal mid-chain
//! without revoking approvals already granted; oversight roles close
//! fully-approved events once the closing window opens. Proposals persist
//! as CBOR documents in sled, one blob per proposal.

pub mod error;
pub mod event;
pub mod filter;
pub mod notify;
pub mod proposal;
pub mod role;
pub mod semester;
pub mod service;
pub mod utils;
