//! Two-stage leave approval: approver derivation, transition guard,
//! notifications and the service tying them to the repositories.

pub mod approvers;
pub mod error;
pub mod guard;
pub mod notifier;
pub mod service;

pub use error::LeaveError;
pub use service::LeaveService;
