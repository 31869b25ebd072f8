pub mod error;
pub mod markets;
pub mod reconciler;

pub use error::SettlementError;
pub use reconciler::{
    AuditStatus, BatchSettlementResult, BetAudit, Reconciler, SettlementOutcome, SettlementPath,
};
