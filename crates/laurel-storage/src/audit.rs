//! Append-only audit log.
//!
//! Every distribution decision, successful or failed, is appended here
//! before the caller sees the result. The core only writes; the read
//! side exists for compliance tooling, the CLI dump, and tests.

use chrono::{DateTime, Utc};
use laurel_core::Amount;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// What kind of decision an entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    RecordReferral,
    DeactivateReferral,
    InstallPlan,
    DistributeCommissions,
    AdvanceTransaction,
    CalculatePrizes,
    DistributePrizes,
    CancelPrize,
}

/// One appended decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,

    /// Who triggered the decision: an operator id, or a collaborator
    /// label such as "checkout" for event-driven calls.
    pub actor: String,

    pub action: AuditAction,

    /// Affected row ids, stringified.
    pub subjects: Vec<String>,

    /// Total amount the decision moved, zero when not applicable.
    pub amount: Amount,

    /// Human-readable outcome ("3 transactions created", "no active plan").
    pub outcome: String,
}

/// Append-only in-process audit sink.
#[derive(Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry. Also emitted as a tracing event so operators see
    /// the decision stream in the logs.
    pub fn append(
        &self,
        actor: &str,
        action: AuditAction,
        subjects: Vec<String>,
        amount: Amount,
        outcome: &str,
    ) {
        tracing::info!(actor, ?action, %amount, outcome, "audit");
        self.entries.lock().push(AuditEntry {
            at: Utc::now(),
            actor: actor.to_string(),
            action,
            subjects,
            amount,
            outcome: outcome.to_string(),
        });
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
