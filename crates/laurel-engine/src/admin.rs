//! Operator actions on commission transactions.
//!
//! Transactions only ever move forward: `Pending -> Approved -> Paid`.
//! The status machine lives in `laurel-core`; this module wires it to
//! the store and the audit log.

use crate::store_err;
use laurel_core::{EngineError, Result, TransactionId, TransactionStatus, UserId};
use laurel_storage::{AuditAction, AuditLog, Database, WriteOp};
use std::sync::Arc;

/// Advances commission transactions through their lifecycle.
pub struct TransactionAdmin {
    db: Arc<Database>,
    audit: Arc<AuditLog>,
}

impl TransactionAdmin {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// Approve a pending transaction.
    pub fn approve(&self, actor: UserId, id: TransactionId) -> Result<TransactionStatus> {
        self.advance(actor, id, TransactionStatus::Approved)
    }

    /// Mark an approved transaction as paid. Terminal.
    pub fn mark_paid(&self, actor: UserId, id: TransactionId) -> Result<TransactionStatus> {
        self.advance(actor, id, TransactionStatus::Paid)
    }

    fn advance(
        &self,
        actor: UserId,
        id: TransactionId,
        to: TransactionStatus,
    ) -> Result<TransactionStatus> {
        let tx = self
            .db
            .transaction(&id)
            .ok_or(EngineError::UnknownTransaction(id))?;
        let next = tx.status.advance_to(to)?;

        self.db
            .commit(vec![WriteOp::AdvanceTransaction { id, to: next }])
            .map_err(store_err)?;

        self.audit.append(
            &actor.to_string(),
            AuditAction::AdvanceTransaction,
            vec![id.to_string()],
            tx.cash_amount,
            &format!("transaction {} -> {}", tx.status.name(), next.name()),
        );
        Ok(next)
    }
}
