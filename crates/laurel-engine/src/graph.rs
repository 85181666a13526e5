//! Referral graph: single-parent edges and the bounded upward walk.

use crate::store_err;
use laurel_core::{
    EngineError, ReferralRelationship, ReferralStats, RelationshipId, Result, UserId,
};
use laurel_storage::{AuditAction, AuditLog, Database, StoreError, WriteOp};
use std::collections::HashSet;
use std::sync::Arc;

/// Stores and queries referral edges. Each referred user has at most one
/// relationship, so the graph is a forest in the happy case; the walk
/// still refuses to trust that (see [`ReferralGraph::chain_from`]).
pub struct ReferralGraph {
    db: Arc<Database>,
    audit: Arc<AuditLog>,
}

impl ReferralGraph {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// Record a referral attribution. Fails with
    /// [`EngineError::DuplicateRelationship`] if any edge for `referred`
    /// already exists, regardless of referrer; callers treat that as
    /// "already attributed", not as a fault.
    pub fn record_referral(
        &self,
        referrer: UserId,
        referred: UserId,
        referral_code: Option<String>,
        source: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<RelationshipId> {
        if referrer == referred {
            self.audit.append(
                source,
                AuditAction::RecordReferral,
                vec![referred.to_string()],
                laurel_core::Amount::ZERO,
                "rejected: self-referral",
            );
            return Err(EngineError::SelfReferral { user: referred });
        }

        let relationship = ReferralRelationship::new(referrer, referred, referral_code, source, now);
        let id = relationship.id;

        match self.db.commit(vec![WriteOp::InsertRelationship(relationship)]) {
            Ok(_) => {
                self.audit.append(
                    source,
                    AuditAction::RecordReferral,
                    vec![referrer.to_string(), referred.to_string()],
                    laurel_core::Amount::ZERO,
                    "relationship recorded",
                );
                tracing::info!(%referrer, %referred, source, "referral recorded");
                Ok(id)
            }
            Err(StoreError::DuplicateRelationship(_)) => {
                self.audit.append(
                    source,
                    AuditAction::RecordReferral,
                    vec![referred.to_string()],
                    laurel_core::Amount::ZERO,
                    "rejected: already attributed",
                );
                Err(EngineError::DuplicateRelationship { referred })
            }
            Err(other) => {
                self.audit.append(
                    source,
                    AuditAction::RecordReferral,
                    vec![referred.to_string()],
                    laurel_core::Amount::ZERO,
                    &format!("persistence failure: {other}"),
                );
                Err(store_err(other))
            }
        }
    }

    /// Active referrer of a user. `None` is a normal chain terminus.
    pub fn referrer_of(&self, user: &UserId) -> Option<UserId> {
        self.db.active_referrer_of(user)
    }

    /// Walk the chain upward from `user`, at most `max_hops` levels.
    ///
    /// The hop cap bounds the walk even if the stored edges were
    /// corrupted into a cycle; a visited set cuts the cycle early so a
    /// corrupted graph cannot even earn the full cap.
    pub fn chain_from(&self, user: UserId, max_hops: u8) -> Vec<(u8, UserId)> {
        let mut chain = Vec::new();
        let mut visited: HashSet<UserId> = HashSet::from([user]);
        let mut current = user;

        for level in 1..=max_hops {
            match self.referrer_of(&current) {
                Some(referrer) if visited.insert(referrer) => {
                    chain.push((level, referrer));
                    current = referrer;
                }
                Some(referrer) => {
                    tracing::warn!(%user, %referrer, level, "referral cycle detected, stopping walk");
                    break;
                }
                None => break,
            }
        }
        chain
    }

    /// Deactivate the edge for a referred user. The row stays as history.
    pub fn deactivate(&self, actor: &str, referred: UserId) -> Result<()> {
        if self.db.relationship(&referred).is_none() {
            return Err(EngineError::UnknownRelationship { referred });
        }
        self.db
            .commit(vec![WriteOp::DeactivateRelationship { referred }])
            .map_err(store_err)?;
        self.audit.append(
            actor,
            AuditAction::DeactivateReferral,
            vec![referred.to_string()],
            laurel_core::Amount::ZERO,
            "relationship deactivated",
        );
        Ok(())
    }

    /// Per-referrer aggregate over the cumulative edge counters.
    pub fn stats(&self, referrer: &UserId) -> ReferralStats {
        let edges = self.db.relationships_to(referrer);
        ReferralStats {
            referrer: *referrer,
            direct_referrals: edges.len() as u64,
            active_referrals: edges.iter().filter(|e| e.is_active()).count() as u64,
            total_invested: edges.iter().map(|e| e.invested).sum(),
            total_commission: edges.iter().map(|e| e.commission_earned).sum(),
        }
    }
}
