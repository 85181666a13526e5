//! Active commission plan resolution and plan administration.

use crate::store_err;
use laurel_core::{CommissionPlan, EngineError, PlanId, Result};
use laurel_storage::{AuditAction, AuditLog, Database, WriteOp};
use std::sync::Arc;

/// Resolves the single default+active plan. Zero or multiple flagged
/// plans is a configuration error the resolver refuses to guess around.
pub struct CommissionPlanResolver {
    db: Arc<Database>,
    audit: Arc<AuditLog>,
}

impl CommissionPlanResolver {
    pub fn new(db: Arc<Database>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// The one plan flagged default and active.
    pub fn active_plan(&self) -> Result<CommissionPlan> {
        let mut flagged = self.db.default_active_plans();
        match flagged.len() {
            0 => Err(EngineError::NoActivePlan),
            1 => Ok(flagged.remove(0)),
            count => Err(EngineError::AmbiguousActivePlan { count }),
        }
    }

    /// Startup/admin-time invariant check: exactly one flagged plan, and
    /// that plan passes its own validation. Run this at boot so a broken
    /// configuration surfaces before payout time.
    pub fn check_configuration(&self) -> Result<()> {
        self.active_plan()?.validate()?;
        Ok(())
    }

    /// Install a plan version. When the new plan is flagged default, the
    /// previous default is demoted in the same commit, so the
    /// one-default invariant cannot be broken through this path.
    pub fn install_plan(&self, actor: &str, plan: CommissionPlan) -> Result<PlanId> {
        plan.validate()?;
        let id = plan.id;

        let mut batch = Vec::new();
        if plan.is_default {
            batch.push(WriteOp::ClearDefaultPlans);
        }
        batch.push(WriteOp::InsertPlan(plan.clone()));
        self.db.commit(batch).map_err(store_err)?;

        self.audit.append(
            actor,
            AuditAction::InstallPlan,
            vec![id.to_string()],
            laurel_core::Amount::ZERO,
            &format!("plan {} v{} installed", plan.name, plan.version),
        );
        tracing::info!(plan = %plan.name, version = plan.version, "commission plan installed");
        Ok(id)
    }

    pub fn plans(&self) -> Vec<CommissionPlan> {
        self.db.plans()
    }
}
