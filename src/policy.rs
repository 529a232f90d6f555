//! CRUD over the `policies` collection with not-found semantics.
//!
//! An empty collection is a `NotFound` failure for `get_all_policies`, not an
//! empty success.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::model::{NewPolicy, Policy, PolicyPatch};
use crate::storage::PolicyStore;

#[derive(Clone)]
pub struct PolicyService {
    policies: Arc<dyn PolicyStore>,
}

fn policy_not_found(id: &str) -> AppError {
    AppError::not_found("policy_not_found".to_string(), format!("Policy #{} not found", id))
}

impl PolicyService {
    pub fn new(policies: Arc<dyn PolicyStore>) -> Self { Self { policies } }

    /// No duplicate checking; returns the stored record including its id.
    pub async fn create_policy(&self, fields: NewPolicy) -> AppResult<Policy> {
        let created = self.policies.insert(fields).await?;
        info!(target: "policyhub::policy", id = %created.id, "policy created");
        Ok(created)
    }

    pub async fn get_all_policies(&self) -> AppResult<Vec<Policy>> {
        let policies = self.policies.find_all().await?;
        if policies.is_empty() {
            return Err(AppError::not_found("policies_empty", "Policy data not found!"));
        }
        debug!(target: "policyhub::policy", count = policies.len(), "policies listed");
        Ok(policies)
    }

    pub async fn get_policy(&self, id: &str) -> AppResult<Policy> {
        self.policies.find_by_id(id).await?.ok_or_else(|| policy_not_found(id))
    }

    /// Overwrites only the supplied fields and returns the post-update record.
    pub async fn update_policy(&self, id: &str, fields: &PolicyPatch) -> AppResult<Policy> {
        if fields.is_empty() {
            debug!(target: "policyhub::policy", id = %id, "update with no fields; record left unchanged");
        }
        let updated = self.policies.update_by_id(id, fields).await?.ok_or_else(|| policy_not_found(id))?;
        info!(target: "policyhub::policy", id = %id, "policy updated");
        Ok(updated)
    }

    /// Returns the record as it was just before removal.
    pub async fn delete_policy(&self, id: &str) -> AppResult<Policy> {
        let deleted = self.policies.delete_by_id(id).await?.ok_or_else(|| policy_not_found(id))?;
        info!(target: "policyhub::policy", id = %id, "policy deleted");
        Ok(deleted)
    }
}
