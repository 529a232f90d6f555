use async_trait::async_trait;
use parking_lot::RwLock;

use super::{new_id, PolicyStore, UserStore};
use crate::error::AppResult;
use crate::model::{NewPolicy, Policy, PolicyPatch, UserRecord};

/// In-memory `users` collection. Duplicate emails are stored as separate
/// documents; lookups return the first.
#[derive(Default)]
pub struct MemoryUserStore {
    docs: RwLock<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn len(&self) -> usize { self.docs.read().len() }
    pub fn is_empty(&self) -> bool { self.docs.read().is_empty() }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.docs.read().iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: UserRecord) -> AppResult<()> {
        self.docs.write().push(user);
        Ok(())
    }
}

/// In-memory `policies` collection, kept in insertion order.
#[derive(Default)]
pub struct MemoryPolicyStore {
    docs: RwLock<Vec<Policy>>,
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn insert(&self, policy: NewPolicy) -> AppResult<Policy> {
        let stored = policy.into_policy(new_id(), chrono::Utc::now());
        self.docs.write().push(stored.clone());
        Ok(stored)
    }

    async fn find_all(&self) -> AppResult<Vec<Policy>> {
        Ok(self.docs.read().clone())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Policy>> {
        Ok(self.docs.read().iter().find(|p| p.id == id).cloned())
    }

    async fn update_by_id(&self, id: &str, patch: &PolicyPatch) -> AppResult<Option<Policy>> {
        let mut docs = self.docs.write();
        let Some(existing) = docs.iter_mut().find(|p| p.id == id) else { return Ok(None); };
        patch.apply(existing);
        Ok(Some(existing.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<Option<Policy>> {
        let mut docs = self.docs.write();
        let Some(pos) = docs.iter().position(|p| p.id == id) else { return Ok(None); };
        Ok(Some(docs.remove(pos)))
    }
}
