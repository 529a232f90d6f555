//!
//! policyhub storage module
//! -------------------------
//! Persistence is a document store with two collections: `users` (keyed by
//! email) and `policies` (keyed by a store-assigned id). Services only see the
//! `UserStore` and `PolicyStore` traits; the concrete backend is chosen at
//! startup.
//!
//! Backends:
//! - `memory`: process-local collections, used by tests and throwaway runs.
//! - `document`: one JSON document per record under
//!   `<root>/<database>/<collection>/<key>.json`.
//!
//! Every trait method is a single-document operation. There are no
//! multi-document transactions and no uniqueness constraint on user email;
//! callers that need uniqueness check first and accept the race.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::model::{NewPolicy, Policy, PolicyPatch, UserRecord};

mod paths;
pub mod memory;
pub mod document;

pub use document::{DocumentPolicyStore, DocumentUserStore};
pub use memory::{MemoryPolicyStore, MemoryUserStore};

pub const USERS_COLLECTION: &str = "users";
pub const POLICIES_COLLECTION: &str = "policies";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// First account registered under `email`, if any.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;
    async fn insert(&self, user: UserRecord) -> AppResult<()>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Persist a new record, assigning its id and creation time.
    async fn insert(&self, policy: NewPolicy) -> AppResult<Policy>;
    /// All records in insertion order.
    async fn find_all(&self) -> AppResult<Vec<Policy>>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Policy>>;
    /// Apply `patch` and return the post-update record.
    async fn update_by_id(&self, id: &str, patch: &PolicyPatch) -> AppResult<Option<Policy>>;
    /// Remove the record and return its last stored version.
    async fn delete_by_id(&self, id: &str) -> AppResult<Option<Policy>>;
}

/// Store handles shared by all services.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub policies: Arc<dyn PolicyStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::default()),
            policies: Arc::new(MemoryPolicyStore::default()),
        }
    }

    /// Open (creating if needed) the on-disk collections of `database` under `root`.
    pub fn open_documents<P: AsRef<Path>>(root: P, database: &str) -> AppResult<Self> {
        let db_dir = paths::database_dir(root.as_ref(), database)?;
        tracing::info!(target: "policyhub::storage", "document store at {}", db_dir.display());
        Ok(Self {
            users: Arc::new(DocumentUserStore::open(&db_dir)?),
            policies: Arc::new(DocumentPolicyStore::open(&db_dir)?),
        })
    }
}

/// Run filesystem or CPU-heavy work off the async executor.
pub(crate) async fn run_blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::internal("blocking_task_failed".to_string(), format!("blocking task failed: {}", e)))?
}

/// Fresh opaque record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Records in insertion order: creation time, ties broken by id.
pub(crate) fn sort_by_creation(policies: &mut [Policy]) {
    policies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;
