//! On-disk document collections: one pretty-printed JSON file per record.
//!
//! Writes land in a hidden temp file and are renamed into place, so a reader
//! never observes a half-written document. A per-collection mutex serializes
//! read-modify-write sequences issued by this process; other processes
//! sharing the directory get no such guarantee. All file access runs on the
//! blocking pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::paths::{collection_dir, document_path, email_key, is_valid_key, temp_path};
use super::{new_id, run_blocking, sort_by_creation, PolicyStore, UserStore, POLICIES_COLLECTION, USERS_COLLECTION};
use crate::error::{AppError, AppResult};
use crate::model::{NewPolicy, Policy, PolicyPatch, UserRecord};

struct Collection {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl Collection {
    fn open(db_dir: &Path, name: &str) -> AppResult<Arc<Self>> {
        let dir = collection_dir(db_dir, name);
        fs::create_dir_all(&dir)?;
        debug!(target: "policyhub::storage", "collection '{}' at {}", name, dir.display());
        Ok(Arc::new(Self { dir, lock: Mutex::new(()) }))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let path = document_path(&self.dir, key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write<T: Serialize>(&self, key: &str, doc: &T) -> AppResult<()> {
        let tmp = temp_path(&self.dir, key);
        let text = serde_json::to_string_pretty(doc)?;
        fs::write(&tmp, text)?;
        fs::rename(&tmp, document_path(&self.dir, key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        fs::remove_file(document_path(&self.dir, key))?;
        Ok(())
    }

    /// Every parseable `*.json` document; unreadable entries are skipped with a warning.
    fn read_all<T: DeserializeOwned>(&self) -> AppResult<Vec<T>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(target: "policyhub::storage", "skipping unreadable entry in {}: {}", self.dir.display(), e);
                    continue;
                }
            };
            let is_doc = path.extension().map(|e| e == "json").unwrap_or(false)
                && !path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('.')).unwrap_or(true);
            if !is_doc { continue; }
            let parsed = fs::read_to_string(&path)
                .map_err(AppError::from)
                .and_then(|text| serde_json::from_str::<T>(&text).map_err(Into::into));
            match parsed {
                Ok(doc) => out.push(doc),
                Err(e) => warn!(target: "policyhub::storage", "skipping unreadable document {}: {}", path.display(), e),
            }
        }
        Ok(out)
    }
}

/// `users` collection keyed by a digest of the email.
///
/// One file per email means a second insert for the same address replaces the
/// first. Registration checks for an existing account before inserting, so
/// this only matters under concurrent registrations.
pub struct DocumentUserStore {
    users: Arc<Collection>,
}

impl DocumentUserStore {
    pub fn open(db_dir: &Path) -> AppResult<Self> {
        Ok(Self { users: Collection::open(db_dir, USERS_COLLECTION)? })
    }
}

#[async_trait]
impl UserStore for DocumentUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let users = self.users.clone();
        let email = email.to_string();
        run_blocking(move || {
            let found: Option<UserRecord> = users.read(&email_key(&email))?;
            Ok(found.filter(|u| u.email == email))
        })
        .await
    }

    async fn insert(&self, user: UserRecord) -> AppResult<()> {
        let users = self.users.clone();
        run_blocking(move || {
            let _guard = users.lock.lock();
            users.write(&email_key(&user.email), &user)
        })
        .await
    }
}

/// `policies` collection keyed by the store-assigned id.
pub struct DocumentPolicyStore {
    policies: Arc<Collection>,
    last_created: Arc<Mutex<Option<DateTime<Utc>>>>,
}

// Creation times order `find_all`, so they must strictly increase even when
// the clock does not.
fn next_created_at(last_created: &Mutex<Option<DateTime<Utc>>>) -> DateTime<Utc> {
    let mut last = last_created.lock();
    let now = Utc::now();
    let ts = match *last {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    };
    *last = Some(ts);
    ts
}

impl DocumentPolicyStore {
    pub fn open(db_dir: &Path) -> AppResult<Self> {
        Ok(Self { policies: Collection::open(db_dir, POLICIES_COLLECTION)?, last_created: Arc::new(Mutex::new(None)) })
    }
}

#[async_trait]
impl PolicyStore for DocumentPolicyStore {
    async fn insert(&self, policy: NewPolicy) -> AppResult<Policy> {
        let policies = self.policies.clone();
        let last_created = self.last_created.clone();
        run_blocking(move || {
            let _guard = policies.lock.lock();
            let stored = policy.into_policy(new_id(), next_created_at(&last_created));
            policies.write(&stored.id, &stored)?;
            Ok(stored)
        })
        .await
    }

    async fn find_all(&self) -> AppResult<Vec<Policy>> {
        let policies = self.policies.clone();
        run_blocking(move || {
            let mut all: Vec<Policy> = policies.read_all()?;
            sort_by_creation(&mut all);
            Ok(all)
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Policy>> {
        if !is_valid_key(id) { return Ok(None); }
        let policies = self.policies.clone();
        let id = id.to_string();
        run_blocking(move || policies.read(&id)).await
    }

    async fn update_by_id(&self, id: &str, patch: &PolicyPatch) -> AppResult<Option<Policy>> {
        if !is_valid_key(id) { return Ok(None); }
        let policies = self.policies.clone();
        let id = id.to_string();
        let patch = patch.clone();
        run_blocking(move || {
            let _guard = policies.lock.lock();
            let Some(mut existing) = policies.read::<Policy>(&id)? else { return Ok(None); };
            patch.apply(&mut existing);
            policies.write(&id, &existing)?;
            Ok(Some(existing))
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<Option<Policy>> {
        if !is_valid_key(id) { return Ok(None); }
        let policies = self.policies.clone();
        let id = id.to_string();
        run_blocking(move || {
            let _guard = policies.lock.lock();
            let Some(existing) = policies.read::<Policy>(&id)? else { return Ok(None); };
            policies.remove(&id)?;
            Ok(Some(existing))
        })
        .await
    }
}
