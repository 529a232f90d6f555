use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// `<root>/<database>`, created if missing. The database name must be a single
/// plain path segment.
pub(crate) fn database_dir(root: &Path, database: &str) -> AppResult<PathBuf> {
    if database.is_empty() || !database.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::user("invalid_database_name".to_string(), format!("invalid database name: '{}'", database)));
    }
    let dir = root.join(database);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub(crate) fn collection_dir(db_dir: &Path, collection: &str) -> PathBuf {
    db_dir.join(collection)
}

pub(crate) fn document_path(collection_dir: &Path, key: &str) -> PathBuf {
    collection_dir.join(format!("{}.json", key))
}

pub(crate) fn temp_path(collection_dir: &Path, key: &str) -> PathBuf {
    collection_dir.join(format!(".{}.json.tmp", key))
}

/// Keys that may name a document file: ASCII alphanumerics and '-'.
pub(crate) fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= 128 && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Filesystem-safe key for an email address: lowercase hex SHA-256 of its bytes.
/// Always 64 characters, whatever the email length.
pub(crate) fn email_key(email: &str) -> String {
    let digest = Sha256::digest(email.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() { let _ = write!(&mut out, "{:02x}", b); }
    out
}
