use anyhow::{Result, anyhow};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{SaltString, PasswordHash};

/// Salted password hashing with an injected cost factor.
///
/// The cost is the Argon2id time cost (passes over memory). Hashes are PHC strings
/// that carry their own parameters, so raising the cost never invalidates
/// existing accounts.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Result<Self> {
        let params = Params::new(Params::DEFAULT_M_COST, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow!("invalid hash cost {}: {}", cost, e))?;
        Ok(Self { params })
    }

    pub fn cost(&self) -> u32 { self.params.t_cost() }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let phc = self.argon2().hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
        Ok(phc)
    }

    /// Malformed stored hashes verify as `false`.
    pub fn verify_password(&self, hash: &str, password: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(hash) {
            self.argon2().verify_password(password.as_bytes(), &parsed).is_ok()
        } else { false }
    }
}

impl Default for CredentialHasher {
    fn default() -> Self { Self { params: Params::default() } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = CredentialHasher::new(1).unwrap();
        let phc = h.hash_password("password123").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert_ne!(phc, "password123");
        assert!(h.verify_password(&phc, "password123"));
        assert!(!h.verify_password(&phc, "wrongpassword"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let h = CredentialHasher::new(1).unwrap();
        let a = h.hash_password("same").unwrap();
        let b = h.hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hashes_from_other_costs_still_verify() {
        let old = CredentialHasher::new(1).unwrap();
        let phc = old.hash_password("pw").unwrap();
        let newer = CredentialHasher::new(3).unwrap();
        assert_eq!(newer.cost(), 3);
        assert!(newer.verify_password(&phc, "pw"));
    }

    #[test]
    fn zero_cost_rejected_and_garbage_hash_fails() {
        assert!(CredentialHasher::new(0).is_err());
        assert!(!CredentialHasher::default().verify_password("not-a-phc", "pw"));
    }
}
