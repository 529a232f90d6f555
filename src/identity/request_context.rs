use super::Principal;

/// Per-request data attached by the bearer gate and read by handlers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn authenticated(principal: Principal) -> Self {
        Self { principal: Some(principal), request_id: Some(uuid::Uuid::new_v4().simple().to_string()) }
    }

    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }

    pub fn email(&self) -> &str {
        self.principal.as_ref().map(|p| p.email.as_str()).unwrap_or("<anonymous>")
    }
}
