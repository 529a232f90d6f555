//!
//! policyhub HTTP client
//! ----------------------
//! Thin async session over the policyhub HTTP API. `login` keeps the issued
//! bearer token and every policy call sends it.

use anyhow::{anyhow, Context, Result};
use reqwest::{Method, StatusCode, Url};
use serde_json::{json, Value};

/// Non-success response from the server, kept with its status and body.
#[derive(Debug, Clone)]
pub struct RemoteError {
    pub status: StatusCode,
    pub body: Value,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote error: HTTP {} {}", self.status, self.body)
    }
}

impl std::error::Error for RemoteError {}

#[derive(Clone)]
pub struct HttpSession {
    base: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpSession {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, client, token: None })
    }

    pub fn base_url(&self) -> &Url { &self.base }

    pub fn token(&self) -> Option<&str> { self.token.as_deref() }

    pub fn set_token<S: Into<String>>(&mut self, token: S) { self.token = Some(token.into()); }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.base.join(path)?;
        let mut req = self.client.request(method, url);
        if let Some(tok) = &self.token { req = req.bearer_auth(tok); }
        if let Some(b) = body { req = req.json(&b); }
        let resp = req.send().await?;
        let status = resp.status();
        let val: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(RemoteError { status, body: val }.into());
        }
        Ok(val)
    }

    /// Returns the registered email.
    pub async fn register(&self, email: &str, password: &str) -> Result<String> {
        let v = self.call(Method::POST, "/auth/user", Some(json!({"email": email, "password": password}))).await?;
        v.get("newUser").and_then(|s| s.as_str()).map(str::to_string).ok_or_else(|| anyhow!("malformed response: {}", v))
    }

    /// Authenticates and keeps the access token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<String> {
        let v = self.call(Method::POST, "/auth/login", Some(json!({"email": email, "password": password}))).await?;
        let token = v.get("access_token").and_then(|s| s.as_str()).unwrap_or("").to_string();
        if token.is_empty() { return Err(anyhow!("login failed")); }
        self.token = Some(token.clone());
        Ok(token)
    }

    pub async fn create_policy(&self, fields: Value) -> Result<Value> {
        let v = self.call(Method::POST, "/policy", Some(fields)).await?;
        Ok(v.get("newPolicy").cloned().unwrap_or(Value::Null))
    }

    pub async fn list_policies(&self) -> Result<Vec<Value>> {
        let v = self.call(Method::GET, "/policy", None).await?;
        match v.get("policies") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(anyhow!("malformed response: {}", v)),
        }
    }

    pub async fn get_policy(&self, id: &str) -> Result<Value> {
        let v = self.call(Method::GET, &format!("/policy/{}", id), None).await?;
        Ok(v.get("policy").cloned().unwrap_or(Value::Null))
    }

    pub async fn update_policy(&self, id: &str, fields: Value) -> Result<Value> {
        let v = self.call(Method::PUT, &format!("/policy/{}", id), Some(fields)).await?;
        Ok(v.get("existingPolicy").cloned().unwrap_or(Value::Null))
    }

    pub async fn delete_policy(&self, id: &str) -> Result<Value> {
        let v = self.call(Method::DELETE, &format!("/policy/{}", id), None).await?;
        Ok(v.get("deletedPolicy").cloned().unwrap_or(Value::Null))
    }
}

/// Status of a failed call, if the server answered.
pub fn remote_status(err: &anyhow::Error) -> Option<u16> {
    err.downcast_ref::<RemoteError>().map(|e| e.status.as_u16())
}
