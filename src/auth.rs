//! Shared-password login for the web panel
//!
//! One admin password, no user identities. The password is hashed with
//! bcrypt once at startup and only the hash is kept. A successful login
//! issues a random session token carried in an HTTP-only cookie. Sessions
//! live in memory and expire after the configured TTL.

use crate::config::AuthConfig;
use crate::error::{HeatgateError, Result};
use crate::logging::get_logger;
use axum::http::{HeaderMap, header};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "heatgate_session";

/// In-memory session registry
pub struct SessionStore {
    password_hash: Option<String>,
    ttl: Duration,
    secure_cookie: bool,
    sessions: Mutex<HashMap<String, Instant>>,
    logger: crate::logging::StructuredLogger,
}

impl SessionStore {
    pub fn new(cfg: &AuthConfig) -> Result<Self> {
        let mut store = Self::with_ttl(
            &cfg.admin_password,
            Duration::from_secs(cfg.session_ttl_minutes.saturating_mul(60)),
            cfg.hash_cost,
        )?;
        store.secure_cookie = cfg.secure_cookie;
        Ok(store)
    }

    /// Store with an explicit TTL and bcrypt cost; an empty password disables login
    pub fn with_ttl(password: &str, ttl: Duration, hash_cost: u32) -> Result<Self> {
        let logger = get_logger("auth");
        let password_hash = if password.is_empty() {
            logger.warn("No admin password configured; login is disabled");
            None
        } else {
            let hash = bcrypt::hash(password, hash_cost)
                .map_err(|e| HeatgateError::config(format!("Failed to hash admin password: {}", e)))?;
            Some(hash)
        };
        Ok(Self {
            password_hash,
            ttl,
            secure_cookie: false,
            sessions: Mutex::new(HashMap::new()),
            logger,
        })
    }

    /// False when no password is configured
    pub fn login_enabled(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        let Some(hash) = &self.password_hash else {
            return false;
        };
        match bcrypt::verify(candidate, hash) {
            Ok(matches) => matches,
            Err(e) => {
                self.logger
                    .error(&format!("Failed to verify password: {}", e));
                false
            }
        }
    }

    /// Check the password and open a session
    pub fn login(&self, candidate: &str) -> Result<String> {
        if !self.verify_password(candidate) {
            self.logger.warn("Rejected login attempt");
            return Err(HeatgateError::auth("Invalid password"));
        }
        let now = Instant::now();
        let expires = now
            .checked_add(self.ttl)
            .ok_or_else(|| HeatgateError::auth("Session lifetime out of range"))?;
        let token = uuid::Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, until| *until > now);
        sessions.insert(token.clone(), expires);
        self.logger.info("Admin logged in");
        Ok(token)
    }

    /// Whether the token belongs to a live session
    pub fn is_valid(&self, token: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(token) {
            Some(expires) if *expires > Instant::now() => true,
            Some(_) => {
                sessions.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn logout(&self, token: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if sessions.remove(token).is_some() {
            self.logger.info("Admin logged out");
        }
    }

    /// Whether the request carries a live session cookie
    pub fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        session_token(headers).is_some_and(|t| self.is_valid(&t))
    }

    /// `Set-Cookie` value opening a session
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.ttl.as_secs()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value removing the session cookie
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            SESSION_COOKIE
        )
    }
}

/// Session token from the `Cookie` header(s)
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
}
