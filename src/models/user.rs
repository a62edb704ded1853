use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// A registered author.
///
/// `password_hash` never leaves the server: it is skipped in both directions
/// so a `User` can be returned from any handler as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub avatar_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();

        User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            avatar_url: None,
            avatar_public_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(())
    }

    pub fn get_normalized_name(&self) -> String {
        self.name.trim().to_string()
    }

    pub fn get_normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() {
            return Err("Email cannot be empty".to_string());
        }

        if self.password.is_empty() {
            return Err("Password cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn get_normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_none() && self.email.is_none() && self.password.is_none() {
            return Err(
                "At least one field (name, email or password) must be provided for update".to_string(),
            );
        }

        if let Some(ref name) = self.name {
            validate_name(name)?;
        }

        if let Some(ref email) = self.email {
            validate_email(email)?;
        }

        if let Some(ref password) = self.password {
            validate_password(password)?;
        }

        Ok(())
    }

    pub fn get_normalized_name(&self) -> Option<String> {
        self.name.as_ref().map(|n| n.trim().to_string())
    }

    pub fn get_normalized_email(&self) -> Option<String> {
        self.email.as_deref().map(normalize_email)
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    if name.trim().chars().count() > 100 {
        return Err("Name cannot exceed 100 characters".to_string());
    }

    Ok(())
}

fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    if email.trim().len() > 255 {
        return Err("Email cannot exceed 255 characters".to_string());
    }

    if !is_valid_email(email.trim()) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password cannot exceed {} characters",
            MAX_PASSWORD_LENGTH
        ));
    }

    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 {
        return false;
    }

    if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || ".-_+".contains(c);
    let valid_domain = |c: char| c.is_alphanumeric() || ".-".contains(c);

    local.chars().all(valid_local) && domain.chars().all(valid_domain)
}
