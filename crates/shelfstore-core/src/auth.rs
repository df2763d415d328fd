//! Login against a fixed credential table
//!
//! A successful login issues a [`Session`]. Every inventory call takes the
//! session explicitly; there is no process-wide "current user". Keeping a
//! session alive between invocations is the caller's business.

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ShelfError, ShelfResult};

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Every operation, including location updates and deletes
    Admin,
    /// Add and browse only
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role `{}`", other)),
        }
    }
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddProduct,
    ListProducts,
    UpdateLocations,
    DeleteProduct,
}

impl Action {
    /// Human-readable verb phrase used in `Forbidden` errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Action::AddProduct => "add products",
            Action::ListProducts => "list products",
            Action::UpdateLocations => "update locations",
            Action::DeleteProduct => "delete products",
        }
    }

    pub fn allowed_for(&self, role: Role) -> bool {
        match self {
            Action::AddProduct | Action::ListProducts => true,
            Action::UpdateLocations | Action::DeleteProduct => role == Role::Admin,
        }
    }
}

#[derive(Debug, Clone)]
struct Credential {
    password: String,
    role: Role,
}

/// User id → password and role.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    users: HashMap<String, Credential>,
}

impl CredentialTable {
    /// Table with no users.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock table: one admin, one viewer.
    pub fn builtin() -> Self {
        Self::empty()
            .with_user("1001", "OB4729", Role::Admin)
            .with_user("1002", "OB8391", Role::Viewer)
    }

    /// Add or replace a user.
    pub fn with_user(
        mut self,
        user_id: impl Into<String>,
        password: impl Into<String>,
        role: Role,
    ) -> Self {
        let credential = Credential {
            password: password.into(),
            role,
        };
        self.users.insert(user_id.into(), credential);
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check credentials and issue a fresh session.
    pub fn login(&self, user_id: &str, password: &str) -> ShelfResult<Session> {
        match self.users.get(user_id) {
            Some(cred) if cred.password == password => {
                let session = Session {
                    token: Uuid::new_v4(),
                    user_id: user_id.to_string(),
                    role: cred.role,
                };
                info!(
                    target: "shelfstore::auth",
                    user = user_id,
                    role = %cred.role,
                    "login succeeded"
                );
                Ok(session)
            }
            _ => {
                warn!(target: "shelfstore::auth", user = user_id, "login rejected");
                Err(ShelfError::InvalidCredentials)
            }
        }
    }
}

/// Proof of a successful login, passed into every inventory call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Uuid,
    user_id: String,
    role: Role,
}

impl Session {
    /// Opaque token identifying this login.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Fail with `Forbidden` unless the session's role allows `action`.
    pub fn require(&self, action: Action) -> ShelfResult<()> {
        if action.allowed_for(self.role) {
            Ok(())
        } else {
            Err(ShelfError::Forbidden {
                user: self.user_id.clone(),
                action: action.describe(),
            })
        }
    }
}
