use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::database::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Agent => "agent",
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
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("unknown role '{}', expected admin, agent or viewer", other)),
        }
    }
}

/// A registered actor, resolved from its API key on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrincipal {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub api_key: String,
}

#[derive(Debug, FromRow)]
pub struct PrincipalRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub api_key: String,
}

impl TryFrom<PrincipalRow> for Principal {
    type Error = DatabaseError;

    fn try_from(row: PrincipalRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(DatabaseError::Decode)?;
        Ok(Principal { id: row.id, name: row.name, email: row.email, role, api_key: row.api_key })
    }
}
