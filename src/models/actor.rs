// src/models/actor.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Nome gravado no histórico quando o gateway não identifica ninguém
pub const UNIDENTIFIED_USER: &str = "Usuário não identificado";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Member,
}

/// Quem está operando o quadro. A identidade é resolvida fora daqui e
/// chega explícita em cada operação.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[schema(example = "maria")]
    pub username: Option<String>,
    pub role: Role,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: Some(username.into()),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Nome que vai para o `changed_by` do histórico.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNIDENTIFIED_USER)
    }

    pub fn is(&self, username: &str) -> bool {
        self.username.as_deref() == Some(username)
    }
}
