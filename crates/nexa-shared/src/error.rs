use thiserror::Error;

use crate::types::UserId;

/// Domain failures reported by the entity stores.
///
/// Each variant aborts the operation that raised it with no state change. The
/// `Display` text is what the operator is shown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrmError {
    #[error("Já existe um usuário com o e-mail {0}")]
    DuplicateEmail(String),

    #[error("Usuário não encontrado")]
    UserNotFound(UserId),

    #[error("Usuário não encontrado")]
    UnknownEmail(String),

    #[error("Não é possível remover o último administrador")]
    LastAdmin,

    #[error("Você não pode excluir seu próprio usuário")]
    SelfDeletion,

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Users must be seeded before {0}")]
    SeedPrecondition(&'static str),
}

impl CrmError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
