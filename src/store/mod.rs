//! Porta de armazenamento dos usuários.
//!
//! O serviço só conhece [`UserStore`]; o adapter MongoDB fica em [`mongo`] e
//! um adapter em memória atende os testes.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::{NewUser, User, UserPatch};

#[cfg(test)]
pub mod memory;
pub mod mongo;

pub use mongo::MongoUserStore;

/// Erros devolvidos por um [`UserStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Um índice único recusou a escrita.
    ///
    /// `inserted` conta os documentos que um insert em lote (unordered) ainda
    /// gravou antes da violação; é zero em escritas simples.
    #[error("duplicate value for unique field `{field}`: {message}")]
    ConstraintViolation {
        field: String,
        message: String,
        inserted: usize,
    },
    /// O backend não conseguiu compilar o padrão de busca
    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            field: field.into(),
            message: message.into(),
            inserted: 0,
        }
    }
}

/// Consulta tipada sobre a coleção de usuários.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Email(String),
    Mobile(String),
    EmailIn(Vec<String>),
    MobileIn(Vec<String>),
    /// Mesmo email em outro registro que não `id`.
    EmailOfOther { email: String, id: ObjectId },
    /// Mesmo mobile em outro registro que não `id`.
    MobileOfOther { mobile: String, id: ObjectId },
    /// Padrão case-insensitive aplicado a name, email ou mobile.
    Search(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    async fn insert_one(&self, user: NewUser) -> Result<User, StoreError>;

    /// Insert unordered: um item recusado não interrompe os demais.
    async fn insert_many(&self, users: Vec<NewUser>) -> Result<Vec<User>, StoreError>;

    /// Aplica `patch` e devolve o registro atualizado (`None` se `id` não existe).
    async fn update_by_id(&self, id: &ObjectId, patch: UserPatch) -> Result<Option<User>, StoreError>;

    /// Remove e devolve o registro (`None` se `id` não existe).
    async fn delete_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    /// Remove todos os registros e devolve quantos foram apagados.
    async fn delete_all(&self) -> Result<u64, StoreError>;
}
