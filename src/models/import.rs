use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{user::value_text, NewUser, User};

/// Conteúdo do arquivo importado: um objeto ou uma lista.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Batch(Vec<Value>),
    Single(Value),
}

/// Uma entrada do arquivo: o JSON recebido (usado no relatório) e o
/// usuário normalizado.
#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub raw: Value,
    pub user: NewUser,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportParseError {
    #[error("Invalid JSON file")]
    InvalidJson,
    #[error("Invalid data structure. Each user must have name, email, and mobile")]
    InvalidStructure,
}

/// Faz o parse do arquivo inteiro; qualquer entrada inválida rejeita tudo.
pub fn parse_import(bytes: &[u8]) -> Result<Vec<ImportEntry>, ImportParseError> {
    let payload: ImportPayload =
        serde_json::from_slice(bytes).map_err(|_| ImportParseError::InvalidJson)?;

    let raws = match payload {
        ImportPayload::Batch(items) => items,
        ImportPayload::Single(item) => vec![item],
    };

    raws.into_iter()
        .map(|raw| {
            let user = NewUser::parse(
                field_text(&raw, "name").as_deref(),
                field_text(&raw, "email").as_deref(),
                field_text(&raw, "mobile").as_deref(),
            )
            .map_err(|_| ImportParseError::InvalidStructure)?;
            Ok(ImportEntry { raw, user })
        })
        .collect()
}

fn field_text(entry: &Value, field: &str) -> Option<String> {
    entry.get(field).and_then(value_text)
}

/// Valor repetido dentro do arquivo e as entradas que o compartilham.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DuplicateGroup {
    pub value: String,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<Value>,
}

/// Valor do arquivo que já pertence a um usuário salvo.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExistingConflict {
    pub value: String,
    pub existing_user: User,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct DuplicatesInFile {
    pub emails: Vec<DuplicateGroup>,
    pub mobiles: Vec<DuplicateGroup>,
}

#[derive(Debug, Clone, Default, Serialize, utoipa::ToSchema)]
pub struct ExistingInDatabase {
    pub emails: Vec<ExistingConflict>,
    pub mobiles: Vec<ExistingConflict>,
}

/// Relatório devolvido quando a importação é recusada
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub message: String,
    pub duplicates_in_file: DuplicatesInFile,
    pub existing_in_database: ExistingInDatabase,
}

impl ImportReport {
    pub fn new(duplicates_in_file: DuplicatesInFile, existing_in_database: ExistingInDatabase) -> Self {
        Self {
            message: "Cannot import users due to duplicates".to_string(),
            duplicates_in_file,
            existing_in_database,
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.duplicates_in_file.emails.is_empty()
            || !self.duplicates_in_file.mobiles.is_empty()
            || !self.existing_in_database.emails.is_empty()
            || !self.existing_in_database.mobiles.is_empty()
    }
}
