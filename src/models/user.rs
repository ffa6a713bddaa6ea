use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Usuário persistido, como exposto pela API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// ObjectId em hexadecimal (24 caracteres)
    pub id: String,
    pub name: String,
    /// Sempre em minúsculas
    pub email: String,
    pub mobile: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Campo obrigatório ausente ou vazio após `trim`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is required")]
pub struct MissingField(pub &'static str);

/// Request para criar um usuário
///
/// Os campos são opcionais só para que a validação produza uma mensagem
/// clara; um usuário válido sempre tem os três preenchidos.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[serde(default, deserialize_with = "text_or_number")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub mobile: Option<String>,
}

/// Corpo de `POST /users`: um objeto ou uma lista de objetos.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum CreateUsersRequest {
    Batch(Vec<CreateUserRequest>),
    Single(CreateUserRequest),
}

/// Candidato já normalizado e validado, pronto para persistir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub mobile: String,
}

impl NewUser {
    pub fn parse(
        name: Option<&str>,
        email: Option<&str>,
        mobile: Option<&str>,
    ) -> Result<Self, MissingField> {
        Ok(Self {
            name: required("name", name.map(normalize_name))?,
            email: required("email", email.map(normalize_email))?,
            mobile: required("mobile", mobile.map(normalize_mobile))?,
        })
    }
}

impl TryFrom<CreateUserRequest> for NewUser {
    type Error = MissingField;

    fn try_from(req: CreateUserRequest) -> Result<Self, Self::Error> {
        NewUser::parse(req.name.as_deref(), req.email.as_deref(), req.mobile.as_deref())
    }
}

/// Request para atualizar usuário (qualquer subconjunto dos campos).
///
/// Outros campos (`id`, `createdAt`...) são ignorados, então o cliente pode
/// reenviar o registro que acabou de ler.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "text_or_number")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub mobile: Option<String>,
}

/// Atualização parcial normalizada.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

impl TryFrom<UpdateUserRequest> for UserPatch {
    type Error = MissingField;

    fn try_from(req: UpdateUserRequest) -> Result<Self, Self::Error> {
        let name = req
            .name
            .map(|v| required("name", Some(normalize_name(&v))))
            .transpose()?;
        let email = req
            .email
            .map(|v| required("email", Some(normalize_email(&v))))
            .transpose()?;
        let mobile = req
            .mobile
            .map(|v| required("mobile", Some(normalize_mobile(&v))))
            .transpose()?;

        Ok(Self { name, email, mobile })
    }
}

pub fn normalize_name(value: &str) -> String {
    value.trim().to_string()
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn normalize_mobile(value: &str) -> String {
    value.trim().to_string()
}

/// Texto do campo; números (ex: mobile sem aspas) viram texto.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value_text(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a string or a number")),
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, MissingField> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_lowercases() {
        let user = NewUser::parse(Some("  Ana Souza "), Some(" Ana@Example.COM "), Some(" 5511999 "))
            .unwrap();

        assert_eq!(user.name, "Ana Souza");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.mobile, "5511999");
    }

    #[test]
    fn test_parse_rejects_blank_fields() {
        assert_eq!(
            NewUser::parse(Some("Ana"), Some("   "), Some("1")),
            Err(MissingField("email"))
        );
        assert_eq!(
            NewUser::parse(Some("Ana"), Some("a@b.c"), None),
            Err(MissingField("mobile"))
        );
    }

    #[test]
    fn test_create_body_single_or_batch() {
        let single: CreateUsersRequest =
            serde_json::from_str(r#"{"name":"a","email":"a@b.c","mobile":"1"}"#).unwrap();
        assert!(matches!(single, CreateUsersRequest::Single(_)));

        let batch: CreateUsersRequest =
            serde_json::from_str(r#"[{"name":"a","email":"a@b.c","mobile":"1"}]"#).unwrap();
        match batch {
            CreateUsersRequest::Batch(items) => assert_eq!(items.len(), 1),
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_only_validates_supplied_fields() {
        let patch = UserPatch::try_from(UpdateUserRequest {
            name: Some(" Novo Nome ".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(patch.name.as_deref(), Some("Novo Nome"));
        assert!(patch.email.is_none());
        assert!(patch.mobile.is_none());

        let blank = UserPatch::try_from(UpdateUserRequest {
            mobile: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(blank, Err(MissingField("mobile")));
    }

    #[test]
    fn test_update_ignores_fields_of_fetched_record() {
        let parsed: UpdateUserRequest = serde_json::from_str(
            r#"{"id":"65a1f0c2e4b0a1b2c3d4e5f6","name":"Ana","createdAt":"2024-01-01T00:00:00Z","role":"admin"}"#,
        )
        .unwrap();

        assert_eq!(parsed.name.as_deref(), Some("Ana"));
        assert!(parsed.email.is_none());
        assert!(parsed.mobile.is_none());
    }

    #[test]
    fn test_numeric_mobile_is_stringified() {
        let create: CreateUserRequest =
            serde_json::from_str(r#"{"name":"Ana","email":"a@b.c","mobile":5511999}"#).unwrap();
        assert_eq!(create.mobile.as_deref(), Some("5511999"));

        let update: UpdateUserRequest = serde_json::from_str(r#"{"mobile":5521}"#).unwrap();
        assert_eq!(update.mobile.as_deref(), Some("5521"));

        let missing: CreateUserRequest = serde_json::from_str(r#"{"name":"Ana","mobile":null}"#).unwrap();
        assert!(missing.email.is_none());
        assert!(missing.mobile.is_none());
    }

    #[test]
    fn test_other_json_types_are_rejected() {
        assert!(serde_json::from_str::<CreateUserRequest>(r#"{"mobile":true}"#).is_err());
        assert!(serde_json::from_str::<UpdateUserRequest>(r#"{"name":{"first":"Ana"}}"#).is_err());
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let now = Utc::now();
        let user = User {
            id: "65a1f0c2e4b0a1b2c3d4e5f6".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            mobile: "1".into(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["id"], "65a1f0c2e4b0a1b2c3d4e5f6");
    }
}
