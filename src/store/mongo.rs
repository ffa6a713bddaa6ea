use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use super::{StoreError, UserFilter, UserStore};
use crate::database::MongoDB;
use crate::models::{NewUser, User, UserPatch};

pub const USERS_COLLECTION: &str = "users";

// Código do servidor para violação de índice único
const DUPLICATE_KEY: i32 = 11000;
// BadValue (servidores antigos) e RegularExpressionInvalid
const INVALID_REGEX: [i32; 2] = [2, 51091];

/// Documento armazenado na collection `users`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    mobile: String,
    #[serde(rename = "createdAt")]
    created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    updated_at: BsonDateTime,
}

impl UserDocument {
    // O id é gerado aqui para que o resultado de um insert em lote seja conhecido
    fn new(user: NewUser, now: BsonDateTime) -> Self {
        Self {
            id: ObjectId::new(),
            name: user.name,
            email: user.email,
            mobile: user.mobile,
            created_at: now,
            updated_at: now,
        }
    }

    fn into_user(self) -> User {
        User {
            id: self.id.to_hex(),
            name: self.name,
            email: self.email,
            mobile: self.mobile,
            created_at: to_chrono(self.created_at),
            updated_at: to_chrono(self.updated_at),
        }
    }
}

fn to_chrono(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// `UserStore` sobre MongoDB.
#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<UserDocument>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            collection: db.collection::<UserDocument>(USERS_COLLECTION),
        }
    }
}

fn filter_doc(filter: &UserFilter) -> Document {
    match filter {
        UserFilter::All => doc! {},
        UserFilter::Email(email) => doc! { "email": email },
        UserFilter::Mobile(mobile) => doc! { "mobile": mobile },
        UserFilter::EmailIn(emails) => doc! { "email": { "$in": emails.clone() } },
        UserFilter::MobileIn(mobiles) => doc! { "mobile": { "$in": mobiles.clone() } },
        UserFilter::EmailOfOther { email, id } => doc! { "email": email, "_id": { "$ne": *id } },
        UserFilter::MobileOfOther { mobile, id } => doc! { "mobile": mobile, "_id": { "$ne": *id } },
        UserFilter::Search(pattern) => doc! {
            "$or": [
                { "name": { "$regex": pattern, "$options": "i" } },
                { "email": { "$regex": pattern, "$options": "i" } },
                { "mobile": { "$regex": pattern, "$options": "i" } },
            ]
        },
    }
}

fn update_doc(patch: UserPatch, now: BsonDateTime) -> Document {
    let mut set = doc! { "updatedAt": now };

    if let Some(name) = patch.name { set.insert("name", name); }
    if let Some(email) = patch.email { set.insert("email", email); }
    if let Some(mobile) = patch.mobile { set.insert("mobile", mobile); }

    doc! { "$set": set }
}

/// Converte erros do driver, separando violações de índice único.
fn translate(err: MongoError) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY => {
            StoreError::constraint(duplicate_field(&we.message), we.message.clone())
        }
        ErrorKind::Command(ce) if ce.code == DUPLICATE_KEY => {
            StoreError::constraint(duplicate_field(&ce.message), ce.message.clone())
        }
        ErrorKind::InsertMany(e) => {
            let duplicate = e
                .write_errors
                .as_ref()
                .and_then(|errors| errors.iter().find(|we| we.code == DUPLICATE_KEY));

            match duplicate {
                Some(we) => StoreError::ConstraintViolation {
                    field: duplicate_field(&we.message),
                    message: we.message.clone(),
                    inserted: e.inserted_ids.len(),
                },
                None => StoreError::Backend(err.to_string()),
            }
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

/// Na busca, um `$regex` que o servidor não compila vira `InvalidPattern`.
fn translate_find(err: MongoError, filter: &UserFilter) -> StoreError {
    match (filter, err.kind.as_ref()) {
        (UserFilter::Search(_), ErrorKind::Command(ce)) if INVALID_REGEX.contains(&ce.code) => {
            StoreError::InvalidPattern(ce.message.clone())
        }
        _ => translate(err),
    }
}

/// Extrai o campo da mensagem E11000, ex:
/// `E11000 duplicate key error collection: app.users index: email_1 dup key: { email: "a@b.c" }`
fn duplicate_field(message: &str) -> String {
    let from_key = message
        .split("dup key: {")
        .nth(1)
        .and_then(|rest| rest.split(':').next())
        .map(str::trim)
        .filter(|field| !field.is_empty());

    if let Some(field) = from_key {
        return field.to_string();
    }

    // Servidores antigos omitem o nome do campo em "dup key"
    message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|index| index.rsplit(['.', '$']).next())
        .map(|index| index.trim_end_matches("_1").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let cursor = self
            .collection
            .find(filter_doc(filter))
            .await
            .map_err(|e| translate_find(e, filter))?;
        let docs: Vec<UserDocument> = cursor.try_collect().await.map_err(|e| translate_find(e, filter))?;

        Ok(docs.into_iter().map(UserDocument::into_user).collect())
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, StoreError> {
        let found = self
            .collection
            .find_one(filter_doc(filter))
            .await
            .map_err(|e| translate_find(e, filter))?;
        Ok(found.map(UserDocument::into_user))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let found = self.collection.find_one(doc! { "_id": *id }).await.map_err(translate)?;
        Ok(found.map(UserDocument::into_user))
    }

    async fn insert_one(&self, user: NewUser) -> Result<User, StoreError> {
        let document = UserDocument::new(user, BsonDateTime::now());
        self.collection.insert_one(&document).await.map_err(translate)?;

        Ok(document.into_user())
    }

    async fn insert_many(&self, users: Vec<NewUser>) -> Result<Vec<User>, StoreError> {
        if users.is_empty() {
            return Ok(Vec::new());
        }

        let now = BsonDateTime::now();
        let documents: Vec<UserDocument> =
            users.into_iter().map(|u| UserDocument::new(u, now)).collect();

        self.collection
            .insert_many(&documents)
            .ordered(false)
            .await
            .map_err(translate)?;

        Ok(documents.into_iter().map(UserDocument::into_user).collect())
    }

    async fn update_by_id(&self, id: &ObjectId, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let updated = self
            .collection
            .find_one_and_update(doc! { "_id": *id }, update_doc(patch, BsonDateTime::now()))
            .return_document(ReturnDocument::After)
            .await
            .map_err(translate)?;

        Ok(updated.map(UserDocument::into_user))
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let deleted = self
            .collection
            .find_one_and_delete(doc! { "_id": *id })
            .await
            .map_err(translate)?;

        Ok(deleted.map(UserDocument::into_user))
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = self.collection.delete_many(doc! {}).await.map_err(translate)?;
        Ok(result.deleted_count)
    }
}
