use std::collections::HashSet;
use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    models::{
        parse_import, CreateUsersRequest, DuplicateGroup, DuplicatesInFile, ExistingConflict,
        ExistingInDatabase, ImportEntry, ImportReport, NewUser, UpdateUserRequest, User, UserPatch,
    },
    store::{UserFilter, UserStore},
    utils::{find_duplicates, AppError},
};

const USER_NOT_FOUND: &str = "User not found";

/// Resultado de `POST /users`: a forma da resposta segue a forma do corpo
#[derive(Debug)]
pub enum CreatedUsers {
    Single(User),
    Batch(Vec<User>),
}

/// Serviço de usuários. O store é injetado; não há estado global.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: CreateUsersRequest) -> Result<CreatedUsers, AppError> {
        match request {
            CreateUsersRequest::Single(candidate) => {
                let user = NewUser::try_from(candidate)?;
                self.create_one(user).await.map(CreatedUsers::Single)
            }
            CreateUsersRequest::Batch(candidates) => {
                let users = candidates
                    .into_iter()
                    .map(NewUser::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                self.create_many(users).await.map(CreatedUsers::Batch)
            }
        }
    }

    async fn create_one(&self, user: NewUser) -> Result<User, AppError> {
        if self.store.find_one(&UserFilter::Email(user.email.clone())).await?.is_some() {
            return Err(AppError::validation("User with this email already exists"));
        }

        if self.store.find_one(&UserFilter::Mobile(user.mobile.clone())).await?.is_some() {
            return Err(AppError::validation("User with this mobile number already exists"));
        }

        let created = self
            .store
            .insert_one(user)
            .await
            .map_err(|e| AppError::from_store(e, |field| format!("User with this {} already exists", field)))?;

        log::info!("👤 User created: {}", created.id);
        Ok(created)
    }

    async fn create_many(&self, users: Vec<NewUser>) -> Result<Vec<User>, AppError> {
        let emails: Vec<String> = users.iter().map(|u| u.email.clone()).collect();
        let mobiles: Vec<String> = users.iter().map(|u| u.mobile.clone()).collect();

        if !find_duplicates(&emails).is_empty() {
            return Err(AppError::validation("Duplicate email addresses found in the input data"));
        }

        if !find_duplicates(&mobiles).is_empty() {
            return Err(AppError::validation("Duplicate mobile numbers found in the input data"));
        }

        if let Some(existing) = self.store.find_one(&UserFilter::EmailIn(emails)).await? {
            return Err(AppError::validation(format!("Email {} already exists", existing.email)));
        }

        if let Some(existing) = self.store.find_one(&UserFilter::MobileIn(mobiles)).await? {
            return Err(AppError::validation(format!("Mobile number {} already exists", existing.mobile)));
        }

        let created = self
            .store
            .insert_many(users)
            .await
            .map_err(|e| AppError::from_store(e, |field| format!("Duplicate {} found in bulk creation", field)))?;

        log::info!("👥 Bulk created {} users", created.len());
        Ok(created)
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.store.find(&UserFilter::All).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<User, AppError> {
        let object_id = parse_id(id)?;

        self.store
            .find_by_id(&object_id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    /// Busca case-insensitive em name, email e mobile.
    ///
    /// A query vai sem alterações para o store, que decide se o padrão é
    /// válido; o `trim` só serve para recusar queries em branco.
    pub async fn search(&self, query: Option<&str>) -> Result<Vec<User>, AppError> {
        let pattern = query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| AppError::validation("Search query is required"))?;

        Ok(self.store.find(&UserFilter::Search(pattern.to_string())).await?)
    }

    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<User, AppError> {
        let object_id = parse_id(id)?;
        let patch = UserPatch::try_from(request)?;

        if let Some(email) = &patch.email {
            let filter = UserFilter::EmailOfOther { email: email.clone(), id: object_id };
            if self.store.find_one(&filter).await?.is_some() {
                return Err(AppError::validation("Email already exists for another user"));
            }
        }

        if let Some(mobile) = &patch.mobile {
            let filter = UserFilter::MobileOfOther { mobile: mobile.clone(), id: object_id };
            if self.store.find_one(&filter).await?.is_some() {
                return Err(AppError::validation("Mobile number already exists for another user"));
            }
        }

        self.store
            .update_by_id(&object_id, patch)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    pub async fn delete(&self, id: &str) -> Result<User, AppError> {
        let object_id = parse_id(id)?;

        self.store
            .delete_by_id(&object_id)
            .await?
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))
    }

    pub async fn delete_all(&self) -> Result<u64, AppError> {
        let deleted = self.store.delete_all().await?;
        log::warn!("🗑️  Deleted all users ({})", deleted);
        Ok(deleted)
    }

    /// Importa usuários de um arquivo JSON (objeto ou lista).
    ///
    /// Tudo ou nada: qualquer duplicata no arquivo ou conflito com o banco
    /// recusa a importação inteira com um relatório detalhado.
    pub async fn import(&self, bytes: &[u8]) -> Result<Vec<User>, AppError> {
        let entries = parse_import(bytes)?;

        let emails: Vec<String> = entries.iter().map(|e| e.user.email.clone()).collect();
        let mobiles: Vec<String> = entries.iter().map(|e| e.user.mobile.clone()).collect();

        let duplicates = DuplicatesInFile {
            emails: group_duplicates(&entries, &emails, |u| &u.email),
            mobiles: group_duplicates(&entries, &mobiles, |u| &u.mobile),
        };

        let mut existing = ExistingInDatabase::default();

        for email in distinct(&emails) {
            if let Some(user) = self.store.find_one(&UserFilter::Email(email.clone())).await? {
                existing.emails.push(ExistingConflict { value: email, existing_user: user });
            }
        }

        for mobile in distinct(&mobiles) {
            if let Some(user) = self.store.find_one(&UserFilter::Mobile(mobile.clone())).await? {
                existing.mobiles.push(ExistingConflict { value: mobile, existing_user: user });
            }
        }

        let report = ImportReport::new(duplicates, existing);
        if report.has_conflicts() {
            log::warn!(
                "⚠️ Import rejected: {} duplicated email(s), {} duplicated mobile(s), {} existing email(s), {} existing mobile(s)",
                report.duplicates_in_file.emails.len(),
                report.duplicates_in_file.mobiles.len(),
                report.existing_in_database.emails.len(),
                report.existing_in_database.mobiles.len(),
            );
            return Err(AppError::ImportRejected(Box::new(report)));
        }

        let users = entries.into_iter().map(|e| e.user).collect();
        let imported = self
            .store
            .insert_many(users)
            .await
            .map_err(|e| AppError::from_store(e, |field| format!("Duplicate {} found during import", field)))?;

        log::info!("📥 Imported {} users", imported.len());
        Ok(imported)
    }
}

// Ids inválidos não resolvem para nenhum usuário
fn parse_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::not_found(USER_NOT_FOUND))
}

fn distinct(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    values.iter().filter(|v| seen.insert(v.as_str())).cloned().collect()
}

fn group_duplicates(
    entries: &[ImportEntry],
    values: &[String],
    key: impl Fn(&NewUser) -> &String,
) -> Vec<DuplicateGroup> {
    find_duplicates(values)
        .into_iter()
        .map(|value| DuplicateGroup {
            entries: entries
                .iter()
                .filter(|e| key(&e.user) == &value)
                .map(|e| e.raw.clone())
                .collect(),
            value,
        })
        .collect()
}
