use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use regex::{Regex, RegexBuilder};
use tokio::sync::RwLock;

use super::{StoreError, UserFilter, UserStore};
use crate::models::{NewUser, User, UserPatch};

/// Store em memória com as mesmas restrições únicas dos índices do MongoDB.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

/// Filtro pronto para aplicar; o padrão de busca é compilado uma única vez.
struct Matcher<'a> {
    filter: &'a UserFilter,
    search: Option<Regex>,
}

impl<'a> Matcher<'a> {
    fn new(filter: &'a UserFilter) -> Result<Self, StoreError> {
        let search = match filter {
            UserFilter::Search(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| StoreError::InvalidPattern(e.to_string()))?,
            ),
            _ => None,
        };

        Ok(Self { filter, search })
    }

    fn matches(&self, user: &User) -> bool {
        match self.filter {
            UserFilter::All => true,
            UserFilter::Email(email) => &user.email == email,
            UserFilter::Mobile(mobile) => &user.mobile == mobile,
            UserFilter::EmailIn(emails) => emails.contains(&user.email),
            UserFilter::MobileIn(mobiles) => mobiles.contains(&user.mobile),
            UserFilter::EmailOfOther { email, id } => &user.email == email && user.id != id.to_hex(),
            UserFilter::MobileOfOther { mobile, id } => &user.mobile == mobile && user.id != id.to_hex(),
            UserFilter::Search(_) => self.search.as_ref().is_some_and(|re| {
                re.is_match(&user.name) || re.is_match(&user.email) || re.is_match(&user.mobile)
            }),
        }
    }
}

fn check_unique(users: &[User], skip_id: Option<&str>, email: &str, mobile: &str) -> Result<(), StoreError> {
    for existing in users.iter().filter(|u| Some(u.id.as_str()) != skip_id) {
        if existing.email == email {
            return Err(StoreError::constraint("email", format!("duplicate key: {{ email: \"{}\" }}", email)));
        }
        if existing.mobile == mobile {
            return Err(StoreError::constraint("mobile", format!("duplicate key: {{ mobile: \"{}\" }}", mobile)));
        }
    }
    Ok(())
}

fn build(user: NewUser) -> User {
    let now = Utc::now();
    User {
        id: ObjectId::new().to_hex(),
        name: user.name,
        email: user.email,
        mobile: user.mobile,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let matcher = Matcher::new(filter)?;
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| matcher.matches(u)).cloned().collect())
    }

    async fn find_one(&self, filter: &UserFilter) -> Result<Option<User>, StoreError> {
        let matcher = Matcher::new(filter)?;
        let users = self.users.read().await;
        Ok(users.iter().find(|u| matcher.matches(u)).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let hex = id.to_hex();
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == hex).cloned())
    }

    async fn insert_one(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        check_unique(&users, None, &user.email, &user.mobile)?;

        let created = build(user);
        users.push(created.clone());
        Ok(created)
    }

    async fn insert_many(&self, batch: Vec<NewUser>) -> Result<Vec<User>, StoreError> {
        let mut users = self.users.write().await;
        let mut inserted = Vec::new();
        let mut first_error: Option<StoreError> = None;

        // Unordered: segue inserindo mesmo após uma violação
        for user in batch {
            match check_unique(&users, None, &user.email, &user.mobile) {
                Ok(()) => {
                    let created = build(user);
                    users.push(created.clone());
                    inserted.push(created);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(StoreError::ConstraintViolation { field, message, .. }) => Err(StoreError::ConstraintViolation {
                field,
                message,
                inserted: inserted.len(),
            }),
            Some(other) => Err(other),
            None => Ok(inserted),
        }
    }

    async fn update_by_id(&self, id: &ObjectId, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let hex = id.to_hex();
        let mut users = self.users.write().await;

        let Some(position) = users.iter().position(|u| u.id == hex) else {
            return Ok(None);
        };

        let mut updated = users[position].clone();
        if let Some(name) = patch.name { updated.name = name; }
        if let Some(email) = patch.email { updated.email = email; }
        if let Some(mobile) = patch.mobile { updated.mobile = mobile; }
        updated.updated_at = Utc::now();

        check_unique(&users, Some(&hex), &updated.email, &updated.mobile)?;

        users[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        let hex = id.to_hex();
        let mut users = self.users.write().await;

        Ok(users.iter().position(|u| u.id == hex).map(|position| users.remove(position)))
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut users = self.users.write().await;
        let count = users.len() as u64;
        users.clear();
        Ok(count)
    }
}
