use mongodb::{Client, Collection, Database};
use std::error::Error;

use crate::store::mongo::USERS_COLLECTION;

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Cria os índices únicos de `users`.
    ///
    /// São a garantia real de unicidade: as verificações do serviço antes
    /// de gravar podem perder corridas. Se não puderem ser criados (ex:
    /// dados já duplicados) o serviço não sobe.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.database().collection::<mongodb::bson::Document>(USERS_COLLECTION);

        for field in ["email", "mobile"] {
            let index = IndexModel::builder()
                .keys(doc! { field: 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(format!("{}_1", field))
                        .build(),
                )
                .build();

            users.create_index(index).await?;
            log::info!("   ✅ Unique index ready: {}({})", USERS_COLLECTION, field);
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Ping usado pelo health check
    pub async fn ping(&self) -> bool {
        self.db.run_command(mongodb::bson::doc! { "ping": 1 }).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let _ = env_logger::builder().is_test(true).try_init();

        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/user_service_test".to_string());
        let db = MongoDB::new(&uri, "user_service_test").await;

        assert!(db.is_ok());
        assert!(db.unwrap().ping().await);
    }
}
