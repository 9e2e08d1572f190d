use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const USERS: &str = "users";
pub const PENDING_REGISTRATIONS: &str = "pending_registrations";
pub const TASKS: &str = "tasks";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let mongodb = Self::from_client(client, db_name);

        // Test connection
        mongodb.db.list_collection_names().await?;

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Wraps an existing client without touching the server.
    pub fn from_client(client: Client, db_name: &str) -> Self {
        Self {
            db: client.database(db_name),
        }
    }

    /// Creates the indexes the service relies on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        // users(email) - email identifies an account
        let users = self.collection::<mongodb::bson::Document>(USERS);
        let users_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(unique())
            .build();

        match users.create_index(users_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // pending_registrations(email) - one open registration per address
        let pending = self.collection::<mongodb::bson::Document>(PENDING_REGISTRATIONS);
        let pending_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(unique())
            .build();

        match pending.create_index(pending_index).await {
            Ok(_) => log::info!("   ✅ Index created: pending_registrations(email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // tasks(assignedUsers.email) - per-assignee lookups
        let tasks = self.collection::<mongodb::bson::Document>(TASKS);
        let tasks_index = IndexModel::builder()
            .keys(doc! { "assignedUsers.email": 1 })
            .build();

        match tasks.create_index(tasks_index).await {
            Ok(_) => log::info!("   ✅ Index created: tasks(assignedUsers.email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

#[cfg(test)]
impl MongoDB {
    /// Fresh, uniquely named database on the server at `MONGO_URI`.
    pub async fn for_tests() -> Self {
        dotenv::dotenv().ok();
        let uri = std::env::var("MONGO_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let name = format!("dutydeck_test_{}", uuid::Uuid::new_v4().simple());

        MongoDB::new(&uri, &name)
            .await
            .expect("MongoDB must be running for ignored tests")
    }

    pub async fn drop_for_tests(self) {
        self.db.drop().await.ok();
    }
}
