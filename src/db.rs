use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, FindOptions, ReplaceOptions};
use mongodb::{
    Client, Collection, Database as MongoDatabase,
    bson::{Document, Regex, doc},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::config::CONFIG;
use crate::data_models::{ChatGroup, ChatMessage, Favorite, Recipe, UserInfo};
use crate::store::{
    ChatStore, FavoriteStore, MESSAGE_HISTORY_LIMIT, PageQuery, RecipeStore, UserStore,
};

/// Collection names as constants for consistency
pub mod collections {
    pub const USERS: &str = "user";
    pub const CHAT_GROUPS: &str = "chat_groups";
    pub const CHAT_MESSAGES: &str = "chat_messages";
    pub const FAVORITES: &str = "favorites";
}

/// Matches `email` exactly, ignoring ASCII case, the same rule the in-memory store applies.
pub fn email_pattern(email: &str) -> Regex {
    Regex {
        pattern: format!("^{}$", regex::escape(email.trim())),
        options: "i".to_string(),
    }
}

/// Main database wrapper providing connection management and collection access
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    db: MongoDatabase,
}

impl Database {
    /// Create a new Database instance with custom URI and database name.
    /// Useful for testing with a different database.
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        let client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let client =
            Client::with_options(client_options).context("Failed to create MongoDB client")?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to connect to MongoDB")?;

        log::info!("Connected to MongoDB database: {}", db_name);

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    /// Create a Database instance using environment configuration
    pub async fn from_config() -> Result<Self> {
        Self::new(&CONFIG.mongo_uri, &CONFIG.mongo_db_name).await
    }

    /// Get a typed collection by name
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.db.collection(name)
    }

    /// Get the underlying MongoDB client (for advanced operations)
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn recipes(&self, collection: &str) -> Repository<Recipe> {
        Repository::new(self.collection(collection))
    }

    pub fn users(&self) -> Repository<UserInfo> {
        Repository::new(self.collection(collections::USERS))
    }

    pub fn chat_groups(&self) -> Repository<ChatGroup> {
        Repository::new(self.collection(collections::CHAT_GROUPS))
    }

    pub fn chat_messages(&self) -> Repository<ChatMessage> {
        Repository::new(self.collection(collections::CHAT_MESSAGES))
    }

    pub fn favorites(&self) -> Repository<Favorite> {
        Repository::new(self.collection(collections::FAVORITES))
    }
}

// =============================================================================
// Generic CRUD operations
// =============================================================================

/// Typed access to one collection whose documents are keyed by a string `_id`.
pub struct Repository<T>
where
    T: Send + Sync,
{
    collection: Collection<T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }

    /// Insert or replace the document with the given id
    pub async fn upsert(&self, id: &str, doc: &T) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": id }, doc)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await
            .context("Failed to upsert document")?;
        Ok(())
    }

    /// Find a document by id
    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        self.find_one(doc! { "_id": id }).await
    }

    /// Find a single document matching a filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.collection
            .find_one(filter)
            .await
            .context("Failed to find document")
    }

    /// Find all documents matching a filter
    pub async fn find(&self, filter: Document, options: Option<FindOptions>) -> Result<Vec<T>> {
        let cursor = self
            .collection
            .find(filter)
            .with_options(options)
            .await
            .context("Failed to execute find query")?;

        cursor
            .try_collect()
            .await
            .context("Failed to collect results")
    }

    /// Apply `update` to the first document matching `filter`.
    /// Returns whether a document changed.
    pub async fn update(&self, filter: Document, update: Document) -> Result<bool> {
        let result = self
            .collection
            .update_one(filter, update)
            .await
            .context("Failed to update document")?;

        Ok(result.modified_count > 0)
    }

    /// Delete a document by id
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .context("Failed to delete document")?;

        Ok(result.deleted_count > 0)
    }
}

/// [`RecipeStore`] and friends backed by MongoDB.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl RecipeStore for MongoStore {
    async fn find_recipe(&self, collection: &str, id: &str) -> Result<Option<Recipe>> {
        self.db.recipes(collection).find_by_id(id).await
    }

    async fn recipe_page(&self, collection: &str, query: &PageQuery) -> Result<Vec<Recipe>> {
        let mut filter = Document::new();
        if let Some(after) = &query.after {
            filter.insert("_id", doc! { "$gt": after.as_str() });
        }
        if let Some(author) = &query.author {
            filter.insert("email", email_pattern(author));
        }
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .limit(query.limit)
            .build();
        self.db
            .recipes(collection)
            .find(filter, Some(options))
            .await
            .with_context(|| format!("Failed to read a page from {collection}"))
    }

    async fn all_recipes(&self, collection: &str) -> Result<Vec<Recipe>> {
        self.db.recipes(collection).find(doc! {}, None).await
    }

    async fn save_recipe(&self, collection: &str, recipe: &Recipe) -> Result<()> {
        self.db.recipes(collection).upsert(&recipe.id, recipe).await
    }

    async fn delete_recipe(&self, collection: &str, id: &str) -> Result<bool> {
        self.db.recipes(collection).delete_by_id(id).await
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_user(&self, email: &str) -> Result<Option<UserInfo>> {
        self.db.users().find_by_id(email).await
    }

    async fn save_user(&self, user: &UserInfo) -> Result<()> {
        self.db.users().upsert(&user.email, user).await
    }
}

#[async_trait]
impl ChatStore for MongoStore {
    async fn groups_for_member(&self, email: &str) -> Result<Vec<ChatGroup>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .build();
        self.db
            .chat_groups()
            .find(doc! { "members": email_pattern(email) }, Some(options))
            .await
    }

    async fn find_group(&self, id: &str) -> Result<Option<ChatGroup>> {
        self.db.chat_groups().find_by_id(id).await
    }

    async fn save_group(&self, group: &ChatGroup) -> Result<()> {
        self.db.chat_groups().upsert(&group.id, group).await
    }

    async fn add_member(&self, chat_id: &str, email: &str) -> Result<bool> {
        self.db
            .chat_groups()
            .update(
                doc! { "_id": chat_id, "members": { "$not": email_pattern(email) } },
                doc! { "$push": { "members": email.trim().to_lowercase() } },
            )
            .await
    }

    async fn remove_member(&self, chat_id: &str, email: &str) -> Result<bool> {
        self.db
            .chat_groups()
            .update(
                doc! { "_id": chat_id },
                doc! { "$pull": { "members": email_pattern(email) } },
            )
            .await
    }

    async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let options = FindOptions::builder()
            .sort(doc! { "timestamp": 1 })
            .limit(MESSAGE_HISTORY_LIMIT as i64)
            .build();
        self.db
            .chat_messages()
            .find(doc! { "chat_id": chat_id }, Some(options))
            .await
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        self.db.chat_messages().upsert(&message.id, message).await
    }
}

#[async_trait]
impl FavoriteStore for MongoStore {
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<()> {
        self.db.favorites().upsert(&favorite.id, favorite).await
    }

    async fn find_favorite(&self, user_email: &str, recipe_id: &str) -> Result<Option<Favorite>> {
        self.db
            .favorites()
            .find_by_id(&Favorite::key(user_email, recipe_id))
            .await
    }

    async fn favorites_for(&self, user_email: &str) -> Result<Vec<Favorite>> {
        let options = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        self.db
            .favorites()
            .find(
                doc! { "user_email": user_email.to_lowercase() },
                Some(options),
            )
            .await
    }

    async fn delete_favorite(&self, user_email: &str, recipe_id: &str) -> Result<bool> {
        self.db
            .favorites()
            .delete_by_id(&Favorite::key(user_email, recipe_id))
            .await
    }
}

// =============================================================================
// Test utilities
// =============================================================================
