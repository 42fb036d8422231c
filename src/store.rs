//! Document store seams.
//!
//! The service talks to its document store through the traits below. `db.rs`
//! implements them on MongoDB; [`MemoryStore`] backs the `--memory` mode and tests.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::data_models::{ChatGroup, ChatMessage, Favorite, Recipe, UserInfo};

/// Maximum number of chat messages returned for one group.
pub const MESSAGE_HISTORY_LIMIT: usize = 100;

/// Range query over a recipe collection, ordered by document id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: i64,
    /// Resume strictly after this document id.
    pub after: Option<String>,
    /// Restrict to one author's recipes.
    pub author: Option<String>,
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn find_recipe(&self, collection: &str, id: &str) -> Result<Option<Recipe>>;

    async fn recipe_page(&self, collection: &str, query: &PageQuery) -> Result<Vec<Recipe>>;

    async fn all_recipes(&self, collection: &str) -> Result<Vec<Recipe>>;

    /// Insert or replace by id.
    async fn save_recipe(&self, collection: &str, recipe: &Recipe) -> Result<()>;

    async fn delete_recipe(&self, collection: &str, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, email: &str) -> Result<Option<UserInfo>>;

    async fn save_user(&self, user: &UserInfo) -> Result<()>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn groups_for_member(&self, email: &str) -> Result<Vec<ChatGroup>>;

    async fn find_group(&self, id: &str) -> Result<Option<ChatGroup>>;

    async fn save_group(&self, group: &ChatGroup) -> Result<()>;

    /// Add `email` to the group in one step. False when the group is missing or
    /// already lists the member.
    async fn add_member(&self, chat_id: &str, email: &str) -> Result<bool>;

    /// Drop `email` from the group in one step. False when nothing was removed.
    async fn remove_member(&self, chat_id: &str, email: &str) -> Result<bool>;

    /// Oldest first, at most [`MESSAGE_HISTORY_LIMIT`].
    async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>>;

    async fn insert_message(&self, message: &ChatMessage) -> Result<()>;
}

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<()>;

    async fn find_favorite(&self, user_email: &str, recipe_id: &str) -> Result<Option<Favorite>>;

    async fn favorites_for(&self, user_email: &str) -> Result<Vec<Favorite>>;

    async fn delete_favorite(&self, user_email: &str, recipe_id: &str) -> Result<bool>;
}

/// Everything the HTTP service needs from its store.
pub trait DocumentStore: RecipeStore + UserStore + ChatStore + FavoriteStore {}

impl<T> DocumentStore for T where T: RecipeStore + UserStore + ChatStore + FavoriteStore {}

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    recipes: DashMap<String, BTreeMap<String, Recipe>>,
    users: DashMap<String, UserInfo>,
    groups: DashMap<String, ChatGroup>,
    messages: DashMap<String, Vec<ChatMessage>>,
    favorites: DashMap<String, Favorite>,
    failing_collections: DashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every recipe read against `collection` fail until [`MemoryStore::heal`].
    pub fn fail_collection(&self, collection: &str) {
        self.failing_collections.insert(collection.to_string());
    }

    pub fn heal(&self, collection: &str) {
        self.failing_collections.remove(collection);
    }

    fn check(&self, collection: &str) -> Result<()> {
        if self.failing_collections.contains(collection) {
            bail!("collection {collection} is unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_recipe(&self, collection: &str, id: &str) -> Result<Option<Recipe>> {
        self.check(collection)?;
        Ok(self
            .recipes
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn recipe_page(&self, collection: &str, query: &PageQuery) -> Result<Vec<Recipe>> {
        self.check(collection)?;
        let Some(docs) = self.recipes.get(collection) else {
            return Ok(Vec::new());
        };
        let limit = query.limit.max(0) as usize;
        let page = docs
            .values()
            .filter(|r| match &query.after {
                Some(after) => r.id.as_str() > after.as_str(),
                None => true,
            })
            .filter(|r| match &query.author {
                Some(author) => r.is_authored_by(author),
                None => true,
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn all_recipes(&self, collection: &str) -> Result<Vec<Recipe>> {
        self.check(collection)?;
        Ok(self
            .recipes
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_recipe(&self, collection: &str, recipe: &Recipe) -> Result<()> {
        self.check(collection)?;
        self.recipes
            .entry(collection.to_string())
            .or_default()
            .insert(recipe.id.clone(), recipe.clone());
        Ok(())
    }

    async fn delete_recipe(&self, collection: &str, id: &str) -> Result<bool> {
        self.check(collection)?;
        Ok(self
            .recipes
            .get_mut(collection)
            .map(|mut docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, email: &str) -> Result<Option<UserInfo>> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    async fn save_user(&self, user: &UserInfo) -> Result<()> {
        self.users.insert(user.email.clone(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn groups_for_member(&self, email: &str) -> Result<Vec<ChatGroup>> {
        let mut groups: Vec<ChatGroup> = self
            .groups
            .iter()
            .filter(|g| g.has_member(email))
            .map(|g| g.clone())
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn find_group(&self, id: &str) -> Result<Option<ChatGroup>> {
        Ok(self.groups.get(id).map(|g| g.clone()))
    }

    async fn save_group(&self, group: &ChatGroup) -> Result<()> {
        self.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn add_member(&self, chat_id: &str, email: &str) -> Result<bool> {
        let Some(mut group) = self.groups.get_mut(chat_id) else {
            return Ok(false);
        };
        if group.has_member(email) {
            return Ok(false);
        }
        group.members.push(email.trim().to_lowercase());
        Ok(true)
    }

    async fn remove_member(&self, chat_id: &str, email: &str) -> Result<bool> {
        let Some(mut group) = self.groups.get_mut(chat_id) else {
            return Ok(false);
        };
        let before = group.members.len();
        group.members.retain(|m| !m.eq_ignore_ascii_case(email.trim()));
        Ok(group.members.len() != before)
    }

    async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>> {
        let mut messages = self
            .messages
            .get(chat_id)
            .map(|m| m.clone())
            .unwrap_or_default();
        messages.sort_by_key(|m| m.timestamp);
        messages.truncate(MESSAGE_HISTORY_LIMIT);
        Ok(messages)
    }

    async fn insert_message(&self, message: &ChatMessage) -> Result<()> {
        self.messages
            .entry(message.chat_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn insert_favorite(&self, favorite: &Favorite) -> Result<()> {
        self.favorites.insert(favorite.id.clone(), favorite.clone());
        Ok(())
    }

    async fn find_favorite(&self, user_email: &str, recipe_id: &str) -> Result<Option<Favorite>> {
        Ok(self
            .favorites
            .get(&Favorite::key(user_email, recipe_id))
            .map(|f| f.clone()))
    }

    async fn favorites_for(&self, user_email: &str) -> Result<Vec<Favorite>> {
        let mut favorites: Vec<Favorite> = self
            .favorites
            .iter()
            .filter(|f| f.user_email.eq_ignore_ascii_case(user_email))
            .map(|f| f.clone())
            .collect();
        favorites.sort_by_key(|f| f.created_at);
        Ok(favorites)
    }

    async fn delete_favorite(&self, user_email: &str, recipe_id: &str) -> Result<bool> {
        Ok(self
            .favorites
            .remove(&Favorite::key(user_email, recipe_id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime;

    fn recipe(id: &str, email: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: format!("Recipe {id}"),
            description: String::new(),
            ingredients: String::new(),
            instructions: String::new(),
            image: String::new(),
            user_name: String::new(),
            email: email.to_string(),
            user_image: String::new(),
            tags: Vec::new(),
            created_at: DateTime::now(),
        }
    }

    #[tokio::test]
    async fn recipe_page_resumes_after_cursor() -> Result<()> {
        let store = MemoryStore::new();
        for id in ["a", "b", "c", "d"] {
            store.save_recipe("recipes", &recipe(id, "x@y.z")).await?;
        }

        let first = store
            .recipe_page("recipes", &PageQuery { limit: 2, ..Default::default() })
            .await?;
        assert_eq!(first.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);

        let second = store
            .recipe_page(
                "recipes",
                &PageQuery {
                    limit: 2,
                    after: Some("b".into()),
                    author: None,
                },
            )
            .await?;
        assert_eq!(second.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["c", "d"]);
        Ok(())
    }

    #[tokio::test]
    async fn failing_collection_errors_until_healed() -> Result<()> {
        let store = MemoryStore::new();
        store.save_recipe("recipes", &recipe("a", "x@y.z")).await?;
        store.fail_collection("recipes");
        assert!(store.find_recipe("recipes", "a").await.is_err());
        store.heal("recipes");
        assert!(store.find_recipe("recipes", "a").await?.is_some());
        Ok(())
    }
}
