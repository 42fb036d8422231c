//! Recipe posts, user lookups and favorites.

use thiserror::Error;

use crate::data_models::{Author, Favorite, Recipe, RecipeDraft, UserInfo};
use crate::reconciler::resolve;
use crate::search_engine::SearchEngine;
use crate::store::{FavoriteStore, RecipeStore, UserStore};

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Recipe not found")]
    NotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Only the author can modify this recipe")]
    Forbidden,
    #[error("Recipe already favorited")]
    AlreadyFavorited,
    #[error("Favorite not found")]
    FavoriteNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct RecipeService<'a, S: ?Sized> {
    store: &'a S,
    /// New recipes go to the first collection; reads try them in order.
    collections: &'a [String],
    index: Option<&'a SearchEngine>,
}

impl<'a, S> RecipeService<'a, S>
where
    S: RecipeStore + UserStore + FavoriteStore + ?Sized,
{
    pub fn new(store: &'a S, collections: &'a [String]) -> Self {
        Self {
            store,
            collections,
            index: None,
        }
    }

    /// Keep `index` in step with every write.
    pub fn with_index(mut self, index: &'a SearchEngine) -> Self {
        self.index = Some(index);
        self
    }

    fn primary(&self) -> Result<&'a str, RecipeError> {
        self.collections
            .first()
            .map(String::as_str)
            .ok_or_else(|| RecipeError::Store(anyhow::anyhow!("no recipe collection configured")))
    }

    /// The recipe and the collection holding it.
    async fn locate(&self, id: &str) -> Result<(Recipe, &'a str), RecipeError> {
        for collection in self.collections {
            if let Some(recipe) = self.store.find_recipe(collection, id).await? {
                return Ok((recipe, collection.as_str()));
            }
        }
        Err(RecipeError::NotFound)
    }

    pub async fn create(&self, author: &Author, draft: RecipeDraft) -> Result<Recipe, RecipeError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(RecipeError::MissingFields(missing));
        }
        let collection = self.primary()?;
        let tags = draft.normalized_tags();
        let recipe = Recipe::new(RecipeDraft { tags, ..draft }, author);
        self.store.save_recipe(collection, &recipe).await?;
        self.store
            .save_user(&UserInfo {
                email: author.email.to_lowercase(),
                user_name: author.name.clone(),
                user_image: author.image.clone(),
            })
            .await?;
        if let Some(index) = self.index {
            index.index_recipe(&recipe);
        }
        log::info!("recipe {} created by {}", recipe.id, recipe.email);
        Ok(recipe)
    }

    pub async fn get(&self, id: &str) -> Result<Recipe, RecipeError> {
        self.locate(id).await.map(|(recipe, _)| recipe)
    }

    pub async fn update(
        &self,
        email: &str,
        id: &str,
        draft: RecipeDraft,
    ) -> Result<Recipe, RecipeError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(RecipeError::MissingFields(missing));
        }
        let (existing, collection) = self.locate(id).await?;
        if !existing.is_authored_by(email) {
            return Err(RecipeError::Forbidden);
        }
        let tags = draft.normalized_tags();
        let recipe = Recipe {
            title: draft.title,
            description: draft.description,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            image: draft.image,
            tags,
            ..existing
        };
        self.store.save_recipe(collection, &recipe).await?;
        if let Some(index) = self.index {
            index.index_recipe(&recipe);
        }
        Ok(recipe)
    }

    pub async fn delete(&self, email: &str, id: &str) -> Result<(), RecipeError> {
        let (existing, collection) = self.locate(id).await?;
        if !existing.is_authored_by(email) {
            return Err(RecipeError::Forbidden);
        }
        self.store.delete_recipe(collection, id).await?;
        if let Some(index) = self.index {
            index.remove(id);
        }
        log::info!("recipe {id} deleted from {collection}");
        Ok(())
    }

    pub async fn user(&self, email: &str) -> Result<UserInfo, RecipeError> {
        self.store
            .find_user(&email.to_lowercase())
            .await?
            .ok_or(RecipeError::UserNotFound)
    }

    pub async fn add_favorite(&self, email: &str, recipe_id: &str) -> Result<Favorite, RecipeError> {
        self.locate(recipe_id).await?;
        if self.store.find_favorite(email, recipe_id).await?.is_some() {
            return Err(RecipeError::AlreadyFavorited);
        }
        let favorite = Favorite::new(email, recipe_id);
        self.store.insert_favorite(&favorite).await?;
        Ok(favorite)
    }

    /// Favorited recipes, oldest favorite first. Recipes deleted since are skipped.
    pub async fn favorites(&self, email: &str) -> Result<Vec<Recipe>, RecipeError> {
        let ids: Vec<String> = self
            .store
            .favorites_for(email)
            .await?
            .into_iter()
            .map(|f| f.recipe_id)
            .collect();
        Ok(resolve(self.store, self.collections, &ids).await)
    }

    pub async fn remove_favorite(&self, email: &str, recipe_id: &str) -> Result<(), RecipeError> {
        if self.store.delete_favorite(email, recipe_id).await? {
            Ok(())
        } else {
            Err(RecipeError::FavoriteNotFound)
        }
    }

    pub async fn is_favorite(&self, email: &str, recipe_id: &str) -> Result<bool, RecipeError> {
        Ok(self.store.find_favorite(email, recipe_id).await?.is_some())
    }
}
