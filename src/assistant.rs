//! Cooking assistant: optional recipe lookup, system prompt assembly, completion call.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::data_models::UserProfile;
use crate::gateway::{SearchGateway, SearchQuery, SearchRecord};

/// How many records the assistant asks the search service for.
pub const RECIPE_CONTEXT_SIZE: usize = 5;

const BASE_PROMPT: &str = "You are a professional cooking advisor and recipe recommendation assistant. Your task is to help users find recipes and cooking advice that suit their needs.";

const RECIPES_HEADER: &str = "AVAILABLE RECIPES YOU CAN REFERENCE:";

const RECIPES_USAGE: &str = "When suggesting these recipes, include the URLs so the user can view them. Feel free to describe these recipes and explain why they're suitable for the user.";

const PERSONALIZE: &str = "Based on the user information above, provide personalized recipe suggestions and cooking guidance. When appropriate, recommend specific recipes from the available options, including their URLs. Make your answers concise, friendly, and consider all user restrictions and preferences.";

static RECIPE_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)recipe|food|meal|dish|cook|make|prepare|breakfast|lunch|dinner|dessert")
        .expect("recipe intent pattern is valid")
});

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("completion failed")]
    Completion(#[source] anyhow::Error),
}

/// A chat completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub message: String,
    pub source: &'static str,
    pub recipe_results: Option<Vec<SearchRecord>>,
}

pub fn is_recipe_query(message: &str) -> bool {
    RECIPE_INTENT.is_match(message)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn present_list(values: &Option<Vec<String>>) -> Option<String> {
    let values: Vec<&str> = values
        .iter()
        .flatten()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then(|| values.join(", "))
}

pub fn build_system_prompt(profile: Option<&UserProfile>, recipes: &[SearchRecord]) -> String {
    let mut parts: Vec<String> = vec![BASE_PROMPT.to_string()];

    if !recipes.is_empty() {
        parts.push(RECIPES_HEADER.to_string());
        for (i, recipe) in recipes.iter().enumerate() {
            let image = recipe
                .image
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("No image available");
            let relevance = recipe
                .relevance_score
                .map(|score| format!("{score:.2}"))
                .unwrap_or_else(|| "N/A".to_string());
            parts.push(format!(
                "{}. {} (URL: {}, relevance: {})",
                i + 1,
                recipe.title,
                image,
                relevance
            ));
        }
        parts.push(RECIPES_USAGE.to_string());
    }

    let Some(profile) = profile else {
        return parts.join("\n");
    };

    if let Some(age) = profile.age.filter(|age| *age > 0) {
        parts.push(format!("User age: {age} years old"));
    }
    if let Some(religion) = present(&profile.religion) {
        parts.push(format!("Religious preferences: {religion}"));
    }
    if let Some(prefs) = present_list(&profile.dietary_preferences) {
        parts.push(format!("Dietary preferences: {prefs}"));
    }
    if let Some(allergies) = present_list(&profile.allergies) {
        parts.push(format!("Allergies: {allergies}"));
    }
    if let Some(skill) = present(&profile.cooking_skill) {
        parts.push(format!("Cooking skill level: {skill}"));
    }
    if let Some(cuisines) = present_list(&profile.preferred_cuisines) {
        parts.push(format!("Preferred cuisines: {cuisines}"));
    }
    if let Some(conditions) = present_list(&profile.health_conditions) {
        parts.push(format!("Health conditions: {conditions}"));
    }
    parts.push(PERSONALIZE.to_string());

    parts.join("\n")
}

/// Answers one user message.
pub struct Assistant<G: ?Sized, C: ?Sized> {
    search: Arc<G>,
    completion: Arc<C>,
}

impl<G, C> Assistant<G, C>
where
    G: SearchGateway + ?Sized,
    C: CompletionClient + ?Sized,
{
    pub fn new(search: Arc<G>, completion: Arc<C>) -> Self {
        Self { search, completion }
    }

    /// Recipes worth mentioning for `message`. A failing search service yields none.
    pub async fn recipe_context(&self, message: &str) -> Vec<SearchRecord> {
        if !is_recipe_query(message) {
            return Vec::new();
        }
        let query = SearchQuery::Records {
            query: message.to_string(),
            number: RECIPE_CONTEXT_SIZE,
        };
        match self.search.search(&query).await {
            Ok(result) => result
                .records()
                .iter()
                .take(RECIPE_CONTEXT_SIZE)
                .cloned()
                .collect(),
            Err(e) => {
                log::warn!("recipe search for assistant failed: {:#}", e);
                Vec::new()
            }
        }
    }

    pub async fn reply(
        &self,
        message: &str,
        profile: Option<&UserProfile>,
    ) -> Result<AssistantReply, AssistantError> {
        if message.trim().is_empty() {
            return Err(AssistantError::EmptyMessage);
        }
        let recipes = self.recipe_context(message).await;
        let system_prompt = build_system_prompt(profile, &recipes);
        log::debug!(
            "assistant prompt has {} recipes, profile: {}",
            recipes.len(),
            profile.is_some()
        );

        let answer = self
            .completion
            .complete(&system_prompt, message)
            .await
            .map_err(AssistantError::Completion)?;

        Ok(AssistantReply {
            message: answer,
            source: "bot",
            recipe_results: (!recipes.is_empty()).then_some(recipes),
        })
    }
}
