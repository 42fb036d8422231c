use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_models::{ChatGroup, ChatMessage, Recipe, UserInfo, UserProfile};
use crate::feed::LoadOutcome;
use crate::search::SearchOutcome;

fn to_chrono(ts: mongodb::bson::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts.timestamp_millis())
}

// ---------------------------------------------------------------------------
// Search service
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Ask for ranked records instead of an id page.
    pub number: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecordsRequest {
    pub query: String,
    pub number: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierPage {
    pub result: Vec<String>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub has_more: bool,
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotRequest {
    pub message: String,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

// ---------------------------------------------------------------------------
// Feeds and search sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CreateFeedRequest {
    /// Profile view: only this author's recipes.
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Loaded,
    Busy,
    Exhausted,
    Stale,
    NotStarted,
}

/// One load signal's result: what was appended and how long the list is now.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: BatchStatus,
    pub items: Vec<PinView>,
    pub total_loaded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhausted: Option<bool>,
}

impl BatchResponse {
    pub fn from_feed(outcome: LoadOutcome, total_loaded: usize, exhausted: bool) -> Self {
        let (status, items) = match outcome {
            LoadOutcome::Loaded(items) => (BatchStatus::Loaded, items),
            LoadOutcome::Busy => (BatchStatus::Busy, Vec::new()),
            LoadOutcome::Exhausted => (BatchStatus::Exhausted, Vec::new()),
            LoadOutcome::Stale => (BatchStatus::Stale, Vec::new()),
        };
        Self {
            session_id: None,
            status,
            items: items.into_iter().map(PinView::from).collect(),
            total_loaded,
            exhausted: Some(exhausted),
        }
    }

    pub fn from_search(outcome: SearchOutcome, total_loaded: usize, exhausted: bool) -> Self {
        let (status, items) = match outcome {
            SearchOutcome::Appended(items) => (BatchStatus::Loaded, items),
            SearchOutcome::Busy => (BatchStatus::Busy, Vec::new()),
            SearchOutcome::Exhausted => (BatchStatus::Exhausted, Vec::new()),
            SearchOutcome::NotStarted => (BatchStatus::NotStarted, Vec::new()),
            SearchOutcome::Stale => (BatchStatus::Stale, Vec::new()),
        };
        Self {
            session_id: None,
            status,
            items: items.into_iter().map(PinView::from).collect(),
            total_loaded,
            exhausted: Some(exhausted),
        }
    }
}

// ---------------------------------------------------------------------------
// Recipes, users, favorites
// ---------------------------------------------------------------------------

/// A recipe as rendered in the feed and on the detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PinView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub image: String,
    pub user_name: String,
    pub email: String,
    pub user_image: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Recipe> for PinView {
    fn from(recipe: Recipe) -> Self {
        Self {
            ingredients: recipe.ingredient_list(),
            created_at: to_chrono(recipe.created_at),
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            instructions: recipe.instructions,
            image: recipe.image,
            user_name: recipe.user_name,
            email: recipe.email,
            user_image: recipe.user_image,
            tags: recipe.tags,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub email: String,
    pub user_name: String,
    pub user_image: String,
}

impl From<UserInfo> for UserView {
    fn from(user: UserInfo) -> Self {
        Self {
            email: user.email,
            user_name: user.user_name,
            user_image: user.user_image,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub recipe_id: String,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub group_name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct GroupView {
    pub id: String,
    pub group_name: String,
    pub members: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ChatGroup> for GroupView {
    fn from(group: ChatGroup) -> Self {
        Self {
            created_at: to_chrono(group.created_at),
            id: group.id,
            group_name: group.group_name,
            members: group.members,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: String,
    pub chat_id: String,
    pub sender: String,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        Self {
            timestamp: to_chrono(message.timestamp),
            id: message.id,
            chat_id: message.chat_id,
            sender: message.sender,
            text: message.text,
        }
    }
}
