use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::assistant::{Assistant, AssistantReply};
use crate::chat::ChatService;
use crate::data_models::RecipeDraft;
use crate::error::AppError;
use crate::feed::{self, FeedScope, FeedSession};
use crate::gateway::{SearchRecord, SearchResult};
use crate::recipes::RecipeService;
use crate::search::{self, SearchSession};
use crate::state::AppState;
use crate::store::DocumentStore;

use super::identity::AuthUser;
use super::models::{
    BatchResponse, ChatbotRequest, CreateFeedRequest, CreateGroupRequest, FavoriteRequest,
    GroupView, IdentifierPage, MessageView, PinView, QueryRequest, RecordsRequest, SearchParams,
    SendMessageRequest, SessionCreated, UserView,
};

type ApiResult<T> = Result<T, AppError>;

const DEFAULT_SEARCH_LIMIT: u32 = 50;
const DEFAULT_RECORD_COUNT: usize = 5;

fn recipes(state: &AppState) -> RecipeService<'_, dyn DocumentStore> {
    RecipeService::new(&*state.store, &state.collections).with_index(&state.engine)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

// ---------------------------------------------------------------------------
// Search service endpoints (in-process index)
// ---------------------------------------------------------------------------

fn search_response(result: SearchResult) -> Response {
    match result {
        SearchResult::IdentifierBatch(batch) => Json(IdentifierPage {
            result: batch.ids,
            page: batch.page,
            limit: batch.limit,
            total: batch.total,
            has_more: batch.has_more,
        })
        .into_response(),
        SearchResult::RecordBatch(records) => Json(json!({ "results": records })).into_response(),
    }
}

pub async fn search_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    if params.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query cannot be empty".to_string()));
    }
    let result = match params.number {
        Some(number) => SearchResult::RecordBatch(state.engine.top_records(&params.query, number)),
        None => SearchResult::IdentifierBatch(state.engine.page(
            &params.query,
            params.page.unwrap_or(0),
            params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        )),
    };
    Ok(search_response(result))
}

pub async fn search_records(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordsRequest>,
) -> ApiResult<Json<Value>> {
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query cannot be empty".to_string()));
    }
    let records: Vec<SearchRecord> = state
        .engine
        .top_records(&request.query, request.number.unwrap_or(DEFAULT_RECORD_COUNT));
    Ok(Json(json!({ "results": records })))
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

pub async fn chatbot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatbotRequest>,
) -> ApiResult<Json<AssistantReply>> {
    let assistant = Assistant::new(state.search.clone(), state.completion.clone());
    let reply = assistant
        .reply(&request.message, request.user_profile.as_ref())
        .await?;
    Ok(Json(reply))
}

// ---------------------------------------------------------------------------
// Feed sessions
// ---------------------------------------------------------------------------

pub async fn create_feed(
    State(state): State<Arc<AppState>>,
    request: Option<Json<CreateFeedRequest>>,
) -> impl IntoResponse {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let scope = match request.author.map(|a| a.trim().to_lowercase()) {
        Some(author) if !author.is_empty() => FeedScope::Author(author),
        _ => FeedScope::All,
    };
    let session = FeedSession::new(
        state.primary_collection().to_string(),
        scope,
        state.page_size,
    );
    let (session_id, _) = state.feeds.create(session);
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

pub async fn next_feed_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchResponse>> {
    let session = state
        .feeds
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Feed session not found".to_string()))?;
    let outcome = feed::load_next(&session, &*state.store).await?;
    let guard = session.lock().await;
    Ok(Json(BatchResponse::from_feed(
        outcome,
        guard.items().len(),
        guard.controller().is_exhausted(),
    )))
}

pub async fn reset_feed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let session = state
        .feeds
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Feed session not found".to_string()))?;
    session.lock().await.reset();
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_feed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.feeds.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Feed session not found".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Search sessions
// ---------------------------------------------------------------------------

async fn search_batch_response(
    session: &tokio::sync::Mutex<SearchSession>,
    outcome: search::SearchOutcome,
) -> BatchResponse {
    let guard = session.lock().await;
    BatchResponse::from_search(outcome, guard.items().len(), guard.is_exhausted())
}

pub async fn create_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query cannot be empty".to_string()));
    }
    let session = SearchSession::new(state.collections.clone(), state.page_size as u32);
    let (session_id, session) = state.searches.create(session);
    let outcome =
        match search::submit_query(&session, &*state.search, &*state.store, &request.query).await {
            Ok(outcome) => outcome,
            Err(e) => {
                state.searches.remove(&session_id);
                return Err(AppError::from(e));
            }
        };
    let mut response = search_batch_response(&session, outcome).await;
    response.session_id = Some(session_id);
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn resubmit_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<BatchResponse>> {
    let session = state
        .searches
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Search session not found".to_string()))?;
    let outcome =
        search::submit_query(&session, &*state.search, &*state.store, &request.query).await?;
    Ok(Json(search_batch_response(&session, outcome).await))
}

pub async fn more_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchResponse>> {
    let session = state
        .searches
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Search session not found".to_string()))?;
    let outcome = search::load_more(&session, &*state.search, &*state.store).await?;
    Ok(Json(search_batch_response(&session, outcome).await))
}

pub async fn delete_search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.searches.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Search session not found".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Recipes and users
// ---------------------------------------------------------------------------

pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(author): AuthUser,
    Json(draft): Json<RecipeDraft>,
) -> ApiResult<impl IntoResponse> {
    let recipe = recipes(&state).create(&author, draft).await?;
    Ok((StatusCode::CREATED, Json(PinView::from(recipe))))
}

pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PinView>> {
    let recipe = recipes(&state).get(&id).await?;
    Ok(Json(recipe.into()))
}

pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(draft): Json<RecipeDraft>,
) -> ApiResult<Json<PinView>> {
    let recipe = recipes(&state).update(user.email(), &id, draft).await?;
    Ok(Json(recipe.into()))
}

pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    recipes(&state).delete(user.email(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> ApiResult<Json<UserView>> {
    let user = recipes(&state).user(&email).await?;
    Ok(Json(user.into()))
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<PinView>>> {
    let favorites = recipes(&state).favorites(user.email()).await?;
    Ok(Json(favorites.into_iter().map(PinView::from).collect()))
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<FavoriteRequest>,
) -> ApiResult<impl IntoResponse> {
    let favorite = recipes(&state)
        .add_favorite(user.email(), &request.recipe_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "recipe_id": favorite.recipe_id, "user_email": favorite.user_email })),
    ))
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(recipe_id): Path<String>,
) -> ApiResult<StatusCode> {
    recipes(&state)
        .remove_favorite(user.email(), &recipe_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(recipe_id): Path<String>,
) -> ApiResult<Json<bool>> {
    let favorited = recipes(&state)
        .is_favorite(user.email(), &recipe_id)
        .await?;
    Ok(Json(favorited))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<GroupView>>> {
    let groups = ChatService::new(&*state.store).groups(user.email()).await?;
    Ok(Json(groups.into_iter().map(GroupView::from).collect()))
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let group = ChatService::new(&*state.store)
        .create_group(user.email(), &request.group_name, &request.members)
        .await?;
    Ok((StatusCode::CREATED, Json(GroupView::from(group))))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Vec<MessageView>>> {
    let messages = ChatService::new(&*state.store)
        .messages(&chat_id, user.email())
        .await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = ChatService::new(&*state.store)
        .send(&chat_id, user.email(), &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageView::from(message))))
}

pub async fn add_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((chat_id, member)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    ChatService::new(&*state.store)
        .add_member(&chat_id, user.email(), &member)
        .await?;
    Ok(Json(json!({ "message": "User added to chat successfully" })))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((chat_id, member)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    ChatService::new(&*state.store)
        .remove_member(&chat_id, user.email(), &member)
        .await?;
    Ok(Json(json!({ "message": "User removed from chat successfully" })))
}
