use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub mod handlers;
pub mod identity;
pub mod models;

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Search service
        .route(
            "/search",
            get(handlers::search_page).post(handlers::search_records),
        )
        .route("/api/health", get(handlers::health))
        .route("/api/chatbot", post(handlers::chatbot))
        // Feed and profile sessions
        .route("/api/feed/sessions", post(handlers::create_feed))
        .route("/api/feed/sessions/:id", delete(handlers::delete_feed))
        .route("/api/feed/sessions/:id/next", post(handlers::next_feed_page))
        .route("/api/feed/sessions/:id/reset", post(handlers::reset_feed))
        // Search sessions
        .route("/api/search/sessions", post(handlers::create_search))
        .route("/api/search/sessions/:id", delete(handlers::delete_search))
        .route(
            "/api/search/sessions/:id/query",
            post(handlers::resubmit_search),
        )
        .route("/api/search/sessions/:id/more", post(handlers::more_search))
        // Recipes and users
        .route("/api/recipes", post(handlers::create_recipe))
        .route(
            "/api/recipes/:id",
            get(handlers::get_recipe)
                .put(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        )
        .route("/api/users/:email", get(handlers::get_user))
        // Favorites
        .route(
            "/api/favorites",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route(
            "/api/favorites/:recipe_id",
            delete(handlers::remove_favorite),
        )
        .route(
            "/api/favorites/check/:recipe_id",
            get(handlers::check_favorite),
        )
        // Chat
        .route(
            "/api/chat/groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/api/chat/groups/:id/messages",
            get(handlers::list_messages).post(handlers::send_message),
        )
        .route(
            "/api/chat/groups/:id/members/:email",
            post(handlers::add_member).delete(handlers::remove_member),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
