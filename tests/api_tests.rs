use anyhow::Result;
use axum::http::StatusCode;
use pinfeed::data_models::{Author, Recipe, RecipeDraft};
use pinfeed::store::{MemoryStore, RecipeStore};
use serde_json::{Value, json};
use std::sync::Arc;

mod test_helpers {
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use pinfeed::api::create_router;
    use pinfeed::assistant::CompletionClient;
    use pinfeed::gateway::{SearchGateway, SearchQuery, SearchResult};
    use pinfeed::search_engine::SearchEngine;
    use pinfeed::state::AppState;
    use pinfeed::store::MemoryStore;

    pub const ANN: &str = "ann@example.com";
    pub const BOB: &str = "bob@example.com";

    pub struct CannedCompletion {
        pub fail: bool,
    }

    #[async_trait]
    impl CompletionClient for CannedCompletion {
        async fn complete(&self, _system_prompt: &str, _user_message: &str) -> Result<String> {
            if self.fail {
                bail!("openai returned 401");
            }
            Ok("Here is a salad idea.".to_string())
        }
    }

    pub struct DownGateway;

    #[async_trait]
    impl SearchGateway for DownGateway {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchResult> {
            bail!("search service returned 503")
        }
    }

    pub struct Options {
        pub search_down: bool,
        pub completion_fails: bool,
    }

    pub fn app_with(options: Options) -> Router {
        app_on(Arc::new(MemoryStore::new()), options)
    }

    pub fn app_on(store: Arc<MemoryStore>, options: Options) -> Router {
        let engine = Arc::new(SearchEngine::default());
        let search: Arc<dyn SearchGateway> = if options.search_down {
            Arc::new(DownGateway) as Arc<dyn SearchGateway>
        } else {
            engine.clone() as Arc<dyn SearchGateway>
        };
        let completion = Arc::new(CannedCompletion {
            fail: options.completion_fails,
        });
        let state = AppState::new(store, engine, search, completion)
            .with_collections(vec!["recipes".to_string(), "legacy_recipes".to_string()])
            .with_page_size(2);
        create_router(Arc::new(state))
    }

    pub fn app() -> Router {
        app_with(Options {
            search_down: false,
            completion_fails: false,
        })
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(email) = user {
            builder = builder
                .header("x-user-email", email)
                .header("x-user-name", "Test Cook");
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }

    pub async fn create_recipe(app: &Router, user: &str, title: &str) -> Result<String> {
        let (status, body) = send(
            app,
            "POST",
            "/api/recipes",
            Some(user),
            Some(serde_json::json!({
                "title": title,
                "description": "Fresh and bright",
                "ingredients": "lettuce, lemon, olive oil",
                "instructions": "Toss everything together.",
                "tags": ["salad"]
            })),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        Ok(body["id"].as_str().unwrap_or_default().to_string())
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_health() -> Result<()> {
    let (status, body) = send(&app(), "GET", "/api/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy" }));
    Ok(())
}

#[tokio::test]
async fn test_recipe_lifecycle_and_authorship() -> Result<()> {
    let app = app();

    let (status, _) = send(&app, "POST", "/api/recipes", None, Some(json!({}))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/recipes",
        Some(ANN),
        Some(json!({ "title": "Soup", "description": "", "ingredients": "", "instructions": "" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Missing required fields: description, ingredients, instructions"
    );

    let id = create_recipe(&app, ANN, "Lemon Salad").await?;
    let (status, body) = send(&app, "GET", &format!("/api/recipes/{id}"), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Lemon Salad");
    assert_eq!(body["ingredients"], json!(["lettuce", "lemon", "olive oil"]));
    assert_eq!(body["email"], ANN);
    assert!(body["created_at"].is_string());

    let update = json!({
        "title": "Stolen Salad",
        "description": "x",
        "ingredients": "x",
        "instructions": "x"
    });
    let (status, _) = send(&app, "PUT", &format!("/api/recipes/{id}"), Some(BOB), Some(update.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/api/recipes/{id}"), Some(BOB), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PUT", &format!("/api/recipes/{id}"), Some(ANN), Some(update)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Stolen Salad");

    let (status, _) = send(&app, "DELETE", &format!("/api/recipes/{id}"), Some(ANN), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "GET", &format!("/api/recipes/{id}"), None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Recipe not found");
    Ok(())
}

#[tokio::test]
async fn test_user_lookup_after_posting() -> Result<()> {
    let app = app();
    create_recipe(&app, ANN, "Lemon Salad").await?;

    let (status, body) = send(&app, "GET", &format!("/api/users/{ANN}"), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_name"], "Test Cook");

    let (status, _) = send(&app, "GET", "/api/users/nobody@example.com", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_feed_session_pages_until_exhausted() -> Result<()> {
    let app = app();
    for title in ["One", "Two", "Three"] {
        create_recipe(&app, ANN, title).await?;
    }

    let (status, body) = send(&app, "POST", "/api/feed/sessions", None, None).await?;
    assert_eq!(status, StatusCode::CREATED);
    let session = body["sessionId"].as_str().unwrap_or_default().to_string();
    let next = format!("/api/feed/sessions/{session}/next");

    let (_, first) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(first["status"], "loaded");
    assert_eq!(first["items"].as_array().map(Vec::len), Some(2));

    let (_, second) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(second["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(second["totalLoaded"], 3);

    let (_, third) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(third["status"], "loaded");
    assert_eq!(third["items"], json!([]));

    let (_, fourth) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(fourth["status"], "exhausted");

    let (status, _) = send(&app, "DELETE", &format!("/api/feed/sessions/{session}"), None, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_feed_reset_starts_from_first_page() -> Result<()> {
    let app = app();
    for title in ["One", "Two", "Three"] {
        create_recipe(&app, ANN, title).await?;
    }

    let (_, body) = send(&app, "POST", "/api/feed/sessions", None, None).await?;
    let session = body["sessionId"].as_str().unwrap_or_default().to_string();
    let next = format!("/api/feed/sessions/{session}/next");

    let (_, first) = send(&app, "POST", &next, None, None).await?;
    let (_, second) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(second["totalLoaded"], 3);
    assert_eq!(second["exhausted"], false);

    let (status, _) = send(&app, "POST", &format!("/api/feed/sessions/{session}/reset"), None, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, again) = send(&app, "POST", &next, None, None).await?;
    assert_eq!(again["status"], "loaded");
    assert_eq!(again["totalLoaded"], 2);
    assert_eq!(again["items"], first["items"]);

    let (status, _) = send(&app, "POST", "/api/feed/sessions/missing/reset", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_store_failure_hides_internal_details() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let app = app_on(
        store.clone(),
        Options {
            search_down: false,
            completion_fails: false,
        },
    );
    create_recipe(&app, ANN, "One").await?;

    let (_, body) = send(&app, "POST", "/api/feed/sessions", None, None).await?;
    let session = body["sessionId"].as_str().unwrap_or_default().to_string();
    store.fail_collection("recipes");

    let (status, body) = send(&app, "POST", &format!("/api/feed/sessions/{session}/next"), None, None).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
    Ok(())
}

#[tokio::test]
async fn test_profile_feed_only_shows_author() -> Result<()> {
    let app = app();
    create_recipe(&app, ANN, "Ann's Salad").await?;
    create_recipe(&app, BOB, "Bob's Salad").await?;

    let (_, body) = send(&app, "POST", "/api/feed/sessions", None, Some(json!({ "author": BOB }))).await?;
    let session = body["sessionId"].as_str().unwrap_or_default().to_string();
    let (_, page) = send(&app, "POST", &format!("/api/feed/sessions/{session}/next"), None, None).await?;
    let items = page["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["email"], BOB);
    Ok(())
}

#[tokio::test]
async fn test_profile_feed_ignores_email_case() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let app = app_on(
        store.clone(),
        Options {
            search_down: false,
            completion_fails: false,
        },
    );
    let author = Author {
        email: BOB.to_string(),
        name: "Bob".to_string(),
        image: String::new(),
    };
    let mut legacy = Recipe::new(
        RecipeDraft {
            title: "Old Stew".to_string(),
            ..Default::default()
        },
        &author,
    );
    legacy.email = "Bob@Example.com".to_string();
    store.save_recipe("recipes", &legacy).await?;

    let (_, body) = send(&app, "POST", "/api/feed/sessions", None, Some(json!({ "author": "BOB@example.com" }))).await?;
    let session = body["sessionId"].as_str().unwrap_or_default().to_string();
    let (_, page) = send(&app, "POST", &format!("/api/feed/sessions/{session}/next"), None, None).await?;
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["items"][0]["title"], "Old Stew");
    Ok(())
}

#[tokio::test]
async fn test_search_session_over_local_index() -> Result<()> {
    let app = app();
    for title in ["Lemon Salad", "Tomato Salad", "Garlic Salad"] {
        create_recipe(&app, ANN, title).await?;
    }

    let (status, body) = send(&app, "POST", "/api/search/sessions", None, Some(json!({ "query": "salad" }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["exhausted"], false);
    let session = body["sessionId"].as_str().unwrap_or_default().to_string();

    let (_, more) = send(&app, "POST", &format!("/api/search/sessions/{session}/more"), None, None).await?;
    assert_eq!(more["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(more["totalLoaded"], 3);
    assert_eq!(more["exhausted"], true);

    let (_, again) = send(&app, "POST", &format!("/api/search/sessions/{session}/more"), None, None).await?;
    assert_eq!(again["status"], "exhausted");

    let (_, fresh) = send(
        &app,
        "POST",
        &format!("/api/search/sessions/{session}/query"),
        None,
        Some(json!({ "query": "tomato" })),
    )
    .await?;
    assert_eq!(fresh["totalLoaded"], 1);
    assert_eq!(fresh["items"][0]["title"], "Tomato Salad");
    Ok(())
}

#[tokio::test]
async fn test_search_failure_is_bad_gateway() -> Result<()> {
    let app = app_with(Options {
        search_down: true,
        completion_fails: false,
    });
    let (status, body) = send(&app, "POST", "/api/search/sessions", None, Some(json!({ "query": "salad" }))).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "error": "An error occurred while searching" }));

    let (status, _) = send(&app, "POST", "/api/search/sessions", None, Some(json!({ "query": " " }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_search_service_endpoints() -> Result<()> {
    let app = app();
    let id = create_recipe(&app, ANN, "Lemon Salad").await?;

    let (status, body) = send(&app, "GET", "/search?query=lemon&page=0&limit=10", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!([id]));
    assert_eq!(body["hasMore"], false);

    let (status, body) = send(&app, "POST", "/search", None, Some(json!({ "query": "lemon", "number": 3 }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["title"], "Lemon Salad");
    assert_eq!(body["results"][0]["relevance_score"], 1.0);
    Ok(())
}

#[tokio::test]
async fn test_chatbot_reply_and_failure() -> Result<()> {
    let app = app();
    create_recipe(&app, ANN, "Lemon Salad").await?;
    let (status, body) = send(
        &app,
        "POST",
        "/api/chatbot",
        None,
        Some(json!({ "message": "a lemon salad recipe please", "userProfile": null })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "bot");
    assert_eq!(body["message"], "Here is a salad idea.");
    assert_eq!(body["recipeResults"][0]["title"], "Lemon Salad");

    let failing = app_with(Options {
        search_down: true,
        completion_fails: true,
    });
    let (status, body) = send(&failing, "POST", "/api/chatbot", None, Some(json!({ "message": "dinner?" }))).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Error processing request" }));
    Ok(())
}

#[tokio::test]
async fn test_favorites_flow() -> Result<()> {
    let app = app();
    let id = create_recipe(&app, ANN, "Lemon Salad").await?;

    let (status, _) = send(&app, "POST", "/api/favorites", Some(BOB), Some(json!({ "recipe_id": id }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/api/favorites", Some(BOB), Some(json!({ "recipe_id": id }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Recipe already favorited");

    let (_, check) = send(&app, "GET", &format!("/api/favorites/check/{id}"), Some(BOB), None).await?;
    assert_eq!(check, json!(true));
    let (_, list) = send(&app, "GET", "/api/favorites", Some(BOB), None).await?;
    assert_eq!(list[0]["id"], json!(id));

    let (status, _) = send(&app, "DELETE", &format!("/api/favorites/{id}"), Some(BOB), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, check) = send(&app, "GET", &format!("/api/favorites/check/{id}"), Some(BOB), None).await?;
    assert_eq!(check, json!(false));
    Ok(())
}

#[tokio::test]
async fn test_chat_membership() -> Result<()> {
    let app = app();
    let (status, group) = send(
        &app,
        "POST",
        "/api/chat/groups",
        Some(ANN),
        Some(json!({ "group_name": "Supper club", "members": [] })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let chat_id = group["id"].as_str().unwrap_or_default().to_string();
    let messages = format!("/api/chat/groups/{chat_id}/messages");

    let (status, _) = send(&app, "POST", &messages, Some(ANN), Some(json!({ "text": "hi all" }))).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", &messages, Some(BOB), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Chat not found or you're not a member");

    let member = format!("/api/chat/groups/{chat_id}/members/{BOB}");
    let (status, _) = send(&app, "POST", &member, Some(ANN), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", &member, Some(ANN), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", &messages, Some(BOB), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["text"], "hi all");
    assert_eq!(body[0]["sender"], ANN);

    let (_, groups) = send(&app, "GET", "/api/chat/groups", Some(BOB), None).await?;
    assert_eq!(groups.as_array().map(Vec::len), Some(1));
    Ok(())
}
