use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config {
        mongo_uri: get_env_or_default("MONGO_URI", "mongodb://localhost:27017"),
        mongo_db_name: get_env_or_default("MONGO_DB_NAME", "pinfeed"),
        bind_addr: get_env_or_default("BIND_ADDR", "0.0.0.0:8000"),
        search_api_url: get_env_optional("SEARCH_API_URL"),
        openai_api_key: get_env_optional("OPENAI_API_KEY"),
        openai_api_base: get_env_or_default("OPENAI_API_BASE", "https://api.openai.com/v1"),
        openai_model: get_env_or_default("OPENAI_MODEL", "gpt-4.1-nano"),
        page_size: get_env_parsed("PAGE_SIZE", 50),
        session_ttl_secs: get_env_parsed("SESSION_TTL_SECS", 1800),
        recipe_collection: get_env_or_default("RECIPE_COLLECTION", "recipe-post-test"),
        fallback_recipe_collection: get_env_or_default("FALLBACK_RECIPE_COLLECTION", "recipe_post"),
    }
});

pub struct Config {
    pub mongo_uri: String,
    pub mongo_db_name: String,
    pub bind_addr: String,
    /// External search service. When unset the in-process engine answers `/search`.
    pub search_api_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
    pub page_size: i64,
    /// Feed and search sessions idle this long are dropped.
    pub session_ttl_secs: i64,
    pub recipe_collection: String,
    pub fallback_recipe_collection: String,
}

impl Config {
    /// Recipe collections in lookup order.
    pub fn recipe_collections(&self) -> Vec<String> {
        vec![
            self.recipe_collection.clone(),
            self.fallback_recipe_collection.clone(),
        ]
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parsed(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
