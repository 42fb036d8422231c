use mongodb::bson::DateTime;
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// A recipe "pin" as stored in the recipe collections.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: String,

    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Comma or newline separated ingredient names.
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_image: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
}

impl Recipe {
    pub fn new(draft: RecipeDraft, author: &Author) -> Recipe {
        Recipe {
            id: nanoid!(),
            title: draft.title,
            description: draft.description,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            image: draft.image,
            user_name: author.name.clone(),
            email: author.email.trim().to_lowercase(),
            user_image: author.image.clone(),
            tags: draft.tags,
            created_at: DateTime::now(),
        }
    }

    pub fn ingredient_list(&self) -> Vec<String> {
        self.ingredients
            .split([',', '\n'])
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    /// Text fed to the search index.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.ingredients,
            self.tags.join(" ")
        )
    }

    pub fn is_authored_by(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// The user-editable part of a recipe.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub instructions: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RecipeDraft {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.ingredients.trim().is_empty() {
            missing.push("ingredients");
        }
        if self.instructions.trim().is_empty() {
            missing.push("instructions");
        }
        missing
    }

    /// Trimmed, deduplicated tags in submission order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }
}

/// Identity asserted by the upstream session provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub email: String,
    pub name: String,
    pub image: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserInfo {
    #[serde(rename = "_id")]
    pub email: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_image: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub group_name: String,
    pub members: Vec<String>,
    pub created_at: DateTime,
}

impl ChatGroup {
    pub fn new(group_name: String, members: Vec<String>) -> ChatGroup {
        ChatGroup {
            id: nanoid!(),
            group_name,
            members,
            created_at: DateTime::now(),
        }
    }

    pub fn has_member(&self, email: &str) -> bool {
        self.members.iter().any(|m| m.eq_ignore_ascii_case(email))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub chat_id: String,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime,
}

impl ChatMessage {
    pub fn new(chat_id: String, sender: String, text: String) -> ChatMessage {
        ChatMessage {
            id: nanoid!(),
            chat_id,
            sender,
            text,
            timestamp: DateTime::now(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Favorite {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_email: String,
    pub recipe_id: String,
    pub created_at: DateTime,
}

impl Favorite {
    pub fn new(user_email: &str, recipe_id: &str) -> Favorite {
        Favorite {
            id: Self::key(user_email, recipe_id),
            user_email: user_email.to_lowercase(),
            recipe_id: recipe_id.to_string(),
            created_at: DateTime::now(),
        }
    }

    /// One favorite per (user, recipe).
    pub fn key(user_email: &str, recipe_id: &str) -> String {
        format!("{}:{}", user_email.to_lowercase(), recipe_id)
    }
}

/// Preferences the assistant folds into its system prompt. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub dietary_preferences: Option<Vec<String>>,
    #[serde(default)]
    pub allergies: Option<Vec<String>>,
    #[serde(default)]
    pub cooking_skill: Option<String>,
    #[serde(default)]
    pub preferred_cuisines: Option<Vec<String>>,
    #[serde(default)]
    pub health_conditions: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_list_splits_commas_and_lines() {
        let author = Author {
            email: "cook@example.com".into(),
            name: "Cook".into(),
            image: String::new(),
        };
        let recipe = Recipe::new(
            RecipeDraft {
                title: "Soup".into(),
                description: "Warm".into(),
                ingredients: "carrot, onion,\nleek ,, ".into(),
                instructions: "Boil".into(),
                ..Default::default()
            },
            &author,
        );
        assert_eq!(recipe.ingredient_list(), vec!["carrot", "onion", "leek"]);
        assert!(recipe.is_authored_by("COOK@example.com"));
    }

    #[test]
    fn new_recipe_stores_lowercase_email() {
        let author = Author {
            email: "Cook@Example.COM".into(),
            name: "Cook".into(),
            image: String::new(),
        };
        let recipe = Recipe::new(RecipeDraft::default(), &author);
        assert_eq!(recipe.email, "cook@example.com");
        assert!(recipe.is_authored_by("cook@EXAMPLE.com"));
    }

    #[test]
    fn draft_reports_missing_fields() {
        let draft = RecipeDraft {
            title: "  ".into(),
            description: "d".into(),
            ..Default::default()
        };
        assert_eq!(
            draft.missing_fields(),
            vec!["title", "ingredients", "instructions"]
        );
    }

    #[test]
    fn profile_accepts_nulls_and_missing_fields() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"age": null, "religion": "", "allergies": ["peanut"]}"#,
        )
        .unwrap();
        assert_eq!(profile.age, None);
        assert_eq!(profile.allergies, Some(vec!["peanut".to_string()]));
        assert_eq!(profile.dietary_preferences, None);
    }
}
