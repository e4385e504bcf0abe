use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created: String,
    pub modified: String,
    pub user_id: String,
}

impl Article {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// A stored account. `password` is the hash only, `salt` is kept alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub password: String,
    pub salt: String,
    pub created: String,
    pub modified: String,
}

/// The view of a user that leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub email_verified: bool,
    pub created: String,
    pub modified: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            created: user.created.clone(),
            modified: user.modified.clone(),
        }
    }
}

/// The whole on-disk document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub users: Vec<User>,
    // Carried through untouched; nothing reads it yet.
    #[serde(default)]
    pub tokens: Vec<serde_json::Value>,
}

impl Database {
    pub fn next_article_id(&self) -> String {
        next_id(self.articles.iter().map(|a| a.id.as_str()))
    }

    pub fn next_user_id(&self) -> String {
        next_id(self.users.iter().map(|u| u.id.as_str()))
    }

    pub fn articles_for(&self, user_id: &str) -> Vec<Article> {
        self.articles
            .iter()
            .filter(|a| a.is_owned_by(user_id))
            .cloned()
            .collect()
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    /// True when some user other than `except_id` already has `email`.
    pub fn email_in_use(&self, email: &str, except_id: Option<&str>) -> bool {
        self.users
            .iter()
            .any(|u| u.email == email && Some(u.id.as_str()) != except_id)
    }
}

/// Ids are decimal strings. Anything that does not parse is ignored.
fn next_id<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let max = ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0);
    (max + 1).to_string()
}

/// Whether a path segment is usable as a record id.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TokenPurpose {
    Auth,
    Verify,
}
