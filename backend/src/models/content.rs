//! Editorial content model shared by the learning, gallery and media pages.

use serde::{Deserialize, Serialize};

/// Display category a content item belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Learning,
    Galleries,
    Media,
}

impl PageType {
    pub const ALL: [PageType; 3] = [PageType::Learning, PageType::Galleries, PageType::Media];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Learning => "learning",
            PageType::Galleries => "galleries",
            PageType::Media => "media",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "learning" => Some(PageType::Learning),
            "galleries" => Some(PageType::Galleries),
            "media" => Some(PageType::Media),
            _ => None,
        }
    }
}

/// A published content entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub page_type: PageType,
    pub title: String,
    pub excerpt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub date: String,
    pub author: String,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied when creating content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Request body for creating content through the admin API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentRequest {
    pub page_type: PageType,
    #[serde(flatten)]
    pub fields: ContentFields,
}

/// Partial update of a content item. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl UpdateContentRequest {
    /// Merge this patch into an existing item, stamping `updated_at`.
    pub fn apply(&self, item: &mut ContentItem, now: &str) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            item.excerpt = excerpt.clone();
        }
        if let Some(content) = &self.content {
            item.content = Some(content.clone());
        }
        if let Some(image_url) = &self.image_url {
            item.image_url = Some(image_url.clone());
        }
        if let Some(link) = &self.link {
            item.link = Some(link.clone());
        }
        if let Some(date) = &self.date {
            item.date = date.clone();
        }
        if let Some(author) = &self.author {
            item.author = author.clone();
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        item.updated_at = now.to_string();
    }
}
