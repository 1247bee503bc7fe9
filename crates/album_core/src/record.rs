use serde::{Deserialize, Serialize};

/// One successfully extracted article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub title: String,
    /// Markdown document: heading, optional metadata block, converted body.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    pub url: String,
    #[serde(default)]
    pub images: Vec<String>,
}
