//! # Sample Fixtures
//!
//! Reusable schemas and documents for the self-test and the test suite.

use crate::client::SchemaField;
use serde_json::json;

/// Blog-post search schema: weighted title, content, tags, numeric score.
#[must_use]
pub fn blog_schema() -> Vec<SchemaField> {
    vec![
        SchemaField::text_with_weight("title", 5.0),
        SchemaField::text("content"),
        SchemaField::tag("tags"),
        SchemaField::numeric("doc_score"),
    ]
}

/// Sample blog post stored as hash fields.
#[must_use]
pub fn sample_blog_post() -> Vec<(String, String)> {
    vec![
        ("title".to_string(), "Redis Stack Tutorial".to_string()),
        (
            "content".to_string(),
            "Learn how to use Redis Stack with Rust".to_string(),
        ),
        ("tags".to_string(), "redis,rust,tutorial".to_string()),
        ("doc_score".to_string(), "0.8".to_string()),
    ]
}

/// Sample user document for JSON storage.
#[must_use]
pub fn sample_user() -> serde_json::Value {
    json!({
        "name": "John Doe",
        "email": "john@example.com",
        "profile": {
            "age": 30,
            "interests": ["Redis", "Rust", "AI"],
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn blog_schema_fields() {
        let schema = blog_schema();
        assert_eq!(schema.len(), 4);
        let names: Vec<&str> = schema.iter().map(SchemaField::name).collect();
        assert_eq!(names, vec!["title", "content", "tags", "doc_score"]);
    }

    #[test]
    fn sample_blog_post_covers_the_schema() {
        let post = sample_blog_post();
        let schema = blog_schema();
        for field in &schema {
            assert!(post.iter().any(|(name, _)| name == field.name()));
        }
        let (_, title) = post.first().unwrap();
        assert_eq!(title, "Redis Stack Tutorial");
    }

    #[test]
    fn sample_user_shape() {
        let user = sample_user();
        assert_eq!(user["name"], "John Doe");
        assert_eq!(user["profile"]["age"], 30);
        let interests = user["profile"]["interests"].as_array().unwrap();
        assert!(!interests.is_empty());
        assert!(interests.contains(&json!("Redis")));
    }
}
