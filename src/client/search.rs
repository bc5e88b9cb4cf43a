//! # Search Operations
//!
//! RediSearch index management and querying.
//!
//! The `redis` crate has no typed bindings for the search module, so the
//! commands are issued raw (`FT.CREATE`, `FT.DROPINDEX`, `FT.SEARCH`) and
//! the replies parsed here. Reply parsing targets the RESP2 shapes the
//! client library speaks by default.

use crate::client::{StackClient, value_to_f64, value_to_string, value_to_u64};
use crate::error::{StackError, StackResult};
use redis::{AsyncCommands, Value};
use std::collections::HashMap;

/// A field in a search index schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaField {
    /// Full-text field with an optional scoring weight.
    Text {
        /// Field name.
        name: String,
        /// Scoring weight; server default is 1.0 when absent.
        weight: Option<f64>,
    },
    /// Tag field (exact-match, comma-separated values).
    Tag {
        /// Field name.
        name: String,
    },
    /// Numeric field.
    Numeric {
        /// Field name.
        name: String,
    },
}

impl SchemaField {
    /// Creates a text field.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            weight: None,
        }
    }

    /// Creates a text field with a scoring weight.
    #[must_use]
    pub fn text_with_weight(name: impl Into<String>, weight: f64) -> Self {
        Self::Text {
            name: name.into(),
            weight: Some(weight),
        }
    }

    /// Creates a tag field.
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag { name: name.into() }
    }

    /// Creates a numeric field.
    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        Self::Numeric { name: name.into() }
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::Tag { name } | Self::Numeric { name } => name,
        }
    }

    /// Renders this field's `FT.CREATE ... SCHEMA` arguments.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Text { name, weight } => {
                let mut args = vec![name.clone(), "TEXT".to_string()];
                if let Some(weight) = weight {
                    args.push("WEIGHT".to_string());
                    args.push(weight.to_string());
                }
                args
            }
            Self::Tag { name } => vec![name.clone(), "TAG".to_string()],
            Self::Numeric { name } => vec![name.clone(), "NUMERIC".to_string()],
        }
    }
}

/// A single document in a search reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDoc {
    /// Document key.
    pub id: String,
    /// Relevance score (queries run `WITHSCORES`).
    pub score: Option<f64>,
    /// Stored field values.
    pub fields: HashMap<String, String>,
}

/// Parsed `FT.SEARCH` reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchReply {
    /// Total number of matching documents.
    pub total: u64,
    /// Returned documents.
    pub docs: Vec<SearchDoc>,
}

impl SearchReply {
    /// Returns whether a document with the given key was returned.
    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.docs.iter().any(|doc| doc.id == id)
    }
}

impl StackClient {
    /// Creates a search index over hash keys with the given prefix.
    ///
    /// Issues `FT.CREATE <index> ON HASH PREFIX 1 <prefix> SCHEMA ...`.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails, including
    /// when the index already exists.
    pub async fn create_search_index(
        &self,
        index: &str,
        prefix: &str,
        schema: &[SchemaField],
    ) -> StackResult<()> {
        let mut cmd = redis::cmd("FT.CREATE");
        cmd.arg(index)
            .arg("ON")
            .arg("HASH")
            .arg("PREFIX")
            .arg(1)
            .arg(prefix)
            .arg("SCHEMA");
        for field in schema {
            for arg in field.args() {
                cmd.arg(arg);
            }
        }

        let mut conn = self.connection();
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    /// Drops a search index. Dropping an index that does not exist is a
    /// no-op; every other failure propagates.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] for failures other than an unknown
    /// index.
    pub async fn drop_search_index(&self, index: &str) -> StackResult<()> {
        let mut conn = self.connection();
        let dropped: Result<(), redis::RedisError> = redis::cmd("FT.DROPINDEX")
            .arg(index)
            .query_async(&mut conn)
            .await;
        match dropped {
            Ok(()) => Ok(()),
            Err(e) if is_unknown_index(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stores a document as a hash so the index with a matching prefix
    /// picks it up.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails.
    pub async fn add_document(&self, key: &str, fields: &[(String, String)]) -> StackResult<()> {
        let mut conn = self.connection();
        let _: () = conn.hset_multiple(key, fields).await?;
        Ok(())
    }

    /// Runs a search query with scores and parses the reply.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Command`] when the command fails, or
    /// [`StackError::Reply`] when the reply cannot be parsed.
    pub async fn search(&self, index: &str, query: &str) -> StackResult<SearchReply> {
        let mut conn = self.connection();
        let raw: Value = redis::cmd("FT.SEARCH")
            .arg(index)
            .arg(query)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;
        parse_search_reply(&raw)
    }
}

/// Matches the error RediSearch raises for a missing index, across the
/// wordings different module versions use.
fn is_unknown_index(error: &redis::RedisError) -> bool {
    let detail = error.detail().unwrap_or_default().to_ascii_lowercase();
    detail.contains("unknown index") || detail.contains("no such index")
}

/// Parses a `FT.SEARCH ... WITHSCORES` RESP2 reply.
///
/// Shape: `[total, key, score, [field, value, ...], key, score, ...]`.
fn parse_search_reply(value: &Value) -> StackResult<SearchReply> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(StackError::reply(format!(
                "FT.SEARCH did not return an array: {other:?}"
            )));
        }
    };

    let mut iter = items.iter();
    let total = iter
        .next()
        .and_then(value_to_u64)
        .ok_or_else(|| StackError::reply("FT.SEARCH reply missing the total count"))?;

    let mut docs = Vec::new();
    while let Some(id_value) = iter.next() {
        let id = value_to_string(id_value)
            .ok_or_else(|| StackError::reply("FT.SEARCH document key is not a string"))?;
        let score = iter
            .next()
            .ok_or_else(|| StackError::reply(format!("FT.SEARCH reply truncated after key {id}")))
            .map(value_to_f64)?;
        let fields_value = iter
            .next()
            .ok_or_else(|| StackError::reply(format!("FT.SEARCH reply missing fields for {id}")))?;
        let fields = parse_field_pairs(fields_value)?;
        docs.push(SearchDoc { id, score, fields });
    }

    Ok(SearchReply { total, docs })
}

/// Parses the per-document field list: alternating names and values.
fn parse_field_pairs(value: &Value) -> StackResult<HashMap<String, String>> {
    let mut fields = HashMap::new();
    match value {
        Value::Array(items) => {
            for pair in items.chunks(2) {
                if let [field, val] = pair {
                    if let (Some(field), Some(val)) =
                        (value_to_string(field), value_to_string(val))
                    {
                        fields.insert(field, val);
                    }
                }
            }
        }
        Value::Map(pairs) => {
            for (field, val) in pairs {
                if let (Some(field), Some(val)) = (value_to_string(field), value_to_string(val)) {
                    fields.insert(field, val);
                }
            }
        }
        Value::Nil => {}
        other => {
            return Err(StackError::reply(format!(
                "unexpected document field list: {other:?}"
            )));
        }
    }
    Ok(fields)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn text_field_args() {
        assert_eq!(SchemaField::text("content").args(), vec!["content", "TEXT"]);
    }

    #[test]
    fn weighted_text_field_args() {
        assert_eq!(
            SchemaField::text_with_weight("title", 5.0).args(),
            vec!["title", "TEXT", "WEIGHT", "5"]
        );
    }

    #[test]
    fn tag_and_numeric_field_args() {
        assert_eq!(SchemaField::tag("tags").args(), vec!["tags", "TAG"]);
        assert_eq!(
            SchemaField::numeric("doc_score").args(),
            vec!["doc_score", "NUMERIC"]
        );
    }

    #[test]
    fn field_names() {
        assert_eq!(SchemaField::text_with_weight("title", 5.0).name(), "title");
        assert_eq!(SchemaField::tag("tags").name(), "tags");
        assert_eq!(SchemaField::numeric("doc_score").name(), "doc_score");
    }

    #[test]
    fn parse_empty_reply() {
        let reply = Value::Array(vec![Value::Int(0)]);
        let parsed = parse_search_reply(&reply).unwrap();
        assert_eq!(parsed.total, 0);
        assert!(parsed.docs.is_empty());
    }

    #[test]
    fn parse_reply_with_scores_and_fields() {
        let reply = Value::Array(vec![
            Value::Int(2),
            bulk("blog:1"),
            bulk("1.5"),
            Value::Array(vec![
                bulk("title"),
                bulk("Redis Stack Tutorial"),
                bulk("doc_score"),
                bulk("0.8"),
            ]),
            bulk("blog:2"),
            bulk("0.5"),
            Value::Array(vec![bulk("title"), bulk("Advanced Redis Patterns")]),
        ]);

        let parsed = parse_search_reply(&reply).unwrap();
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.docs.len(), 2);
        assert!(parsed.contains_id("blog:1"));
        assert!(parsed.contains_id("blog:2"));
        assert!(!parsed.contains_id("blog:3"));

        let first = parsed.docs.first().unwrap();
        assert_eq!(first.score, Some(1.5));
        assert_eq!(
            first.fields.get("title").map(String::as_str),
            Some("Redis Stack Tutorial")
        );
    }

    #[test]
    fn parse_reply_with_nil_fields() {
        let reply = Value::Array(vec![Value::Int(1), bulk("blog:1"), bulk("1"), Value::Nil]);
        let parsed = parse_search_reply(&reply).unwrap();
        assert!(parsed.docs.first().unwrap().fields.is_empty());
    }

    #[test]
    fn truncated_reply_is_an_error() {
        let reply = Value::Array(vec![Value::Int(1), bulk("blog:1")]);
        assert!(parse_search_reply(&reply).is_err());
    }

    #[test]
    fn scalar_reply_is_an_error() {
        assert!(parse_search_reply(&Value::Okay).is_err());
    }
}
