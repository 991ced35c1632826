//! Sermon model
//!
//! Sermons arrive as finished records (the generator is an external
//! collaborator); locally they are stored with the structured `content`,
//! `source_verses`, and `tags` fields serialized into JSON text columns and
//! validated against these types on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::models::{RecordId, SyncStatus, UserId};

/// Default sermon language.
pub const DEFAULT_LANGUAGE: &str = "telugu";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SermonType {
    Expository,
    Topical,
    Narrative,
    Devotional,
}

impl SermonType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expository => "expository",
            Self::Topical => "topical",
            Self::Narrative => "narrative",
            Self::Devotional => "devotional",
        }
    }
}

impl fmt::Display for SermonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SermonType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expository" => Ok(Self::Expository),
            "topical" => Ok(Self::Topical),
            "narrative" => Ok(Self::Narrative),
            "devotional" => Ok(Self::Devotional),
            other => Err(Error::InvalidInput(format!("unknown sermon type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetAudience {
    General,
    Youth,
    Children,
    Adults,
    Seniors,
}

impl TargetAudience {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Youth => "youth",
            Self::Children => "children",
            Self::Adults => "adults",
            Self::Seniors => "seniors",
        }
    }
}

impl fmt::Display for TargetAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetAudience {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "youth" => Ok(Self::Youth),
            "children" => Ok(Self::Children),
            "adults" => Ok(Self::Adults),
            "seniors" => Ok(Self::Seniors),
            other => Err(Error::InvalidInput(format!(
                "unknown target audience: {other}"
            ))),
        }
    }
}

/// A reference to one verse or a contiguous range within a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseReference {
    pub book_id: i64,
    pub chapter: i64,
    pub verse_start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse_end: Option<i64>,
}

/// One main point of a sermon outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SermonPoint {
    pub point: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration: Option<String>,
}

/// Structured sermon body, stored as one JSON text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SermonContent {
    pub title: String,
    pub introduction: String,
    pub main_points: Vec<SermonPoint>,
    pub application: String,
    pub conclusion: String,
    pub prayer_points: Vec<String>,
}

/// A generated sermon owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sermon {
    pub id: RecordId,
    pub user_id: UserId,
    pub title: String,
    pub content: SermonContent,
    pub source_verses: Vec<VerseReference>,
    pub sermon_type: SermonType,
    pub target_audience: TargetAudience,
    pub language: String,
    pub ai_model_used: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Parameters for storing a finished sermon record.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSermon {
    pub title: String,
    pub content: SermonContent,
    pub source_verses: Vec<VerseReference>,
    pub sermon_type: SermonType,
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub ai_model_used: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Fields a sermon update may rewrite; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SermonPatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Sermon {
    /// Build a fresh pending sermon owned by `user_id`.
    #[must_use]
    pub fn new(user_id: UserId, params: NewSermon) -> Self {
        let now = crate::util::now();
        Self {
            id: RecordId::new(),
            user_id,
            title: params.title,
            content: params.content,
            source_verses: params.source_verses,
            sermon_type: params.sermon_type,
            target_audience: params.target_audience,
            language: params
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            ai_model_used: params.ai_model_used,
            tags: params.tags,
            created_at: now,
            updated_at: now,
            sync_status: SyncStatus::Pending,
            last_synced_at: None,
        }
    }

    /// The row shape pushed to the remote `sermons` table, with the embedded
    /// JSON sub-fields expanded back into structured values.
    #[must_use]
    pub fn remote_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id.as_str(),
            "user_id": self.user_id.as_str(),
            "title": self.title,
            "content": self.content,
            "source_verses": self.source_verses,
            "sermon_type": self.sermon_type,
            "target_audience": self.target_audience,
            "language": self.language,
            "ai_model_used": self.ai_model_used,
            "tags": self.tags,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_content() -> SermonContent {
        SermonContent {
            title: "The Good Shepherd".to_string(),
            introduction: "intro".to_string(),
            main_points: vec![SermonPoint {
                point: "He knows his sheep".to_string(),
                explanation: "explanation".to_string(),
                illustration: None,
            }],
            application: "application".to_string(),
            conclusion: "conclusion".to_string(),
            prayer_points: vec!["prayer".to_string()],
        }
    }

    #[test]
    fn content_json_round_trip() {
        let content = sample_content();
        let raw = serde_json::to_string(&content).unwrap();
        let parsed: SermonContent = serde_json::from_str(&raw).unwrap();
        assert_eq!(content, parsed);
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(SermonType::Expository).unwrap(),
            serde_json::json!("expository")
        );
        assert_eq!(
            serde_json::to_value(TargetAudience::Youth).unwrap(),
            serde_json::json!("youth")
        );
        assert_eq!("devotional".parse::<SermonType>().unwrap(), SermonType::Devotional);
    }

    #[test]
    fn new_sermon_defaults_language() {
        let sermon = Sermon::new(
            UserId::from("user-1"),
            NewSermon {
                title: "t".to_string(),
                content: sample_content(),
                source_verses: vec![VerseReference {
                    book_id: 43,
                    chapter: 10,
                    verse_start: 11,
                    verse_end: Some(18),
                }],
                sermon_type: SermonType::Expository,
                target_audience: TargetAudience::General,
                language: None,
                ai_model_used: None,
                tags: None,
            },
        );
        assert_eq!(sermon.language, DEFAULT_LANGUAGE);
        assert_eq!(sermon.sync_status, SyncStatus::Pending);
    }
}
