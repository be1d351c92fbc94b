//! Core record type definitions.
//!
//! Defines [`EntityKind`] (the six entity tables), [`DocType`] (document
//! categories), [`NodeType`] (either side of a relationship), and the row
//! records [`Document`], [`Entity`] and [`Relationship`].

use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;

/// The six entity categories, each stored in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum EntityKind {
    Topic,
    Person,
    Project,
    Institution,
    Method,
    Application,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Topic,
        Self::Person,
        Self::Project,
        Self::Institution,
        Self::Method,
        Self::Application,
    ];

    /// Singular name, used as the relationship endpoint type and node id prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Person => "person",
            Self::Project => "project",
            Self::Institution => "institution",
            Self::Method => "method",
            Self::Application => "application",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Topic => "topics",
            Self::Person => "people",
            Self::Project => "projects",
            Self::Institution => "institutions",
            Self::Method => "methods",
            Self::Application => "applications",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = KnowledgeError;

    /// Accepts the singular name or the table name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.table() == s)
            .ok_or_else(|| KnowledgeError::UnknownEntityKind(s.to_string()))
    }
}

impl TryFrom<String> for EntityKind {
    type Error = KnowledgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DocType {
    Paper,
    DailyNote,
    WeeklyNote,
    MonthlyNote,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::DailyNote => "daily_note",
            Self::WeeklyNote => "weekly_note",
            Self::MonthlyNote => "monthly_note",
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocType {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paper" => Ok(Self::Paper),
            "daily_note" | "daily" => Ok(Self::DailyNote),
            "weekly_note" | "weekly" => Ok(Self::WeeklyNote),
            "monthly_note" | "monthly" => Ok(Self::MonthlyNote),
            _ => Err(KnowledgeError::UnknownDocType(s.to_string())),
        }
    }
}

impl TryFrom<String> for DocType {
    type Error = KnowledgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Either endpoint of a relationship: a document or an entity of some kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NodeType {
    Document,
    Entity(EntityKind),
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Entity(kind) => kind.as_str(),
        }
    }

    /// Prefix of the synthetic graph node id.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Document => "doc",
            Self::Entity(kind) => kind.as_str(),
        }
    }

    /// Table holding rows of this type.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Document => "documents",
            Self::Entity(kind) => kind.table(),
        }
    }

    /// Every endpoint type, documents first.
    pub fn all() -> impl Iterator<Item = NodeType> {
        std::iter::once(Self::Document).chain(EntityKind::ALL.into_iter().map(Self::Entity))
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" | "doc" => Ok(Self::Document),
            other => other.parse().map(Self::Entity),
        }
    }
}

impl From<NodeType> for String {
    fn from(t: NodeType) -> Self {
        t.as_str().to_string()
    }
}

impl TryFrom<String> for NodeType {
    type Error = KnowledgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Synthetic graph node id: `"{prefix}_{id}"`, e.g. `doc_12` or `topic_5`.
pub fn node_key(node_type: NodeType, id: i64) -> String {
    format!("{}_{}", node_type.prefix(), id)
}

/// A document row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub doc_type: DocType,
    pub title: String,
    /// ISO 8601 date of the note or publication, if known.
    pub date: Option<String>,
    pub source_path: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

/// A row from one of the entity tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub kind: EntityKind,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// A directed, typed relationship between two documents/entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub source_type: NodeType,
    pub source_id: i64,
    pub target_type: NodeType,
    pub target_id: i64,
    pub relationship_type: String,
    pub confidence: f64,
    pub evidence: Option<String>,
}

impl Relationship {
    pub fn source_key(&self) -> String {
        node_key(self.source_type, self.source_id)
    }

    pub fn target_key(&self) -> String {
        node_key(self.target_type, self.target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_keys_use_type_prefix() {
        assert_eq!(node_key(NodeType::Document, 1), "doc_1");
        assert_eq!(node_key(NodeType::Entity(EntityKind::Topic), 5), "topic_5");
        assert_eq!(node_key(NodeType::Entity(EntityKind::Person), 3), "person_3");
    }

    #[test]
    fn entity_kind_parses_singular_and_table_names() {
        assert_eq!("person".parse::<EntityKind>().unwrap(), EntityKind::Person);
        assert_eq!("people".parse::<EntityKind>().unwrap(), EntityKind::Person);
        assert!(matches!(
            "gadget".parse::<EntityKind>(),
            Err(KnowledgeError::UnknownEntityKind(_))
        ));
    }

    #[test]
    fn node_type_round_trips_through_strings() {
        for t in NodeType::all() {
            assert_eq!(t.as_str().parse::<NodeType>().unwrap(), t);
        }
        assert_eq!("doc".parse::<NodeType>().unwrap(), NodeType::Document);
    }

    #[test]
    fn doc_type_accepts_short_aliases() {
        assert_eq!("weekly".parse::<DocType>().unwrap(), DocType::WeeklyNote);
        assert_eq!(DocType::MonthlyNote.as_str(), "monthly_note");
        assert!("memo".parse::<DocType>().is_err());
    }

    #[test]
    fn serde_accepts_aliases_and_writes_canonical_names() {
        let kind: EntityKind = serde_json::from_str("\"topics\"").unwrap();
        assert_eq!(kind, EntityKind::Topic);
        let doc: DocType = serde_json::from_str("\"daily\"").unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), "\"daily_note\"");
        assert!(serde_json::from_str::<DocType>("\"memo\"").is_err());
    }
}
