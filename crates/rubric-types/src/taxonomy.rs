//! Taxonomy levels and node types.
//!
//! The target taxonomy is a fixed four-level hierarchy: section (a single
//! uppercase letter, e.g. `C`) → class (`26`) → subclass (`26.51`) →
//! group (`26.51.52`). Nodes are immutable after load; the tree itself
//! lives in `rubric-core` — this crate only defines the value types.

use serde::{Deserialize, Serialize};

/// A depth in the classification hierarchy.
///
/// The numeric representation (0..=3) matches the `level` field of the
/// persisted taxonomy dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Level 0: single-letter section, e.g. `C`.
    Section,
    /// Level 1: two-digit class, e.g. `26`.
    Class,
    /// Level 2: subclass, e.g. `26.51`.
    Subclass,
    /// Level 3: leaf group, e.g. `26.51.52`.
    Group,
}

impl Level {
    /// All levels in descent order.
    pub const ALL: [Level; 4] = [Level::Section, Level::Class, Level::Subclass, Level::Group];

    /// The zero-based depth of this level.
    pub fn index(self) -> usize {
        match self {
            Level::Section => 0,
            Level::Class => 1,
            Level::Subclass => 2,
            Level::Group => 3,
        }
    }

    /// Convert a dump depth (0..=3) back to a level.
    pub fn from_index(index: usize) -> Option<Level> {
        Level::ALL.get(index).copied()
    }

    /// Human-readable level name used in prompts and logs.
    pub fn name(self) -> &'static str {
        match self {
            Level::Section => "section",
            Level::Class => "class",
            Level::Subclass => "subclass",
            Level::Group => "group",
        }
    }

    /// The next level down, or `None` at the leaves.
    pub fn next(self) -> Option<Level> {
        Level::from_index(self.index() + 1)
    }

    /// Whether this is the leaf level.
    pub fn is_leaf(self) -> bool {
        self == Level::Group
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single taxonomy node. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    /// Unique dotted code (`26.51.52`), or a single letter for sections.
    pub code: String,

    /// Display name of the node.
    pub name: String,

    /// Depth of this node in the hierarchy.
    pub level: Level,

    /// Code of the enclosing node. `None` only for sections.
    #[serde(alias = "parentCode")]
    pub parent_code: Option<String>,
}

/// A raw record as it appears in the persisted taxonomy dump.
///
/// The dump stores the level as a bare integer and may leave
/// `parent_code` empty for two-digit classes (the loader attaches those
/// to the most recently seen section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyRecord {
    /// Dotted code.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Parent code; empty string means "not recorded in the dump".
    #[serde(default, alias = "parentCode")]
    pub parent_code: String,

    /// Depth, 0..=3.
    pub level: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_index_roundtrip() {
        for level in Level::ALL {
            assert_eq!(Level::from_index(level.index()), Some(level));
        }
        assert_eq!(Level::from_index(4), None);
    }

    #[test]
    fn level_descent_order() {
        assert_eq!(Level::Section.next(), Some(Level::Class));
        assert_eq!(Level::Class.next(), Some(Level::Subclass));
        assert_eq!(Level::Subclass.next(), Some(Level::Group));
        assert_eq!(Level::Group.next(), None);
        assert!(Level::Group.is_leaf());
        assert!(!Level::Section.is_leaf());
    }

    #[test]
    fn level_names() {
        assert_eq!(Level::Section.name(), "section");
        assert_eq!(Level::Group.to_string(), "group");
    }

    #[test]
    fn record_accepts_camel_case_parent() {
        let rec: TaxonomyRecord =
            serde_json::from_str(r#"{"code":"26","name":"Computers","parentCode":"C","level":1}"#)
                .unwrap();
        assert_eq!(rec.parent_code, "C");
        assert_eq!(rec.level, 1);
    }

    #[test]
    fn record_parent_defaults_to_empty() {
        let rec: TaxonomyRecord =
            serde_json::from_str(r#"{"code":"C","name":"Manufacturing","level":0}"#).unwrap();
        assert!(rec.parent_code.is_empty());
    }

    #[test]
    fn node_serde_roundtrip() {
        let node = TaxonomyNode {
            code: "26.51".into(),
            name: "Measuring instruments".into(),
            level: Level::Subclass,
            parent_code: Some("26".into()),
        };
        let json = serde_json::to_string(&node).unwrap();
        let parsed: TaxonomyNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, parsed);
    }
}
