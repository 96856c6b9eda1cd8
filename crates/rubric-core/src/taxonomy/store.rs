//! In-memory taxonomy store.
//!
//! The loader is the sole writer: [`Taxonomy::from_records`] materializes
//! the dump into an ordered forest plus a `code → node` index and a
//! `parent → children` index, then the tree is shared read-only by all
//! workers. No locks are needed after construction.
//!
//! Parent normalization: sections own the two-digit classes that follow
//! them in the dump, so a level-1 record arriving with an empty
//! `parent_code` is attached to the most recently seen section.

use std::collections::HashMap;

use rubric_types::{ClassifyError, Level, Result, TaxonomyNode, TaxonomyRecord};

/// The immutable taxonomy tree.
pub struct Taxonomy {
    /// All nodes, in dump order.
    nodes: Vec<TaxonomyNode>,
    /// code → index into `nodes`.
    by_code: HashMap<String, usize>,
    /// parent code → child indexes, in dump order. Roots live under "".
    children: HashMap<String, Vec<usize>>,
}

impl Taxonomy {
    /// Materialize the tree from raw dump records.
    ///
    /// Fails when a code repeats, a level is out of range, a non-section
    /// record has no resolvable parent, or a child's level is not its
    /// parent's level + 1.
    pub fn from_records(records: Vec<TaxonomyRecord>) -> Result<Self> {
        let mut nodes: Vec<TaxonomyNode> = Vec::with_capacity(records.len());
        let mut by_code: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for record in records {
            let level = Level::from_index(record.level as usize).ok_or_else(|| {
                ClassifyError::TaxonomyLoad(format!(
                    "node '{}' has out-of-range level {}",
                    record.code, record.level
                ))
            })?;

            let parent_code = match level {
                Level::Section => {
                    current_section = Some(record.code.clone());
                    None
                }
                Level::Class if record.parent_code.is_empty() => {
                    // Dump omits the section link for two-digit classes;
                    // the enclosing section is the last one seen.
                    Some(current_section.clone().ok_or_else(|| {
                        ClassifyError::TaxonomyLoad(format!(
                            "class '{}' appears before any section",
                            record.code
                        ))
                    })?)
                }
                _ if record.parent_code.is_empty() => {
                    return Err(ClassifyError::TaxonomyLoad(format!(
                        "node '{}' at level {} has no parent code",
                        record.code, level
                    )));
                }
                _ => Some(record.parent_code.clone()),
            };

            let index = nodes.len();
            if by_code.insert(record.code.clone(), index).is_some() {
                return Err(ClassifyError::TaxonomyLoad(format!(
                    "duplicate code '{}'",
                    record.code
                )));
            }

            children
                .entry(parent_code.clone().unwrap_or_default())
                .or_default()
                .push(index);

            nodes.push(TaxonomyNode {
                code: record.code,
                name: record.name,
                level,
                parent_code,
            });
        }

        let taxonomy = Self {
            nodes,
            by_code,
            children,
        };
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Post-load validation: every parent resolves and sits one level up.
    fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            let Some(parent_code) = &node.parent_code else {
                continue;
            };
            let parent = self.node_by_code(parent_code).ok_or_else(|| {
                ClassifyError::TaxonomyLoad(format!(
                    "node '{}' references unknown parent '{}'",
                    node.code, parent_code
                ))
            })?;
            if parent.level.index() + 1 != node.level.index() {
                return Err(ClassifyError::TaxonomyLoad(format!(
                    "node '{}' at level {} under parent '{}' at level {}",
                    node.code, node.level, parent.code, parent.level
                )));
            }
        }
        Ok(())
    }

    /// The children of `parent_code` at `level`. The empty parent code
    /// with `Level::Section` selects the forest roots.
    ///
    /// Returns [`ClassifyError::TaxonomyGap`] when no children exist —
    /// the taxonomy shape says every non-terminal parent has some.
    pub fn children_of(&self, parent_code: &str, level: Level) -> Result<Vec<&TaxonomyNode>> {
        let gap = || ClassifyError::TaxonomyGap {
            parent_code: parent_code.to_string(),
            level,
        };

        let indexes = self.children.get(parent_code).ok_or_else(gap)?;
        let matched: Vec<&TaxonomyNode> = indexes
            .iter()
            .map(|&i| &self.nodes[i])
            .filter(|n| n.level == level)
            .collect();

        if matched.is_empty() {
            return Err(gap());
        }
        Ok(matched)
    }

    /// Look up a node by its code.
    pub fn node_by_code(&self, code: &str) -> Option<&TaxonomyNode> {
        self.by_code.get(code).map(|&i| &self.nodes[i])
    }

    /// Whether a code exists in the taxonomy.
    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// The root-to-node path for `code`, or `None` when the code (or any
    /// ancestor link) is unknown.
    pub fn path_to(&self, code: &str) -> Option<Vec<&TaxonomyNode>> {
        let mut path = Vec::new();
        let mut current = self.node_by_code(code)?;
        loop {
            path.push(current);
            match &current.parent_code {
                Some(parent) => current = self.node_by_code(parent)?,
                None => break,
            }
        }
        path.reverse();
        Some(path)
    }

    /// Whether `code` names a direct child of `parent_code`.
    pub fn is_child_of(&self, code: &str, parent_code: &str) -> bool {
        self.node_by_code(code)
            .map(|n| n.parent_code.as_deref().unwrap_or("") == parent_code)
            .unwrap_or(false)
    }

    /// Total node count.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the taxonomy holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Debug for Taxonomy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Taxonomy")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.children.get("").map_or(0, Vec::len))
            .finish()
    }
}
