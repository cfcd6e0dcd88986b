//! File tree model.
//!
//! A [`TreeNode`] hierarchy is assembled from the flat list of member paths
//! a file walk produces (`"group"`, `"group/data"`, ...). Each path is
//! attached under the node named by its parent path, so the walk order only
//! has to visit parents before children; missing intermediate groups are
//! created on demand.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a tree node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum NodeKind {
    /// The root of an open file.
    File,
    Group,
    /// A dataset with its shape and element type name.
    Dataset { shape: Vec<usize>, dtype: String },
}

/// One node of a file tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeNode {
    /// Last path segment, or the file name for the root.
    pub name: String,
    /// Absolute member path (`/` for the root).
    pub path: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Root node of a file.
    #[must_use]
    pub fn root(file_name: &str) -> Self {
        Self {
            name: file_name.to_string(),
            path: "/".to_string(),
            kind: NodeKind::File,
            children: Vec::new(),
        }
    }

    /// Build a tree from `(path, kind)` pairs in walk order.
    #[must_use]
    pub fn from_paths<I, S>(file_name: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, NodeKind)>,
        S: AsRef<str>,
    {
        let mut root = Self::root(file_name);
        for (path, kind) in entries {
            root.insert(path.as_ref(), kind);
        }
        root
    }

    /// Attach `path` below this node, creating parent groups as needed.
    ///
    /// Inserting an existing path replaces its kind and keeps its children.
    pub fn insert(&mut self, path: &str, kind: NodeKind) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            log::debug!("ignoring empty tree path {path:?}");
            return;
        };

        let mut node = self;
        let mut prefix = String::new();
        for segment in parents {
            prefix.push('/');
            prefix.push_str(segment);
            let index = if let Some(i) = node.children.iter().position(|c| c.name == *segment) {
                i
            } else {
                log::debug!("creating missing parent group {prefix}");
                node.children.push(Self {
                    name: (*segment).to_string(),
                    path: prefix.clone(),
                    kind: NodeKind::Group,
                    children: Vec::new(),
                });
                node.children.len() - 1
            };
            node = &mut node.children[index];
        }

        prefix.push('/');
        prefix.push_str(last);
        if let Some(existing) = node.children.iter_mut().find(|c| c.name == *last) {
            existing.kind = kind;
        } else {
            node.children.push(Self {
                name: (*last).to_string(),
                path: prefix,
                kind,
                children: Vec::new(),
            });
        }
    }

    /// Node at an absolute or relative member path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| {
                node.children.iter().find(|c| c.name == segment)
            })
    }

    #[must_use]
    pub fn is_dataset(&self) -> bool {
        matches!(self.kind, NodeKind::Dataset { .. })
    }

    /// Number of nodes below this one.
    #[must_use]
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Indented text listing, one node per line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let line = match &self.kind {
            NodeKind::File => format!("{indent}{}\n", self.name),
            NodeKind::Group => format!("{indent}{}/\n", self.name),
            NodeKind::Dataset { shape, dtype } => {
                format!("{indent}{}  {}  {dtype}\n", self.name, format_shape(shape))
            }
        };
        out.push_str(&line);
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Shape as `(3, 4)`, `(10,)` or `scalar`.
#[must_use]
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "scalar".to_string(),
        [n] => format!("({n},)"),
        _ => {
            let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
            format!("({})", dims.join(", "))
        }
    }
}
