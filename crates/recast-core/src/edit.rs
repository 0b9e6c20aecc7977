//! Edit trees.
//!
//! Edits live in an arena ([`EditTree`]) and are addressed by [`EditId`]. Nodes
//! are created detached and attached with [`EditTree::add_child`], which is the
//! only place the tree invariants are checked:
//! - a child's region is covered (closed containment) by its parent's region
//! - siblings never overlap; they may touch, but two insertions at the same
//!   offset are an overlap because their order would be ambiguous
//! - insert, copy and move edits are leaves
//!
//! A tree that was built successfully is therefore always well formed; apply
//! never repairs or reorders anything.

use thiserror::Error;

use crate::Region;

/// Handle to a node in an [`EditTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EditId(u32);

impl EditId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditKind {
    /// Container without text of its own; the gaps between its children are
    /// copied through unchanged. Tree roots are groups.
    Group,
    Insert {
        text: String,
    },
    /// Removes the region. With children, only the gaps between them are removed.
    Delete,
    /// Replaces the region with `text`. With children, `text` is emitted at the
    /// start of the region, the gaps are removed and the children apply inside
    /// their own regions.
    Replace {
        text: String,
    },
    /// Inserts a copy of the node's region at `target`; the source stays in place.
    Copy {
        target: usize,
    },
    /// Removes the node's region and inserts it again at `target`.
    Move {
        target: usize,
    },
}

impl EditKind {
    pub fn label(&self) -> &'static str {
        match self {
            EditKind::Group => "group",
            EditKind::Insert { .. } => "insert",
            EditKind::Delete => "delete",
            EditKind::Replace { .. } => "replace",
            EditKind::Copy { .. } => "copy",
            EditKind::Move { .. } => "move",
        }
    }

    fn accepts_children(&self) -> bool {
        matches!(
            self,
            EditKind::Group | EditKind::Delete | EditKind::Replace { .. }
        )
    }

    /// Insertion point of a copy or move.
    pub fn target(&self) -> Option<usize> {
        match self {
            EditKind::Copy { target } | EditKind::Move { target } => Some(*target),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditNode {
    kind: EditKind,
    region: Region,
    parent: Option<EditId>,
    children: Vec<EditId>,
}

impl EditNode {
    pub fn kind(&self) -> &EditKind {
        &self.kind
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn parent(&self) -> Option<EditId> {
        self.parent
    }

    /// Children ordered by offset.
    pub fn children(&self) -> &[EditId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEditError {
    #[error("edit {child:?} already has a parent")]
    AlreadyAttached { child: EditId },
    #[error("the root edit cannot become a child")]
    RootAsChild,
    #[error("attaching {child:?} below {parent:?} would create a cycle")]
    Cycle { parent: EditId, child: EditId },
    #[error("{kind} edit {parent:?} cannot have children")]
    LeafOnly { parent: EditId, kind: &'static str },
    #[error("edit region {region} is outside of its parent region {parent_region}")]
    OutOfBounds { region: Region, parent_region: Region },
    #[error("edit region {region} overlaps sibling {sibling:?} at {sibling_region}")]
    Overlap {
        region: Region,
        sibling: EditId,
        sibling_region: Region,
    },
    #[error("target offset {target} is outside of the edit scope {scope}")]
    TargetOutOfScope { target: usize, scope: Region },
}

/// Sibling conflict test. Non-empty regions may touch; an insertion point
/// conflicts with a region that strictly contains it and with another insertion
/// at the same offset.
fn conflicts(a: Region, b: Region) -> bool {
    match (a.is_empty(), b.is_empty()) {
        (false, false) => a.overlaps(b),
        (true, true) => a.start() == b.start(),
        (true, false) => b.start() < a.start() && a.start() < b.end(),
        (false, true) => a.start() < b.start() && b.start() < a.end(),
    }
}

/// Arena of edit nodes rooted at a [`EditKind::Group`] that spans the edit scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditTree {
    nodes: Vec<EditNode>,
}

impl EditTree {
    /// Creates a tree whose root covers `[0, scope_len)`, usually the length of the
    /// buffer the tree will be applied to.
    pub fn new(scope_len: usize) -> Self {
        Self {
            nodes: vec![EditNode {
                kind: EditKind::Group,
                region: Region::new(0, scope_len),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    #[inline]
    pub fn root(&self) -> EditId {
        EditId(0)
    }

    /// Region covered by the root.
    pub fn scope(&self) -> Region {
        self.nodes[0].region
    }

    /// Number of nodes, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no children, i.e. applying the tree is a no-op.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `id` was not handed out by this tree.
    pub fn node(&self, id: EditId) -> &EditNode {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: EditId) -> &[EditId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: EditId) -> Option<EditId> {
        self.node(id).parent
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: EditId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn insert(&mut self, offset: usize, text: impl Into<String>) -> EditId {
        self.push(EditKind::Insert { text: text.into() }, Region::empty(offset))
    }

    pub fn delete(&mut self, region: Region) -> EditId {
        self.push(EditKind::Delete, region)
    }

    pub fn replace(&mut self, region: Region, text: impl Into<String>) -> EditId {
        self.push(EditKind::Replace { text: text.into() }, region)
    }

    pub fn copy(&mut self, source: Region, target: usize) -> EditId {
        self.push(EditKind::Copy { target }, source)
    }

    pub fn move_to(&mut self, source: Region, target: usize) -> EditId {
        self.push(EditKind::Move { target }, source)
    }

    pub fn group(&mut self, region: Region) -> EditId {
        self.push(EditKind::Group, region)
    }

    fn push(&mut self, kind: EditKind, region: Region) -> EditId {
        let id = EditId(self.nodes.len() as u32);
        self.nodes.push(EditNode {
            kind,
            region,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Attaches the detached node `child` below `parent`, keeping siblings sorted
    /// by offset.
    pub fn add_child(&mut self, parent: EditId, child: EditId) -> Result<(), MalformedEditError> {
        if child == self.root() {
            return Err(MalformedEditError::RootAsChild);
        }
        if self.node(child).parent.is_some() {
            return Err(MalformedEditError::AlreadyAttached { child });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(MalformedEditError::Cycle { parent, child });
        }

        let parent_node = self.node(parent);
        if !parent_node.kind.accepts_children() {
            return Err(MalformedEditError::LeafOnly {
                parent,
                kind: parent_node.kind.label(),
            });
        }

        let region = self.node(child).region;
        let parent_region = parent_node.region;
        let in_range = |r: Region| r.offset.checked_add(r.length).is_some();
        if !in_range(region) || !in_range(parent_region) || !parent_region.covers(region) {
            return Err(MalformedEditError::OutOfBounds {
                region,
                parent_region,
            });
        }

        if let Some(target) = self.node(child).kind.target() {
            let scope = self.scope();
            if target > scope.end() {
                return Err(MalformedEditError::TargetOutOfScope { target, scope });
            }
        }

        let siblings = &parent_node.children;
        let at = siblings.partition_point(|&sibling| {
            let r = self.node(sibling).region;
            (r.start(), r.end()) < (region.start(), region.end())
        });

        // Siblings are sorted and pairwise disjoint, so only the predecessor can
        // reach into `region` from the left.
        let candidates = at.checked_sub(1).into_iter().chain(
            (at..siblings.len())
                .take_while(|&i| self.node(siblings[i]).region.start() <= region.end()),
        );
        for i in candidates {
            let sibling = siblings[i];
            let sibling_region = self.node(sibling).region;
            if conflicts(region, sibling_region) {
                return Err(MalformedEditError::Overlap {
                    region,
                    sibling,
                    sibling_region,
                });
            }
        }

        self.nodes[parent.index()].children.insert(at, child);
        self.nodes[child.index()].parent = Some(parent);
        Ok(())
    }

    /// Convenience for the common flat case: attach `child` directly below the root.
    pub fn add(&mut self, child: EditId) -> Result<EditId, MalformedEditError> {
        self.add_child(self.root(), child)?;
        Ok(child)
    }

    fn is_ancestor_or_self(&self, ancestor: EditId, id: EditId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Attached nodes in application order: pre-order, children by ascending offset.
    pub fn preorder(&self) -> Vec<EditId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Attached nodes without children, root excluded.
    pub fn leaves(&self) -> impl Iterator<Item = EditId> + '_ {
        self.preorder()
            .into_iter()
            .filter(move |&id| id != self.root() && self.children(id).is_empty())
    }
}
