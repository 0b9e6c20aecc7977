//! The buffer engine: applies an [`EditTree`] to an immutable text snapshot.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::remap::{Delta, RegionMap};
use crate::{EditId, EditKind, EditTree, Region};

/// Immutable text snapshot.
///
/// Clones share the underlying text, so handing a buffer to a preview or a
/// scratch copy is cheap and never exposes it to mutation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Buffer {
    content: Arc<str>,
}

impl Buffer {
    pub fn new(content: impl Into<Arc<str>>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn slice(&self, region: Region) -> Option<&str> {
        region.slice(&self.content)
    }

    /// See [`apply`].
    pub fn apply(&self, tree: &EditTree) -> Result<ApplyOutcome, ApplyError> {
        apply(self, tree)
    }

    /// See [`preview`].
    pub fn preview(&self, tree: &EditTree) -> Result<Buffer, ApplyError> {
        preview(self, tree)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Buffer").field(&self.content()).finish()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<String> for Buffer {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Buffer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("edit scope {scope} is outside of the buffer (len={len})")]
    OutOfBounds { scope: Region, len: usize },
    #[error("offset {offset} is not a UTF-8 character boundary")]
    InvalidUtf8Boundary { offset: usize },
    #[error("{kind} target {target} lands inside the edit at {region}")]
    ConflictingTarget {
        kind: &'static str,
        target: usize,
        region: Region,
    },
}

/// Result of [`apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub buffer: Buffer,
    pub map: RegionMap,
    regions: Vec<Option<Region>>,
}

impl ApplyOutcome {
    /// Where the output of edit `id` ended up in the new buffer.
    ///
    /// For insert, replace and delete nodes this is the span of the text they
    /// produced, for groups the span of everything produced inside their region,
    /// and for copies and moves the span of the inserted copy. `None` for nodes
    /// that were not attached when the tree was applied.
    pub fn region_of(&self, id: EditId) -> Option<Region> {
        self.regions.get(id.index()).copied().flatten()
    }
}

/// Applies `tree` to `buffer`, producing the new text, the delta sequence for
/// remapping regions and the post-apply region of every attached edit.
///
/// The source buffer is never touched. Copy and move targets are emitted before
/// any edit that starts at the same offset.
pub fn apply(buffer: &Buffer, tree: &EditTree) -> Result<ApplyOutcome, ApplyError> {
    let order = tree.preorder();
    validate(buffer, tree, &order)?;

    let mut targets: Vec<(usize, EditId)> = order
        .iter()
        .filter_map(|&id| tree.node(id).kind().target().map(|target| (target, id)))
        .collect();
    targets.sort_by_key(|&(target, _)| target);

    let mut writer = Writer {
        src: buffer.content(),
        tree,
        out: String::with_capacity(buffer.len()),
        pos: 0,
        targets,
        next_target: 0,
        deltas: Vec::new(),
        regions: vec![None; tree.len()],
    };
    writer.walk(tree.root());
    writer.flush_to(buffer.len());
    writer.emit_targets_at(buffer.len());

    let Writer {
        out,
        deltas,
        regions,
        ..
    } = writer;

    tracing::trace!(
        edits = order.len() - 1,
        deltas = deltas.len(),
        old_len = buffer.len(),
        new_len = out.len(),
        "applied edit tree"
    );

    let new_len = out.len();
    Ok(ApplyOutcome {
        buffer: Buffer::new(out),
        map: RegionMap::new(deltas, buffer.len(), new_len),
        regions,
    })
}

/// Computes the text `apply` would produce without tracking anything else.
///
/// Pure: the same `(buffer, tree)` always yields the same text and `buffer` is
/// left untouched, so any number of readers may preview concurrently.
pub fn preview(buffer: &Buffer, tree: &EditTree) -> Result<Buffer, ApplyError> {
    if tree.is_empty() {
        return Ok(buffer.clone());
    }
    apply(buffer, tree).map(|outcome| outcome.buffer)
}

fn validate(buffer: &Buffer, tree: &EditTree, order: &[EditId]) -> Result<(), ApplyError> {
    let text = buffer.content();
    let scope = tree.scope();
    if scope.end() > text.len() {
        return Err(ApplyError::OutOfBounds {
            scope,
            len: text.len(),
        });
    }

    let boundary = |offset: usize| {
        if text.is_char_boundary(offset) {
            Ok(())
        } else {
            Err(ApplyError::InvalidUtf8Boundary { offset })
        }
    };

    // Regions whose original text disappears; a copy or move target strictly
    // inside one of them has nowhere to go.
    let mut consumed: Vec<Region> = Vec::new();
    for &id in order {
        let node = tree.node(id);
        let region = node.region();
        boundary(region.start())?;
        boundary(region.end())?;
        if let Some(target) = node.kind().target() {
            boundary(target)?;
        }

        match node.kind() {
            EditKind::Delete | EditKind::Replace { .. } if node.children().is_empty() => {
                consumed.push(region);
            }
            EditKind::Delete | EditKind::Replace { .. } => {
                let mut pos = region.start();
                for &child in node.children() {
                    let child_region = tree.node(child).region();
                    consumed.push(Region::from_bounds(pos, child_region.start()));
                    pos = child_region.end();
                }
                consumed.push(Region::from_bounds(pos, region.end()));
            }
            EditKind::Move { .. } => consumed.push(region),
            EditKind::Group | EditKind::Insert { .. } | EditKind::Copy { .. } => {}
        }
    }

    for &id in order {
        let node = tree.node(id);
        let Some(target) = node.kind().target() else {
            continue;
        };
        if let Some(region) = consumed
            .iter()
            .find(|region| region.start() < target && target < region.end())
        {
            return Err(ApplyError::ConflictingTarget {
                kind: node.kind().label(),
                target,
                region: *region,
            });
        }
    }

    Ok(())
}

/// Left-to-right writer over the original text.
///
/// `pos` is the first original byte not yet accounted for; everything before it
/// has either been copied to `out` or consumed by an edit.
struct Writer<'a> {
    src: &'a str,
    tree: &'a EditTree,
    out: String,
    pos: usize,
    targets: Vec<(usize, EditId)>,
    next_target: usize,
    deltas: Vec<Delta>,
    regions: Vec<Option<Region>>,
}

impl Writer<'_> {
    /// Copies untouched text up to `offset`, emitting copy/move targets that lie
    /// strictly before it.
    fn flush_to(&mut self, offset: usize) {
        while let Some(&(target, id)) = self.targets.get(self.next_target) {
            if target >= offset {
                break;
            }
            self.copy_through(target);
            self.emit_target(target, id);
        }
        self.copy_through(offset);
    }

    fn copy_through(&mut self, offset: usize) {
        if offset > self.pos {
            self.out.push_str(&self.src[self.pos..offset]);
            self.pos = offset;
        }
    }

    fn emit_targets_at(&mut self, offset: usize) {
        while let Some(&(target, id)) = self.targets.get(self.next_target) {
            if target != offset {
                break;
            }
            self.emit_target(target, id);
        }
    }

    fn emit_target(&mut self, target: usize, id: EditId) {
        self.next_target += 1;
        let source = self.tree.node(id).region();
        let start = self.out.len();
        self.out.push_str(&self.src[source.start()..source.end()]);
        let replaced = Region::from_bounds(start, self.out.len());
        self.deltas.push(Delta {
            original: Region::empty(target),
            replaced,
        });
        self.regions[id.index()] = Some(replaced);
    }

    /// Consumes `region` of the original text and writes `text` in its place.
    fn substitute(&mut self, region: Region, text: &str) -> Region {
        debug_assert_eq!(self.pos, region.start());
        let start = self.out.len();
        self.out.push_str(text);
        self.pos = region.end();
        let replaced = Region::new(start, text.len());
        if !(region.is_empty() && text.is_empty()) {
            self.deltas.push(Delta {
                original: region,
                replaced,
            });
        }
        replaced
    }

    fn walk(&mut self, id: EditId) {
        let tree = self.tree;
        let node = tree.node(id);
        let region = node.region();

        self.flush_to(region.start());
        self.emit_targets_at(region.start());
        let start = self.out.len();

        match node.kind() {
            EditKind::Group => {
                for &child in node.children() {
                    self.walk(child);
                }
                self.flush_to(region.end());
            }
            EditKind::Insert { text } => {
                self.substitute(region, text);
            }
            EditKind::Delete | EditKind::Replace { .. } if node.children().is_empty() => {
                let text = match node.kind() {
                    EditKind::Replace { text } => text.as_str(),
                    _ => "",
                };
                self.substitute(region, text);
            }
            EditKind::Delete | EditKind::Replace { .. } => {
                // The node's own text rides on the first gap so that it is
                // accounted for even when that gap is empty.
                let mut text = match node.kind() {
                    EditKind::Replace { text } => text.as_str(),
                    _ => "",
                };
                for &child in node.children() {
                    let child_start = tree.node(child).region().start();
                    self.emit_targets_at(self.pos);
                    self.substitute(Region::from_bounds(self.pos, child_start), text);
                    text = "";
                    self.walk(child);
                }
                self.emit_targets_at(self.pos);
                self.substitute(Region::from_bounds(self.pos, region.end()), text);
            }
            EditKind::Copy { .. } => {
                self.flush_to(region.end());
            }
            EditKind::Move { .. } => {
                self.substitute(region, "");
            }
        }

        if !matches!(node.kind(), EditKind::Copy { .. } | EditKind::Move { .. }) {
            self.regions[id.index()] = Some(Region::from_bounds(start, self.out.len()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer() -> Buffer {
        Buffer::from("0123456789")
    }

    #[test]
    fn empty_tree_is_identity() {
        let tree = EditTree::new(10);
        let outcome = apply(&buffer(), &tree).unwrap();
        assert_eq!(outcome.buffer, buffer());
        assert!(outcome.map.deltas().is_empty());
    }

    #[test]
    fn flat_edits_apply_left_to_right() {
        let mut tree = EditTree::new(10);
        for id in [
            tree.insert(0, "!"),
            tree.replace(Region::new(2, 2), "XX"),
            tree.delete(Region::new(9, 1)),
        ] {
            tree.add(id).unwrap();
        }
        assert_eq!(preview(&buffer(), &tree).unwrap().content(), "!01XX45678");
    }

    #[test]
    fn group_children_apply_inside_copied_gaps() {
        let mut tree = EditTree::new(10);
        let group = tree.group(Region::new(2, 6));
        let a = tree.replace(Region::new(3, 1), "c");
        let b = tree.insert(6, "+");
        tree.add_child(group, a).unwrap();
        tree.add_child(group, b).unwrap();
        tree.add(group).unwrap();

        let outcome = apply(&buffer(), &tree).unwrap();
        assert_eq!(outcome.buffer.content(), "012c45+6789");
        assert_eq!(outcome.region_of(group), Some(Region::new(2, 7)));
        assert_eq!(outcome.region_of(b), Some(Region::new(6, 1)));
    }

    #[test]
    fn delete_with_children_keeps_only_the_children() {
        let mut tree = EditTree::new(10);
        let del = tree.delete(Region::new(1, 8));
        let keep = tree.group(Region::new(3, 2));
        let swap = tree.replace(Region::new(6, 1), "x");
        tree.add_child(del, keep).unwrap();
        tree.add_child(del, swap).unwrap();
        tree.add(del).unwrap();

        let outcome = apply(&buffer(), &tree).unwrap();
        assert_eq!(outcome.buffer.content(), "034x9");
        assert_eq!(outcome.region_of(del), Some(Region::new(1, 3)));
        assert_eq!(outcome.region_of(keep), Some(Region::new(1, 2)));
    }

    #[test]
    fn replace_with_children_emits_its_text_first() {
        let mut tree = EditTree::new(10);
        let parent = tree.replace(Region::new(2, 6), "<>");
        let child = tree.replace(Region::new(4, 2), "ab");
        tree.add_child(parent, child).unwrap();
        tree.add(parent).unwrap();

        let outcome = apply(&buffer(), &tree).unwrap();
        assert_eq!(outcome.buffer.content(), "01<>ab89");
        assert_eq!(outcome.region_of(parent), Some(Region::new(2, 4)));
        assert_eq!(outcome.region_of(child), Some(Region::new(4, 2)));
    }

    #[test]
    fn copy_and_move_insert_their_source_at_the_target() {
        let mut tree = EditTree::new(10);
        let copy = tree.copy(Region::new(0, 2), 10);
        let mv = tree.move_to(Region::new(4, 2), 2);
        tree.add(copy).unwrap();
        tree.add(mv).unwrap();

        let outcome = apply(&buffer(), &tree).unwrap();
        assert_eq!(outcome.buffer.content(), "014523678901");
        assert_eq!(outcome.region_of(mv), Some(Region::new(2, 2)));
        assert_eq!(outcome.region_of(copy), Some(Region::new(10, 2)));
    }

    #[test]
    fn copy_target_inside_a_deleted_region_is_rejected() {
        let mut tree = EditTree::new(10);
        let copy = tree.copy(Region::new(0, 1), 5);
        let del = tree.delete(Region::new(4, 3));
        tree.add(copy).unwrap();
        tree.add(del).unwrap();

        assert_eq!(
            apply(&buffer(), &tree),
            Err(ApplyError::ConflictingTarget {
                kind: "copy",
                target: 5,
                region: Region::new(4, 3),
            })
        );
    }

    #[test]
    fn scope_longer_than_the_buffer_is_rejected() {
        let tree = EditTree::new(11);
        assert_eq!(
            apply(&buffer(), &tree),
            Err(ApplyError::OutOfBounds {
                scope: Region::new(0, 11),
                len: 10,
            })
        );
    }

    #[test]
    fn regions_must_fall_on_char_boundaries() {
        let text = Buffer::from("aé");
        let mut tree = EditTree::new(text.len());
        let id = tree.delete(Region::new(1, 1));
        tree.add(id).unwrap();
        assert_eq!(
            apply(&text, &tree),
            Err(ApplyError::InvalidUtf8Boundary { offset: 2 })
        );
    }
}
