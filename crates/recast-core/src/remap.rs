//! Region tracking through an applied edit tree.

use thiserror::Error;

use crate::{Buffer, EditTree, MalformedEditError, Region};

/// One applied operation: the region it consumed in the original text and the
/// region its output occupies in the new text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delta {
    pub original: Region,
    pub replaced: Region,
}

impl Delta {
    fn shift(self) -> isize {
        self.replaced.len() as isize - self.original.len() as isize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemapError {
    #[error("tracked region {region} straddles the boundary of the edit at {edit}")]
    Straddles { region: Region, edit: Region },
}

/// Delta sequence produced by [`crate::apply`], in emission order.
///
/// Regions are remapped arithmetically against the deltas; the text is never
/// re-scanned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionMap {
    deltas: Vec<Delta>,
    original_len: usize,
    new_len: usize,
}

impl RegionMap {
    pub(crate) fn new(deltas: Vec<Delta>, original_len: usize, new_len: usize) -> Self {
        Self {
            deltas,
            original_len,
            new_len,
        }
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// Maps a region of the original text into the new text.
    ///
    /// Against each edit `E = [s, s + len)` that produced `n` bytes:
    /// - `R == E` maps to the span of `E`'s output
    /// - `R` ending at or before `s` is unaffected
    /// - `R` starting at or after `s + len` shifts by `n - len`
    /// - `R` covering `E` keeps its start and grows by `n - len`
    ///
    /// A region that straddles an edit boundary has no meaningful image and is
    /// reported as [`RemapError::Straddles`].
    pub fn map(&self, region: Region) -> Result<Region, RemapError> {
        if let Some(delta) = self.deltas.iter().find(|d| d.original == region) {
            return Ok(delta.replaced);
        }

        let mut start_shift = 0isize;
        let mut end_shift = 0isize;
        for delta in &self.deltas {
            let edit = delta.original;
            if region.end() <= edit.start() {
                // Deltas are in offset order; nothing further can affect the region.
                if region.end() < edit.start() {
                    break;
                }
                continue;
            }
            if region.start() >= edit.end() {
                start_shift += delta.shift();
                end_shift += delta.shift();
            } else if region.covers(edit) {
                end_shift += delta.shift();
            } else {
                return Err(RemapError::Straddles { region, edit });
            }
        }

        let start = region.start() as isize + start_shift;
        let end = region.end() as isize + end_shift;
        debug_assert!(0 <= start && start <= end);
        Ok(Region::from_bounds(start as usize, end as usize))
    }

    /// Builds the edit tree that turns the new text back into `original`.
    ///
    /// Deltas whose outputs touch in the new text are merged into one replacement,
    /// so the result never holds two insertions at the same offset.
    pub fn inverse(&self, original: &Buffer) -> Result<EditTree, MalformedEditError> {
        let mut tree = EditTree::new(self.new_len);
        let mut pending: Option<Delta> = None;

        let flush = |tree: &mut EditTree, delta: Delta| -> Result<(), MalformedEditError> {
            let text = delta
                .original
                .slice(original.content())
                .unwrap_or_default()
                .to_string();
            let id = tree.replace(delta.replaced, text);
            tree.add(id).map(drop)
        };

        for delta in &self.deltas {
            if delta.original.is_empty() && delta.replaced.is_empty() {
                continue;
            }
            pending = match pending {
                Some(prev) if prev.replaced.end() == delta.replaced.start() => Some(Delta {
                    original: Region::from_bounds(prev.original.start(), delta.original.end()),
                    replaced: Region::from_bounds(prev.replaced.start(), delta.replaced.end()),
                }),
                Some(prev) => {
                    flush(&mut tree, prev)?;
                    Some(*delta)
                }
                None => Some(*delta),
            };
        }
        if let Some(last) = pending {
            flush(&mut tree, last)?;
        }

        Ok(tree)
    }
}
