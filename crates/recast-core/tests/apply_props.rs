use proptest::prelude::*;
use recast_core::{apply, preview, ApplyError, Buffer, EditId, EditKind, EditTree, Region};

const PROPTEST_CASES: u32 = 256;

fn arb_char() -> impl Strategy<Value = char> {
    // Mostly ASCII, plus multi-byte characters so offsets have to respect UTF-8
    // boundaries.
    prop_oneof![
        12 => prop::sample::select(vec!['a', 'b', 'c', 'x', 'y', 'z', '0', '1', ' ', '.']),
        3 => Just('\n'),
        2 => Just('é'),
        2 => Just('中'),
        1 => Just('🦀'),
    ]
}

fn arb_text(min_chars: usize, max_chars: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(arb_char(), min_chars..=max_chars)
        .prop_map(|chars| chars.into_iter().collect())
}

fn char_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    boundaries
}

#[derive(Clone, Debug)]
struct PlanStep {
    insert: Option<String>,
    /// 0 = leave alone, 1 = replace, 2 = delete.
    action: u8,
    span: usize,
    text: String,
}

fn arb_plan_step() -> impl Strategy<Value = PlanStep> {
    (
        prop::option::weighted(0.3, arb_text(0, 4)),
        0u8..3,
        1usize..=3,
        arb_text(0, 6),
    )
        .prop_map(|(insert, action, span, text)| PlanStep {
            insert,
            action,
            span,
            text,
        })
}

/// Turns a plan into a flat, well-formed edit tree over `text`.
fn tree_from_plan(text: &str, plan: &[PlanStep]) -> EditTree {
    let boundaries = char_boundaries(text);
    let last = boundaries.len() - 1;
    let mut tree = EditTree::new(text.len());

    let mut i = 0usize;
    let mut steps = plan.iter().cycle();
    while i <= last {
        let Some(step) = steps.next() else { break };
        let at = boundaries[i];
        if let Some(insert) = &step.insert {
            let id = tree.insert(at, insert.clone());
            tree.add(id).expect("insert is well formed");
        }
        if i == last {
            break;
        }
        let end_index = (i + step.span).min(last);
        let region = Region::from_bounds(at, boundaries[end_index]);
        match step.action {
            1 => {
                let id = tree.replace(region, step.text.clone());
                tree.add(id).expect("replace is well formed");
                i = end_index;
            }
            2 => {
                let id = tree.delete(region);
                tree.add(id).expect("delete is well formed");
                i = end_index;
            }
            _ => i += 1,
        }
    }
    tree
}

fn arb_text_and_tree() -> impl Strategy<Value = (String, EditTree)> {
    (
        arb_text(0, 48),
        prop::collection::vec(arb_plan_step(), 1..8),
    )
        .prop_map(|(text, plan)| {
            let tree = tree_from_plan(&text, &plan);
            (text, tree)
        })
}

#[derive(Clone, Debug)]
struct NestStep {
    insert: Option<String>,
    /// 0 = leave alone, 1 = replace, 2 = delete, 3..=5 = group/replace/delete
    /// with children, 6 = copy, 7 = move.
    action: u8,
    span: usize,
    text: String,
    target: prop::sample::Index,
}

fn arb_nest_step() -> impl Strategy<Value = NestStep> {
    (
        prop::option::weighted(0.25, arb_text(0, 3)),
        0u8..8,
        1usize..=6,
        arb_text(0, 4),
        any::<prop::sample::Index>(),
    )
        .prop_map(|(insert, action, span, text, target)| NestStep {
            insert,
            action,
            span,
            text,
            target,
        })
}

const MAX_DEPTH: usize = 3;

/// Builds a nested edit tree over `boundaries`, consuming one step per
/// decision until the steps run out.
struct NestedPlanner<'a> {
    boundaries: Vec<usize>,
    steps: std::slice::Iter<'a, NestStep>,
}

impl NestedPlanner<'_> {
    /// Fills the character span `[lo, hi)` (as boundary indices) below `parent`.
    fn fill(&mut self, tree: &mut EditTree, parent: EditId, lo: usize, hi: usize, depth: usize) {
        let mut i = lo;
        while i < hi {
            let Some(step) = self.steps.next() else { return };
            let at = self.boundaries[i];
            if let Some(insert) = &step.insert {
                let id = tree.insert(at, insert.clone());
                tree.add_child(parent, id).expect("insert is well formed");
            }

            let end = (i + step.span).min(hi);
            let region = Region::from_bounds(at, self.boundaries[end]);
            let target = self.boundaries[step.target.index(self.boundaries.len())];
            let nested = depth < MAX_DEPTH;
            let id = match step.action {
                0 => {
                    i += 1;
                    continue;
                }
                1 => tree.replace(region, step.text.clone()),
                2 => tree.delete(region),
                3 => tree.group(region),
                4 => tree.replace(region, step.text.clone()),
                5 => tree.delete(region),
                6 => tree.copy(region, target),
                _ => tree.move_to(region, target),
            };
            tree.add_child(parent, id).expect("edit is well formed");
            if nested && (3..=5).contains(&step.action) {
                self.fill(tree, id, i, end, depth + 1);
            }
            i = end;
        }
    }
}

fn arb_text_and_nested_tree() -> impl Strategy<Value = (String, EditTree)> {
    (
        arb_text(0, 40),
        prop::collection::vec(arb_nest_step(), 1..24),
    )
        .prop_map(|(text, steps)| {
            let boundaries = char_boundaries(&text);
            let last = boundaries.len() - 1;
            let mut tree = EditTree::new(text.len());
            let root = tree.root();
            let mut planner = NestedPlanner {
                boundaries,
                steps: steps.iter(),
            };
            planner.fill(&mut tree, root, 0, last, 0);
            (text, tree)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn inverse_restores_the_original((text, tree) in arb_text_and_tree()) {
        let buffer = Buffer::from(text.as_str());
        let outcome = apply(&buffer, &tree).expect("generated tree applies");
        let inverse = outcome.map.inverse(&buffer).expect("inverse is well formed");
        let restored = apply(&outcome.buffer, &inverse).expect("inverse applies");
        prop_assert_eq!(restored.buffer.content(), text.as_str());
    }

    #[test]
    fn preview_is_pure((text, tree) in arb_text_and_tree()) {
        let buffer = Buffer::from(text.as_str());
        let first = preview(&buffer, &tree).expect("generated tree applies");
        let second = preview(&buffer, &tree).expect("generated tree applies");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(buffer.content(), text.as_str());
        prop_assert_eq!(&first, &apply(&buffer, &tree).unwrap().buffer);
    }

    #[test]
    fn regions_before_every_edit_map_to_themselves((text, tree) in arb_text_and_tree()) {
        let buffer = Buffer::from(text.as_str());
        let outcome = apply(&buffer, &tree).expect("generated tree applies");
        let first_edit = tree
            .children(tree.root())
            .first()
            .map(|&id| tree.node(id).region().start())
            .unwrap_or(text.len());
        let prefix = Region::from_bounds(0, first_edit);
        prop_assert_eq!(outcome.map.map(prefix), Ok(prefix));
    }

    #[test]
    fn leaf_regions_remap_to_their_output((text, tree) in arb_text_and_tree()) {
        let buffer = Buffer::from(text.as_str());
        let outcome = apply(&buffer, &tree).expect("generated tree applies");
        for leaf in tree.leaves() {
            let node = tree.node(leaf);
            let expected = outcome.region_of(leaf).expect("leaf was applied");
            prop_assert_eq!(outcome.map.map(node.region()), Ok(expected));
            let produced = match node.kind() {
                EditKind::Insert { text } | EditKind::Replace { text } => text.as_str(),
                _ => "",
            };
            prop_assert_eq!(outcome.buffer.slice(expected), Some(produced));
        }
    }

    #[test]
    fn inverse_restores_the_original_for_nested_trees(
        (text, tree) in arb_text_and_nested_tree()
    ) {
        let buffer = Buffer::from(text.as_str());
        let outcome = match apply(&buffer, &tree) {
            Ok(outcome) => outcome,
            // A copy or move aimed into text that disappears; nothing to restore.
            Err(ApplyError::ConflictingTarget { .. }) => return Ok(()),
            Err(err) => return Err(TestCaseError::fail(err.to_string())),
        };
        let inverse = outcome.map.inverse(&buffer).expect("inverse is well formed");
        let restored = apply(&outcome.buffer, &inverse).expect("inverse applies");
        prop_assert_eq!(restored.buffer.content(), text.as_str());
    }

    #[test]
    fn preview_is_pure_for_nested_trees((text, tree) in arb_text_and_nested_tree()) {
        let buffer = Buffer::from(text.as_str());
        let first = match preview(&buffer, &tree) {
            Ok(first) => first,
            Err(ApplyError::ConflictingTarget { .. }) => return Ok(()),
            Err(err) => return Err(TestCaseError::fail(err.to_string())),
        };
        let second = preview(&buffer, &tree).expect("second preview agrees");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(buffer.content(), text.as_str());
        prop_assert_eq!(&first, &apply(&buffer, &tree).unwrap().buffer);
    }
}
