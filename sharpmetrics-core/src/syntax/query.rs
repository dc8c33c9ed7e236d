//! Tree query helpers
//!
//! Stateless descendant searches plus the one nesting traversal shared by
//! every "maximum nesting of X" metric.

use super::{SyntaxKind, SyntaxNode};

/// Pre-order iterator over the strict descendants of a node
pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(root: &'a SyntaxNode) -> Self {
        Descendants {
            stack: root.children.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

pub fn descendants_of_kind(
    node: &SyntaxNode,
    kind: SyntaxKind,
) -> impl Iterator<Item = &SyntaxNode> {
    node.descendants().filter(move |n| n.kind == kind)
}

pub fn count_kind(node: &SyntaxNode, kind: SyntaxKind) -> usize {
    descendants_of_kind(node, kind).count()
}

pub fn count_kinds(node: &SyntaxNode, kinds: &[SyntaxKind]) -> usize {
    node.descendants().filter(|n| kinds.contains(&n.kind)).count()
}

pub fn count_matching<F>(node: &SyntaxNode, predicate: F) -> usize
where
    F: Fn(&SyntaxNode) -> bool,
{
    node.descendants().filter(|n| predicate(n)).count()
}

/// Maximum number of nested nodes matching `predicate` on any root-to-leaf
/// path below `node` (the node itself is not counted).
pub fn max_nesting<F>(node: &SyntaxNode, predicate: F) -> usize
where
    F: Fn(&SyntaxNode) -> bool,
{
    let mut walker = NestingWalker {
        predicate: &predicate,
        current_depth: 0,
        max_depth: 0,
    };
    walker.walk_children(node);
    walker.max_depth
}

struct NestingWalker<'p, F> {
    predicate: &'p F,
    current_depth: usize,
    max_depth: usize,
}

impl<F> NestingWalker<'_, F>
where
    F: Fn(&SyntaxNode) -> bool,
{
    fn walk_children(&mut self, node: &SyntaxNode) {
        for child in &node.children {
            let matched = (self.predicate)(child);
            if matched {
                self.current_depth += 1;
                self.max_depth = self.max_depth.max(self.current_depth);
            }
            self.walk_children(child);
            if matched {
                self.current_depth -= 1;
            }
        }
    }
}

/// For every descendant matching `predicate`, the number of its strict
/// ancestors (below `node`) that also match, in pre-order.
pub fn matching_ancestor_counts<F>(node: &SyntaxNode, predicate: F) -> Vec<usize>
where
    F: Fn(&SyntaxNode) -> bool,
{
    fn walk<F: Fn(&SyntaxNode) -> bool>(
        node: &SyntaxNode,
        predicate: &F,
        depth: usize,
        out: &mut Vec<usize>,
    ) {
        for child in &node.children {
            if predicate(child) {
                out.push(depth);
                walk(child, predicate, depth + 1, out);
            } else {
                walk(child, predicate, depth, out);
            }
        }
    }

    let mut counts = Vec::new();
    walk(node, &predicate, 0, &mut counts);
    counts
}
