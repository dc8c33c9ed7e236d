use tree_sitter::Node;

pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node
        .children(&mut cursor)
        .find(|child| child.kind() == kind);
    result
}

pub fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    match node.named_child_count() {
        0 => None,
        count => node.named_child(count - 1),
    }
}

/// Deepest nesting below `node`, counting `node` itself as one level
///
/// Walks with a cursor, so arbitrarily deep trees are measured without
/// recursion.
pub fn syntax_depth(node: Node<'_>) -> usize {
    let mut cursor = node.walk();
    let mut depth = 1;
    let mut deepest = 1;
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            deepest = deepest.max(depth);
            continue;
        }
        loop {
            if depth == 1 {
                return deepest;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            cursor.goto_parent();
            depth -= 1;
        }
    }
}

/// Number of ERROR and MISSING nodes below `node`
pub fn count_error_nodes(node: Node<'_>) -> usize {
    if !node.has_error() {
        return 0;
    }
    let own = usize::from(node.is_error() || node.is_missing());
    let mut cursor = node.walk();
    let children: usize = node
        .children(&mut cursor)
        .map(count_error_nodes)
        .sum();
    own + children
}
