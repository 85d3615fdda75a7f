//! Rebuilding comment nesting from a flat, depth-annotated list.

use serde::Serialize;

use crate::models::FlatComment;

/// A comment and its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    pub comment: FlatComment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    fn leaf(comment: FlatComment) -> Self {
        Self {
            comment,
            children: Vec::new(),
        }
    }

    /// Nesting level, always equal to the wrapped comment's depth.
    pub fn depth(&self) -> usize {
        self.comment.depth
    }

    pub fn author(&self) -> &str {
        &self.comment.author
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Visit this node and its descendants depth-first, in input order.
    ///
    /// Uses an explicit stack; thread depth comes from scraped pages.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CommentNode)) {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            visit(node);
            pending.extend(node.children.iter().rev());
        }
    }
}

impl Drop for CommentNode {
    // The derived drop recurses once per level.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Build a forest from comments in page order.
///
/// Single pass over a stack of open ancestors: pop everything at the same
/// depth or deeper, attach to whatever is left on top (or start a new
/// root), then push. The stack owns the open nodes; a node is attached to
/// the one beneath it when it is popped, which is the same parent the
/// top-of-stack rule picks.
///
/// Input order is trusted. A reply that shows up before any shallower
/// comment becomes a root instead of being rejected.
pub fn build_tree(comments: Vec<FlatComment>) -> Vec<CommentNode> {
    let mut roots = Vec::new();
    let mut open: Vec<CommentNode> = Vec::new();

    for comment in comments {
        while open
            .last()
            .is_some_and(|top| top.depth() >= comment.depth)
        {
            close_top(&mut open, &mut roots);
        }
        open.push(CommentNode::leaf(comment));
    }

    while !open.is_empty() {
        close_top(&mut open, &mut roots);
    }

    roots
}

fn close_top(open: &mut Vec<CommentNode>, roots: &mut Vec<CommentNode>) {
    if let Some(node) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Total number of nodes in a forest.
pub fn forest_len(roots: &[CommentNode]) -> usize {
    roots.iter().map(CommentNode::subtree_len).sum()
}
