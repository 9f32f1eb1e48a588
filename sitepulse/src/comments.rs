//! Threaded comments built from the API's flat list.
//!
//! Nodes live in one `Vec`; links are indices. Building is one pass to index
//! by id, one pass to attach children, then every sibling list is sorted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::Comment;

#[derive(Debug, Clone)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentTree {
    nodes: Vec<CommentNode>,
    roots: Vec<usize>,
    by_id: HashMap<u64, usize>,
}

impl CommentTree {
    /// Comments whose parent is missing become top-level. Duplicate ids keep
    /// the first occurrence. A parent cycle is cut at its first comment.
    pub fn build(flat: Vec<Comment>) -> Self {
        let mut nodes: Vec<CommentNode> = Vec::with_capacity(flat.len());
        let mut by_id = HashMap::with_capacity(flat.len());
        for comment in flat {
            if by_id.contains_key(&comment.id) {
                continue;
            }
            by_id.insert(comment.id, nodes.len());
            nodes.push(CommentNode {
                comment,
                children: Vec::new(),
            });
        }

        let mut parent_of: Vec<Option<usize>> = vec![None; nodes.len()];
        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let parent = nodes[i]
                .comment
                .parent_id
                .and_then(|p| by_id.get(&p).copied())
                .filter(|&p| p != i);
            match parent {
                Some(p) => {
                    nodes[p].children.push(i);
                    parent_of[i] = Some(p);
                }
                None => roots.push(i),
            }
        }

        // anything unreachable from a root sits on a cycle
        let mut seen = vec![false; nodes.len()];
        for &r in &roots {
            mark(&nodes, r, &mut seen);
        }
        for i in 0..nodes.len() {
            if seen[i] {
                continue;
            }
            if let Some(p) = parent_of[i].take() {
                nodes[p].children.retain(|&c| c != i);
            }
            roots.push(i);
            mark(&nodes, i, &mut seen);
        }

        let mut tree = Self {
            nodes,
            roots,
            by_id,
        };
        tree.sort();
        tree
    }

    fn sort(&mut self) {
        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by_key(|&i| order_key(&self.nodes, i));
        self.roots = roots;
        for n in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[n].children);
            children.sort_by_key(|&i| order_key(&self.nodes, i));
            self.nodes[n].children = children;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &CommentNode> + '_ {
        self.roots.iter().map(move |&i| &self.nodes[i])
    }

    pub fn get(&self, id: u64) -> Option<&CommentNode> {
        self.by_id.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn children<'a>(
        &'a self,
        node: &'a CommentNode,
    ) -> impl Iterator<Item = &'a CommentNode> + 'a {
        node.children.iter().map(move |&i| &self.nodes[i])
    }

    /// Pre-order walk yielding `(depth, comment)`, roots at depth 0.
    pub fn walk(&self) -> Vec<(usize, &Comment)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&i| (0, i)).collect();
        while let Some((depth, i)) = stack.pop() {
            let node = &self.nodes[i];
            out.push((depth, &node.comment));
            stack.extend(node.children.iter().rev().map(|&c| (depth + 1, c)));
        }
        out
    }
}

fn order_key(nodes: &[CommentNode], i: usize) -> (DateTime<Utc>, u64) {
    let c = &nodes[i].comment;
    (c.created_at, c.id)
}

fn mark(nodes: &[CommentNode], start: usize, seen: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if seen[i] {
            continue;
        }
        seen[i] = true;
        stack.extend(nodes[i].children.iter().copied());
    }
}
