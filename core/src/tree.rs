//! Minimal n-ary tree used as scaffolding for span ordering.
//!
//! Every traversal here runs off an explicit worklist. Traces can nest
//! arbitrarily deep, so nothing in this module recurses.

/// A node owning a value and an ordered list of child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode<T> {
    pub value: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn with_children(value: T, children: Vec<TreeNode<T>>) -> Self {
        Self { value, children }
    }

    /// Append a child, wrapping bare values in a node. Returns `self` for chaining.
    pub fn add_child(&mut self, child: impl Into<TreeNode<T>>) -> &mut Self {
        self.children.push(child.into());
        self
    }

    /// Number of levels in the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth + 1).max().unwrap_or(1)
    }

    /// Number of nodes reachable from this node, itself included.
    pub fn size(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order iterator yielding `(depth, node)` with this node at depth 0.
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder {
            stack: vec![(0, self)],
        }
    }

    /// Visit every node in pre-order as `(value, node, depth)`.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&T, &TreeNode<T>, usize),
    {
        for (depth, node) in self.iter() {
            visit(&node.value, node, depth);
        }
    }

    /// First node in pre-order matching `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<&TreeNode<T>>
    where
        P: FnMut(&TreeNode<T>) -> bool,
    {
        self.iter().map(|(_, node)| node).find(|node| predicate(node))
    }

    /// Nodes from this node down to the first pre-order match, inclusive.
    pub fn get_path<P>(&self, mut predicate: P) -> Option<Vec<&TreeNode<T>>>
    where
        P: FnMut(&TreeNode<T>) -> bool,
    {
        let mut path: Vec<&TreeNode<T>> = Vec::new();
        let mut stack = vec![(0usize, self)];

        while let Some((depth, node)) = stack.pop() {
            // Unwind the path to this node's parent before extending it.
            path.truncate(depth);
            path.push(node);

            if predicate(node) {
                return Some(path);
            }

            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }

        None
    }

    /// Every root-to-leaf path, leaves in pre-order.
    pub fn paths(&self) -> Vec<Vec<&TreeNode<T>>> {
        let mut paths = Vec::new();
        // Each entry is a node on the current path and its next child to visit.
        let mut stack: Vec<(&TreeNode<T>, usize)> = vec![(self, 0)];

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if node.children.is_empty() {
                paths.push(stack.iter().map(|&(node, _)| node).collect());
                stack.pop();
                continue;
            }

            match node.children.get(next) {
                Some(child) => {
                    top.1 += 1;
                    stack.push((child, 0));
                }
                None => {
                    stack.pop();
                }
            }
        }

        paths
    }
}

impl<T: PartialEq> TreeNode<T> {
    /// First node in pre-order whose value equals `value`.
    pub fn find_value(&self, value: &T) -> Option<&TreeNode<T>> {
        self.find(|node| node.value == *value)
    }

    /// Path down to the first node whose value equals `value`.
    pub fn get_path_value(&self, value: &T) -> Option<Vec<&TreeNode<T>>> {
        self.get_path(|node| node.value == *value)
    }
}

impl<T> Drop for TreeNode<T> {
    fn drop(&mut self) {
        // Flatten the subtree so dropping a deep chain stays iterative.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl<T> From<T> for TreeNode<T> {
    fn from(value: T) -> Self {
        TreeNode::new(value)
    }
}

/// Explicit-stack pre-order traversal. Children are pushed in reverse so they
/// pop in their original left-to-right order.
pub struct PreOrder<'a, T> {
    stack: Vec<(usize, &'a TreeNode<T>)>,
}

impl<'a, T> Iterator for PreOrder<'a, T> {
    type Item = (usize, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //        1
    //      / | \
    //     2  3  4
    //    / \     \
    //   5   6     7
    fn sample() -> TreeNode<u32> {
        let mut two = TreeNode::new(2);
        two.add_child(5).add_child(6);
        let mut four = TreeNode::new(4);
        four.add_child(7);

        let mut root = TreeNode::new(1);
        root.add_child(two).add_child(3).add_child(four);
        root
    }

    #[test]
    fn test_walk_is_pre_order_with_depth() {
        let tree = sample();
        let mut visited = Vec::new();
        tree.walk(|value, _, depth| visited.push((*value, depth)));

        assert_eq!(
            visited,
            vec![(1, 0), (2, 1), (5, 2), (6, 2), (3, 1), (4, 1), (7, 2)]
        );
    }

    #[test]
    fn test_add_child_wraps_values_and_nodes() {
        let mut root = TreeNode::new("root");
        root.add_child("a")
            .add_child(TreeNode::with_children("b", vec![TreeNode::new("c")]));

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].children[0].value, "c");
    }

    #[test]
    fn test_depth_and_size() {
        let tree = sample();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.size(), 7);

        let leaf = TreeNode::new(0);
        assert_eq!(leaf.depth(), 1);
        assert_eq!(leaf.size(), 1);
    }

    #[test]
    fn test_find_by_predicate_and_value() {
        let tree = sample();

        let even_leaf = tree.find(|node| node.children.is_empty() && node.value % 2 == 0);
        assert_eq!(even_leaf.map(|n| n.value), Some(6));

        assert_eq!(tree.find_value(&4).map(|n| n.children.len()), Some(1));
        assert!(tree.find_value(&42).is_none());
    }

    #[test]
    fn test_get_path_returns_root_to_match() {
        let tree = sample();

        let path: Vec<u32> = tree
            .get_path_value(&7)
            .unwrap()
            .into_iter()
            .map(|n| n.value)
            .collect();
        assert_eq!(path, vec![1, 4, 7]);

        let path: Vec<u32> = tree
            .get_path(|n| n.value == 6)
            .unwrap()
            .into_iter()
            .map(|n| n.value)
            .collect();
        assert_eq!(path, vec![1, 2, 6]);

        assert_eq!(tree.get_path_value(&1).map(|p| p.len()), Some(1));
        assert!(tree.get_path_value(&99).is_none());
    }

    #[test]
    fn test_paths_to_every_leaf() {
        let tree = sample();

        let paths: Vec<Vec<u32>> = tree
            .paths()
            .into_iter()
            .map(|path| path.into_iter().map(|n| n.value).collect())
            .collect();
        assert_eq!(paths, vec![vec![1, 2, 5], vec![1, 2, 6], vec![1, 3], vec![1, 4, 7]]);

        let leaf = TreeNode::new(9);
        assert_eq!(leaf.paths().len(), 1);
        assert_eq!(leaf.paths()[0][0].value, 9);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let depth = 200_000;
        let mut node = TreeNode::new(depth);
        for value in (0..depth).rev() {
            node = TreeNode::with_children(value, vec![node]);
        }

        assert_eq!(node.depth(), depth + 1);
        assert_eq!(node.size(), depth + 1);
        assert_eq!(node.get_path_value(&depth).map(|p| p.len()), Some(depth + 1));

        let paths = node.paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), depth + 1);
        assert_eq!(paths[0].last().map(|n| n.value), Some(depth));
    }
}
