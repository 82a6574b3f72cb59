use std::collections::HashMap;

/// Node that can be arranged into a parent/child forest
pub trait TreeNode {
    fn id(&self) -> i32;
    fn parent_id(&self) -> i32;
    fn add_child(&mut self, child: Self)
    where
        Self: Sized;
}

/// Arrange `nodes` under `root`, keeping input order among siblings.
///
/// Nodes whose parent is not reachable from `root` are dropped. Each node is
/// attached at most once, so cyclic parent links cannot loop.
pub fn build_tree<T: TreeNode>(nodes: Vec<T>, root: i32) -> Vec<T> {
    let mut by_parent: HashMap<i32, Vec<T>> = HashMap::new();
    for node in nodes {
        by_parent.entry(node.parent_id()).or_default().push(node);
    }
    attach(&mut by_parent, root)
}

fn attach<T: TreeNode>(by_parent: &mut HashMap<i32, Vec<T>>, parent: i32) -> Vec<T> {
    let mut level = by_parent.remove(&parent).unwrap_or_default();
    for node in &mut level {
        for child in attach(by_parent, node.id()) {
            node.add_child(child);
        }
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        id: i32,
        parent: i32,
        children: Vec<Node>,
    }

    impl Node {
        fn new(id: i32, parent: i32) -> Self {
            Self {
                id,
                parent,
                children: Vec::new(),
            }
        }
    }

    impl TreeNode for Node {
        fn id(&self) -> i32 {
            self.id
        }
        fn parent_id(&self) -> i32 {
            self.parent
        }
        fn add_child(&mut self, child: Self) {
            self.children.push(child);
        }
    }

    #[test]
    fn groups_children_under_parents() {
        let nodes = vec![Node::new(2, 1), Node::new(1, -1), Node::new(3, 1), Node::new(4, 2), Node::new(5, -1)];
        let tree = build_tree(nodes, -1);

        assert_eq!(tree.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(tree[0].children.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(tree[0].children[0].children[0].id, 4);
    }

    #[test]
    fn orphans_and_cycles_are_dropped() {
        let nodes = vec![Node::new(1, -1), Node::new(7, 99), Node::new(8, 9), Node::new(9, 8)];
        let tree = build_tree(nodes, -1);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }
}
