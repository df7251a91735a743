use std::collections::{HashMap, HashSet, VecDeque};

use super::category_models::CategoryEdge;

/// Adjacency view of the category forest (parent id to ordered child ids).
#[derive(Debug, Default, Clone)]
pub struct CategoryTree {
    known: HashSet<i64>,
    children: HashMap<i64, Vec<i64>>,
}

impl CategoryTree {
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = CategoryEdge>,
    {
        let mut tree = Self::default();

        for edge in edges {
            tree.known.insert(edge.id);
            if let Some(parent_id) = edge.parent_id {
                tree.children.entry(parent_id).or_default().push(edge.id);
            }
        }

        for ids in tree.children.values_mut() {
            ids.sort_unstable();
        }

        tree
    }

    pub fn contains(&self, id: i64) -> bool {
        self.known.contains(&id)
    }

    /// The category itself followed by every category beneath it, breadth
    /// first. An unknown id yields just itself. A cycle in the parent links
    /// is walked once and then stops.
    pub fn descendant_ids(&self, root: i64) -> Vec<i64> {
        if !self.contains(root) {
            return vec![root];
        }

        let mut ids = vec![root];
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            let Some(children) = self.children.get(&current) else {
                continue;
            };
            for &child in children {
                if visited.insert(child) {
                    ids.push(child);
                    queue.push_back(child);
                }
            }
        }

        ids
    }
}
