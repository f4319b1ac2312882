//! Dynamic AABB tree used as the actor broadphase.
//!
//! Leaves hold a *fattened* AABB (the actor's box grown by a small margin and
//! stretched in the direction of travel) so small movements don't force a
//! reinsertion. Internal nodes hold the union of their children and are kept
//! height-balanced with AVL-style rotations. Nodes live in a pool indexed by
//! `ProxyId`, with freed slots threaded into a free list.

use glam::Vec2;
use jj_core::Aabb;

pub type ProxyId = i32;

/// Sentinel for "no node". Actors store this when they have no proxy.
pub const NULL_NODE: ProxyId = -1;

/// Margin added on every side of a leaf AABB.
pub const AABB_EXTENSION: f32 = 0.1;
/// Scale applied to the displacement when predicting movement.
pub const AABB_MULTIPLIER: f32 = 4.0;

const DEFAULT_NODE_CAPACITY: usize = 128;

#[derive(Debug, Clone)]
struct TreeNode<T> {
    aabb: Aabb,
    user_data: Option<T>,
    /// Parent link while allocated, next free slot while in the free list.
    parent_or_next: ProxyId,
    child1: ProxyId,
    child2: ProxyId,
    /// Leaf = 0, free node = -1.
    height: i32,
    moved: bool,
}

impl<T> TreeNode<T> {
    fn free(next: ProxyId) -> Self {
        Self {
            aabb: Aabb::default(),
            user_data: None,
            parent_or_next: next,
            child1: NULL_NODE,
            child2: NULL_NODE,
            height: -1,
            moved: false,
        }
    }

    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

#[derive(Debug, Clone)]
pub struct DynamicTree<T> {
    root: ProxyId,
    nodes: Vec<TreeNode<T>>,
    node_count: usize,
    free_list: ProxyId,
}

impl<T: Copy> DynamicTree<T> {
    pub fn new() -> Self {
        let mut tree = Self {
            root: NULL_NODE,
            nodes: Vec::new(),
            node_count: 0,
            free_list: NULL_NODE,
        };
        tree.grow_pool(DEFAULT_NODE_CAPACITY);
        tree
    }

    fn grow_pool(&mut self, new_capacity: usize) {
        let start = self.nodes.len();
        for i in start..new_capacity {
            let next = if i + 1 < new_capacity {
                (i + 1) as ProxyId
            } else {
                NULL_NODE
            };
            self.nodes.push(TreeNode::free(next));
        }
        self.free_list = start as ProxyId;
    }

    fn allocate_node(&mut self) -> ProxyId {
        if self.free_list == NULL_NODE {
            debug_assert_eq!(self.node_count, self.nodes.len());
            let capacity = (self.nodes.len() * 2).max(DEFAULT_NODE_CAPACITY);
            self.grow_pool(capacity);
        }

        let node_id = self.free_list;
        let node = &mut self.nodes[node_id as usize];
        self.free_list = node.parent_or_next;
        node.parent_or_next = NULL_NODE;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        node.height = 0;
        node.user_data = None;
        node.moved = false;
        self.node_count += 1;
        node_id
    }

    fn free_node(&mut self, node_id: ProxyId) {
        debug_assert!(self.node_count > 0);
        self.nodes[node_id as usize] = TreeNode::free(self.free_list);
        self.free_list = node_id;
        self.node_count -= 1;
    }

    fn node(&self, id: ProxyId) -> &TreeNode<T> {
        &self.nodes[id as usize]
    }

    fn node_mut(&mut self, id: ProxyId) -> &mut TreeNode<T> {
        &mut self.nodes[id as usize]
    }

    /// True if `proxy_id` refers to an allocated leaf.
    pub fn is_valid_proxy(&self, proxy_id: ProxyId) -> bool {
        proxy_id >= 0
            && (proxy_id as usize) < self.nodes.len()
            && self.node(proxy_id).height == 0
            && self.node(proxy_id).user_data.is_some()
    }

    /// Create a leaf for `aabb`. The stored AABB is fattened by `AABB_EXTENSION`.
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> ProxyId {
        let proxy_id = self.allocate_node();

        let node = self.node_mut(proxy_id);
        node.aabb = aabb.expanded(AABB_EXTENSION);
        node.user_data = Some(user_data);
        node.height = 0;
        node.moved = true;

        self.insert_leaf(proxy_id);
        proxy_id
    }

    pub fn destroy_proxy(&mut self, proxy_id: ProxyId) {
        debug_assert!(self.is_valid_proxy(proxy_id), "invalid proxy {proxy_id}");
        if !self.is_valid_proxy(proxy_id) {
            return;
        }
        self.remove_leaf(proxy_id);
        self.free_node(proxy_id);
    }

    /// Move a proxy with a swept AABB. Returns `true` if the leaf was reinserted.
    pub fn move_proxy(&mut self, proxy_id: ProxyId, aabb: &Aabb, displacement: Vec2) -> bool {
        debug_assert!(self.is_valid_proxy(proxy_id), "invalid proxy {proxy_id}");
        if !self.is_valid_proxy(proxy_id) {
            return false;
        }

        let mut fat_aabb = aabb.expanded(AABB_EXTENSION);

        // Predict AABB movement
        let d = displacement * AABB_MULTIPLIER;
        if d.x < 0.0 {
            fat_aabb.l += d.x;
        } else {
            fat_aabb.r += d.x;
        }
        if d.y < 0.0 {
            fat_aabb.t += d.y;
        } else {
            fat_aabb.b += d.y;
        }

        let tree_aabb = self.node(proxy_id).aabb;
        if tree_aabb.contains(aabb) {
            // The tree AABB still contains the object but might be too large,
            // e.g. the object was moving fast and has since slowed down.
            let huge_aabb = fat_aabb.expanded(4.0 * AABB_EXTENSION);
            if huge_aabb.contains(&tree_aabb) {
                return false;
            }
        }

        self.remove_leaf(proxy_id);
        self.node_mut(proxy_id).aabb = fat_aabb;
        self.insert_leaf(proxy_id);
        self.node_mut(proxy_id).moved = true;
        true
    }

    pub fn get_user_data(&self, proxy_id: ProxyId) -> Option<T> {
        self.nodes.get(proxy_id as usize).and_then(|n| n.user_data)
    }

    pub fn get_fat_aabb(&self, proxy_id: ProxyId) -> Aabb {
        self.node(proxy_id).aabb
    }

    pub fn was_moved(&self, proxy_id: ProxyId) -> bool {
        self.node(proxy_id).moved
    }

    pub fn clear_moved(&mut self, proxy_id: ProxyId) {
        self.node_mut(proxy_id).moved = false;
    }

    pub fn proxy_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.height == 0 && n.user_data.is_some())
            .count()
    }

    /// Visit every leaf whose fat AABB overlaps `aabb`. The visitor returns
    /// `false` to stop the query early.
    pub fn query<F>(&self, aabb: &Aabb, mut visitor: F)
    where
        F: FnMut(ProxyId) -> bool,
    {
        let mut stack: Vec<ProxyId> = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_id) = stack.pop() {
            if node_id == NULL_NODE {
                continue;
            }

            let node = self.node(node_id);
            if node.aabb.overlaps(aabb) {
                if node.is_leaf() {
                    if !visitor(node_id) {
                        return;
                    }
                } else {
                    stack.push(node.child1);
                    stack.push(node.child2);
                }
            }
        }
    }

    fn insert_leaf(&mut self, leaf: ProxyId) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.node_mut(leaf).parent_or_next = NULL_NODE;
            return;
        }

        // Find the best sibling for this node
        let leaf_aabb = self.node(leaf).aabb;
        let mut index = self.root;
        while !self.node(index).is_leaf() {
            let child1 = self.node(index).child1;
            let child2 = self.node(index).child2;

            let area = self.node(index).aabb.perimeter();
            let combined_area = self.node(index).aabb.union(&leaf_aabb).perimeter();

            // Cost of creating a new parent for this node and the new leaf
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down the tree
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost1 = self.descend_cost(child1, &leaf_aabb) + inheritance_cost;
            let cost2 = self.descend_cost(child2, &leaf_aabb) + inheritance_cost;

            if cost < cost1 && cost < cost2 {
                break;
            }

            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;

        let old_parent = self.node(sibling).parent_or_next;
        let new_parent = self.allocate_node();
        let sibling_aabb = self.node(sibling).aabb;
        let sibling_height = self.node(sibling).height;
        {
            let parent = self.node_mut(new_parent);
            parent.parent_or_next = old_parent;
            parent.user_data = None;
            parent.aabb = leaf_aabb.union(&sibling_aabb);
            parent.height = sibling_height + 1;
            parent.child1 = sibling;
            parent.child2 = leaf;
        }
        self.node_mut(sibling).parent_or_next = new_parent;
        self.node_mut(leaf).parent_or_next = new_parent;

        if old_parent != NULL_NODE {
            if self.node(old_parent).child1 == sibling {
                self.node_mut(old_parent).child1 = new_parent;
            } else {
                self.node_mut(old_parent).child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }

        // Walk back up the tree fixing heights and AABBs
        let parent = self.node(leaf).parent_or_next;
        self.refit_ancestors(parent);
    }

    fn descend_cost(&self, child: ProxyId, leaf_aabb: &Aabb) -> f32 {
        let node = self.node(child);
        let combined = leaf_aabb.union(&node.aabb).perimeter();
        if node.is_leaf() {
            combined
        } else {
            combined - node.aabb.perimeter()
        }
    }

    fn refit_ancestors(&mut self, start: ProxyId) {
        let mut index = start;
        while index != NULL_NODE {
            index = self.balance(index);

            let child1 = self.node(index).child1;
            let child2 = self.node(index).child2;
            debug_assert!(child1 != NULL_NODE && child2 != NULL_NODE);

            let height = 1 + self.node(child1).height.max(self.node(child2).height);
            let aabb = self.node(child1).aabb.union(&self.node(child2).aabb);
            let node = self.node_mut(index);
            node.height = height;
            node.aabb = aabb;

            index = node.parent_or_next;
        }
    }

    fn remove_leaf(&mut self, leaf: ProxyId) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.node(leaf).parent_or_next;
        let grand_parent = self.node(parent).parent_or_next;
        let sibling = if self.node(parent).child1 == leaf {
            self.node(parent).child2
        } else {
            self.node(parent).child1
        };

        if grand_parent != NULL_NODE {
            // Destroy parent and connect sibling to grand parent.
            if self.node(grand_parent).child1 == parent {
                self.node_mut(grand_parent).child1 = sibling;
            } else {
                self.node_mut(grand_parent).child2 = sibling;
            }
            self.node_mut(sibling).parent_or_next = grand_parent;
            self.free_node(parent);

            self.refit_ancestors(grand_parent);
        } else {
            self.root = sibling;
            self.node_mut(sibling).parent_or_next = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Perform a left or right rotation if node `ia` is imbalanced.
    /// Returns the index of the subtree's new root.
    fn balance(&mut self, ia: ProxyId) -> ProxyId {
        let a = self.node(ia);
        if a.is_leaf() || a.height < 2 {
            return ia;
        }

        let ib = a.child1;
        let ic = a.child2;
        let balance = self.node(ic).height - self.node(ib).height;

        if balance > 1 {
            self.rotate_up(ia, ic, ib, true)
        } else if balance < -1 {
            self.rotate_up(ia, ib, ic, false)
        } else {
            ia
        }
    }

    /// Promote child `iup` above `ia`. `iother` is the child that stays under `ia`.
    /// `up_is_child2` tells which slot of `ia` the promoted child occupied.
    fn rotate_up(&mut self, ia: ProxyId, iup: ProxyId, iother: ProxyId, up_is_child2: bool) -> ProxyId {
        let i1 = self.node(iup).child1;
        let i2 = self.node(iup).child2;

        // Swap A and the promoted node
        let a_parent = self.node(ia).parent_or_next;
        self.node_mut(iup).child1 = ia;
        self.node_mut(iup).parent_or_next = a_parent;
        self.node_mut(ia).parent_or_next = iup;

        // A's old parent should point to the promoted node
        if a_parent != NULL_NODE {
            if self.node(a_parent).child1 == ia {
                self.node_mut(a_parent).child1 = iup;
            } else {
                debug_assert_eq!(self.node(a_parent).child2, ia);
                self.node_mut(a_parent).child2 = iup;
            }
        } else {
            self.root = iup;
        }

        // The taller grandchild stays with the promoted node.
        let (keep, give) = if self.node(i1).height > self.node(i2).height {
            (i1, i2)
        } else {
            (i2, i1)
        };

        self.node_mut(iup).child2 = keep;
        if up_is_child2 {
            self.node_mut(ia).child2 = give;
        } else {
            self.node_mut(ia).child1 = give;
        }
        self.node_mut(give).parent_or_next = ia;

        let a_aabb = self.node(iother).aabb.union(&self.node(give).aabb);
        let a_height = 1 + self.node(iother).height.max(self.node(give).height);
        {
            let a = self.node_mut(ia);
            a.aabb = a_aabb;
            a.height = a_height;
        }
        let up_aabb = a_aabb.union(&self.node(keep).aabb);
        let up_height = 1 + a_height.max(self.node(keep).height);
        let up = self.node_mut(iup);
        up.aabb = up_aabb;
        up.height = up_height;

        iup
    }

    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.node(self.root).height
        }
    }

    /// Largest height difference between the two children of any node.
    pub fn max_balance(&self) -> i32 {
        self.nodes
            .iter()
            .filter(|n| n.height > 1)
            .map(|n| (self.node(n.child2).height - self.node(n.child1).height).abs())
            .max()
            .unwrap_or(0)
    }

    /// Ratio of the summed node perimeters to the root perimeter.
    pub fn area_ratio(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }
        let root_area = self.node(self.root).aabb.perimeter();
        let total_area: f32 = self
            .nodes
            .iter()
            .filter(|n| n.height >= 0)
            .map(|n| n.aabb.perimeter())
            .sum();
        total_area / root_area
    }

    /// Shift the world origin: `position -= new_origin` for every node.
    pub fn shift_origin(&mut self, new_origin: Vec2) {
        for node in &mut self.nodes {
            node.aabb = node.aabb.translated(-new_origin);
        }
    }

    /// Check structure, heights, bounds and the free list.
    pub fn validate(&self) -> Result<(), String> {
        if self.root != NULL_NODE && self.node(self.root).parent_or_next != NULL_NODE {
            return Err("Tree validation failed: root has a parent".to_string());
        }
        self.validate_node(self.root)?;

        let mut free_count = 0;
        let mut free_index = self.free_list;
        while free_index != NULL_NODE {
            if free_index < 0 || free_index as usize >= self.nodes.len() {
                return Err(format!("Tree validation failed: free index {free_index} out of range"));
            }
            free_index = self.node(free_index).parent_or_next;
            free_count += 1;
        }

        if self.node_count + free_count != self.nodes.len() {
            return Err(format!(
                "Tree validation failed: {} allocated + {} free != capacity {}",
                self.node_count,
                free_count,
                self.nodes.len()
            ));
        }
        Ok(())
    }

    fn validate_node(&self, index: ProxyId) -> Result<(), String> {
        if index == NULL_NODE {
            return Ok(());
        }

        let node = self.node(index);
        if node.is_leaf() {
            if node.child2 != NULL_NODE || node.height != 0 {
                return Err(format!("Tree validation failed: malformed leaf {index}"));
            }
            return Ok(());
        }

        let (c1, c2) = (node.child1, node.child2);
        if self.node(c1).parent_or_next != index || self.node(c2).parent_or_next != index {
            return Err(format!("Tree validation failed: broken parent link under {index}"));
        }
        let height = 1 + self.node(c1).height.max(self.node(c2).height);
        if node.height != height {
            return Err(format!(
                "Tree validation failed: node {index} height {} != {height}",
                node.height
            ));
        }
        if !node.aabb.contains(&self.node(c1).aabb) || !node.aabb.contains(&self.node(c2).aabb) {
            return Err(format!("Tree validation failed: node {index} does not contain its children"));
        }

        self.validate_node(c1)?;
        self.validate_node(c2)
    }
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f32, y: f32, size: f32) -> Aabb {
        Aabb::new(x, y, x + size, y + size)
    }

    fn query_all(tree: &DynamicTree<u32>, aabb: &Aabb) -> Vec<u32> {
        let mut found = Vec::new();
        tree.query(aabb, |id| {
            found.push(tree.get_user_data(id).expect("leaf has user data"));
            true
        });
        found.sort_unstable();
        found
    }

    #[test]
    fn create_proxy_fattens_aabb() {
        let mut tree = DynamicTree::new();
        let id = tree.create_proxy(&boxed(0.0, 0.0, 10.0), 7u32);
        let fat = tree.get_fat_aabb(id);
        assert!((fat.l + AABB_EXTENSION).abs() < 1e-6);
        assert!((fat.r - 10.0 - AABB_EXTENSION).abs() < 1e-6);
        assert_eq!(tree.get_user_data(id), Some(7));
        assert!(tree.was_moved(id));
    }

    #[test]
    fn query_finds_overlapping_leaves_only() {
        let mut tree = DynamicTree::new();
        for i in 0..20u32 {
            tree.create_proxy(&boxed(i as f32 * 20.0, 0.0, 10.0), i);
        }
        tree.validate().expect("tree is valid");

        assert_eq!(query_all(&tree, &boxed(45.0, 2.0, 2.0)), vec![2]);
        assert_eq!(query_all(&tree, &Aabb::new(15.0, 0.0, 65.0, 1.0)), vec![1, 2, 3]);
        assert!(query_all(&tree, &boxed(0.0, 100.0, 5.0)).is_empty());
    }

    #[test]
    fn query_visitor_can_stop_early() {
        let mut tree = DynamicTree::new();
        for i in 0..10u32 {
            tree.create_proxy(&boxed(0.0, 0.0, 10.0), i);
        }
        let mut visited = 0;
        tree.query(&boxed(0.0, 0.0, 10.0), |_| {
            visited += 1;
            visited < 3
        });
        assert_eq!(visited, 3);
    }

    #[test]
    fn small_move_keeps_leaf_in_place() {
        let mut tree = DynamicTree::new();
        let id = tree.create_proxy(&boxed(0.0, 0.0, 10.0), 1u32);
        tree.clear_moved(id);
        // Still inside the fattened bounds and close to their size.
        assert!(!tree.move_proxy(id, &boxed(0.05, 0.0, 10.0), Vec2::ZERO));
        assert!(!tree.was_moved(id));
    }

    #[test]
    fn large_move_reinserts_with_prediction() {
        let mut tree = DynamicTree::new();
        let id = tree.create_proxy(&boxed(0.0, 0.0, 10.0), 1u32);
        tree.clear_moved(id);
        assert!(tree.move_proxy(id, &boxed(50.0, 0.0, 10.0), Vec2::new(2.0, -1.0)));
        assert!(tree.was_moved(id));
        let fat = tree.get_fat_aabb(id);
        assert!((fat.r - (60.0 + AABB_EXTENSION + 8.0)).abs() < 1e-4);
        assert!((fat.t - (-AABB_EXTENSION - 4.0)).abs() < 1e-4);
    }

    #[test]
    fn destroy_proxy_recycles_node() {
        let mut tree = DynamicTree::new();
        let ids: Vec<_> = (0..50u32)
            .map(|i| tree.create_proxy(&boxed(i as f32 * 3.0, (i % 7) as f32 * 5.0, 4.0), i))
            .collect();
        for id in ids.iter().step_by(2) {
            tree.destroy_proxy(*id);
        }
        tree.validate().expect("tree is valid after removals");
        assert_eq!(tree.proxy_count(), 25);
        assert!(!tree.is_valid_proxy(ids[0]));
        assert!(tree.is_valid_proxy(ids[1]));
    }

    #[test]
    fn tree_stays_balanced_for_sorted_inserts() {
        let mut tree = DynamicTree::new();
        for i in 0..512u32 {
            tree.create_proxy(&boxed(i as f32 * 12.0, 0.0, 10.0), i);
        }
        tree.validate().expect("tree is valid");
        // A degenerate chain would be 511 levels deep.
        assert!(tree.height() < 64, "height {}", tree.height());
        assert!(tree.area_ratio() >= 1.0);
    }

    #[test]
    fn shift_origin_moves_everything() {
        let mut tree = DynamicTree::new();
        let id = tree.create_proxy(&boxed(100.0, 100.0, 10.0), 1u32);
        tree.shift_origin(Vec2::new(100.0, 50.0));
        assert_eq!(query_all(&tree, &boxed(0.0, 50.0, 1.0)), vec![1]);
        let fat = tree.get_fat_aabb(id);
        assert!((fat.l + AABB_EXTENSION).abs() < 1e-4);
    }
}
