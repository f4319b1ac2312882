//! Broadphase built on top of [`DynamicTree`].
//!
//! The broadphase does not persist pairs. Every proxy that moved (or was
//! touched) since the last `update_pairs` call is queried against the tree and
//! each overlapping fat-AABB pair is reported once. It's up to the caller to
//! filter pairs by their real hitboxes.

use super::dynamic_tree::{DynamicTree, ProxyId, NULL_NODE};
use glam::Vec2;
use jj_core::Aabb;

const DEFAULT_MOVE_CAPACITY: usize = 64;
const DEFAULT_PAIR_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct CollisionPair {
    proxy_a: ProxyId,
    proxy_b: ProxyId,
}

#[derive(Debug, Clone)]
pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    proxy_count: usize,
    move_buffer: Vec<ProxyId>,
    pair_buffer: Vec<CollisionPair>,
}

impl<T: Copy> BroadPhase<T> {
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            proxy_count: 0,
            move_buffer: Vec::with_capacity(DEFAULT_MOVE_CAPACITY),
            pair_buffer: Vec::with_capacity(DEFAULT_PAIR_CAPACITY),
        }
    }

    /// Create a proxy. Pairs are not reported until `update_pairs` is called.
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> ProxyId {
        let proxy_id = self.tree.create_proxy(aabb, user_data);
        self.proxy_count += 1;
        self.buffer_move(proxy_id);
        proxy_id
    }

    pub fn destroy_proxy(&mut self, proxy_id: ProxyId) {
        debug_assert!(self.tree.is_valid_proxy(proxy_id), "invalid proxy {proxy_id}");
        if !self.tree.is_valid_proxy(proxy_id) {
            log::warn!("Ignoring destroy of invalid proxy {proxy_id}");
            return;
        }
        self.unbuffer_move(proxy_id);
        self.proxy_count -= 1;
        self.tree.destroy_proxy(proxy_id);
    }

    /// Move a proxy with a swept AABB. The proxy is always re-queried on the next
    /// `update_pairs`, because callers only move proxies whose actor changed.
    pub fn move_proxy(&mut self, proxy_id: ProxyId, aabb: &Aabb, displacement: Vec2) {
        debug_assert!(self.tree.is_valid_proxy(proxy_id), "invalid proxy {proxy_id}");
        if !self.tree.is_valid_proxy(proxy_id) {
            log::warn!("Ignoring move of invalid proxy {proxy_id}");
            return;
        }
        self.tree.move_proxy(proxy_id, aabb, displacement);
        self.buffer_move(proxy_id);
    }

    /// Re-process the proxy's pairs on the next `update_pairs` without moving it.
    pub fn touch_proxy(&mut self, proxy_id: ProxyId) {
        if self.tree.is_valid_proxy(proxy_id) {
            self.buffer_move(proxy_id);
        }
    }

    pub fn is_valid_proxy(&self, proxy_id: ProxyId) -> bool {
        self.tree.is_valid_proxy(proxy_id)
    }

    pub fn get_fat_aabb(&self, proxy_id: ProxyId) -> Aabb {
        self.tree.get_fat_aabb(proxy_id)
    }

    pub fn get_user_data(&self, proxy_id: ProxyId) -> Option<T> {
        self.tree.get_user_data(proxy_id)
    }

    pub fn test_overlap(&self, proxy_a: ProxyId, proxy_b: ProxyId) -> bool {
        self.tree
            .get_fat_aabb(proxy_a)
            .overlaps(&self.tree.get_fat_aabb(proxy_b))
    }

    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    pub fn tree_height(&self) -> i32 {
        self.tree.height()
    }

    pub fn tree_balance(&self) -> i32 {
        self.tree.max_balance()
    }

    pub fn tree_quality(&self) -> f32 {
        self.tree.area_ratio()
    }

    pub fn shift_origin(&mut self, new_origin: Vec2) {
        self.tree.shift_origin(new_origin);
    }

    pub fn validate(&self) -> Result<(), String> {
        self.tree.validate()
    }

    /// Visit the user data of every proxy whose fat AABB overlaps `aabb`.
    pub fn query<F>(&self, aabb: &Aabb, mut visitor: F)
    where
        F: FnMut(ProxyId, T) -> bool,
    {
        self.tree.query(aabb, |proxy_id| match self.tree.get_user_data(proxy_id) {
            Some(data) => visitor(proxy_id, data),
            None => true,
        });
    }

    /// Report every potentially new pair involving a moved proxy, as
    /// `handler(user_a, user_b)` with `proxy_a < proxy_b`.
    pub fn update_pairs<F>(&mut self, mut handler: F)
    where
        F: FnMut(T, T),
    {
        self.pair_buffer.clear();

        // Perform tree queries for all moving proxies.
        for &query_proxy in &self.move_buffer {
            if query_proxy == NULL_NODE {
                continue;
            }

            // Query with the fat AABB so we don't miss a pair that may touch later.
            let fat_aabb = self.tree.get_fat_aabb(query_proxy);
            let tree = &self.tree;
            let pairs = &mut self.pair_buffer;
            tree.query(&fat_aabb, |proxy_id| {
                // A proxy cannot form a pair with itself.
                if proxy_id == query_proxy {
                    return true;
                }
                // Both proxies are moving. Avoid duplicate pairs.
                if tree.was_moved(proxy_id) && proxy_id > query_proxy {
                    return true;
                }
                pairs.push(CollisionPair {
                    proxy_a: proxy_id.min(query_proxy),
                    proxy_b: proxy_id.max(query_proxy),
                });
                true
            });
        }

        // Touched proxies keep their moved flag clear, so both sides of a
        // touched pair report it.
        self.pair_buffer.sort_unstable();
        self.pair_buffer.dedup();

        for pair in &self.pair_buffer {
            let user_a = self.tree.get_user_data(pair.proxy_a);
            let user_b = self.tree.get_user_data(pair.proxy_b);
            if let (Some(a), Some(b)) = (user_a, user_b) {
                handler(a, b);
            }
        }

        // Clear move flags
        for &proxy_id in &self.move_buffer {
            if proxy_id != NULL_NODE {
                self.tree.clear_moved(proxy_id);
            }
        }

        self.move_buffer.clear();
    }

    fn buffer_move(&mut self, proxy_id: ProxyId) {
        self.move_buffer.push(proxy_id);
    }

    fn unbuffer_move(&mut self, proxy_id: ProxyId) {
        for entry in &mut self.move_buffer {
            if *entry == proxy_id {
                *entry = NULL_NODE;
            }
        }
    }
}

impl<T: Copy> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn boxed(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::new(x, y, x + w, y + h)
    }

    fn collect_pairs(bp: &mut BroadPhase<u32>) -> Vec<(u32, u32)> {
        let mut pairs = Vec::new();
        bp.update_pairs(|a, b| pairs.push((a.min(b), a.max(b))));
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn new_overlapping_proxies_report_one_pair() {
        let mut bp = BroadPhase::new();
        bp.create_proxy(&boxed(0.0, 0.0, 10.0, 10.0), 1u32);
        bp.create_proxy(&boxed(5.0, 5.0, 10.0, 10.0), 2u32);
        bp.create_proxy(&boxed(100.0, 0.0, 10.0, 10.0), 3u32);

        assert_eq!(collect_pairs(&mut bp), vec![(1, 2)]);
        // Nothing moved since, nothing is reported.
        assert!(collect_pairs(&mut bp).is_empty());
    }

    #[test]
    fn touch_proxy_re_reports_stationary_pair() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&boxed(0.0, 0.0, 10.0, 10.0), 1u32);
        let b = bp.create_proxy(&boxed(5.0, 5.0, 10.0, 10.0), 2u32);
        collect_pairs(&mut bp);

        bp.touch_proxy(a);
        assert_eq!(collect_pairs(&mut bp), vec![(1, 2)]);

        bp.touch_proxy(a);
        bp.touch_proxy(b);
        assert_eq!(collect_pairs(&mut bp), vec![(1, 2)]);
    }

    #[test]
    fn moved_proxy_only_pairs_with_new_neighbours() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&boxed(0.0, 0.0, 10.0, 10.0), 1u32);
        bp.create_proxy(&boxed(50.0, 0.0, 10.0, 10.0), 2u32);
        assert!(collect_pairs(&mut bp).is_empty());

        bp.move_proxy(a, &boxed(45.0, 0.0, 10.0, 10.0), Vec2::new(45.0, 0.0));
        assert_eq!(collect_pairs(&mut bp), vec![(1, 2)]);
    }

    #[test]
    fn destroyed_proxy_is_never_reported() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&boxed(0.0, 0.0, 10.0, 10.0), 1u32);
        bp.create_proxy(&boxed(5.0, 5.0, 10.0, 10.0), 2u32);
        bp.destroy_proxy(a);
        assert!(collect_pairs(&mut bp).is_empty());
        assert_eq!(bp.proxy_count(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create(f32, f32, f32, f32),
        Move(usize, f32, f32),
        Destroy(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0.0f32..500.0, 0.0f32..500.0, 1.0f32..40.0, 1.0f32..40.0)
                .prop_map(|(x, y, w, h)| Op::Create(x, y, w, h)),
            (any::<usize>(), -30.0f32..30.0, -30.0f32..30.0).prop_map(|(i, dx, dy)| Op::Move(i, dx, dy)),
            any::<usize>().prop_map(Op::Destroy),
        ]
    }

    proptest! {
        #[test]
        fn query_matches_brute_force(
            ops in prop::collection::vec(op_strategy(), 1..120),
            query in (0.0f32..500.0, 0.0f32..500.0, 1.0f32..150.0, 1.0f32..150.0),
        ) {
            let mut bp = BroadPhase::new();
            // user data -> (proxy, true aabb)
            let mut live: BTreeMap<u32, (ProxyId, Aabb)> = BTreeMap::new();
            let mut next_id = 0u32;

            for op in ops {
                match op {
                    Op::Create(x, y, w, h) => {
                        let aabb = boxed(x, y, w, h);
                        let proxy = bp.create_proxy(&aabb, next_id);
                        live.insert(next_id, (proxy, aabb));
                        next_id += 1;
                    }
                    Op::Move(i, dx, dy) if !live.is_empty() => {
                        let key = *live.keys().nth(i % live.len()).expect("key in range");
                        let entry = live.get_mut(&key).expect("live entry");
                        let moved = entry.1.translated(Vec2::new(dx, dy));
                        bp.move_proxy(entry.0, &moved, Vec2::new(dx, dy));
                        entry.1 = moved;
                    }
                    Op::Destroy(i) if !live.is_empty() => {
                        let key = *live.keys().nth(i % live.len()).expect("key in range");
                        let (proxy, _) = live.remove(&key).expect("live entry");
                        bp.destroy_proxy(proxy);
                    }
                    _ => {}
                }
            }

            prop_assert!(bp.validate().is_ok());
            prop_assert_eq!(bp.proxy_count(), live.len());

            let (qx, qy, qw, qh) = query;
            let query_aabb = boxed(qx, qy, qw, qh);

            let mut from_tree = BTreeSet::new();
            bp.query(&query_aabb, |_, data| {
                from_tree.insert(data);
                true
            });

            let brute: BTreeSet<u32> = live
                .iter()
                .filter(|(_, (proxy, aabb))| {
                    // Fat bounds always contain the true box.
                    let fat = bp.get_fat_aabb(*proxy);
                    assert!(fat.contains(aabb));
                    fat.overlaps(&query_aabb)
                })
                .map(|(id, _)| *id)
                .collect();

            prop_assert_eq!(from_tree, brute);
        }

        #[test]
        fn touched_pairs_match_brute_force(
            boxes in prop::collection::vec((0.0f32..200.0, 0.0f32..200.0, 1.0f32..30.0, 1.0f32..30.0), 2..40),
        ) {
            let mut bp = BroadPhase::new();
            let mut proxies = Vec::new();
            for (i, (x, y, w, h)) in boxes.iter().enumerate() {
                proxies.push(bp.create_proxy(&boxed(*x, *y, *w, *h), i as u32));
            }
            collect_pairs(&mut bp);

            for proxy in &proxies {
                bp.touch_proxy(*proxy);
            }
            let reported = collect_pairs(&mut bp);

            let mut expected = Vec::new();
            for i in 0..proxies.len() {
                for j in (i + 1)..proxies.len() {
                    if bp.test_overlap(proxies[i], proxies[j]) {
                        expected.push((i as u32, j as u32));
                    }
                }
            }
            prop_assert_eq!(reported, expected);
        }
    }
}
