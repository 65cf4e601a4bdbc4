//! A Slab contains the data for a slab header and two arrays of nodes of a critbit tree
//! whose leaves hold the resting orders of one side of the book.
use crate::error::{ClobError, ClobResult};
use crate::state::{AccountTag, OrderId, RestingOrder};
use bytemuck::{Pod, Zeroable};

#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq, Eq)]
#[repr(C)]
pub struct SlabHeader {
    leaf_free_list_len: u32,
    leaf_free_list_head: u32,
    leaf_bump_index: u32,

    inner_node_free_list_len: u32,
    inner_node_free_list_head: u32,
    inner_node_bump_index: u32,

    root_node: u32,
    pub leaf_count: u32,
    pub market_address: [u8; 32],
}

impl SlabHeader {
    pub const LEN: usize = std::mem::size_of::<Self>();
}

pub struct Slab<'a> {
    pub header: &'a mut SlabHeader,
    pub leaf_nodes: &'a mut [LeafNode],
    pub inner_nodes: &'a mut [InnerNode],
}

#[derive(Zeroable, Clone, Copy, Pod, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct LeafNode {
    pub order_id: OrderId,
    pub order: RestingOrder,
}

impl LeafNode {
    pub const LEN: usize = std::mem::size_of::<Self>();

    pub fn new(order_id: OrderId, order: RestingOrder) -> Self {
        Self { order_id, order }
    }

    #[inline(always)]
    pub fn key(&self) -> u128 {
        self.order_id.as_key()
    }

    pub fn price(&self) -> u64 {
        self.order_id.price_in_ticks
    }
}

pub type NodeHandle = u32;

pub const INNER_FLAG: u32 = 1 << 31;

#[derive(Zeroable, Clone, Copy, Pod, Debug)]
#[repr(C)]
pub struct InnerNode {
    key: OrderId,
    prefix_len: u64,
    pub children: [u32; 2],
}

impl InnerNode {
    pub const LEN: usize = std::mem::size_of::<Self>();

    pub(crate) fn walk_down(&self, search_key: u128) -> (NodeHandle, bool) {
        let crit_bit_mask = (1u128 << 127) >> self.prefix_len;
        let crit_bit = (search_key & crit_bit_mask) != 0;
        (self.children[crit_bit as usize], crit_bit)
    }

    /// Smallest and largest keys any leaf below this node can hold.
    fn key_range(&self) -> (u128, u128) {
        let prefix_mask = if self.prefix_len == 0 {
            0
        } else {
            u128::MAX << (128 - self.prefix_len)
        };
        let low = self.key.as_key() & prefix_mask;
        (low, low | !prefix_mask)
    }
}

pub enum Node {
    Leaf,
    Inner,
}

impl Node {
    pub fn from_handle(h: NodeHandle) -> Self {
        if h & INNER_FLAG == 0 {
            Self::Leaf
        } else {
            Self::Inner
        }
    }
}

impl<'a> Slab<'a> {
    pub fn compute_allocation_size(desired_order_capacity: usize) -> usize {
        8 + SlabHeader::LEN
            + LeafNode::LEN
            + desired_order_capacity.max(1).saturating_sub(1) * (LeafNode::LEN + InnerNode::LEN)
    }

    /// Tags a zeroed buffer as a book side of the given market.
    pub fn initialize(
        buf: &mut [u8],
        tag: AccountTag,
        market_address: [u8; 32],
    ) -> ClobResult {
        if buf.len() < Self::compute_allocation_size(1) {
            return Err(ClobError::InvalidAccountData);
        }
        if read_tag(buf) != AccountTag::Uninitialized as u64 {
            return Err(ClobError::AlreadyInitialized);
        }
        buf[0..8].copy_from_slice(&(tag as u64).to_le_bytes());
        let header = bytemuck::try_from_bytes_mut::<SlabHeader>(&mut buf[8..8 + SlabHeader::LEN])
            .map_err(|_| ClobError::InvalidAccountData)?;
        *header = SlabHeader::zeroed();
        header.market_address = market_address;
        Ok(())
    }

    pub fn from_buffer(buf: &'a mut [u8], expected_tag: AccountTag) -> ClobResult<Self> {
        if buf.len() < Self::compute_allocation_size(1) || read_tag(buf) != expected_tag as u64 {
            return Err(ClobError::InvalidAccountData);
        }
        let capacity =
            (buf.len() - 8 - SlabHeader::LEN - LeafNode::LEN) / (LeafNode::LEN + InnerNode::LEN);

        let (_, rem) = buf.split_at_mut(8);
        let (header, rem) = rem.split_at_mut(SlabHeader::LEN);
        let (leaves, rem) = rem.split_at_mut((capacity + 1) * LeafNode::LEN);
        let (inner_nodes, _) = rem.split_at_mut(capacity * InnerNode::LEN);

        Ok(Self {
            header: bytemuck::try_from_bytes_mut(header)
                .map_err(|_| ClobError::InvalidAccountData)?,
            leaf_nodes: bytemuck::try_cast_slice_mut(leaves)
                .map_err(|_| ClobError::InvalidAccountData)?,
            inner_nodes: bytemuck::try_cast_slice_mut(inner_nodes)
                .map_err(|_| ClobError::InvalidAccountData)?,
        })
    }

    pub fn root(&self) -> Option<NodeHandle> {
        if self.header.leaf_count == 0 {
            None
        } else {
            Some(self.header.root_node)
        }
    }

    pub fn len(&self) -> usize {
        self.header.leaf_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.leaf_count == 0
    }

    /// Maximum number of orders the slab can hold.
    pub fn capacity(&self) -> usize {
        self.leaf_nodes.len()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    fn allocate_leaf(&mut self) -> ClobResult<NodeHandle> {
        if self.header.leaf_free_list_len == 0 {
            if self.header.leaf_bump_index as usize >= self.leaf_nodes.len() {
                return Err(ClobError::BookFull);
            }
            let key = self.header.leaf_bump_index;
            self.header.leaf_bump_index += 1;
            return Ok(key);
        }

        let key = self.header.leaf_free_list_head;
        let free_leaf = &mut self.leaf_nodes[key as usize];
        let next = free_leaf.order.num_base_lots as u32;
        self.header.leaf_free_list_head = next;
        self.header.leaf_free_list_len -= 1;

        Ok(key)
    }

    fn free_leaf(&mut self, handle: NodeHandle) {
        if self.header.leaf_free_list_len != 0 {
            let next = self.header.leaf_free_list_head;
            self.leaf_nodes[handle as usize].order.num_base_lots = next as u64;
        }

        self.header.leaf_free_list_len += 1;
        self.header.leaf_free_list_head = handle;
    }

    fn allocate_inner_node(&mut self) -> ClobResult<NodeHandle> {
        if self.header.inner_node_free_list_len == 0 {
            if self.header.inner_node_bump_index as usize >= self.inner_nodes.len() {
                return Err(ClobError::BookFull);
            }
            let key = self.header.inner_node_bump_index;
            self.header.inner_node_bump_index += 1;
            return Ok(!key);
        }

        let key = self.header.inner_node_free_list_head;
        let free_inner_node = &mut self.inner_nodes[key as usize];
        let next = free_inner_node.prefix_len as u32;
        self.header.inner_node_free_list_head = next;
        self.header.inner_node_free_list_len -= 1;

        Ok(!key)
    }

    fn free_inner_node(&mut self, handle: NodeHandle) {
        if self.header.inner_node_free_list_len != 0 {
            let next = self.header.inner_node_free_list_head;
            self.inner_nodes[(!handle) as usize].prefix_len = next as u64;
        }

        self.header.inner_node_free_list_len += 1;
        self.header.inner_node_free_list_head = !handle;
    }

    /// Inserts a new leaf. An existing leaf with the same key is never overwritten.
    pub fn insert_leaf(&mut self, new_leaf: &LeafNode) -> ClobResult<NodeHandle> {
        let new_key = new_leaf.key();
        let mut root: NodeHandle = if self.header.leaf_count == 0 {
            // create a new root if none exists
            let new_leaf_handle = self.allocate_leaf()?;
            self.leaf_nodes[new_leaf_handle as usize] = *new_leaf;
            self.header.root_node = new_leaf_handle;
            self.header.leaf_count += 1;
            return Ok(new_leaf_handle);
        } else {
            self.header.root_node
        };
        let mut parent_node: Option<NodeHandle> = None;
        let mut previous_critbit: Option<bool> = None;
        loop {
            let shared_prefix_len = match Node::from_handle(root) {
                Node::Inner => {
                    let root_node = &self.inner_nodes[(!root) as usize];
                    let shared_prefix_len: u32 = (root_node.key.as_key() ^ new_key).leading_zeros();
                    let keep_old_root = shared_prefix_len >= root_node.prefix_len as u32;
                    if keep_old_root {
                        parent_node = Some(root);
                        let r = root_node.walk_down(new_key);
                        root = r.0;
                        previous_critbit = Some(r.1);
                        continue;
                    }

                    shared_prefix_len
                }
                Node::Leaf => {
                    let root_node = &self.leaf_nodes[root as usize];
                    if root_node.key() == new_key {
                        return Err(ClobError::DuplicateOrderId);
                    }
                    (root_node.key() ^ new_key).leading_zeros()
                }
            };

            // change the root in place to represent the LCA of [new_leaf] and [root]
            let crit_bit_mask: u128 = (1u128 << 127) >> shared_prefix_len;
            let new_leaf_crit_bit = (crit_bit_mask & new_key) != 0;
            let old_root_crit_bit = !new_leaf_crit_bit;

            let new_leaf_handle = self.allocate_leaf()?;
            let new_root_node_handle = match self.allocate_inner_node() {
                Ok(h) => h,
                Err(e) => {
                    self.free_leaf(new_leaf_handle);
                    return Err(e);
                }
            };
            self.leaf_nodes[new_leaf_handle as usize] = *new_leaf;

            let new_root_node = &mut self.inner_nodes[(!new_root_node_handle) as usize];
            new_root_node.prefix_len = shared_prefix_len as u64;
            new_root_node.key = new_leaf.order_id;
            new_root_node.children[new_leaf_crit_bit as usize] = new_leaf_handle;
            new_root_node.children[old_root_crit_bit as usize] = root;

            match (parent_node, previous_critbit) {
                (Some(n), Some(crit_bit)) => {
                    let node = &mut self.inner_nodes[(!n) as usize];
                    node.children[crit_bit as usize] = new_root_node_handle;
                }
                _ => self.header.root_node = new_root_node_handle,
            }
            self.header.leaf_count += 1;
            return Ok(new_leaf_handle);
        }
    }

    pub fn remove_by_key(&mut self, search_key: u128) -> Option<LeafNode> {
        let mut parent_h = self.root()?;
        let mut grandparent_h: Option<NodeHandle> = None;
        let mut prev_crit_bit = false;

        let (mut child_h, mut crit_bit) = match Node::from_handle(parent_h) {
            Node::Leaf => {
                let leaf = self.leaf_nodes[parent_h as usize];
                if leaf.key() != search_key {
                    return None;
                }
                self.free_leaf(parent_h);
                self.header.root_node = 0;
                self.header.leaf_count = 0;
                return Some(leaf);
            }
            Node::Inner => self.inner_nodes[(!parent_h) as usize].walk_down(search_key),
        };
        loop {
            match Node::from_handle(child_h) {
                Node::Inner => {
                    let inner = self.inner_nodes[(!child_h) as usize];
                    let (grandchild_h, grandchild_crit_bit) = inner.walk_down(search_key);
                    grandparent_h = Some(parent_h);
                    parent_h = child_h;
                    child_h = grandchild_h;
                    prev_crit_bit = crit_bit;
                    crit_bit = grandchild_crit_bit;
                    continue;
                }
                Node::Leaf => {
                    if self.leaf_nodes[child_h as usize].key() != search_key {
                        return None;
                    }
                    break;
                }
            }
        }

        // replace parent with its remaining child node
        let other_child_h = self.inner_nodes[(!parent_h) as usize].children[!crit_bit as usize];

        match grandparent_h {
            Some(h) => {
                let r = &mut self.inner_nodes[(!h) as usize];
                r.children[prev_crit_bit as usize] = other_child_h;
            }
            None => self.header.root_node = other_child_h,
        }
        self.header.leaf_count -= 1;
        let removed_leaf = self.leaf_nodes[child_h as usize];
        self.free_leaf(child_h);
        self.free_inner_node(parent_h);
        Some(removed_leaf)
    }

    fn find_min_max(&self, find_max: bool) -> Option<NodeHandle> {
        let mut root: NodeHandle = self.root()?;
        loop {
            match Node::from_handle(root) {
                Node::Leaf => return Some(root),
                Node::Inner => {
                    let node = self.inner_nodes[(!root) as usize];
                    root = node.children[if find_max { 1 } else { 0 }];
                }
            }
        }
    }

    pub fn find_min(&self) -> Option<NodeHandle> {
        self.find_min_max(false)
    }

    pub fn find_max(&self) -> Option<NodeHandle> {
        self.find_min_max(true)
    }

    pub fn find_by_key(&self, search_key: u128) -> Option<NodeHandle> {
        let mut node_handle: NodeHandle = self.root()?;
        loop {
            match Node::from_handle(node_handle) {
                Node::Leaf => {
                    let n = &self.leaf_nodes[node_handle as usize];
                    if search_key == n.key() {
                        return Some(node_handle);
                    } else {
                        return None;
                    }
                }
                Node::Inner => {
                    let n = &self.inner_nodes[(!node_handle) as usize];
                    let common_prefix_len = (search_key ^ n.key.as_key()).leading_zeros();
                    if common_prefix_len < n.prefix_len as u32 {
                        return None;
                    }
                    node_handle = n.walk_down(search_key).0;
                }
            }
        }
    }

    /// Get a key ascending or key descending iterator over all the Slab's orders
    pub fn iter(&self, ascending: bool) -> SlabIterator<'_> {
        SlabIterator {
            leaf_nodes: &self.leaf_nodes[..],
            inner_nodes: &self.inner_nodes[..],
            search_stack: self.root().into_iter().collect(),
            ascending,
            bound: None,
        }
    }

    /// Same as [`Slab::iter`], skipping every key before `bound` in iteration order.
    pub fn iter_from(&self, ascending: bool, bound: u128) -> SlabIterator<'_> {
        SlabIterator {
            bound: Some(bound),
            ..self.iter(ascending)
        }
    }

    #[cfg(test)]
    fn dump(&self) {
        println!("Header (parsed):");
        println!("{:?}", *self.header);
        for (k, leaf_node) in self.leaf_nodes.iter().enumerate() {
            println!("Leaf key {:?}", k);
            println!("{:?}", leaf_node);
        }

        for (k, inner_node) in self.inner_nodes.iter().enumerate() {
            println!("Inner Node index {:?}, key {:?}", k, !(k as u32));
            println!("{:?}", inner_node);
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        // first check the live tree contents
        let mut leaf_count = 0;
        let mut inner_node_count = 0;
        fn check_rec(
            slab: &Slab,
            h: NodeHandle,
            last_prefix_len: u64,
            last_prefix: u128,
            last_critbit: bool,
            leaf_count: &mut u64,
            inner_node_count: &mut u64,
        ) {
            let prefix_mask = (((((1u128) << 127) as i128) >> last_prefix_len) as u128) << 1;
            match Node::from_handle(h) {
                Node::Leaf => {
                    *leaf_count += 1;
                    let key = slab.leaf_nodes[h as usize].key();
                    assert_eq!(last_critbit, (key & ((1u128 << 127) >> last_prefix_len)) != 0);
                    assert_eq!(last_prefix & prefix_mask, key & prefix_mask);
                }
                Node::Inner => {
                    *inner_node_count += 1;
                    let node = &slab.inner_nodes[(!h) as usize];
                    let key = node.key.as_key();

                    assert!(node.prefix_len > last_prefix_len);
                    assert_eq!(last_critbit, (key & ((1u128 << 127) >> last_prefix_len)) != 0);
                    assert_eq!(last_prefix & prefix_mask, key & prefix_mask);
                    for (child, critbit) in [(node.children[0], false), (node.children[1], true)] {
                        check_rec(
                            slab,
                            child,
                            node.prefix_len,
                            key,
                            critbit,
                            leaf_count,
                            inner_node_count,
                        );
                    }
                }
            }
        }
        if let Some(root) = self.root() {
            if matches!(Node::from_handle(root), Node::Inner) {
                inner_node_count += 1;
                let n = &self.inner_nodes[(!root) as usize];
                for (child, critbit) in [(n.children[0], false), (n.children[1], true)] {
                    check_rec(
                        self,
                        child,
                        n.prefix_len,
                        n.key.as_key(),
                        critbit,
                        &mut leaf_count,
                        &mut inner_node_count,
                    );
                }
            } else {
                leaf_count += 1;
            }
        }
        assert_eq!(
            inner_node_count + self.header.inner_node_free_list_len as u64,
            self.header.inner_node_bump_index as u64
        );
        assert_eq!(
            self.header.leaf_count as u64 + self.header.leaf_free_list_len as u64,
            self.header.leaf_bump_index as u64
        );
        assert_eq!(leaf_count, self.header.leaf_count as u64);
    }
}

fn read_tag(buf: &[u8]) -> u64 {
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&buf[0..8]);
    u64::from_le_bytes(tag)
}

/// Depth-first walk over the leaves of a slab, in key order. Cloning the iterator
/// restarts the walk from the same position.
#[derive(Clone)]
pub struct SlabIterator<'s> {
    leaf_nodes: &'s [LeafNode],
    inner_nodes: &'s [InnerNode],
    search_stack: Vec<NodeHandle>,
    ascending: bool,
    bound: Option<u128>,
}

impl<'s> SlabIterator<'s> {
    fn before_bound(&self, low: u128, high: u128) -> bool {
        match self.bound {
            None => false,
            Some(bound) if self.ascending => high < bound,
            Some(bound) => low > bound,
        }
    }
}

impl<'s> Iterator for SlabIterator<'s> {
    type Item = LeafNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.search_stack.pop() {
            match Node::from_handle(current) {
                Node::Inner => {
                    let n = &self.inner_nodes[(!current) as usize];
                    let (low, high) = n.key_range();
                    if self.before_bound(low, high) {
                        continue;
                    }
                    self.search_stack.push(n.children[self.ascending as usize]);
                    self.search_stack.push(n.children[!self.ascending as usize]);
                }
                Node::Leaf => {
                    let leaf = self.leaf_nodes[current as usize];
                    if self.before_bound(leaf.key(), leaf.key()) {
                        continue;
                    }
                    return Some(leaf);
                }
            }
        }
        None
    }
}

/////////////////////////////////////
// Tests
