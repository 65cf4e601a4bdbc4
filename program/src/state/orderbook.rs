use crate::{
    error::{ClobError, ClobResult, ValidationError},
    state::{
        critbit::{LeafNode, Slab, SlabIterator},
        get_side_from_order_id, AccountTag, OrderId, RestingOrder, Side,
    },
};

/// The two sides of the book. Bids are consumed from the largest key, asks from the smallest.
pub struct OrderBookState<'a> {
    pub bids: Slab<'a>,
    pub asks: Slab<'a>,
}

impl<'slab> OrderBookState<'slab> {
    pub fn new_safe(
        bids_account: &'slab mut [u8],
        asks_account: &'slab mut [u8],
    ) -> ClobResult<Self> {
        let bids = Slab::from_buffer(bids_account, AccountTag::Bids)?;
        let asks = Slab::from_buffer(asks_account, AccountTag::Asks)?;
        if bids.header.market_address != asks.header.market_address {
            return Err(ClobError::InvalidAccountData);
        }
        Ok(Self { bids, asks })
    }
}

impl<'a> OrderBookState<'a> {
    pub fn get_tree(&self, side: Side) -> &Slab<'a> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn get_tree_mut(&mut self, side: Side) -> &mut Slab<'a> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// The order matched first on `side`.
    pub fn find_bbo(&self, side: Side) -> Option<LeafNode> {
        let tree = self.get_tree(side);
        let handle = match side {
            Side::Bid => tree.find_max(),
            Side::Ask => tree.find_min(),
        }?;
        Some(tree.leaf_nodes[handle as usize])
    }

    pub fn best_bid(&self) -> Option<(OrderId, RestingOrder)> {
        self.find_bbo(Side::Bid).map(|l| (l.order_id, l.order))
    }

    pub fn best_ask(&self) -> Option<(OrderId, RestingOrder)> {
        self.find_bbo(Side::Ask).map(|l| (l.order_id, l.order))
    }

    /// The order matched last on `side`, the first candidate for eviction.
    pub fn least_aggressive(&self, side: Side) -> Option<LeafNode> {
        let tree = self.get_tree(side);
        let handle = match side {
            Side::Bid => tree.find_min(),
            Side::Ask => tree.find_max(),
        }?;
        Some(tree.leaf_nodes[handle as usize])
    }

    pub fn get(&self, order_id: &OrderId) -> Option<RestingOrder> {
        let tree = self.get_tree(get_side_from_order_id(order_id));
        let handle = tree.find_by_key(order_id.as_key())?;
        Some(tree.leaf_nodes[handle as usize].order)
    }

    pub fn insert(&mut self, order_id: OrderId, order: RestingOrder, side: Side) -> ClobResult {
        if order.num_base_lots == 0 {
            return Err(ValidationError::ZeroSize.into());
        }
        if get_side_from_order_id(&order_id) != side {
            return Err(ClobError::InvalidAccountData);
        }
        self.get_tree_mut(side)
            .insert_leaf(&LeafNode::new(order_id, order))?;
        Ok(())
    }

    /// Removes the order if it rests on the book.
    pub fn remove(&mut self, order_id: &OrderId) -> Option<RestingOrder> {
        self.get_tree_mut(get_side_from_order_id(order_id))
            .remove_by_key(order_id.as_key())
            .map(|leaf| leaf.order)
    }

    /// Decrements the size of a resting order, removing it once empty. Returns the order as it
    /// stands after the reduction.
    pub fn reduce(&mut self, order_id: &OrderId, num_base_lots: u64) -> ClobResult<RestingOrder> {
        let tree = self.get_tree_mut(get_side_from_order_id(order_id));
        let key = order_id.as_key();
        let handle = tree.find_by_key(key).ok_or(ClobError::OrderNotFound)?;
        let order = &mut tree.leaf_nodes[handle as usize].order;
        order.num_base_lots = order
            .num_base_lots
            .checked_sub(num_base_lots)
            .ok_or(ClobError::ArithmeticOverflow)?;
        let remaining = *order;
        if remaining.num_base_lots == 0 {
            tree.remove_by_key(key);
        }
        Ok(remaining)
    }

    /// Orders of `side` in matching priority.
    pub fn iter_side(&self, side: Side) -> SlabIterator<'_> {
        self.get_tree(side).iter(side == Side::Ask)
    }

    /// Orders of `side` in matching priority, starting at the first order priced no better
    /// than `start_price`.
    pub fn iter_from(&self, side: Side, start_price: u64) -> SlabIterator<'_> {
        match side {
            Side::Bid => self
                .bids
                .iter_from(false, ((start_price as u128) << 64) | u64::MAX as u128),
            Side::Ask => self.asks.iter_from(true, (start_price as u128) << 64),
        }
    }

    /// Orders of `side` in matching priority, starting at `boundary` or the first order behind it.
    pub fn iter_behind(&self, side: Side, boundary: &OrderId) -> SlabIterator<'_> {
        self.get_tree(side)
            .iter_from(side == Side::Ask, boundary.as_key())
    }

    pub fn is_empty(&self) -> bool {
        self.asks.is_empty() && self.bids.is_empty()
    }
}
