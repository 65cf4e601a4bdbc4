use bytemuck::{Pod, Zeroable};
use num_derive::FromPrimitive;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use num_traits::FromPrimitive;
use solana_program::msg;

use super::{AccountTag, OrderId, Side};
use crate::error::{ClobError, ClobResult};

#[derive(FromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventTag {
    Fill,
    Out,
    Place,
}

/// Why a resting order left the book, fully or partially, without being filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OutReason {
    Cancelled,
    Expired,
    SelfTrade,
    Evicted,
    Reduced,
}

/// A maker order was matched. The maker's funds are already settled.
#[derive(Zeroable, Clone, Pod, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct FillEvent {
    tag: u8,
    pub taker_side: u8,
    _padding: [u8; 6],
    pub maker_trader_index: u64,
    pub taker_trader_index: u64,
    /// The order id of the maker order
    pub maker_order_id: OrderId,
    /// The total base size of the transaction
    pub base_lots: u64,
    /// The total quote size of the transaction
    pub quote_lots: u64,
}

impl FillEvent {
    pub fn new(
        taker_side: Side,
        maker_trader_index: u64,
        taker_trader_index: u64,
        maker_order_id: OrderId,
        base_lots: u64,
        quote_lots: u64,
    ) -> Self {
        Self {
            tag: EventTag::Fill as u8,
            taker_side: taker_side.into(),
            _padding: [0; 6],
            maker_trader_index,
            taker_trader_index,
            maker_order_id,
            base_lots,
            quote_lots,
        }
    }
}

/// Base lots were taken off a resting order and the matching funds unlocked.
#[derive(Zeroable, Clone, Pod, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct OutEvent {
    tag: u8,
    pub side: u8,
    pub reason: u8,
    _padding: [u8; 5],
    pub trader_index: u64,
    pub order_id: OrderId,
    pub base_lots_removed: u64,
    pub base_lots_remaining: u64,
    _reserved: u64,
}

impl OutEvent {
    pub fn new(
        reason: OutReason,
        trader_index: u64,
        order_id: OrderId,
        base_lots_removed: u64,
        base_lots_remaining: u64,
    ) -> Self {
        Self {
            tag: EventTag::Out as u8,
            side: order_id.side().into(),
            reason: reason.into(),
            _padding: [0; 5],
            trader_index,
            order_id,
            base_lots_removed,
            base_lots_remaining,
            _reserved: 0,
        }
    }

    pub fn out_reason(&self) -> Option<OutReason> {
        OutReason::try_from(self.reason).ok()
    }
}

/// An order was posted to the book and its funds locked.
#[derive(Zeroable, Clone, Pod, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct PlaceEvent {
    tag: u8,
    pub side: u8,
    _padding: [u8; 6],
    pub trader_index: u64,
    pub order_id: OrderId,
    pub base_lots: u64,
    client_order_id: [u64; 2],
}

impl PlaceEvent {
    pub fn new(trader_index: u64, order_id: OrderId, base_lots: u64, client_order_id: u128) -> Self {
        Self {
            tag: EventTag::Place as u8,
            side: order_id.side().into(),
            _padding: [0; 6],
            trader_index,
            order_id,
            base_lots,
            client_order_id: [client_order_id as u64, (client_order_id >> 64) as u64],
        }
    }

    pub fn client_order_id(&self) -> u128 {
        ((self.client_order_id[1] as u128) << 64) | self.client_order_id[0] as u128
    }
}

/// Storage layout shared by every event type.
#[derive(Zeroable, Clone, Pod, Copy, Debug)]
#[repr(C)]
pub struct GenericEvent {
    tag: u8,
    _header: [u8; 7],
    _data: [u64; 6],
}

impl GenericEvent {
    pub const LEN: usize = std::mem::size_of::<Self>();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketEvent {
    Fill(FillEvent),
    Out(OutEvent),
    Place(PlaceEvent),
}

impl MarketEvent {
    fn to_generic(self) -> GenericEvent {
        match self {
            MarketEvent::Fill(e) => bytemuck::cast(e),
            MarketEvent::Out(e) => bytemuck::cast(e),
            MarketEvent::Place(e) => bytemuck::cast(e),
        }
    }

    fn from_generic(event: &GenericEvent) -> ClobResult<Self> {
        match EventTag::from_u8(event.tag).ok_or(ClobError::InvalidAccountData)? {
            EventTag::Fill => Ok(MarketEvent::Fill(bytemuck::cast(*event))),
            EventTag::Out => Ok(MarketEvent::Out(bytemuck::cast(*event))),
            EventTag::Place => Ok(MarketEvent::Place(bytemuck::cast(*event))),
        }
    }
}

/// Receives every lock, unlock and fill produced by a market operation.
pub trait EventSink {
    fn push_event(&mut self, event: MarketEvent) -> ClobResult;

    /// Number of events that can still be pushed. Operations check it before mutating anything.
    fn remaining_capacity(&self) -> usize;
}

impl EventSink for Vec<MarketEvent> {
    fn push_event(&mut self, event: MarketEvent) -> ClobResult {
        self.push(event);
        Ok(())
    }

    fn remaining_capacity(&self) -> usize {
        usize::MAX
    }
}

////////////////////////////////////////////////////
// Event Queue

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
/// Describes the current state of the event queue
pub struct EventQueueHeader {
    /// The current event
    pub head: u64,
    /// The current event queue length
    pub count: u64,
    /// Number of events ever pushed
    pub seq_num: u64,
}

impl EventQueueHeader {
    pub const LEN: usize = std::mem::size_of::<Self>();
}

/// The event queue account contains a serialized header and a circular buffer of events.
pub struct EventQueue<'a> {
    pub(crate) header: &'a mut EventQueueHeader,
    pub(crate) events: &'a mut [GenericEvent],
}

impl<'queue> EventQueue<'queue> {
    /// Compute the allocation size for an event queue of a desired capacity
    pub fn compute_allocation_size(desired_event_capacity: usize) -> usize {
        desired_event_capacity * GenericEvent::LEN + EventQueueHeader::LEN + 8
    }

    pub fn initialize(buf: &mut [u8]) -> ClobResult {
        if buf.len() < Self::compute_allocation_size(1) {
            msg!("The event queue account is too small!");
            return Err(ClobError::InvalidAccountData);
        }
        if buf[0..8] != (AccountTag::Uninitialized as u64).to_le_bytes() {
            return Err(ClobError::AlreadyInitialized);
        }
        buf.fill(0);
        buf[0..8].copy_from_slice(&(AccountTag::EventQueue as u64).to_le_bytes());
        Ok(())
    }

    pub fn from_buffer(buf: &'queue mut [u8]) -> ClobResult<Self> {
        if buf.len() < Self::compute_allocation_size(1)
            || buf[0..8] != (AccountTag::EventQueue as u64).to_le_bytes()
        {
            return Err(ClobError::InvalidAccountData);
        }
        let capacity = (buf.len() - 8 - EventQueueHeader::LEN) / GenericEvent::LEN;
        let (header, remaining) = buf[8..].split_at_mut(EventQueueHeader::LEN);
        let (events, _) = remaining.split_at_mut(capacity * GenericEvent::LEN);
        let queue = Self {
            header: bytemuck::try_from_bytes_mut(header)
                .map_err(|_| ClobError::InvalidAccountData)?,
            events: bytemuck::try_cast_slice_mut(events)
                .map_err(|_| ClobError::InvalidAccountData)?,
        };
        if queue.header.count as usize > queue.events.len()
            || queue.header.head as usize >= queue.events.len()
        {
            return Err(ClobError::InvalidAccountData);
        }
        Ok(queue)
    }

    pub fn push_back(&mut self, event: MarketEvent) -> ClobResult {
        if self.full() {
            return Err(ClobError::EventQueueFull);
        }
        let event_idx = (self.header.head + self.header.count) as usize % self.events.len();
        self.events[event_idx] = event.to_generic();
        self.header.count += 1;
        self.header.seq_num += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.header.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn full(&self) -> bool {
        self.header.count as usize == self.events.len()
    }

    /// Retrieves the event at position index in the queue.
    pub fn peek_at(&self, index: u64) -> Option<MarketEvent> {
        if self.header.count <= index {
            return None;
        }
        let event_idx = (self.header.head + index) as usize % self.events.len();
        MarketEvent::from_generic(&self.events[event_idx]).ok()
    }

    /// Pop n entries from the event queue, returning how many were popped
    pub fn pop_n(&mut self, number_of_entries_to_pop: u64) -> u64 {
        let capped_number_of_entries_to_pop =
            std::cmp::min(self.header.count, number_of_entries_to_pop);
        self.header.count -= capped_number_of_entries_to_pop;
        self.header.head =
            (self.header.head + capped_number_of_entries_to_pop) % (self.events.len() as u64);
        capped_number_of_entries_to_pop
    }

    /// Returns an iterator over all the queue's events
    pub fn iter(&self) -> QueueIterator<'_> {
        QueueIterator {
            events: &self.events[..],
            current_index: self.header.head as usize,
            remaining: self.header.count,
        }
    }
}

impl<'queue> EventSink for EventQueue<'queue> {
    fn push_event(&mut self, event: MarketEvent) -> ClobResult {
        self.push_back(event)
    }

    fn remaining_capacity(&self) -> usize {
        self.events.len() - self.header.count as usize
    }
}

/// Utility struct for iterating over a queue
pub struct QueueIterator<'a> {
    events: &'a [GenericEvent],
    current_index: usize,
    remaining: u64,
}

impl<'a> Iterator for QueueIterator<'a> {
    type Item = MarketEvent;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining != 0 {
            let event = &self.events[self.current_index];
            self.current_index = (self.current_index + 1) % self.events.len();
            self.remaining -= 1;
            if let Ok(e) = MarketEvent::from_generic(event) {
                return Some(e);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out_event(n: u64) -> MarketEvent {
        MarketEvent::Out(OutEvent::new(
            OutReason::Cancelled,
            n,
            OrderId::new_for_side(n, n, Side::Ask),
            n,
            0,
        ))
    }

    #[test]
    fn queue_wraps_around() {
        let mut buf = vec![0u8; EventQueue::compute_allocation_size(3)];
        EventQueue::initialize(&mut buf).unwrap();
        let mut queue = EventQueue::from_buffer(&mut buf).unwrap();
        assert_eq!(queue.capacity(), 3);

        for n in 0..3 {
            queue.push_event(out_event(n)).unwrap();
        }
        assert_eq!(queue.remaining_capacity(), 0);
        assert_eq!(queue.push_event(out_event(9)), Err(ClobError::EventQueueFull));

        assert_eq!(queue.pop_n(2), 2);
        queue.push_event(out_event(3)).unwrap();
        queue.push_event(out_event(4)).unwrap();
        assert_eq!(queue.peek_at(0), Some(out_event(2)));
        let all = queue.iter().collect::<Vec<_>>();
        assert_eq!(all, vec![out_event(2), out_event(3), out_event(4)]);
        assert_eq!(queue.pop_n(10), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.header.seq_num, 5);
    }

    #[test]
    fn events_keep_their_fields_through_storage() {
        let fill = FillEvent::new(Side::Bid, 1, 2, OrderId::new_for_side(100, 0, Side::Ask), 5, 500);
        let place = PlaceEvent::new(3, OrderId::new_for_side(99, 0, Side::Bid), 7, u128::MAX - 1);
        let mut buf = vec![0u8; EventQueue::compute_allocation_size(4)];
        EventQueue::initialize(&mut buf).unwrap();
        let mut queue = EventQueue::from_buffer(&mut buf).unwrap();
        queue.push_back(MarketEvent::Fill(fill)).unwrap();
        queue.push_back(MarketEvent::Place(place)).unwrap();

        assert_eq!(queue.peek_at(0), Some(MarketEvent::Fill(fill)));
        match queue.peek_at(1) {
            Some(MarketEvent::Place(p)) => {
                assert_eq!(p.client_order_id(), u128::MAX - 1);
                assert_eq!(Side::try_from(p.side).unwrap(), Side::Bid);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
