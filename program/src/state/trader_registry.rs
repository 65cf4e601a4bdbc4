//! Trader seats: a dense array of balances indexed by trader index, plus a directory sorted by
//! trader key for identity lookups. Seat indices are recycled through a free list, and only once
//! the seat holds no funds and no resting orders.
use bytemuck::{Pod, Zeroable};

use crate::error::{ClobError, ClobResult, ValidationError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TraderState {
    pub quote_lots_locked: u64,
    pub quote_lots_free: u64,
    pub base_lots_locked: u64,
    pub base_lots_free: u64,
}

impl TraderState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn deposit(&mut self, quote_lots: u64, base_lots: u64) -> ClobResult {
        self.quote_lots_free = checked_add(self.quote_lots_free, quote_lots)?;
        self.base_lots_free = checked_add(self.base_lots_free, base_lots)?;
        Ok(())
    }

    pub fn withdraw(&mut self, quote_lots: u64, base_lots: u64) -> ClobResult {
        if quote_lots > self.quote_lots_free || base_lots > self.base_lots_free {
            return Err(ClobError::InsufficientFunds);
        }
        self.quote_lots_free -= quote_lots;
        self.base_lots_free -= base_lots;
        Ok(())
    }

    /// Takes up to `quote_lots` out of the free balance and returns the amount taken.
    pub fn use_free_quote_lots(&mut self, quote_lots: u64) -> u64 {
        let used = self.quote_lots_free.min(quote_lots);
        self.quote_lots_free -= used;
        used
    }

    /// Takes up to `base_lots` out of the free balance and returns the amount taken.
    pub fn use_free_base_lots(&mut self, base_lots: u64) -> u64 {
        let used = self.base_lots_free.min(base_lots);
        self.base_lots_free -= used;
        used
    }

    pub fn lock_quote_lots(&mut self, quote_lots: u64) -> ClobResult {
        self.quote_lots_locked = checked_add(self.quote_lots_locked, quote_lots)?;
        Ok(())
    }

    pub fn lock_base_lots(&mut self, base_lots: u64) -> ClobResult {
        self.base_lots_locked = checked_add(self.base_lots_locked, base_lots)?;
        Ok(())
    }

    /// Moves locked quote back to the free balance.
    pub fn unlock_quote_lots(&mut self, quote_lots: u64) -> ClobResult {
        self.quote_lots_locked = checked_sub(self.quote_lots_locked, quote_lots)?;
        self.quote_lots_free = checked_add(self.quote_lots_free, quote_lots)?;
        Ok(())
    }

    /// Moves locked base back to the free balance.
    pub fn unlock_base_lots(&mut self, base_lots: u64) -> ClobResult {
        self.base_lots_locked = checked_sub(self.base_lots_locked, base_lots)?;
        self.base_lots_free = checked_add(self.base_lots_free, base_lots)?;
        Ok(())
    }

    /// A resting bid was filled: the locked quote is paid away and base is received.
    pub fn process_limit_buy(&mut self, quote_lots_paid: u64, base_lots_received: u64) -> ClobResult {
        self.quote_lots_locked = checked_sub(self.quote_lots_locked, quote_lots_paid)?;
        self.base_lots_free = checked_add(self.base_lots_free, base_lots_received)?;
        Ok(())
    }

    /// A resting ask was filled: the locked base is paid away and quote is received.
    pub fn process_limit_sell(&mut self, base_lots_paid: u64, quote_lots_received: u64) -> ClobResult {
        self.base_lots_locked = checked_sub(self.base_lots_locked, base_lots_paid)?;
        self.quote_lots_free = checked_add(self.quote_lots_free, quote_lots_received)?;
        Ok(())
    }
}

fn checked_add(a: u64, b: u64) -> ClobResult<u64> {
    a.checked_add(b).ok_or(ClobError::ArithmeticOverflow)
}

fn checked_sub(a: u64, b: u64) -> ClobResult<u64> {
    a.checked_sub(b).ok_or(ClobError::ArithmeticOverflow)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TraderSeat {
    pub trader: [u8; 32],
    pub state: TraderState,
    /// Number of resting orders referencing this seat
    pub num_open_orders: u64,
    /// Next free seat when this seat is on the free list
    next_free_seat: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct DirectoryEntry {
    pub trader: [u8; 32],
    pub trader_index: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct RegistryHeader {
    pub num_registered: u64,
    seat_bump_index: u64,
    seat_free_list_len: u64,
    seat_free_list_head: u64,
}

impl RegistryHeader {
    pub const LEN: usize = std::mem::size_of::<Self>();
}

pub struct TraderRegistry<'a> {
    pub header: &'a mut RegistryHeader,
    pub seats: &'a mut [TraderSeat],
    pub directory: &'a mut [DirectoryEntry],
}

impl<'a> TraderRegistry<'a> {
    /// Bytes needed for the header, the seats and the directory of `num_seats` traders.
    pub fn compute_allocation_size(num_seats: usize) -> usize {
        RegistryHeader::LEN
            + num_seats * (std::mem::size_of::<TraderSeat>() + std::mem::size_of::<DirectoryEntry>())
    }

    pub fn from_buffer(buf: &'a mut [u8]) -> ClobResult<Self> {
        if buf.len() < RegistryHeader::LEN {
            return Err(ClobError::InvalidAccountData);
        }
        let capacity = (buf.len() - RegistryHeader::LEN)
            / (std::mem::size_of::<TraderSeat>() + std::mem::size_of::<DirectoryEntry>());
        let (header, rem) = buf.split_at_mut(RegistryHeader::LEN);
        let (seats, rem) = rem.split_at_mut(capacity * std::mem::size_of::<TraderSeat>());
        let (directory, _) = rem.split_at_mut(capacity * std::mem::size_of::<DirectoryEntry>());
        let registry = Self {
            header: bytemuck::try_from_bytes_mut(header)
                .map_err(|_| ClobError::InvalidAccountData)?,
            seats: bytemuck::try_cast_slice_mut(seats).map_err(|_| ClobError::InvalidAccountData)?,
            directory: bytemuck::try_cast_slice_mut(directory)
                .map_err(|_| ClobError::InvalidAccountData)?,
        };
        if registry.header.num_registered as usize > registry.capacity() {
            return Err(ClobError::InvalidAccountData);
        }
        Ok(registry)
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    pub fn len(&self) -> usize {
        self.header.num_registered as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.num_registered == 0
    }

    fn entries(&self) -> &[DirectoryEntry] {
        &self.directory[..self.len()]
    }

    fn search(&self, trader: &[u8; 32]) -> Result<usize, usize> {
        self.entries().binary_search_by(|e| e.trader.cmp(trader))
    }

    pub fn lookup(&self, trader: &[u8; 32]) -> Option<u64> {
        self.search(trader)
            .ok()
            .map(|position| self.directory[position].trader_index)
    }

    /// Registered traders, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries().iter()
    }

    pub fn seat(&self, trader_index: u64) -> ClobResult<&TraderSeat> {
        self.seats
            .get(trader_index as usize)
            .filter(|s| s.trader != [0; 32])
            .ok_or(ClobError::Validation(ValidationError::UnknownTrader))
    }

    pub fn seat_mut(&mut self, trader_index: u64) -> ClobResult<&mut TraderSeat> {
        self.seats
            .get_mut(trader_index as usize)
            .filter(|s| s.trader != [0; 32])
            .ok_or(ClobError::Validation(ValidationError::UnknownTrader))
    }

    pub fn state(&self, trader_index: u64) -> ClobResult<&TraderState> {
        Ok(&self.seat(trader_index)?.state)
    }

    pub fn state_mut(&mut self, trader_index: u64) -> ClobResult<&mut TraderState> {
        Ok(&mut self.seat_mut(trader_index)?.state)
    }

    pub fn lookup_state(&self, trader: &[u8; 32]) -> Option<&TraderState> {
        self.lookup(trader)
            .and_then(|trader_index| self.state(trader_index).ok())
    }

    fn allocate_seat(&mut self) -> ClobResult<u64> {
        if self.header.seat_free_list_len == 0 {
            if self.header.seat_bump_index as usize >= self.seats.len() {
                return Err(ClobError::RegistryFull);
            }
            let index = self.header.seat_bump_index;
            self.header.seat_bump_index += 1;
            return Ok(index);
        }
        let index = self.header.seat_free_list_head;
        self.header.seat_free_list_head = self.seats[index as usize].next_free_seat;
        self.header.seat_free_list_len -= 1;
        Ok(index)
    }

    fn free_seat(&mut self, trader_index: u64) {
        let seat = &mut self.seats[trader_index as usize];
        *seat = TraderSeat::default();
        seat.next_free_seat = self.header.seat_free_list_head;
        self.header.seat_free_list_head = trader_index;
        self.header.seat_free_list_len += 1;
    }

    /// Gives the trader a seat, returning its index. Registering twice returns the same seat.
    pub fn register(&mut self, trader: &[u8; 32]) -> ClobResult<u64> {
        if trader == &[0; 32] {
            return Err(ValidationError::InvalidTrader.into());
        }
        let position = match self.search(trader) {
            Ok(position) => return Ok(self.directory[position].trader_index),
            Err(position) => position,
        };
        let trader_index = self.allocate_seat()?;
        self.seats[trader_index as usize] = TraderSeat {
            trader: *trader,
            ..TraderSeat::default()
        };
        self.insert_directory_entry(position, *trader, trader_index);
        Ok(trader_index)
    }

    fn insert_directory_entry(&mut self, position: usize, trader: [u8; 32], trader_index: u64) {
        let len = self.len();
        self.directory.copy_within(position..len, position + 1);
        self.directory[position] = DirectoryEntry {
            trader,
            trader_index,
        };
        self.header.num_registered += 1;
    }

    /// Releases a seat. The seat must hold no funds and back no resting order.
    pub fn evict(&mut self, trader: &[u8; 32]) -> ClobResult<u64> {
        let position = self
            .search(trader)
            .map_err(|_| ClobError::Validation(ValidationError::UnknownTrader))?;
        let trader_index = self.directory[position].trader_index;
        let seat = &self.seats[trader_index as usize];
        if !seat.state.is_empty() || seat.num_open_orders != 0 {
            return Err(ClobError::SeatInUse);
        }
        let len = self.len();
        self.directory.copy_within(position + 1..len, position);
        self.directory[len - 1] = DirectoryEntry::default();
        self.header.num_registered -= 1;
        self.free_seat(trader_index);
        Ok(trader_index)
    }

    pub fn deposit_funds(
        &mut self,
        trader: &[u8; 32],
        quote_lots: u64,
        base_lots: u64,
    ) -> ClobResult<TraderState> {
        let state = self.trader_state_mut(trader)?;
        state.deposit(quote_lots, base_lots)?;
        Ok(*state)
    }

    /// Withdraws free funds. `None` withdraws the whole free balance of that asset.
    /// Returns the `(quote_lots, base_lots)` withdrawn.
    pub fn withdraw_funds(
        &mut self,
        trader: &[u8; 32],
        quote_lots: Option<u64>,
        base_lots: Option<u64>,
    ) -> ClobResult<(u64, u64)> {
        let state = self.trader_state_mut(trader)?;
        let quote_lots = quote_lots.unwrap_or(state.quote_lots_free);
        let base_lots = base_lots.unwrap_or(state.base_lots_free);
        state.withdraw(quote_lots, base_lots)?;
        Ok((quote_lots, base_lots))
    }

    fn trader_state_mut(&mut self, trader: &[u8; 32]) -> ClobResult<&mut TraderState> {
        let trader_index = self
            .lookup(trader)
            .ok_or(ClobError::Validation(ValidationError::UnknownTrader))?;
        self.state_mut(trader_index)
    }

    pub fn add_open_order(&mut self, trader_index: u64) -> ClobResult {
        let seat = self.seat_mut(trader_index)?;
        seat.num_open_orders = checked_add(seat.num_open_orders, 1)?;
        Ok(())
    }

    pub fn remove_open_order(&mut self, trader_index: u64) -> ClobResult {
        let seat = self.seat_mut(trader_index)?;
        seat.num_open_orders = checked_sub(seat.num_open_orders, 1)?;
        Ok(())
    }

    /// Writes a seat at a fixed index into an empty slot. Used to rebuild a registry from an
    /// owned model; call [`TraderRegistry::rebuild_free_list`] once every seat is restored.
    pub fn restore_seat(
        &mut self,
        trader_index: u64,
        trader: &[u8; 32],
        state: TraderState,
        num_open_orders: u64,
    ) -> ClobResult {
        if trader == &[0; 32] {
            return Err(ValidationError::InvalidTrader.into());
        }
        let slot = self
            .seats
            .get(trader_index as usize)
            .ok_or(ClobError::RegistryFull)?;
        if slot.trader != [0; 32] {
            return Err(ClobError::SeatInUse);
        }
        let position = match self.search(trader) {
            Ok(_) => return Err(ClobError::SeatInUse),
            Err(position) => position,
        };
        self.seats[trader_index as usize] = TraderSeat {
            trader: *trader,
            state,
            num_open_orders,
            next_free_seat: 0,
        };
        self.insert_directory_entry(position, *trader, trader_index);
        self.header.seat_bump_index = self.header.seat_bump_index.max(trader_index + 1);
        Ok(())
    }

    /// Threads every empty seat below the bump index onto the free list.
    pub fn rebuild_free_list(&mut self) {
        self.header.seat_free_list_len = 0;
        self.header.seat_free_list_head = 0;
        for trader_index in (0..self.header.seat_bump_index).rev() {
            if self.seats[trader_index as usize].trader == [0; 32] {
                self.free_seat(trader_index);
            }
        }
    }
}
