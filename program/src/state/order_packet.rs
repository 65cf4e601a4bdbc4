//! Order requests, as submitted by traders. Packets are never stored.
use bonfida_utils::BorshSize;
use borsh::{BorshDeserialize, BorshSerialize};

use super::{ClockReading, SelfTradeBehavior, Side};
use crate::error::{ClobResult, ValidationError};

#[derive(BorshDeserialize, BorshSerialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderPacket {
    /// Never matches. A crossing order is rejected or repriced one tick behind the best
    /// opposing order, depending on `reject_post_only`.
    PostOnly {
        side: Side,
        price_in_ticks: u64,
        num_base_lots: u64,
        client_order_id: u128,
        reject_post_only: bool,
        /// Fund the order from the trader's free balance only
        use_only_deposited_funds: bool,
        last_valid_slot: Option<u64>,
        last_valid_unix_timestamp_in_seconds: Option<u64>,
    },

    /// Matches as much as possible, then posts the remainder.
    Limit {
        side: Side,
        price_in_ticks: u64,
        num_base_lots: u64,
        self_trade_behavior: SelfTradeBehavior,
        /// Maximum number of resting orders to touch. `None` means no limit
        match_limit: Option<u64>,
        client_order_id: u128,
        use_only_deposited_funds: bool,
        last_valid_slot: Option<u64>,
        last_valid_unix_timestamp_in_seconds: Option<u64>,
    },

    /// Matches as much as possible and discards the remainder. Exactly one of
    /// `num_base_lots` and `num_quote_lots` is nonzero. A `None` price matches at any price.
    ImmediateOrCancel {
        side: Side,
        price_in_ticks: Option<u64>,
        num_base_lots: u64,
        num_quote_lots: u64,
        /// The whole order fails if fewer base lots are filled
        min_base_lots_to_fill: u64,
        /// The whole order fails if fewer quote lots are filled
        min_quote_lots_to_fill: u64,
        self_trade_behavior: SelfTradeBehavior,
        match_limit: Option<u64>,
        client_order_id: u128,
        use_only_deposited_funds: bool,
        last_valid_slot: Option<u64>,
        last_valid_unix_timestamp_in_seconds: Option<u64>,
    },
}

// `#[derive(BorshSize)]` only supports field-less enums: one tag byte plus the variant's fields.
impl BorshSize for OrderPacket {
    fn borsh_len(&self) -> usize {
        1 + match self {
            Self::PostOnly {
                side,
                price_in_ticks,
                num_base_lots,
                client_order_id,
                reject_post_only,
                use_only_deposited_funds,
                last_valid_slot,
                last_valid_unix_timestamp_in_seconds,
            } => {
                side.borsh_len()
                    + price_in_ticks.borsh_len()
                    + num_base_lots.borsh_len()
                    + client_order_id.borsh_len()
                    + reject_post_only.borsh_len()
                    + use_only_deposited_funds.borsh_len()
                    + last_valid_slot.borsh_len()
                    + last_valid_unix_timestamp_in_seconds.borsh_len()
            }
            Self::Limit {
                side,
                price_in_ticks,
                num_base_lots,
                self_trade_behavior,
                match_limit,
                client_order_id,
                use_only_deposited_funds,
                last_valid_slot,
                last_valid_unix_timestamp_in_seconds,
            } => {
                side.borsh_len()
                    + price_in_ticks.borsh_len()
                    + num_base_lots.borsh_len()
                    + self_trade_behavior.borsh_len()
                    + match_limit.borsh_len()
                    + client_order_id.borsh_len()
                    + use_only_deposited_funds.borsh_len()
                    + last_valid_slot.borsh_len()
                    + last_valid_unix_timestamp_in_seconds.borsh_len()
            }
            Self::ImmediateOrCancel {
                side,
                price_in_ticks,
                num_base_lots,
                num_quote_lots,
                min_base_lots_to_fill,
                min_quote_lots_to_fill,
                self_trade_behavior,
                match_limit,
                client_order_id,
                use_only_deposited_funds,
                last_valid_slot,
                last_valid_unix_timestamp_in_seconds,
            } => {
                side.borsh_len()
                    + price_in_ticks.borsh_len()
                    + num_base_lots.borsh_len()
                    + num_quote_lots.borsh_len()
                    + min_base_lots_to_fill.borsh_len()
                    + min_quote_lots_to_fill.borsh_len()
                    + self_trade_behavior.borsh_len()
                    + match_limit.borsh_len()
                    + client_order_id.borsh_len()
                    + use_only_deposited_funds.borsh_len()
                    + last_valid_slot.borsh_len()
                    + last_valid_unix_timestamp_in_seconds.borsh_len()
            }
        }
    }
}

impl OrderPacket {
    pub fn new_post_only_default(side: Side, price_in_ticks: u64, num_base_lots: u64) -> Self {
        Self::PostOnly {
            side,
            price_in_ticks,
            num_base_lots,
            client_order_id: 0,
            reject_post_only: true,
            use_only_deposited_funds: false,
            last_valid_slot: None,
            last_valid_unix_timestamp_in_seconds: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_post_only(
        side: Side,
        price_in_ticks: u64,
        num_base_lots: u64,
        client_order_id: u128,
        reject_post_only: bool,
        use_only_deposited_funds: bool,
        last_valid_slot: Option<u64>,
        last_valid_unix_timestamp_in_seconds: Option<u64>,
    ) -> Self {
        Self::PostOnly {
            side,
            price_in_ticks,
            num_base_lots,
            client_order_id,
            reject_post_only,
            use_only_deposited_funds,
            last_valid_slot,
            last_valid_unix_timestamp_in_seconds,
        }
    }

    pub fn new_limit_order_default(side: Side, price_in_ticks: u64, num_base_lots: u64) -> Self {
        Self::new_limit_order(
            side,
            price_in_ticks,
            num_base_lots,
            SelfTradeBehavior::CancelProvide,
            None,
            0,
            false,
            None,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_limit_order(
        side: Side,
        price_in_ticks: u64,
        num_base_lots: u64,
        self_trade_behavior: SelfTradeBehavior,
        match_limit: Option<u64>,
        client_order_id: u128,
        use_only_deposited_funds: bool,
        last_valid_slot: Option<u64>,
        last_valid_unix_timestamp_in_seconds: Option<u64>,
    ) -> Self {
        Self::Limit {
            side,
            price_in_ticks,
            num_base_lots,
            self_trade_behavior,
            match_limit,
            client_order_id,
            use_only_deposited_funds,
            last_valid_slot,
            last_valid_unix_timestamp_in_seconds,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_ioc(
        side: Side,
        price_in_ticks: Option<u64>,
        num_base_lots: u64,
        num_quote_lots: u64,
        min_base_lots_to_fill: u64,
        min_quote_lots_to_fill: u64,
        self_trade_behavior: SelfTradeBehavior,
        match_limit: Option<u64>,
        client_order_id: u128,
        use_only_deposited_funds: bool,
    ) -> Self {
        Self::ImmediateOrCancel {
            side,
            price_in_ticks,
            num_base_lots,
            num_quote_lots,
            min_base_lots_to_fill,
            min_quote_lots_to_fill,
            self_trade_behavior,
            match_limit,
            client_order_id,
            use_only_deposited_funds,
            last_valid_slot: None,
            last_valid_unix_timestamp_in_seconds: None,
        }
    }

    /// Immediate-or-cancel order sized in base lots, with no minimum fill.
    pub fn new_ioc_by_lots(
        side: Side,
        price_in_ticks: u64,
        num_base_lots: u64,
        self_trade_behavior: SelfTradeBehavior,
        match_limit: Option<u64>,
        client_order_id: u128,
        use_only_deposited_funds: bool,
    ) -> Self {
        Self::new_ioc(
            side,
            Some(price_in_ticks),
            num_base_lots,
            0,
            0,
            0,
            self_trade_behavior,
            match_limit,
            client_order_id,
            use_only_deposited_funds,
        )
    }

    /// Market buy spending up to `num_quote_lots`, failing unless `min_base_lots_to_fill`
    /// base lots are bought.
    pub fn new_ioc_buy_with_slippage(num_quote_lots: u64, min_base_lots_to_fill: u64) -> Self {
        Self::new_ioc(
            Side::Bid,
            None,
            0,
            num_quote_lots,
            min_base_lots_to_fill,
            0,
            SelfTradeBehavior::CancelProvide,
            None,
            0,
            false,
        )
    }

    /// Market sell of up to `num_base_lots`, failing unless `min_quote_lots_to_fill`
    /// quote lots are received.
    pub fn new_ioc_sell_with_slippage(num_base_lots: u64, min_quote_lots_to_fill: u64) -> Self {
        Self::new_ioc(
            Side::Ask,
            None,
            num_base_lots,
            0,
            0,
            min_quote_lots_to_fill,
            SelfTradeBehavior::CancelProvide,
            None,
            0,
            false,
        )
    }

    /// Fill-or-kill buy: the whole size fills at or below `price_in_ticks`, or nothing does.
    pub fn new_fok_buy_with_limit_price(
        price_in_ticks: u64,
        num_base_lots: u64,
        self_trade_behavior: SelfTradeBehavior,
        client_order_id: u128,
        use_only_deposited_funds: bool,
    ) -> Self {
        Self::new_ioc(
            Side::Bid,
            Some(price_in_ticks),
            num_base_lots,
            0,
            num_base_lots,
            0,
            self_trade_behavior,
            None,
            client_order_id,
            use_only_deposited_funds,
        )
    }

    /// Fill-or-kill sell: the whole size fills at or above `price_in_ticks`, or nothing does.
    pub fn new_fok_sell_with_limit_price(
        price_in_ticks: u64,
        num_base_lots: u64,
        self_trade_behavior: SelfTradeBehavior,
        client_order_id: u128,
        use_only_deposited_funds: bool,
    ) -> Self {
        Self::new_ioc(
            Side::Ask,
            Some(price_in_ticks),
            num_base_lots,
            0,
            num_base_lots,
            0,
            self_trade_behavior,
            None,
            client_order_id,
            use_only_deposited_funds,
        )
    }

    pub fn side(&self) -> Side {
        match self {
            Self::PostOnly { side, .. }
            | Self::Limit { side, .. }
            | Self::ImmediateOrCancel { side, .. } => *side,
        }
    }

    /// Limit price, `None` for a market order.
    pub fn price_in_ticks(&self) -> Option<u64> {
        match self {
            Self::PostOnly { price_in_ticks, .. } | Self::Limit { price_in_ticks, .. } => {
                Some(*price_in_ticks)
            }
            Self::ImmediateOrCancel { price_in_ticks, .. } => *price_in_ticks,
        }
    }

    pub fn num_base_lots(&self) -> u64 {
        match self {
            Self::PostOnly { num_base_lots, .. }
            | Self::Limit { num_base_lots, .. }
            | Self::ImmediateOrCancel { num_base_lots, .. } => *num_base_lots,
        }
    }

    pub fn num_quote_lots(&self) -> u64 {
        match self {
            Self::ImmediateOrCancel { num_quote_lots, .. } => *num_quote_lots,
            _ => 0,
        }
    }

    /// Base lots the order may trade. Unbounded for quote-sized orders.
    pub fn base_lot_budget(&self) -> u64 {
        match self.num_base_lots() {
            0 => u64::MAX,
            n => n,
        }
    }

    /// Quote lots the order may trade. Unbounded unless the order is quote-sized.
    pub fn quote_lot_budget(&self) -> u64 {
        match self.num_quote_lots() {
            0 => u64::MAX,
            n => n,
        }
    }

    pub fn client_order_id(&self) -> u128 {
        match self {
            Self::PostOnly {
                client_order_id, ..
            }
            | Self::Limit {
                client_order_id, ..
            }
            | Self::ImmediateOrCancel {
                client_order_id, ..
            } => *client_order_id,
        }
    }

    pub fn self_trade_behavior(&self) -> SelfTradeBehavior {
        match self {
            Self::PostOnly { .. } => SelfTradeBehavior::CancelProvide,
            Self::Limit {
                self_trade_behavior,
                ..
            }
            | Self::ImmediateOrCancel {
                self_trade_behavior,
                ..
            } => *self_trade_behavior,
        }
    }

    pub fn match_limit(&self) -> u64 {
        match self {
            Self::PostOnly { .. } => 0,
            Self::Limit { match_limit, .. } | Self::ImmediateOrCancel { match_limit, .. } => {
                match_limit.unwrap_or(u64::MAX)
            }
        }
    }

    pub fn use_only_deposited_funds(&self) -> bool {
        match self {
            Self::PostOnly {
                use_only_deposited_funds,
                ..
            }
            | Self::Limit {
                use_only_deposited_funds,
                ..
            }
            | Self::ImmediateOrCancel {
                use_only_deposited_funds,
                ..
            } => *use_only_deposited_funds,
        }
    }

    pub fn last_valid_slot(&self) -> Option<u64> {
        match self {
            Self::PostOnly {
                last_valid_slot, ..
            }
            | Self::Limit {
                last_valid_slot, ..
            }
            | Self::ImmediateOrCancel {
                last_valid_slot, ..
            } => *last_valid_slot,
        }
    }

    pub fn last_valid_unix_timestamp_in_seconds(&self) -> Option<u64> {
        match self {
            Self::PostOnly {
                last_valid_unix_timestamp_in_seconds,
                ..
            }
            | Self::Limit {
                last_valid_unix_timestamp_in_seconds,
                ..
            }
            | Self::ImmediateOrCancel {
                last_valid_unix_timestamp_in_seconds,
                ..
            } => *last_valid_unix_timestamp_in_seconds,
        }
    }

    pub fn is_take_only(&self) -> bool {
        matches!(self, Self::ImmediateOrCancel { .. })
    }

    pub fn is_expired(&self, clock: &ClockReading) -> bool {
        matches!(self.last_valid_slot(), Some(slot) if slot != 0 && clock.slot > slot)
            || matches!(
                self.last_valid_unix_timestamp_in_seconds(),
                Some(ts) if ts != 0 && clock.unix_timestamp > ts
            )
    }

    /// Checks the packet on its own, before any book access.
    pub fn validate(&self) -> ClobResult {
        match self {
            Self::PostOnly {
                price_in_ticks,
                num_base_lots,
                ..
            }
            | Self::Limit {
                price_in_ticks,
                num_base_lots,
                ..
            } => {
                if *num_base_lots == 0 {
                    return Err(ValidationError::ZeroSize.into());
                }
                if *price_in_ticks == 0 {
                    return Err(ValidationError::InvalidPrice.into());
                }
            }
            Self::ImmediateOrCancel {
                price_in_ticks,
                num_base_lots,
                num_quote_lots,
                ..
            } => {
                if (*num_base_lots == 0) == (*num_quote_lots == 0) {
                    return Err(ValidationError::InvalidIocSize.into());
                }
                if *price_in_ticks == Some(0) {
                    return Err(ValidationError::InvalidPrice.into());
                }
            }
        }
        Ok(())
    }
}

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CondensedOrder {
    pub price_in_ticks: u64,
    pub size_in_base_lots: u64,
    pub last_valid_slot: Option<u64>,
    pub last_valid_unix_timestamp_in_seconds: Option<u64>,
}

impl CondensedOrder {
    pub fn new_default(price_in_ticks: u64, size_in_base_lots: u64) -> Self {
        Self {
            price_in_ticks,
            size_in_base_lots,
            last_valid_slot: None,
            last_valid_unix_timestamp_in_seconds: None,
        }
    }
}

/// What a batch does when one of its orders fails.
#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailedMultipleLimitOrderBehavior {
    /// Roll back the whole batch and fail
    AbortTransaction,
    /// Skip the order and report its error in the results
    SkipOrder,
    /// Skip the order and leave it out of the results
    SkipOrderAndContinue,
}

#[derive(BorshDeserialize, BorshSerialize, BorshSize, Clone, Debug, PartialEq, Eq)]
pub struct MultipleOrderPacket {
    pub bids: Vec<CondensedOrder>,
    pub asks: Vec<CondensedOrder>,
    pub client_order_id: Option<u128>,
    pub use_only_deposited_funds: bool,
    pub failed_multiple_limit_order_behavior: FailedMultipleLimitOrderBehavior,
}

impl MultipleOrderPacket {
    pub fn new(
        bids: Vec<CondensedOrder>,
        asks: Vec<CondensedOrder>,
        failed_multiple_limit_order_behavior: FailedMultipleLimitOrderBehavior,
    ) -> Self {
        Self {
            bids,
            asks,
            client_order_id: None,
            use_only_deposited_funds: false,
            failed_multiple_limit_order_behavior,
        }
    }
}
