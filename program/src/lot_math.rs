//! Fixed-point conversions between token atoms, lots and human units.
//!
//! Atoms to lots is lossy (floor), lots to atoms is exact or fails. Float prices only appear at
//! the boundary: `ticks_to_float_price(float_price_to_ticks(p))` can be off from `p` by up to
//! one tick of quantization, which is expected.
use crate::{
    error::{ClobError, ClobResult},
    state::Side,
};

/// Lot and tick parameters of a market, expressed in token atoms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotConverter {
    pub base_decimals: u32,
    pub quote_decimals: u32,
    /// Base atoms per base lot
    pub base_lot_size: u64,
    /// Quote atoms per quote lot
    pub quote_lot_size: u64,
    pub tick_size_in_quote_atoms_per_base_unit: u64,
    /// Whole base tokens making up one base unit of the market
    pub raw_base_units_per_base_unit: u64,
}

fn nonzero(denominator: u64) -> ClobResult<u64> {
    if denominator == 0 {
        return Err(ClobError::InvalidLotSize);
    }
    Ok(denominator)
}

fn pow10(decimals: u32) -> ClobResult<u64> {
    10u64
        .checked_pow(decimals)
        .ok_or(ClobError::ArithmeticOverflow)
}

fn to_u64(value: u128) -> ClobResult<u64> {
    u64::try_from(value).map_err(|_| ClobError::ArithmeticOverflow)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl LotConverter {
    pub fn new(
        base_decimals: u32,
        quote_decimals: u32,
        base_lot_size: u64,
        quote_lot_size: u64,
        tick_size_in_quote_atoms_per_base_unit: u64,
        raw_base_units_per_base_unit: u64,
    ) -> ClobResult<Self> {
        let converter = Self {
            base_decimals,
            quote_decimals,
            base_lot_size,
            quote_lot_size,
            tick_size_in_quote_atoms_per_base_unit,
            raw_base_units_per_base_unit,
        };
        nonzero(base_lot_size)?;
        nonzero(quote_lot_size)?;
        nonzero(tick_size_in_quote_atoms_per_base_unit)?;
        nonzero(raw_base_units_per_base_unit)?;
        Ok(converter)
    }

    pub fn base_atoms_to_base_lots(&self, base_atoms: u64) -> ClobResult<u64> {
        Ok(base_atoms / nonzero(self.base_lot_size)?)
    }

    pub fn base_lots_to_base_atoms(&self, base_lots: u64) -> ClobResult<u64> {
        base_lots
            .checked_mul(nonzero(self.base_lot_size)?)
            .ok_or(ClobError::ArithmeticOverflow)
    }

    pub fn quote_atoms_to_quote_lots(&self, quote_atoms: u64) -> ClobResult<u64> {
        Ok(quote_atoms / nonzero(self.quote_lot_size)?)
    }

    pub fn quote_lots_to_quote_atoms(&self, quote_lots: u64) -> ClobResult<u64> {
        quote_lots
            .checked_mul(nonzero(self.quote_lot_size)?)
            .ok_or(ClobError::ArithmeticOverflow)
    }

    /// Whole base tokens (e.g. `1.5` SOL) to base lots, rounding down.
    pub fn raw_base_units_to_base_lots(&self, raw_base_units: f64) -> ClobResult<u64> {
        let lot_size = nonzero(self.base_lot_size)? as f64;
        Ok((raw_base_units * pow10(self.base_decimals)? as f64 / lot_size) as u64)
    }

    /// Whole quote tokens to quote lots, rounding down.
    pub fn quote_units_to_quote_lots(&self, quote_units: f64) -> ClobResult<u64> {
        let lot_size = nonzero(self.quote_lot_size)? as f64;
        Ok((quote_units * pow10(self.quote_decimals)? as f64 / lot_size) as u64)
    }

    pub fn base_lots_per_base_unit(&self) -> ClobResult<u64> {
        let atoms_per_unit = (self.raw_base_units_per_base_unit as u128)
            * (pow10(self.base_decimals)? as u128);
        let lots = to_u64(atoms_per_unit / nonzero(self.base_lot_size)? as u128)?;
        nonzero(lots)
    }

    pub fn tick_size_in_quote_lots_per_base_unit(&self) -> ClobResult<u64> {
        let lots = self.tick_size_in_quote_atoms_per_base_unit / nonzero(self.quote_lot_size)?;
        nonzero(lots)
    }

    /// Price in quote tokens per whole base token, rounded down to a tick.
    pub fn float_price_to_ticks(&self, price: f64) -> ClobResult<u64> {
        Ok(self.float_price_in_ticks(price)?.floor() as u64)
    }

    /// Price in quote tokens per whole base token, rounded up to a tick.
    pub fn float_price_to_ticks_rounded_up(&self, price: f64) -> ClobResult<u64> {
        Ok(self.float_price_in_ticks(price)?.ceil() as u64)
    }

    fn float_price_in_ticks(&self, price: f64) -> ClobResult<f64> {
        let tick = nonzero(self.tick_size_in_quote_atoms_per_base_unit)? as f64;
        Ok(price * pow10(self.quote_decimals)? as f64 / tick)
    }

    pub fn ticks_to_float_price(&self, price_in_ticks: u64) -> ClobResult<f64> {
        let tick = nonzero(self.tick_size_in_quote_atoms_per_base_unit)? as f64;
        Ok(price_in_ticks as f64 * tick / pow10(self.quote_decimals)? as f64)
    }

    /// Quote atoms exchanged for `base_lots` at `price_in_ticks`.
    pub fn order_to_quote_atoms(&self, base_lots: u64, price_in_ticks: u64) -> ClobResult<u64> {
        let tick_in_quote_lots = self.tick_size_in_quote_lots_per_base_unit()? as u128;
        let base_lots_per_base_unit = self.base_lots_per_base_unit()? as u128;
        let numerator = (base_lots as u128)
            .checked_mul(price_in_ticks as u128)
            .and_then(|n| n.checked_mul(tick_in_quote_lots))
            .and_then(|n| n.checked_mul(self.quote_lot_size as u128))
            .ok_or(ClobError::ArithmeticOverflow)?;
        to_u64(numerator / base_lots_per_base_unit)
    }

    /// Number of decimals needed to print any price of the market exactly.
    ///
    /// The tick expressed in quote units is `tick / 10^quote_decimals`. Its reduced denominator
    /// only has factors 2 and 5, and the larger exponent is the number of decimals it needs.
    /// The result is floored at 3, then widened by the digits of the raw base unit multiplier.
    pub fn price_decimal_places(&self) -> ClobResult<u32> {
        let tick = nonzero(self.tick_size_in_quote_atoms_per_base_unit)?;
        let raw_units = nonzero(self.raw_base_units_per_base_unit)?;
        let quote_multiplier = pow10(self.quote_decimals)?;
        let mut denominator = quote_multiplier / gcd(quote_multiplier, tick);
        let (mut exp2, mut exp5) = (0u32, 0u32);
        while denominator % 2 == 0 {
            denominator /= 2;
            exp2 += 1;
        }
        while denominator % 5 == 0 {
            denominator /= 5;
            exp5 += 1;
        }
        Ok(exp2.max(exp5).max(3) + raw_units.ilog10())
    }
}

/// Snaps an integer limit price to a multiple of `tick_size`: bids round down, asks round up.
pub fn round_price(tick_size: u64, limit_price: u64, side: Side) -> ClobResult<u64> {
    let tick_size = nonzero(tick_size)?;
    let ticks = match side {
        Side::Bid => limit_price / tick_size,
        Side::Ask => limit_price
            .checked_add(tick_size - 1)
            .ok_or(ClobError::ArithmeticOverflow)?
            / tick_size,
    };
    ticks
        .checked_mul(tick_size)
        .ok_or(ClobError::ArithmeticOverflow)
}
