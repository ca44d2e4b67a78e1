use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places used for stored and displayed amounts
pub const MONEY_SCALE: u32 = 2;

/// Tolerance when comparing two settled amounts (one paisa)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest amount accepted on a single payment (10^15)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Rounds an amount to 2 decimal places using half-up rounding
///
/// Only applied at the point of storage; intermediate sums are kept exact.
/// The result always carries a scale of 2 so it serializes as "236.00".
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Rounds an amount to the nearest whole currency unit (half-up)
pub fn round_to_unit(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// True when two amounts agree within [`MONEY_TOLERANCE`]
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .is_some_and(|delta| delta.abs() <= MONEY_TOLERANCE)
}

/// Formats an amount with exactly two decimal places
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}
