pub mod error;
pub mod locks;
pub mod money;

pub use error::{AppError, Result};
pub use locks::KeyedLocks;
pub use money::{format_amount, round_money, round_to_unit, within_tolerance, MAX_AMOUNT, MONEY_TOLERANCE};
