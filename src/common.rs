//! Fixed-point money helpers shared by request validation and responses.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use validator::ValidationError;

/// Fractional digits stored for every amount.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound: ten significant digits with two after the point.
pub const MONEY_LIMIT: Decimal = dec!(100000000);

/// Rounds to two places and pins the scale so `120.5` renders as `120.50`.
///
/// Stores without a native decimal type hand amounts back with a shortened
/// scale; every amount leaving the service passes through here.
pub fn normalize_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Non-negative, at most two fractional digits, below [`MONEY_LIMIT`].
pub fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    let message = if value.is_sign_negative() && !value.is_zero() {
        "Amount must not be negative"
    } else if value.normalize().scale() > MONEY_SCALE {
        "Ensure that there are no more than 2 decimal places."
    } else if *value >= MONEY_LIMIT {
        "Ensure that there are no more than 10 digits in total."
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new("money");
    err.message = Some(message.into());
    Err(err)
}
