//! The integer amount contract.
//!
//! Ledger amounts are signed 64-bit integers. Callers may hand over any
//! integer type, or a JSON value from a request body; what matters is the
//! type of the input, not its value. A float is rejected even when it holds a
//! whole number, since `3.0` arriving where an integer was expected usually
//! means the caller is doing arithmetic in the wrong domain.

use serde_json::Value;

use crate::{LedgerError, LedgerResult};

/// Conversion into a ledger amount.
pub trait IntoAmount {
    /// Convert into a signed 64-bit amount, or fail with
    /// [`LedgerError::InvalidAmount`].
    fn into_amount(self) -> LedgerResult<i64>;
}

macro_rules! impl_lossless {
    ($($t:ty),*) => {
        $(
            impl IntoAmount for $t {
                fn into_amount(self) -> LedgerResult<i64> {
                    Ok(i64::from(self))
                }
            }
        )*
    };
}

macro_rules! impl_checked {
    ($($t:ty),*) => {
        $(
            impl IntoAmount for $t {
                fn into_amount(self) -> LedgerResult<i64> {
                    i64::try_from(self).map_err(|_| {
                        LedgerError::InvalidAmount(format!(
                            "{} does not fit in a 64-bit amount",
                            self
                        ))
                    })
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($t:ty),*) => {
        $(
            impl IntoAmount for $t {
                fn into_amount(self) -> LedgerResult<i64> {
                    Err(LedgerError::InvalidAmount(format!(
                        "amount must be an integer, got floating-point {}",
                        self
                    )))
                }
            }
        )*
    };
}

impl_lossless!(i8, i16, i32, i64, u8, u16, u32);
impl_checked!(i128, isize, u64, u128, usize);
impl_float!(f32, f64);

impl IntoAmount for &Value {
    fn into_amount(self) -> LedgerResult<i64> {
        match self {
            Value::Number(n) => n.as_i64().ok_or_else(|| {
                if n.is_f64() {
                    LedgerError::InvalidAmount(format!(
                        "amount must be an integer, got floating-point {}",
                        n
                    ))
                } else {
                    LedgerError::InvalidAmount(format!("{} does not fit in a 64-bit amount", n))
                }
            }),
            other => Err(LedgerError::InvalidAmount(format!(
                "amount must be an integer, got {}",
                json_kind(other)
            ))),
        }
    }
}

impl IntoAmount for Value {
    fn into_amount(self) -> LedgerResult<i64> {
        (&self).into_amount()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
