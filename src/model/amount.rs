use std::fmt;

use alloy::primitives::{I256, U256};
use serde::{Serialize, Serializer};

use crate::error::{EngineError, Result};

/// A scaled integer with an explicit decimal exponent.
///
/// `raw / 10^decimals` is the economic value. All arithmetic is exact 256-bit
/// integer arithmetic with checked overflow; nothing routes through floats.
/// Values are immutable: every operation returns a new amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedPointAmount {
    raw: I256,
    decimals: u8,
}

impl FixedPointAmount {
    pub fn new(raw: I256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::new(I256::ZERO, decimals)
    }

    /// Build from a small signed integer. Mostly useful for constants and tests.
    pub fn from_i128(raw: i128, decimals: u8) -> Self {
        let magnitude = I256::from_raw(U256::from(raw.unsigned_abs()));
        let raw = if raw < 0 { -magnitude } else { magnitude };
        Self::new(raw, decimals)
    }

    /// Build from an unsigned ledger word (`uint256`).
    pub fn from_ledger(raw: U256, decimals: u8) -> Result<Self> {
        let raw = I256::try_from(raw).map_err(|_| EngineError::Overflow("ledger value exceeds int256"))?;
        Ok(Self::new(raw, decimals))
    }

    /// Parse a human-readable decimal string ("503", "1.5", "-0.25") at `decimals`.
    ///
    /// Fractional digits beyond `decimals` are rejected unless they are all zero.
    pub fn parse(input: &str, decimals: u8) -> Result<Self> {
        let parse_err = |reason: &str| EngineError::Parse {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(parse_err("no digits"));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(parse_err("expected only ASCII digits and one decimal point"));
        }

        let scale = decimals as usize;
        let frac_kept = if frac_part.len() > scale {
            let (kept, excess) = frac_part.split_at(scale);
            if excess.bytes().any(|b| b != b'0') {
                return Err(EngineError::PrecisionLoss {
                    raw: input.to_string(),
                    from: frac_part.len().min(u8::MAX as usize) as u8,
                    to: decimals,
                });
            }
            kept.to_string()
        } else {
            format!("{frac_part:0<scale$}")
        };

        let digits = format!("{int_part}{frac_kept}");
        let digits = if digits.is_empty() { "0".to_string() } else { digits };
        let magnitude = U256::from_str_radix(&digits, 10)
            .map_err(|e| parse_err(&e.to_string()))?;
        let magnitude = I256::try_from(magnitude)
            .map_err(|_| EngineError::Overflow("parsed amount exceeds int256"))?;

        Ok(Self::new(if negative { -magnitude } else { magnitude }, decimals))
    }

    pub fn raw(&self) -> I256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.raw.is_negative()
    }

    /// Assert non-negativity where the semantics demand it (raw balances, amounts to send).
    pub fn ensure_non_negative(self, context: &str) -> Result<Self> {
        if self.is_negative() {
            return Err(EngineError::NegativeAmount {
                context: context.to_string(),
                raw: self.raw.to_string(),
            });
        }
        Ok(self)
    }

    /// The raw value as a ledger word. Fails on negative amounts.
    pub fn to_ledger(&self, context: &str) -> Result<U256> {
        Ok(self.ensure_non_negative(context)?.raw.into_raw())
    }

    /// Rescale to `target` decimals. Scaling down must be exact.
    pub fn scale_to(&self, target: u8) -> Result<Self> {
        self.rescale(target, false)
    }

    /// Rescale to `target` decimals, truncating toward zero when scaling down.
    pub fn scale_to_truncating(&self, target: u8) -> Result<Self> {
        self.rescale(target, true)
    }

    fn rescale(&self, target: u8, allow_truncation: bool) -> Result<Self> {
        if target == self.decimals {
            return Ok(*self);
        }
        if target > self.decimals {
            let factor = pow10(target - self.decimals)?;
            let raw = self
                .raw
                .checked_mul(factor)
                .ok_or(EngineError::Overflow("scale up"))?;
            return Ok(Self::new(raw, target));
        }

        let factor = pow10(self.decimals - target)?;
        let remainder = self
            .raw
            .checked_rem(factor)
            .ok_or(EngineError::Overflow("scale down"))?;
        if !remainder.is_zero() && !allow_truncation {
            return Err(EngineError::PrecisionLoss {
                raw: self.raw.to_string(),
                from: self.decimals,
                to: target,
            });
        }
        let raw = self
            .raw
            .checked_div(factor)
            .ok_or(EngineError::Overflow("scale down"))?;
        Ok(Self::new(raw, target))
    }

    /// Multiply by a scaled rate, then divide by `10^rate_decimals`.
    ///
    /// The product carries `self.decimals + rate.decimals`; dividing by the
    /// rate's own scale leaves `self.decimals + rate.decimals - rate_decimals`.
    /// The division truncates toward zero.
    pub fn multiply_by_rate(&self, rate: &FixedPointAmount, rate_decimals: u8) -> Result<Self> {
        let combined = self.decimals as u16 + rate.decimals as u16;
        if (rate_decimals as u16) > combined {
            return Err(EngineError::ScaleMismatch {
                left: combined.min(u8::MAX as u16) as u8,
                right: rate_decimals,
            });
        }
        let result_decimals = u8::try_from(combined - rate_decimals as u16)
            .map_err(|_| EngineError::Overflow("rate product decimals"))?;

        let product = self
            .raw
            .checked_mul(rate.raw)
            .ok_or(EngineError::Overflow("rate product"))?;
        let raw = product
            .checked_div(pow10(rate_decimals)?)
            .ok_or(EngineError::Overflow("rate division"))?;
        Ok(Self::new(raw, result_decimals))
    }

    /// `self - other`. Decimals must already match; the result may be negative.
    pub fn subtract(&self, other: &FixedPointAmount) -> Result<Self> {
        if self.decimals != other.decimals {
            return Err(EngineError::ScaleMismatch {
                left: self.decimals,
                right: other.decimals,
            });
        }
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or(EngineError::Overflow("subtract"))?;
        Ok(Self::new(raw, self.decimals))
    }

    /// Exact decimal rendering of `raw / 10^decimals`.
    ///
    /// Trailing fractional zeros are trimmed but at least one fractional
    /// digit is always shown ("2.2", "0.0", "-0.5").
    pub fn to_decimal_string(&self) -> String {
        let digits = self.raw.unsigned_abs().to_string();
        let scale = self.decimals as usize;
        let padded = if digits.len() <= scale {
            format!("{digits:0>width$}", width = scale + 1)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        let frac_part = frac_part.trim_end_matches('0');
        let frac_part = if frac_part.is_empty() { "0" } else { frac_part };
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{sign}{int_part}.{frac_part}")
    }
}

fn pow10(exp: u8) -> Result<I256> {
    let value = U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or(EngineError::Overflow("power of ten"))?;
    I256::try_from(value).map_err(|_| EngineError::Overflow("power of ten"))
}

impl fmt::Display for FixedPointAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl Serialize for FixedPointAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr {
            raw: String,
            decimals: u8,
            value: String,
        }
        Repr {
            raw: self.raw.to_string(),
            decimals: self.decimals,
            value: self.to_decimal_string(),
        }
        .serialize(serializer)
    }
}
