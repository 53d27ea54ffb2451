use serde::Serialize;

use super::amount::FixedPointAmount;
use crate::error::Result;

/// Supplied, borrowed and net value of a leveraged position, in the
/// underlying asset's decimals.
///
/// `net == supplied - borrowed` holds by construction; `net` may be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    supplied: FixedPointAmount,
    borrowed: FixedPointAmount,
    net: FixedPointAmount,
}

impl PositionSnapshot {
    /// Fails with `ScaleMismatch` unless both sides share decimals.
    pub fn new(supplied: FixedPointAmount, borrowed: FixedPointAmount) -> Result<Self> {
        let net = supplied.subtract(&borrowed)?;
        Ok(Self {
            supplied,
            borrowed,
            net,
        })
    }

    pub fn supplied(&self) -> &FixedPointAmount {
        &self.supplied
    }

    pub fn borrowed(&self) -> &FixedPointAmount {
        &self.borrowed
    }

    pub fn net(&self) -> &FixedPointAmount {
        &self.net
    }

    pub fn is_underwater(&self) -> bool {
        self.net.is_negative()
    }
}
