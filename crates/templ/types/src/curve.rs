//! Entry fee curve: maps a join sequence number to the fee charged
//!
//! The curve is a pure function of its config and the sequence number.
//! A join's fee is computed once, at join time, and never recomputed.
//!
//! | Style       | Fee at sequence `n`                          |
//! |-------------|----------------------------------------------|
//! | Static      | `base`                                       |
//! | Linear      | `base + base * rate * n / 10_000`            |
//! | Exponential | `base * ((10_000 + rate) / 10_000)^n`        |
//!
//! An optional extension segment takes over after a sequence threshold and
//! grows from the fee the primary segment reached at that threshold.
//! Fees beyond [`MAX_ENTRY_FEE`] are clamped, never rejected.

use crate::{Amount, BasisPoints, TemplError, TemplResult, BPS_DENOMINATOR, MAX_ENTRY_FEE};
use serde::{Deserialize, Serialize};

/// 1e18 fixed-point scale used by exponential pricing.
const WAD: u128 = 1_000_000_000_000_000_000;

/// Scale factor from basis points to WAD.
const BPS_TO_WAD: u128 = WAD / BPS_DENOMINATOR as u128;

/// Shape of a curve segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CurveStyle {
    /// Constant fee
    #[default]
    Static,
    /// Fee grows by a fixed share of the base per join
    Linear,
    /// Fee compounds by a fixed share per join
    Exponential,
}

/// One pricing segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CurveSegment {
    pub style: CurveStyle,
    /// Growth rate in basis points per join
    #[serde(default)]
    pub rate_bps: BasisPoints,
}

impl CurveSegment {
    pub fn fixed() -> Self {
        Self {
            style: CurveStyle::Static,
            rate_bps: 0,
        }
    }

    pub fn linear(rate_bps: BasisPoints) -> Self {
        Self {
            style: CurveStyle::Linear,
            rate_bps,
        }
    }

    pub fn exponential(rate_bps: BasisPoints) -> Self {
        Self {
            style: CurveStyle::Exponential,
            rate_bps,
        }
    }

    pub fn validate(&self) -> TemplResult<()> {
        match self.style {
            CurveStyle::Static if self.rate_bps != 0 => Err(TemplError::InvalidCurve(format!(
                "static segment declares non-zero rate {}",
                self.rate_bps
            ))),
            CurveStyle::Exponential if self.rate_bps == 0 => Err(TemplError::InvalidCurve(
                "exponential segment requires a non-zero rate".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Fee after `steps` joins starting from `base`
    fn price(&self, base: Amount, steps: u64) -> Amount {
        let fee = match self.style {
            CurveStyle::Static => base,
            CurveStyle::Linear => linear_price(base, self.rate_bps, steps),
            CurveStyle::Exponential => exponential_price(base, self.rate_bps, steps),
        };
        fee.min(MAX_ENTRY_FEE)
    }
}

/// Secondary segment that replaces the primary one after a threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveExtension {
    /// Last sequence number priced by the primary segment
    pub after_sequence: u64,
    pub segment: CurveSegment,
}

/// Entry fee curve configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFeeCurve {
    /// Fee the curve starts from
    pub base_fee: Amount,
    pub primary: CurveSegment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<CurveExtension>,
}

impl Default for EntryFeeCurve {
    fn default() -> Self {
        Self::fixed(100)
    }
}

impl EntryFeeCurve {
    /// A constant-fee curve
    pub fn fixed(base_fee: Amount) -> Self {
        Self {
            base_fee,
            primary: CurveSegment::fixed(),
            extension: None,
        }
    }

    pub fn new(base_fee: Amount, primary: CurveSegment) -> Self {
        Self {
            base_fee,
            primary,
            extension: None,
        }
    }

    pub fn with_extension(mut self, after_sequence: u64, segment: CurveSegment) -> Self {
        self.extension = Some(CurveExtension {
            after_sequence,
            segment,
        });
        self
    }

    pub fn validate(&self) -> TemplResult<()> {
        if self.base_fee == 0 {
            return Err(TemplError::InvalidCurve("base fee must be non-zero".into()));
        }
        if self.base_fee > MAX_ENTRY_FEE {
            return Err(TemplError::InvalidCurve(format!(
                "base fee {} exceeds maximum {}",
                self.base_fee, MAX_ENTRY_FEE
            )));
        }
        self.primary.validate()?;
        if let Some(extension) = &self.extension {
            if extension.after_sequence == 0 {
                return Err(TemplError::InvalidCurve(
                    "extension must start after sequence 1 or later".into(),
                ));
            }
            extension.segment.validate()?;
        }
        Ok(())
    }

    /// Entry fee for the member that will receive join sequence `sequence`
    pub fn fee_for_sequence(&self, sequence: u64) -> Amount {
        match &self.extension {
            Some(extension) if sequence > extension.after_sequence => {
                let pivot = self.primary.price(self.base_fee, extension.after_sequence);
                extension
                    .segment
                    .price(pivot, sequence - extension.after_sequence)
            }
            _ => self.primary.price(self.base_fee, sequence),
        }
    }
}

fn linear_price(base: Amount, rate_bps: BasisPoints, steps: u64) -> Amount {
    let growth = base
        .checked_mul(rate_bps as u128)
        .and_then(|v| v.checked_mul(steps as u128))
        .map(|v| v / BPS_DENOMINATOR as u128);
    match growth {
        Some(growth) => base.saturating_add(growth),
        None => MAX_ENTRY_FEE,
    }
}

/// Square-and-multiply in WAD fixed point. A multiplier that no longer fits
/// the fixed-point range is treated as exceeding the cap.
fn exponential_price(base: Amount, rate_bps: BasisPoints, steps: u64) -> Amount {
    let mut result = base;
    let mut factor = Some((BPS_DENOMINATOR as u128 + rate_bps as u128) * BPS_TO_WAD);
    let mut remaining = steps;

    while remaining > 0 {
        if remaining & 1 == 1 {
            let Some(f) = factor else {
                return MAX_ENTRY_FEE;
            };
            result = match mul_wad(result, f) {
                Some(next) if next <= MAX_ENTRY_FEE => next,
                _ => return MAX_ENTRY_FEE,
            };
        }
        remaining >>= 1;
        if remaining > 0 {
            factor = factor.and_then(|f| mul_wad(f, f));
        }
    }
    result
}

/// `a * b / WAD` rounded down, `None` on overflow
fn mul_wad(a: u128, b: u128) -> Option<u128> {
    if let Some(product) = a.checked_mul(b) {
        return Some(product / WAD);
    }
    let (a_hi, a_lo) = (a / WAD, a % WAD);
    let (b_hi, b_lo) = (b / WAD, b % WAD);
    a_hi.checked_mul(b_hi)?
        .checked_mul(WAD)?
        .checked_add(a_hi.checked_mul(b_lo)?)?
        .checked_add(a_lo.checked_mul(b_hi)?)?
        .checked_add(a_lo * b_lo / WAD)
}
