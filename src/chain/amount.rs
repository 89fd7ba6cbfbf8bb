// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-point token amounts.
//!
//! Amounts enter the client as decimal strings (`"1.5"`) and are held as an
//! integer count of the smallest unit at a given precision. Converting between
//! the native chain's precision and the host token's precision never silently
//! drops digits.

use std::cmp::Ordering;
use std::fmt;

use alloy::primitives::U256;

use crate::error::BridgeError;

/// An amount in smallest units at a fixed decimal precision.
///
/// Equality and ordering compare values, so `1` at 4 decimals equals `1.0`
/// at 8 decimals.
#[derive(Debug, Clone, Copy)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Parse a human-readable amount (e.g. `"1.5"`) at the given precision.
    pub fn parse(amount: &str, decimals: u8) -> Result<Self, BridgeError> {
        let raw = parse_amount(amount, decimals)?;
        Ok(Self { raw, decimals })
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Express this amount at another precision.
    ///
    /// Fails if the target precision cannot represent the amount exactly.
    pub fn rescale(&self, decimals: u8) -> Result<Self, BridgeError> {
        let raw = match decimals.cmp(&self.decimals) {
            Ordering::Equal => self.raw,
            Ordering::Greater => {
                let factor = pow10(decimals - self.decimals);
                self.raw.checked_mul(factor).ok_or_else(|| {
                    BridgeError::InvalidAmount("Amount overflow".to_string())
                })?
            }
            Ordering::Less => {
                let factor = pow10(self.decimals - decimals);
                if !(self.raw % factor).is_zero() {
                    return Err(BridgeError::InvalidAmount(format!(
                        "Amount {} has more than {} decimal places",
                        self, decimals
                    )));
                }
                self.raw / factor
            }
        };
        Ok(Self { raw, decimals })
    }

    /// Format with exactly `places` decimal places (e.g. `"1.0000"`).
    pub fn to_fixed(&self, places: u8) -> String {
        format_amount_fixed(self.raw, self.decimals, places)
    }
}

impl PartialEq for TokenAmount {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for TokenAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let decimals = self.decimals.max(other.decimals);
        let lhs = self.raw.checked_mul(pow10(decimals - self.decimals))?;
        let rhs = other.raw.checked_mul(pow10(decimals - other.decimals))?;
        Some(lhs.cmp(&rhs))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_amount(self.raw, self.decimals))
    }
}

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Parse a human-readable amount to smallest units.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals of the target unit
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, BridgeError> {
    let trimmed = amount.trim();
    let invalid = || BridgeError::InvalidAmount(format!("Invalid amount: {trimmed}"));

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 2 || parts.iter().all(|p| p.is_empty()) {
        return Err(invalid());
    }
    if parts
        .iter()
        .any(|p| !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }

    let whole = if parts[0].is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(parts[0], 10).map_err(|_| invalid())?
    };

    let decimal_part = if parts.len() == 2 && !parts[1].is_empty() {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(BridgeError::InvalidAmount(format!(
                "Too many decimal places (max {})",
                decimals
            )));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| invalid())?
    } else {
        U256::ZERO
    };

    whole
        .checked_mul(pow10(decimals))
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| BridgeError::InvalidAmount("Amount overflow".to_string()))
}

/// Format smallest units to a human-readable amount, trimming trailing zeros.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = pow10(decimals);
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}

/// Format smallest units with exactly `places` decimal places.
///
/// Extra precision beyond `places` is truncated, missing precision is padded.
pub fn format_amount_fixed(amount: U256, decimals: u8, places: u8) -> String {
    let divisor = pow10(decimals);
    let whole = amount / divisor;
    if places == 0 {
        return whole.to_string();
    }

    let remainder = amount % divisor;
    let mut fraction = format!("{:0>width$}", remainder, width = decimals as usize);
    fraction.truncate(places as usize);
    format!("{}.{:0<width$}", whole, fraction, width = places as usize)
}
