// Bitcoin taproot transaction toolkit.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2024-2025 by
//     Dr Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2024-2025 LNP/BP Standards Association. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;

/// Error constructing timelock from the provided value.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display("invalid timelock value {0}")]
pub struct InvalidTimelock(pub u32);

/// The Threshold for deciding whether a lock time value is a height or a time
/// (see [Bitcoin Core]).
///
/// `LockTime` values _below_ the threshold are interpreted as block heights,
/// values _above_ (or equal to) the threshold are interpreted as block times
/// (UNIX timestamp, seconds since epoch).
///
/// [Bitcoin Core]: https://github.com/bitcoin/bitcoin/blob/9ccaee1d5e2e4b79b0a7c29aadb41b97e4741332/src/script/script.h#L39
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Bit 22 of an `nSequence` value: when set, the relative lock is measured in
/// 512-second intervals instead of blocks (BIP-68).
pub const SEQ_LT_TYPE_FLAG: u32 = 0x0040_0000;

/// Transaction-level absolute time lock (`nLockTime` field value).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct LockTime(u32);

impl PartialOrd for LockTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_height_based() != other.is_height_based() {
            None
        } else {
            Some(self.0.cmp(&other.0))
        }
    }
}

impl LockTime {
    /// Zero time lock
    pub const ZERO: Self = Self(0);

    /// Creates absolute time lock with the given block height.
    ///
    /// Block height must be strictly less than `0x1DCD6500`, otherwise
    /// `None` is returned.
    #[inline]
    pub const fn from_height(height: u32) -> Option<Self> {
        if height < LOCKTIME_THRESHOLD {
            Some(Self(height))
        } else {
            None
        }
    }

    /// Creates absolute time lock with the given UNIX timestamp value.
    ///
    /// Timestamp value must be greater or equal to `0x1DCD6500`, otherwise
    /// `None` is returned.
    #[inline]
    pub const fn from_unix_timestamp(timestamp: u32) -> Option<Self> {
        if timestamp < LOCKTIME_THRESHOLD {
            None
        } else {
            Some(Self(timestamp))
        }
    }

    /// Converts into full u32 representation of `nLockTime` value as it is
    /// serialized in bitcoin transaction.
    #[inline]
    pub const fn from_consensus_u32(lock_time: u32) -> Self { LockTime(lock_time) }

    #[inline]
    pub const fn to_consensus_u32(&self) -> u32 { self.0 }

    #[inline]
    pub const fn into_consensus_u32(self) -> u32 { self.0 }

    /// Checks if the absolute timelock provided by the `nLockTime` value
    /// specifies height-based lock
    #[inline]
    pub const fn is_height_based(self) -> bool { self.0 < LOCKTIME_THRESHOLD }

    /// Checks if the absolute timelock provided by the `nLockTime` value
    /// specifies time-based lock
    #[inline]
    pub const fn is_time_based(self) -> bool { !self.is_height_based() }
}

/// Input-level `nSequence` value, carrying BIP-68 relative timelock and
/// BIP-125 replace-by-fee semantics.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SeqNo(u32);

impl SeqNo {
    /// Zero sequence number.
    pub const ZERO: SeqNo = SeqNo(0);
    /// Final sequence: no timelock, opts out of replace-by-fee.
    pub const FINAL: SeqNo = SeqNo(0xFFFFFFFF);
    /// Maximal sequence number which still signals replace-by-fee.
    pub const RBF: SeqNo = SeqNo(0xFFFFFFFD);

    #[inline]
    pub const fn from_consensus_u32(seq_no: u32) -> Self { SeqNo(seq_no) }

    #[inline]
    pub const fn to_consensus_u32(&self) -> u32 { self.0 }

    /// Creates a relative timelock measured in number of blocks.
    #[inline]
    pub const fn from_height(blocks: u16) -> SeqNo { SeqNo(blocks as u32) }

    /// Creates a relative timelock measured in number of 512-second
    /// intervals.
    #[inline]
    pub const fn from_intervals(intervals: u16) -> SeqNo {
        SeqNo(intervals as u32 | SEQ_LT_TYPE_FLAG)
    }

    /// Creates a relative timelock measured in seconds, rounded down to the
    /// 512-second granularity of BIP-68. Returns `None` when the value
    /// exceeds the representable range.
    pub const fn from_seconds_floor(seconds: u32) -> Option<SeqNo> {
        let intervals = seconds / 512;
        if intervals > u16::MAX as u32 {
            return None;
        }
        Some(SeqNo::from_intervals(intervals as u16))
    }

    /// Detects whether the sequence signals replace-by-fee (BIP-125).
    #[inline]
    pub const fn is_rbf(&self) -> bool { self.0 < 0xFFFFFFFE }

    /// Detects whether a relative timelock is enabled for this sequence
    /// (BIP-68: bit 31 must be unset).
    #[inline]
    pub const fn is_timelock(&self) -> bool { self.0 & (1 << 31) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqno_relative_locks() {
        assert_eq!(SeqNo::from_height(2).to_consensus_u32(), 2);
        assert_eq!(SeqNo::from_intervals(2).to_consensus_u32(), 0x400002);
        assert_eq!(SeqNo::from_seconds_floor(1024), Some(SeqNo::from_intervals(2)));
        assert_eq!(SeqNo::from_seconds_floor(1025), Some(SeqNo::from_intervals(2)));
        assert_eq!(SeqNo::from_seconds_floor(u32::MAX), None);
    }

    #[test]
    fn seqno_rbf() {
        assert!(SeqNo::RBF.is_rbf());
        assert!(!SeqNo::FINAL.is_rbf());
        assert!(!SeqNo::from_consensus_u32(0xFFFFFFFE).is_rbf());
        assert!(SeqNo::from_height(2).is_rbf());
    }

    #[test]
    fn locktime_kinds() {
        assert!(LockTime::ZERO.is_height_based());
        assert!(LockTime::from_height(499_999_999).is_some());
        assert!(LockTime::from_height(500_000_000).is_none());
        assert!(LockTime::from_unix_timestamp(1_700_000_000).unwrap().is_time_based());
        assert_eq!(LockTime::ZERO.partial_cmp(&LockTime::from_consensus_u32(1_700_000_000)), None);
    }
}
