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

//! PSBT key type constants from BIP-174, BIP-370 and BIP-371.

/// Magic prefix of every serialized PSBT: `psbt` followed by `0xFF`.
pub const PSBT_MAGIC: [u8; 5] = *b"psbt\xff";

/// Serialized unsigned transaction (v0 only).
pub const PSBT_GLOBAL_UNSIGNED_TX: u64 = 0x00;
/// Transaction version (v2).
pub const PSBT_GLOBAL_TX_VERSION: u64 = 0x02;
/// Fallback transaction locktime (v2).
pub const PSBT_GLOBAL_FALLBACK_LOCKTIME: u64 = 0x03;
/// Number of inputs (v2).
pub const PSBT_GLOBAL_INPUT_COUNT: u64 = 0x04;
/// Number of outputs (v2).
pub const PSBT_GLOBAL_OUTPUT_COUNT: u64 = 0x05;

/// Spent output: 8-byte amount plus scriptPubkey.
pub const PSBT_IN_WITNESS_UTXO: u64 = 0x01;
/// Finalized witness stack of the input.
pub const PSBT_IN_FINAL_SCRIPTWITNESS: u64 = 0x08;
/// Previous transaction id (v2).
pub const PSBT_IN_PREVIOUS_TXID: u64 = 0x0e;
/// Spent output index (v2).
pub const PSBT_IN_OUTPUT_INDEX: u64 = 0x0f;
/// Input `nSequence` (v2).
pub const PSBT_IN_SEQUENCE: u64 = 0x10;
/// Taproot key-path BIP-340 signature (64 or 65 bytes).
pub const PSBT_IN_TAP_KEY_SIG: u64 = 0x13;
/// Taproot script-path signature; key data carries the signing x-only key
/// and the leaf hash.
pub const PSBT_IN_TAP_SCRIPT_SIG: u64 = 0x14;
/// Taproot leaf script; key data carries the control block.
pub const PSBT_IN_TAP_LEAF_SCRIPT: u64 = 0x15;
/// Taproot internal key of the spent output.
pub const PSBT_IN_TAP_INTERNAL_KEY: u64 = 0x17;
/// Merkle root of the taproot script tree of the spent output.
pub const PSBT_IN_TAP_MERKLE_ROOT: u64 = 0x18;

/// Output amount in satoshis (v2).
pub const PSBT_OUT_AMOUNT: u64 = 0x03;
/// Output scriptPubkey (v2).
pub const PSBT_OUT_SCRIPT: u64 = 0x04;
