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

//! Umbrella crate for the taproot transaction toolkit, re-exporting the
//! consensus primitives ([`tbc`]), the script tree compiler and spend
//! builder ([`taptree`]) and the PSBT workflow ([`psbt`]).
//!
//! The typical flow: declare keys and leaves, [`TapTree::build`] the
//! program, fund its [`TaprootProgram::address`], then either
//! [`TaprootProgram::spend`]/[`TaprootProgram::keypath`] directly into a
//! signed transaction, or export a [`Psbt`] for multi-party signing.

// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

/// Re-export of the PSBT workflow crate.
pub extern crate psbt;
/// Re-export of the script tree and spend builder crate.
pub extern crate taptree;
/// Re-export of the consensus primitives crate.
pub extern crate tbc;

pub use psbt::{CodecError, Psbt, PsbtParseError, PsbtV2, SignError, ToPsbt};
pub use taptree::{
    select_largest_first, BuildError, LeafDescriptor, LeafKind, LeafRef, Spend, SpendBuilder,
    SpendError, TapTree, TaprootProgram, UtxoFact,
};
pub use tbc::{
    Address, AddressError, AddressPayload, AuxRand, Bip340Sig, ControlBlock, InternalPk, LeafVer,
    Network, Outpoint, OutputPk, Parity, PrivKey, Sats, SeqNo, TapBranchHash, TapLeafHash,
    TapMerklePath, TapNodeHash, TapScript, TapSighash, Tx, TxOut, Txid, Vout, WifError, Witness,
    XOnlyPk,
};
