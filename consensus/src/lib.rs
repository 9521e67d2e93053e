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

//! Bitcoin consensus primitives required for constructing, signing and
//! serializing taproot transactions: BIP-340 tagged hashes and key tweaks,
//! tapscript encoding, segwit transaction (de)serialization, BIP-341
//! signature hashing and network address forms.

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

#[macro_use]
extern crate amplify;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

/// Re-export of `secp256k1` crate.
pub extern crate secp256k1;

pub mod opcodes;
mod coding;
mod script;
mod taproot;
mod keys;
mod timelocks;
mod tx;
mod segwit;
mod hashtypes;
mod address;
mod sigtypes;
mod sighash;

pub use address::{Address, AddressError, AddressPayload, Network, NetworkParseError};
pub use coding::{
    ByteStr, ConsensusDataError, ConsensusDecode, ConsensusDecodeError, ConsensusEncode, LenVarInt,
    VarInt, VarIntArray, VarIntBytes,
};
pub use hashtypes::{PubkeyHash, WPubkeyHash};
pub use keys::{
    AuxRand, CompressedPk, InvalidPubkey, PrivKey, PubkeyParseError, WifError, XOnlyPk,
};
pub use script::{
    Instruction, Instructions, OpCode, ScriptBytes, ScriptPubkey, SigScript, UnknownOpCode,
    UnparsableScript,
};
pub use segwit::{SegwitError, Witness, WitnessProgram, WitnessVer, Wtxid};
pub use sighash::{PrevoutMismatch, SighashCache, SighashError};
pub use sigtypes::{Bip340Sig, NonStandardValue, SigError, SighashFlag, SighashType};
pub use taproot::{
    Annex, AnnexError, ControlBlock, FutureLeafVer, InternalKeypair, InternalPk, IntoTapHash,
    InvalidLeafVer, InvalidParityValue, LeafScript, LeafVer, OutputPk, Parity, TapBranchHash,
    TapLeafHash, TapMerklePath, TapNodeHash, TapScript, TapSighash, TAPROOT_ANNEX_PREFIX,
    TAPROOT_LEAF_MASK, TAPROOT_LEAF_TAPSCRIPT,
};
pub use timelocks::{InvalidTimelock, LockTime, SeqNo, LOCKTIME_THRESHOLD, SEQ_LT_TYPE_FLAG};
pub use tx::{Outpoint, OutpointParseError, Sats, Tx, TxIn, TxOut, TxParseError, TxVer, Txid, Vout};
