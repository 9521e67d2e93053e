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

use amplify::{Bytes20, Wrapper};
use commit_verify::{DigestExt, Ripemd160, Sha256};

use crate::CompressedPk;

fn hash160(data: &[u8]) -> Bytes20 {
    let mut engine = Sha256::default();
    engine.input_raw(data);
    let mut engine2 = Ripemd160::default();
    engine2.input_raw(&engine.finish());
    engine2.finish().into()
}

/// Hash160 of a legacy public key, used in P2PKH outputs.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Index, RangeOps, AsSlice, BorrowSlice, Hex, Display, FromStr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct PubkeyHash(
    #[from]
    #[from([u8; 20])]
    pub Bytes20,
);

impl From<PubkeyHash> for [u8; 20] {
    fn from(value: PubkeyHash) -> Self { value.0.into_inner() }
}

impl From<CompressedPk> for PubkeyHash {
    fn from(pk: CompressedPk) -> Self { Self(hash160(&pk.to_byte_array())) }
}

/// Hash160 of a compressed public key, used in P2WPKH outputs.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Index, RangeOps, AsSlice, BorrowSlice, Hex, Display, FromStr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct WPubkeyHash(
    #[from]
    #[from([u8; 20])]
    pub Bytes20,
);

impl From<WPubkeyHash> for [u8; 20] {
    fn from(value: WPubkeyHash) -> Self { value.0.into_inner() }
}

impl From<CompressedPk> for WPubkeyHash {
    fn from(pk: CompressedPk) -> Self { Self(hash160(&pk.to_byte_array())) }
}
