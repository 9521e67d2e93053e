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

use amplify::Bytes32;
use tbc::{ScriptBytes, SeqNo, TapLeafHash, TapScript, XOnlyPk};

/// Semantic kind of a script leaf, carrying the parameters needed both to
/// compile the tapscript and to assemble the unlocking witness.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase", tag = "type")
)]
pub enum LeafKind {
    /// SHA256 hash lock: `OP_SHA256 <hash> OP_EQUALVERIFY OP_1`.
    Hashlock { preimage_hash: Bytes32 },

    /// Single signature check: `<xonly> OP_CHECKSIG`.
    Checksig { pubkey: XOnlyPk },

    /// Tapscript k-of-n multisig accumulated via `OP_CHECKSIGADD`.
    Multisig { threshold: u8, pubkeys: Vec<XOnlyPk> },

    /// Relative timelock: `<seq> OP_CHECKSEQUENCEVERIFY OP_DROP <xonly>
    /// OP_CHECKSIG`.
    CsvTimelock { sequence: SeqNo, pubkey: XOnlyPk },

    /// Raw script used verbatim; may contain non-standard opcodes.
    Custom { script: ScriptBytes },
}

/// Immutable metadata of a single compiled script leaf.
///
/// Descriptors are frozen by [`crate::TapTree::build`]; the spend builder
/// dispatches on [`LeafDescriptor::kind`] to decide which unlocking material
/// a witness requires.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct LeafDescriptor {
    /// Unique label within the tree.
    pub label: String,
    /// 0-based position in the order of declaration.
    pub index: usize,
    /// Semantic kind with its parameters.
    pub kind: LeafKind,
    /// Compiled tapscript.
    pub script: TapScript,
    /// BIP-341 leaf hash of the compiled script.
    pub leaf_hash: TapLeafHash,
}

impl LeafDescriptor {
    /// Default `nSequence` which inputs spending through this leaf must
    /// carry: the committed relative timelock for CSV leaves, RBF otherwise.
    pub fn default_sequence(&self) -> SeqNo {
        match self.kind {
            LeafKind::CsvTimelock { sequence, .. } => sequence,
            _ => SeqNo::RBF,
        }
    }
}

/// Reference to a leaf inside a program: either by its unique label or by
/// the declaration index.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Display, From)]
#[display(inner)]
pub enum LeafRef {
    #[from]
    Index(usize),
    #[from]
    #[from(&str)]
    Label(String),
}

impl From<&String> for LeafRef {
    fn from(label: &String) -> Self { LeafRef::Label(label.clone()) }
}
