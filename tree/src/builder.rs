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
use commit_verify::{Digest, Sha256};
use tbc::{InternalPk, Network, ScriptBytes, SeqNo, XOnlyPk};

use crate::{LeafKind, LeafRef, TaprootProgram};

/// Errors happening during script tree construction or leaf lookup.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum BuildError {
    /// two script leaves share the label '{0}'.
    DuplicateLabel(String),

    /// no script leaf matches {0} in the tree.
    UnknownLeaf(LeafRef),

    /// multisig leaf '{label}' threshold {threshold} is not satisfiable by
    /// its {keys} keys.
    InvalidThreshold {
        label: String,
        threshold: u8,
        keys: usize,
    },

    /// timelock of {0} seconds exceeds the BIP-68 representable range.
    TimelockRange(u32),

    /// custom leaf '{0}' has an empty script.
    EmptyScript(String),
}

/// Taproot script tree builder.
///
/// Accumulates semantically labeled leaves in declaration order and freezes
/// them with [`TapTree::build`] into an immutable [`TaprootProgram`]. Leaves
/// without an explicit label get a generated `_leaf<N>` one.
///
/// ```
/// use taptree::TapTree;
/// use taptree::tbc::{Network, PrivKey};
///
/// let alice = PrivKey::from_wif("cRxebG1hY6vVgS9CSLNaEbEJaXkpZvc6nFeqqGT7v6gcW7MbzKNT")?;
/// let bob = PrivKey::from_wif("cSNdLFDf3wjx1rswNL2jKykbVkC6o56o5nYZi4FUkWKjFn2Q5DSG")?;
///
/// let program = TapTree::with(alice.to_internal_pk(), Network::Testnet)
///     .hashlock(b"helloworld", Some("hash"))
///     .multisig(2, [alice.x_only(), bob.x_only()], Some("2of2"))
///     .timelock_blocks(2, bob.x_only(), Some("csv"))
///     .checksig(bob.x_only(), Some("bob"))
///     .build()?;
/// println!("{}", program.address());
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct TapTree {
    internal_key: InternalPk,
    network: Network,
    leaves: Vec<(Option<String>, LeafKind)>,
    timelock_overflow: Option<u32>,
}

impl TapTree {
    /// Starts a new tree for the given internal key.
    pub fn with(internal_key: impl Into<InternalPk>, network: Network) -> Self {
        TapTree {
            internal_key: internal_key.into(),
            network,
            leaves: vec![],
            timelock_overflow: None,
        }
    }

    /// Adds a SHA256 hash lock leaf.
    ///
    /// The preimage is hashed here; only its hash is committed into the
    /// script. Unlock with the preimage at spend time.
    pub fn hashlock(mut self, preimage: impl AsRef<[u8]>, label: Option<&str>) -> Self {
        let preimage_hash: [u8; 32] = Sha256::digest(preimage.as_ref()).into();
        self.leaves.push((label.map(str::to_owned), LeafKind::Hashlock {
            preimage_hash: Bytes32::from(preimage_hash),
        }));
        self
    }

    /// Adds a single-signature leaf.
    pub fn checksig(mut self, key: impl Into<XOnlyPk>, label: Option<&str>) -> Self {
        self.leaves.push((label.map(str::to_owned), LeafKind::Checksig {
            pubkey: key.into(),
        }));
        self
    }

    /// Adds a k-of-n tapscript multisig leaf (`OP_CHECKSIGADD`).
    ///
    /// The threshold validity is checked at [`TapTree::build`] time.
    pub fn multisig(
        mut self,
        threshold: u8,
        keys: impl IntoIterator<Item = impl Into<XOnlyPk>>,
        label: Option<&str>,
    ) -> Self {
        self.leaves.push((label.map(str::to_owned), LeafKind::Multisig {
            threshold,
            pubkeys: keys.into_iter().map(Into::into).collect(),
        }));
        self
    }

    /// Adds a relative timelock leaf measured in blocks.
    pub fn timelock_blocks(
        mut self,
        blocks: u16,
        then: impl Into<XOnlyPk>,
        label: Option<&str>,
    ) -> Self {
        self.leaves.push((label.map(str::to_owned), LeafKind::CsvTimelock {
            sequence: SeqNo::from_height(blocks),
            pubkey: then.into(),
        }));
        self
    }

    /// Adds a relative timelock leaf measured in seconds (rounded down to
    /// the 512-second BIP-68 granularity).
    pub fn timelock_seconds(
        mut self,
        seconds: u32,
        then: impl Into<XOnlyPk>,
        label: Option<&str>,
    ) -> Self {
        let Some(sequence) = SeqNo::from_seconds_floor(seconds) else {
            self.timelock_overflow.get_or_insert(seconds);
            return self;
        };
        self.leaves.push((label.map(str::to_owned), LeafKind::CsvTimelock {
            sequence,
            pubkey: then.into(),
        }));
        self
    }

    /// Adds a custom script leaf used verbatim.
    ///
    /// Custom leaves must be labeled: there is no way to derive a meaningful
    /// name for them, and spending requires referring to the leaf.
    pub fn custom(mut self, script: ScriptBytes, label: &str) -> Self {
        self.leaves.push((Some(label.to_owned()), LeafKind::Custom { script }));
        self
    }

    /// Number of leaves added so far.
    pub fn len(&self) -> usize { self.leaves.len() }

    pub fn is_empty(&self) -> bool { self.leaves.is_empty() }

    /// Freezes the tree: compiles each leaf into its tapscript, computes the
    /// leaf hashes and the Merkle root, tweaks the internal key and derives
    /// the program address.
    pub fn build(self) -> Result<TaprootProgram, BuildError> {
        if let Some(seconds) = self.timelock_overflow {
            return Err(BuildError::TimelockRange(seconds));
        }

        let mut labeled = Vec::with_capacity(self.leaves.len());
        for (index, (label, kind)) in self.leaves.into_iter().enumerate() {
            let label = label.unwrap_or_else(|| format!("_leaf{index}"));
            if labeled.iter().any(|(other, _)| *other == label) {
                return Err(BuildError::DuplicateLabel(label));
            }
            match &kind {
                LeafKind::Multisig { threshold, pubkeys }
                    if *threshold == 0 || *threshold as usize > pubkeys.len() =>
                {
                    return Err(BuildError::InvalidThreshold {
                        label,
                        threshold: *threshold,
                        keys: pubkeys.len(),
                    })
                }
                LeafKind::Custom { script } if script.is_empty() => {
                    return Err(BuildError::EmptyScript(label))
                }
                _ => {}
            }
            labeled.push((label, kind));
        }

        Ok(TaprootProgram::with(self.internal_key, self.network, labeled))
    }
}
