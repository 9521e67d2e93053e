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

use amplify::Wrapper;
use tbc::opcodes::*;
use tbc::{
    Address, ControlBlock, InternalPk, IntoTapHash, LeafVer, Network, OutputPk, Parity,
    ScriptPubkey, TapBranchHash, TapMerklePath, TapNodeHash, TapScript,
};

use crate::{BuildError, LeafDescriptor, LeafKind, LeafRef, SpendBuilder};

/// Frozen taproot script tree.
///
/// Produced by [`crate::TapTree::build`]; immutable and shareable. Owns the
/// ordered leaf descriptors together with their compiled scripts and leaf
/// hashes; all look-ups go through labels or indices, never through back
/// references.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct TaprootProgram {
    internal_key: InternalPk,
    network: Network,
    leaves: Vec<LeafDescriptor>,
    merkle_root: Option<TapNodeHash>,
    output_key: OutputPk,
    output_key_parity: Parity,
}

impl TaprootProgram {
    pub(crate) fn with(
        internal_key: InternalPk,
        network: Network,
        labeled: Vec<(String, LeafKind)>,
    ) -> Self {
        let leaves = labeled
            .into_iter()
            .enumerate()
            .map(|(index, (label, kind))| {
                let script = Self::compile(&kind);
                let leaf_hash = script.tap_leaf_hash();
                LeafDescriptor {
                    label,
                    index,
                    kind,
                    script,
                    leaf_hash,
                }
            })
            .collect::<Vec<_>>();

        let node_hashes =
            leaves.iter().map(|leaf| leaf.leaf_hash.into_tap_hash()).collect::<Vec<_>>();
        let merkle_root =
            if node_hashes.is_empty() { None } else { Some(Self::subtree_root(&node_hashes)) };
        let (output_key, output_key_parity) = internal_key.to_output_pk(merkle_root);

        TaprootProgram {
            internal_key,
            network,
            leaves,
            merkle_root,
            output_key,
            output_key_parity,
        }
    }

    /// Compiles a semantic leaf into its tapscript bytes.
    pub fn compile(kind: &LeafKind) -> TapScript {
        let mut script = TapScript::new();
        match kind {
            LeafKind::Hashlock { preimage_hash } => {
                script.push_opcode(OP_SHA256);
                script.push_slice(preimage_hash.as_ref());
                script.push_opcode(OP_EQUALVERIFY);
                script.push_opcode(OP_PUSHNUM_1);
            }
            LeafKind::Checksig { pubkey } => {
                script.push_slice(&pubkey.to_byte_array());
                script.push_opcode(OP_CHECKSIG);
            }
            LeafKind::Multisig { threshold, pubkeys } => {
                script.push_opcode(OP_PUSHBYTES_0);
                for pubkey in pubkeys {
                    script.push_slice(&pubkey.to_byte_array());
                    script.push_opcode(OP_CHECKSIGADD);
                }
                script.push_num(*threshold as i64);
                script.push_opcode(OP_EQUAL);
            }
            LeafKind::CsvTimelock { sequence, pubkey } => {
                script.push_num(sequence.to_consensus_u32() as i64);
                script.push_opcode(OP_CSV);
                script.push_opcode(OP_DROP);
                script.push_slice(&pubkey.to_byte_array());
                script.push_opcode(OP_CHECKSIG);
            }
            LeafKind::Custom { script: raw } => return TapScript::from_inner(raw.clone()),
        }
        script
    }

    /// Root hash of the balanced subtree over a hash slice: recursive split
    /// at `mid = len / 2`.
    fn subtree_root(hashes: &[TapNodeHash]) -> TapNodeHash {
        if hashes.len() == 1 {
            return hashes[0];
        }
        let mid = hashes.len() / 2;
        let left = Self::subtree_root(&hashes[..mid]);
        let right = Self::subtree_root(&hashes[mid..]);
        TapBranchHash::with_nodes(left, right).into_tap_hash()
    }

    /// Sibling subtree roots along the recursion path of the leaf, ordered
    /// leaf to root.
    fn subtree_proof(hashes: &[TapNodeHash], index: usize) -> Vec<TapBranchHash> {
        if hashes.len() == 1 {
            return vec![];
        }
        let mid = hashes.len() / 2;
        let (mut proof, sibling) = if index < mid {
            (Self::subtree_proof(&hashes[..mid], index), Self::subtree_root(&hashes[mid..]))
        } else {
            (Self::subtree_proof(&hashes[mid..], index - mid), Self::subtree_root(&hashes[..mid]))
        };
        proof.push(TapBranchHash::from(sibling.to_byte_array()));
        proof
    }

    #[inline]
    pub fn internal_key(&self) -> InternalPk { self.internal_key }

    #[inline]
    pub fn network(&self) -> Network { self.network }

    /// Leaf descriptors in declaration order.
    #[inline]
    pub fn leaves(&self) -> &[LeafDescriptor] { &self.leaves }

    #[inline]
    pub fn num_leaves(&self) -> usize { self.leaves.len() }

    /// Merkle root of the script tree; `None` for a key-path-only program.
    #[inline]
    pub fn merkle_root(&self) -> Option<TapNodeHash> { self.merkle_root }

    /// Tweaked output key.
    #[inline]
    pub fn output_key(&self) -> OutputPk { self.output_key }

    /// Y parity of the tweaked output key, committed into control blocks.
    #[inline]
    pub fn output_key_parity(&self) -> Parity { self.output_key_parity }

    /// The P2TR scriptPubkey of the program output.
    #[inline]
    pub fn script_pubkey(&self) -> ScriptPubkey { self.output_key.to_script_pubkey() }

    /// Program address (bech32m, witness version 1).
    #[inline]
    pub fn address(&self) -> Address { Address::p2tr(self.network, self.output_key) }

    /// Looks a leaf up by label or index.
    pub fn leaf(&self, leaf: impl Into<LeafRef>) -> Result<&LeafDescriptor, BuildError> {
        let leaf = leaf.into();
        let found = match &leaf {
            LeafRef::Index(index) => self.leaves.get(*index),
            LeafRef::Label(label) => {
                self.leaves.iter().find(|descriptor| &descriptor.label == label)
            }
        };
        found.ok_or(BuildError::UnknownLeaf(leaf))
    }

    /// Merkle proof for the leaf at the given index: ordered sibling hashes
    /// from the leaf to the root. Empty for a single-leaf tree.
    pub fn merkle_proof(&self, index: usize) -> Result<TapMerklePath, BuildError> {
        if index >= self.leaves.len() {
            return Err(BuildError::UnknownLeaf(LeafRef::Index(index)));
        }
        let node_hashes =
            self.leaves.iter().map(|leaf| leaf.leaf_hash.into_tap_hash()).collect::<Vec<_>>();
        let proof = Self::subtree_proof(&node_hashes, index);
        Ok(TapMerklePath::try_from(proof).expect("tree depth under BIP-341 limit"))
    }

    /// Control block for spending through the given leaf.
    pub fn control_block(&self, leaf: impl Into<LeafRef>) -> Result<ControlBlock, BuildError> {
        let descriptor = self.leaf(leaf)?;
        let merkle_branch = self.merkle_proof(descriptor.index)?;
        Ok(ControlBlock::with(
            LeafVer::TapScript,
            self.internal_key,
            self.output_key_parity,
            merkle_branch,
        ))
    }

    /// Starts a script-path spend through the given leaf.
    pub fn spend(&self, leaf: impl Into<LeafRef>) -> Result<SpendBuilder, BuildError> {
        let descriptor = self.leaf(leaf)?;
        Ok(SpendBuilder::script_path(self, descriptor))
    }

    /// Starts a key-path spend with the tweaked internal key.
    pub fn keypath(&self) -> SpendBuilder { SpendBuilder::key_path(self) }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use amplify::hex::ToHex;
    use tbc::{ConsensusEncode, PrivKey};

    use super::*;
    use crate::TapTree;

    fn alice() -> PrivKey {
        PrivKey::from_wif("cRxebG1hY6vVgS9CSLNaEbEJaXkpZvc6nFeqqGT7v6gcW7MbzKNT").unwrap()
    }

    fn bob() -> PrivKey {
        PrivKey::from_wif("cSNdLFDf3wjx1rswNL2jKykbVkC6o56o5nYZi4FUkWKjFn2Q5DSG").unwrap()
    }

    fn four_leaf_program() -> TaprootProgram {
        TapTree::with(alice().to_internal_pk(), Network::Testnet)
            .hashlock(b"helloworld", Some("hash"))
            .multisig(2, [alice().x_only(), bob().x_only()], Some("2of2"))
            .timelock_blocks(2, bob().x_only(), Some("csv"))
            .checksig(bob().x_only(), Some("bob"))
            .build()
            .unwrap()
    }

    #[test]
    fn four_leaf_address() {
        let program = four_leaf_program();
        assert_eq!(
            program.address().to_string(),
            "tb1pjfdm902y2adr08qnn4tahxjvp6x5selgmvzx63yfqk2hdey02yvqjcr29q"
        );
        assert_eq!(
            program.merkle_root().unwrap().to_string(),
            "33fd4d4bfe64086adf33ce383261b9a79ce6fc193e4d494d76cd28d0698a0ecf"
        );
        assert_eq!(program.output_key_parity(), Parity::Even);
    }

    #[test]
    fn compiled_leaf_scripts() {
        let program = four_leaf_program();
        let hex = |label: &str| format!("{:x}", program.leaf(label).unwrap().script);
        assert_eq!(
            hex("hash"),
            "a820936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af8851"
        );
        assert_eq!(
            hex("2of2"),
            "002050be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3ba2084b595\
             1609b76619a1ce7f48977b4312ebe226987166ef044bfb374ceef63af5ba5287"
        );
        assert_eq!(
            hex("csv"),
            "52b2752084b5951609b76619a1ce7f48977b4312ebe226987166ef044bfb374ceef63af5ac"
        );
        assert_eq!(
            hex("bob"),
            "2084b5951609b76619a1ce7f48977b4312ebe226987166ef044bfb374ceef63af5ac"
        );
    }

    #[test]
    fn key_path_only_address() {
        let program =
            TapTree::with(alice().to_internal_pk(), Network::Testnet).build().unwrap();
        assert_eq!(program.merkle_root(), None);
        assert_eq!(
            program.address().to_string(),
            "tb1p060z97qusuxe7w6h8z0l9kam5kn76jur22ecel75wjlmnkpxtnls6vdgne"
        );
    }

    #[test]
    fn single_leaf_address() {
        let program = TapTree::with(alice().to_internal_pk(), Network::Testnet)
            .hashlock(b"helloworld", Some("hash"))
            .build()
            .unwrap();
        assert_eq!(
            program.address().to_string(),
            "tb1p53ncq9ytax924ps66z6al3wfhy6a29w8h6xfu27xem06t98zkmvsakd43h"
        );
        // single leaf: the merkle root is the leaf hash and the proof is
        // empty
        assert_eq!(
            program.merkle_root().unwrap().to_byte_array(),
            program.leaves()[0].leaf_hash.to_byte_array()
        );
        assert_eq!(program.control_block("hash").unwrap().serialized_len(), 33);
    }

    #[test]
    fn three_leaf_balanced_shape() {
        let program = TapTree::with(alice().to_internal_pk(), Network::Testnet)
            .hashlock(b"helloworld", Some("hash"))
            .multisig(2, [alice().x_only(), bob().x_only()], Some("2of2"))
            .timelock_blocks(2, bob().x_only(), Some("csv"))
            .build()
            .unwrap();
        // split at mid=1: leaf 0 is the left child of the root
        assert_eq!(
            program.merkle_root().unwrap().to_string(),
            "7bf3431022eccaddc47961ec052eed62fe2a02a183ecfe81dd9137b55bd06523"
        );
        assert_eq!(
            program.address().to_string(),
            "tb1prd4skqalsz7ftc8wfgf967jmy62pmqg78acn34d8wnr0uug7ytxqgjqu79"
        );
        let proof = program.merkle_proof(2).unwrap();
        assert_eq!(proof.len(), 2);
        assert_eq!(
            proof[0].to_string(),
            "63cb9e4776a1cbb195c5cf0cbdbb3110d308969353680e38ec5f446336b60def"
        );
        assert_eq!(
            proof[1].to_string(),
            "fe78d8523ce9603014b28739a51ef826f791aa17511e617af6dc96a8f10f659e"
        );
    }

    #[test]
    fn merkle_proofs_reconstruct_root(){
        let program = four_leaf_program();
        for index in 0..program.num_leaves() {
            let mut node = program.leaves()[index].leaf_hash.into_tap_hash();
            for sibling in &program.merkle_proof(index).unwrap() {
                node = TapBranchHash::with_nodes(node, sibling.into_tap_hash()).into_tap_hash();
            }
            assert_eq!(node, program.merkle_root().unwrap());
        }
    }

    #[test]
    fn control_blocks() {
        let program = four_leaf_program();
        for index in 0..program.num_leaves() {
            let cb = program.control_block(index).unwrap();
            let serialized = cb.consensus_serialize();
            assert_eq!(serialized.len(), 33 + 32 * cb.merkle_branch.len());
            assert_eq!(serialized[0] & 0xFE, 0xC0);
        }
        assert_eq!(
            program.control_block("hash").unwrap().consensus_serialize().to_hex(),
            "c050be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d363cb9e4776a1cb\
             b195c5cf0cbdbb3110d308969353680e38ec5f446336b60defda55197526f26fa309563b7a3551ca\
             945c046e5b7ada957e59160d4d27f299e3"
        );
    }

    #[test]
    fn addresses_well_formed_for_all_tree_sizes() {
        for leaf_count in 1usize..=8 {
            let mut tree = TapTree::with(alice().to_internal_pk(), Network::Testnet);
            for no in 0..leaf_count {
                tree = tree.hashlock(format!("preimage{no}").as_bytes(), None);
            }
            let program = tree.build().unwrap();
            let address = program.address().to_string();
            assert_eq!(address.len(), 62);
            assert!(address.starts_with("tb1p"));
            let parsed = Address::from_str(&address).unwrap();
            assert_eq!(parsed.script_pubkey(), program.script_pubkey());
        }
    }

    #[test]
    fn unknown_leaf_lookup() {
        let program = four_leaf_program();
        assert!(matches!(program.leaf("nope"), Err(BuildError::UnknownLeaf(_))));
        assert!(matches!(program.leaf(7usize), Err(BuildError::UnknownLeaf(_))));
        assert!(program.leaf("csv").is_ok());
        assert_eq!(program.leaf(3usize).unwrap().label, "bob");
    }

    #[test]
    fn custom_leaf_kept_verbatim() {
        // contains an opcode unknown to the compiler (OP_CAT, 0x7e)
        let raw = tbc::ScriptBytes::try_from(vec![0x7eu8, 0x87]).unwrap();
        let program = TapTree::with(alice().to_internal_pk(), Network::Testnet)
            .custom(raw.clone(), "cat")
            .build()
            .unwrap();
        assert_eq!(program.leaf("cat").unwrap().script.as_slice(), raw.as_slice());
    }

    #[test]
    fn multisig_pubkey_order_matches_declaration() {
        let program = four_leaf_program();
        let leaf = program.leaf("2of2").unwrap();
        let keys = leaf.script.xonly_pubkeys();
        assert_eq!(keys, vec![alice().x_only(), bob().x_only()]);
    }
}
