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

use std::collections::BTreeMap;

use tbc::{
    Bip340Sig, ByteStr, ControlBlock, InternalPk, LeafScript, LockTime, Outpoint, Sats,
    ScriptPubkey, SeqNo, SigScript, TapLeafHash, TapNodeHash, Tx, TxIn, TxOut, TxVer, Txid,
    VarIntArray, Vout, Witness, XOnlyPk,
};

/// A key preserved verbatim from a PSBT produced by other software: the
/// compact-size key type together with its key data.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[display("{key_type:#x}")]
pub struct UnknownKey {
    pub key_type: u64,
    pub data: ByteStr,
}

pub(crate) type UnknownMap = BTreeMap<UnknownKey, ByteStr>;

/// Per-input PSBT map.
///
/// A single type serves both PSBT versions: the BIP-370 proto-transaction
/// fields are `None` inside v0 containers (where the global unsigned
/// transaction carries them) and set inside v2 ones.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Input {
    /// Previous transaction id (v2).
    pub previous_txid: Option<Txid>,
    /// Spent output index (v2).
    pub output_index: Option<Vout>,
    /// Input sequence number (v2).
    pub sequence: Option<SeqNo>,

    /// The output being spent by this input.
    pub witness_utxo: Option<TxOut>,
    /// Taproot key-path signature.
    pub tap_key_sig: Option<Bip340Sig>,
    /// Taproot script-path signatures, keyed by the signing key and the
    /// signed leaf.
    pub tap_script_sigs: BTreeMap<(XOnlyPk, TapLeafHash), Bip340Sig>,
    /// The leaf being spent through, with its control block.
    pub tap_leaf_script: Option<(ControlBlock, LeafScript)>,
    /// Taproot internal key of the spent output.
    pub tap_internal_key: Option<InternalPk>,
    /// Merkle root of the script tree of the spent output.
    pub tap_merkle_root: Option<TapNodeHash>,
    /// Finalized witness stack.
    pub final_script_witness: Option<Witness>,

    /// Unrecognized keys, preserved for round-tripping.
    pub unknown: UnknownMap,
}

impl Input {
    /// Hash of the leaf committed under [`Input::tap_leaf_script`].
    pub fn tap_leaf_hash(&self) -> Option<TapLeafHash> {
        self.tap_leaf_script.as_ref().map(|(_, leaf_script)| leaf_script.tap_leaf_hash())
    }

    /// Whether the input already carries a finalized witness.
    #[inline]
    pub fn is_finalized(&self) -> bool { self.final_script_witness.is_some() }
}

/// Per-output PSBT map. Empty in v0 (the unsigned transaction carries the
/// outputs); v2 moves amount and script here.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Output {
    /// Output amount (v2).
    pub amount: Option<Sats>,
    /// Output scriptPubkey (v2).
    pub script: Option<ScriptPubkey>,

    /// Unrecognized keys, preserved for round-tripping.
    pub unknown: UnknownMap,
}

/// PSBT version 0 (BIP-174): a global unsigned transaction plus per-input
/// and per-output key-value maps.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Psbt {
    /// The unsigned transaction; inputs carry no scriptSig or witness data.
    pub tx: Tx,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Unrecognized global keys, preserved for round-tripping.
    pub unknown: UnknownMap,
}

impl Psbt {
    /// Wraps an unsigned transaction into an empty PSBT, with one input and
    /// output map per transaction input and output.
    pub fn with_unsigned_tx(tx: Tx) -> Psbt {
        let tx = tx.to_unsigned_tx();
        let inputs = vec![Input::default(); tx.inputs.len()];
        let outputs = vec![Output::default(); tx.outputs.len()];
        Psbt {
            tx,
            inputs,
            outputs,
            unknown: none!(),
        }
    }

    /// Fee paid by the transaction; `None` until every input carries its
    /// witness UTXO.
    pub fn fee(&self) -> Option<Sats> {
        let mut input = Sats::ZERO;
        for map in &self.inputs {
            input = input.saturating_add(map.witness_utxo.as_ref()?.value);
        }
        let output = self.tx.outputs().map(|txout| txout.value).sum::<Sats>();
        input.checked_sub(output)
    }

    /// Converts into a BIP-370 v2 PSBT, moving the transaction structure
    /// into the per-input and per-output maps.
    pub fn to_v2(&self) -> PsbtV2 {
        let inputs = self
            .tx
            .inputs()
            .zip(&self.inputs)
            .map(|(txin, map)| {
                let mut map = map.clone();
                map.previous_txid = Some(txin.prev_output.txid);
                map.output_index = Some(txin.prev_output.vout);
                map.sequence = Some(txin.sequence);
                map
            })
            .collect();
        let outputs = self
            .tx
            .outputs()
            .zip(&self.outputs)
            .map(|(txout, map)| {
                let mut map = map.clone();
                map.amount = Some(txout.value);
                map.script = Some(txout.script_pubkey.clone());
                map
            })
            .collect();
        PsbtV2 {
            tx_version: self.tx.version,
            fallback_locktime: self.tx.lock_time,
            inputs,
            outputs,
            unknown: self.unknown.clone(),
        }
    }
}

/// PSBT version 2 (BIP-370): no global unsigned transaction; the
/// proto-transaction lives in the global version and locktime fields plus
/// the per-input and per-output maps.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PsbtV2 {
    pub tx_version: TxVer,
    pub fallback_locktime: LockTime,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Unrecognized global keys, preserved for round-tripping.
    pub unknown: UnknownMap,
}

impl Default for PsbtV2 {
    fn default() -> Self {
        PsbtV2 {
            tx_version: TxVer::V2,
            fallback_locktime: LockTime::ZERO,
            inputs: vec![],
            outputs: vec![],
            unknown: none!(),
        }
    }
}

impl PsbtV2 {
    /// Assembles the unsigned transaction from the maps.
    ///
    /// Returns `None` when some input lacks its previous txid or output
    /// index (a v2 PSBT under construction).
    pub fn unsigned_tx(&self) -> Option<Tx> {
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for map in &self.inputs {
            inputs.push(TxIn {
                prev_output: Outpoint::new(map.previous_txid?, map.output_index?),
                sig_script: SigScript::empty(),
                sequence: map.sequence.unwrap_or(SeqNo::FINAL),
                witness: none!(),
            });
        }
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for map in &self.outputs {
            outputs.push(TxOut {
                value: map.amount?,
                script_pubkey: map.script.clone()?,
            });
        }
        Some(Tx {
            version: self.tx_version,
            inputs: VarIntArray::from_checked(inputs),
            outputs: VarIntArray::from_checked(outputs),
            lock_time: self.fallback_locktime,
        })
    }

    /// Fee paid by the transaction; `None` until every input carries its
    /// witness UTXO and every output its amount.
    pub fn fee(&self) -> Option<Sats> {
        let mut input = Sats::ZERO;
        for map in &self.inputs {
            input = input.saturating_add(map.witness_utxo.as_ref()?.value);
        }
        let mut output = Sats::ZERO;
        for map in &self.outputs {
            output = output.saturating_add(map.amount?);
        }
        input.checked_sub(output)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use amplify::hex::FromHex;

    use super::*;

    fn unsigned_tx() -> Tx {
        let dest = ScriptPubkey::try_from(
            Vec::<u8>::from_hex("00141ea904f64271d351dceda1622de9c321b1cb73e4").unwrap(),
        )
        .unwrap();
        Tx {
            version: TxVer::V2,
            inputs: VarIntArray::from_checked(vec![TxIn {
                prev_output: Outpoint::from_str(
                    "1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1",
                )
                .unwrap(),
                sig_script: SigScript::empty(),
                sequence: SeqNo::RBF,
                witness: none!(),
            }]),
            outputs: VarIntArray::from_checked(vec![TxOut {
                value: Sats(2500),
                script_pubkey: dest,
            }]),
            lock_time: LockTime::ZERO,
        }
    }

    #[test]
    fn map_counts_follow_tx() {
        let psbt = Psbt::with_unsigned_tx(unsigned_tx());
        assert_eq!(psbt.inputs.len(), 1);
        assert_eq!(psbt.outputs.len(), 1);
    }

    #[test]
    fn fee_requires_witness_utxos() {
        let mut psbt = Psbt::with_unsigned_tx(unsigned_tx());
        assert_eq!(psbt.fee(), None);
        psbt.inputs[0].witness_utxo = Some(TxOut {
            value: Sats(3000),
            script_pubkey: ScriptPubkey::new(),
        });
        assert_eq!(psbt.fee(), Some(Sats(500)));
    }

    #[test]
    fn v2_conversion_moves_tx_structure() {
        let mut psbt = Psbt::with_unsigned_tx(unsigned_tx());
        psbt.inputs[0].witness_utxo = Some(TxOut {
            value: Sats(3000),
            script_pubkey: ScriptPubkey::new(),
        });
        let v2 = psbt.to_v2();
        assert_eq!(v2.tx_version, TxVer::V2);
        assert_eq!(v2.inputs[0].sequence, Some(SeqNo::RBF));
        assert_eq!(v2.outputs[0].amount, Some(Sats(2500)));
        assert_eq!(v2.fee(), Some(Sats(500)));
        assert_eq!(v2.unsigned_tx().unwrap().txid(), psbt.tx.txid());
    }
}
