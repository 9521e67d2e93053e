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
use taptree::{SpendBuilder, SpendError};
use tbc::{
    AuxRand, Bip340Sig, ConsensusEncode, LeafScript, PrevoutMismatch, PrivKey, SighashCache,
    SighashError, TapScript, Tx, TxOut, Witness,
};

use crate::{Input, Psbt, PsbtV2};

/// Errors of the PSBT signing, finalization and extraction workflow.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum SignError {
    /// input {0} does not exist in the PSBT.
    InvalidInputIndex(usize),

    /// input {0} lacks the witness UTXO required for computing the taproot
    /// sighash.
    MissingWitnessUtxo(usize),

    /// input {0} lacks the taproot internal key required for a key-path
    /// signature.
    MissingInternalKey(usize),

    /// the signing key does not match the taproot internal key of input {0}.
    KeyMismatch(usize),

    /// input {0} carries neither a key-path signature nor a leaf script with
    /// a complete signature set, and cannot be finalized.
    CannotFinalize(usize),

    /// input {0} is not finalized yet; the transaction cannot be extracted.
    NotFinalized(usize),

    /// the v2 PSBT misses transaction structure fields for input or output
    /// maps and no transaction can be built from it.
    IncompleteTx,

    #[from]
    #[display(inner)]
    PrevoutMismatch(PrevoutMismatch),

    #[from]
    #[display(inner)]
    Sighash(SighashError),
}

fn prevouts(inputs: &[Input]) -> Result<Vec<TxOut>, SignError> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            input.witness_utxo.clone().ok_or(SignError::MissingWitnessUtxo(index))
        })
        .collect()
}

/// Signs one input of an unsigned transaction, storing the produced
/// signature in its PSBT input map.
///
/// Script-path inputs (carrying a leaf script) are signed with the untweaked
/// key; key-path inputs with the key tweaked by the internal key and Merkle
/// root fields. Re-signing with the same key replaces the stored signature
/// with an identical one.
fn sign_input(
    tx: &Tx,
    inputs: &mut [Input],
    input_index: usize,
    key: &PrivKey,
    aux_rand: AuxRand,
) -> Result<(), SignError> {
    if input_index >= inputs.len() {
        return Err(SignError::InvalidInputIndex(input_index));
    }
    let mut cache = SighashCache::new(tx, prevouts(inputs)?)?;
    let input = &mut inputs[input_index];

    if let Some(leaf_hash) = input.tap_leaf_hash() {
        let sighash = cache.tap_sighash_script(input_index, leaf_hash, None)?;
        let sig = key.sign_schnorr(sighash, aux_rand);
        input
            .tap_script_sigs
            .insert((key.x_only(), leaf_hash), Bip340Sig::sighash_default(sig));
    } else {
        let internal_key = input
            .tap_internal_key
            .ok_or(SignError::MissingInternalKey(input_index))?;
        if internal_key.to_xonly_pk() != key.x_only() {
            return Err(SignError::KeyMismatch(input_index));
        }
        let sighash = cache.tap_sighash_key(input_index, None)?;
        let sig = key.sign_schnorr_tweaked(sighash, input.tap_merkle_root, aux_rand);
        input.tap_key_sig = Some(Bip340Sig::sighash_default(sig));
    }
    Ok(())
}

/// Builds the final witness stack for an input, per its unlock data.
///
/// A key-path signature wins over script-path data. For script paths the
/// signatures matching the committed leaf are ordered by scanning the
/// tapscript x-only keys and reversing them, following the LIFO order in
/// which `OP_CHECKSIGADD` consumes signatures; the leaf script and control
/// block complete the stack.
fn finalize_input(input: &mut Input, input_index: usize) -> Result<(), SignError> {
    if input.is_finalized() {
        return Ok(());
    }
    if let Some(sig) = &input.tap_key_sig {
        input.final_script_witness = Some(Witness::from_consensus_stack([sig.to_vec()]));
        return Ok(());
    }

    let Some((control_block, leaf_script)) = &input.tap_leaf_script else {
        return Err(SignError::CannotFinalize(input_index));
    };
    let leaf_hash = leaf_script.tap_leaf_hash();
    let tap_script = TapScript::from_inner(leaf_script.script.clone());

    let mut sigs = Vec::new();
    let pubkey_order = tap_script.xonly_pubkeys();
    if pubkey_order.is_empty() {
        // no recognizable key pushes (e.g. a hash lock carried by other
        // software): take signatures in map order
        sigs.extend(
            input
                .tap_script_sigs
                .iter()
                .filter(|((_, hash), _)| *hash == leaf_hash)
                .map(|(_, sig)| sig.to_vec()),
        );
    } else {
        for pubkey in pubkey_order.iter().rev() {
            if let Some(sig) = input.tap_script_sigs.get(&(*pubkey, leaf_hash)) {
                sigs.push(sig.to_vec());
            }
        }
    }
    if sigs.is_empty() {
        return Err(SignError::CannotFinalize(input_index));
    }

    let mut stack = sigs;
    stack.push(leaf_script.script.to_vec());
    stack.push(control_block.consensus_serialize());
    input.final_script_witness = Some(Witness::from_consensus_stack(stack));
    Ok(())
}

impl Psbt {
    /// Signs the given input with the key, storing the signature in the
    /// input map. Uses deterministic (zero) auxiliary randomness; see
    /// [`Psbt::sign_with_aux`] for other modes.
    pub fn sign_with(&mut self, key: &PrivKey, input_index: usize) -> Result<(), SignError> {
        self.sign_with_aux(key, input_index, AuxRand::Zero)
    }

    pub fn sign_with_aux(
        &mut self,
        key: &PrivKey,
        input_index: usize,
        aux_rand: AuxRand,
    ) -> Result<(), SignError> {
        let tx = self.tx.clone();
        sign_input(&tx, &mut self.inputs, input_index, key, aux_rand)
    }

    /// Finalizes every input into its witness stack.
    pub fn finalize(&mut self) -> Result<(), SignError> {
        for (input_index, input) in self.inputs.iter_mut().enumerate() {
            finalize_input(input, input_index)?;
        }
        Ok(())
    }

    /// Returns the fully signed transaction assembled from the unsigned
    /// transaction and the finalized witnesses.
    pub fn extract_transaction(&self) -> Result<Tx, SignError> {
        let mut tx = self.tx.clone();
        for (input_index, (txin, input)) in
            tx.inputs.iter_mut().zip(&self.inputs).enumerate()
        {
            txin.witness = input
                .final_script_witness
                .clone()
                .ok_or(SignError::NotFinalized(input_index))?;
        }
        Ok(tx)
    }
}

impl PsbtV2 {
    /// Signs the given input with the key, storing the signature in the
    /// input map. Uses deterministic (zero) auxiliary randomness.
    pub fn sign_with(&mut self, key: &PrivKey, input_index: usize) -> Result<(), SignError> {
        self.sign_with_aux(key, input_index, AuxRand::Zero)
    }

    pub fn sign_with_aux(
        &mut self,
        key: &PrivKey,
        input_index: usize,
        aux_rand: AuxRand,
    ) -> Result<(), SignError> {
        let tx = self.unsigned_tx().ok_or(SignError::IncompleteTx)?;
        sign_input(&tx, &mut self.inputs, input_index, key, aux_rand)
    }

    /// Finalizes every input into its witness stack.
    pub fn finalize(&mut self) -> Result<(), SignError> {
        for (input_index, input) in self.inputs.iter_mut().enumerate() {
            finalize_input(input, input_index)?;
        }
        Ok(())
    }

    /// Assembles the final transaction from the per-input and per-output
    /// maps and the finalized witnesses.
    pub fn extract_transaction(&self) -> Result<Tx, SignError> {
        let mut tx = self.unsigned_tx().ok_or(SignError::IncompleteTx)?;
        for (input_index, (txin, input)) in
            tx.inputs.iter_mut().zip(&self.inputs).enumerate()
        {
            txin.witness = input
                .final_script_witness
                .clone()
                .ok_or(SignError::NotFinalized(input_index))?;
        }
        Ok(tx)
    }
}

/// Bridges the fluent spend builder into the PSBT workflow: instead of
/// signing directly, the declared spend is exported as a PSBT which can be
/// serialized, co-signed by other parties, finalized and extracted.
pub trait ToPsbt {
    /// Produces an unsigned v0 PSBT for the declared spend.
    fn to_psbt(&self) -> Result<Psbt, SpendError>;

    /// Produces an unsigned v2 (BIP-370) PSBT for the declared spend.
    fn to_psbt_v2(&self) -> Result<PsbtV2, SpendError> {
        self.to_psbt().map(|psbt| psbt.to_v2())
    }
}

impl ToPsbt for SpendBuilder<'_> {
    fn to_psbt(&self) -> Result<Psbt, SpendError> {
        let program = self.program();
        let tx = self.unsigned_tx()?;
        let mut psbt = Psbt::with_unsigned_tx(tx);

        let script_pubkey = program.script_pubkey();
        for (input, (_, amount)) in psbt.inputs.iter_mut().zip(self.utxos()) {
            input.witness_utxo = Some(TxOut {
                value: *amount,
                script_pubkey: script_pubkey.clone(),
            });
            input.tap_internal_key = Some(program.internal_key());
            input.tap_merkle_root = program.merkle_root();
            if let Some(leaf) = self.leaf() {
                let control_block = program
                    .control_block(leaf.index)
                    .expect("leaf taken from this program");
                let leaf_script = LeafScript::from(leaf.script.clone());
                input.tap_leaf_script = Some((control_block, leaf_script));
            }
        }
        Ok(psbt)
    }
}
