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

use tbc::{
    Address, AuxRand, ConsensusEncode, LockTime, Outpoint, PrevoutMismatch, PrivKey, Sats, SeqNo,
    SigScript, SighashCache, SighashError, Tx, TxIn, TxOut, TxVer, Txid, VarIntArray, Witness,
};

use crate::{LeafDescriptor, LeafKind, TaprootProgram};

/// Errors assembling a spending transaction.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum SpendError {
    /// no UTXO specified; add at least one input with `from_utxo`.
    NoUtxo,

    /// no outputs specified; add at least one destination with `to`.
    NoOutputs,

    /// hash lock spending requires the preimage; provide it with
    /// `unlock_preimage`.
    MissingPreimage,

    /// no signing key matching the leaf (or the internal key for a key-path
    /// spend) was provided.
    MissingSigner,

    /// multisig leaf requires {required} signatures, but only {provided}
    /// matching keys were given.
    InsufficientSigners { required: u8, provided: usize },

    /// custom script leaves require an explicit witness stack; provide it
    /// with `unlock_with`.
    CustomWitnessRequired,

    /// inputs ({input} sats) do not cover the outputs ({output} sats).
    InsufficientFunds { input: Sats, output: Sats },

    #[from]
    #[display(inner)]
    PrevoutMismatch(PrevoutMismatch),

    #[from]
    #[display(inner)]
    Sighash(SighashError),
}

/// Fluent builder assembling a transaction spending a [`TaprootProgram`]
/// output.
///
/// Obtained from [`TaprootProgram::spend`] (script path) or
/// [`TaprootProgram::keypath`]. All setters take and return the builder by
/// value; the underlying program is never mutated.
///
/// The default `nSequence` policy: CSV timelock leaves get the sequence
/// committed in the leaf (so the relative lock is satisfied); everything
/// else gets `0xFFFFFFFD`, keeping replace-by-fee enabled. An explicit
/// [`SpendBuilder::sequence`] override wins.
#[derive(Clone, Debug)]
pub struct SpendBuilder<'prog> {
    program: &'prog TaprootProgram,
    leaf: Option<&'prog LeafDescriptor>,
    utxos: Vec<(Outpoint, Sats)>,
    outputs: Vec<(Address, Sats)>,
    sequence: Option<SeqNo>,
    preimage: Option<Vec<u8>>,
    signers: Vec<PrivKey>,
    custom_witness: Option<Vec<Vec<u8>>>,
    aux_rand: AuxRand,
}

impl<'prog> SpendBuilder<'prog> {
    pub(crate) fn script_path(
        program: &'prog TaprootProgram,
        leaf: &'prog LeafDescriptor,
    ) -> Self {
        Self::new(program, Some(leaf))
    }

    pub(crate) fn key_path(program: &'prog TaprootProgram) -> Self { Self::new(program, None) }

    fn new(program: &'prog TaprootProgram, leaf: Option<&'prog LeafDescriptor>) -> Self {
        SpendBuilder {
            program,
            leaf,
            utxos: vec![],
            outputs: vec![],
            sequence: None,
            preimage: None,
            signers: vec![],
            custom_witness: None,
            aux_rand: AuxRand::Zero,
        }
    }

    /// Adds a single input UTXO belonging to the program address.
    #[must_use]
    pub fn from_utxo(mut self, outpoint: Outpoint, amount: impl Into<Sats>) -> Self {
        self.utxos.push((outpoint, amount.into()));
        self
    }

    /// Adds multiple input UTXOs belonging to the program address.
    #[must_use]
    pub fn from_utxos(
        mut self,
        utxos: impl IntoIterator<Item = (Outpoint, Sats)>,
    ) -> Self {
        self.utxos.extend(utxos);
        self
    }

    /// Adds a destination output.
    #[must_use]
    pub fn to(mut self, address: Address, amount: impl Into<Sats>) -> Self {
        self.outputs.push((address, amount.into()));
        self
    }

    /// Overrides the default `nSequence` policy for all inputs.
    #[must_use]
    pub fn sequence(mut self, sequence: SeqNo) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Provides the hash lock preimage.
    #[must_use]
    pub fn unlock_preimage(mut self, preimage: impl AsRef<[u8]>) -> Self {
        self.preimage = Some(preimage.as_ref().to_vec());
        self
    }

    /// Adds a signing key. May be called multiple times; for multisig leaves
    /// the order of calls does not matter.
    #[must_use]
    pub fn sign(mut self, key: &PrivKey) -> Self {
        self.signers.push(key.clone());
        self
    }

    /// Provides a raw witness stack for a custom script leaf (the script and
    /// control block are appended automatically).
    #[must_use]
    pub fn unlock_with(mut self, witness_elements: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.custom_witness = Some(witness_elements.into_iter().collect());
        self
    }

    /// Selects the auxiliary randomness mode used for BIP-340 signing.
    #[must_use]
    pub fn aux_rand(mut self, aux_rand: AuxRand) -> Self {
        self.aux_rand = aux_rand;
        self
    }

    #[inline]
    pub fn program(&self) -> &TaprootProgram { self.program }

    /// The leaf this builder spends through; `None` for key-path spends.
    #[inline]
    pub fn leaf(&self) -> Option<&LeafDescriptor> { self.leaf }

    #[inline]
    pub fn utxos(&self) -> &[(Outpoint, Sats)] { &self.utxos }

    /// The effective `nSequence` all inputs will carry.
    pub fn effective_sequence(&self) -> SeqNo {
        if let Some(sequence) = self.sequence {
            return sequence;
        }
        self.leaf.map(LeafDescriptor::default_sequence).unwrap_or(SeqNo::RBF)
    }

    /// Previous outputs being spent, in input order.
    pub fn prevouts(&self) -> Vec<TxOut> {
        let script_pubkey = self.program.script_pubkey();
        self.utxos
            .iter()
            .map(|(_, amount)| TxOut {
                value: *amount,
                script_pubkey: script_pubkey.clone(),
            })
            .collect()
    }

    /// Constructs the unsigned transaction skeleton: all inputs with the
    /// effective sequence and empty witnesses, all outputs resolved into
    /// scriptPubkeys.
    pub fn unsigned_tx(&self) -> Result<Tx, SpendError> {
        if self.utxos.is_empty() {
            return Err(SpendError::NoUtxo);
        }
        if self.outputs.is_empty() {
            return Err(SpendError::NoOutputs);
        }
        let input_total = self.utxos.iter().map(|(_, amount)| *amount).sum::<Sats>();
        let output_total = self.outputs.iter().map(|(_, amount)| *amount).sum::<Sats>();
        if input_total < output_total {
            return Err(SpendError::InsufficientFunds {
                input: input_total,
                output: output_total,
            });
        }

        let sequence = self.effective_sequence();
        let inputs = self.utxos.iter().map(|(outpoint, _)| TxIn {
            prev_output: *outpoint,
            sig_script: SigScript::empty(),
            sequence,
            witness: none!(),
        });
        let outputs = self.outputs.iter().map(|(address, amount)| TxOut {
            value: *amount,
            script_pubkey: address.script_pubkey(),
        });

        Ok(Tx {
            version: TxVer::V2,
            inputs: VarIntArray::from_iter_checked(inputs),
            outputs: VarIntArray::from_iter_checked(outputs),
            lock_time: LockTime::ZERO,
        })
    }

    /// Signs and assembles the final transaction.
    pub fn build(self) -> Result<Spend, SpendError> {
        let mut tx = self.unsigned_tx()?;
        let mut cache = SighashCache::new(tx.clone(), self.prevouts())?;

        let mut witnesses = Vec::with_capacity(self.utxos.len());
        for input_index in 0..self.utxos.len() {
            let stack = match self.leaf {
                None => self.key_path_witness(&mut cache, input_index)?,
                Some(leaf) => self.script_path_witness(&mut cache, leaf, input_index)?,
            };
            witnesses.push(Witness::from_consensus_stack(stack));
        }
        for (input, witness) in tx.inputs.iter_mut().zip(witnesses) {
            input.witness = witness;
        }

        let input_total = self.utxos.iter().map(|(_, amount)| *amount).sum::<Sats>();
        let output_total = self.outputs.iter().map(|(_, amount)| *amount).sum::<Sats>();
        Ok(Spend {
            tx,
            input: input_total,
            output: output_total,
        })
    }

    fn key_path_witness(
        &self,
        cache: &mut SighashCache,
        input_index: usize,
    ) -> Result<Vec<Vec<u8>>, SpendError> {
        let internal_key = self.program.internal_key().to_xonly_pk();
        let signer = self
            .signers
            .iter()
            .find(|key| key.x_only() == internal_key)
            .ok_or(SpendError::MissingSigner)?;
        let sighash = cache.tap_sighash_key(input_index, None)?;
        let sig =
            signer.sign_schnorr_tweaked(sighash, self.program.merkle_root(), self.aux_rand);
        Ok(vec![sig.serialize().to_vec()])
    }

    fn script_path_witness(
        &self,
        cache: &mut SighashCache,
        leaf: &LeafDescriptor,
        input_index: usize,
    ) -> Result<Vec<Vec<u8>>, SpendError> {
        let mut stack: Vec<Vec<u8>> = match &leaf.kind {
            LeafKind::Hashlock { .. } => {
                let preimage = self.preimage.clone().ok_or(SpendError::MissingPreimage)?;
                vec![preimage]
            }
            LeafKind::Checksig { pubkey } | LeafKind::CsvTimelock { pubkey, .. } => {
                let signer = self
                    .signers
                    .iter()
                    .find(|key| key.x_only() == *pubkey)
                    .ok_or(SpendError::MissingSigner)?;
                let sighash = cache.tap_sighash_script(input_index, leaf.leaf_hash, None)?;
                vec![signer.sign_schnorr(sighash, self.aux_rand).serialize().to_vec()]
            }
            LeafKind::Multisig { threshold, pubkeys } => {
                let sighash = cache.tap_sighash_script(input_index, leaf.leaf_hash, None)?;
                // CHECKSIGADD consumes signatures LIFO: the last declared
                // key's signature goes to the stack bottom; absent signers
                // are skipped
                let mut sigs = Vec::with_capacity(pubkeys.len());
                for pubkey in pubkeys.iter().rev() {
                    if let Some(signer) =
                        self.signers.iter().find(|key| key.x_only() == *pubkey)
                    {
                        sigs.push(
                            signer.sign_schnorr(sighash, self.aux_rand).serialize().to_vec(),
                        );
                    }
                }
                if sigs.len() < *threshold as usize {
                    return Err(SpendError::InsufficientSigners {
                        required: *threshold,
                        provided: sigs.len(),
                    });
                }
                sigs
            }
            LeafKind::Custom { .. } => {
                self.custom_witness.clone().ok_or(SpendError::CustomWitnessRequired)?
            }
        };

        stack.push(leaf.script.to_vec());
        let control_block = self
            .program
            .control_block(leaf.index)
            .expect("leaf taken from this program");
        stack.push(control_block.consensus_serialize());
        Ok(stack)
    }
}

/// A fully signed spend: the transaction together with its fee accounting.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Spend {
    /// The signed transaction, ready for broadcast.
    pub tx: Tx,
    input: Sats,
    output: Sats,
}

impl Spend {
    #[inline]
    pub fn txid(&self) -> Txid { self.tx.txid() }

    /// Fee paid: input total minus output total.
    #[inline]
    pub fn fee(&self) -> Sats { self.input.saturating_sub(self.output) }

    /// Full serialized size in bytes.
    #[inline]
    pub fn size(&self) -> usize { self.tx.consensus_serialize().len() }

    /// Raw transaction hex for broadcasting.
    #[inline]
    pub fn to_hex(&self) -> String { self.tx.to_string() }
}
