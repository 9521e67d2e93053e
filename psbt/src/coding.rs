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

use std::fmt::{self, Display, Formatter};
use std::io::{Cursor, Read};
use std::str::FromStr;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use tbc::{
    Bip340Sig, ByteStr, ConsensusDecode, ConsensusEncode, ControlBlock, InternalPk, LeafScript,
    LeafVer, LockTime, Sats, ScriptPubkey, SeqNo, TapLeafHash, TapNodeHash, Tx, TxOut, TxVer,
    Txid, VarInt, Vout, Witness, XOnlyPk,
};

use crate::keys::*;
use crate::maps::UnknownMap;
use crate::{Input, Output, Psbt, PsbtV2, UnknownKey};

/// PSBT binary parsing failure.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum CodecError {
    /// PSBT data do not start with the `psbt 0xFF` magic bytes.
    BadMagic,

    /// PSBT data end in the middle of a map structure.
    Truncated,

    /// malformed compact-size integer inside PSBT data.
    BadVarint,

    /// key of type {key_type:#04x} carries {len} bytes of unexpected key
    /// data.
    BadKeyType { key_type: u64, len: usize },

    /// value of the key type {0:#04x} is malformed.
    BadValue(u64),

    /// {field} is repeated in the {scope} map.
    RepeatedField {
        scope: &'static str,
        field: &'static str,
    },

    /// required {field} is missing in the {scope} map.
    MissingField {
        scope: &'static str,
        field: &'static str,
    },
}

/// Failure parsing the base64 PSBT text form.
#[derive(Clone, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum PsbtParseError {
    /// incorrect base64 encoding: {0}
    #[from]
    Base64(base64::DecodeError),

    #[from]
    #[display(inner)]
    Codec(CodecError),
}

// Consensus decoding errors surface as either truncation or a malformed
// varint; finer details do not survive the PSBT framing anyway.
fn data_err(err: tbc::ConsensusDecodeError) -> CodecError {
    match err {
        tbc::ConsensusDecodeError::Data(tbc::ConsensusDataError::NonMinimalVarInt) => {
            CodecError::BadVarint
        }
        _ => CodecError::Truncated,
    }
}

/// One raw key-value pair of a PSBT map.
struct KeyValue {
    key_type: u64,
    key_data: Vec<u8>,
    value: Vec<u8>,
}

/// Reads pairs until the `0x00` map separator; `None` is the separator.
fn read_pair(cursor: &mut Cursor<&[u8]>) -> Result<Option<KeyValue>, CodecError> {
    let key_len = VarInt::consensus_decode(cursor).map_err(data_err)?.into_usize();
    if key_len == 0 {
        return Ok(None);
    }
    let mut key = vec![0u8; key_len];
    cursor.read_exact(&mut key).map_err(|_| CodecError::Truncated)?;
    let mut key_cursor = Cursor::new(key.as_slice());
    let key_type = VarInt::consensus_decode(&mut key_cursor).map_err(data_err)?.into_u64();
    let key_data = key[key_cursor.position() as usize..].to_vec();

    let value_len = VarInt::consensus_decode(cursor).map_err(data_err)?.into_usize();
    let mut value = vec![0u8; value_len];
    cursor.read_exact(&mut value).map_err(|_| CodecError::Truncated)?;

    Ok(Some(KeyValue {
        key_type,
        key_data,
        value,
    }))
}

fn write_pair(buf: &mut Vec<u8>, key_type: u64, key_data: &[u8], value: &[u8]) {
    let mut key = Vec::with_capacity(key_data.len() + 9);
    VarInt::new(key_type).consensus_encode(&mut key).expect("in-memory writing");
    key.extend_from_slice(key_data);
    VarInt::with(key.len()).consensus_encode(buf).expect("in-memory writing");
    buf.extend_from_slice(&key);
    VarInt::with(value.len()).consensus_encode(buf).expect("in-memory writing");
    buf.extend_from_slice(value);
}

fn expect_no_key_data(pair: &KeyValue) -> Result<(), CodecError> {
    if !pair.key_data.is_empty() {
        return Err(CodecError::BadKeyType {
            key_type: pair.key_type,
            len: pair.key_data.len(),
        });
    }
    Ok(())
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: T,
    scope: &'static str,
    field: &'static str,
) -> Result<(), CodecError> {
    if slot.replace(value).is_some() {
        return Err(CodecError::RepeatedField { scope, field });
    }
    Ok(())
}

fn decode_value<T: ConsensusDecode>(pair: &KeyValue) -> Result<T, CodecError> {
    T::consensus_deserialize(&pair.value).map_err(|_| CodecError::BadValue(pair.key_type))
}

impl Input {
    fn parse_pair(&mut self, pair: KeyValue) -> Result<(), CodecError> {
        const SCOPE: &str = "input";
        match pair.key_type {
            PSBT_IN_WITNESS_UTXO => {
                expect_no_key_data(&pair)?;
                let utxo: TxOut = decode_value(&pair)?;
                set_once(&mut self.witness_utxo, utxo, SCOPE, "PSBT_IN_WITNESS_UTXO")?;
            }
            PSBT_IN_FINAL_SCRIPTWITNESS => {
                expect_no_key_data(&pair)?;
                let witness: Witness = decode_value(&pair)?;
                set_once(
                    &mut self.final_script_witness,
                    witness,
                    SCOPE,
                    "PSBT_IN_FINAL_SCRIPTWITNESS",
                )?;
            }
            PSBT_IN_PREVIOUS_TXID => {
                expect_no_key_data(&pair)?;
                let txid: Txid = decode_value(&pair)?;
                set_once(&mut self.previous_txid, txid, SCOPE, "PSBT_IN_PREVIOUS_TXID")?;
            }
            PSBT_IN_OUTPUT_INDEX => {
                expect_no_key_data(&pair)?;
                let vout = Vout::from_u32(decode_value(&pair)?);
                set_once(&mut self.output_index, vout, SCOPE, "PSBT_IN_OUTPUT_INDEX")?;
            }
            PSBT_IN_SEQUENCE => {
                expect_no_key_data(&pair)?;
                let seq = SeqNo::from_consensus_u32(decode_value(&pair)?);
                set_once(&mut self.sequence, seq, SCOPE, "PSBT_IN_SEQUENCE")?;
            }
            PSBT_IN_TAP_KEY_SIG => {
                expect_no_key_data(&pair)?;
                let sig = Bip340Sig::from_bytes(&pair.value)
                    .map_err(|_| CodecError::BadValue(pair.key_type))?;
                set_once(&mut self.tap_key_sig, sig, SCOPE, "PSBT_IN_TAP_KEY_SIG")?;
            }
            PSBT_IN_TAP_SCRIPT_SIG => {
                if pair.key_data.len() != 64 {
                    return Err(CodecError::BadKeyType {
                        key_type: pair.key_type,
                        len: pair.key_data.len(),
                    });
                }
                let pk = XOnlyPk::from_bytes(&pair.key_data[..32])
                    .map_err(|_| CodecError::BadValue(pair.key_type))?;
                let leaf_hash = TapLeafHash::from(
                    <[u8; 32]>::try_from(&pair.key_data[32..]).expect("32-byte slice"),
                );
                let sig = Bip340Sig::from_bytes(&pair.value)
                    .map_err(|_| CodecError::BadValue(pair.key_type))?;
                self.tap_script_sigs.insert((pk, leaf_hash), sig);
            }
            PSBT_IN_TAP_LEAF_SCRIPT => {
                let control_block = ControlBlock::consensus_deserialize(&pair.key_data)
                    .map_err(|_| CodecError::BadKeyType {
                        key_type: pair.key_type,
                        len: pair.key_data.len(),
                    })?;
                let mut cursor = Cursor::new(pair.value.as_slice());
                let leaf_ver = u8::consensus_decode(&mut cursor)
                    .map_err(|_| CodecError::BadValue(pair.key_type))?;
                let version = LeafVer::from_consensus_u8(leaf_ver)
                    .map_err(|_| CodecError::BadValue(pair.key_type))?;
                let script_len =
                    VarInt::consensus_decode(&mut cursor).map_err(data_err)?.into_usize();
                let mut script = vec![0u8; script_len];
                cursor.read_exact(&mut script).map_err(|_| CodecError::Truncated)?;
                if cursor.position() as usize != pair.value.len() {
                    return Err(CodecError::BadValue(pair.key_type));
                }
                let leaf_script = LeafScript::with_bytes(version, script)
                    .map_err(|_| CodecError::BadValue(pair.key_type))?;
                set_once(
                    &mut self.tap_leaf_script,
                    (control_block, leaf_script),
                    SCOPE,
                    "PSBT_IN_TAP_LEAF_SCRIPT",
                )?;
            }
            PSBT_IN_TAP_INTERNAL_KEY => {
                expect_no_key_data(&pair)?;
                let pk: InternalPk = decode_value(&pair)?;
                set_once(&mut self.tap_internal_key, pk, SCOPE, "PSBT_IN_TAP_INTERNAL_KEY")?;
            }
            PSBT_IN_TAP_MERKLE_ROOT => {
                expect_no_key_data(&pair)?;
                let root = TapNodeHash::from(<[u8; 32]>::consensus_deserialize(&pair.value)
                    .map_err(|_| CodecError::BadValue(pair.key_type))?);
                set_once(&mut self.tap_merkle_root, root, SCOPE, "PSBT_IN_TAP_MERKLE_ROOT")?;
            }
            _ => {
                self.unknown.insert(
                    UnknownKey {
                        key_type: pair.key_type,
                        data: ByteStr::from(pair.key_data),
                    },
                    ByteStr::from(pair.value),
                );
            }
        }
        Ok(())
    }

    fn parse_map(cursor: &mut Cursor<&[u8]>) -> Result<Input, CodecError> {
        let mut input = Input::default();
        while let Some(pair) = read_pair(cursor)? {
            input.parse_pair(pair)?;
        }
        Ok(input)
    }

    fn serialize_map(&self, buf: &mut Vec<u8>) {
        if let Some(utxo) = &self.witness_utxo {
            write_pair(buf, PSBT_IN_WITNESS_UTXO, &[], &utxo.consensus_serialize());
        }
        if let Some(witness) = &self.final_script_witness {
            write_pair(buf, PSBT_IN_FINAL_SCRIPTWITNESS, &[], &witness.consensus_serialize());
        }
        if let Some(txid) = &self.previous_txid {
            write_pair(buf, PSBT_IN_PREVIOUS_TXID, &[], &txid.consensus_serialize());
        }
        if let Some(vout) = &self.output_index {
            write_pair(buf, PSBT_IN_OUTPUT_INDEX, &[], &vout.consensus_serialize());
        }
        if let Some(seq) = &self.sequence {
            write_pair(buf, PSBT_IN_SEQUENCE, &[], &seq.consensus_serialize());
        }
        if let Some(sig) = &self.tap_key_sig {
            write_pair(buf, PSBT_IN_TAP_KEY_SIG, &[], &sig.to_vec());
        }
        for ((pk, leaf_hash), sig) in &self.tap_script_sigs {
            let mut key_data = Vec::with_capacity(64);
            key_data.extend_from_slice(&pk.to_byte_array());
            key_data.extend_from_slice(&leaf_hash.to_byte_array());
            write_pair(buf, PSBT_IN_TAP_SCRIPT_SIG, &key_data, &sig.to_vec());
        }
        if let Some((control_block, leaf_script)) = &self.tap_leaf_script {
            let mut value = vec![leaf_script.version.to_consensus_u8()];
            leaf_script
                .script
                .len_var_int()
                .consensus_encode(&mut value)
                .expect("in-memory writing");
            value.extend_from_slice(leaf_script.script.as_slice());
            write_pair(
                buf,
                PSBT_IN_TAP_LEAF_SCRIPT,
                &control_block.consensus_serialize(),
                &value,
            );
        }
        if let Some(pk) = &self.tap_internal_key {
            write_pair(buf, PSBT_IN_TAP_INTERNAL_KEY, &[], &pk.to_byte_array());
        }
        if let Some(root) = &self.tap_merkle_root {
            write_pair(buf, PSBT_IN_TAP_MERKLE_ROOT, &[], &root.to_byte_array());
        }
        for (key, value) in &self.unknown {
            write_pair(buf, key.key_type, key.data.as_slice(), value.as_slice());
        }
        buf.push(0x00);
    }
}

impl Output {
    fn parse_map(cursor: &mut Cursor<&[u8]>) -> Result<Output, CodecError> {
        const SCOPE: &str = "output";
        let mut output = Output::default();
        while let Some(pair) = read_pair(cursor)? {
            match pair.key_type {
                PSBT_OUT_AMOUNT => {
                    expect_no_key_data(&pair)?;
                    let amount: Sats = decode_value(&pair)?;
                    set_once(&mut output.amount, amount, SCOPE, "PSBT_OUT_AMOUNT")?;
                }
                PSBT_OUT_SCRIPT => {
                    expect_no_key_data(&pair)?;
                    let script = ScriptPubkey::try_from(pair.value)
                        .map_err(|_| CodecError::BadValue(PSBT_OUT_SCRIPT))?;
                    set_once(&mut output.script, script, SCOPE, "PSBT_OUT_SCRIPT")?;
                }
                _ => {
                    output.unknown.insert(
                        UnknownKey {
                            key_type: pair.key_type,
                            data: ByteStr::from(pair.key_data),
                        },
                        ByteStr::from(pair.value),
                    );
                }
            }
        }
        Ok(output)
    }

    fn serialize_map(&self, buf: &mut Vec<u8>) {
        if let Some(amount) = &self.amount {
            write_pair(buf, PSBT_OUT_AMOUNT, &[], &amount.consensus_serialize());
        }
        if let Some(script) = &self.script {
            write_pair(buf, PSBT_OUT_SCRIPT, &[], script.as_slice());
        }
        for (key, value) in &self.unknown {
            write_pair(buf, key.key_type, key.data.as_slice(), value.as_slice());
        }
        buf.push(0x00);
    }
}

fn serialize_unknown(unknown: &UnknownMap, buf: &mut Vec<u8>) {
    for (key, value) in unknown {
        write_pair(buf, key.key_type, key.data.as_slice(), value.as_slice());
    }
}

fn check_magic(cursor: &mut Cursor<&[u8]>) -> Result<(), CodecError> {
    let mut magic = [0u8; 5];
    cursor.read_exact(&mut magic).map_err(|_| CodecError::BadMagic)?;
    if magic != PSBT_MAGIC {
        return Err(CodecError::BadMagic);
    }
    Ok(())
}

impl Psbt {
    /// Parses a v0 PSBT from its binary form.
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Result<Psbt, CodecError> {
        let mut cursor = Cursor::new(data.as_ref());
        check_magic(&mut cursor)?;

        let mut unsigned_tx: Option<Tx> = None;
        let mut unknown = UnknownMap::new();
        while let Some(pair) = read_pair(&mut cursor)? {
            match pair.key_type {
                PSBT_GLOBAL_UNSIGNED_TX => {
                    expect_no_key_data(&pair)?;
                    let tx: Tx = decode_value(&pair)?;
                    set_once(&mut unsigned_tx, tx, "global", "PSBT_GLOBAL_UNSIGNED_TX")?;
                }
                _ => {
                    unknown.insert(
                        UnknownKey {
                            key_type: pair.key_type,
                            data: ByteStr::from(pair.key_data),
                        },
                        ByteStr::from(pair.value),
                    );
                }
            }
        }
        let tx = unsigned_tx.ok_or(CodecError::MissingField {
            scope: "global",
            field: "PSBT_GLOBAL_UNSIGNED_TX",
        })?;

        let mut inputs = Vec::with_capacity(tx.inputs.len());
        for _ in 0..tx.inputs.len() {
            inputs.push(Input::parse_map(&mut cursor)?);
        }
        let mut outputs = Vec::with_capacity(tx.outputs.len());
        for _ in 0..tx.outputs.len() {
            outputs.push(Output::parse_map(&mut cursor)?);
        }

        Ok(Psbt {
            tx,
            inputs,
            outputs,
            unknown,
        })
    }

    /// Serializes the PSBT into its binary v0 form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = PSBT_MAGIC.to_vec();
        write_pair(
            &mut buf,
            PSBT_GLOBAL_UNSIGNED_TX,
            &[],
            &self.tx.consensus_serialize(),
        );
        serialize_unknown(&self.unknown, &mut buf);
        buf.push(0x00);
        for input in &self.inputs {
            input.serialize_map(&mut buf);
        }
        for output in &self.outputs {
            output.serialize_map(&mut buf);
        }
        buf
    }

    /// Decodes the base64 text form.
    pub fn from_base64(text: &str) -> Result<Psbt, PsbtParseError> {
        let data = BASE64_STANDARD.decode(text)?;
        Psbt::from_bytes(data).map_err(PsbtParseError::from)
    }

    /// Encodes into the base64 text form.
    pub fn to_base64(&self) -> String { BASE64_STANDARD.encode(self.to_bytes()) }
}

impl Display for Psbt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.to_base64()) }
}

impl FromStr for Psbt {
    type Err = PsbtParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Psbt::from_base64(s) }
}

impl PsbtV2 {
    /// Parses a v2 PSBT from its binary form.
    ///
    /// The global map must carry exactly one of each of `TX_VERSION`,
    /// `FALLBACK_LOCKTIME`, `INPUT_COUNT` and `OUTPUT_COUNT`, and no
    /// unsigned transaction.
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Result<PsbtV2, CodecError> {
        const SCOPE: &str = "global";
        let mut cursor = Cursor::new(data.as_ref());
        check_magic(&mut cursor)?;

        let mut tx_version: Option<i32> = None;
        let mut fallback_locktime: Option<u32> = None;
        let mut input_count: Option<u64> = None;
        let mut output_count: Option<u64> = None;
        let mut unknown = UnknownMap::new();
        while let Some(pair) = read_pair(&mut cursor)? {
            match pair.key_type {
                PSBT_GLOBAL_UNSIGNED_TX => {
                    return Err(CodecError::BadKeyType {
                        key_type: PSBT_GLOBAL_UNSIGNED_TX,
                        len: pair.key_data.len(),
                    })
                }
                PSBT_GLOBAL_TX_VERSION => {
                    expect_no_key_data(&pair)?;
                    let version: i32 = decode_value(&pair)?;
                    set_once(&mut tx_version, version, SCOPE, "PSBT_GLOBAL_TX_VERSION")?;
                }
                PSBT_GLOBAL_FALLBACK_LOCKTIME => {
                    expect_no_key_data(&pair)?;
                    let locktime: u32 = decode_value(&pair)?;
                    set_once(
                        &mut fallback_locktime,
                        locktime,
                        SCOPE,
                        "PSBT_GLOBAL_FALLBACK_LOCKTIME",
                    )?;
                }
                PSBT_GLOBAL_INPUT_COUNT => {
                    expect_no_key_data(&pair)?;
                    let count: VarInt = decode_value(&pair)?;
                    set_once(&mut input_count, count.into_u64(), SCOPE, "PSBT_GLOBAL_INPUT_COUNT")?;
                }
                PSBT_GLOBAL_OUTPUT_COUNT => {
                    expect_no_key_data(&pair)?;
                    let count: VarInt = decode_value(&pair)?;
                    set_once(
                        &mut output_count,
                        count.into_u64(),
                        SCOPE,
                        "PSBT_GLOBAL_OUTPUT_COUNT",
                    )?;
                }
                _ => {
                    unknown.insert(
                        UnknownKey {
                            key_type: pair.key_type,
                            data: ByteStr::from(pair.key_data),
                        },
                        ByteStr::from(pair.value),
                    );
                }
            }
        }

        let missing = |field| CodecError::MissingField {
            scope: SCOPE,
            field,
        };
        let tx_version = tx_version.ok_or_else(|| missing("PSBT_GLOBAL_TX_VERSION"))?;
        let fallback_locktime =
            fallback_locktime.ok_or_else(|| missing("PSBT_GLOBAL_FALLBACK_LOCKTIME"))?;
        let input_count = input_count.ok_or_else(|| missing("PSBT_GLOBAL_INPUT_COUNT"))?;
        let output_count = output_count.ok_or_else(|| missing("PSBT_GLOBAL_OUTPUT_COUNT"))?;

        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            inputs.push(Input::parse_map(&mut cursor)?);
        }
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            outputs.push(Output::parse_map(&mut cursor)?);
        }

        Ok(PsbtV2 {
            tx_version: TxVer::from_consensus_i32(tx_version),
            fallback_locktime: LockTime::from_consensus_u32(fallback_locktime),
            inputs,
            outputs,
            unknown,
        })
    }

    /// Serializes the PSBT into its binary v2 form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = PSBT_MAGIC.to_vec();
        write_pair(
            &mut buf,
            PSBT_GLOBAL_TX_VERSION,
            &[],
            &self.tx_version.consensus_serialize(),
        );
        write_pair(
            &mut buf,
            PSBT_GLOBAL_FALLBACK_LOCKTIME,
            &[],
            &self.fallback_locktime.consensus_serialize(),
        );
        write_pair(
            &mut buf,
            PSBT_GLOBAL_INPUT_COUNT,
            &[],
            &VarInt::with(self.inputs.len()).consensus_serialize(),
        );
        write_pair(
            &mut buf,
            PSBT_GLOBAL_OUTPUT_COUNT,
            &[],
            &VarInt::with(self.outputs.len()).consensus_serialize(),
        );
        serialize_unknown(&self.unknown, &mut buf);
        buf.push(0x00);
        for input in &self.inputs {
            input.serialize_map(&mut buf);
        }
        for output in &self.outputs {
            output.serialize_map(&mut buf);
        }
        buf
    }

    /// Decodes the base64 text form.
    pub fn from_base64(text: &str) -> Result<PsbtV2, PsbtParseError> {
        let data = BASE64_STANDARD.decode(text)?;
        PsbtV2::from_bytes(data).map_err(PsbtParseError::from)
    }

    /// Encodes into the base64 text form.
    pub fn to_base64(&self) -> String { BASE64_STANDARD.encode(self.to_bytes()) }
}

impl Display for PsbtV2 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.to_base64()) }
}

impl FromStr for PsbtV2 {
    type Err = PsbtParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { PsbtV2::from_base64(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_enforced() {
        assert_eq!(Psbt::from_bytes(b"psbt"), Err(CodecError::BadMagic));
        assert_eq!(Psbt::from_bytes(b"psbu\xff\x00"), Err(CodecError::BadMagic));
        assert_eq!(PsbtV2::from_bytes(b"psbu\xff\x00"), Err(CodecError::BadMagic));
    }

    #[test]
    fn missing_unsigned_tx() {
        // magic + empty global map
        let data = b"psbt\xff\x00";
        assert_eq!(Psbt::from_bytes(data), Err(CodecError::MissingField {
            scope: "global",
            field: "PSBT_GLOBAL_UNSIGNED_TX",
        }));
    }

    #[test]
    fn truncated_map() {
        // magic + a pair with key length running past the data end
        let data = b"psbt\xff\x05\x00";
        assert_eq!(Psbt::from_bytes(data), Err(CodecError::Truncated));
    }

    #[test]
    fn v2_requires_counts() {
        let mut buf = PSBT_MAGIC.to_vec();
        write_pair(&mut buf, PSBT_GLOBAL_TX_VERSION, &[], &2i32.consensus_serialize());
        write_pair(&mut buf, PSBT_GLOBAL_FALLBACK_LOCKTIME, &[], &0u32.consensus_serialize());
        buf.push(0x00);
        assert_eq!(PsbtV2::from_bytes(&buf), Err(CodecError::MissingField {
            scope: "global",
            field: "PSBT_GLOBAL_INPUT_COUNT",
        }));
    }

    #[test]
    fn v2_rejects_unsigned_tx() {
        let mut buf = PSBT_MAGIC.to_vec();
        write_pair(&mut buf, PSBT_GLOBAL_UNSIGNED_TX, &[], &[]);
        buf.push(0x00);
        assert!(matches!(
            PsbtV2::from_bytes(&buf),
            Err(CodecError::BadKeyType { key_type: 0, .. })
        ));
    }

    #[test]
    fn repeated_global_rejected() {
        let mut buf = PSBT_MAGIC.to_vec();
        write_pair(&mut buf, PSBT_GLOBAL_TX_VERSION, &[], &2i32.consensus_serialize());
        write_pair(&mut buf, PSBT_GLOBAL_TX_VERSION, &[], &2i32.consensus_serialize());
        buf.push(0x00);
        assert_eq!(PsbtV2::from_bytes(&buf), Err(CodecError::RepeatedField {
            scope: "global",
            field: "PSBT_GLOBAL_TX_VERSION",
        }));
    }
}
