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

//! Multi-party PSBT workflow over the four-leaf testnet tree: the PSBT path
//! must reproduce the same transactions as direct building, and both PSBT
//! versions must round-trip through their text form.

use psbt::taptree::{TapTree, TaprootProgram};
use psbt::tbc::{ByteStr, Network, Outpoint, PrivKey, Sats, SeqNo, Txid, Vout};
use psbt::{CodecError, Psbt, PsbtV2, SignError, ToPsbt, UnknownKey};

const ALICE_WIF: &str = "cRxebG1hY6vVgS9CSLNaEbEJaXkpZvc6nFeqqGT7v6gcW7MbzKNT";
const BOB_WIF: &str = "cSNdLFDf3wjx1rswNL2jKykbVkC6o56o5nYZi4FUkWKjFn2Q5DSG";
const DEST: &str = "tb1qr65sfajzw8f4rh8d593zm6wryxcukulygv2209";
const MULTISIG_TXID: &str = "93c0e6ab682e2e5d088cc8175aaddc5d62f4b1de2b234dad566085a97b60581d";

fn alice() -> PrivKey { PrivKey::from_wif(ALICE_WIF).unwrap() }
fn bob() -> PrivKey { PrivKey::from_wif(BOB_WIF).unwrap() }

fn program() -> TaprootProgram {
    TapTree::with(alice().to_internal_pk(), Network::Testnet)
        .hashlock(b"helloworld", Some("hash"))
        .multisig(2, [alice().x_only(), bob().x_only()], Some("2of2"))
        .timelock_blocks(2, bob().x_only(), Some("csv"))
        .checksig(bob().x_only(), Some("bob"))
        .build()
        .unwrap()
}

fn multisig_psbt(program: &TaprootProgram) -> Psbt {
    program
        .spend("2of2")
        .unwrap()
        .from_utxo(
            "76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd:0"
                .parse::<Outpoint>()
                .unwrap(),
            2888u64,
        )
        .to(DEST.parse().unwrap(), 2388u64)
        .to_psbt()
        .unwrap()
}

#[test]
fn multi_party_signing_matches_direct_build() {
    let program = program();
    let mut psbt = multisig_psbt(&program);

    // first party signs and passes the PSBT on in its text form
    psbt.sign_with(&alice(), 0).unwrap();
    let transported = psbt.to_base64();

    // second party receives, co-signs, finalizes and extracts
    let mut psbt = Psbt::from_base64(&transported).unwrap();
    psbt.sign_with(&bob(), 0).unwrap();
    psbt.finalize().unwrap();
    let tx = psbt.extract_transaction().unwrap();

    assert_eq!(tx.txid().to_string(), MULTISIG_TXID);

    // CHECKSIGADD consumes signatures LIFO: bob's signature is at the
    // bottom of the stack, alice's above it, then script and control block
    let witness = &tx.inputs[0].witness;
    assert_eq!(witness.len(), 4);
    assert_eq!(witness[0].len(), 64);
    assert_eq!(witness[1].len(), 64);
}

#[test]
fn v2_signing_flow_matches_v0() {
    let program = program();

    let mut v0 = multisig_psbt(&program);
    v0.sign_with(&alice(), 0).unwrap();
    v0.sign_with(&bob(), 0).unwrap();
    v0.finalize().unwrap();

    let mut v2 = multisig_psbt(&program).to_v2();
    v2.sign_with(&alice(), 0).unwrap();
    v2.sign_with(&bob(), 0).unwrap();
    v2.finalize().unwrap();

    assert_eq!(
        v0.extract_transaction().unwrap(),
        v2.extract_transaction().unwrap()
    );
    assert_eq!(
        v2.extract_transaction().unwrap().txid().to_string(),
        MULTISIG_TXID
    );
}

#[test]
fn v0_round_trip() {
    let program = program();
    let mut psbt = multisig_psbt(&program);
    psbt.sign_with(&alice(), 0).unwrap();

    let restored = Psbt::from_base64(&psbt.to_base64()).unwrap();
    assert_eq!(restored, psbt);
    assert_eq!(restored.to_bytes(), psbt.to_bytes());
}

#[test]
fn v2_round_trip() {
    let program = program();
    let mut psbt = multisig_psbt(&program).to_v2();
    psbt.sign_with(&alice(), 0).unwrap();

    let restored = PsbtV2::from_base64(&psbt.to_base64()).unwrap();
    assert_eq!(restored, psbt);
    assert_eq!(restored.to_bytes(), psbt.to_bytes());

    // a v2 blob is not a valid v0 PSBT and vice versa
    assert!(Psbt::from_bytes(psbt.to_bytes()).is_err());
}

#[test]
fn unknown_keys_preserved() {
    let program = program();
    let mut psbt = multisig_psbt(&program);
    psbt.unknown.insert(
        UnknownKey {
            key_type: 0xFC,
            data: ByteStr::from(vec![0xAA, 0xBB]),
        },
        ByteStr::from(vec![0x01, 0x02, 0x03]),
    );
    psbt.inputs[0].unknown.insert(
        UnknownKey {
            key_type: 0x42,
            data: ByteStr::from(vec![]),
        },
        ByteStr::from(vec![0xFF]),
    );

    let restored = Psbt::from_base64(&psbt.to_base64()).unwrap();
    assert_eq!(restored, psbt);
    let key = UnknownKey {
        key_type: 0x42,
        data: ByteStr::from(vec![]),
    };
    assert_eq!(restored.inputs[0].unknown[&key], ByteStr::from(vec![0xFF]));
}

#[test]
fn signing_is_idempotent() {
    let program = program();
    let mut psbt = multisig_psbt(&program);
    psbt.sign_with(&alice(), 0).unwrap();
    let first = psbt.clone();
    psbt.sign_with(&alice(), 0).unwrap();
    assert_eq!(psbt, first);
    assert_eq!(psbt.inputs[0].tap_script_sigs.len(), 1);
}

#[test]
fn key_path_psbt_spend() {
    let program = program();
    let mut psbt = program
        .keypath()
        .from_utxo(
            "a1d7aaff7316fda7dd557632d992c6e57a4bfcf145192b9d618be36d4090638d:0"
                .parse::<Outpoint>()
                .unwrap(),
            2686u64,
        )
        .to(DEST.parse().unwrap(), 2186u64)
        .to_psbt()
        .unwrap();

    assert_eq!(psbt.inputs[0].tap_internal_key, Some(program.internal_key()));
    assert_eq!(psbt.inputs[0].tap_merkle_root, program.merkle_root());
    assert_eq!(psbt.fee(), Some(Sats(500)));

    psbt.sign_with(&alice(), 0).unwrap();
    psbt.finalize().unwrap();
    let tx = psbt.extract_transaction().unwrap();
    assert_eq!(
        tx.txid().to_string(),
        "63f444792332bcb173975fa2cf4d88a2620bc47b9d434768bf23477667f963b4"
    );
}

#[test]
fn key_path_rejects_foreign_key() {
    let program = program();
    let mut psbt = program
        .keypath()
        .from_utxo(
            "a1d7aaff7316fda7dd557632d992c6e57a4bfcf145192b9d618be36d4090638d:0"
                .parse::<Outpoint>()
                .unwrap(),
            2686u64,
        )
        .to(DEST.parse().unwrap(), 2186u64)
        .to_psbt()
        .unwrap();
    assert_eq!(psbt.sign_with(&bob(), 0), Err(SignError::KeyMismatch(0)));
}

#[test]
fn finalize_requires_signatures() {
    let program = program();
    let mut psbt = multisig_psbt(&program);
    assert_eq!(psbt.finalize(), Err(SignError::CannotFinalize(0)));
    assert_eq!(
        psbt.extract_transaction(),
        Err(SignError::NotFinalized(0))
    );
}

#[test]
fn signing_requires_witness_utxo() {
    let program = program();
    let mut psbt = multisig_psbt(&program);
    psbt.inputs[0].witness_utxo = None;
    assert_eq!(
        psbt.sign_with(&alice(), 0),
        Err(SignError::MissingWitnessUtxo(0))
    );
}

#[test]
fn invalid_input_index_rejected() {
    let program = program();
    let mut psbt = multisig_psbt(&program);
    assert_eq!(
        psbt.sign_with(&alice(), 5),
        Err(SignError::InvalidInputIndex(5))
    );
}

#[test]
fn v2_structure_fields() {
    let program = program();
    let v2 = multisig_psbt(&program).to_v2();
    assert_eq!(
        v2.inputs[0].previous_txid,
        Some(
            "76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd"
                .parse::<Txid>()
                .unwrap()
        )
    );
    assert_eq!(v2.inputs[0].output_index, Some(Vout::from_u32(0)));
    assert_eq!(v2.inputs[0].sequence, Some(SeqNo::RBF));
    assert_eq!(v2.outputs[0].amount, Some(Sats(2388)));
    assert!(v2.outputs[0].script.is_some());

    // extraction round-trips through the map structure, not the original tx
    let rebuilt = v2.unsigned_tx().unwrap();
    assert_eq!(rebuilt.txid().to_byte_array(), multisig_psbt(&program).tx.txid().to_byte_array());
}

#[test]
fn hashlock_leaf_cannot_be_psbt_finalized_without_sigs() {
    // a hash lock leaf carries no pubkeys; the PSBT signing workflow cannot
    // produce its witness, which is the spend builder's job
    let program = program();
    let mut psbt = program
        .spend("hash")
        .unwrap()
        .from_utxo(
            "1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"
                .parse::<Outpoint>()
                .unwrap(),
            3000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .to_psbt()
        .unwrap();
    assert_eq!(psbt.finalize(), Err(SignError::CannotFinalize(0)));
}

#[test]
fn bad_magic_is_rejected() {
    assert!(matches!(
        Psbt::from_base64("cHNidP8"),
        Err(psbt::PsbtParseError::Codec(CodecError::Truncated) | psbt::PsbtParseError::Base64(_))
    ));
    let garbage = base64_of(b"nonsense");
    assert!(matches!(
        Psbt::from_base64(&garbage),
        Err(psbt::PsbtParseError::Codec(CodecError::BadMagic))
    ));
}

fn base64_of(data: &[u8]) -> String {
    use base64::prelude::BASE64_STANDARD;
    use base64::Engine;
    BASE64_STANDARD.encode(data)
}
