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

//! End-to-end spending scenarios over the four-leaf testnet tree used
//! throughout the documentation: known on-chain transactions must be
//! reproduced byte-exactly.

use taptree::tbc::{Network, Outpoint, PrivKey, SeqNo};
use taptree::{SpendError, TapTree, TaprootProgram};

const ALICE_WIF: &str = "cRxebG1hY6vVgS9CSLNaEbEJaXkpZvc6nFeqqGT7v6gcW7MbzKNT";
const BOB_WIF: &str = "cSNdLFDf3wjx1rswNL2jKykbVkC6o56o5nYZi4FUkWKjFn2Q5DSG";

const TREE_ADDRESS: &str = "tb1pjfdm902y2adr08qnn4tahxjvp6x5selgmvzx63yfqk2hdey02yvqjcr29q";
const DEST: &str = "tb1qr65sfajzw8f4rh8d593zm6wryxcukulygv2209";

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

fn outpoint(s: &str) -> Outpoint { s.parse().unwrap() }

#[test]
fn x_only_derivation() {
    assert_eq!(
        alice().x_only().to_string(),
        "50be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3"
    );
    assert_eq!(
        bob().x_only().to_string(),
        "84b5951609b76619a1ce7f48977b4312ebe226987166ef044bfb374ceef63af5"
    );
}

#[test]
fn four_leaf_tree_address() {
    assert_eq!(program().address().to_string(), TREE_ADDRESS);
}

#[test]
fn hashlock_spend() {
    let spend = program()
        .spend("hash")
        .unwrap()
        .from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            3000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .unlock_preimage(b"helloworld")
        .build()
        .unwrap();

    assert_eq!(
        spend.txid().to_string(),
        "d67cf29fc6cfef1490d39dc4753dc4a3cdac8e69ce7c5b39cfdea1c233dbeea5"
    );
    assert_eq!(spend.fee(), 500u64);
    assert_eq!(
        spend.to_hex(),
        "02000000000101b37233cae965b38f1f6c1f2367c46fb0b859c9b242af11e72845b4831429c11a01000000\
         00fdffffff01c4090000000000001600141ea904f64271d351dceda1622de9c321b1cb73e4030a68656c6c\
         6f776f726c6424a820936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af8851\
         61c050be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d363cb9e4776a1cbb195\
         c5cf0cbdbb3110d308969353680e38ec5f446336b60defda55197526f26fa309563b7a3551ca945c046e5b\
         7ada957e59160d4d27f299e300000000"
    );
}

#[test]
fn multisig_two_of_two_spend() {
    let spend = program()
        .spend("2of2")
        .unwrap()
        .from_utxo(
            outpoint("76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd:0"),
            2888u64,
        )
        .to(DEST.parse().unwrap(), 2388u64)
        .sign(&alice())
        .sign(&bob())
        .build()
        .unwrap();

    assert_eq!(
        spend.txid().to_string(),
        "93c0e6ab682e2e5d088cc8175aaddc5d62f4b1de2b234dad566085a97b60581d"
    );

    // order of `sign` calls must not matter
    let reversed = program()
        .spend("2of2")
        .unwrap()
        .from_utxo(
            outpoint("76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd:0"),
            2888u64,
        )
        .to(DEST.parse().unwrap(), 2388u64)
        .sign(&bob())
        .sign(&alice())
        .build()
        .unwrap();
    assert_eq!(reversed.txid(), spend.txid());
}

#[test]
fn key_path_spend() {
    let spend = program()
        .keypath()
        .from_utxo(
            outpoint("a1d7aaff7316fda7dd557632d992c6e57a4bfcf145192b9d618be36d4090638d:0"),
            2686u64,
        )
        .to(DEST.parse().unwrap(), 2186u64)
        .sign(&alice())
        .build()
        .unwrap();

    assert_eq!(
        spend.txid().to_string(),
        "63f444792332bcb173975fa2cf4d88a2620bc47b9d434768bf23477667f963b4"
    );
    // key-path witness is a single 64-byte signature
    assert_eq!(spend.tx.inputs[0].witness.len(), 1);
    assert_eq!(spend.tx.inputs[0].witness[0].len(), 64);
}

#[test]
fn csv_timelock_spend() {
    let spend = program()
        .spend("csv")
        .unwrap()
        .from_utxo(
            outpoint("3ff99c8eaf9b9e2f42016f2b4c7659e11c8dcb4dc36f24ed7288a63b04c308f0:1"),
            2666u64,
        )
        .to(DEST.parse().unwrap(), 2166u64)
        .sign(&bob())
        .build()
        .unwrap();

    assert_eq!(
        spend.txid().to_string(),
        "dc48b4b9122b59a92d96dda21796b598e1e1b45388c17b3fd42b7c01dba3a122"
    );
    // the committed relative lock lands in nSequence automatically
    assert_eq!(spend.tx.inputs[0].sequence, SeqNo::from_consensus_u32(2));
}

#[test]
fn explicit_sequence_override_wins() {
    let spend = program()
        .spend("hash")
        .unwrap()
        .from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            3000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .unlock_preimage(b"helloworld")
        .sequence(SeqNo::FINAL)
        .build()
        .unwrap();
    assert_eq!(spend.tx.inputs[0].sequence, SeqNo::FINAL);
}

#[test]
fn round_trip_serialization() {
    let spend = program()
        .spend("hash")
        .unwrap()
        .from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            3000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .unlock_preimage(b"helloworld")
        .build()
        .unwrap();
    let decoded: taptree::tbc::Tx = spend.to_hex().parse().unwrap();
    assert_eq!(decoded, spend.tx);
    assert_eq!(decoded.txid(), spend.txid());
}

#[test]
fn missing_unlock_material() {
    let program = program();
    let base = || {
        program.spend("hash").unwrap().from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            3000u64,
        )
    };

    assert_eq!(
        base().to(DEST.parse().unwrap(), 2500u64).build().unwrap_err(),
        SpendError::MissingPreimage
    );
    assert_eq!(
        base().unlock_preimage(b"helloworld").build().unwrap_err(),
        SpendError::NoOutputs
    );
    assert_eq!(
        program
            .spend("hash")
            .unwrap()
            .to(DEST.parse().unwrap(), 2500u64)
            .unlock_preimage(b"helloworld")
            .build()
            .unwrap_err(),
        SpendError::NoUtxo
    );
}

#[test]
fn insufficient_material_for_signing_kinds() {
    let ms = program()
        .spend("2of2")
        .unwrap()
        .from_utxo(
            outpoint("76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd:0"),
            2888u64,
        )
        .to(DEST.parse().unwrap(), 2388u64)
        .sign(&alice())
        .build()
        .unwrap_err();
    assert_eq!(ms, SpendError::InsufficientSigners {
        required: 2,
        provided: 1
    });

    let cs = program()
        .spend("bob")
        .unwrap()
        .from_utxo(
            outpoint("76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd:0"),
            2888u64,
        )
        .to(DEST.parse().unwrap(), 2388u64)
        .sign(&alice())
        .build()
        .unwrap_err();
    assert_eq!(cs, SpendError::MissingSigner);
}

#[test]
fn negative_fee_rejected() {
    let err = program()
        .spend("hash")
        .unwrap()
        .from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            2000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .unlock_preimage(b"helloworld")
        .build()
        .unwrap_err();
    assert!(matches!(err, SpendError::InsufficientFunds { .. }));
}

#[test]
fn custom_leaf_spend_uses_raw_witness() {
    // 2 OP_EQUAL: unlockable by pushing 0x02
    let raw = taptree::tbc::ScriptBytes::try_from(vec![0x52u8, 0x87]).unwrap();
    let program = TapTree::with(alice().to_internal_pk(), Network::Testnet)
        .custom(raw.clone(), "two")
        .build()
        .unwrap();

    let missing = program
        .spend("two")
        .unwrap()
        .from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            3000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .build()
        .unwrap_err();
    assert_eq!(missing, SpendError::CustomWitnessRequired);

    let spend = program
        .spend("two")
        .unwrap()
        .from_utxo(
            outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
            3000u64,
        )
        .to(DEST.parse().unwrap(), 2500u64)
        .unlock_with([vec![0x02]])
        .build()
        .unwrap();

    let witness = &spend.tx.inputs[0].witness;
    assert_eq!(witness.len(), 3);
    assert_eq!(witness[0].as_slice(), &[0x02]);
    assert_eq!(witness[1].as_slice(), raw.as_slice());
}

#[test]
fn multi_utxo_spend_signs_every_input() {
    let spend = program()
        .spend("hash")
        .unwrap()
        .from_utxos([
            (
                outpoint("1ac1291483b44528e711af42b2c959b8b06fc467231f6c1f8fb365e9ca3372b3:1"),
                taptree::tbc::Sats(3000),
            ),
            (
                outpoint("76906b969d65177c5d8af3103e683aa1c02abafa94368d6a6ae1fe78b8aa49dd:0"),
                taptree::tbc::Sats(2888),
            ),
        ])
        .to(DEST.parse().unwrap(), 5000u64)
        .unlock_preimage(b"helloworld")
        .build()
        .unwrap();

    assert_eq!(spend.tx.inputs.len(), 2);
    for input in &spend.tx.inputs {
        assert_eq!(input.witness.len(), 3);
    }
    assert_eq!(spend.fee(), 888u64);
}
