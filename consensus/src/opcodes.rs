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

//! Constants for the script opcodes used by tapscript compilation and
//! decoding.

/// Push an empty array onto the stack.
pub const OP_PUSHBYTES_0: u8 = 0x00;
/// Push the next byte as an array onto the stack.
pub const OP_PUSHBYTES_1: u8 = 0x01;
/// Push the next 2 bytes as an array onto the stack.
pub const OP_PUSHBYTES_2: u8 = 0x02;
/// Push the next 20 bytes as an array onto the stack.
pub const OP_PUSHBYTES_20: u8 = 0x14;
/// Push the next 32 bytes as an array onto the stack.
pub const OP_PUSHBYTES_32: u8 = 0x20;
/// Push the next 40 bytes as an array onto the stack.
pub const OP_PUSHBYTES_40: u8 = 0x28;
/// Push the next 75 bytes as an array onto the stack.
pub const OP_PUSHBYTES_75: u8 = 0x4b;

/// Read the next byte as N; push the next N bytes as an array onto the stack.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Read the next 2 bytes as N; push the next N bytes as an array onto the
/// stack.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Read the next 4 bytes as N; push the next N bytes as an array onto the
/// stack.
pub const OP_PUSHDATA4: u8 = 0x4e;

/// Push the number `-1` onto the stack.
pub const OP_PUSHNUM_NEG1: u8 = 0x4f;
/// Synonym for OP_RETURN.
pub const OP_RESERVED: u8 = 0x50;
/// Push the number `1` onto the stack.
pub const OP_PUSHNUM_1: u8 = 0x51;
/// Push the number `2` onto the stack.
pub const OP_PUSHNUM_2: u8 = 0x52;
/// Push the number `3` onto the stack.
pub const OP_PUSHNUM_3: u8 = 0x53;
/// Push the number `4` onto the stack.
pub const OP_PUSHNUM_4: u8 = 0x54;
/// Push the number `5` onto the stack.
pub const OP_PUSHNUM_5: u8 = 0x55;
/// Push the number `6` onto the stack.
pub const OP_PUSHNUM_6: u8 = 0x56;
/// Push the number `7` onto the stack.
pub const OP_PUSHNUM_7: u8 = 0x57;
/// Push the number `8` onto the stack.
pub const OP_PUSHNUM_8: u8 = 0x58;
/// Push the number `9` onto the stack.
pub const OP_PUSHNUM_9: u8 = 0x59;
/// Push the number `10` onto the stack.
pub const OP_PUSHNUM_10: u8 = 0x5a;
/// Push the number `11` onto the stack.
pub const OP_PUSHNUM_11: u8 = 0x5b;
/// Push the number `12` onto the stack.
pub const OP_PUSHNUM_12: u8 = 0x5c;
/// Push the number `13` onto the stack.
pub const OP_PUSHNUM_13: u8 = 0x5d;
/// Push the number `14` onto the stack.
pub const OP_PUSHNUM_14: u8 = 0x5e;
/// Push the number `15` onto the stack.
pub const OP_PUSHNUM_15: u8 = 0x5f;
/// Push the number `16` onto the stack.
pub const OP_PUSHNUM_16: u8 = 0x60;

/// Fail the script immediately.
pub const OP_RETURN: u8 = 0x6a;

/// Drops the top stack item.
pub const OP_DROP: u8 = 0x75;
/// Duplicates the top stack item.
pub const OP_DUP: u8 = 0x76;

/// Pushes 1 if the inputs are exactly equal, 0 otherwise.
pub const OP_EQUAL: u8 = 0x87;
/// Returns success if the inputs are exactly equal, failure otherwise.
pub const OP_EQUALVERIFY: u8 = 0x88;

/// Pop the top stack item and push its RIPEMD160 hash.
pub const OP_RIPEMD160: u8 = 0xa6;
/// Pop the top stack item and push its SHA1 hash.
pub const OP_SHA1: u8 = 0xa7;
/// Pop the top stack item and push its SHA256 hash.
pub const OP_SHA256: u8 = 0xa8;
/// Pop the top stack item and push its RIPEMD(SHA256) hash.
pub const OP_HASH160: u8 = 0xa9;
/// Pop the top stack item and push its SHA256(SHA256) hash.
pub const OP_HASH256: u8 = 0xaa;

/// <https://en.bitcoin.it/wiki/OP_CHECKSIG> pushing 1/0 for success/failure.
pub const OP_CHECKSIG: u8 = 0xac;
/// <https://en.bitcoin.it/wiki/OP_CHECKSIG> returning success/failure.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;

/// Check the top stack item as an absolute lock time and fail the script if
/// the transaction `nLockTime` does not satisfy it.
pub const OP_CLTV: u8 = 0xb1;
/// Check the top stack item as a relative lock time and fail the script if
/// the input `nSequence` does not satisfy it.
pub const OP_CSV: u8 = 0xb2;

/// OP_CHECKSIGADD post tapscript.
pub const OP_CHECKSIGADD: u8 = 0xba;

/// Returns a human-readable name of an opcode when it has one.
///
/// Covers the opcodes this library compiles or expects to meet while
/// decoding tapscripts; everything else is reported as `None` and displayed
/// by the caller in a raw byte form.
pub const fn op_code_name(op: u8) -> Option<&'static str> {
    Some(match op {
        OP_PUSHBYTES_0 => "OP_0",
        OP_PUSHDATA1 => "OP_PUSHDATA1",
        OP_PUSHDATA2 => "OP_PUSHDATA2",
        OP_PUSHDATA4 => "OP_PUSHDATA4",
        OP_PUSHNUM_NEG1 => "OP_PUSHNUM_NEG1",
        OP_RESERVED => "OP_RESERVED",
        OP_PUSHNUM_1 => "OP_1",
        OP_PUSHNUM_2 => "OP_2",
        OP_PUSHNUM_3 => "OP_3",
        OP_PUSHNUM_4 => "OP_4",
        OP_PUSHNUM_5 => "OP_5",
        OP_PUSHNUM_6 => "OP_6",
        OP_PUSHNUM_7 => "OP_7",
        OP_PUSHNUM_8 => "OP_8",
        OP_PUSHNUM_9 => "OP_9",
        OP_PUSHNUM_10 => "OP_10",
        OP_PUSHNUM_11 => "OP_11",
        OP_PUSHNUM_12 => "OP_12",
        OP_PUSHNUM_13 => "OP_13",
        OP_PUSHNUM_14 => "OP_14",
        OP_PUSHNUM_15 => "OP_15",
        OP_PUSHNUM_16 => "OP_16",
        OP_RETURN => "OP_RETURN",
        OP_DROP => "OP_DROP",
        OP_DUP => "OP_DUP",
        OP_EQUAL => "OP_EQUAL",
        OP_EQUALVERIFY => "OP_EQUALVERIFY",
        OP_RIPEMD160 => "OP_RIPEMD160",
        OP_SHA1 => "OP_SHA1",
        OP_SHA256 => "OP_SHA256",
        OP_HASH160 => "OP_HASH160",
        OP_HASH256 => "OP_HASH256",
        OP_CHECKSIG => "OP_CHECKSIG",
        OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
        OP_CLTV => "OP_CHECKLOCKTIMEVERIFY",
        OP_CSV => "OP_CHECKSEQUENCEVERIFY",
        OP_CHECKSIGADD => "OP_CHECKSIGADD",
        _ => return None,
    })
}
