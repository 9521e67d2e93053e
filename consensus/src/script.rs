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

use amplify::confinement;
use amplify::confinement::Confined;
use amplify::hex::ToHex;

use crate::opcodes::*;
use crate::{VarInt, VarIntArray};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[non_exhaustive]
#[repr(u8)]
pub enum OpCode {
    /// Push an empty array onto the stack.
    #[display("OP_0")]
    PushBytes0 = OP_PUSHBYTES_0,

    /// Push the next 32 bytes as an array onto the stack.
    #[display("OP_PUSH_BYTES32")]
    PushBytes32 = OP_PUSHBYTES_32,

    /// Read the next byte as N; push the next N bytes as an array onto the
    /// stack.
    #[display("OP_PUSH_DATA1")]
    PushData1 = OP_PUSHDATA1,
    /// Read the next 2 bytes as N; push the next N bytes as an array onto the
    /// stack.
    #[display("OP_PUSH_DATA2")]
    PushData2 = OP_PUSHDATA2,
    /// Read the next 4 bytes as N; push the next N bytes as an array onto the
    /// stack.
    #[display("OP_PUSH_DATA4")]
    PushData4 = OP_PUSHDATA4,

    /// Push the number 1 onto the stack.
    #[display("OP_PUSHNUM_1")]
    PushNum1 = OP_PUSHNUM_1,

    /// Fail the script immediately.
    #[display("OP_RETURN")]
    Return = OP_RETURN,

    /// Drops the top stack item.
    #[display("OP_DROP")]
    Drop = OP_DROP,

    /// Duplicates the top stack item.
    #[display("OP_DUP")]
    Dup = OP_DUP,

    /// Pushes 1 if the inputs are exactly equal, 0 otherwise.
    #[display("OP_EQUAL")]
    Equal = OP_EQUAL,

    /// Returns success if the inputs are exactly equal, failure otherwise.
    #[display("OP_EQUALVERIFY")]
    EqualVerify = OP_EQUALVERIFY,

    /// Pop the top stack item and push its SHA256 hash.
    #[display("OP_SHA256")]
    Sha256 = OP_SHA256,

    /// Pop the top stack item and push its RIPEMD(SHA256) hash.
    #[display("OP_HASH160")]
    Hash160 = OP_HASH160,

    /// <https://en.bitcoin.it/wiki/OP_CHECKSIG> pushing 1/0 for success/failure.
    #[display("OP_CHECKSIG")]
    CheckSig = OP_CHECKSIG,

    /// <https://en.bitcoin.it/wiki/OP_CHECKSIG> returning success/failure.
    #[display("OP_CHECKSIGVERIFY")]
    CheckSigVerify = OP_CHECKSIGVERIFY,

    /// Verify the top stack item as a relative lock time.
    #[display("OP_CHECKSEQUENCEVERIFY")]
    Csv = OP_CSV,

    /// OP_CHECKSIGADD post tapscript.
    #[display("OP_CHECKSIGADD")]
    CheckSigAdd = OP_CHECKSIGADD,
}

/// unknown opcode {0:#04x} outside of the set used by this library.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub struct UnknownOpCode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            OP_PUSHBYTES_0 => OpCode::PushBytes0,
            OP_PUSHBYTES_32 => OpCode::PushBytes32,
            OP_PUSHDATA1 => OpCode::PushData1,
            OP_PUSHDATA2 => OpCode::PushData2,
            OP_PUSHDATA4 => OpCode::PushData4,
            OP_PUSHNUM_1 => OpCode::PushNum1,
            OP_RETURN => OpCode::Return,
            OP_DROP => OpCode::Drop,
            OP_DUP => OpCode::Dup,
            OP_EQUAL => OpCode::Equal,
            OP_EQUALVERIFY => OpCode::EqualVerify,
            OP_SHA256 => OpCode::Sha256,
            OP_HASH160 => OpCode::Hash160,
            OP_CHECKSIG => OpCode::CheckSig,
            OP_CHECKSIGVERIFY => OpCode::CheckSigVerify,
            OP_CSV => OpCode::Csv,
            OP_CHECKSIGADD => OpCode::CheckSigAdd,
            unknown => return Err(UnknownOpCode(unknown)),
        })
    }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From, Default)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct SigScript(ScriptBytes);

impl TryFrom<Vec<u8>> for SigScript {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        ScriptBytes::try_from(script_bytes).map(Self)
    }
}

impl SigScript {
    #[inline]
    pub fn empty() -> Self { SigScript::default() }

    #[inline]
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn as_script_bytes(&self) -> &ScriptBytes { &self.0 }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From, Default)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ScriptPubkey(ScriptBytes);

impl TryFrom<Vec<u8>> for ScriptPubkey {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        ScriptBytes::try_from(script_bytes).map(Self)
    }
}

impl ScriptPubkey {
    #[inline]
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(ScriptBytes::from(Confined::with_capacity(capacity)))
    }

    /// Constructs script object assuming the script length is less than 4GB.
    /// Panics otherwise.
    #[inline]
    pub fn from_checked(script_bytes: Vec<u8>) -> Self {
        Self(ScriptBytes::from_checked(script_bytes))
    }

    pub fn p2pkh(hash: impl Into<[u8; 20]>) -> Self {
        let mut script = Self::with_capacity(25);
        script.push_opcode(OpCode::Dup);
        script.push_opcode(OpCode::Hash160);
        script.push_slice(&hash.into());
        script.push_opcode(OpCode::EqualVerify);
        script.push_opcode(OpCode::CheckSig);
        script
    }

    /// Checks whether a script pubkey is a P2PKH output.
    #[inline]
    pub fn is_p2pkh(&self) -> bool {
        self.0.len() == 25
            && self.0[0] == OP_DUP
            && self.0[1] == OP_HASH160
            && self.0[2] == OP_PUSHBYTES_20
            && self.0[23] == OP_EQUALVERIFY
            && self.0[24] == OP_CHECKSIG
    }

    /// Adds a single opcode to the script.
    #[inline]
    pub fn push_opcode(&mut self, op_code: OpCode) { self.0.push(op_code as u8) }

    #[inline]
    pub fn as_script_bytes(&self) -> &ScriptBytes { &self.0 }
}

#[derive(Wrapper, WrapperMut, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, Debug, From)]
#[wrapper(Deref, AsSlice, Hex)]
#[wrapper_mut(DerefMut, AsSliceMut)]
pub struct ScriptBytes(VarIntArray<u8>);

impl TryFrom<Vec<u8>> for ScriptBytes {
    type Error = confinement::Error;
    fn try_from(script_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Confined::try_from(script_bytes).map(Self)
    }
}

impl ScriptBytes {
    /// Constructs script object assuming the script length is less than 4GB.
    /// Panics otherwise.
    #[inline]
    pub fn from_checked(script_bytes: Vec<u8>) -> Self {
        Self(Confined::try_from(script_bytes).expect("script exceeding 4GB"))
    }

    /// Adds instructions to push some arbitrary data onto the stack.
    ///
    /// ## Panics
    ///
    /// The method panics if `data` length is greater or equal to
    /// 0x100000000.
    pub fn push_slice(&mut self, data: &[u8]) {
        // Start with a PUSH opcode
        match data.len() as u64 {
            n if n < OP_PUSHDATA1 as u64 => {
                self.push(n as u8);
            }
            n if n < 0x100 => {
                self.push(OP_PUSHDATA1);
                self.push(n as u8);
            }
            n if n < 0x10000 => {
                self.push(OP_PUSHDATA2);
                self.push((n % 0x100) as u8);
                self.push((n / 0x100) as u8);
            }
            n if n < 0x100000000 => {
                self.push(OP_PUSHDATA4);
                self.push((n % 0x100) as u8);
                self.push(((n / 0x100) % 0x100) as u8);
                self.push(((n / 0x10000) % 0x100) as u8);
                self.push((n / 0x1000000) as u8);
            }
            _ => panic!("tried to put a 4bn+ sized object into a script!"),
        }
        // Then push the raw bytes
        self.extend(data);
    }

    /// Adds instructions to push a number onto the stack using the minimal
    /// encoding: `OP_0` for zero, `OP_1..OP_16` for 1-16, `OP_PUSHNUM_NEG1`
    /// for -1 and a signed little-endian script-number push otherwise.
    pub fn push_num(&mut self, num: i64) {
        match num {
            0 => return self.push(OP_PUSHBYTES_0),
            -1 => return self.push(OP_PUSHNUM_NEG1),
            1..=16 => return self.push(OP_PUSHNUM_1 + (num - 1) as u8),
            _ => {}
        }
        let neg = num < 0;
        let mut abs = num.unsigned_abs();
        let mut le = Vec::with_capacity(9);
        while abs > 0 {
            le.push((abs & 0xFF) as u8);
            abs >>= 8;
        }
        if le.last().map(|byte| byte & 0x80 != 0) == Some(true) {
            le.push(if neg { 0x80 } else { 0x00 });
        } else if neg {
            *le.last_mut().expect("non-zero number") |= 0x80;
        }
        self.push_slice(&le);
    }

    #[inline]
    pub(crate) fn push(&mut self, data: u8) { self.0.push(data).expect("script exceeds 4GB") }

    #[inline]
    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.0
            .extend(data.iter().copied())
            .expect("script exceeds 4GB")
    }

    /// Computes the sum of `len` and the length of an appropriate push
    /// opcode.
    pub fn len_for_slice(len: usize) -> usize {
        len + match len {
            0..=0x4b => 1,
            0x4c..=0xff => 2,
            0x100..=0xffff => 3,
            // we don't care about oversized, the other fn will panic anyway
            _ => 5,
        }
    }

    pub fn len_var_int(&self) -> VarInt { VarInt(self.len() as u64) }

    pub fn into_vec(self) -> Vec<u8> { self.0.release() }

    /// Iterates over script instructions, failing on a truncated data push.
    pub fn instructions(&self) -> Instructions { Instructions { bytes: self.as_slice() } }

    /// Renders the script into a human-readable assembly form.
    ///
    /// The script bytes remain the authoritative representation; this is a
    /// display decoder only and fails on malformed pushes.
    pub fn to_asm(&self) -> Result<String, UnparsableScript> {
        let mut asm = Vec::new();
        for instr in self.instructions() {
            asm.push(instr?.to_string());
        }
        Ok(asm.join(" "))
    }

    pub(crate) fn as_var_int_array(&self) -> &VarIntArray<u8> { &self.0 }
}

/// A single decoded script instruction: either an opcode or a data push.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Instruction<'script> {
    /// Non-push opcode.
    Op(u8),
    /// Data push (including pushes done via `OP_PUSHDATA1/2/4`).
    Push(&'script [u8]),
}

impl Display for Instruction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Op(op) => match op_code_name(*op) {
                Some(name) => f.write_str(name),
                None => write!(f, "OP_UNKNOWN({op:#04x})"),
            },
            Instruction::Push(data) if data.is_empty() => f.write_str("OP_0"),
            Instruction::Push(data) => f.write_str(&data.to_hex()),
        }
    }
}

/// script contains a truncated data push {0} bytes before its end.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub struct UnparsableScript(pub usize);

/// Iterator over decoded script instructions.
pub struct Instructions<'script> {
    bytes: &'script [u8],
}

impl<'script> Instructions<'script> {
    fn take_push(&mut self, len: usize) -> Result<Instruction<'script>, UnparsableScript> {
        if self.bytes.len() < len {
            let left = self.bytes.len();
            self.bytes = &[];
            return Err(UnparsableScript(left));
        }
        let (push, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(Instruction::Push(push))
    }
}

impl<'script> Iterator for Instructions<'script> {
    type Item = Result<Instruction<'script>, UnparsableScript>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&first, rest) = self.bytes.split_first()?;
        self.bytes = rest;
        let item = match first {
            len @ 1..=OP_PUSHBYTES_75 => self.take_push(len as usize),
            OP_PUSHDATA1 => match self.bytes.split_first() {
                Some((&len, rest)) => {
                    self.bytes = rest;
                    self.take_push(len as usize)
                }
                None => Err(UnparsableScript(0)),
            },
            OP_PUSHDATA2 => match self.bytes.split_first_chunk::<2>() {
                Some((len, rest)) => {
                    self.bytes = rest;
                    self.take_push(u16::from_le_bytes(*len) as usize)
                }
                None => Err(UnparsableScript(self.bytes.len())),
            },
            OP_PUSHDATA4 => match self.bytes.split_first_chunk::<4>() {
                Some((len, rest)) => {
                    self.bytes = rest;
                    self.take_push(u32::from_le_bytes(*len) as usize)
                }
                None => Err(UnparsableScript(self.bytes.len())),
            },
            op => Ok(Instruction::Op(op)),
        };
        Some(item)
    }
}

#[cfg(feature = "serde")]
mod _serde {
    use amplify::hex::{FromHex, ToHex};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::*;

    impl Serialize for ScriptBytes {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer {
            if serializer.is_human_readable() {
                serializer.serialize_str(&self.to_hex())
            } else {
                serializer.serialize_bytes(self.as_slice())
            }
        }
    }

    impl<'de> Deserialize<'de> for ScriptBytes {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where D: Deserializer<'de> {
            if deserializer.is_human_readable() {
                String::deserialize(deserializer).and_then(|string| {
                    Self::from_hex(&string).map_err(|_| D::Error::custom("wrong hex data"))
                })
            } else {
                let bytes = Vec::<u8>::deserialize(deserializer)?;
                ScriptBytes::try_from(bytes)
                    .map_err(|_| D::Error::custom("invalid script length exceeding 4GB"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use amplify::hex::FromHex;

    use super::*;

    #[test]
    fn push_slice_forms() {
        let mut script = ScriptBytes::default();
        script.push_slice(&[0xAA; 10]);
        assert_eq!(script[0], 10);

        let mut script = ScriptBytes::default();
        script.push_slice(&[0xAA; 80]);
        assert_eq!(script[0], OP_PUSHDATA1);
        assert_eq!(script[1], 80);

        let mut script = ScriptBytes::default();
        script.push_slice(&[0xAA; 300]);
        assert_eq!(script[0], OP_PUSHDATA2);
        assert_eq!(script[1], 0x2c);
        assert_eq!(script[2], 0x01);
    }

    #[test]
    fn push_num_minimal() {
        let mut script = ScriptBytes::default();
        script.push_num(0);
        script.push_num(1);
        script.push_num(2);
        script.push_num(16);
        assert_eq!(script.as_slice(), &[
            OP_PUSHBYTES_0,
            OP_PUSHNUM_1,
            OP_PUSHNUM_2,
            OP_PUSHNUM_16
        ]);

        let mut script = ScriptBytes::default();
        script.push_num(17);
        assert_eq!(script.as_slice(), &[0x01, 17]);

        let mut script = ScriptBytes::default();
        script.push_num(128);
        assert_eq!(script.as_slice(), &[0x02, 0x80, 0x00]);

        let mut script = ScriptBytes::default();
        script.push_num(0x400000 | 600);
        assert_eq!(script.as_slice(), &[0x03, 0x58, 0x02, 0x40]);

        let mut script = ScriptBytes::default();
        script.push_num(-5);
        assert_eq!(script.as_slice(), &[0x01, 0x85]);
    }

    #[test]
    fn instruction_decoding() {
        let script =
            ScriptBytes::from_hex("a820936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af8851")
                .unwrap();
        let instrs = script
            .instructions()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(instrs.len(), 4);
        assert_eq!(instrs[0], Instruction::Op(OP_SHA256));
        assert!(matches!(instrs[1], Instruction::Push(data) if data.len() == 32));
        assert_eq!(instrs[2], Instruction::Op(OP_EQUALVERIFY));
        assert_eq!(instrs[3], Instruction::Op(OP_PUSHNUM_1));
        assert_eq!(
            script.to_asm().unwrap(),
            "OP_SHA256 936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af \
             OP_EQUALVERIFY OP_1"
        );
    }

    #[test]
    fn truncated_push_detected() {
        let script = ScriptBytes::from_hex("20aabb").unwrap();
        assert!(script.instructions().any(|i| i.is_err()));
        assert!(script.to_asm().is_err());
    }
}
