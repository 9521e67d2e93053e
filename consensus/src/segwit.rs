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

use std::vec;

use amplify::confinement::Confined;
use amplify::Bytes32StrRev;

use crate::opcodes::*;
use crate::{OpCode, ScriptBytes, ScriptPubkey, VarIntArray};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub enum SegwitError {
    /// witness version {0} is not supported: only v0 and v1 (taproot)
    /// witness outputs are used by this library.
    UnsupportedWitnessVersion(u8),
    /// Bitcoin script opcode does not match any known witness version, the
    /// script is malformed.
    MalformedWitnessVersion,
    /// The witness program must be between 2 and 40 bytes in length.
    InvalidWitnessProgramLength(usize),
    /// A v0 witness program must be either of length 20 or 32.
    InvalidSegwitV0ProgramLength(usize),
    /// A taproot (v1) witness program must be 32 bytes.
    InvalidTaprootProgramLength(usize),
}

/// Version of the witness program.
///
/// First byte of `scriptPubkey` in transaction output for transactions
/// starting with 0 and 0x51 (inclusive).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[repr(u8)]
pub enum WitnessVer {
    /// Initial version of witness program. Used for P2WPKH and P2WSH outputs.
    #[display("segwit0")]
    V0 = OP_PUSHBYTES_0,

    /// Version of witness program used for Taproot P2TR outputs.
    #[display("segwit1")]
    V1 = OP_PUSHNUM_1,
}

impl WitnessVer {
    /// Converts bitcoin script opcode into [`WitnessVer`] variant.
    ///
    /// # Errors
    /// If the opcode does not correspond to any witness version used by this
    /// library, errors with [`SegwitError::MalformedWitnessVersion`].
    pub fn from_op_code(op_code: OpCode) -> Result<Self, SegwitError> {
        match op_code as u8 {
            OP_PUSHBYTES_0 => Ok(WitnessVer::V0),
            OP_PUSHNUM_1 => Ok(WitnessVer::V1),
            _ => Err(SegwitError::MalformedWitnessVersion),
        }
    }

    /// Converts witness version ordinal number into [`WitnessVer`] variant.
    ///
    /// # Errors
    /// If the witness version number is not 0 or 1, errors with
    /// [`SegwitError::UnsupportedWitnessVersion`].
    pub fn from_version_no(no: u8) -> Result<Self, SegwitError> {
        match no {
            0 => Ok(WitnessVer::V0),
            1 => Ok(WitnessVer::V1),
            unsupported => Err(SegwitError::UnsupportedWitnessVersion(unsupported)),
        }
    }

    /// Converts [`WitnessVer`] instance into corresponding Bitcoin op-code.
    pub fn op_code(self) -> OpCode {
        match self {
            WitnessVer::V0 => OpCode::PushBytes0,
            WitnessVer::V1 => OpCode::PushNum1,
        }
    }

    /// Converts [`WitnessVer`] into ordinal version number.
    pub fn version_no(self) -> u8 {
        match self {
            WitnessVer::V0 => 0,
            WitnessVer::V1 => 1,
        }
    }
}

/// Witness program as defined in BIP141.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WitnessProgram {
    /// The witness program version.
    version: WitnessVer,
    /// The witness program. (Between 2 and 40 bytes)
    program: Confined<Vec<u8>, 2, 40>,
}

impl WitnessProgram {
    /// Creates a new witness program.
    pub fn new(version: WitnessVer, program: Vec<u8>) -> Result<Self, SegwitError> {
        let len = program.len();
        let program = Confined::try_from(program)
            .map_err(|_| SegwitError::InvalidWitnessProgramLength(len))?;

        // Specific segwit v0 check. These addresses can never spend funds
        // sent to them.
        if version == WitnessVer::V0 && (program.len() != 20 && program.len() != 32) {
            return Err(SegwitError::InvalidSegwitV0ProgramLength(program.len()));
        }
        if version == WitnessVer::V1 && program.len() != 32 {
            return Err(SegwitError::InvalidTaprootProgramLength(program.len()));
        }

        Ok(WitnessProgram { version, program })
    }

    /// Returns the witness program version.
    pub fn version(&self) -> WitnessVer { self.version }

    /// Returns the witness program.
    pub fn program(&self) -> &[u8] { &self.program }
}

impl ScriptPubkey {
    pub fn p2wpkh(hash: impl Into<[u8; 20]>) -> Self {
        Self::with_witness_program_unchecked(WitnessVer::V0, &hash.into())
    }

    pub fn is_p2wpkh(&self) -> bool {
        self.len() == 22 && self[0] == WitnessVer::V0.op_code() as u8 && self[1] == OP_PUSHBYTES_20
    }

    /// Generates the scriptPubkey matching a given [`WitnessProgram`].
    pub fn from_witness_program(witness_program: &WitnessProgram) -> Self {
        Self::with_witness_program_unchecked(witness_program.version, witness_program.program())
    }

    /// Generates a witness-program scriptPubkey with a given [`WitnessVer`]
    /// and the program bytes. Does not do any checks on version or program
    /// length.
    pub(crate) fn with_witness_program_unchecked(ver: WitnessVer, prog: &[u8]) -> Self {
        let mut script = Self::with_capacity(ScriptBytes::len_for_slice(prog.len()) + 2);
        script.push_opcode(ver.op_code());
        script.push_slice(prog);
        script
    }

    /// Checks whether a script pubkey is a Segregated Witness (segwit)
    /// program.
    #[inline]
    pub fn is_witness_program(&self) -> bool {
        // A scriptPubKey (or redeemScript as defined in BIP16/P2SH) that
        // consists of a 1-byte push opcode (for 0 to 16) followed by a data
        // push between 2 and 40 bytes gets a new special meaning. The value
        // of the first push is called the "version byte". The following byte
        // vector pushed is called the "witness program".
        let script_len = self.len();
        if !(4..=42).contains(&script_len) {
            return false;
        }
        let version_matches =
            self[0] == OP_PUSHBYTES_0 || (OP_PUSHNUM_1..=OP_PUSHNUM_16).contains(&self[0]);
        let push_opbyte = self[1]; // Second byte push opcode 2-40 bytes
        version_matches
            && push_opbyte >= OP_PUSHBYTES_2
            && push_opbyte <= OP_PUSHBYTES_40
            // Check that the rest of the script has the correct size
            && script_len - 2 == push_opbyte as usize
    }
}

/// Witness transaction id, the double-SHA256 of the full segwit transaction
/// serialization.
#[derive(Wrapper, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[wrapper(BorrowSlice, Index, RangeOps, Debug, Hex, Display, FromStr)]
pub struct Wtxid(
    #[from]
    #[from([u8; 32])]
    Bytes32StrRev,
);

impl Wtxid {
    #[inline]
    pub fn from_byte_array(data: [u8; 32]) -> Self { Self(Bytes32StrRev::from(data)) }
    #[inline]
    pub fn to_byte_array(&self) -> [u8; 32] { self.0.to_byte_array() }
}

/// Witness stack of a single transaction input.
#[derive(Wrapper, Clone, Eq, PartialEq, Hash, Debug, From, Default)]
#[wrapper(Deref, Index, RangeOps)]
pub struct Witness(VarIntArray<VarIntArray<u8>>);

impl IntoIterator for Witness {
    type Item = VarIntArray<u8>;
    type IntoIter = vec::IntoIter<VarIntArray<u8>>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl Witness {
    pub fn new() -> Self { default!() }

    pub fn elements(&self) -> impl Iterator<Item = &'_ [u8]> {
        self.0.iter().map(|el| el.as_slice())
    }

    pub fn from_consensus_stack(witness: impl IntoIterator<Item = Vec<u8>>) -> Witness {
        let iter = witness.into_iter().map(|vec| {
            VarIntArray::try_from(vec).expect("witness stack element length exceeds 2^64 bytes")
        });
        let stack =
            VarIntArray::try_from_iter(iter).expect("witness stack size exceeds 2^64 bytes");
        Witness(stack)
    }

    pub(crate) fn as_var_int_array(&self) -> &VarIntArray<VarIntArray<u8>> { &self.0 }
}

#[cfg(feature = "serde")]
mod _serde {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::*;
    use crate::ScriptBytes;

    impl Serialize for Witness {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where S: Serializer {
            let mut ser = serializer.serialize_seq(Some(self.len()))?;
            for el in &self.0 {
                ser.serialize_element(&ScriptBytes::from(el.clone()))?;
            }
            ser.end()
        }
    }

    impl<'de> Deserialize<'de> for Witness {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where D: Deserializer<'de> {
            let data = Vec::<ScriptBytes>::deserialize(deserializer)?;
            Ok(Witness::from_consensus_stack(data.into_iter().map(ScriptBytes::into_vec)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn witness_program_lengths() {
        assert!(WitnessProgram::new(WitnessVer::V0, vec![0u8; 20]).is_ok());
        assert!(WitnessProgram::new(WitnessVer::V0, vec![0u8; 32]).is_ok());
        assert!(WitnessProgram::new(WitnessVer::V0, vec![0u8; 25]).is_err());
        assert!(WitnessProgram::new(WitnessVer::V1, vec![0u8; 32]).is_ok());
        assert!(WitnessProgram::new(WitnessVer::V1, vec![0u8; 20]).is_err());
        assert!(WitnessProgram::new(WitnessVer::V0, vec![0u8; 50]).is_err());
    }

    #[test]
    fn witness_program_detection() {
        let spk = ScriptPubkey::p2wpkh([0xAAu8; 20]);
        assert!(spk.is_p2wpkh());
        assert!(spk.is_witness_program());
        assert!(!spk.is_p2pkh());
    }

    #[test]
    fn witness_stack() {
        let witness = Witness::from_consensus_stack([vec![1u8, 2], vec![3u8]]);
        let elements = witness.elements().collect::<Vec<_>>();
        assert_eq!(elements, vec![&[1u8, 2][..], &[3u8][..]]);
    }
}
