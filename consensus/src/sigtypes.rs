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

use secp256k1::schnorr;

/// the provided value {value} for {matter} is non-standard; while it is
/// accepted by the bitcoin consensus rules, the software prohibits from using
/// it.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub struct NonStandardValue<T: std::fmt::Debug + std::fmt::Display> {
    pub value: T,
    pub matter: &'static str,
}

impl<T: std::fmt::Debug + std::fmt::Display> NonStandardValue<T> {
    pub const fn with(value: T, matter: &'static str) -> Self { NonStandardValue { value, matter } }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[repr(u8)]
pub enum SighashFlag {
    /// 0x1: Sign all outputs.
    #[default]
    All = 0x01,
    /// 0x2: Sign no outputs --- anyone can choose the destination.
    None = 0x02,
    /// 0x3: Sign the output whose index matches this input's index. If none
    /// exists, sign the hash
    /// `0000000000000000000000000000000000000000000000000000000000000001`.
    /// (This rule is probably an unintentional C++ism, but it's consensus so
    /// we have to follow it.)
    Single = 0x03,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct SighashType {
    pub flag: SighashFlag,
    pub anyone_can_pay: bool,
}

impl SighashType {
    pub const fn all() -> Self {
        SighashType {
            flag: SighashFlag::All,
            anyone_can_pay: false,
        }
    }
    pub const fn none() -> Self {
        SighashType {
            flag: SighashFlag::None,
            anyone_can_pay: false,
        }
    }
    pub const fn single() -> Self {
        SighashType {
            flag: SighashFlag::Single,
            anyone_can_pay: false,
        }
    }

    pub const fn all_anyone_can_pay() -> Self {
        SighashType {
            flag: SighashFlag::All,
            anyone_can_pay: true,
        }
    }

    /// Creates a [`SighashType`] from a raw `u32`, limited to the standard
    /// flag values.
    ///
    /// # Errors
    ///
    /// If `n` is a non-standard sighash value.
    pub fn from_standard_u32(n: u32) -> Result<SighashType, NonStandardValue<u32>> {
        let (flag, anyone_can_pay) = match n {
            // Standard sighashes, see https://github.com/bitcoin/bitcoin/blob/b805dbb0b9c90dadef0424e5b3bf86ac308e103e/src/script/interpreter.cpp#L189-L198
            0x01 => (SighashFlag::All, false),
            0x02 => (SighashFlag::None, false),
            0x03 => (SighashFlag::Single, false),
            0x81 => (SighashFlag::All, true),
            0x82 => (SighashFlag::None, true),
            0x83 => (SighashFlag::Single, true),
            non_standard => return Err(NonStandardValue::with(non_standard, "SighashType")),
        };
        Ok(SighashType {
            flag,
            anyone_can_pay,
        })
    }

    /// Converts [`SighashType`] to a `u32` sighash flag.
    ///
    /// The returned value is guaranteed to be a valid according to
    /// standardness rules.
    #[inline]
    pub const fn to_consensus_u32(&self) -> u32 { self.to_consensus_u8() as u32 }

    pub const fn to_consensus_u8(&self) -> u8 {
        let flag = self.flag as u8;
        let mask = (self.anyone_can_pay as u8) << 7;
        flag | mask
    }
}

/// A BIP340 signature-related error.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum SigError {
    /// Non-standard sighash type.
    #[display(inner)]
    #[from]
    SighashType(NonStandardValue<u32>),

    /// empty signature.
    EmptySignature,

    /// invalid BIP340 signature length ({0}).
    Bip340Encoding(usize),

    /// invalid BIP340 signature.
    InvalidSignature,
}

/// BIP-340 signature together with an optional explicit sighash type.
///
/// Serializes to 64 bytes for the default sighash and to 65 bytes when a
/// sighash type byte is carried explicitly.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Bip340Sig {
    /// The underlying Schnorr signature.
    pub sig: schnorr::Signature,
    /// The corresponding hash type.
    pub sighash_type: Option<SighashType>,
}

impl Bip340Sig {
    /// Constructs a signature with the implicit `SIGHASH_DEFAULT` type.
    pub fn sighash_default(sig: schnorr::Signature) -> Self {
        Bip340Sig {
            sig,
            sighash_type: None,
        }
    }

    /// Deserializes from slice following the standardness rules for
    /// [`SighashType`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigError> {
        let (hash_ty, sig) = match bytes.len() {
            0 => return Err(SigError::EmptySignature),
            64 => (None, bytes),
            65 => (Some(bytes[64] as u32), &bytes[..64]),
            invalid => return Err(SigError::Bip340Encoding(invalid)),
        };
        let sighash_type = hash_ty.map(SighashType::from_standard_u32).transpose()?;
        let sig =
            schnorr::Signature::from_slice(sig).map_err(|_| SigError::InvalidSignature)?;
        Ok(Bip340Sig { sig, sighash_type })
    }

    /// Serializes the signature into 64 or 65 bytes.
    pub fn to_vec(self) -> Vec<u8> {
        let mut ser = Vec::<u8>::with_capacity(65);
        ser.extend_from_slice(&self.sig.serialize());
        if let Some(sighash_type) = self.sighash_type {
            ser.push(sighash_type.to_consensus_u8())
        }
        ser
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sighash_type_bytes() {
        assert_eq!(SighashType::all().to_consensus_u8(), 0x01);
        assert_eq!(SighashType::none().to_consensus_u8(), 0x02);
        assert_eq!(SighashType::single().to_consensus_u8(), 0x03);
        assert_eq!(SighashType::all_anyone_can_pay().to_consensus_u8(), 0x81);
        assert!(SighashType::from_standard_u32(0x04).is_err());
        assert_eq!(SighashType::from_standard_u32(0x83).unwrap().flag, SighashFlag::Single);
    }

    #[test]
    fn bip340_sig_lengths() {
        assert_eq!(Bip340Sig::from_bytes(&[]), Err(SigError::EmptySignature));
        assert_eq!(Bip340Sig::from_bytes(&[0u8; 63]), Err(SigError::Bip340Encoding(63)));

        let sig64 = [0x55u8; 64];
        let sig = Bip340Sig::from_bytes(&sig64).unwrap();
        assert_eq!(sig.sighash_type, None);
        assert_eq!(sig.to_vec(), sig64.to_vec());

        let mut sig65 = [0x55u8; 65];
        sig65[64] = 0x01;
        let sig = Bip340Sig::from_bytes(&sig65).unwrap();
        assert_eq!(sig.sighash_type, Some(SighashType::all()));
        assert_eq!(sig.to_vec(), sig65.to_vec());

        let mut bad = [0x55u8; 65];
        bad[64] = 0x04;
        assert!(Bip340Sig::from_bytes(&bad).is_err());
    }
}
