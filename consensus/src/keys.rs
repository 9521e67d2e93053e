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

use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;

use amplify::hex::FromHex;
use amplify::{hex, Bytes};
use secp256k1::schnorr::Signature;
use secp256k1::{Keypair, Message, PublicKey, SecretKey, XOnlyPublicKey, SECP256K1};

use crate::{InternalKeypair, InternalPk, Network, TapSighash};

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum PubkeyParseError<const LEN: usize> {
    #[from]
    Hex(hex::Error),
    #[from]
    InvalidPubkey(InvalidPubkey<LEN>),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, From, Error)]
pub enum InvalidPubkey<const LEN: usize> {
    #[from(secp256k1::Error)]
    #[display("invalid public key")]
    Unspecified,

    #[from]
    #[display("invalid public key {0:x}")]
    Specified(Bytes<LEN>),
}

/// Generic taproot x-only (BIP-340) public key - a wrapper around
/// [`XOnlyPublicKey`] providing APIs compatible with the rest of the library.
/// Should be used everywhere when [`InternalPk`] and [`crate::OutputPk`] do
/// not apply: inside tapscripts/leafscripts, PSBT key maps etc.
#[derive(Wrapper, WrapperMut, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Deref, LowerHex, Display)]
#[wrapper_mut(DerefMut)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct XOnlyPk(XOnlyPublicKey);

impl XOnlyPk {
    pub fn from_byte_array(data: [u8; 32]) -> Result<Self, InvalidPubkey<32>> {
        XOnlyPublicKey::from_slice(data.as_ref())
            .map(Self)
            .map_err(|_| InvalidPubkey::Specified(data.into()))
    }

    pub fn to_byte_array(&self) -> [u8; 32] { self.0.serialize() }

    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, InvalidPubkey<33>> {
        Ok(XOnlyPk(XOnlyPublicKey::from_slice(bytes.as_ref())?))
    }

    /// Verifies a BIP-340 signature over a 32-byte message with this key.
    pub fn verify_schnorr(&self, msg: impl Into<Message>, sig: &Signature) -> bool {
        SECP256K1.verify_schnorr(sig, &msg.into(), &self.0).is_ok()
    }
}

impl From<XOnlyPk> for [u8; 32] {
    fn from(pk: XOnlyPk) -> [u8; 32] { pk.to_byte_array() }
}

impl FromStr for XOnlyPk {
    type Err = PubkeyParseError<32>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = <[u8; 32]>::from_hex(s)?;
        let pk = Self::from_byte_array(data)?;
        Ok(pk)
    }
}

/// Compressed secp256k1 public key (33-byte encoding).
#[derive(Wrapper, WrapperMut, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Deref, LowerHex, Display)]
#[wrapper_mut(DerefMut)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct CompressedPk(PublicKey);

impl CompressedPk {
    pub fn from_byte_array(data: [u8; 33]) -> Result<Self, InvalidPubkey<33>> {
        PublicKey::from_slice(&data)
            .map(Self)
            .map_err(|_| InvalidPubkey::Specified(data.into()))
    }
    pub fn to_byte_array(&self) -> [u8; 33] { self.0.serialize() }

    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, InvalidPubkey<33>> {
        Ok(CompressedPk(PublicKey::from_slice(bytes.as_ref())?))
    }
}

impl FromStr for CompressedPk {
    type Err = PubkeyParseError<33>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = <[u8; 33]>::from_hex(s)?;
        let pk = Self::from_byte_array(data)?;
        Ok(pk)
    }
}

/// Auxiliary randomness mode for BIP-340 signing.
///
/// [`AuxRand::Zero`] makes signatures deterministic; signing the same message
/// with the same key always yields the same signature, which the test vectors
/// and the PSBT idempotence guarantees rely upon.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum AuxRand {
    /// Fresh 32 bytes from the thread cryptographic RNG per signature.
    Random,
    /// All-zero auxiliary randomness (deterministic signatures).
    #[default]
    Zero,
    /// Caller-provided auxiliary randomness.
    Fixed([u8; 32]),
}

impl AuxRand {
    fn to_bytes(self) -> [u8; 32] {
        match self {
            AuxRand::Random => rand::random(),
            AuxRand::Zero => [0u8; 32],
            AuxRand::Fixed(aux) => aux,
        }
    }
}

/// WIF (Base58Check) decoding error.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum WifError {
    /// incorrect Base58 encoding or checksum in WIF string: {0}
    #[from]
    Base58(bs58::decode::Error),

    /// WIF payload has invalid length {0}.
    Length(usize),

    /// unknown WIF version byte {0:#04x}.
    Version(u8),

    /// WIF contains an invalid secret key (zero or above the curve order).
    InvalidSecretKey,
}

/// Private key for taproot signing.
///
/// Holds the 32-byte scalar together with the network it belongs to. Equality
/// is defined by the x-only public key, matching the key identity used in
/// taproot scripts. The secret scalar is wiped when the value is dropped and
/// is never printed by `Debug`.
#[derive(Clone)]
pub struct PrivKey {
    pub network: Network,
    key: SecretKey,
}

impl Drop for PrivKey {
    fn drop(&mut self) { self.key.non_secure_erase(); }
}

impl PartialEq for PrivKey {
    fn eq(&self, other: &Self) -> bool { self.x_only() == other.x_only() }
}

impl Eq for PrivKey {}

impl Debug for PrivKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivKey")
            .field("network", &self.network)
            .field("xonly", &self.x_only())
            .finish_non_exhaustive()
    }
}

impl PrivKey {
    pub fn with(network: Network, key: SecretKey) -> Self { PrivKey { network, key } }

    /// Parses a Base58Check WIF string; the network is taken from the version
    /// byte (`0x80` mainnet, `0xef` testnet-family networks).
    pub fn from_wif(wif: &str) -> Result<Self, WifError> {
        let data = bs58::decode(wif).with_check(None).into_vec()?;
        let (version, payload) = data.split_first().ok_or(WifError::Length(0))?;
        let network = match version {
            0x80 => Network::Mainnet,
            0xef => Network::Testnet,
            unknown => return Err(WifError::Version(*unknown)),
        };
        let secret = match payload.len() {
            32 => payload,
            // compressed-pubkey flag
            33 if payload[32] == 0x01 => &payload[..32],
            len => return Err(WifError::Length(len)),
        };
        let key = SecretKey::from_slice(secret).map_err(|_| WifError::InvalidSecretKey)?;
        Ok(PrivKey { network, key })
    }

    /// Parses a raw hex-encoded 32-byte secret scalar.
    pub fn from_hex(network: Network, s: &str) -> Result<Self, WifError> {
        let data = <[u8; 32]>::from_hex(s).map_err(|_| WifError::InvalidSecretKey)?;
        Self::from_byte_array(network, data)
    }

    pub fn from_byte_array(network: Network, data: [u8; 32]) -> Result<Self, WifError> {
        let key = SecretKey::from_slice(&data).map_err(|_| WifError::InvalidSecretKey)?;
        Ok(PrivKey { network, key })
    }

    /// Encodes the key as a compressed-pubkey WIF string.
    pub fn to_wif(&self) -> String {
        let version = match self.network {
            Network::Mainnet => 0x80u8,
            Network::Testnet | Network::Signet | Network::Regtest => 0xef,
        };
        let mut payload = Vec::with_capacity(34);
        payload.push(version);
        payload.extend_from_slice(&self.key.secret_bytes());
        payload.push(0x01);
        bs58::encode(payload).with_check().into_string()
    }

    #[inline]
    pub fn public_key(&self) -> PublicKey { self.key.public_key(SECP256K1) }

    #[inline]
    pub fn compressed_pk(&self) -> CompressedPk { CompressedPk(self.public_key()) }

    #[inline]
    pub fn x_only(&self) -> XOnlyPk { XOnlyPk(self.public_key().x_only_public_key().0) }

    #[inline]
    pub fn to_internal_pk(&self) -> InternalPk { InternalPk::from(self.x_only()) }

    #[inline]
    pub fn keypair(&self) -> Keypair { Keypair::from_secret_key(SECP256K1, &self.key) }

    #[inline]
    pub fn internal_keypair(&self) -> InternalKeypair { InternalKeypair::from(self.keypair()) }

    /// Produces a BIP-340 signature over a 32-byte sighash.
    ///
    /// Signing negates the secret internally whenever the public key has odd
    /// parity, per BIP-340.
    pub fn sign_schnorr(&self, sighash: TapSighash, aux: AuxRand) -> Signature {
        SECP256K1.sign_schnorr_with_aux_rand(
            &Message::from(sighash),
            &self.keypair(),
            &aux.to_bytes(),
        )
    }

    /// Signs with the key-path tweaked secret: the taproot tweak for the
    /// given Merkle root (empty for key-path-only outputs) is added to the
    /// scalar before signing.
    pub fn sign_schnorr_tweaked(
        &self,
        sighash: TapSighash,
        merkle_root: Option<crate::TapNodeHash>,
        aux: AuxRand,
    ) -> Signature {
        let (pair, _) = self.internal_keypair().to_output_keypair(merkle_root);
        SECP256K1.sign_schnorr_with_aux_rand(&Message::from(sighash), &pair, &aux.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_WIF: &str = "cRxebG1hY6vVgS9CSLNaEbEJaXkpZvc6nFeqqGT7v6gcW7MbzKNT";
    const BOB_WIF: &str = "cSNdLFDf3wjx1rswNL2jKykbVkC6o56o5nYZi4FUkWKjFn2Q5DSG";

    #[test]
    fn wif_decoding() {
        let alice = PrivKey::from_wif(ALICE_WIF).unwrap();
        assert_eq!(alice.network, Network::Testnet);
        assert_eq!(
            alice.x_only().to_string(),
            "50be5fc44ec580c387bf45df275aaa8b27e2d7716af31f10eeed357d126bb4d3"
        );
        let bob = PrivKey::from_wif(BOB_WIF).unwrap();
        assert_eq!(
            bob.x_only().to_string(),
            "84b5951609b76619a1ce7f48977b4312ebe226987166ef044bfb374ceef63af5"
        );
    }

    #[test]
    fn wif_round_trip() {
        let alice = PrivKey::from_wif(ALICE_WIF).unwrap();
        assert_eq!(alice.to_wif(), ALICE_WIF);
    }

    #[test]
    fn wif_rejects_garbage() {
        assert!(PrivKey::from_wif("definitely not a key").is_err());
        // valid base58check but wrong version byte
        let bad = bs58::encode([0x42u8; 34]).with_check().into_string();
        assert!(matches!(PrivKey::from_wif(&bad), Err(WifError::Version(0x42))));
    }

    #[test]
    fn hex_round_trip() {
        let alice = PrivKey::from_wif(ALICE_WIF).unwrap();
        let hex = "82a3ddde60ca9ebece3ef5af4e02b0f44113703520895047c32d081d762e29ac";
        let again = PrivKey::from_hex(Network::Testnet, hex).unwrap();
        assert_eq!(alice, again);
    }

    #[test]
    fn zero_scalar_rejected() {
        assert!(PrivKey::from_byte_array(Network::Testnet, [0u8; 32]).is_err());
    }

    #[test]
    fn schnorr_sign_verify() {
        let alice = PrivKey::from_wif(ALICE_WIF).unwrap();
        let sighash = TapSighash::from([7u8; 32]);
        let sig = alice.sign_schnorr(sighash, AuxRand::Zero);
        assert!(alice.x_only().verify_schnorr(sighash, &sig));
        // deterministic under zero aux randomness
        let sig2 = alice.sign_schnorr(sighash, AuxRand::Zero);
        assert_eq!(sig, sig2);
        // wrong key fails
        let bob = PrivKey::from_wif(BOB_WIF).unwrap();
        assert!(!bob.x_only().verify_schnorr(sighash, &sig));
    }

    #[test]
    fn debug_hides_secret() {
        let alice = PrivKey::from_wif(ALICE_WIF).unwrap();
        let debug = format!("{alice:?}");
        assert!(!debug.contains("82a3ddde"));
    }
}
