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
use std::str::FromStr;

use bech32::{segwit, Fe32, Hrp};

use crate::{InvalidPubkey, OutputPk, PubkeyHash, ScriptPubkey, WPubkeyHash};

/// Bitcoin network kind, defining address encoding parameters.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Default)]
#[display(lowercase)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Signet,
    Regtest,
}

/// unknown network name '{0}'; expected one of mainnet, testnet, signet or
/// regtest.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub struct NetworkParseError(String);

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            unknown => Err(NetworkParseError(unknown.to_owned())),
        }
    }
}

impl Network {
    /// Human-readable part used by segwit addresses on this network.
    pub fn hrp(self) -> Hrp {
        match self {
            Network::Mainnet => bech32::hrp::BC,
            // signet shares the testnet HRP
            Network::Testnet | Network::Signet => bech32::hrp::TB,
            Network::Regtest => bech32::hrp::BCRT,
        }
    }

    fn from_hrp(hrp: Hrp) -> Option<Self> {
        if hrp == bech32::hrp::BC {
            Some(Network::Mainnet)
        } else if hrp == bech32::hrp::TB {
            Some(Network::Testnet)
        } else if hrp == bech32::hrp::BCRT {
            Some(Network::Regtest)
        } else {
            None
        }
    }

    /// Base58 version byte for P2PKH addresses.
    pub const fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet | Network::Signet | Network::Regtest => 0x6f,
        }
    }

    pub const fn is_testnet(self) -> bool { !matches!(self, Network::Mainnet) }
}

/// Address decoding error.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum AddressError {
    /// wrong bech32 address encoding: {0}
    #[from]
    Bech32(segwit::DecodeError),

    /// wrong Base58 address encoding: {0}
    #[from]
    Base58(bs58::decode::Error),

    /// address HRP '{0}' does not belong to a known bitcoin network.
    UnknownHrp(String),

    /// witness version {0} addresses are not supported as destinations.
    UnsupportedWitnessVersion(u8),

    /// witness program has invalid length {0} for its witness version.
    WrongProgramLength(usize),

    /// taproot output key is not a valid x-only public key.
    #[from(InvalidPubkey<32>)]
    InvalidOutputKey,

    /// unknown Base58 address version byte {0:#04x}.
    UnknownAddressVersion(u8),

    /// Base58 address payload has invalid length {0}.
    WrongBase58Length(usize),
}

/// Payload of a destination address: the data committed into the
/// scriptPubkey.
///
/// P2TR addresses can be both produced and parsed; legacy P2PKH and segwit v0
/// P2WPKH appear only as spend destinations and are supported for decoding
/// and scriptPubkey construction.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum AddressPayload {
    /// Legacy pay-to-pubkey-hash.
    #[from]
    Pkh(PubkeyHash),

    /// Segwit v0 pay-to-witness-pubkey-hash.
    #[from]
    Wpkh(WPubkeyHash),

    /// Taproot output.
    #[from]
    Tr(OutputPk),
}

impl AddressPayload {
    pub fn script_pubkey(&self) -> ScriptPubkey {
        match self {
            AddressPayload::Pkh(hash) => ScriptPubkey::p2pkh(*hash),
            AddressPayload::Wpkh(hash) => ScriptPubkey::p2wpkh(*hash),
            AddressPayload::Tr(output_key) => ScriptPubkey::p2tr_tweaked(*output_key),
        }
    }
}

/// Bitcoin address: a network-tagged [`AddressPayload`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Address {
    pub payload: AddressPayload,
    pub network: Network,
}

impl Address {
    pub fn new(payload: impl Into<AddressPayload>, network: Network) -> Self {
        Address {
            payload: payload.into(),
            network,
        }
    }

    /// Constructs a taproot address for a tweaked output key.
    pub fn p2tr(network: Network, output_key: OutputPk) -> Self {
        Address::new(output_key, network)
    }

    pub fn script_pubkey(&self) -> ScriptPubkey { self.payload.script_pubkey() }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.payload {
            AddressPayload::Pkh(hash) => {
                let mut payload = Vec::with_capacity(21);
                payload.push(self.network.p2pkh_version());
                payload.extend_from_slice(&<[u8; 20]>::from(hash));
                f.write_str(&bs58::encode(payload).with_check().into_string())
            }
            AddressPayload::Wpkh(hash) => {
                let addr = segwit::encode(self.network.hrp(), Fe32::Q, &<[u8; 20]>::from(hash))
                    .expect("20-byte witness program");
                f.write_str(&addr)
            }
            AddressPayload::Tr(output_key) => {
                let addr = segwit::encode(self.network.hrp(), Fe32::P, &output_key.serialize())
                    .expect("32-byte witness program");
                f.write_str(&addr)
            }
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        if ["bc1", "tb1", "bcrt1"].iter().any(|prefix| lower.starts_with(prefix)) {
            let (hrp, version, program) = segwit::decode(s)?;
            let network = Network::from_hrp(hrp)
                .ok_or_else(|| AddressError::UnknownHrp(hrp.to_string()))?;
            let payload = match version.to_u8() {
                0 if program.len() == 20 => {
                    AddressPayload::Wpkh(WPubkeyHash::from(<[u8; 20]>::try_from(&program[..])
                        .expect("20-byte program")))
                }
                0 => return Err(AddressError::WrongProgramLength(program.len())),
                1 if program.len() == 32 => {
                    let key = <[u8; 32]>::try_from(&program[..]).expect("32-byte program");
                    AddressPayload::Tr(OutputPk::from_byte_array(key)?)
                }
                1 => return Err(AddressError::WrongProgramLength(program.len())),
                future => return Err(AddressError::UnsupportedWitnessVersion(future)),
            };
            return Ok(Address { payload, network });
        }

        let data = bs58::decode(s).with_check(None).into_vec()?;
        let (version, payload) = data.split_first().ok_or(AddressError::WrongBase58Length(0))?;
        if payload.len() != 20 {
            return Err(AddressError::WrongBase58Length(payload.len()));
        }
        let hash = PubkeyHash::from(<[u8; 20]>::try_from(payload).expect("20-byte payload"));
        let network = match version {
            0x00 => Network::Mainnet,
            0x6f => Network::Testnet,
            unknown => return Err(AddressError::UnknownAddressVersion(*unknown)),
        };
        Ok(Address::new(hash, network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2tr_round_trip() {
        let addr = "tb1pjfdm902y2adr08qnn4tahxjvp6x5selgmvzx63yfqk2hdey02yvqjcr29q";
        let parsed = Address::from_str(addr).unwrap();
        assert_eq!(parsed.network, Network::Testnet);
        assert!(matches!(parsed.payload, AddressPayload::Tr(_)));
        assert_eq!(parsed.to_string(), addr);
        assert_eq!(addr.len(), 62);
        assert!(parsed.script_pubkey().is_p2tr());
    }

    #[test]
    fn p2wpkh_decoding() {
        let addr = "tb1qr65sfajzw8f4rh8d593zm6wryxcukulygv2209";
        let parsed = Address::from_str(addr).unwrap();
        assert!(matches!(parsed.payload, AddressPayload::Wpkh(_)));
        let spk = parsed.script_pubkey();
        assert!(spk.is_p2wpkh());
        assert_eq!(
            format!("{:x}", spk.as_script_bytes()),
            "00141ea904f64271d351dceda1622de9c321b1cb73e4"
        );
        assert_eq!(parsed.to_string(), addr);
    }

    #[test]
    fn p2pkh_decoding() {
        // mainnet genesis-era style address
        let addr = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
        let parsed = Address::from_str(addr).unwrap();
        assert_eq!(parsed.network, Network::Mainnet);
        assert!(matches!(parsed.payload, AddressPayload::Pkh(_)));
        assert!(parsed.script_pubkey().is_p2pkh());
        assert_eq!(parsed.to_string(), addr);
    }

    #[test]
    fn wrong_checksum_rejected() {
        assert!(Address::from_str("tb1qr65sfajzw8f4rh8d593zm6wryxcukulygv2208").is_err());
        assert!(Address::from_str("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb").is_err());
    }

    #[test]
    fn network_hrps() {
        for (network, expect) in [
            (Network::Mainnet, "bc"),
            (Network::Testnet, "tb"),
            (Network::Signet, "tb"),
            (Network::Regtest, "bcrt"),
        ] {
            assert_eq!(network.hrp().to_string(), expect);
        }
    }
}
