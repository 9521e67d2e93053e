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

use tbc::{Outpoint, Sats, Txid, Vout};

/// An unspent output fact as reported by an external UTXO provider.
///
/// The core never queries providers itself; callers deserialize provider
/// responses into this record. Different providers name the amount field
/// differently (`value` vs `amount`), which the serde form normalizes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
#[display("{txid}:{vout} ({amount} sats)")]
pub struct UtxoFact {
    pub txid: Txid,
    pub vout: Vout,
    #[cfg_attr(feature = "serde", serde(alias = "value"))]
    pub amount: Sats,
}

impl UtxoFact {
    pub fn new(txid: Txid, vout: impl Into<Vout>, amount: impl Into<Sats>) -> Self {
        UtxoFact {
            txid,
            vout: vout.into(),
            amount: amount.into(),
        }
    }

    #[inline]
    pub fn outpoint(&self) -> Outpoint { Outpoint::new(self.txid, self.vout) }
}

/// Greedy largest-first coin selection.
///
/// Returns the smallest prefix of the amount-descending UTXO ordering which
/// covers `target`, or an empty vector when the total balance is
/// insufficient.
pub fn select_largest_first(utxos: &[UtxoFact], target: Sats) -> Vec<UtxoFact> {
    let total = utxos.iter().map(|utxo| utxo.amount).sum::<Sats>();
    if total < target {
        return vec![];
    }

    let mut sorted = utxos.to_vec();
    sorted.sort_by(|a, b| b.amount.cmp(&a.amount));

    let mut selected = vec![];
    let mut acc = Sats::ZERO;
    for utxo in sorted {
        acc = acc.saturating_add(utxo.amount);
        selected.push(utxo);
        if acc >= target {
            break;
        }
    }
    selected
}
