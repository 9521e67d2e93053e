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

//! Partially-signed bitcoin transactions for taproot spends: the BIP-174
//! (v0) and BIP-370 (v2) key-value containers with the BIP-371 taproot
//! per-input fields, a multi-party signing workflow, finalization into
//! witness stacks and extraction of the broadcastable transaction.

// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code
)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[macro_use]
extern crate amplify;

/// Re-export of the script tree and spend builder crate.
pub extern crate taptree;
/// Re-export of the consensus primitives crate.
pub extern crate tbc;

pub mod keys;
mod maps;
mod coding;
mod sign;

pub use coding::{CodecError, PsbtParseError};
pub use maps::{Input, Output, Psbt, PsbtV2, UnknownKey};
pub use sign::{SignError, ToPsbt};
