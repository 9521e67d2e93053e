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

//! Taproot script tree toolkit: semantic leaf descriptors, a fluent tree
//! builder compiling them into tapscripts, the frozen [`TaprootProgram`] with
//! its address and Merkle structure, and the [`SpendBuilder`] assembling and
//! signing transactions spending the program outputs by key or by script
//! path.

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
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

/// Re-export of the consensus primitives crate.
pub extern crate tbc;

mod leaf;
mod builder;
mod program;
mod spend;
mod utxo;

pub use builder::{BuildError, TapTree};
pub use leaf::{LeafDescriptor, LeafKind, LeafRef};
pub use program::TaprootProgram;
pub use spend::{Spend, SpendBuilder, SpendError};
pub use utxo::{select_largest_first, UtxoFact};
