////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

//! # Ad Astra Expressions
//!
//! A sandbox for short, strongly-typed expressions provided by untrusted users
//! as text: business rules, formulas, and string templates that refer to a
//! typed "context" object supplied by the host application.
//!
//! The crate restricts three things at compile time:
//!
//!  - The shape of the expression's syntax tree
//!    ([SyntaxValidator](validation::SyntaxValidator)).
//!  - The set of type members reachable from the expression
//!    ([SymbolValidator](validation::SymbolValidator)).
//!  - The types the expression consumes and produces (the context type and
//!    the result type).
//!
//! These rules are bundled into an immutable [Profile](profile::Profile).
//! Expressions compiled under a Profile by the
//! [ExpressionEngine](engine::ExpressionEngine) are cached, and the resulting
//! [CompiledExpression](interpret::CompiledExpression) objects can be applied
//! to context values concurrently from any number of threads.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ad_astra_expr::{
//!     engine::{EngineConfig, ExpressionEngine},
//!     profile::{NamedSource, Profile},
//!     runtime::TypeRegistry,
//!     syntax::ExpressionMode,
//! };
//!
//! let profile = Profile::build(
//!     "arithmetic",
//!     &NamedSource::new("syntax", "allow literal, binary;"),
//!     &NamedSource::new("symbols", ""),
//!     &NamedSource::new("attributes", ""),
//!     None,
//! )
//! .unwrap();
//!
//! let engine = ExpressionEngine::new(Arc::new(TypeRegistry::new()), EngineConfig::new());
//!
//! let expression = engine
//!     .compile::<i64, i64>(&profile, NamedSource::new("sum", "1 + 1"), ExpressionMode::Plain)
//!     .unwrap();
//!
//! assert_eq!(expression.apply(0).unwrap(), 2);
//! ```
//!
//! The same Profile also drives validator-aware code completion through the
//! [Completer](engine::Completer) objects.

/// Diagnostics, error types, and code completion.
pub mod analysis;

/// The expression engine: compilation cache, worker threads, and
/// configuration.
pub mod engine;

/// Compiled expressions and their execution.
pub mod interpret;

/// Immutable bundles of validation rules.
pub mod profile;

/// The type model: registered types, their members, and runtime values.
pub mod runtime;

mod report;
mod semantics;

/// Lexical and syntax structure of the expression language.
pub mod syntax;

/// Syntax rules, symbol access rules, and symbol attributes.
pub mod validation;

#[cfg(test)]
mod tests;

pub use lady_deirdre;
