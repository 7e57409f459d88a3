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

use std::time::Duration;

use crate::syntax::{TemplateSyntax, MAX_DEPTH};

/// A general configuration object for the
/// [ExpressionEngine](crate::engine::ExpressionEngine).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub struct EngineConfig {
    /// If set to true, the engine's parsers and type checkers run in
    /// dedicated worker threads. Otherwise, a single backend serves the
    /// callers in their own threads, one caller at a time.
    ///
    /// The default value is true unless the build target is a wasm target.
    /// For wasm targets, the default value is false.
    pub multi_thread: bool,

    /// The number of worker threads in the multi-thread mode.
    ///
    /// The requests of the same Profile are always served by the same
    /// worker. Values less than one are treated as one.
    ///
    /// The default value is 4.
    pub workers: usize,

    /// The default time limit of a compilation request.
    ///
    /// The default value is 5 seconds.
    pub compile_timeout: Duration,

    /// The default time limit of a code completion request.
    ///
    /// The default value is 500 milliseconds.
    pub completion_timeout: Duration,

    /// The markers of the expression fragments in template mode.
    pub template: TemplateSyntax,

    /// The maximum nesting depth of the expression syntax tree.
    ///
    /// Deeper expressions are rejected with the
    /// [DepthLimit](crate::analysis::IssueCode::DepthLimit) syntax issue
    /// before type checking. Values above 256 are treated as 256.
    ///
    /// The default value is 128.
    pub max_depth: usize,
}

impl Default for EngineConfig {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// The default constructor for this configuration object.
    #[inline(always)]
    pub const fn new() -> Self {
        let multi_thread;

        #[cfg(not(target_family = "wasm"))]
        {
            multi_thread = true;
        }

        #[cfg(target_family = "wasm")]
        {
            multi_thread = false;
        }

        Self {
            multi_thread,
            workers: 4,
            compile_timeout: Duration::from_secs(5),
            completion_timeout: Duration::from_millis(500),
            template: TemplateSyntax::new(),
            max_depth: MAX_DEPTH,
        }
    }

    /// A configuration that runs everything in the callers' threads.
    #[inline(always)]
    pub const fn single_thread() -> Self {
        let mut config = Self::new();

        config.multi_thread = false;

        config
    }
}
