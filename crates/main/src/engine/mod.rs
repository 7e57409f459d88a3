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

//! The expression compilation service.
//!
//! The [ExpressionEngine] compiles expressions under the rules of a
//! [Profile], caches the results, and serves code completion requests.

mod backend;
mod cache;
mod config;
mod tasks;

use std::{
    any::Any,
    sync::{mpsc::sync_channel, Arc, Mutex},
    time::{Duration, Instant},
};

use lady_deirdre::lexis::Site;
use log::{error, info, trace, warn};

pub use crate::engine::config::EngineConfig;
use crate::{
    analysis::{
        CompileError,
        CompileResult,
        CompletionError,
        Completions,
        Diagnostic,
        IssueCode,
        SymbolInfo,
        TypeIssue,
    },
    engine::{
        backend::{Backend, BackendConfig, CompileJob, CompletionJob, Job},
        cache::{CacheKey, CompilationCache, Lookup, Outcome, Wait},
        tasks::{Task, TaskHandle},
    },
    interpret::{CompiledExpression, ExpressionArtifact},
    profile::{NamedSource, Profile},
    report::ENGINE_LOG,
    runtime::{TypeName, TypeRegistry},
    syntax::ExpressionMode,
};

/// A compiler and cache of expressions.
///
/// The engine is bound to a [TypeRegistry] that defines the types and members
/// available to the expressions. Compilation requests with equal keys
/// (Profile, source code, context type, result type, and mode) share a
/// single compilation: concurrent callers wait for the first one, and later
/// callers receive the cached artifact.
///
/// The engine is [Send] and [Sync]. Clones of the engine share the cache and
/// the worker threads, which finish when the last clone (or
/// [Completer]) is dropped.
///
/// ```rust
/// use std::sync::Arc;
///
/// use ad_astra_expr::{
///     engine::{EngineConfig, ExpressionEngine},
///     profile::{NamedSource, Profile},
///     runtime::TypeRegistry,
///     syntax::ExpressionMode,
/// };
///
/// let profile = Profile::build(
///     "strings",
///     &NamedSource::new("syntax", "default allow;"),
///     &NamedSource::new("symbols", "allow string.*;"),
///     &NamedSource::new("attributes", ""),
///     None,
/// )
/// .unwrap();
///
/// let engine = ExpressionEngine::new(Arc::new(TypeRegistry::new()), EngineConfig::new());
///
/// let first = engine
///     .compile::<String, i64>(&profile, NamedSource::new("len", "context.length"), ExpressionMode::Plain)
///     .unwrap();
///
/// let second = engine
///     .compile::<String, i64>(&profile, NamedSource::new("len", "context.length"), ExpressionMode::Plain)
///     .unwrap();
///
/// assert!(first.ptr_eq(&second));
/// assert_eq!(engine.compilations(), 1);
/// assert_eq!(first.apply(String::from("abc")).unwrap(), 3);
/// ```
#[derive(Clone)]
pub struct ExpressionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    registry: Arc<TypeRegistry>,
    config: EngineConfig,
    cache: CompilationCache,
    workers: Workers,
}

enum Workers {
    Local(Mutex<Backend>),
    Remote(Vec<TaskHandle<Job>>),
}

impl std::fmt::Debug for ExpressionEngine {
    #[inline]
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExpressionEngine")
            .field("config", &self.inner.config)
            .field("compilations", &self.compilations())
            .finish_non_exhaustive()
    }
}

impl ExpressionEngine {
    /// Creates an engine, and spawns its worker threads if the
    /// [multi_thread](EngineConfig::multi_thread) option is enabled.
    pub fn new(registry: Arc<TypeRegistry>, config: EngineConfig) -> Self {
        let backend_config = || BackendConfig {
            registry: registry.clone(),
            template: config.template,
            max_depth: config.max_depth,
        };

        let workers = match config.multi_thread {
            false => Workers::Local(Mutex::new(Backend::init(backend_config()))),

            true => {
                let mut handles = Vec::with_capacity(config.workers.max(1));
                let mut fallback = None;

                for index in 0..config.workers.max(1) {
                    match Backend::spawn(format!("ad-astra-expr-{index}"), backend_config()) {
                        Ok(handle) => handles.push(handle),

                        Err(backend) => {
                            fallback = Some(backend);
                            break;
                        }
                    }
                }

                match fallback {
                    None => Workers::Remote(handles),

                    Some(backend) => {
                        warn!(
                            target: ENGINE_LOG,
                            "Worker threads are not available. Falling back to single-thread mode.",
                        );

                        Workers::Local(Mutex::new(backend))
                    }
                }
            }
        };

        match &workers {
            Workers::Local(_) => info!(target: ENGINE_LOG, "Engine started in single-thread mode."),

            Workers::Remote(handles) => info!(
                target: ENGINE_LOG,
                "Engine started with {} worker threads.",
                handles.len(),
            ),
        }

        Self {
            inner: Arc::new(EngineInner {
                registry,
                config,
                cache: CompilationCache::new(),
                workers,
            }),
        }
    }

    #[inline(always)]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    #[inline(always)]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Compiles the `source` under the `profile` into an expression that maps
    /// values of type `C` to values of type `R`.
    ///
    /// Both `C` and `R` must be registered in the engine's [TypeRegistry].
    /// The compilation is limited by the
    /// [compile_timeout](EngineConfig::compile_timeout).
    #[inline(always)]
    pub fn compile<C: Any, R: Any>(
        &self,
        profile: &Profile,
        source: NamedSource,
        mode: ExpressionMode,
    ) -> CompileResult<CompiledExpression<C, R>> {
        self.compile_with_deadline(profile, source, mode, self.default_deadline())
    }

    /// Like [compile](Self::compile), but with an explicit deadline.
    pub fn compile_with_deadline<C: Any, R: Any>(
        &self,
        profile: &Profile,
        source: NamedSource,
        mode: ExpressionMode,
        deadline: Instant,
    ) -> CompileResult<CompiledExpression<C, R>> {
        let context = self.resolve_type::<C>(&source, "context")?;
        let result = self.resolve_type::<R>(&source, "result")?;

        let artifact =
            self.compile_dyn_with_deadline(profile, source, context, result, mode, deadline)?;

        Ok(CompiledExpression::new(artifact))
    }

    /// Compiles the `source` under the `profile` with the context and result
    /// types specified by name.
    #[inline(always)]
    pub fn compile_dyn(
        &self,
        profile: &Profile,
        source: NamedSource,
        context: TypeName,
        result: TypeName,
        mode: ExpressionMode,
    ) -> CompileResult<Arc<ExpressionArtifact>> {
        let deadline = self.default_deadline();

        self.compile_dyn_with_deadline(profile, source, context, result, mode, deadline)
    }

    /// Like [compile_dyn](Self::compile_dyn), but with an explicit deadline.
    ///
    /// If the deadline expires, the function returns
    /// [CompileError::Timeout], and the timed out compilation is not cached.
    pub fn compile_dyn_with_deadline(
        &self,
        profile: &Profile,
        source: NamedSource,
        context: TypeName,
        result: TypeName,
        mode: ExpressionMode,
        deadline: Instant,
    ) -> CompileResult<Arc<ExpressionArtifact>> {
        let key = CacheKey {
            profile: profile.id(),
            source,
            context,
            result,
            mode,
        };

        loop {
            let guard = match self.inner.cache.lookup(&key) {
                Lookup::Leader(guard) => guard,

                Lookup::Follower(flight) => {
                    if let Some(outcome) = flight.peek() {
                        trace!(
                            target: ENGINE_LOG,
                            "[{}] Cache hit for '{}'.",
                            profile.name(),
                            key.source.name,
                        );

                        return outcome;
                    }

                    match flight.wait(deadline) {
                        Wait::Done(outcome) => return outcome,

                        Wait::Abandoned => continue,

                        Wait::Timeout => {
                            warn!(
                                target: ENGINE_LOG,
                                "[{}] Timed out waiting for '{}'.",
                                profile.name(),
                                key.source.name,
                            );

                            return Err(CompileError::Timeout { source: key.source });
                        }
                    }
                }
            };

            let outcome = self.inner.workers.compile(CompileJob {
                profile: profile.clone(),
                source: key.source.clone(),
                context: key.context.clone(),
                result: key.result.clone(),
                mode,
                deadline,
            });

            if let Err(CompileError::Timeout { .. }) = &outcome {
                drop(guard);
                return outcome;
            }

            guard.publish(outcome.clone());

            return outcome;
        }
    }

    /// Creates a code completion service for the expressions of the
    /// `profile` with the context type `C` and the result type `R`.
    ///
    /// Returns None if either type is not registered.
    pub fn completer<C: Any, R: Any>(
        &self,
        profile: &Profile,
        mode: ExpressionMode,
    ) -> Option<Completer> {
        let context = self.inner.registry.type_of::<C>()?;
        let result = self.inner.registry.type_of::<R>()?;

        Some(self.completer_dyn(profile, context, result, mode))
    }

    /// Creates a code completion service for the expressions of the
    /// `profile` with the context and result types specified by name.
    ///
    /// The result type ranks the candidates whose return type fits it
    /// higher.
    pub fn completer_dyn(
        &self,
        profile: &Profile,
        context: TypeName,
        result: TypeName,
        mode: ExpressionMode,
    ) -> Completer {
        Completer {
            engine: self.inner.clone(),
            profile: profile.clone(),
            context,
            result,
            mode,
        }
    }

    /// The number of compilations the engine has started.
    ///
    /// Cache hits and waits for concurrent compilations of the same key are
    /// not counted.
    #[inline(always)]
    pub fn compilations(&self) -> usize {
        self.inner.cache.compilations()
    }

    /// The number of cached compilation results, the pending ones included.
    #[inline(always)]
    pub fn cached(&self) -> usize {
        self.inner.cache.len()
    }

    #[inline(always)]
    fn default_deadline(&self) -> Instant {
        deadline_after(self.inner.config.compile_timeout)
    }

    fn resolve_type<T: Any>(&self, source: &NamedSource, role: &str) -> CompileResult<TypeName> {
        if let Some(ty) = self.inner.registry.type_of::<T>() {
            return Ok(ty);
        }

        Err(CompileError::Type {
            source: source.clone(),
            issues: vec![TypeIssue {
                diagnostic: Diagnostic::new(
                    IssueCode::UnknownType,
                    0..0,
                    format!(
                        "The {role} Rust type '{}' is not registered.",
                        std::any::type_name::<T>(),
                    ),
                ),
                expected: None,
                actual: None,
            }],
        })
    }
}

/// An interactive code completion service bound to a [Profile] and a context
/// type.
///
/// Created by the [ExpressionEngine::completer] and
/// [ExpressionEngine::completer_dyn] functions.
#[derive(Clone)]
pub struct Completer {
    engine: Arc<EngineInner>,
    profile: Profile,
    context: TypeName,
    result: TypeName,
    mode: ExpressionMode,
}

impl std::fmt::Debug for Completer {
    #[inline]
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Completer")
            .field("profile", &self.profile)
            .field("context", &self.context)
            .field("result", &self.result)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Completer {
    #[inline(always)]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[inline(always)]
    pub fn context_type(&self) -> &TypeName {
        &self.context
    }

    #[inline(always)]
    pub fn result_type(&self) -> &TypeName {
        &self.result
    }

    /// Returns the members that the expression may access at the `offset`
    /// (in Unicode characters) of the possibly incomplete `source`.
    ///
    /// The members are ordered by name and then by signature.
    #[inline(always)]
    pub fn get_type_completion(
        &self,
        source: &str,
        offset: Site,
    ) -> Result<Vec<SymbolInfo>, CompletionError> {
        Ok(self.complete(source, offset)?.items)
    }

    /// Computes the completion candidates at the `offset` (in Unicode
    /// characters) of the `source`, limited by the
    /// [completion_timeout](EngineConfig::completion_timeout).
    #[inline(always)]
    pub fn complete(&self, source: &str, offset: Site) -> Result<Completions, CompletionError> {
        let deadline = deadline_after(self.engine.config.completion_timeout);

        self.complete_with_deadline(source, offset, deadline)
    }

    /// Like [complete](Self::complete), but with an explicit deadline.
    pub fn complete_with_deadline(
        &self,
        source: &str,
        offset: Site,
        deadline: Instant,
    ) -> Result<Completions, CompletionError> {
        self.engine.workers.complete(CompletionJob {
            profile: self.profile.clone(),
            context: self.context.clone(),
            result: self.result.clone(),
            mode: self.mode,
            code: Arc::from(source),
            site: offset,
            deadline,
        })
    }
}

impl Workers {
    fn compile(&self, job: CompileJob) -> Outcome {
        match self {
            Self::Local(backend) => lock_backend(backend).compile(&job),

            Self::Remote(handles) => {
                let source = job.source.clone();
                let deadline = job.deadline;
                let (sender, receiver) = sync_channel(1);

                if self
                    .route(handles, &job.profile)
                    .send(Job::Compile(job, sender))
                    .is_err()
                {
                    return Err(CompileError::Compilation {
                        source,
                        message: String::from("Compilation worker is not available."),
                    });
                }

                match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(outcome) => outcome,

                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                        warn!(target: ENGINE_LOG, "Compilation of '{}' timed out.", source.name);

                        Err(CompileError::Timeout { source })
                    }

                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                        error!(target: ENGINE_LOG, "Compilation worker channel disconnected.");

                        Err(CompileError::Compilation {
                            source,
                            message: String::from("Compilation worker is not available."),
                        })
                    }
                }
            }
        }
    }

    fn complete(&self, job: CompletionJob) -> Result<Completions, CompletionError> {
        match self {
            Self::Local(backend) => lock_backend(backend).complete(&job),

            Self::Remote(handles) => {
                let deadline = job.deadline;
                let (sender, receiver) = sync_channel(1);

                if self
                    .route(handles, &job.profile)
                    .send(Job::Complete(job, sender))
                    .is_err()
                {
                    return Err(CompletionError::Disconnected);
                }

                match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(result) => result,

                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                        Err(CompletionError::Timeout)
                    }

                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                        error!(target: ENGINE_LOG, "Completion worker channel disconnected.");

                        Err(CompletionError::Disconnected)
                    }
                }
            }
        }
    }

    // Requests of the same Profile always go to the same worker, so that the
    // worker's member caches stay warm.
    #[inline(always)]
    fn route<'a>(&self, handles: &'a [TaskHandle<Job>], profile: &Profile) -> &'a TaskHandle<Job> {
        let index = (profile.id().into_inner() % handles.len() as u64) as usize;

        &handles[index]
    }
}

#[inline(always)]
fn lock_backend(backend: &Mutex<Backend>) -> std::sync::MutexGuard<'_, Backend> {
    backend.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[inline(always)]
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();

    now.checked_add(timeout).unwrap_or(now + Duration::from_secs(86400 * 365))
}
