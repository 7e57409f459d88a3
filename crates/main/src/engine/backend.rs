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

use std::{
    sync::{mpsc::SyncSender, Arc},
    time::Instant,
};

use ahash::AHashMap;
use lady_deirdre::lexis::Site;
use log::{debug, trace, warn};

use crate::{
    analysis::{
        complete,
        member_infos,
        CompileError,
        CompletionError,
        CompletionRequest,
        Completions,
        SymbolInfo,
    },
    engine::{cache::Outcome, tasks::Task},
    interpret::ExpressionArtifact,
    profile::{NamedSource, Profile, ProfileId, WeakProfile},
    report::{COMPILER_LOG, ENGINE_LOG},
    runtime::{TypeName, TypeRegistry},
    semantics::{analyze, Request},
    syntax::{ExpressionMode, TemplateSyntax},
};

pub(super) struct CompileJob {
    pub(super) profile: Profile,
    pub(super) source: NamedSource,
    pub(super) context: TypeName,
    pub(super) result: TypeName,
    pub(super) mode: ExpressionMode,
    pub(super) deadline: Instant,
}

pub(super) struct CompletionJob {
    pub(super) profile: Profile,
    pub(super) context: TypeName,
    pub(super) result: TypeName,
    pub(super) mode: ExpressionMode,
    pub(super) code: Arc<str>,
    pub(super) site: Site,
    pub(super) deadline: Instant,
}

pub(super) enum Job {
    Compile(CompileJob, SyncSender<Outcome>),
    Complete(CompletionJob, SyncSender<Result<Completions, CompletionError>>),
}

pub(super) struct BackendConfig {
    pub(super) registry: Arc<TypeRegistry>,
    pub(super) template: TemplateSyntax,
    pub(super) max_depth: usize,
}

/// A parser and type checker with its caches.
///
/// Each backend is exclusively owned by one worker thread, or guarded by a
/// mutex in the single-thread mode.
pub(super) struct Backend {
    registry: Arc<TypeRegistry>,
    template: TemplateSyntax,
    max_depth: usize,
    members: AHashMap<ProfileId, ProfileMembers>,
}

// The member lists of one Profile. The lists are bounded by the number of
// registered types, and dropped together with the Profile.
struct ProfileMembers {
    profile: WeakProfile,
    types: AHashMap<TypeName, Arc<[SymbolInfo]>>,
}

impl Task for Backend {
    type Config = BackendConfig;

    type Message = Job;

    #[inline(always)]
    fn init(config: Self::Config) -> Self {
        Self {
            registry: config.registry,
            template: config.template,
            max_depth: config.max_depth,
            members: AHashMap::new(),
        }
    }

    fn handle(&mut self, message: Self::Message) {
        match message {
            Job::Compile(job, reply) => {
                let outcome = self.compile(&job);

                if reply.send(outcome).is_err() {
                    trace!(
                        target: ENGINE_LOG,
                        "[{}] Compilation result of '{}' dropped.",
                        job.profile.name(),
                        job.source.name,
                    );
                }
            }

            Job::Complete(job, reply) => {
                let completions = self.complete(&job);

                let _ = reply.send(completions);
            }
        }
    }
}

impl Backend {
    pub(super) fn compile(&mut self, job: &CompileJob) -> Outcome {
        let profile_name = job.profile.name();
        let source_name = &job.source.name;

        if Instant::now() >= job.deadline {
            warn!(
                target: COMPILER_LOG,
                "[{profile_name}] Compilation of '{source_name}' expired before start.",
            );

            return Err(CompileError::Timeout {
                source: job.source.clone(),
            });
        }

        let start = Instant::now();

        let analysis = analyze(&Request {
            registry: &self.registry,
            profile: &job.profile,
            source: &job.source,
            context: &job.context,
            result: &job.result,
            mode: job.mode,
            template: &self.template,
            max_depth: self.max_depth,
        });

        let outcome = analysis.map(|analysis| {
            Arc::new(ExpressionArtifact::new(
                self.registry.clone(),
                job.source.clone(),
                job.profile.header_source().cloned(),
                (job.context.clone(), job.result.clone()),
                job.mode,
                &analysis,
            ))
        });

        let elapsed = start.elapsed();

        if Instant::now() > job.deadline {
            warn!(
                target: COMPILER_LOG,
                "[{profile_name}] Compilation of '{source_name}' timed out after {elapsed:?}.",
            );

            return Err(CompileError::Timeout {
                source: job.source.clone(),
            });
        }

        match &outcome {
            Ok(_) => debug!(
                target: COMPILER_LOG,
                "[{profile_name}] '{source_name}' compiled in {elapsed:?}.",
            ),

            Err(error) => debug!(
                target: COMPILER_LOG,
                "[{profile_name}] '{source_name}' rejected in {elapsed:?}. {error}",
            ),
        }

        outcome
    }

    pub(super) fn complete(&mut self, job: &CompletionJob) -> Result<Completions, CompletionError> {
        if Instant::now() >= job.deadline {
            return Err(CompletionError::Timeout);
        }

        let profile = &job.profile;

        if !self.members.contains_key(&profile.id()) {
            self.evict_dropped();
        }

        let registry = &self.registry;

        let members = &mut self
            .members
            .entry(profile.id())
            .or_insert_with(|| ProfileMembers {
                profile: profile.downgrade(),
                types: AHashMap::new(),
            })
            .types;

        let completions = complete(
            &CompletionRequest {
                registry,
                profile,
                context: &job.context,
                result: &job.result,
                mode: job.mode,
                template: &self.template,
                code: &job.code,
                site: job.site,
            },
            |receiver| {
                if let Some(infos) = members.get(receiver) {
                    return infos.clone();
                }

                trace!(
                    target: ENGINE_LOG,
                    "[{}] Member list of '{receiver}' cached.",
                    profile.name(),
                );

                let infos = Arc::<[SymbolInfo]>::from(member_infos(registry, profile, receiver));

                let _ = members.insert(receiver.clone(), infos.clone());

                infos
            },
        )?;

        if Instant::now() > job.deadline {
            return Err(CompletionError::Timeout);
        }

        Ok(completions)
    }

    fn evict_dropped(&mut self) {
        let before = self.members.len();

        self.members.retain(|_, members| !members.profile.is_dropped());

        let evicted = before - self.members.len();

        if evicted > 0 {
            debug!(
                target: ENGINE_LOG,
                "Member lists of {evicted} dropped profile(s) evicted.",
            );
        }
    }

    /// The number of cached member lists.
    #[cfg(test)]
    pub(super) fn cached_members(&self) -> usize {
        self.members.values().map(|members| members.types.len()).sum()
    }

    /// The number of Profiles with cached member lists.
    #[cfg(test)]
    pub(super) fn cached_profiles(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use crate::{
        analysis::{CompileError, CompletionError},
        engine::{
            backend::{Backend, BackendConfig, CompileJob, CompletionJob},
            tasks::Task,
        },
        profile::{NamedSource, Profile},
        runtime::{TypeName, TypeRegistry},
        syntax::{ExpressionMode, TemplateSyntax, MAX_DEPTH},
        validation::{SymbolAttributes, SymbolValidator, SyntaxValidator},
    };

    fn backend() -> Backend {
        Backend::init(BackendConfig {
            registry: Arc::new(TypeRegistry::new()),
            template: TemplateSyntax::new(),
            max_depth: MAX_DEPTH,
        })
    }

    fn profile() -> Profile {
        Profile::from_parts(
            "backend",
            SyntaxValidator::allow_all(),
            SymbolValidator::allow_all(),
            SymbolAttributes::default(),
        )
    }

    #[test]
    fn test_backend_compile() {
        let mut backend = backend();

        let mut job = CompileJob {
            profile: profile(),
            source: NamedSource::new("test", "\"abc\".length"),
            context: TypeName::void(),
            result: TypeName::int(),
            mode: ExpressionMode::Plain,
            deadline: Instant::now() + Duration::from_secs(5),
        };

        let artifact = backend.compile(&job).unwrap();

        assert_eq!(artifact.result_type(), &TypeName::int());

        job.deadline = Instant::now() - Duration::from_millis(1);

        assert!(matches!(
            backend.compile(&job),
            Err(CompileError::Timeout { .. })
        ));
    }

    #[test]
    fn test_backend_member_cache() {
        let mut backend = backend();
        let profile = profile();

        let job = |code: &str| CompletionJob {
            profile: profile.clone(),
            context: TypeName::string(),
            result: TypeName::void(),
            mode: ExpressionMode::Plain,
            code: Arc::from(code),
            site: code.chars().count(),
            deadline: Instant::now() + Duration::from_secs(5),
        };

        let first = backend.complete(&job("context.")).unwrap();
        let second = backend.complete(&job("context.trim().")).unwrap();

        assert_eq!(first.items, second.items);
        assert_eq!(backend.cached_members(), 1);

        let _ = backend.complete(&job("context.length.")).unwrap();

        assert_eq!(backend.cached_members(), 2);

        let mut expired = job("context.");

        expired.deadline = Instant::now() - Duration::from_millis(1);

        assert_eq!(backend.complete(&expired), Err(CompletionError::Timeout));
    }

    #[test]
    fn test_backend_member_cache_eviction() {
        let mut backend = backend();

        let job = |profile: &Profile| CompletionJob {
            profile: profile.clone(),
            context: TypeName::string(),
            result: TypeName::void(),
            mode: ExpressionMode::Plain,
            code: Arc::from("context."),
            site: 8,
            deadline: Instant::now() + Duration::from_secs(5),
        };

        let first = profile();

        let _ = backend.complete(&job(&first)).unwrap();

        assert_eq!(backend.cached_profiles(), 1);

        drop(first);

        let second = profile();

        let _ = backend.complete(&job(&second)).unwrap();

        assert_eq!(backend.cached_profiles(), 1);
        assert_eq!(backend.cached_members(), 1);

        let third = profile();

        let _ = backend.complete(&job(&third)).unwrap();
        let _ = backend.complete(&job(&second)).unwrap();

        assert_eq!(backend.cached_profiles(), 2);
        assert_eq!(backend.cached_members(), 2);
    }
}
