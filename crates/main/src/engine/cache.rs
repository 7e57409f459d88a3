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
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Condvar,
        Mutex,
        MutexGuard,
    },
    time::Instant,
};

use ahash::AHashMap;

use crate::{
    analysis::CompileResult,
    interpret::ExpressionArtifact,
    profile::{NamedSource, ProfileId},
    runtime::TypeName,
    syntax::ExpressionMode,
};

pub(super) type Outcome = CompileResult<Arc<ExpressionArtifact>>;

/// Identifies a compilation request.
///
/// The source code's name is a part of the key, because it is a part of the
/// artifact's diagnostics.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(super) struct CacheKey {
    pub(super) profile: ProfileId,
    pub(super) source: NamedSource,
    pub(super) context: TypeName,
    pub(super) result: TypeName,
    pub(super) mode: ExpressionMode,
}

/// A shared slot of a compilation that is in progress or completed.
pub(super) struct Flight {
    state: Mutex<FlightState>,
    ready: Condvar,
}

enum FlightState {
    Pending,
    Done(Outcome),
    Abandoned,
}

pub(super) enum Wait {
    Done(Outcome),
    Abandoned,
    Timeout,
}

impl Flight {
    #[inline(always)]
    fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Pending),
            ready: Condvar::new(),
        }
    }

    /// Blocks until the flight's leader publishes or abandons the result, or
    /// until the `deadline`.
    pub(super) fn wait(&self, deadline: Instant) -> Wait {
        let mut state = lock(&self.state);

        loop {
            match &*state {
                FlightState::Done(outcome) => return Wait::Done(outcome.clone()),
                FlightState::Abandoned => return Wait::Abandoned,
                FlightState::Pending => (),
            }

            let now = Instant::now();

            if now >= deadline {
                return Wait::Timeout;
            }

            state = match self.ready.wait_timeout(state, deadline - now) {
                Ok((state, _)) => state,
                Err(poison) => poison.into_inner().0,
            };
        }
    }

    /// Returns the completed result without waiting.
    pub(super) fn peek(&self) -> Option<Outcome> {
        match &*lock(&self.state) {
            FlightState::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    fn finish(&self, state: FlightState) {
        *lock(&self.state) = state;

        self.ready.notify_all();
    }
}

pub(super) enum Lookup {
    /// The caller is responsible for the compilation, and must either
    /// [publish](FlightGuard::publish) the result or drop the guard.
    Leader(FlightGuard),

    /// Another caller compiles the expression.
    Follower(Arc<Flight>),
}

/// A map of compilation flights.
///
/// Completed flights stay in the cache for the cache's lifetime. Abandoned
/// flights are removed, so the next request of the same key starts a new
/// compilation.
pub(super) struct CompilationCache {
    flights: Arc<Mutex<AHashMap<CacheKey, Arc<Flight>>>>,
    compilations: Arc<AtomicUsize>,
}

impl CompilationCache {
    #[inline(always)]
    pub(super) fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(AHashMap::new())),
            compilations: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Finds the flight of the `key`, or atomically creates a new one led by
    /// the caller.
    pub(super) fn lookup(&self, key: &CacheKey) -> Lookup {
        let mut flights = lock(&self.flights);

        if let Some(flight) = flights.get(key) {
            return Lookup::Follower(flight.clone());
        }

        let flight = Arc::new(Flight::new());

        let _ = flights.insert(key.clone(), flight.clone());

        let _ = self.compilations.fetch_add(1, Ordering::Relaxed);

        Lookup::Leader(FlightGuard {
            key: key.clone(),
            flight,
            flights: self.flights.clone(),
            published: false,
        })
    }

    /// The number of compilations started since the cache creation.
    #[inline(always)]
    pub(super) fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    /// The number of cached flights, pending flights included.
    #[inline(always)]
    pub(super) fn len(&self) -> usize {
        lock(&self.flights).len()
    }
}

/// Leadership over a pending flight.
///
/// Dropping the guard without publishing abandons the flight: the followers
/// are woken up, and the flight is removed from the cache.
pub(super) struct FlightGuard {
    key: CacheKey,
    flight: Arc<Flight>,
    flights: Arc<Mutex<AHashMap<CacheKey, Arc<Flight>>>>,
    published: bool,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if self.published {
            return;
        }

        {
            let mut flights = lock(&self.flights);

            if let Some(current) = flights.get(&self.key) {
                if Arc::ptr_eq(current, &self.flight) {
                    let _ = flights.remove(&self.key);
                }
            }
        }

        self.flight.finish(FlightState::Abandoned);
    }
}

impl FlightGuard {
    pub(super) fn publish(mut self, outcome: Outcome) {
        self.published = true;

        self.flight.finish(FlightState::Done(outcome));
    }
}

#[inline(always)]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[cfg(test)]
mod tests {
    use std::{
        thread::{scope, sleep},
        time::{Duration, Instant},
    };

    use crate::{
        analysis::CompileError,
        engine::cache::{CacheKey, CompilationCache, Lookup, Wait},
        profile::{NamedSource, Profile},
        runtime::TypeName,
        syntax::ExpressionMode,
    };

    fn key(profile: &Profile) -> CacheKey {
        CacheKey {
            profile: profile.id(),
            source: NamedSource::new("key", "1"),
            context: TypeName::void(),
            result: TypeName::int(),
            mode: ExpressionMode::Plain,
        }
    }

    fn profile() -> Profile {
        Profile::from_parts(
            "cache",
            Default::default(),
            Default::default(),
            Default::default(),
        )
    }

    #[test]
    fn test_single_flight() {
        let cache = CompilationCache::new();
        let profile = profile();
        let key = key(&profile);

        let Lookup::Leader(guard) = cache.lookup(&key) else {
            panic!("Expected leadership.");
        };

        let deadline = Instant::now() + Duration::from_secs(5);

        scope(|scope| {
            let followers = (0..4)
                .map(|_| {
                    scope.spawn(|| match cache.lookup(&key) {
                        Lookup::Follower(flight) => flight.wait(deadline),
                        Lookup::Leader(_) => panic!("Unexpected leadership."),
                    })
                })
                .collect::<Vec<_>>();

            sleep(Duration::from_millis(20));

            guard.publish(Err(CompileError::Timeout {
                source: key.source.clone(),
            }));

            for follower in followers {
                assert!(matches!(follower.join().unwrap(), Wait::Done(Err(_))));
            }
        });

        assert_eq!(cache.compilations(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_abandoned_flight() {
        let cache = CompilationCache::new();
        let profile = profile();
        let key = key(&profile);

        let Lookup::Leader(guard) = cache.lookup(&key) else {
            panic!("Expected leadership.");
        };

        let Lookup::Follower(flight) = cache.lookup(&key) else {
            panic!("Expected a follower.");
        };

        assert!(matches!(
            flight.wait(Instant::now() + Duration::from_millis(10)),
            Wait::Timeout,
        ));

        drop(guard);

        assert!(matches!(flight.wait(Instant::now()), Wait::Abandoned));
        assert_eq!(cache.len(), 0);
        assert!(matches!(cache.lookup(&key), Lookup::Leader(_)));
        assert_eq!(cache.compilations(), 2);
    }
}
