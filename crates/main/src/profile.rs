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
    error::Error as StdError,
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Weak,
    },
};

use compact_str::CompactString;
use lady_deirdre::lexis::SiteSpan;
use log::{debug, warn};

use crate::{
    report::PROFILE_LOG,
    syntax::{parse_definitions, Definition},
    validation::{RuleError, SymbolAttributes, SymbolValidator, SyntaxValidator},
};

/// A named piece of source code.
///
/// The name identifies the source in error reports and is a part of the
/// compilation cache key: two NamedSources with the same code but different
/// names are compiled separately.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct NamedSource {
    /// The name of the source.
    pub name: CompactString,

    /// The source code text.
    pub code: Arc<str>,
}

impl Display for NamedSource {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name.as_str())
    }
}

impl NamedSource {
    #[inline(always)]
    pub fn new(name: impl Into<CompactString>, code: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// A process-unique identifier of a [Profile].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ProfileId(u64);

impl Display for ProfileId {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

impl ProfileId {
    #[inline(always)]
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

/// An error in one of the Profile's sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileError {
    /// The name of the failed source.
    pub source: CompactString,

    /// The source code range of the error, in Unicode characters.
    pub span: SiteSpan,

    /// A human-readable description of the error.
    pub message: String,
}

impl Display for ProfileError {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!(
            "{} [{}..{}]: {}",
            self.source, self.span.start, self.span.end, self.message,
        ))
    }
}

impl StdError for ProfileError {}

impl ProfileError {
    #[inline(always)]
    fn from_rule(source: &NamedSource, error: RuleError) -> Self {
        Self {
            source: source.name.clone(),
            span: error.span,
            message: error.message,
        }
    }
}

/// An immutable bundle of the expression validation rules.
///
/// A Profile consists of:
///
///  - A [SyntaxValidator] restricting the shape of the expressions.
///  - A [SymbolValidator] restricting the accessible type members.
///  - [SymbolAttributes] providing documentation for the code completion.
///  - An optional header: `val name = expr;` definitions visible as local
///    variables in every expression compiled under the Profile.
///
/// The header is trusted: it is not checked by the SyntaxValidator, but the
/// members it refers to are checked by the SymbolValidator.
///
/// The Profile is a cheap to clone shared reference. The clones share the
/// same [ProfileId], which is a part of the compilation cache key.
#[derive(Clone)]
pub struct Profile {
    inner: Arc<ProfileInner>,
}

/// A Profile reference that does not keep the Profile alive.
pub(crate) struct WeakProfile(Weak<ProfileInner>);

impl WeakProfile {
    /// Returns true if all [Profile] clones have been dropped.
    #[inline(always)]
    pub(crate) fn is_dropped(&self) -> bool {
        self.0.strong_count() == 0
    }
}

struct ProfileInner {
    id: ProfileId,
    name: CompactString,
    syntax: SyntaxValidator,
    symbols: SymbolValidator,
    attributes: SymbolAttributes,
    header: Option<Header>,
}

pub(crate) struct Header {
    pub(crate) source: NamedSource,
    pub(crate) definitions: Vec<Definition>,
}

impl std::fmt::Debug for Profile {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Profile")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Profile {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Profile {}

impl Hash for Profile {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state)
    }
}

impl Profile {
    /// Compiles the Profile from the rule sources.
    ///
    /// See [SyntaxValidator], [SymbolValidator], and [SymbolAttributes] for
    /// the rule languages.
    pub fn build(
        name: &str,
        syntax: &NamedSource,
        symbols: &NamedSource,
        attributes: &NamedSource,
        header: Option<NamedSource>,
    ) -> Result<Self, ProfileError> {
        let result = Self::build_inner(name, syntax, symbols, attributes, header);

        match &result {
            Ok(profile) => debug!(
                target: PROFILE_LOG,
                "[{name}] Profile #{} built with {} symbol rules.",
                profile.id(),
                profile.symbols().len(),
            ),

            Err(error) => warn!(target: PROFILE_LOG, "[{name}] Profile build error. {error}"),
        }

        result
    }

    fn build_inner(
        name: &str,
        syntax: &NamedSource,
        symbols: &NamedSource,
        attributes: &NamedSource,
        header: Option<NamedSource>,
    ) -> Result<Self, ProfileError> {
        let syntax_validator = SyntaxValidator::parse(&syntax.code)
            .map_err(|error| ProfileError::from_rule(syntax, error))?;

        let symbol_validator = SymbolValidator::parse(&symbols.code)
            .map_err(|error| ProfileError::from_rule(symbols, error))?;

        let symbol_attributes = SymbolAttributes::parse(&attributes.code)
            .map_err(|error| ProfileError::from_rule(attributes, error))?;

        let header = match header {
            None => None,

            Some(source) => {
                let definitions = match parse_definitions(&source.code, 0) {
                    Ok(definitions) => definitions,

                    Err(diagnostic) => {
                        return Err(ProfileError {
                            source: source.name.clone(),
                            span: diagnostic.span,
                            message: diagnostic.message,
                        });
                    }
                };

                Some(Header {
                    source,
                    definitions,
                })
            }
        };

        Ok(Self {
            inner: Arc::new(ProfileInner {
                id: ProfileId::next(),
                name: CompactString::from(name),
                syntax: syntax_validator,
                symbols: symbol_validator,
                attributes: symbol_attributes,
                header,
            }),
        })
    }

    /// Creates a Profile from already constructed validators.
    pub fn from_parts(
        name: &str,
        syntax: SyntaxValidator,
        symbols: SymbolValidator,
        attributes: SymbolAttributes,
    ) -> Self {
        Self {
            inner: Arc::new(ProfileInner {
                id: ProfileId::next(),
                name: CompactString::from(name),
                syntax,
                symbols,
                attributes,
                header: None,
            }),
        }
    }

    #[inline(always)]
    pub fn id(&self) -> ProfileId {
        self.inner.id
    }

    #[inline(always)]
    pub(crate) fn downgrade(&self) -> WeakProfile {
        WeakProfile(Arc::downgrade(&self.inner))
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        self.inner.name.as_str()
    }

    #[inline(always)]
    pub fn syntax(&self) -> &SyntaxValidator {
        &self.inner.syntax
    }

    #[inline(always)]
    pub fn symbols(&self) -> &SymbolValidator {
        &self.inner.symbols
    }

    #[inline(always)]
    pub fn attributes(&self) -> &SymbolAttributes {
        &self.inner.attributes
    }

    /// The header source, if any.
    #[inline(always)]
    pub fn header_source(&self) -> Option<&NamedSource> {
        self.inner.header.as_ref().map(|header| &header.source)
    }

    #[inline(always)]
    pub(crate) fn header(&self) -> Option<&Header> {
        self.inner.header.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use crate::profile::{NamedSource, Profile};

    fn source(name: &str, code: &str) -> NamedSource {
        NamedSource::new(name, code)
    }

    #[test]
    fn test_profile_identity() {
        let first = Profile::build(
            "first",
            &source("syntax", "default allow;"),
            &source("symbols", "allow *.*;"),
            &source("attributes", ""),
            None,
        )
        .unwrap();

        let second = Profile::build(
            "second",
            &source("syntax", "default allow;"),
            &source("symbols", "allow *.*;"),
            &source("attributes", ""),
            None,
        )
        .unwrap();

        assert_eq!(first.clone(), first);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.symbols().len(), 1);
    }

    #[test]
    fn test_profile_errors() {
        let error = Profile::build(
            "broken",
            &source("syntax", "default allow;"),
            &source("symbols", "allow *.*"),
            &source("attributes", ""),
            None,
        )
        .unwrap_err();

        assert_eq!(error.source, "symbols");
        assert_eq!(error.span, 9..9);

        let error = Profile::build(
            "broken",
            &source("syntax", ""),
            &source("symbols", ""),
            &source("attributes", ""),
            Some(source("header", "val x = ;")),
        )
        .unwrap_err();

        assert_eq!(error.source, "header");
    }

    #[test]
    fn test_profile_header() {
        let profile = Profile::build(
            "header",
            &source("syntax", ""),
            &source("symbols", ""),
            &source("attributes", ""),
            Some(source("header", "val limit = 10; val name = \"x\";")),
        )
        .unwrap();

        assert_eq!(profile.header().unwrap().definitions.len(), 2);
        assert_eq!(profile.header_source().unwrap().name, "header");
    }
}
