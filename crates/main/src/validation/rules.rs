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
};

use compact_str::CompactString;
use lady_deirdre::lexis::{Site, SiteSpan};

use crate::{
    runtime::TypeName,
    syntax::{lex, ExprToken, Lexeme},
};

/// A syntax error in the source code of a rule set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleError {
    /// The source code range of the error, in Unicode characters.
    pub span: SiteSpan,

    /// A human-readable description of the error.
    pub message: String,
}

impl Display for RuleError {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!(
            "{}..{}: {}",
            self.span.start, self.span.end, self.message,
        ))
    }
}

impl StdError for RuleError {}

/// A verdict of the syntax and symbol rules.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Verdict {
    Allow,
    Deny,
}

impl Display for Verdict {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => formatter.write_str("allow"),
            Self::Deny => formatter.write_str("deny"),
        }
    }
}

impl Verdict {
    #[inline(always)]
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

// The rule languages share the expression lexis, so the keywords of the
// expression language (`if`, `context`, ...) are ordinary words here.
pub(crate) struct RuleReader {
    lexemes: Vec<Lexeme>,
    cursor: usize,
    end: Site,
}

impl RuleReader {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            lexemes: lex(text, 0),
            cursor: 0,
            end: text.chars().count(),
        }
    }

    #[inline(always)]
    pub(crate) fn is_end(&self) -> bool {
        self.cursor >= self.lexemes.len()
    }

    #[inline(always)]
    pub(crate) fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.cursor)
    }

    #[inline(always)]
    pub(crate) fn peek_token(&self) -> Option<ExprToken> {
        self.peek().map(|lexeme| lexeme.token)
    }

    pub(crate) fn next(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.cursor)?.clone();

        self.cursor += 1;

        Some(lexeme)
    }

    pub(crate) fn eat(&mut self, token: ExprToken) -> bool {
        match self.peek_token() == Some(token) {
            true => {
                self.cursor += 1;
                true
            }

            false => false,
        }
    }

    pub(crate) fn expect(&mut self, token: ExprToken, expected: &str) -> Result<(), RuleError> {
        match self.eat(token) {
            true => Ok(()),
            false => Err(self.error(expected)),
        }
    }

    /// Reads an identifier or a keyword.
    pub(crate) fn word(&mut self, expected: &str) -> Result<Lexeme, RuleError> {
        match self.peek() {
            Some(lexeme) if is_word(lexeme) => {
                let lexeme = lexeme.clone();

                self.cursor += 1;

                Ok(lexeme)
            }

            _ => Err(self.error(expected)),
        }
    }

    pub(crate) fn type_name(&mut self) -> Result<TypeName, RuleError> {
        let lexeme = self.word("type name")?;

        Ok(TypeName::new(lexeme.string))
    }

    /// Reads `(TypeName, ...)` if the next token is an opening parenthesis.
    pub(crate) fn signature(&mut self) -> Result<Option<Vec<TypeName>>, RuleError> {
        if !self.eat(ExprToken::ParenOpen) {
            return Ok(None);
        }

        let mut params = Vec::new();

        if self.eat(ExprToken::ParenClose) {
            return Ok(Some(params));
        }

        loop {
            params.push(self.type_name()?);

            if self.eat(ExprToken::Comma) {
                continue;
            }

            self.expect(ExprToken::ParenClose, "',' or ')'")?;

            return Ok(Some(params));
        }
    }

    /// Reads adjacent words and `*` wildcards as a single glob pattern.
    pub(crate) fn glob(&mut self) -> Result<Glob, RuleError> {
        let mut pattern = CompactString::default();
        let mut last_end = None;

        while let Some(lexeme) = self.peek() {
            if !is_word(lexeme) && lexeme.token != ExprToken::Mul {
                break;
            }

            if let Some(last_end) = last_end {
                if last_end != lexeme.span.start {
                    break;
                }
            }

            pattern.push_str(lexeme.string.as_str());
            last_end = Some(lexeme.span.end);

            self.cursor += 1;
        }

        if pattern.is_empty() {
            return Err(self.error("member name pattern"));
        }

        Ok(Glob { pattern })
    }

    pub(crate) fn verdict(&mut self) -> Result<Verdict, RuleError> {
        let lexeme = self.word("'allow' or 'deny'")?;

        match lexeme.string.as_str() {
            "allow" => Ok(Verdict::Allow),
            "deny" => Ok(Verdict::Deny),
            _ => Err(RuleError {
                span: lexeme.span,
                message: format!("Unexpected '{}', expected 'allow' or 'deny'.", lexeme.string),
            }),
        }
    }

    pub(crate) fn error(&self, expected: &str) -> RuleError {
        match self.peek() {
            None => RuleError {
                span: self.end..self.end,
                message: format!("Unexpected end of input, expected {expected}."),
            },

            Some(lexeme) => RuleError {
                span: lexeme.span.clone(),
                message: format!("Unexpected '{}', expected {expected}.", lexeme.string),
            },
        }
    }
}

#[inline(always)]
fn is_word(lexeme: &Lexeme) -> bool {
    lexeme
        .string
        .chars()
        .next()
        .map(|ch| ch.is_ascii_alphabetic() || ch == '_')
        .unwrap_or(false)
}

/// A member name pattern where `*` matches any sequence of characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Glob {
    pattern: CompactString,
}

impl Display for Glob {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.pattern.as_str())
    }
}

impl Glob {
    #[inline(always)]
    pub(crate) fn any() -> Self {
        Self {
            pattern: CompactString::from("*"),
        }
    }

    pub(crate) fn matches(&self, name: &str) -> bool {
        let pattern = self.pattern.as_bytes();
        let name = name.as_bytes();

        let mut p = 0;
        let mut n = 0;
        let mut backtrack = None;

        while n < name.len() {
            if p < pattern.len() && pattern[p] == b'*' {
                p += 1;
                backtrack = Some((p, n));
                continue;
            }

            if p < pattern.len() && pattern[p] == name[n] {
                p += 1;
                n += 1;
                continue;
            }

            match backtrack {
                Some((star_p, star_n)) => {
                    p = star_p;
                    n = star_n + 1;
                    backtrack = Some((star_p, star_n + 1));
                }

                None => return false,
            }
        }

        pattern[p..].iter().all(|byte| *byte == b'*')
    }
}

#[cfg(test)]
mod tests {
    use crate::{syntax::ExprToken, validation::rules::RuleReader};

    #[test]
    fn test_glob_reading() {
        let mut reader = RuleReader::new("get* *Name if x");

        let glob = reader.glob().unwrap();

        assert_eq!(glob.to_string(), "get*");
        assert!(glob.matches("getProperty"));
        assert!(glob.matches("get"));
        assert!(!glob.matches("isGet"));

        let glob = reader.glob().unwrap();

        assert_eq!(glob.to_string(), "*Name");
        assert!(glob.matches("getName"));
        assert!(!glob.matches("getNames"));

        assert_eq!(reader.glob().unwrap().to_string(), "if");
        assert_eq!(reader.glob().unwrap().to_string(), "x");
        assert!(reader.is_end());
    }

    #[test]
    fn test_glob_matching() {
        let mut reader = RuleReader::new("*a*b* *");

        let glob = reader.glob().unwrap();

        assert!(glob.matches("ab"));
        assert!(glob.matches("xaybz"));
        assert!(!glob.matches("ba"));

        assert!(reader.glob().unwrap().matches(""));
    }

    #[test]
    fn test_signature_reading() {
        let mut reader = RuleReader::new("(int, string) ()");

        let signature = reader.signature().unwrap().unwrap();

        assert_eq!(signature.len(), 2);
        assert_eq!(signature[1].as_str(), "string");

        assert_eq!(reader.signature().unwrap(), Some(Vec::new()));
        assert_eq!(reader.signature().unwrap(), None);
        assert_eq!(reader.peek_token(), None);
        assert!(!reader.eat(ExprToken::Comma));
    }
}
