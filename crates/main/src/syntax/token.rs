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

use compact_str::CompactString;
use lady_deirdre::lexis::{Site, SiteSpan, SourceCode, Token, TokenBuffer};

/// A lexical token of the expression language and of the validation rule
/// languages.
///
/// The rule languages (see [validation](crate::validation)) reuse this
/// lexical grammar, but parse the token stream independently of the
/// expression parser.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Token)]
#[repr(u8)]
#[non_exhaustive]
#[lookback(2)]
pub enum ExprToken {
    EOI = 0,

    Unknown = 1,

    #[rule("context")]
    #[priority(1)]
    #[describe("keyword")]
    Context,

    #[rule("if")]
    #[priority(1)]
    #[describe("keyword")]
    If,

    #[rule("else")]
    #[priority(1)]
    #[describe("keyword")]
    Else,

    #[rule("while")]
    #[priority(1)]
    #[describe("keyword")]
    While,

    #[rule("val")]
    #[priority(1)]
    #[describe("keyword")]
    Val,

    #[rule("var")]
    #[priority(1)]
    #[describe("keyword")]
    Var,

    #[rule("true")]
    #[priority(1)]
    #[describe("bool")]
    True,

    #[rule("false")]
    #[priority(1)]
    #[describe("bool")]
    False,

    #[rule("//" ^['\n', '\r']*)]
    #[describe("comment")]
    Comment,

    #[rule("(")]
    ParenOpen,

    #[rule(")")]
    ParenClose,

    #[rule("{")]
    BraceOpen,

    #[rule("}")]
    BraceClose,

    #[rule(",")]
    Comma,

    #[rule(";")]
    Semicolon,

    #[rule(".")]
    #[describe("operator")]
    Dot,

    #[rule("=")]
    #[describe("operator")]
    Assign,

    #[rule("+")]
    #[describe("operator")]
    Plus,

    #[rule("-")]
    #[describe("operator")]
    Minus,

    #[rule("*")]
    #[describe("operator")]
    Mul,

    #[rule("/")]
    #[describe("operator")]
    Div,

    #[rule("%")]
    #[describe("operator")]
    Rem,

    #[rule("&&")]
    #[describe("operator")]
    And,

    #[rule("||")]
    #[describe("operator")]
    Or,

    #[rule("!")]
    #[describe("operator")]
    Not,

    #[rule("<")]
    #[describe("operator")]
    Lesser,

    #[rule("<=")]
    #[describe("operator")]
    LesserOrEqual,

    #[rule(">")]
    #[describe("operator")]
    Greater,

    #[rule(">=")]
    #[describe("operator")]
    GreaterOrEqual,

    #[rule("==")]
    #[describe("operator")]
    Equal,

    #[rule("!=")]
    #[describe("operator")]
    NotEqual,

    #[rule('"' (^['"', '\\', '\n'] | '\\' .)* '"')]
    #[describe("string")]
    String,

    #[rule(['a'..'z', 'A'..'Z', '_'] ['a'..'z', 'A'..'Z', '0'..'9', '_']*)]
    Ident,

    #[rule('0' | ['1'..'9'] ['0'..'9']*)]
    Int,

    #[rule(
        ('0' | ['1'..'9'] ['0'..'9']*)
        '.' ['0'..'9']+
        (['e', 'E'] ['-', '+']? ['0'..'9']+)?
    )]
    #[priority(1)]
    Float,

    #[rule([' ', '\t', '\x0c']+)]
    #[describe("blank")]
    Whitespace,

    #[rule("\n" | "\r\n")]
    #[describe("blank")]
    Linebreak,
}

impl Default for ExprToken {
    #[inline(always)]
    fn default() -> Self {
        Self::Unknown
    }
}

impl ExprToken {
    #[inline(always)]
    pub(crate) fn is_trivia(self) -> bool {
        match self {
            Self::Whitespace | Self::Linebreak | Self::Comment => true,
            _ => false,
        }
    }

    // Identifiers and keywords, the tokens a completion pattern consists of.
    #[inline(always)]
    pub(crate) fn is_word(self) -> bool {
        match self {
            Self::Ident
            | Self::Context
            | Self::If
            | Self::Else
            | Self::While
            | Self::Val
            | Self::Var
            | Self::True
            | Self::False => true,
            _ => false,
        }
    }
}

/// A significant (non-trivia) token with its text and absolute span.
#[derive(Clone, Debug)]
pub(crate) struct Lexeme {
    pub(crate) token: ExprToken,
    pub(crate) span: SiteSpan,
    pub(crate) string: CompactString,
}

/// Splits `text` into significant tokens.
///
/// The `offset` is added to every span.
pub(crate) fn lex(text: &str, offset: Site) -> Vec<Lexeme> {
    let buffer = TokenBuffer::<ExprToken>::from(text);

    buffer
        .chunks(..)
        .filter(|chunk| !chunk.token.is_trivia())
        .map(|chunk| Lexeme {
            token: chunk.token,
            span: (chunk.start() + offset)..(chunk.end() + offset),
            string: CompactString::from(chunk.string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use lady_deirdre::lexis::{SourceCode, Token, TokenBuffer};

    use crate::syntax::token::ExprToken;

    #[test]
    fn test_token_descriptions() {
        assert_eq!(
            "GreaterOrEqual",
            <ExprToken as Token>::rule_name(ExprToken::GreaterOrEqual as u8).unwrap()
        );

        assert_eq!(
            "operator",
            <ExprToken as Token>::rule_description(ExprToken::GreaterOrEqual as u8, false).unwrap()
        );
    }

    #[test]
    fn test_token_stream() {
        let buffer = TokenBuffer::<ExprToken>::from("context.twice(21) >= 4.5 // done");

        let tokens = buffer
            .chunks(..)
            .filter(|chunk| !chunk.token.is_trivia())
            .map(|chunk| chunk.token)
            .collect::<Vec<_>>();

        assert_eq!(
            tokens,
            vec![
                ExprToken::Context,
                ExprToken::Dot,
                ExprToken::Ident,
                ExprToken::ParenOpen,
                ExprToken::Int,
                ExprToken::ParenClose,
                ExprToken::GreaterOrEqual,
                ExprToken::Float,
            ],
        );
    }

    #[test]
    fn test_string_literal_token() {
        let buffer = TokenBuffer::<ExprToken>::from(r#""a \"quoted\" text" + x"#);

        let first = buffer.chunks(..).next().unwrap();

        assert_eq!(first.token, ExprToken::String);
        assert_eq!(first.string, r#""a \"quoted\" text""#);
    }
}
