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
use lady_deirdre::lexis::{Site, SiteSpan};

use crate::analysis::{Diagnostic, IssueCode};

/// Markers of the embedded expression fragments in template mode.
///
/// With the default markers, the template `"temp: ${context.getProperty()}"`
/// consists of the literal text `"temp: "` and one expression fragment
/// `context.getProperty()`. Two consecutive escape characters (`$$`) stand
/// for a single literal escape character, so `"$${x}"` is the literal text
/// `"${x}"`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TemplateSyntax {
    /// A string that opens an expression fragment.
    ///
    /// The default value is `"${"`.
    pub open: &'static str,

    /// A character that closes an expression fragment.
    ///
    /// Balanced `{`/`}` pairs and string literals inside the fragment are
    /// skipped. The default value is `'}'`.
    pub close: char,

    /// A character that escapes itself in the literal text.
    ///
    /// The default value is `'$'`.
    pub escape: char,
}

impl Default for TemplateSyntax {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSyntax {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            open: "${",
            close: '}',
            escape: '$',
        }
    }
}

/// A component of a template source text.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplatePart {
    /// Literal text with the escapes resolved.
    ///
    /// The span covers the original (escaped) text.
    Literal { text: CompactString, span: SiteSpan },

    /// An embedded expression.
    ///
    /// The span covers the expression's code without the markers.
    Fragment { code: CompactString, span: SiteSpan },
}

impl TemplatePart {
    #[inline(always)]
    pub fn span(&self) -> &SiteSpan {
        match self {
            Self::Literal { span, .. } => span,
            Self::Fragment { span, .. } => span,
        }
    }
}

/// Splits the template `text` into literal parts and expression fragments.
///
/// Fails with [IssueCode::UnterminatedFragment] if a fragment is not closed.
pub fn split_template(text: &str, syntax: &TemplateSyntax) -> Result<Vec<TemplatePart>, Diagnostic> {
    split(text, syntax, false)
}

// In tolerant mode, an unterminated fragment spans to the end of the text.
pub(crate) fn split(
    text: &str,
    syntax: &TemplateSyntax,
    tolerant: bool,
) -> Result<Vec<TemplatePart>, Diagnostic> {
    let chars = text.chars().collect::<Vec<_>>();
    let open = syntax.open.chars().collect::<Vec<_>>();

    let mut parts = Vec::new();
    let mut literal = CompactString::default();
    let mut literal_start: Site = 0;
    let mut site: Site = 0;

    while site < chars.len() {
        let ch = chars[site];

        if ch == syntax.escape && chars.get(site + 1) == Some(&syntax.escape) {
            literal.push(ch);
            site += 2;
            continue;
        }

        if !open.is_empty() && chars[site..].starts_with(&open) {
            if !literal.is_empty() || literal_start < site {
                parts.push(TemplatePart::Literal {
                    text: std::mem::take(&mut literal),
                    span: literal_start..site,
                });
            }

            let code_start = site + open.len();

            let code_end = match fragment_end(&chars, code_start, syntax.close) {
                Some(end) => end,

                None if tolerant => chars.len(),

                None => {
                    return Err(Diagnostic::new(
                        IssueCode::UnterminatedFragment,
                        site..chars.len(),
                        format!("Missing '{}' after the fragment.", syntax.close),
                    ));
                }
            };

            parts.push(TemplatePart::Fragment {
                code: chars[code_start..code_end].iter().collect(),
                span: code_start..code_end,
            });

            site = (code_end + 1).min(chars.len());
            literal_start = site;
            continue;
        }

        literal.push(ch);
        site += 1;
    }

    if literal_start < chars.len() {
        parts.push(TemplatePart::Literal {
            text: literal,
            span: literal_start..chars.len(),
        });
    }

    Ok(parts)
}

fn fragment_end(chars: &[char], start: Site, close: char) -> Option<Site> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut site = start;

    while site < chars.len() {
        let ch = chars[site];

        match in_string {
            true => match ch {
                '\\' => site += 1,
                '"' => in_string = false,
                _ => (),
            },

            false => match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                _ if ch == close && depth == 0 => return Some(site),
                '}' if depth > 0 => depth -= 1,
                _ => (),
            },
        }

        site += 1;
    }

    None
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::IssueCode,
        syntax::template::{split_template, TemplatePart, TemplateSyntax},
    };

    #[test]
    fn test_template_split() {
        let parts =
            split_template("temp: ${context.getProperty()}!", &TemplateSyntax::new()).unwrap();

        assert_eq!(
            parts,
            vec![
                TemplatePart::Literal {
                    text: "temp: ".into(),
                    span: 0..6,
                },
                TemplatePart::Fragment {
                    code: "context.getProperty()".into(),
                    span: 8..29,
                },
                TemplatePart::Literal {
                    text: "!".into(),
                    span: 30..31,
                },
            ],
        );
    }

    #[test]
    fn test_template_escapes() {
        let parts = split_template("cost: $$${price} $${x}", &TemplateSyntax::new()).unwrap();

        assert_eq!(parts.len(), 3);

        assert_eq!(
            parts[0],
            TemplatePart::Literal {
                text: "cost: $".into(),
                span: 0..8,
            },
        );

        assert_eq!(
            parts[2],
            TemplatePart::Literal {
                text: " ${x}".into(),
                span: 16..22,
            },
        );
    }

    #[test]
    fn test_nested_braces_and_strings() {
        let parts = split_template("${ { \"}\" + {1} } }", &TemplateSyntax::new()).unwrap();

        assert_eq!(parts.len(), 1);

        let TemplatePart::Fragment { code, .. } = &parts[0] else {
            panic!("Fragment expected.");
        };

        assert_eq!(*code, " { \"}\" + {1} } ");
    }

    #[test]
    fn test_unterminated_fragment() {
        let error = split_template("a ${b", &TemplateSyntax::new()).unwrap_err();

        assert_eq!(error.code, IssueCode::UnterminatedFragment);
        assert_eq!(error.span, 2..5);
    }

    #[test]
    fn test_custom_markers() {
        let syntax = TemplateSyntax {
            open: "#[",
            close: ']',
            escape: '#',
        };

        let parts = split_template("a #[1 + 2] ##", &syntax).unwrap();

        assert_eq!(parts.len(), 3);

        assert_eq!(
            parts[2],
            TemplatePart::Literal {
                text: " #".into(),
                span: 10..13,
            },
        );
    }
}
