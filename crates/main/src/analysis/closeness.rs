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

use std::fmt::{Debug, Display, Formatter};

use strsim::normalized_damerau_levenshtein;

/// A similarity score of two strings.
///
/// The score is stored in hundredths of a percent: "100%" means that the
/// strings are equal, and "0%" means that they are completely distinct.
///
/// The Debug and Display implementations round the score to the nearest
/// integer percentage. The default value is "0%".
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Closeness(u16);

impl Debug for Closeness {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, formatter)
    }
}

impl Display for Closeness {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!("{}%", self.percents()))
    }
}

impl Closeness {
    const SCALE: u16 = 10000;

    /// Returns a "0%" closeness value.
    #[inline(always)]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns a "50%" closeness value.
    #[inline(always)]
    pub const fn half() -> Self {
        Self(Self::SCALE / 2)
    }

    /// Returns a "100%" closeness value.
    #[inline(always)]
    pub const fn one() -> Self {
        Self(Self::SCALE)
    }

    /// Returns the score rounded to the nearest integer percentage.
    #[inline(always)]
    pub fn percents(self) -> u16 {
        (self.0 + 50) / 100
    }

    #[inline(always)]
    fn from_ratio(ratio: f64) -> Self {
        let scaled = (ratio.clamp(0.0, 1.0) * Self::SCALE as f64).round();

        Self(cast::u16(scaled).unwrap_or(Self::SCALE))
    }
}

/// An extension trait for strings that estimates the similarity of two
/// strings.
pub trait StringEstimation {
    /// Estimates the similarity between this string and the `pattern` using
    /// the normalized Damerau-Levenshtein distance.
    ///
    /// ```rust
    /// use ad_astra_expr::analysis::{Closeness, StringEstimation};
    ///
    /// assert_eq!("getProperty".estimate("getProperty"), Closeness::one());
    /// assert_eq!("abc".estimate("xyz"), Closeness::zero());
    /// assert!("getProperty".estimate("getPropety") > Closeness::half());
    /// ```
    fn estimate(&self, pattern: impl AsRef<str>) -> Closeness;
}

impl<S: AsRef<str>> StringEstimation for S {
    #[inline]
    fn estimate(&self, pattern: impl AsRef<str>) -> Closeness {
        Closeness::from_ratio(normalized_damerau_levenshtein(pattern.as_ref(), self.as_ref()))
    }
}

/// Returns the candidate most similar to the `pattern`, if its similarity
/// is at least [Closeness::half].
pub(crate) fn suggest<'a>(
    pattern: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let mut best: Option<(Closeness, &'a str)> = None;

    for candidate in candidates {
        let closeness = candidate.estimate(pattern);

        if closeness < Closeness::half() {
            continue;
        }

        match best {
            Some((best_closeness, _)) if best_closeness >= closeness => (),
            _ => best = Some((closeness, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use crate::analysis::{closeness::suggest, Closeness, StringEstimation};

    #[test]
    fn test_closeness_scale() {
        assert_eq!(Closeness::one().percents(), 100);
        assert_eq!(Closeness::half().to_string(), "50%");
        assert_eq!("foo".estimate("foo"), Closeness::one());
        assert!("foo".estimate("Foo") < Closeness::one());
    }

    #[test]
    fn test_suggestions() {
        let candidates = ["getProperty", "isExtraordinary", "twice"];

        assert_eq!(suggest("getPropety", candidates), Some("getProperty"));
        assert_eq!(suggest("twic", candidates), Some("twice"));
        assert_eq!(suggest("zzz", candidates), None);
    }
}
