//! Place identifiers: normalizing "one or many" arguments and resolving them
//! to the codes the remote services understand.

use crate::error::{Result, WbdError};
use crate::iso::COUNTRIES;
use std::fmt;

/// Highest river basin id known to the Climate Data API.
pub const MAX_BASIN_ID: u16 = 468;

/// An ordered, de-duplicated list of place identifiers.
///
/// Every accessor takes `impl Into<Places>`, so callers can pass a single
/// name or a collection:
///
/// ```
/// # use simple_wbd::Places;
/// let one: Places = "Italy".into();
/// let many: Places = ["Italy", "Slovenia", "Italy"].into();
/// assert_eq!(one.len(), 1);
/// assert_eq!(many.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Places(Vec<String>);

impl Places {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for item in items {
            let s = item.as_ref().trim();
            if !s.is_empty() && !out.iter().any(|p| p == s) {
                out.push(s.to_string());
            }
        }
        Places(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Places {
    fn from(s: &str) -> Self {
        Places::new([s])
    }
}

impl From<String> for Places {
    fn from(s: String) -> Self {
        Places::new([s])
    }
}

impl From<&String> for Places {
    fn from(s: &String) -> Self {
        Places::new([s])
    }
}

impl From<Vec<String>> for Places {
    fn from(v: Vec<String>) -> Self {
        Places::new(v)
    }
}

impl From<Vec<&str>> for Places {
    fn from(v: Vec<&str>) -> Self {
        Places::new(v)
    }
}

impl From<&[String]> for Places {
    fn from(v: &[String]) -> Self {
        Places::new(v)
    }
}

impl From<&[&str]> for Places {
    fn from(v: &[&str]) -> Self {
        Places::new(v)
    }
}

impl<const N: usize> From<[&str; N]> for Places {
    fn from(v: [&str; N]) -> Self {
        Places::new(v)
    }
}

impl<const N: usize> From<&[&str; N]> for Places {
    fn from(v: &[&str; N]) -> Self {
        Places::new(v)
    }
}

/// Resolve a country name, ISO alpha-2 or alpha-3 code to alpha-3.
///
/// Matching ignores ASCII case but is otherwise exact.
///
/// ```
/// # use simple_wbd::places::to_alpha3;
/// assert_eq!(to_alpha3("Slovenia").unwrap(), "SVN");
/// assert_eq!(to_alpha3("us").unwrap(), "USA");
/// assert!(to_alpha3("NOT EXISTING").is_err());
/// ```
pub fn to_alpha3(place: &str) -> Result<&'static str> {
    lookup_iso(place).ok_or_else(|| WbdError::UnknownPlace(place.trim().to_string()))
}

pub(crate) fn lookup_iso(place: &str) -> Option<&'static str> {
    let key = place.trim();
    COUNTRIES
        .iter()
        .find(|(alpha2, alpha3, name)| {
            alpha2.eq_ignore_ascii_case(key)
                || alpha3.eq_ignore_ascii_case(key)
                || name.eq_ignore_ascii_case(key)
        })
        .map(|(_, alpha3, _)| *alpha3)
}

/// A location understood by the Climate Data API.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    /// ISO alpha-3 code.
    Country(String),
    /// River basin id, `1..=MAX_BASIN_ID`.
    Basin(u16),
}

impl Location {
    /// Digits are basin ids; anything else must be a known country.
    pub fn parse(place: &str) -> Result<Location> {
        let place = place.trim();
        if !place.is_empty() && place.bytes().all(|b| b.is_ascii_digit()) {
            return match place.parse::<u16>() {
                Ok(id) if (1..=MAX_BASIN_ID).contains(&id) => Ok(Location::Basin(id)),
                _ => Err(WbdError::InvalidBasin {
                    id: place.to_string(),
                    max: MAX_BASIN_ID,
                }),
            };
        }
        to_alpha3(place).map(|code| Location::Country(code.to_string()))
    }

    /// Path segment naming the location type.
    pub fn kind(&self) -> &'static str {
        match self {
            Location::Country(_) => "country",
            Location::Basin(_) => "basin",
        }
    }

    pub fn code(&self) -> String {
        match self {
            Location::Country(c) => c.clone(),
            Location::Basin(id) => id.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_normalize_and_dedupe() {
        let p: Places = vec![" Italy ", "", "Slovenia", "Italy"].into();
        assert_eq!(p.iter().collect::<Vec<_>>(), vec!["Italy", "Slovenia"]);
        let empty: Places = Vec::<String>::new().into();
        assert!(empty.is_empty());
    }

    #[test]
    fn to_alpha3_accepts_names_and_codes() {
        assert_eq!(to_alpha3("Slovenia").unwrap(), "SVN");
        assert_eq!(to_alpha3("SLOVENIA").unwrap(), "SVN");
        assert_eq!(to_alpha3("US").unwrap(), "USA");
        assert_eq!(to_alpha3("svn").unwrap(), "SVN");
        for (alpha2, alpha3, name) in COUNTRIES {
            assert_eq!(to_alpha3(name).unwrap(), *alpha3);
            assert_eq!(to_alpha3(alpha2).unwrap(), *alpha3);
            assert_eq!(to_alpha3(alpha3).unwrap(), *alpha3);
        }
        assert!(matches!(
            to_alpha3("NOT EXISTING"),
            Err(WbdError::UnknownPlace(_))
        ));
    }

    #[test]
    fn location_good() {
        assert_eq!(Location::parse("SI").unwrap(), Location::Country("SVN".into()));
        assert_eq!(Location::parse("Tonga").unwrap(), Location::Country("TON".into()));
        assert_eq!(Location::parse("us").unwrap(), Location::Country("USA".into()));
        assert_eq!(Location::parse("1").unwrap(), Location::Basin(1));
        assert_eq!(Location::parse("28").unwrap(), Location::Basin(28));
        assert_eq!(Location::parse("28").unwrap().kind(), "basin");
    }

    #[test]
    fn location_bad() {
        for bad in ["-1", "Orange3", "books", "555", "XYZ1", "0"] {
            assert!(Location::parse(bad).is_err(), "{bad} should be rejected");
        }
        assert!(matches!(
            Location::parse("555"),
            Err(WbdError::InvalidBasin { .. })
        ));
    }
}
