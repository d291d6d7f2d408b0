//! Case-insensitive name keys.
//!
//! Papyrus identifiers, type names and file paths all compare without regard
//! to case. Rather than folding case at every comparison site, the compiler
//! uses [`CaselessString`] as the key type of every name map and
//! [`caseless_eq`] for linear searches. [`CaselessStr`] is the borrowed view,
//! so maps can be queried with a plain `&str` without allocating.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Compare two names the way the engine does.
#[inline]
pub fn caseless_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// A borrowed case-insensitive string slice.
///
/// `Hash` and `Eq` fold ASCII case, so `CaselessStr::new("OnInit")` and
/// `CaselessStr::new("oninit")` are the same key.
#[derive(Debug)]
#[repr(transparent)]
pub struct CaselessStr(str);

impl CaselessStr {
    pub fn new(s: &str) -> &CaselessStr {
        // Safe per repr(transparent): CaselessStr has the same layout as str.
        unsafe { &*(s as *const str as *const CaselessStr) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for CaselessStr {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CaselessStr {}

impl Hash for CaselessStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.as_bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for CaselessStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An owned case-insensitive string, preserving the original spelling.
#[derive(Debug, Clone, Default)]
pub struct CaselessString(String);

impl CaselessString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for CaselessString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for CaselessString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<CaselessStr> for CaselessString {
    fn borrow(&self) -> &CaselessStr {
        CaselessStr::new(&self.0)
    }
}

impl PartialEq for CaselessString {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CaselessString {}

impl Hash for CaselessString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Borrow::<CaselessStr>::borrow(self).hash(state)
    }
}

impl fmt::Display for CaselessString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
