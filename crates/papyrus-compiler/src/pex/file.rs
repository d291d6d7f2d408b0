//! The pex string table.
//!
//! Every name and string literal in a compiled script is interned once in
//! the file-level string table and referenced by index. The table preserves
//! case; Papyrus name comparisons happen before interning, not here.

use rustc_hash::FxHashMap;

/// An index into a [`PexFile`]'s string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PexString(pub u16);

/// The file-level state the emission stage needs: the string table.
#[derive(Debug, Default)]
pub struct PexFile {
    strings: Vec<String>,
    lookup: FxHashMap<String, PexString>,
}

impl PexFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its table index. Repeated calls with the same
    /// string return the same index.
    pub fn get_string(&mut self, s: &str) -> PexString {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        // The on-disk table is indexed by u16.
        assert!(self.strings.len() < u16::MAX as usize, "pex string table overflow");
        let id = PexString(self.strings.len() as u16);
        self.strings.push(s.to_owned());
        self.lookup.insert(s.to_owned(), id);
        id
    }

    /// Read an interned string back.
    pub fn string_value(&self, s: PexString) -> &str {
        &self.strings[s.0 as usize]
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups() {
        let mut file = PexFile::new();
        let a = file.get_string("::temp0");
        let b = file.get_string("::temp0");
        assert_eq!(a, b);
        assert_eq!(file.string_count(), 1);
    }

    #[test]
    fn interning_is_case_sensitive() {
        let mut file = PexFile::new();
        let a = file.get_string("Health");
        let b = file.get_string("health");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trip() {
        let mut file = PexFile::new();
        let id = file.get_string("OnInit");
        assert_eq!(file.string_value(id), "OnInit");
    }
}
