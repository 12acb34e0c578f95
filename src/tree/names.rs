//! Fresh identifier generation.

use rustc_hash::FxHashSet;

use crate::{Error, Result};

const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Allocator for short replacement identifiers.
///
/// Names are handed out in a fixed order: `_a_` ... `_Z_`, then `_aa_`, `_ab_` ... `_ZZ_`.
/// A name is skipped if it is already known to the module, and once handed out it is
/// never produced again during the same run, even if it is later forgotten.
///
/// # Examples
///
/// ```rust
/// use macroscope::tree::FreshNames;
///
/// let mut names = FreshNames::new(["_a_".to_string()]);
/// assert_eq!(names.next_name()?, "_b_");
/// assert_eq!(names.next_name()?, "_c_");
/// # Ok::<(), macroscope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
    next: usize,
    known: FxHashSet<String>,
}

impl FreshNames {
    /// Number of distinct names the scheme can produce.
    pub const CAPACITY: usize = ALPHABET.len() * (ALPHABET.len() + 1);

    /// Creates an allocator that avoids every name in `known`.
    pub fn new(known: impl IntoIterator<Item = String>) -> Self {
        FreshNames {
            next: 0,
            known: known.into_iter().collect(),
        }
    }

    fn name_at(index: usize) -> Option<String> {
        let letters = ALPHABET.len();
        if index < letters {
            return Some(format!("_{}_", ALPHABET[index] as char));
        }
        if index < Self::CAPACITY {
            let first = ALPHABET[index / letters - 1] as char;
            let second = ALPHABET[index % letters] as char;
            return Some(format!("_{first}{second}_"));
        }
        None
    }

    /// Allocates the next name that is not known yet and marks it known.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamesExhausted`] once every name of the scheme has been used.
    pub fn next_name(&mut self) -> Result<String> {
        loop {
            let name = Self::name_at(self.next).ok_or(Error::NamesExhausted)?;
            self.next += 1;
            if self.known.insert(name.clone()) {
                return Ok(name);
            }
        }
    }

    /// True if `name` is currently in the known pool.
    #[must_use]
    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Adds `name` to the known pool.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.known.insert(name.into());
    }

    /// Removes `name` from the known pool. Returns whether it was present.
    pub fn forget(&mut self, name: &str) -> bool {
        self.known.remove(name)
    }

    /// Number of allocation attempts so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.next
    }
}
