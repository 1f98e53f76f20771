//! Borrowed byte-range views.
//!
//! A [`Slice`] points into storage owned by someone else. It never copies on
//! construction, so it can wrap transient buffers; the cache copies key bytes
//! into its own entries at insertion time.

use std::cmp::Ordering;
use std::fmt;

/// An immutable view over externally-owned bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slice<'a> {
    data: &'a [u8],
}

impl<'a> Slice<'a> {
    /// Create a slice referring to `data`.
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Return the referenced bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Return the length (in bytes) of the referenced data.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Return true iff the length of the referenced data is zero.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the `n`th byte in the referenced data.
    ///
    /// # Panics
    ///
    /// Panics if `n >= self.size()`.
    pub fn at(&self, n: usize) -> u8 {
        assert!(n < self.size(), "Slice::at({}) out of range for size {}", n, self.size());
        self.data[n]
    }

    /// Change this slice to refer to an empty array.
    pub fn clear(&mut self) {
        self.data = &[];
    }

    /// Drop the first `n` bytes from this slice.
    ///
    /// # Panics
    ///
    /// Panics if `n > self.size()`.
    pub fn remove_prefix(&mut self, n: usize) {
        assert!(
            n <= self.size(),
            "Slice::remove_prefix({}) exceeds size {}",
            n,
            self.size()
        );
        self.data = &self.data[n..];
    }

    /// Three-way lexicographic comparison.
    pub fn compare(&self, other: &Slice<'_>) -> Ordering {
        self.data.cmp(other.data)
    }

    /// Return true iff `prefix` is a prefix of this slice.
    pub fn starts_with(&self, prefix: &Slice<'_>) -> bool {
        self.data.starts_with(prefix.data)
    }

    /// Copy the referenced bytes into an owned buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Copy the referenced bytes into a `String`, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.data).into_owned()
    }
}

impl fmt::Debug for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slice({:?})", self.data.escape_ascii().to_string())
    }
}

impl AsRef<[u8]> for Slice<'_> {
    fn as_ref(&self) -> &[u8] {
        self.data
    }
}

impl<'a> From<&'a [u8]> for Slice<'a> {
    fn from(data: &'a [u8]) -> Self {
        Slice::new(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Slice<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Slice::new(data)
    }
}

impl<'a> From<&'a Vec<u8>> for Slice<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Slice::new(data)
    }
}

impl<'a> From<&'a str> for Slice<'a> {
    fn from(s: &'a str) -> Self {
        Slice::new(s.as_bytes())
    }
}

impl<'a> From<&'a String> for Slice<'a> {
    fn from(s: &'a String) -> Self {
        Slice::new(s.as_bytes())
    }
}

impl PartialEq<[u8]> for Slice<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.data == other
    }
}

impl PartialEq<&[u8]> for Slice<'_> {
    fn eq(&self, other: &&[u8]) -> bool {
        self.data == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_accessors() {
        let s = Slice::from("HelloWorld");
        assert_eq!(s.size(), 10);
        assert!(!s.is_empty());
        assert_eq!(s.at(0), b'H');
        assert_eq!(s.at(9), b'd');
        assert_eq!(s.to_string_lossy(), "HelloWorld");
        assert_eq!(s.to_vec(), b"HelloWorld".to_vec());

        let e = Slice::from("");
        assert!(e.is_empty());
        assert_eq!(e, Slice::default());
    }

    #[test]
    fn test_remove_prefix_and_compare() {
        let s = Slice::from("HelloWorld");
        let mut b = Slice::from("WellHelloMac");
        b.remove_prefix(4);

        assert_eq!(b.data(), b"HelloMac");
        assert_eq!(b.to_string_lossy(), "HelloMac");
        assert_eq!(b.size(), 8);
        assert_eq!(s.compare(&b), Ordering::Greater);
        assert_eq!(b.compare(&s), Ordering::Less);
        assert_eq!(s.compare(&s), Ordering::Equal);
        assert!(s > b);

        b.remove_prefix(b.size());
        assert!(b.is_empty());
    }

    #[test]
    fn test_starts_with_and_equality() {
        let s = Slice::from("HelloWorld");
        let c = Slice::from("Hello");
        let b = Slice::from("HelloMac");

        assert!(s.starts_with(&c));
        assert!(!s.starts_with(&b));
        assert!(s.starts_with(&Slice::default()));
        assert_ne!(s, b);
        assert_eq!(s, Slice::from(&b"HelloWorld"[..]));
        assert!(s == &b"HelloWorld"[..]);
    }

    #[test]
    fn test_clear() {
        let mut s = Slice::from("abc");
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.size(), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_at_out_of_range_panics() {
        let s = Slice::from("abc");
        s.at(3);
    }

    #[test]
    #[should_panic(expected = "exceeds size")]
    fn test_remove_prefix_too_long_panics() {
        let mut s = Slice::from("abc");
        s.remove_prefix(4);
    }
}
