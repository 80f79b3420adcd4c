//! Append-only pool of NUL-terminated strings
//!
//! Descriptor records handed to the runtime hold raw `*const c_char` names.
//! Those pointers have to stay valid for as long as the records do, so every
//! string is boxed individually: growing the pool moves the boxes, never the
//! bytes they point at.

use std::ffi::{c_char, CStr, CString};
use std::ptr::NonNull;

/// Stable handle to a string stored in a [`StringPool`].
///
/// The handle is a plain address + length and stays valid until the pool
/// that produced it is dropped. Moving the pool (or the object owning it)
/// does not invalidate it; cloning the pool does not make it point into
/// the clone.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolStr {
    ptr: NonNull<c_char>,
    len: usize,
}

// A handle is only an address; every read through it is already `unsafe`.
unsafe impl Send for PoolStr {}
unsafe impl Sync for PoolStr {}

impl PoolStr {
    /// Address of the first byte, NUL-terminated
    #[inline]
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }

    /// Length in bytes, without the terminator
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for the empty string
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow the pooled string.
    ///
    /// # Safety
    ///
    /// The pool that returned this handle must still be alive for `'a`.
    #[inline]
    pub unsafe fn as_c_str<'a>(&self) -> &'a CStr {
        CStr::from_ptr(self.ptr.as_ptr())
    }
}

impl std::fmt::Debug for PoolStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolStr")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Owner of every string a binding object hands out to descriptor records.
///
/// Strings can only be appended. The pool itself is the only release point.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: Vec<Box<CStr>>,
}

impl StringPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `text` into the pool and return a stable handle to the copy.
    pub fn duplicate(&mut self, text: &str) -> PoolStr {
        self.duplicate_bytes(text.as_bytes())
    }

    /// Copy raw bytes into the pool.
    ///
    /// Anything after an interior NUL byte is dropped: the runtime reads
    /// names as C strings and would never see it.
    pub fn duplicate_bytes(&mut self, bytes: &[u8]) -> PoolStr {
        let end = match bytes.iter().position(|&b| b == 0) {
            Some(end) => {
                tracing::warn!(
                    len = bytes.len(),
                    kept = end,
                    "interior NUL in pooled string, truncating"
                );
                end
            }
            None => bytes.len(),
        };

        let mut buf = Vec::with_capacity(end + 1);
        buf.extend_from_slice(&bytes[..end]);
        buf.push(0);
        // SAFETY: `buf` ends with its only NUL byte.
        let owned = unsafe { CString::from_vec_with_nul_unchecked(buf) }.into_boxed_c_str();

        let handle = PoolStr {
            ptr: NonNull::from(&*owned).cast(),
            len: end,
        };
        self.strings.push(owned);
        handle
    }

    /// Number of pooled strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True if nothing has been pooled yet
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Does `ptr` point at the start of one of this pool's strings?
    pub fn owns(&self, ptr: *const c_char) -> bool {
        self.strings.iter().any(|s| s.as_ptr() == ptr)
    }

    /// Look up a handle, returning `None` if it was not issued by this pool.
    pub fn get(&self, handle: PoolStr) -> Option<&CStr> {
        self.strings
            .iter()
            .find(|s| s.as_ptr() == handle.as_ptr())
            .map(|s| &**s)
    }

    /// Pooled strings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.strings.iter().map(|s| &**s)
    }

    /// Move the contents out, leaving this pool empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl Clone for StringPool {
    /// Deep copy: same content and order, fresh addresses.
    fn clone(&self) -> Self {
        Self {
            strings: self.strings.iter().map(|s| Box::<CStr>::from(&**s)).collect(),
        }
    }
}
