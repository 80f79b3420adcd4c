//! NativeValue - tagged value handle shared with the runtime
//!
//! The runtime owns the real value representation. Native callbacks and the
//! binding layer only ever see this plain-old-data handle: primitives are
//! stored inline, heap values (strings, objects, functions) carry an opaque
//! runtime handle in the payload.

/// Opaque runtime context, only ever seen behind a raw pointer.
#[repr(C)]
pub struct RawContext {
    _private: [u8; 0],
}

/// Opaque runtime instance, only ever seen behind a raw pointer.
#[repr(C)]
pub struct RawRuntime {
    _private: [u8; 0],
}

/// Tagged value handle passed across the native-extension ABI.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeValue {
    tag: u8,
    data: u64,
}

// Value type tags
const TAG_UNDEFINED: u8 = 0;
const TAG_NULL: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_STRING: u8 = 5;
const TAG_OBJECT: u8 = 6;
const TAG_FUNCTION: u8 = 7;
const TAG_EXCEPTION: u8 = 8;

/// Decoded view of a [`NativeValue`] tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Bool,
    /// 32-bit integer primitive
    Int,
    /// Double primitive
    Float,
    /// Runtime string (handle)
    String,
    /// Runtime object (handle)
    Object,
    /// Runtime function object (handle)
    Function,
    /// Pending-exception marker returned by failing runtime calls
    Exception,
}

impl NativeValue {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// The `undefined` value
    #[inline]
    pub const fn undefined() -> Self {
        Self {
            tag: TAG_UNDEFINED,
            data: 0,
        }
    }

    /// The `null` value
    #[inline]
    pub const fn null() -> Self {
        Self {
            tag: TAG_NULL,
            data: 0,
        }
    }

    /// The exception marker
    #[inline]
    pub const fn exception() -> Self {
        Self {
            tag: TAG_EXCEPTION,
            data: 0,
        }
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Self {
            tag: TAG_BOOL,
            data: b as u64,
        }
    }

    /// Create a 32-bit integer value
    #[inline]
    pub const fn i32(i: i32) -> Self {
        Self {
            tag: TAG_INT,
            data: i as u32 as u64,
        }
    }

    /// Create a double value
    #[inline]
    pub fn f64(f: f64) -> Self {
        Self {
            tag: TAG_FLOAT,
            data: f.to_bits(),
        }
    }

    /// Wrap a runtime string handle
    #[inline]
    pub const fn string(handle: u64) -> Self {
        Self {
            tag: TAG_STRING,
            data: handle,
        }
    }

    /// Wrap a runtime object handle
    #[inline]
    pub const fn object(handle: u64) -> Self {
        Self {
            tag: TAG_OBJECT,
            data: handle,
        }
    }

    /// Wrap a runtime function handle
    #[inline]
    pub const fn function(handle: u64) -> Self {
        Self {
            tag: TAG_FUNCTION,
            data: handle,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Decode the tag
    pub fn kind(&self) -> ValueKind {
        match self.tag {
            TAG_NULL => ValueKind::Null,
            TAG_BOOL => ValueKind::Bool,
            TAG_INT => ValueKind::Int,
            TAG_FLOAT => ValueKind::Float,
            TAG_STRING => ValueKind::String,
            TAG_OBJECT => ValueKind::Object,
            TAG_FUNCTION => ValueKind::Function,
            TAG_EXCEPTION => ValueKind::Exception,
            _ => ValueKind::Undefined,
        }
    }

    /// Check for `undefined`
    pub fn is_undefined(&self) -> bool {
        self.tag == TAG_UNDEFINED
    }

    /// Check for the exception marker
    pub fn is_exception(&self) -> bool {
        self.tag == TAG_EXCEPTION
    }

    /// Get as boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        (self.tag == TAG_BOOL).then_some(self.data != 0)
    }

    /// Get as i32 if this is an integer
    pub fn as_i32(&self) -> Option<i32> {
        (self.tag == TAG_INT).then_some(self.data as u32 as i32)
    }

    /// Get as f64 if this is a double
    pub fn as_f64(&self) -> Option<f64> {
        (self.tag == TAG_FLOAT).then(|| f64::from_bits(self.data))
    }

    /// Runtime handle carried by string, object and function values
    pub fn handle(&self) -> Option<u64> {
        matches!(self.tag, TAG_STRING | TAG_OBJECT | TAG_FUNCTION).then_some(self.data)
    }
}

impl Default for NativeValue {
    fn default() -> Self {
        Self::undefined()
    }
}

impl std::fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            ValueKind::Undefined => write!(f, "NativeValue::Undefined"),
            ValueKind::Null => write!(f, "NativeValue::Null"),
            ValueKind::Exception => write!(f, "NativeValue::Exception"),
            ValueKind::Bool => write!(f, "NativeValue::Bool({})", self.data != 0),
            ValueKind::Int => write!(f, "NativeValue::Int({})", self.data as u32 as i32),
            ValueKind::Float => write!(f, "NativeValue::Float({})", f64::from_bits(self.data)),
            kind => write!(f, "NativeValue::{:?}({:#x})", kind, self.data),
        }
    }
}
