//! Native-extension descriptor records
//!
//! `FunctionListEntry` is the flat, plain-old-data record the runtime's
//! property-list API consumes: a name pointer, property flags, a definition
//! tag and a tagged payload. Arrays of these are installed on objects and
//! module records in one call.
//!
//! Records never own the strings they point at. Whoever builds them must keep
//! those strings alive for as long as the records are in use (see
//! [`StringPool`](crate::pool::StringPool)).

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ops::{BitOr, BitOrAssign};

use crate::value::{NativeValue, RawContext, RawRuntime};

// ============================================================================
// Callback signatures
// ============================================================================

/// Plain native function: `(ctx, this, argc, argv) -> result`
pub type NativeFn = extern "C" fn(
    ctx: *mut RawContext,
    this: NativeValue,
    argc: c_int,
    argv: *const NativeValue,
) -> NativeValue;

/// Native function receiving the entry's dispatch tag as last argument
pub type NativeFnMagic = extern "C" fn(
    ctx: *mut RawContext,
    this: NativeValue,
    argc: c_int,
    argv: *const NativeValue,
    magic: c_int,
) -> NativeValue;

/// Property getter
pub type Getter = extern "C" fn(ctx: *mut RawContext, this: NativeValue) -> NativeValue;

/// Property setter
pub type Setter =
    extern "C" fn(ctx: *mut RawContext, this: NativeValue, value: NativeValue) -> NativeValue;

/// Constructor / call handler of a native type
pub type ClassCall = extern "C" fn(
    ctx: *mut RawContext,
    func_obj: NativeValue,
    this: NativeValue,
    argc: c_int,
    argv: *const NativeValue,
    flags: c_int,
) -> NativeValue;

/// Called when the collector frees an instance of a native type
pub type Finalizer = extern "C" fn(rt: *mut RawRuntime, value: NativeValue);

/// Marking callback handed to a [`GcMarker`]
pub type MarkFn = extern "C" fn(rt: *mut RawRuntime, cell: *mut c_void);

/// Reports the values an instance of a native type keeps alive
pub type GcMarker = extern "C" fn(rt: *mut RawRuntime, value: NativeValue, mark: MarkFn);

// ============================================================================
// Property flags
// ============================================================================

/// Property attribute bits (configurable / writable / enumerable).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropFlags(u8);

impl PropFlags {
    /// No attributes
    pub const NONE: Self = Self(0);
    /// Property can be deleted / redefined
    pub const CONFIGURABLE: Self = Self(1 << 0);
    /// Property value can be assigned
    pub const WRITABLE: Self = Self(1 << 1);
    /// Property shows up in enumeration
    pub const ENUMERABLE: Self = Self(1 << 2);
    /// CONFIGURABLE | WRITABLE | ENUMERABLE
    pub const C_W_E: Self = Self(0b111);
    /// CONFIGURABLE | WRITABLE, used for functions and aliases
    pub const C_W: Self = Self(0b011);

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if every bit of `other` is set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for PropFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ============================================================================
// Record layout
// ============================================================================

/// Definition tag of a [`FunctionListEntry`]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefType {
    /// Native function
    CFunc = 0,
    /// Getter/setter pair
    CGetSet = 1,
    /// String-valued property
    PropString = 3,
    /// Int32-valued property
    PropInt32 = 4,
    /// Int64-valued property
    PropInt64 = 5,
    /// Double-valued property
    PropDouble = 6,
    /// Property initialised to `undefined`
    PropUndefined = 7,
    /// Nested object built from another descriptor table
    Object = 8,
    /// Alias of another property
    Alias = 9,
}

/// Calling convention of a function entry
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CFuncProto {
    /// [`NativeFn`]
    Generic = 0,
    /// [`NativeFnMagic`]
    GenericMagic = 1,
}

/// Function pointer slot of a function entry
#[repr(C)]
#[derive(Clone, Copy)]
pub union CFunction {
    /// Valid when the prototype is [`CFuncProto::Generic`]
    pub generic: NativeFn,
    /// Valid when the prototype is [`CFuncProto::GenericMagic`]
    pub generic_magic: NativeFnMagic,
}

/// Payload of a function entry
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FuncDef {
    /// Declared arity
    pub length: u8,
    /// Which union member of `cfunc` is valid
    pub cproto: CFuncProto,
    /// Function pointer
    pub cfunc: CFunction,
}

/// Payload of an accessor entry
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GetSetDef {
    /// Getter, if readable
    pub get: Option<Getter>,
    /// Setter, if writable
    pub set: Option<Setter>,
}

/// Payload of an alias entry
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AliasDef {
    /// Name of the aliased property
    pub name: *const c_char,
    /// Lookup base; -1 means the object the entry is installed on
    pub base: c_int,
}

/// Payload of a nested-table entry
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PropListDef {
    /// First record of the nested table
    pub tab: *const FunctionListEntry,
    /// Record count
    pub len: c_int,
}

/// Tagged payload; `FunctionListEntry::def_type` selects the valid member.
#[repr(C)]
#[derive(Clone, Copy)]
pub union EntryPayload {
    /// [`DefType::CFunc`]
    pub func: FuncDef,
    /// [`DefType::CGetSet`]
    pub getset: GetSetDef,
    /// [`DefType::Alias`]
    pub alias: AliasDef,
    /// [`DefType::Object`]
    pub prop_list: PropListDef,
    /// [`DefType::PropString`]
    pub str: *const c_char,
    /// [`DefType::PropInt32`]
    pub i32: i32,
    /// [`DefType::PropInt64`]
    pub i64: i64,
    /// [`DefType::PropDouble`]
    pub f64: f64,
}

/// One exported name-to-capability record.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FunctionListEntry {
    name: *const c_char,
    prop_flags: PropFlags,
    def_type: DefType,
    magic: i16,
    u: EntryPayload,
}

// Records are immutable once built and never dereference their pointers
// themselves; keeping the targets alive is the builder's job.
unsafe impl Send for FunctionListEntry {}
unsafe impl Sync for FunctionListEntry {}

/// Safe, decoded view of a record's payload.
#[derive(Debug, Clone, Copy)]
pub enum EntryKind<'a> {
    /// Plain native function
    Function {
        /// Declared arity
        length: u8,
        /// Function pointer
        func: NativeFn,
    },
    /// Native function with a dispatch tag
    FunctionMagic {
        /// Declared arity
        length: u8,
        /// Function pointer
        func: NativeFnMagic,
        /// Dispatch tag passed back on every call
        magic: i16,
    },
    /// Getter/setter pair
    Accessor {
        /// Getter
        getter: Option<Getter>,
        /// Setter
        setter: Option<Setter>,
    },
    /// String property
    String(&'a CStr),
    /// Int32 property
    Int32(i32),
    /// Int64 property
    Int64(i64),
    /// Double property
    Double(f64),
    /// `undefined` property
    Undefined,
    /// Nested descriptor table
    Object(&'a [FunctionListEntry]),
    /// Alias of another property
    Alias {
        /// Aliased name
        target: &'a CStr,
        /// Lookup base
        base: i32,
    },
}

impl FunctionListEntry {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Native function entry
    pub const fn function(name: *const c_char, length: u8, func: NativeFn) -> Self {
        Self {
            name,
            prop_flags: PropFlags::C_W,
            def_type: DefType::CFunc,
            magic: 0,
            u: EntryPayload {
                func: FuncDef {
                    length,
                    cproto: CFuncProto::Generic,
                    cfunc: CFunction { generic: func },
                },
            },
        }
    }

    /// Native function entry with a dispatch tag
    pub const fn function_magic(
        name: *const c_char,
        length: u8,
        func: NativeFnMagic,
        magic: i16,
    ) -> Self {
        Self {
            name,
            prop_flags: PropFlags::C_W,
            def_type: DefType::CFunc,
            magic,
            u: EntryPayload {
                func: FuncDef {
                    length,
                    cproto: CFuncProto::GenericMagic,
                    cfunc: CFunction {
                        generic_magic: func,
                    },
                },
            },
        }
    }

    /// Getter/setter entry
    pub const fn accessor(name: *const c_char, get: Option<Getter>, set: Option<Setter>) -> Self {
        Self {
            name,
            prop_flags: PropFlags::CONFIGURABLE,
            def_type: DefType::CGetSet,
            magic: 0,
            u: EntryPayload {
                getset: GetSetDef { get, set },
            },
        }
    }

    /// String property entry; `value` must be NUL-terminated
    pub const fn string(name: *const c_char, value: *const c_char, flags: PropFlags) -> Self {
        Self {
            name,
            prop_flags: flags,
            def_type: DefType::PropString,
            magic: 0,
            u: EntryPayload { str: value },
        }
    }

    /// Int32 property entry
    pub const fn int32(name: *const c_char, value: i32, flags: PropFlags) -> Self {
        Self {
            name,
            prop_flags: flags,
            def_type: DefType::PropInt32,
            magic: 0,
            u: EntryPayload { i32: value },
        }
    }

    /// Int64 property entry
    pub const fn int64(name: *const c_char, value: i64, flags: PropFlags) -> Self {
        Self {
            name,
            prop_flags: flags,
            def_type: DefType::PropInt64,
            magic: 0,
            u: EntryPayload { i64: value },
        }
    }

    /// Double property entry
    pub const fn double(name: *const c_char, value: f64, flags: PropFlags) -> Self {
        Self {
            name,
            prop_flags: flags,
            def_type: DefType::PropDouble,
            magic: 0,
            u: EntryPayload { f64: value },
        }
    }

    /// `undefined` property entry
    pub const fn undefined(name: *const c_char, flags: PropFlags) -> Self {
        Self {
            name,
            prop_flags: flags,
            def_type: DefType::PropUndefined,
            magic: 0,
            u: EntryPayload { i32: 0 },
        }
    }

    /// Nested object built from a static descriptor table.
    ///
    /// # Panics
    /// If the table holds more than `c_int::MAX` records; in a `const`
    /// context this is a compile error.
    pub const fn object(
        name: *const c_char,
        table: &'static [FunctionListEntry],
        flags: PropFlags,
    ) -> Self {
        assert!(
            table.len() <= c_int::MAX as usize,
            "descriptor table too long"
        );
        Self {
            name,
            prop_flags: flags,
            def_type: DefType::Object,
            magic: 0,
            u: EntryPayload {
                prop_list: PropListDef {
                    tab: table.as_ptr(),
                    len: table.len() as c_int,
                },
            },
        }
    }

    /// Alias entry; a `base` of -1 resolves `target` on the same object
    pub const fn alias(name: *const c_char, target: *const c_char, base: c_int) -> Self {
        Self {
            name,
            prop_flags: PropFlags::C_W,
            def_type: DefType::Alias,
            magic: 0,
            u: EntryPayload {
                alias: AliasDef { name: target, base },
            },
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Raw name pointer
    pub fn name_ptr(&self) -> *const c_char {
        self.name
    }

    /// Property flags
    pub fn flags(&self) -> PropFlags {
        self.prop_flags
    }

    /// Definition tag
    pub fn def_type(&self) -> DefType {
        self.def_type
    }

    /// Dispatch tag (0 unless built with [`function_magic`](Self::function_magic))
    pub fn magic(&self) -> i16 {
        self.magic
    }

    /// Every string pointer this record carries (name, alias target, string value).
    pub fn string_ptrs(&self) -> Vec<*const c_char> {
        let mut ptrs = vec![self.name];
        // SAFETY: the payload member read matches `def_type`.
        match self.def_type {
            DefType::Alias => ptrs.push(unsafe { self.u.alias.name }),
            DefType::PropString => ptrs.push(unsafe { self.u.str }),
            _ => {}
        }
        ptrs
    }

    /// Borrow the name.
    ///
    /// # Safety
    ///
    /// The name pointer must still be valid for `'a`.
    pub unsafe fn name<'a>(&self) -> &'a CStr {
        CStr::from_ptr(self.name)
    }

    /// Decode the payload.
    ///
    /// # Safety
    ///
    /// Every pointer carried by the record (string value, alias target,
    /// nested table) must still be valid for `'a`.
    pub unsafe fn kind<'a>(&self) -> EntryKind<'a> {
        match self.def_type {
            DefType::CFunc => {
                let func = self.u.func;
                match func.cproto {
                    CFuncProto::Generic => EntryKind::Function {
                        length: func.length,
                        func: func.cfunc.generic,
                    },
                    CFuncProto::GenericMagic => EntryKind::FunctionMagic {
                        length: func.length,
                        func: func.cfunc.generic_magic,
                        magic: self.magic,
                    },
                }
            }
            DefType::CGetSet => EntryKind::Accessor {
                getter: self.u.getset.get,
                setter: self.u.getset.set,
            },
            DefType::PropString => EntryKind::String(CStr::from_ptr(self.u.str)),
            DefType::PropInt32 => EntryKind::Int32(self.u.i32),
            DefType::PropInt64 => EntryKind::Int64(self.u.i64),
            DefType::PropDouble => EntryKind::Double(self.u.f64),
            DefType::PropUndefined => EntryKind::Undefined,
            DefType::Object => {
                let list = self.u.prop_list;
                let len = usize::try_from(list.len).unwrap_or(0);
                if len == 0 {
                    EntryKind::Object(&[])
                } else {
                    EntryKind::Object(std::slice::from_raw_parts(list.tab, len))
                }
            }
            DefType::Alias => EntryKind::Alias {
                target: CStr::from_ptr(self.u.alias.name),
                base: self.u.alias.base,
            },
        }
    }

    /// Copy of this record with every string re-homed through `rehome`.
    ///
    /// Function pointers, numbers, flags and nested-table pointers are
    /// copied verbatim.
    ///
    /// # Safety
    ///
    /// The record's string pointers must be valid while `rehome` runs.
    pub unsafe fn map_strings(
        &self,
        mut rehome: impl FnMut(&CStr) -> *const c_char,
    ) -> Self {
        let mut copy = *self;
        copy.name = rehome(CStr::from_ptr(self.name));
        match self.def_type {
            DefType::Alias => copy.u.alias.name = rehome(CStr::from_ptr(self.u.alias.name)),
            DefType::PropString => copy.u.str = rehome(CStr::from_ptr(self.u.str)),
            _ => {}
        }
        copy
    }
}

impl std::fmt::Debug for FunctionListEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionListEntry")
            .field("name", &self.name)
            .field("def_type", &self.def_type)
            .field("flags", &self.prop_flags)
            .field("magic", &self.magic)
            .finish()
    }
}
