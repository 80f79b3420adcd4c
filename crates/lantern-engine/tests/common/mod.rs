//! Recording engine double shared by the integration tests
//!
//! Implements `EngineContext` over plain maps: objects are property lists,
//! module records track declared and bound exports, and every class
//! registration, import-meta write and thrown error is recorded.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::ffi::{c_int, CStr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lantern_engine::sdk::{
    AbiError, AbiResult, ClassDef, ClassId, EngineContext, EntryKind, FunctionListEntry,
    ImportMeta, ModuleData, ModuleHandle, ModuleInitFn, NativeValue, PropFlags,
};
use lantern_engine::SourceReader;

/// Property as the engine double stores it
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    Function { length: u8, magic: Option<i16> },
    Accessor { get: bool, set: bool },
    Int(i64),
    Double(f64),
    Str(String),
    Undefined,
    Alias(String),
    Object(u64),
    Value(NativeValue),
}

#[derive(Debug, Default, Clone)]
pub struct MockObject {
    pub props: Vec<(String, Prop, PropFlags)>,
}

impl MockObject {
    pub fn get(&self, name: &str) -> Option<&Prop> {
        self.props.iter().find(|(n, _, _)| n == name).map(|(_, p, _)| p)
    }

    pub fn flags(&self, name: &str) -> Option<PropFlags> {
        self.props.iter().find(|(n, _, _)| n == name).map(|(_, _, f)| *f)
    }

    pub fn names(&self) -> Vec<&str> {
        self.props.iter().map(|(n, _, _)| n.as_str()).collect()
    }
}

pub struct MockModule {
    pub name: String,
    pub init: Option<ModuleInitFn>,
    pub declared: Vec<String>,
    pub bound: Vec<(String, Prop)>,
    pub source: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thrown {
    Reference(String),
    Type(String),
}

#[derive(Default)]
pub struct MockEngine {
    next_handle: u64,
    next_class_id: u32,

    pub objects: HashMap<u64, MockObject>,
    pub freed: Vec<u64>,

    pub new_class_calls: usize,
    pub classes: HashMap<ClassId, (String, ClassDef)>,
    pub class_protos: HashMap<ClassId, u64>,
    pub constructors: HashSet<u64>,

    pub modules: HashMap<u64, MockModule>,
    pub discarded: Vec<u64>,
    data: HashMap<u64, ModuleData>,
    pub import_meta: HashMap<u64, ImportMeta>,
    pub thrown: Vec<Thrown>,

    /// Fail the next N `new_class` calls
    pub reject_classes: usize,
    /// Fail every `new_c_module` call
    pub reject_modules: bool,
    /// Fail every `compile_module` call
    pub reject_compile: bool,
    /// Fail every `define_property` call
    pub reject_define: bool,
    /// Fail every `add_module_export_list` call
    pub reject_export_list: bool,
    /// Fail every `set_import_meta` call
    pub reject_import_meta: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn object(&self, value: NativeValue) -> &MockObject {
        let handle = value.handle().expect("not an object value");
        &self.objects[&handle]
    }

    pub fn object_by_handle(&self, handle: u64) -> &MockObject {
        &self.objects[&handle]
    }

    pub fn module(&self, module: ModuleHandle) -> &MockModule {
        &self.modules[&module.0]
    }

    /// Run the instantiation callback of a native module record
    pub fn instantiate(&mut self, module: ModuleHandle) -> c_int {
        let init = self.modules[&module.0].init.expect("not a native module");
        init(self, module)
    }

    fn decode(&mut self, entry: &FunctionListEntry) -> (String, Prop) {
        let name = unsafe { entry.name() }.to_string_lossy().into_owned();
        let prop = match unsafe { entry.kind() } {
            EntryKind::Function { length, .. } => Prop::Function { length, magic: None },
            EntryKind::FunctionMagic { length, magic, .. } => Prop::Function {
                length,
                magic: Some(magic),
            },
            EntryKind::Accessor { getter, setter } => Prop::Accessor {
                get: getter.is_some(),
                set: setter.is_some(),
            },
            EntryKind::String(s) => Prop::Str(s.to_string_lossy().into_owned()),
            EntryKind::Int32(i) => Prop::Int(i as i64),
            EntryKind::Int64(i) => Prop::Int(i),
            EntryKind::Double(d) => Prop::Double(d),
            EntryKind::Undefined => Prop::Undefined,
            EntryKind::Alias { target, .. } => Prop::Alias(target.to_string_lossy().into_owned()),
            EntryKind::Object(table) => {
                let handle = self.handle();
                let props = table
                    .iter()
                    .map(|e| {
                        let (n, p) = self.decode(e);
                        (n, p, e.flags())
                    })
                    .collect();
                self.objects.insert(handle, MockObject { props });
                Prop::Object(handle)
            }
        };
        (name, prop)
    }

    fn value_prop(value: NativeValue) -> Prop {
        match value.kind() {
            lantern_engine::sdk::ValueKind::Object => Prop::Object(value.handle().unwrap_or(0)),
            _ => Prop::Value(value),
        }
    }
}

impl EngineContext for MockEngine {
    fn new_object(&mut self) -> AbiResult<NativeValue> {
        let handle = self.handle();
        self.objects.insert(handle, MockObject::default());
        Ok(NativeValue::object(handle))
    }

    fn free_value(&mut self, value: NativeValue) {
        if let Some(handle) = value.handle() {
            self.objects.remove(&handle);
            self.freed.push(handle);
        }
    }

    fn set_property_list(
        &mut self,
        obj: NativeValue,
        entries: &[FunctionListEntry],
    ) -> AbiResult<()> {
        let handle = obj.handle().ok_or(AbiError::Exception)?;
        let props: Vec<_> = entries
            .iter()
            .map(|e| {
                let (n, p) = self.decode(e);
                (n, p, e.flags())
            })
            .collect();
        self.objects
            .get_mut(&handle)
            .ok_or(AbiError::Exception)?
            .props
            .extend(props);
        Ok(())
    }

    fn define_property(
        &mut self,
        obj: NativeValue,
        name: &CStr,
        value: NativeValue,
        flags: PropFlags,
    ) -> AbiResult<()> {
        if self.reject_define {
            self.free_value(value);
            return Err(AbiError::Property("rejected".into()));
        }
        let handle = obj.handle().ok_or(AbiError::Exception)?;
        let prop = Self::value_prop(value);
        self.objects
            .get_mut(&handle)
            .ok_or(AbiError::Exception)?
            .props
            .push((name.to_string_lossy().into_owned(), prop, flags));
        Ok(())
    }

    fn new_class_id(&mut self) -> AbiResult<ClassId> {
        self.next_class_id += 1;
        ClassId::new(self.next_class_id).ok_or(AbiError::ClassIdsExhausted)
    }

    fn new_class(&mut self, id: ClassId, def: &ClassDef) -> AbiResult<()> {
        self.new_class_calls += 1;
        if self.reject_classes > 0 {
            self.reject_classes -= 1;
            return Err(AbiError::ClassRegistration("rejected".into()));
        }
        let name = unsafe { CStr::from_ptr(def.class_name) }
            .to_string_lossy()
            .into_owned();
        self.classes.insert(id, (name, *def));
        Ok(())
    }

    fn set_class_proto(&mut self, id: ClassId, proto: NativeValue) {
        if let Some(handle) = proto.handle() {
            self.class_protos.insert(id, handle);
        }
    }

    fn set_constructor_bit(&mut self, func: NativeValue, on: bool) -> AbiResult<()> {
        let handle = func.handle().ok_or(AbiError::Exception)?;
        if on {
            self.constructors.insert(handle);
        } else {
            self.constructors.remove(&handle);
        }
        Ok(())
    }

    fn new_c_module(&mut self, name: &CStr, init: ModuleInitFn) -> AbiResult<ModuleHandle> {
        if self.reject_modules {
            return Err(AbiError::Module("rejected".into()));
        }
        let handle = self.handle();
        self.modules.insert(
            handle,
            MockModule {
                name: name.to_string_lossy().into_owned(),
                init: Some(init),
                declared: Vec::new(),
                bound: Vec::new(),
                source: None,
            },
        );
        Ok(ModuleHandle(handle))
    }

    fn add_module_export(&mut self, module: ModuleHandle, name: &CStr) -> AbiResult<()> {
        let record = self
            .modules
            .get_mut(&module.0)
            .ok_or(AbiError::Module("no such module".into()))?;
        record.declared.push(name.to_string_lossy().into_owned());
        Ok(())
    }

    fn add_module_export_list(
        &mut self,
        module: ModuleHandle,
        entries: &[FunctionListEntry],
    ) -> AbiResult<()> {
        if self.reject_export_list {
            return Err(AbiError::Module("declare rejected".into()));
        }
        for entry in entries {
            self.add_module_export(module, unsafe { entry.name() })?;
        }
        Ok(())
    }

    fn set_module_export(
        &mut self,
        module: ModuleHandle,
        name: &CStr,
        value: NativeValue,
    ) -> AbiResult<()> {
        let prop = Self::value_prop(value);
        let record = self
            .modules
            .get_mut(&module.0)
            .ok_or(AbiError::Module("no such module".into()))?;
        let name = name.to_string_lossy().into_owned();
        if !record.declared.contains(&name) {
            return Err(AbiError::Module(format!("export '{name}' was not declared")));
        }
        record.bound.push((name, prop));
        Ok(())
    }

    fn set_module_export_list(
        &mut self,
        module: ModuleHandle,
        entries: &[FunctionListEntry],
    ) -> AbiResult<()> {
        for entry in entries {
            let (name, prop) = self.decode(entry);
            let record = self
                .modules
                .get_mut(&module.0)
                .ok_or(AbiError::Module("no such module".into()))?;
            if !record.declared.contains(&name) {
                return Err(AbiError::Module(format!("export '{name}' was not declared")));
            }
            record.bound.push((name, prop));
        }
        Ok(())
    }

    fn attach_module_data(&mut self, module: ModuleHandle, data: ModuleData) {
        self.data.insert(module.0, data);
    }

    fn module_data(&self, module: ModuleHandle) -> Option<ModuleData> {
        self.data.get(&module.0).cloned()
    }

    fn compile_module(&mut self, source: &[u8], name: &CStr) -> AbiResult<ModuleHandle> {
        if self.reject_compile {
            return Err(AbiError::Compile("SyntaxError".into()));
        }
        let handle = self.handle();
        self.modules.insert(
            handle,
            MockModule {
                name: name.to_string_lossy().into_owned(),
                init: None,
                declared: Vec::new(),
                bound: Vec::new(),
                source: Some(source.to_vec()),
            },
        );
        Ok(ModuleHandle(handle))
    }

    fn discard_module(&mut self, module: ModuleHandle) {
        self.modules.remove(&module.0);
        self.data.remove(&module.0);
        self.discarded.push(module.0);
    }

    fn set_import_meta(&mut self, module: ModuleHandle, meta: &ImportMeta) -> AbiResult<()> {
        if self.reject_import_meta {
            return Err(AbiError::Module("import.meta rejected".into()));
        }
        self.import_meta.insert(module.0, meta.clone());
        Ok(())
    }

    fn throw_reference_error(&mut self, message: &str) -> NativeValue {
        self.thrown.push(Thrown::Reference(message.to_string()));
        NativeValue::exception()
    }

    fn throw_type_error(&mut self, message: &str) -> NativeValue {
        self.thrown.push(Thrown::Type(message.to_string()));
        NativeValue::exception()
    }
}

/// Source reader that counts reads and serves fixed contents
#[derive(Clone, Default)]
pub struct CountingReader {
    pub reads: Arc<AtomicUsize>,
    pub files: Arc<HashMap<String, Vec<u8>>>,
}

impl CountingReader {
    pub fn with_file(path: &str, source: &str) -> Self {
        let mut files = HashMap::new();
        files.insert(path.to_string(), source.as_bytes().to_vec());
        Self {
            reads: Arc::new(AtomicUsize::new(0)),
            files: Arc::new(files),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SourceReader for CountingReader {
    fn read(&self, path: &std::path::Path) -> std::io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(&path.to_string_lossy().into_owned())
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}
