//! Builds small class files in memory for tests.
//!
//! Strings must be ASCII without NUL, for which modified UTF-8 and UTF-8
//! agree. Every pool entry is interned, so asking for the same constant twice
//! returns the same index.

use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_MODULE: u16 = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Class(String),
    String(String),
    NameAndType(String, String),
    MethodRef(String, String, String),
    MethodType(String),
    Long(i64),
    Package(String),
    Module(String),
}

#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    pool: Vec<u8>,
    pool_count: u16,
    interned: HashMap<PoolKey, u16>,
    major_version: u16,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassFileBuilder {
    pub fn new(name: &str, super_name: Option<&str>) -> ClassFileBuilder {
        let mut builder = ClassFileBuilder {
            pool: Vec::new(),
            pool_count: 1,
            interned: HashMap::new(),
            major_version: 61,
            access: ACC_PUBLIC | ACC_SUPER,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        };
        builder.this_class = builder.class(name);
        builder.super_class = super_name.map_or(0, |super_name| builder.class(super_name));
        builder
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn major_version(mut self, major_version: u16) -> Self {
        self.major_version = major_version;
        self
    }

    fn intern(&mut self, key: PoolKey, slots: u16, entry: impl FnOnce(&mut Self) -> Vec<u8>) -> u16 {
        if let Some(&index) = self.interned.get(&key) {
            return index;
        }
        let bytes = entry(self);
        let index = self.pool_count;
        self.pool.extend_from_slice(&bytes);
        self.pool_count += slots;
        self.interned.insert(key, index);
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        assert!(
            value.bytes().all(|b| b != 0 && b.is_ascii()),
            "only ASCII constants are supported: {value:?}"
        );
        self.intern(PoolKey::Utf8(value.to_owned()), 1, |_| {
            let mut bytes = vec![1];
            bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
            bytes.extend_from_slice(value.as_bytes());
            bytes
        })
    }

    fn indexed(&mut self, key: PoolKey, tag: u8, value: &str) -> u16 {
        self.intern(key, 1, |this| {
            let utf8 = this.utf8(value);
            let mut bytes = vec![tag];
            bytes.extend_from_slice(&utf8.to_be_bytes());
            bytes
        })
    }

    pub fn class(&mut self, name: &str) -> u16 {
        self.indexed(PoolKey::Class(name.to_owned()), 7, name)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        self.indexed(PoolKey::String(value.to_owned()), 8, value)
    }

    pub fn method_type(&mut self, descriptor: &str) -> u16 {
        self.indexed(PoolKey::MethodType(descriptor.to_owned()), 16, descriptor)
    }

    pub fn module(&mut self, name: &str) -> u16 {
        self.indexed(PoolKey::Module(name.to_owned()), 19, name)
    }

    pub fn package(&mut self, name: &str) -> u16 {
        self.indexed(PoolKey::Package(name.to_owned()), 20, name)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let key = PoolKey::NameAndType(name.to_owned(), descriptor.to_owned());
        self.intern(key, 1, |this| {
            let name = this.utf8(name);
            let descriptor = this.utf8(descriptor);
            let mut bytes = vec![12];
            bytes.extend_from_slice(&name.to_be_bytes());
            bytes.extend_from_slice(&descriptor.to_be_bytes());
            bytes
        })
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let key = PoolKey::MethodRef(owner.to_owned(), name.to_owned(), descriptor.to_owned());
        self.intern(key, 1, |this| {
            let owner = this.class(owner);
            let name_and_type = this.name_and_type(name, descriptor);
            let mut bytes = vec![10];
            bytes.extend_from_slice(&owner.to_be_bytes());
            bytes.extend_from_slice(&name_and_type.to_be_bytes());
            bytes
        })
    }

    /// Takes two pool slots.
    pub fn long(&mut self, value: i64) -> u16 {
        self.intern(PoolKey::Long(value), 2, |_| {
            let mut bytes = vec![5];
            bytes.extend_from_slice(&value.to_be_bytes());
            bytes
        })
    }

    pub fn interface(&mut self, name: &str) {
        let index = self.class(name);
        self.interfaces.push(index);
    }

    pub fn attribute(&mut self, name: &str, body: &[u8]) -> Vec<u8> {
        let mut bytes = self.utf8(name).to_be_bytes().to_vec();
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    pub fn signature_attribute(&mut self, signature: &str) -> Vec<u8> {
        let index = self.utf8(signature);
        self.attribute("Signature", &index.to_be_bytes())
    }

    /// A `Code` attribute with the given bytecode, no exception table and the
    /// given nested attributes.
    pub fn code_attribute(&mut self, code: &[u8], attributes: &[Vec<u8>]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&4u16.to_be_bytes());
        body.extend_from_slice(&(code.len() as u32).to_be_bytes());
        body.extend_from_slice(code);
        body.extend_from_slice(&0u16.to_be_bytes());
        push_attributes(&mut body, attributes);
        self.attribute("Code", &body)
    }

    /// `LocalVariableTable`, or `LocalVariableTypeTable` when `types` is set,
    /// with `(name, descriptor)` entries.
    pub fn local_variables(&mut self, types: bool, entries: &[(&str, &str)]) -> Vec<u8> {
        let mut body = (entries.len() as u16).to_be_bytes().to_vec();
        for (slot, (name, descriptor)) in entries.iter().enumerate() {
            let name = self.utf8(name);
            let descriptor = self.utf8(descriptor);
            body.extend_from_slice(&0u16.to_be_bytes());
            body.extend_from_slice(&1u16.to_be_bytes());
            body.extend_from_slice(&name.to_be_bytes());
            body.extend_from_slice(&descriptor.to_be_bytes());
            body.extend_from_slice(&(slot as u16).to_be_bytes());
        }
        let name = if types {
            "LocalVariableTypeTable"
        } else {
            "LocalVariableTable"
        };
        self.attribute(name, &body)
    }

    /// An `annotation` structure; element values come from the `*_value`
    /// helpers.
    pub fn annotation(&mut self, descriptor: &str, elements: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut bytes = self.utf8(descriptor).to_be_bytes().to_vec();
        bytes.extend_from_slice(&(elements.len() as u16).to_be_bytes());
        for (name, value) in elements {
            bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
            bytes.extend_from_slice(value);
        }
        bytes
    }

    pub fn string_value(&mut self, value: &str) -> Vec<u8> {
        let mut bytes = vec![b's'];
        bytes.extend_from_slice(&self.utf8(value).to_be_bytes());
        bytes
    }

    pub fn class_value(&mut self, descriptor: &str) -> Vec<u8> {
        let mut bytes = vec![b'c'];
        bytes.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        bytes
    }

    pub fn enum_value(&mut self, descriptor: &str, name: &str) -> Vec<u8> {
        let mut bytes = vec![b'e'];
        bytes.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes
    }

    pub fn annotation_value(annotation: Vec<u8>) -> Vec<u8> {
        let mut bytes = vec![b'@'];
        bytes.extend(annotation);
        bytes
    }

    pub fn array_value(values: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = vec![b'['];
        bytes.extend_from_slice(&(values.len() as u16).to_be_bytes());
        for value in values {
            bytes.extend_from_slice(value);
        }
        bytes
    }

    pub fn annotations_attribute(&mut self, annotations: &[Vec<u8>]) -> Vec<u8> {
        let mut body = (annotations.len() as u16).to_be_bytes().to_vec();
        for annotation in annotations {
            body.extend_from_slice(annotation);
        }
        self.attribute("RuntimeVisibleAnnotations", &body)
    }

    /// A `RuntimeVisibleTypeAnnotations` attribute whose annotations all
    /// target a field type with an empty type path.
    pub fn field_type_annotations_attribute(&mut self, annotations: &[Vec<u8>]) -> Vec<u8> {
        let mut body = (annotations.len() as u16).to_be_bytes().to_vec();
        for annotation in annotations {
            body.push(0x13);
            body.push(0);
            body.extend_from_slice(annotation);
        }
        self.attribute("RuntimeVisibleTypeAnnotations", &body)
    }

    pub fn field(&mut self, access: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) {
        let member = self.member(access, name, descriptor, attributes);
        self.fields.push(member);
    }

    pub fn method(&mut self, access: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) {
        let member = self.member(access, name, descriptor, attributes);
        self.methods.push(member);
    }

    fn member(&mut self, access: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = access.to_be_bytes().to_vec();
        bytes.extend_from_slice(&self.utf8(name).to_be_bytes());
        bytes.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        push_attributes(&mut bytes, attributes);
        bytes
    }

    pub fn class_attribute(&mut self, attribute: Vec<u8>) {
        self.attributes.push(attribute);
    }

    pub fn build(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xcafebabe_u32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&self.major_version.to_be_bytes());
        bytes.extend_from_slice(&self.pool_count.to_be_bytes());
        bytes.extend_from_slice(&self.pool);
        bytes.extend_from_slice(&self.access.to_be_bytes());
        bytes.extend_from_slice(&self.this_class.to_be_bytes());
        bytes.extend_from_slice(&self.super_class.to_be_bytes());
        bytes.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            bytes.extend_from_slice(&interface.to_be_bytes());
        }
        for members in [&self.fields, &self.methods] {
            bytes.extend_from_slice(&(members.len() as u16).to_be_bytes());
            for member in members {
                bytes.extend_from_slice(member);
            }
        }
        push_attributes(&mut bytes, &self.attributes);
        bytes
    }
}

fn push_attributes(bytes: &mut Vec<u8>, attributes: &[Vec<u8>]) {
    bytes.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
    for attribute in attributes {
        bytes.extend_from_slice(attribute);
    }
}
