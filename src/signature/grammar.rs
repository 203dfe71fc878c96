//! Descriptor and generic signature grammar.
//!
//! Parsing produces a small owned tree whose `Display` implementation writes
//! the exact input back, so a tree that was not remapped serializes to the
//! same bytes it was parsed from. Class names are rewritten in place through
//! [`Remap`].

use crate::{GrammarError, GrammarResult};
use std::fmt::{Display, Formatter, Write};

/// Which generic signature grammar applies to a `Signature` attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum SignatureType {
    Class,
    Field,
    Method,
}

/// Rewrites the binary class names embedded in a parsed tree. The mapper
/// returns `None` for names it leaves alone; `remap` reports whether
/// anything changed.
pub trait Remap {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool;
}

// --------------------------------------------------------------------
// Descriptors

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Base(u8),
    Object(String),
    Array(Box<FieldType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` is `V`.
    pub ret: Option<FieldType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Field(FieldType),
    Method(MethodDescriptor),
}

impl Descriptor {
    pub fn parse(text: &str) -> GrammarResult<Descriptor> {
        let mut parser = Parser::new(text);
        let descriptor = if parser.peek() == Some(b'(') {
            Descriptor::Method(parser.method_descriptor()?)
        } else {
            Descriptor::Field(parser.field_type()?)
        };
        parser.finish()?;
        Ok(descriptor)
    }
}

impl Remap for FieldType {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        match self {
            FieldType::Base(_) => false,
            FieldType::Object(name) => match mapper(name) {
                Some(new_name) => {
                    *name = new_name;
                    true
                }
                None => false,
            },
            FieldType::Array(component) => component.remap(mapper),
        }
    }
}

impl Remap for MethodDescriptor {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        let mut changed = false;
        for param in &mut self.params {
            changed |= param.remap(mapper);
        }
        if let Some(ret) = &mut self.ret {
            changed |= ret.remap(mapper);
        }
        changed
    }
}

impl Remap for Descriptor {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        match self {
            Descriptor::Field(field) => field.remap(mapper),
            Descriptor::Method(method) => method.remap(mapper),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Base(code) => f.write_char(*code as char),
            FieldType::Object(name) => write!(f, "L{name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

impl Display for MethodDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('(')?;
        for param in &self.params {
            Display::fmt(param, f)?;
        }
        f.write_char(')')?;
        match &self.ret {
            Some(ret) => Display::fmt(ret, f),
            None => f.write_char('V'),
        }
    }
}

impl Display for Descriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::Field(field) => Display::fmt(field, f),
            Descriptor::Method(method) => Display::fmt(method, f),
        }
    }
}

// --------------------------------------------------------------------
// Generic signatures

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Base(u8),
    Reference(ReferenceType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Class(ClassType),
    TypeVariable(String),
    Array(Box<JavaType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassType {
    /// Binary package, `/`-separated, empty for the default package.
    pub package: String,
    pub base: SimpleClassType,
    /// Inner classes, written after `.`.
    pub suffixes: Vec<SimpleClassType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleClassType {
    pub name: String,
    pub type_args: Vec<TypeArgument>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Variance {
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    Wildcard,
    Bounded {
        variance: Option<Variance>,
        ty: ReferenceType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
    pub class_bound: Option<ReferenceType>,
    pub interface_bounds: Vec<ReferenceType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    pub type_params: Vec<TypeParameter>,
    pub superclass: ClassType,
    pub interfaces: Vec<ClassType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThrowsSignature {
    Class(ClassType),
    TypeVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<JavaType>,
    /// `None` is `V`.
    pub result: Option<JavaType>,
    pub throws: Vec<ThrowsSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    Class(ClassSignature),
    Field(ReferenceType),
    Method(MethodSignature),
}

impl Signature {
    pub fn parse(text: &str, signature_type: SignatureType) -> GrammarResult<Signature> {
        let mut parser = Parser::new(text);
        let signature = match signature_type {
            SignatureType::Class => Signature::Class(parser.class_signature()?),
            SignatureType::Field => Signature::Field(parser.reference_type()?),
            SignatureType::Method => Signature::Method(parser.method_signature()?),
        };
        parser.finish()?;
        Ok(signature)
    }
}

impl ClassType {
    pub fn binary_name(&self) -> String {
        if self.package.is_empty() {
            self.base.name.clone()
        } else {
            format!("{}/{}", self.package, self.base.name)
        }
    }
}

impl Remap for ClassType {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        let mut changed = false;
        if let Some(new_name) = mapper(&self.binary_name()) {
            match new_name.rsplit_once('/') {
                Some((package, name)) => {
                    self.package = package.to_owned();
                    self.base.name = name.to_owned();
                }
                None => {
                    self.package.clear();
                    self.base.name = new_name;
                }
            }
            changed = true;
        }
        changed |= self.base.remap(mapper);
        for suffix in &mut self.suffixes {
            changed |= suffix.remap(mapper);
        }
        changed
    }
}

impl Remap for SimpleClassType {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        let mut changed = false;
        for arg in &mut self.type_args {
            if let TypeArgument::Bounded { ty, .. } = arg {
                changed |= ty.remap(mapper);
            }
        }
        changed
    }
}

impl Remap for ReferenceType {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        match self {
            ReferenceType::Class(class) => class.remap(mapper),
            ReferenceType::TypeVariable(_) => false,
            ReferenceType::Array(component) => component.remap(mapper),
        }
    }
}

impl Remap for JavaType {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        match self {
            JavaType::Base(_) => false,
            JavaType::Reference(reference) => reference.remap(mapper),
        }
    }
}

impl Remap for TypeParameter {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        let mut changed = false;
        if let Some(bound) = &mut self.class_bound {
            changed |= bound.remap(mapper);
        }
        for bound in &mut self.interface_bounds {
            changed |= bound.remap(mapper);
        }
        changed
    }
}

impl Remap for ClassSignature {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        let mut changed = false;
        for param in &mut self.type_params {
            changed |= param.remap(mapper);
        }
        changed |= self.superclass.remap(mapper);
        for interface in &mut self.interfaces {
            changed |= interface.remap(mapper);
        }
        changed
    }
}

impl Remap for MethodSignature {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        let mut changed = false;
        for param in &mut self.type_params {
            changed |= param.remap(mapper);
        }
        for param in &mut self.params {
            changed |= param.remap(mapper);
        }
        if let Some(result) = &mut self.result {
            changed |= result.remap(mapper);
        }
        for throws in &mut self.throws {
            if let ThrowsSignature::Class(class) = throws {
                changed |= class.remap(mapper);
            }
        }
        changed
    }
}

impl Remap for Signature {
    fn remap(&mut self, mapper: &mut dyn FnMut(&str) -> Option<String>) -> bool {
        match self {
            Signature::Class(class) => class.remap(mapper),
            Signature::Field(field) => field.remap(mapper),
            Signature::Method(method) => method.remap(mapper),
        }
    }
}

impl Display for JavaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            JavaType::Base(code) => f.write_char(*code as char),
            JavaType::Reference(reference) => Display::fmt(reference, f),
        }
    }
}

impl Display for ReferenceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceType::Class(class) => Display::fmt(class, f),
            ReferenceType::TypeVariable(name) => write!(f, "T{name};"),
            ReferenceType::Array(component) => write!(f, "[{component}"),
        }
    }
}

impl Display for ClassType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_char('L')?;
        if !self.package.is_empty() {
            f.write_str(&self.package)?;
            f.write_char('/')?;
        }
        Display::fmt(&self.base, f)?;
        for suffix in &self.suffixes {
            f.write_char('.')?;
            Display::fmt(suffix, f)?;
        }
        f.write_char(';')
    }
}

impl Display for SimpleClassType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.type_args.is_empty() {
            f.write_char('<')?;
            for arg in &self.type_args {
                Display::fmt(arg, f)?;
            }
            f.write_char('>')?;
        }
        Ok(())
    }
}

impl Display for TypeArgument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeArgument::Wildcard => f.write_char('*'),
            TypeArgument::Bounded { variance, ty } => {
                match variance {
                    Some(Variance::Extends) => f.write_char('+')?,
                    Some(Variance::Super) => f.write_char('-')?,
                    None => {}
                }
                Display::fmt(ty, f)
            }
        }
    }
}

fn write_type_params(f: &mut Formatter<'_>, params: &[TypeParameter]) -> std::fmt::Result {
    if params.is_empty() {
        return Ok(());
    }
    f.write_char('<')?;
    for param in params {
        f.write_str(&param.name)?;
        f.write_char(':')?;
        if let Some(bound) = &param.class_bound {
            Display::fmt(bound, f)?;
        }
        for bound in &param.interface_bounds {
            f.write_char(':')?;
            Display::fmt(bound, f)?;
        }
    }
    f.write_char('>')
}

impl Display for ClassSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_type_params(f, &self.type_params)?;
        Display::fmt(&self.superclass, f)?;
        for interface in &self.interfaces {
            Display::fmt(interface, f)?;
        }
        Ok(())
    }
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_type_params(f, &self.type_params)?;
        f.write_char('(')?;
        for param in &self.params {
            Display::fmt(param, f)?;
        }
        f.write_char(')')?;
        match &self.result {
            Some(result) => Display::fmt(result, f)?,
            None => f.write_char('V')?,
        }
        for throws in &self.throws {
            f.write_char('^')?;
            match throws {
                ThrowsSignature::Class(class) => Display::fmt(class, f)?,
                ThrowsSignature::TypeVariable(name) => write!(f, "T{name};")?,
            }
        }
        Ok(())
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Signature::Class(class) => Display::fmt(class, f),
            Signature::Field(field) => Display::fmt(field, f),
            Signature::Method(method) => Display::fmt(method, f),
        }
    }
}

// --------------------------------------------------------------------
// Parser

fn is_base_type(code: u8) -> bool {
    matches!(code, b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z')
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser { text, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: &'static str) -> GrammarError {
        GrammarError {
            text: self.text.to_owned(),
            position: self.pos,
            message,
        }
    }

    fn next(&mut self) -> GrammarResult<u8> {
        let byte = self.peek().ok_or_else(|| self.error("unexpected end"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8, message: &'static str) -> GrammarResult<()> {
        if self.peek() != Some(expected) {
            return Err(self.error(message));
        }
        self.pos += 1;
        Ok(())
    }

    fn finish(&self) -> GrammarResult<()> {
        if self.pos != self.text.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(())
    }

    fn identifier(&mut self) -> GrammarResult<&'a str> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(&self.text[start..self.pos])
    }

    fn field_type(&mut self) -> GrammarResult<FieldType> {
        match self.next()? {
            code if is_base_type(code) => Ok(FieldType::Base(code)),
            b'L' => {
                let start = self.pos;
                while let Some(byte) = self.peek() {
                    if byte == b';' {
                        break;
                    }
                    if matches!(byte, b'[' | b'.') {
                        return Err(self.error("illegal character in class name"));
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    return Err(self.error("empty class name"));
                }
                let name = &self.text[start..self.pos];
                self.expect(b';', "unterminated class name")?;
                Ok(FieldType::Object(name.to_owned()))
            }
            b'[' => Ok(FieldType::Array(Box::new(self.field_type()?))),
            _ => {
                self.pos -= 1;
                Err(self.error("expected field type"))
            }
        }
    }

    fn method_descriptor(&mut self) -> GrammarResult<MethodDescriptor> {
        self.expect(b'(', "expected '('")?;
        let mut params = Vec::new();
        while self.peek() != Some(b')') {
            params.push(self.field_type()?);
        }
        self.pos += 1;
        let ret = if self.peek() == Some(b'V') {
            self.pos += 1;
            None
        } else {
            Some(self.field_type()?)
        };
        Ok(MethodDescriptor { params, ret })
    }

    fn java_type(&mut self) -> GrammarResult<JavaType> {
        match self.peek() {
            Some(code) if is_base_type(code) => {
                self.pos += 1;
                Ok(JavaType::Base(code))
            }
            _ => Ok(JavaType::Reference(self.reference_type()?)),
        }
    }

    fn reference_type(&mut self) -> GrammarResult<ReferenceType> {
        match self.peek() {
            Some(b'L') => Ok(ReferenceType::Class(self.class_type()?)),
            Some(b'T') => {
                self.pos += 1;
                let name = self.identifier()?;
                self.expect(b';', "unterminated type variable")?;
                Ok(ReferenceType::TypeVariable(name.to_owned()))
            }
            Some(b'[') => {
                self.pos += 1;
                Ok(ReferenceType::Array(Box::new(self.java_type()?)))
            }
            _ => Err(self.error("expected reference type")),
        }
    }

    fn class_type(&mut self) -> GrammarResult<ClassType> {
        self.expect(b'L', "expected 'L'")?;
        let mut package = String::new();
        let mut name = self.identifier()?;
        while self.peek() == Some(b'/') {
            self.pos += 1;
            if !package.is_empty() {
                package.push('/');
            }
            package.push_str(name);
            name = self.identifier()?;
        }
        let base = SimpleClassType {
            name: name.to_owned(),
            type_args: self.type_arguments()?,
        };
        let mut suffixes = Vec::new();
        while self.peek() == Some(b'.') {
            self.pos += 1;
            let name = self.identifier()?;
            suffixes.push(SimpleClassType {
                name: name.to_owned(),
                type_args: self.type_arguments()?,
            });
        }
        self.expect(b';', "unterminated class type")?;
        Ok(ClassType {
            package,
            base,
            suffixes,
        })
    }

    fn type_arguments(&mut self) -> GrammarResult<Vec<TypeArgument>> {
        let mut args = Vec::new();
        if self.peek() != Some(b'<') {
            return Ok(args);
        }
        self.pos += 1;
        loop {
            let arg = match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    TypeArgument::Wildcard
                }
                Some(b'+') => {
                    self.pos += 1;
                    TypeArgument::Bounded {
                        variance: Some(Variance::Extends),
                        ty: self.reference_type()?,
                    }
                }
                Some(b'-') => {
                    self.pos += 1;
                    TypeArgument::Bounded {
                        variance: Some(Variance::Super),
                        ty: self.reference_type()?,
                    }
                }
                _ => TypeArgument::Bounded {
                    variance: None,
                    ty: self.reference_type()?,
                },
            };
            args.push(arg);
            if self.peek() == Some(b'>') {
                self.pos += 1;
                return Ok(args);
            }
        }
    }

    fn type_parameters(&mut self) -> GrammarResult<Vec<TypeParameter>> {
        let mut params = Vec::new();
        if self.peek() != Some(b'<') {
            return Ok(params);
        }
        self.pos += 1;
        loop {
            let name = self.identifier()?.to_owned();
            self.expect(b':', "expected ':' after type parameter")?;
            let class_bound = match self.peek() {
                Some(b'L' | b'T' | b'[') => Some(self.reference_type()?),
                _ => None,
            };
            let mut interface_bounds = Vec::new();
            while self.peek() == Some(b':') {
                self.pos += 1;
                interface_bounds.push(self.reference_type()?);
            }
            params.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
            if self.peek() == Some(b'>') {
                self.pos += 1;
                return Ok(params);
            }
        }
    }

    fn class_signature(&mut self) -> GrammarResult<ClassSignature> {
        let type_params = self.type_parameters()?;
        let superclass = self.class_type()?;
        let mut interfaces = Vec::new();
        while self.peek().is_some() {
            interfaces.push(self.class_type()?);
        }
        Ok(ClassSignature {
            type_params,
            superclass,
            interfaces,
        })
    }

    fn method_signature(&mut self) -> GrammarResult<MethodSignature> {
        let type_params = self.type_parameters()?;
        self.expect(b'(', "expected '('")?;
        let mut params = Vec::new();
        while self.peek() != Some(b')') {
            if self.peek().is_none() {
                return Err(self.error("unterminated parameter list"));
            }
            params.push(self.java_type()?);
        }
        self.pos += 1;
        let result = if self.peek() == Some(b'V') {
            self.pos += 1;
            None
        } else {
            Some(self.java_type()?)
        };
        let mut throws = Vec::new();
        while self.peek() == Some(b'^') {
            self.pos += 1;
            throws.push(match self.reference_type()? {
                ReferenceType::Class(class) => ThrowsSignature::Class(class),
                ReferenceType::TypeVariable(name) => ThrowsSignature::TypeVariable(name),
                ReferenceType::Array(_) => return Err(self.error("array in throws clause")),
            });
        }
        Ok(MethodSignature {
            type_params,
            params,
            result,
            throws,
        })
    }
}
