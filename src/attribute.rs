//! Classifies constant pool UTF-8 entries by how the class uses them.
//!
//! Only the parts of a class that can name a type are walked; attribute
//! payloads that cannot are skipped by length. An entry referenced in more
//! than one role keeps the most structured one. String constants are also
//! located by the field that references them, so a string can be given its
//! own entry when its text is shared with a name.

use crate::{
    ClassBuffer, ClassFileError, ClassFileResult, ClassReader, ConstantPoolEntry, SignatureType,
    TypeReferenceTargetType,
};
use derive_more::IsVariant;

const MAX_ANNOTATION_DEPTH: usize = 64;

/// Role of a UTF-8 constant, ordered from least to most structured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, IsVariant)]
pub enum Utf8Usage {
    /// Referenced by a `String` entry or a string annotation value.
    StringConstant,
    /// Referenced by a `Package` entry, in binary form.
    PackageName,
    /// Referenced by a `Class` entry: a binary name or an array descriptor.
    ClassName,
    /// A `class_info` annotation value: a field descriptor or `V`.
    ReturnDescriptor,
    Descriptor,
    Signature(SignatureType),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum AttributeOwner {
    Class,
    Field,
    Method,
    Code,
    RecordComponent,
}

impl AttributeOwner {
    fn signature_type(self) -> SignatureType {
        match self {
            AttributeOwner::Class => SignatureType::Class,
            AttributeOwner::Method => SignatureType::Method,
            AttributeOwner::Field | AttributeOwner::Code | AttributeOwner::RecordComponent => {
                SignatureType::Field
            }
        }
    }
}

/// Where a string constant's UTF-8 index is stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct StringReference {
    pub index: u16,
    /// Offset of the `u16` index field in the class bytes.
    pub offset: usize,
}

/// How a class refers to its UTF-8 constants, by pool index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utf8References {
    /// Most structured usage, `None` for entries that are not UTF-8 or that
    /// only hold names and other text that is never rewritten.
    pub usages: Vec<Option<Utf8Usage>>,
    /// Whether anything other than a string constant refers to the entry:
    /// a structural usage or a member, attribute or element name.
    pub shared: Vec<bool>,
    pub strings: Vec<StringReference>,
}

impl Utf8References {
    pub fn is_shared(&self, index: u16) -> bool {
        self.shared.get(index as usize).copied().unwrap_or(false)
    }
}

impl<'class> ClassReader<'class> {
    pub fn utf8_references(&self) -> ClassFileResult<Utf8References> {
        let count = self.constant_pool.count() as usize;
        let mut collector = UsageCollector {
            reader: self,
            buffer: self.buffer(),
            references: Utf8References {
                usages: vec![None; count],
                shared: vec![false; count],
                strings: Vec::new(),
            },
        };
        collector.constant_pool()?;
        collector.class_body()?;
        Ok(collector.references)
    }

    /// The usage of every constant pool index.
    pub fn utf8_usages(&self) -> ClassFileResult<Vec<Option<Utf8Usage>>> {
        self.utf8_references().map(|references| references.usages)
    }
}

struct UsageCollector<'a, 'class> {
    reader: &'a ClassReader<'class>,
    buffer: ClassBuffer<'class>,
    references: Utf8References,
}

impl UsageCollector<'_, '_> {
    fn mark(&mut self, index: u16, usage: Utf8Usage) -> ClassFileResult<()> {
        if index == 0 {
            return Ok(());
        }
        // validates the index and the entry type
        self.reader.constant_pool.get_utf8_as_bytes(index)?;
        let slot = &mut self.references.usages[index as usize];
        *slot = (*slot).max(Some(usage));
        if usage != Utf8Usage::StringConstant {
            self.references.shared[index as usize] = true;
        }
        Ok(())
    }

    fn mark_at(&mut self, offset: usize, usage: Utf8Usage) -> ClassFileResult<()> {
        let index = self.buffer.read_u16(offset)?;
        self.mark(index, usage)
    }

    fn mark_string_at(&mut self, offset: usize) -> ClassFileResult<()> {
        let index = self.buffer.read_u16(offset)?;
        self.mark(index, Utf8Usage::StringConstant)?;
        self.references.strings.push(StringReference { index, offset });
        Ok(())
    }

    /// A name that is never rewritten but may share its entry with a string.
    fn name_at(&mut self, offset: usize) -> ClassFileResult<()> {
        let index = self.buffer.read_u16(offset)?;
        if let Some(shared) = self.references.shared.get_mut(index as usize) {
            *shared = true;
        }
        Ok(())
    }

    fn constant_pool(&mut self) -> ClassFileResult<()> {
        for entry in &self.reader.constant_pool {
            let (index, entry) = entry?;
            match entry {
                ConstantPoolEntry::Class(index) => self.mark(index, Utf8Usage::ClassName)?,
                ConstantPoolEntry::String(_) => {
                    let offset = self.reader.constant_pool.entry_range(index)?.start + 1;
                    self.mark_string_at(offset)?
                }
                ConstantPoolEntry::NameAndType(name_and_type) => {
                    self.mark(name_and_type.descriptor_index, Utf8Usage::Descriptor)?;
                    let offset = self.reader.constant_pool.entry_range(index)?.start + 1;
                    self.name_at(offset)?
                }
                ConstantPoolEntry::MethodType(index) => self.mark(index, Utf8Usage::Descriptor)?,
                ConstantPoolEntry::Package(index) => self.mark(index, Utf8Usage::PackageName)?,
                ConstantPoolEntry::Module(_) => {
                    let offset = self.reader.constant_pool.entry_range(index)?.start + 1;
                    self.name_at(offset)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn class_body(&mut self) -> ClassFileResult<()> {
        let metadata_start = self.reader.metadata_start();
        let interface_count = self.buffer.read_u16(metadata_start + 6)? as usize;
        let mut offset = metadata_start + 8 + interface_count * 2;
        for owner in [AttributeOwner::Field, AttributeOwner::Method] {
            let member_count = self.buffer.read_u16(offset)?;
            offset += 2;
            for _ in 0..member_count {
                self.name_at(offset + 2)?;
                self.mark_at(offset + 4, Utf8Usage::Descriptor)?;
                offset = self.attributes(offset + 6, owner)?;
            }
        }
        self.attributes(offset, AttributeOwner::Class)?;
        Ok(())
    }

    /// Walks an `attributes_count` prefixed table, returning the offset after it.
    fn attributes(&mut self, mut offset: usize, owner: AttributeOwner) -> ClassFileResult<usize> {
        let attribute_count = self.buffer.read_u16(offset)?;
        offset += 2;
        for _ in 0..attribute_count {
            self.name_at(offset)?;
            let name_index = self.buffer.read_u16(offset)?;
            let len = self.buffer.read_u32(offset + 2)? as usize;
            let body = offset + 6;
            self.buffer.read_bytes(body, len)?;
            let name = self.reader.constant_pool.get_utf8_as_bytes(name_index)?;
            self.attribute(name, body, owner)?;
            offset = body + len;
        }
        Ok(offset)
    }

    fn attribute(&mut self, name: &[u8], body: usize, owner: AttributeOwner) -> ClassFileResult<()> {
        match name {
            b"Signature" => self.mark_at(body, Utf8Usage::Signature(owner.signature_type()))?,
            b"Code" => {
                let code_length = self.buffer.read_u32(body + 4)? as usize;
                let exception_table = body + 8 + code_length;
                let exception_count = self.buffer.read_u16(exception_table)? as usize;
                self.attributes(exception_table + 2 + exception_count * 8, AttributeOwner::Code)?;
            }
            b"LocalVariableTable" => self.local_variables(body, Utf8Usage::Descriptor)?,
            b"LocalVariableTypeTable" => {
                self.local_variables(body, Utf8Usage::Signature(SignatureType::Field))?
            }
            b"RuntimeVisibleAnnotations" | b"RuntimeInvisibleAnnotations" => {
                let count = self.buffer.read_u16(body)?;
                let mut offset = body + 2;
                for _ in 0..count {
                    offset = self.annotation(offset, 0)?;
                }
            }
            b"RuntimeVisibleParameterAnnotations" | b"RuntimeInvisibleParameterAnnotations" => {
                let parameters = self.buffer.read_u8(body)?;
                let mut offset = body + 1;
                for _ in 0..parameters {
                    let count = self.buffer.read_u16(offset)?;
                    offset += 2;
                    for _ in 0..count {
                        offset = self.annotation(offset, 0)?;
                    }
                }
            }
            b"RuntimeVisibleTypeAnnotations" | b"RuntimeInvisibleTypeAnnotations" => {
                let count = self.buffer.read_u16(body)?;
                let mut offset = body + 2;
                for _ in 0..count {
                    offset = self.type_annotation(offset)?;
                }
            }
            b"AnnotationDefault" => {
                self.element_value(body, 0)?;
            }
            b"Record" if owner == AttributeOwner::Class => {
                let count = self.buffer.read_u16(body)?;
                let mut offset = body + 2;
                for _ in 0..count {
                    self.name_at(offset)?;
                    self.mark_at(offset + 2, Utf8Usage::Descriptor)?;
                    offset = self.attributes(offset + 4, AttributeOwner::RecordComponent)?;
                }
            }
            b"InnerClasses" if owner == AttributeOwner::Class => {
                let count = self.buffer.read_u16(body)? as usize;
                for i in 0..count {
                    self.name_at(body + 2 + i * 8 + 4)?;
                }
            }
            b"MethodParameters" if owner == AttributeOwner::Method => {
                let count = self.buffer.read_u8(body)? as usize;
                for i in 0..count {
                    self.name_at(body + 1 + i * 4)?;
                }
            }
            b"SourceFile" if owner == AttributeOwner::Class => self.name_at(body)?,
            _ => {}
        }
        Ok(())
    }

    fn local_variables(&mut self, body: usize, usage: Utf8Usage) -> ClassFileResult<()> {
        let count = self.buffer.read_u16(body)? as usize;
        for i in 0..count {
            let entry = body + 2 + i * 10;
            self.name_at(entry + 4)?;
            self.mark_at(entry + 6, usage)?;
        }
        Ok(())
    }

    fn type_annotation(&mut self, offset: usize) -> ClassFileResult<usize> {
        let target_type = TypeReferenceTargetType::from_u8(self.buffer.read_u8(offset)?)?;
        let offset = offset + 1 + target_type.target_info_len(self.buffer, offset + 1)?;
        let path_length = self.buffer.read_u8(offset)? as usize;
        self.annotation(offset + 1 + path_length * 2, 0)
    }

    /// Walks an `annotation` structure, returning the offset after it.
    fn annotation(&mut self, offset: usize, depth: usize) -> ClassFileResult<usize> {
        self.mark_at(offset, Utf8Usage::Descriptor)?;
        let pair_count = self.buffer.read_u16(offset + 2)?;
        let mut offset = offset + 4;
        for _ in 0..pair_count {
            self.name_at(offset)?;
            offset = self.element_value(offset + 2, depth + 1)?;
        }
        Ok(offset)
    }

    fn element_value(&mut self, offset: usize, depth: usize) -> ClassFileResult<usize> {
        if depth > MAX_ANNOTATION_DEPTH {
            return Err(ClassFileError::TooDeepAnnotationNesting);
        }
        let tag = self.buffer.read_u8(offset)?;
        match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Ok(offset + 3),
            b's' => {
                self.mark_string_at(offset + 1)?;
                Ok(offset + 3)
            }
            b'e' => {
                self.mark_at(offset + 1, Utf8Usage::Descriptor)?;
                self.name_at(offset + 3)?;
                Ok(offset + 5)
            }
            b'c' => {
                self.mark_at(offset + 1, Utf8Usage::ReturnDescriptor)?;
                Ok(offset + 3)
            }
            b'@' => self.annotation(offset + 1, depth + 1),
            b'[' => {
                let count = self.buffer.read_u16(offset + 1)?;
                let mut offset = offset + 3;
                for _ in 0..count {
                    offset = self.element_value(offset, depth + 1)?;
                }
                Ok(offset)
            }
            _ => Err(ClassFileError::BadAnnotationTag(tag)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Utf8Usage;
    use crate::{ClassFileError, ClassReader, SignatureType};
    use test_helpers::ClassFileBuilder;

    fn usage_of(reader: &ClassReader, usages: &[Option<Utf8Usage>], text: &str) -> Option<Utf8Usage> {
        (1..reader.constant_pool.count())
            .find(|&index| {
                reader
                    .constant_pool
                    .get_utf8_as_bytes(index)
                    .is_ok_and(|bytes| bytes == text.as_bytes())
            })
            .and_then(|index| usages[index as usize])
    }

    #[test]
    fn test_pool_usages() {
        let mut builder = ClassFileBuilder::new("com/acme/Widget", Some("java/lang/Object"));
        builder.string("javax.inject.Named");
        builder.method_ref("javax/inject/Provider", "get", "()Ljava/lang/Object;");
        builder.method_type("(Ljavax/inject/Provider;)V");
        builder.package("javax/inject");
        let bytes = builder.build();

        let reader = ClassReader::new(&bytes).unwrap();
        let usages = reader.utf8_usages().unwrap();
        let usage_of = |text: &str| usage_of(&reader, &usages, text);

        assert_eq!(Some(Utf8Usage::ClassName), usage_of("com/acme/Widget"));
        assert_eq!(Some(Utf8Usage::ClassName), usage_of("javax/inject/Provider"));
        assert_eq!(Some(Utf8Usage::StringConstant), usage_of("javax.inject.Named"));
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("()Ljava/lang/Object;"));
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("(Ljavax/inject/Provider;)V"));
        assert_eq!(Some(Utf8Usage::PackageName), usage_of("javax/inject"));
        assert_eq!(None, usage_of("get"));
    }

    #[test]
    fn test_member_and_attribute_usages() {
        let mut builder = ClassFileBuilder::new("com/acme/Widget", Some("java/lang/Object"));
        let class_signature = builder.signature_attribute("Ljava/lang/Object;Ljava/util/List<Ljavax/inject/Named;>;");
        builder.class_attribute(class_signature);

        let field_signature = builder.signature_attribute("Ljava/util/List<Ljavax/inject/Named;>;");
        let named = builder.annotation("Ljavax/inject/Named;", &[]);
        let value = builder.string_value("javax.inject.Inject");
        let class_value = builder.class_value("Ljavax/inject/Singleton;");
        let enum_value = builder.enum_value("Ljavax/enterprise/Kind;", "ONE");
        let nested = ClassFileBuilder::annotation_value(named.clone());
        let array = ClassFileBuilder::array_value(&[class_value, enum_value, nested]);
        let annotation = builder.annotation(
            "Ljavax/inject/Qualifier;",
            &[("value", value), ("others", array)],
        );
        let annotations = builder.annotations_attribute(&[annotation]);
        let type_annotations = builder.field_type_annotations_attribute(&[named]);
        builder.field(
            0x0001,
            "widgets",
            "Ljava/util/List;",
            &[field_signature, annotations, type_annotations],
        );

        let locals = builder.local_variables(false, &[("provider", "Ljavax/inject/Provider;")]);
        let local_types = builder.local_variables(true, &[("provider", "Ljavax/inject/Provider<TT;>;")]);
        let code = builder.code_attribute(&[0xb1], &[locals, local_types]);
        let method_signature = builder.signature_attribute("<T:Ljava/lang/Object;>()V");
        builder.method(0x0001, "run", "()V", &[code, method_signature]);
        let bytes = builder.build();

        let reader = ClassReader::new(&bytes).unwrap();
        let usages = reader.utf8_usages().unwrap();
        let usage_of = |text: &str| usage_of(&reader, &usages, text);

        assert_eq!(
            Some(Utf8Usage::Signature(SignatureType::Class)),
            usage_of("Ljava/lang/Object;Ljava/util/List<Ljavax/inject/Named;>;")
        );
        assert_eq!(
            Some(Utf8Usage::Signature(SignatureType::Field)),
            usage_of("Ljava/util/List<Ljavax/inject/Named;>;")
        );
        assert_eq!(
            Some(Utf8Usage::Signature(SignatureType::Method)),
            usage_of("<T:Ljava/lang/Object;>()V")
        );
        assert_eq!(
            Some(Utf8Usage::Signature(SignatureType::Field)),
            usage_of("Ljavax/inject/Provider<TT;>;")
        );
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("Ljava/util/List;"));
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("Ljavax/inject/Named;"));
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("Ljavax/inject/Qualifier;"));
        assert_eq!(Some(Utf8Usage::ReturnDescriptor), usage_of("Ljavax/inject/Singleton;"));
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("Ljavax/enterprise/Kind;"));
        assert_eq!(Some(Utf8Usage::Descriptor), usage_of("Ljavax/inject/Provider;"));
        assert_eq!(Some(Utf8Usage::StringConstant), usage_of("javax.inject.Inject"));
        assert_eq!(None, usage_of("ONE"));
        assert_eq!(None, usage_of("widgets"));
        assert_eq!(None, usage_of("Code"));
    }

    #[test]
    fn test_string_references() {
        let mut builder = ClassFileBuilder::new("com/acme/Repo", Some("java/lang/Object"));
        builder.string("find");
        builder.string("javax.inject.Named");
        builder.method(0x0001, "find", "()V", &[]);
        let void = builder.class_value("V");
        let default = builder.attribute("AnnotationDefault", &void);
        builder.method(0x0401, "target", "()Ljava/lang/Class;", &[default]);
        let bytes = builder.build();

        let reader = ClassReader::new(&bytes).unwrap();
        let references = reader.utf8_references().unwrap();
        let index_of = |text: &str| {
            (1..reader.constant_pool.count())
                .find(|&index| {
                    reader
                        .constant_pool
                        .get_utf8_as_bytes(index)
                        .is_ok_and(|bytes| bytes == text.as_bytes())
                })
                .unwrap()
        };

        assert!(references.is_shared(index_of("find")));
        assert!(!references.is_shared(index_of("javax.inject.Named")));
        assert_eq!(
            Some(Utf8Usage::StringConstant),
            references.usages[index_of("find") as usize]
        );
        assert_eq!(
            Some(Utf8Usage::ReturnDescriptor),
            references.usages[index_of("V") as usize]
        );
        assert_eq!(2, references.strings.len());
        for string in &references.strings {
            let field = u16::from_be_bytes([bytes[string.offset], bytes[string.offset + 1]]);
            assert_eq!(string.index, field);
        }
    }

    #[test]
    fn test_bad_annotation_tag() {
        let mut builder = ClassFileBuilder::new("A", None);
        let annotation = builder.annotation("LA;", &[("value", vec![b'x', 0, 1])]);
        let attribute = builder.annotations_attribute(&[annotation]);
        builder.class_attribute(attribute);
        let bytes = builder.build();

        let reader = ClassReader::new(&bytes).unwrap();
        assert!(matches!(
            reader.utf8_usages(),
            Err(ClassFileError::BadAnnotationTag(b'x'))
        ));
    }
}
