use crate::{ClassBuffer, ClassFileError, ClassFileResult};
use java_string::JavaStr;
use std::borrow::Cow;
use std::ops::Range;
use strum::{Display, FromRepr};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum ConstantPoolTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}

impl ConstantPoolTag {
    pub fn from_u8(tag: u8) -> ClassFileResult<ConstantPoolTag> {
        Self::from_repr(tag).ok_or(ClassFileError::BadConstantPoolTag(tag))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
#[non_exhaustive]
pub enum HandleKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl HandleKind {
    pub fn from_u8(kind: u8) -> ClassFileResult<HandleKind> {
        Self::from_repr(kind).ok_or(ClassFileError::BadHandleKind(kind))
    }
}

/// A constant pool entry with its references left as indices, so entries
/// can be classified by how other entries use them.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ConstantPoolEntry<'class> {
    Utf8(Cow<'class, JavaStr>),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType(NameAndType),
    MethodHandle(MethodHandle),
    MethodType(u16),
    Dynamic(DynamicEntry),
    InvokeDynamic(DynamicEntry),
    Module(u16),
    Package(u16),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameAndType {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberRef {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodHandle {
    pub kind: HandleKind,
    pub reference_index: u16,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynamicEntry {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Clone)]
pub struct ConstantPool<'class> {
    buffer: ClassBuffer<'class>,
    offset: Box<[usize]>,
    end: usize,
}

impl<'class> ConstantPool<'class> {
    pub(crate) fn new(
        buffer: ClassBuffer<'class>,
    ) -> ClassFileResult<(ConstantPool<'class>, usize)> {
        let constant_pool_count = buffer.read_u16(8)? as usize;
        let mut cp_offset = vec![0; constant_pool_count.max(1)].into_boxed_slice();
        let mut current_offset = 10;
        let mut i = 1;
        while i < constant_pool_count {
            cp_offset[i] = current_offset;
            let tag = ConstantPoolTag::from_u8(buffer.read_u8(current_offset)?)?;
            current_offset += 1;
            match tag {
                ConstantPoolTag::Class
                | ConstantPoolTag::MethodType
                | ConstantPoolTag::Module
                | ConstantPoolTag::String
                | ConstantPoolTag::Package => current_offset += 2,
                ConstantPoolTag::MethodHandle => current_offset += 3,
                ConstantPoolTag::Dynamic
                | ConstantPoolTag::FieldRef
                | ConstantPoolTag::Float
                | ConstantPoolTag::Integer
                | ConstantPoolTag::InterfaceMethodRef
                | ConstantPoolTag::InvokeDynamic
                | ConstantPoolTag::MethodRef
                | ConstantPoolTag::NameAndType => current_offset += 4,
                ConstantPoolTag::Double | ConstantPoolTag::Long => {
                    current_offset += 8;
                    i += 1;
                }
                ConstantPoolTag::Utf8 => {
                    current_offset += 2 + buffer.read_u16(current_offset)? as usize
                }
            }
            i += 1;
        }

        // the last entry must lie within the class
        if current_offset > 10 {
            buffer.read_u8(current_offset - 1)?;
        }

        let constant_pool = ConstantPool {
            buffer,
            offset: cp_offset,
            end: current_offset,
        };
        Ok((constant_pool, current_offset))
    }

    /// The `constant_pool_count` from the class header, one more than the
    /// highest index.
    pub fn count(&self) -> u16 {
        self.offset.len() as u16
    }

    /// Byte range of the whole constant pool within the class.
    pub fn byte_range(&self) -> Range<usize> {
        10..self.end
    }

    /// Byte range of a single entry, tag included.
    pub fn entry_range(&self, index: u16) -> ClassFileResult<Range<usize>> {
        let start = self.index_to_offset(index)?;
        let end = self.offset[index as usize + 1..]
            .iter()
            .copied()
            .find(|&offset| offset != 0)
            .unwrap_or(self.end);
        Ok(start..end)
    }

    fn index_to_offset(&self, index: u16) -> ClassFileResult<usize> {
        match self.offset.get(index as usize) {
            Some(&0) => Err(ClassFileError::BadConstantPoolIndexNoEntry(index)),
            Some(&offset) => Ok(offset),
            None => Err(ClassFileError::BadConstantPoolIndex {
                index,
                len: self.offset.len(),
            }),
        }
    }

    pub fn get_type(&self, index: u16) -> ClassFileResult<ConstantPoolTag> {
        let offset = self.index_to_offset(index)?;
        ConstantPoolTag::from_u8(self.buffer.read_u8(offset)?)
    }

    pub fn get_optional(&self, index: u16) -> ClassFileResult<Option<ConstantPoolEntry<'class>>> {
        if index == 0 {
            return Ok(None);
        }

        self.get(index).map(Some)
    }

    pub fn get_utf8_as_bytes(&self, index: u16) -> ClassFileResult<&'class [u8]> {
        let offset = self.index_to_offset(index)?;
        let tag = ConstantPoolTag::from_u8(self.buffer.read_u8(offset)?)?;

        if tag != ConstantPoolTag::Utf8 {
            return Err(ClassFileError::BadConstantPoolType {
                expected: ConstantPoolTag::Utf8,
                actual: tag,
            });
        }

        let len = self.buffer.read_u16(offset + 1)?;
        self.buffer.read_bytes(offset + 3, len as usize)
    }

    /// Resolves a `Class` entry to its internal name.
    pub fn get_class_name(&self, index: u16) -> ClassFileResult<Cow<'class, JavaStr>> {
        self.get_utf8(self.get_class(index)?)
    }
}

macro_rules! generate_getters {
    ($($tag:ident, $getter:ident, $opt_getter:ident: $ty:ty => $read:expr;)*) => {
        impl<'class> ConstantPool<'class> {
            pub fn get(&self, index: u16) -> ClassFileResult<ConstantPoolEntry<'class>> {
                let offset = self.index_to_offset(index)?;
                let tag = ConstantPoolTag::from_u8(self.buffer.read_u8(offset)?)?;

                match tag {
                    $(
                    ConstantPoolTag::$tag => Ok(ConstantPoolEntry::$tag($read(self, offset)?)),
                    )*
                }
            }

            $(
            pub fn $getter(&self, index: u16) -> ClassFileResult<$ty> {
                let offset = self.index_to_offset(index)?;
                let tag = ConstantPoolTag::from_u8(self.buffer.read_u8(offset)?)?;

                if tag != ConstantPoolTag::$tag {
                    return Err(ClassFileError::BadConstantPoolType { expected: ConstantPoolTag::$tag, actual: tag });
                }

                $read(self, offset)
            }

            pub fn $opt_getter(&self, index: u16) -> ClassFileResult<Option<$ty>> {
                if index == 0 {
                    return Ok(None);
                }
                self.$getter(index).map(Some)
            }
            )*
        }
    }
}

generate_getters! {
    Utf8, get_utf8, get_optional_utf8: Cow<'class, JavaStr> => |this: &ConstantPool<'class>, offset| -> ClassFileResult<Cow<'class, JavaStr>> {
        let len = this.buffer.read_u16(offset + 1)?;
        Ok(JavaStr::from_modified_utf8(this.buffer.read_bytes(offset + 3, len as usize)?)?)
    };
    Integer, get_i32, get_optional_i32: i32 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<i32> {
        this.buffer.read_i32(offset + 1)
    };
    Float, get_f32, get_optional_f32: f32 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<f32> {
        this.buffer.read_f32(offset + 1)
    };
    Long, get_i64, get_optional_i64: i64 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<i64> {
        this.buffer.read_i64(offset + 1)
    };
    Double, get_f64, get_optional_f64: f64 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<f64> {
        this.buffer.read_f64(offset + 1)
    };
    Class, get_class, get_optional_class: u16 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<u16> {
        this.buffer.read_u16(offset + 1)
    };
    String, get_string, get_optional_string: u16 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<u16> {
        this.buffer.read_u16(offset + 1)
    };
    FieldRef, get_field_ref, get_optional_field_ref: MemberRef => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MemberRef> {
        Ok(MemberRef { class_index: this.buffer.read_u16(offset + 1)?, name_and_type_index: this.buffer.read_u16(offset + 3)? })
    };
    MethodRef, get_method_ref, get_optional_method_ref: MemberRef => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MemberRef> {
        Ok(MemberRef { class_index: this.buffer.read_u16(offset + 1)?, name_and_type_index: this.buffer.read_u16(offset + 3)? })
    };
    InterfaceMethodRef, get_interface_method_ref, get_optional_interface_method_ref: MemberRef => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MemberRef> {
        Ok(MemberRef { class_index: this.buffer.read_u16(offset + 1)?, name_and_type_index: this.buffer.read_u16(offset + 3)? })
    };
    NameAndType, get_name_and_type, get_optional_name_and_type: NameAndType => |this: &ConstantPool<'class>, offset| -> ClassFileResult<NameAndType> {
        Ok(NameAndType { name_index: this.buffer.read_u16(offset + 1)?, descriptor_index: this.buffer.read_u16(offset + 3)? })
    };
    MethodHandle, get_method_handle, get_optional_method_handle: MethodHandle => |this: &ConstantPool<'class>, offset| -> ClassFileResult<MethodHandle> {
        let kind = HandleKind::from_u8(this.buffer.read_u8(offset + 1)?)?;
        Ok(MethodHandle { kind, reference_index: this.buffer.read_u16(offset + 2)? })
    };
    MethodType, get_method_type, get_optional_method_type: u16 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<u16> {
        this.buffer.read_u16(offset + 1)
    };
    Dynamic, get_dynamic, get_optional_dynamic: DynamicEntry => |this: &ConstantPool<'class>, offset| -> ClassFileResult<DynamicEntry> {
        Ok(DynamicEntry { bootstrap_method_attr_index: this.buffer.read_u16(offset + 1)?, name_and_type_index: this.buffer.read_u16(offset + 3)? })
    };
    InvokeDynamic, get_invoke_dynamic, get_optional_invoke_dynamic: DynamicEntry => |this: &ConstantPool<'class>, offset| -> ClassFileResult<DynamicEntry> {
        Ok(DynamicEntry { bootstrap_method_attr_index: this.buffer.read_u16(offset + 1)?, name_and_type_index: this.buffer.read_u16(offset + 3)? })
    };
    Module, get_module, get_optional_module: u16 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<u16> {
        this.buffer.read_u16(offset + 1)
    };
    Package, get_package, get_optional_package: u16 => |this: &ConstantPool<'class>, offset| -> ClassFileResult<u16> {
        this.buffer.read_u16(offset + 1)
    };
}

impl<'a, 'class> IntoIterator for &'a ConstantPool<'class> {
    type Item = ClassFileResult<(u16, ConstantPoolEntry<'class>)>;
    type IntoIter = ConstantPoolIntoIter<'a, 'class>;

    fn into_iter(self) -> Self::IntoIter {
        ConstantPoolIntoIter {
            constant_pool: self,
            index: 0,
        }
    }
}

/// Iterates `(index, entry)` pairs, skipping the unusable slot after each
/// `Long` and `Double`.
#[derive(Copy, Clone)]
pub struct ConstantPoolIntoIter<'a, 'class> {
    constant_pool: &'a ConstantPool<'class>,
    index: u16,
}

impl<'class> Iterator for ConstantPoolIntoIter<'_, 'class> {
    type Item = ClassFileResult<(u16, ConstantPoolEntry<'class>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let offsets = &self.constant_pool.offset;
        loop {
            self.index = self.index.checked_add(1)?;
            match offsets.get(self.index as usize)? {
                0 => continue,
                _ => {
                    let index = self.index;
                    return Some(self.constant_pool.get(index).map(|entry| (index, entry)));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.constant_pool.offset.len().saturating_sub(1);
        (0, Some(len))
    }
}
