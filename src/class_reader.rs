use crate::{ClassAccess, ClassFileError, ClassFileResult, ConstantPool};
use java_string::JavaStr;
use std::borrow::Cow;

/// Newest class file major version whose layout is known. Later versions are
/// rejected instead of being rewritten on guesswork.
pub const LATEST_MAJOR_VERSION: u16 = 70;

pub struct ClassReader<'class> {
    buffer: ClassBuffer<'class>,
    pub constant_pool: ConstantPool<'class>,
    metadata_start: usize,
}

impl<'class> ClassReader<'class> {
    pub fn new(data: &'class [u8]) -> ClassFileResult<ClassReader<'class>> {
        let buffer = ClassBuffer { data };

        if buffer.read_u32(0)? != 0xcafebabe {
            return Err(ClassFileError::BadMagic);
        }
        let major_version = buffer.read_u16(6)?;
        if major_version > LATEST_MAJOR_VERSION {
            return Err(ClassFileError::UnsupportedVersion(major_version));
        }

        let (constant_pool, metadata_start) = ConstantPool::new(buffer)?;

        Ok(ClassReader {
            buffer,
            constant_pool,
            metadata_start,
        })
    }

    pub(crate) fn buffer(&self) -> ClassBuffer<'class> {
        self.buffer
    }

    /// Offset of `access_flags`, right after the constant pool.
    pub(crate) fn metadata_start(&self) -> usize {
        self.metadata_start
    }

    pub fn major_version(&self) -> u16 {
        u16::from_be_bytes([self.buffer.data[6], self.buffer.data[7]])
    }

    pub fn minor_version(&self) -> u16 {
        u16::from_be_bytes([self.buffer.data[4], self.buffer.data[5]])
    }

    pub fn access(&self) -> ClassFileResult<ClassAccess> {
        Ok(ClassAccess::from_bits_retain(
            self.buffer.read_u16(self.metadata_start)?,
        ))
    }

    pub fn name_index(&self) -> ClassFileResult<u16> {
        self.constant_pool
            .get_class(self.buffer.read_u16(self.metadata_start + 2)?)
    }

    pub fn name(&self) -> ClassFileResult<Cow<'class, JavaStr>> {
        self.constant_pool.get_utf8(self.name_index()?)
    }

    pub fn super_name(&self) -> ClassFileResult<Option<Cow<'class, JavaStr>>> {
        self.constant_pool
            .get_optional_class(self.buffer.read_u16(self.metadata_start + 4)?)?
            .map(|index| self.constant_pool.get_utf8(index))
            .transpose()
    }

    pub fn interfaces(&self) -> ClassFileResult<InterfacesIterator<'_, 'class>> {
        let interface_count = self.buffer.read_u16(self.metadata_start + 6)? as usize;
        Ok(InterfacesIterator {
            reader: self,
            interface_count,
            index: 0,
        })
    }
}

#[derive(Copy, Clone)]
pub struct InterfacesIterator<'a, 'class> {
    reader: &'a ClassReader<'class>,
    interface_count: usize,
    index: usize,
}

impl<'class> Iterator for InterfacesIterator<'_, 'class> {
    type Item = ClassFileResult<Cow<'class, JavaStr>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.interface_count {
            return None;
        }

        let index = self.index;
        self.index += 1;

        Some(
            self.reader
                .buffer
                .read_u16(self.reader.metadata_start + 8 + index * 2)
                .and_then(|itf_index| self.reader.constant_pool.get_class_name(itf_index)),
        )
    }
}

#[derive(Copy, Clone)]
pub struct ClassBuffer<'class> {
    data: &'class [u8],
}

impl<'class> ClassBuffer<'class> {
    pub fn data(&self) -> &'class [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn read_array<const N: usize>(&self, index: usize) -> ClassFileResult<[u8; N]> {
        let slice = self.read_bytes(index, N)?;
        // SAFETY: just read the correct amount of bytes so the conversion to array should succeed
        let array = unsafe { slice.try_into().unwrap_unchecked() };
        Ok(array)
    }

    pub fn read_u8(&self, index: usize) -> ClassFileResult<u8> {
        self.read_array::<1>(index).map(|arr| arr[0])
    }

    pub fn read_u16(&self, index: usize) -> ClassFileResult<u16> {
        self.read_array::<2>(index).map(u16::from_be_bytes)
    }

    pub fn read_u32(&self, index: usize) -> ClassFileResult<u32> {
        self.read_array::<4>(index).map(u32::from_be_bytes)
    }

    pub fn read_u64(&self, index: usize) -> ClassFileResult<u64> {
        self.read_array::<8>(index).map(u64::from_be_bytes)
    }

    pub fn read_i32(&self, index: usize) -> ClassFileResult<i32> {
        self.read_u32(index).map(|u| u as i32)
    }

    pub fn read_i64(&self, index: usize) -> ClassFileResult<i64> {
        self.read_u64(index).map(|u| u as i64)
    }

    pub fn read_f32(&self, index: usize) -> ClassFileResult<f32> {
        self.read_u32(index).map(f32::from_bits)
    }

    pub fn read_f64(&self, index: usize) -> ClassFileResult<f64> {
        self.read_u64(index).map(f64::from_bits)
    }

    pub fn read_bytes(&self, index: usize, len: usize) -> ClassFileResult<&'class [u8]> {
        index
            .checked_add(len)
            .and_then(|end| self.data.get(index..end))
            .ok_or_else(|| ClassFileError::OutOfBounds {
                index: index.saturating_add(len).saturating_sub(1),
                len: self.data.len(),
            })
    }
}
