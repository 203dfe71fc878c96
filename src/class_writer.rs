use crate::{ClassFileError, ClassFileResult, ClassReader, ConstantPoolTag};
use java_string::JavaStr;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Changes to the UTF-8 entries of one class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Utf8Edits {
    /// Replacement text for existing entries, by index.
    pub updates: BTreeMap<u16, String>,
    /// New entries, numbered on from the end of the existing pool.
    pub appended: Vec<String>,
    /// `u16` index fields, by offset in the class bytes, to point elsewhere.
    pub repoints: Vec<(usize, u16)>,
}

impl Utf8Edits {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.appended.is_empty() && self.repoints.is_empty()
    }

    /// Adds a UTF-8 entry after the existing `pool_count - 1` entries and
    /// returns its index.
    pub fn append(&mut self, pool_count: u16, value: String) -> ClassFileResult<u16> {
        let index = pool_count as usize + self.appended.len();
        // the new constant_pool_count, index + 1, must fit in a u16
        let index = u16::try_from(index)
            .ok()
            .filter(|&index| index < u16::MAX)
            .ok_or(ClassFileError::ConstantPoolFull(index))?;
        self.appended.push(value);
        Ok(index)
    }
}

/// Writes `reader`'s class with the edits applied. Existing entries keep
/// their index and bytes unless updated, appended entries go after them, and
/// everything after the constant pool is copied unchanged apart from
/// repointed index fields.
pub fn rewrite_utf8_entries(reader: &ClassReader<'_>, edits: &Utf8Edits) -> ClassFileResult<Vec<u8>> {
    let original = reader.buffer().data();
    let data = if edits.repoints.is_empty() {
        Cow::Borrowed(original)
    } else {
        let mut patched = original.to_vec();
        for &(offset, index) in &edits.repoints {
            let field = offset
                .checked_add(2)
                .and_then(|end| patched.get_mut(offset..end))
                .ok_or(ClassFileError::OutOfBounds {
                    index: offset.saturating_add(1),
                    len: original.len(),
                })?;
            field.copy_from_slice(&index.to_be_bytes());
        }
        Cow::Owned(patched)
    };

    let pool = &reader.constant_pool;
    let pool_range = pool.byte_range();
    let count = pool.count() as usize + edits.appended.len();
    let count = u16::try_from(count).map_err(|_| ClassFileError::ConstantPoolFull(count))?;

    let added: usize = edits.updates.values().chain(&edits.appended).map(String::len).sum();
    let mut output = Vec::with_capacity(data.len() + added + 3 * edits.appended.len());
    output.extend_from_slice(&data[..8]);
    output.extend_from_slice(&count.to_be_bytes());
    output.extend_from_slice(&data[10..pool_range.start]);
    for index in 1..pool.count() {
        let range = match pool.entry_range(index) {
            Ok(range) => range,
            Err(ClassFileError::BadConstantPoolIndexNoEntry(_)) => continue,
            Err(err) => return Err(err),
        };
        match edits.updates.get(&index) {
            Some(value) => {
                let tag = pool.get_type(index)?;
                if tag != ConstantPoolTag::Utf8 {
                    return Err(ClassFileError::BadConstantPoolType {
                        expected: ConstantPoolTag::Utf8,
                        actual: tag,
                    });
                }
                push_utf8(&mut output, index, value)?;
            }
            None => output.extend_from_slice(&data[range]),
        }
    }
    for (index, value) in (pool.count()..).zip(&edits.appended) {
        push_utf8(&mut output, index, value)?;
    }
    output.extend_from_slice(&data[pool_range.end..]);
    Ok(output)
}

fn push_utf8(output: &mut Vec<u8>, index: u16, value: &str) -> ClassFileResult<()> {
    let encoded = JavaStr::from_str(value).to_modified_utf8();
    let len = u16::try_from(encoded.len()).map_err(|_| ClassFileError::Utf8TooLong {
        index,
        len: encoded.len(),
    })?;
    output.push(ConstantPoolTag::Utf8 as u8);
    output.extend_from_slice(&len.to_be_bytes());
    output.extend_from_slice(&encoded);
    Ok(())
}
