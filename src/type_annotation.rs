use crate::{ClassBuffer, ClassFileError, ClassFileResult};
use derive_more::TryFrom;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFrom)]
#[repr(u8)]
#[try_from(repr)]
pub(crate) enum TypeReferenceTargetType {
    ClassTypeParameter = 0x00,
    MethodTypeParameter = 0x01,
    ClassExtends = 0x10,
    ClassTypeParameterBound = 0x11,
    MethodTypeParameterBound = 0x12,
    Field = 0x13,
    MethodReturn = 0x14,
    MethodReceiver = 0x15,
    MethodFormalParameter = 0x16,
    Throws = 0x17,
    LocalVariable = 0x40,
    ResourceVariable = 0x41,
    ExceptionParameter = 0x42,
    Instanceof = 0x43,
    New = 0x44,
    ConstructorReference = 0x45,
    MethodReference = 0x46,
    Cast = 0x47,
    ConstructorInvocationTypeArgument = 0x48,
    MethodInvocationTypeArgument = 0x49,
    ConstructorReferenceTypeArgument = 0x4A,
    MethodReferenceTypeArgument = 0x4B,
}

impl TypeReferenceTargetType {
    pub(crate) fn from_u8(target_type: u8) -> ClassFileResult<TypeReferenceTargetType> {
        TypeReferenceTargetType::try_from(target_type)
            .map_err(|_| ClassFileError::BadTypeAnnotationTarget(target_type))
    }

    /// Size of the `target_info` that follows the target type byte at
    /// `offset`.
    pub(crate) fn target_info_len(
        self,
        buffer: ClassBuffer<'_>,
        offset: usize,
    ) -> ClassFileResult<usize> {
        use TypeReferenceTargetType::*;
        Ok(match self {
            Field | MethodReturn | MethodReceiver => 0,
            ClassTypeParameter | MethodTypeParameter | MethodFormalParameter => 1,
            ClassExtends
            | ClassTypeParameterBound
            | MethodTypeParameterBound
            | Throws
            | ExceptionParameter
            | Instanceof
            | New
            | ConstructorReference
            | MethodReference => 2,
            Cast
            | ConstructorInvocationTypeArgument
            | MethodInvocationTypeArgument
            | ConstructorReferenceTypeArgument
            | MethodReferenceTypeArgument => 3,
            LocalVariable | ResourceVariable => 2 + 6 * buffer.read_u16(offset)? as usize,
        })
    }
}
