use bitflags::bitflags;

bitflags! {
    /// The class `access_flags` this crate looks at. Other bits are kept as
    /// read.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct ClassAccess: u16 {
        const Public = 0x0001;
        const Super = 0x0020;
        const Module = 0x8000;
    }
}

impl ClassAccess {
    /// `module-info` is named after its module rather than a package path, so
    /// it stays where it is when its packages are renamed.
    pub fn keeps_resource_name(self) -> bool {
        self.contains(ClassAccess::Module)
    }
}

#[cfg(test)]
mod test {
    use super::ClassAccess;

    #[test]
    fn test_module_keeps_name() {
        assert!(ClassAccess::from_bits_retain(0x8000).keeps_resource_name());
        // public final super
        let access = ClassAccess::from_bits_retain(0x0031);
        assert!(!access.keeps_resource_name());
        assert_eq!(0x0031, access.bits());
    }
}
