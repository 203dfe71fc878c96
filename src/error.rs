use crate::ConstantPoolTag;
use java_string::Utf8Error;
use std::io;
use std::path::PathBuf;
use strum::{Display, FromRepr};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassFileError {
    #[error("bad annotation tag: {0}")]
    BadAnnotationTag(u8),
    #[error("bad constant pool index: {index}, len {len}")]
    BadConstantPoolIndex { index: u16, len: usize },
    #[error("no entry at constant pool index: {0}")]
    BadConstantPoolIndexNoEntry(u16),
    #[error("bad constant pool tag: {0}")]
    BadConstantPoolTag(u8),
    #[error("bad constant pool tag: {actual}, expected {expected}")]
    BadConstantPoolType {
        expected: ConstantPoolTag,
        actual: ConstantPoolTag,
    },
    #[error("bad handle kind: {0}")]
    BadHandleKind(u8),
    #[error("bad magic number")]
    BadMagic,
    #[error("constant pool is full, cannot add entry {0}")]
    ConstantPoolFull(usize),
    #[error("bad type annotation target: {0}")]
    BadTypeAnnotationTarget(u8),
    #[error("read past the end of the class file, index {index}, len {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("too deep annotation nesting")]
    TooDeepAnnotationNesting,
    #[error("unsupported class file version: {0}")]
    UnsupportedVersion(u16),
    #[error("utf8 error: {0}")]
    Utf8(#[from] Utf8Error),
    #[error("constant pool utf8 entry {index} too long after rewriting: {len} bytes")]
    Utf8TooLong { index: u16, len: usize },
}

pub type ClassFileResult<T> = Result<T, ClassFileError>;

/// A descriptor or signature that does not follow the JVM grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position} in {text:?}")]
pub struct GrammarError {
    pub text: String,
    pub position: usize,
    pub message: &'static str,
}

pub type GrammarResult<T> = Result<T, GrammarError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RulesError {
    #[error("invalid package name {name:?} in {table} rules")]
    InvalidPackageName { table: &'static str, name: String },
    #[error("rename target {target:?} of {source_package:?} is itself renamed by {rule:?}")]
    ChainedRename {
        source_package: String,
        target: String,
        rule: String,
    },
    #[error("packages {first:?} and {second:?} both rename to {target:?}, the rules cannot be inverted")]
    AmbiguousInverse {
        first: String,
        second: String,
        target: String,
    },
    #[error("invalid version range {range:?} for package {package:?}")]
    InvalidVersion { package: String, range: String },
    #[error("invalid bundle rule for {0:?}")]
    InvalidBundle(String),
    #[error("empty class name in per-class constant rules")]
    EmptyClassName,
    #[error("invalid selection pattern {0:?}")]
    InvalidPattern(String),
}

pub type RulesResult<T> = Result<T, RulesError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransformError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed type data in [ {resource} ]: {source}")]
    Grammar {
        resource: String,
        #[source]
        source: GrammarError,
    },
    #[error("malformed class file [ {resource} ]: {source}")]
    ClassFile {
        resource: String,
        #[source]
        source: ClassFileError,
    },
    #[error("resource [ {resource} ] is not valid UTF-8 text")]
    Encoding { resource: String },
    #[error("rules error: {0}")]
    Rules(#[from] RulesError),
    #[error("no action accepts [ {resource} ]")]
    UnsupportedResource { resource: String },
    #[error("output already exists [ {} ]", .0.display())]
    OutputExists(PathBuf),
    #[error("logger settings error: {0}")]
    Logging(String),
}

pub type TransformResult<T> = Result<T, TransformError>;

impl TransformError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        TransformError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn grammar(resource: &str, source: GrammarError) -> Self {
        TransformError::Grammar {
            resource: resource.to_owned(),
            source,
        }
    }

    pub(crate) fn class_file(resource: &str, source: ClassFileError) -> Self {
        TransformError::ClassFile {
            resource: resource.to_owned(),
            source,
        }
    }

    /// Whether the error aborts the run. Everything else is local to one
    /// resource, which is passed through unchanged.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransformError::Io { .. }
                | TransformError::Rules(_)
                | TransformError::OutputExists(_)
                | TransformError::Logging(_)
        )
    }

    pub fn return_code(&self) -> ReturnCode {
        match self {
            TransformError::Rules(_) => ReturnCode::RulesError,
            TransformError::UnsupportedResource { .. } => ReturnCode::FileTypeError,
            TransformError::Logging(_) => ReturnCode::LoggerSettingsError,
            _ => ReturnCode::TransformError,
        }
    }
}

/// Run-level outcome, suitable as a process exit code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum ReturnCode {
    Success = 0,
    ParseError = 1,
    RulesError = 2,
    TransformError = 3,
    FileTypeError = 4,
    LoggerSettingsError = 5,
}

impl ReturnCode {
    pub fn description(self) -> &'static str {
        match self {
            ReturnCode::Success => "Success",
            ReturnCode::ParseError => "Parse Error",
            ReturnCode::RulesError => "Rules Error",
            ReturnCode::TransformError => "Transform Error",
            ReturnCode::FileTypeError => "File Type Error",
            ReturnCode::LoggerSettingsError => "Logger Settings Error",
        }
    }

    pub fn is_success(self) -> bool {
        self == ReturnCode::Success
    }
}
