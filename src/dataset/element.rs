use bytemuck::Pod;
use std::fmt::Debug;

/// On-disk element encodings supported by a container dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    I32,
    I64,
    U32,
    U64,
}

impl ElementType {
    pub fn code(self) -> u8 {
        match self {
            ElementType::I32 => 1,
            ElementType::I64 => 2,
            ElementType::U32 => 3,
            ElementType::U64 => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<ElementType> {
        match code {
            1 => Some(ElementType::I32),
            2 => Some(ElementType::I64),
            3 => Some(ElementType::U32),
            4 => Some(ElementType::U64),
            _ => None,
        }
    }

    /// Width of one element in bytes.
    pub fn width(self) -> usize {
        match self {
            ElementType::I32 | ElementType::U32 => 4,
            ElementType::I64 | ElementType::U64 => 8,
        }
    }
}

/// Rust-side element types that map onto an [`ElementType`] encoding.
pub trait Element: Pod + Debug + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;
}

impl Element for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::I32;
}

impl Element for i64 {
    const ELEMENT_TYPE: ElementType = ElementType::I64;
}

impl Element for u32 {
    const ELEMENT_TYPE: ElementType = ElementType::U32;
}

impl Element for u64 {
    const ELEMENT_TYPE: ElementType = ElementType::U64;
}
