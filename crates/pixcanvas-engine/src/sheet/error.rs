use std::fmt;

/// Errors raised while populating a sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// A sprite was declared with a zero width or height.
    ZeroDimension { width: u32, height: u32 },
    /// Pixel data does not match `width * height * 4` bytes.
    DataLength { expected: usize, actual: usize },
    /// The sheet would no longer fit into a `max_width × max_width` texture.
    CapacityExceeded { requested: u64, capacity: u64 },
    /// An animation was submitted without frames.
    EmptyAnimation,
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::ZeroDimension { width, height } => {
                write!(f, "sprite has zero-sized dimensions {width}x{height}")
            }
            SheetError::DataLength { expected, actual } => {
                write!(f, "sprite data is {actual} bytes, expected {expected}")
            }
            SheetError::CapacityExceeded { requested, capacity } => {
                write!(f, "sheet needs {requested} pixels but holds at most {capacity}")
            }
            SheetError::EmptyAnimation => f.write_str("animation has no frames"),
        }
    }
}

impl std::error::Error for SheetError {}
