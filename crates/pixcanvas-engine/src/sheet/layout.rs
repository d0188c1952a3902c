/// Physical tiling of the logical sprite arena into a 2D texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    width: u32,
}

impl SheetLayout {
    /// # Panics
    /// Panics if `width` is zero.
    #[inline]
    pub const fn new(width: u32) -> Self {
        assert!(width > 0, "sheet width must be non-zero");
        Self { width }
    }

    #[inline]
    pub const fn width(self) -> u32 {
        self.width
    }

    /// Physical texel of logical arena entry `address`.
    ///
    /// `(address mod width, address div width)`; rows run top to bottom.
    #[inline]
    pub const fn locate(self, address: u32) -> (u32, u32) {
        (address % self.width, address / self.width)
    }

    /// Byte offset of logical entry `address` in a tightly packed RGBA8 texel array.
    #[inline]
    pub const fn byte_offset(self, address: u32) -> usize {
        let (x, y) = self.locate(address);
        (y as usize * self.width as usize + x as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_wraps_rows() {
        let layout = SheetLayout::new(5);
        assert_eq!(layout.locate(0), (0, 0));
        assert_eq!(layout.locate(4), (4, 0));
        assert_eq!(layout.locate(5), (0, 1));
        assert_eq!(layout.locate(13), (3, 2));
    }

    #[test]
    fn width_one_is_a_column() {
        let layout = SheetLayout::new(1);
        assert_eq!(layout.locate(7), (0, 7));
    }

    #[test]
    fn byte_offset_is_row_major() {
        let layout = SheetLayout::new(8);
        assert_eq!(layout.byte_offset(9), 36);
    }

    #[test]
    #[should_panic]
    fn zero_width_panics() {
        let _ = SheetLayout::new(0);
    }
}
