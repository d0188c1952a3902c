use std::num::NonZeroU32;

use super::{SheetError, SheetLayout};

/// Widest sheet texture requested when the device limit is unknown.
pub const DEFAULT_MAX_SHEET_WIDTH: u32 = 8192;

/// Sprite pixels submitted to a [`SheetBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteData {
    dimensions: (NonZeroU32, NonZeroU32),
    offset: (i32, i32),
    data: Vec<u8>,
}

impl SpriteData {
    /// Creates sprite data from RGBA8 sRGB pixels, rows top to bottom.
    ///
    /// `offset` is added to the draw position of every instance of the sprite,
    /// so `(0, 0)` pins the sprite's bottom-left corner to the draw position.
    pub fn new(dimensions: (u32, u32), offset: (i32, i32), data: Vec<u8>) -> Result<Self, SheetError> {
        let (Some(w), Some(h)) = (NonZeroU32::new(dimensions.0), NonZeroU32::new(dimensions.1)) else {
            return Err(SheetError::ZeroDimension {
                width: dimensions.0,
                height: dimensions.1,
            });
        };

        let expected = w.get() as usize * h.get() as usize * 4;
        if data.len() != expected {
            return Err(SheetError::DataLength {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            dimensions: (w, h),
            offset,
            data,
        })
    }

    /// Builds a sprite by evaluating `pixel(x, y)` for every pixel, `y = 0` being the top row.
    pub fn from_fn(
        dimensions: (u32, u32),
        offset: (i32, i32),
        mut pixel: impl FnMut(u32, u32) -> [u8; 4],
    ) -> Result<Self, SheetError> {
        let mut data = Vec::with_capacity(dimensions.0 as usize * dimensions.1 as usize * 4);
        for y in 0..dimensions.1 {
            for x in 0..dimensions.0 {
                data.extend_from_slice(&pixel(x, y));
            }
        }
        Self::new(dimensions, offset, data)
    }

    #[inline]
    pub fn pixel_count(&self) -> u32 {
        self.dimensions.0.get() * self.dimensions.1.get()
    }
}

/// Location of one sprite inside the arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpriteEntry {
    /// Logical index of the sprite's first pixel.
    pub address: u32,
    pub dimensions: (NonZeroU32, NonZeroU32),
    /// Draw-position offset applied to every instance.
    pub offset: (i32, i32),
}

impl SpriteEntry {
    #[inline]
    pub fn width(&self) -> u32 {
        self.dimensions.0.get()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dimensions.1.get()
    }

    /// One past the last logical index owned by this sprite.
    #[inline]
    pub fn end(&self) -> u32 {
        self.address + self.width() * self.height()
    }
}

/// Index of a sprite in its sheet's entry table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SpriteHandle(pub(crate) usize);

impl SpriteHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A run of consecutive sprites played back as frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AnimationHandle {
    first: usize,
    frame_count: usize,
}

impl AnimationHandle {
    /// Frame shown at `time`, looping over the run.
    #[inline]
    pub fn frame(&self, time: usize) -> SpriteHandle {
        SpriteHandle(self.first + time % self.frame_count)
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

/// Narrowest sheet a builder accepts.
///
/// A 1-texel-wide sheet would tile its own placeholder to height 2.
pub const MIN_SHEET_WIDTH: u32 = 2;

/// Accumulates sprites into a flat pixel arena.
#[derive(Debug)]
pub struct SheetBuilder {
    /// Name for log messages and GPU labels.
    name: String,
    /// Widest texture the sheet may be tiled into.
    max_width: u32,
    table: Vec<SpriteEntry>,
    pixel_count: u32,
    /// Arena pixels in logical order, RGBA8.
    data: Vec<u8>,
}

impl SheetBuilder {
    /// Creates a builder whose texture may be at most `max_width` texels wide and tall.
    /// `max_width` is raised to [`MIN_SHEET_WIDTH`].
    ///
    /// A transparent 1×1 placeholder is reserved at address 0 so that a sheet
    /// without user sprites still maps to a valid, non-empty texture.
    pub fn new(name: impl Into<String>, max_width: u32) -> Self {
        let mut builder = Self {
            name: name.into(),
            max_width: max_width.max(MIN_SHEET_WIDTH),
            table: Vec::new(),
            pixel_count: 0,
            data: Vec::new(),
        };
        let placeholder = SpriteData {
            dimensions: (NonZeroU32::MIN, NonZeroU32::MIN),
            offset: (0, 0),
            data: vec![0; 4],
        };
        builder.push_sprite(placeholder);
        builder
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pixels currently held by the arena, placeholder included.
    #[inline]
    pub fn pixel_count(&self) -> u32 {
        self.pixel_count
    }

    /// Largest pixel count a `max_width × max_width` sheet can hold.
    ///
    /// The tiled height is `1 + count / max_width`, so the count must stay
    /// strictly below `max_width²`.
    #[inline]
    fn capacity(&self) -> u64 {
        self.max_width as u64 * self.max_width as u64 - 1
    }

    fn check_capacity(&self, extra: u64) -> Result<(), SheetError> {
        let requested = self.pixel_count as u64 + extra;
        let capacity = self.capacity().min(u32::MAX as u64);
        if requested > capacity {
            return Err(SheetError::CapacityExceeded { requested, capacity });
        }
        Ok(())
    }

    fn push_sprite(&mut self, sprite: SpriteData) {
        let SpriteData { dimensions, offset, mut data } = sprite;
        self.table.push(SpriteEntry {
            address: self.pixel_count,
            dimensions,
            offset,
        });
        self.pixel_count += dimensions.0.get() * dimensions.1.get();
        self.data.append(&mut data);
    }

    /// Appends one sprite to the arena.
    pub fn add(&mut self, sprite: SpriteData) -> Result<SpriteHandle, SheetError> {
        self.check_capacity(sprite.pixel_count() as u64)?;
        self.push_sprite(sprite);
        Ok(SpriteHandle(self.table.len() - 1))
    }

    /// Appends a sequence of frames; they occupy consecutive handles.
    pub fn add_animation(&mut self, frames: Vec<SpriteData>) -> Result<AnimationHandle, SheetError> {
        if frames.is_empty() {
            return Err(SheetError::EmptyAnimation);
        }
        let total: u64 = frames.iter().map(|f| f.pixel_count() as u64).sum();
        self.check_capacity(total)?;

        let first = self.table.len();
        for frame in frames {
            self.push_sprite(frame);
        }
        Ok(AnimationHandle {
            first,
            frame_count: self.table.len() - first,
        })
    }

    /// Tiles the arena into its physical texel array.
    pub fn build(self) -> SheetPixels {
        let width = self.pixel_count.min(self.max_width);
        let height = 1 + self.pixel_count / self.max_width;
        log::info!("sprite sheet {:?} dimensions are: {width}x{height}", self.name);

        let layout = SheetLayout::new(width);
        let mut texels = vec![0u8; width as usize * height as usize * 4];
        for (address, pixel) in (0u32..).zip(self.data.chunks_exact(4)) {
            let at = layout.byte_offset(address);
            texels[at..at + 4].copy_from_slice(pixel);
        }

        SheetPixels {
            name: self.name,
            layout,
            height,
            texels,
            entries: self.table.into_boxed_slice(),
        }
    }
}

/// A finished sheet: padded physical texels plus the entry table.
#[derive(Debug, Clone)]
pub struct SheetPixels {
    name: String,
    layout: SheetLayout,
    height: u32,
    texels: Vec<u8>,
    entries: Box<[SpriteEntry]>,
}

impl SheetPixels {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn layout(&self) -> SheetLayout {
        self.layout
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 texels, rows top to bottom, `width * height * 4` bytes.
    #[inline]
    pub fn texels(&self) -> &[u8] {
        &self.texels
    }

    #[inline]
    pub fn entries(&self) -> &[SpriteEntry] {
        &self.entries
    }

    #[inline]
    pub fn entry(&self, handle: SpriteHandle) -> Option<&SpriteEntry> {
        self.entries.get(handle.0)
    }

    /// Exact texel load at a physical coordinate. Out-of-range coordinates read
    /// transparent black, like a robust-access GPU load.
    pub fn load(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width() || y >= self.height {
            return [0; 4];
        }
        let at = (y as usize * self.width() as usize + x as usize) * 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.texels[at..at + 4]);
        out
    }

    /// Releases the texel array while keeping the entry table.
    pub fn into_parts(self) -> (String, SheetLayout, u32, Vec<u8>, Box<[SpriteEntry]>) {
        (self.name, self.layout, self.height, self.texels, self.entries)
    }
}
