use super::shapes::{Circle, LineStrip, PrimitiveVertex, Rectangle, SpriteInstance};

/// One homogeneous run of draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    Rects(Vec<Rectangle>),
    Circles(Vec<Circle>),
    Sprites(Vec<SpriteInstance>),
    Points(Vec<PrimitiveVertex>),
    LineStrips(Vec<LineStrip>),
}

impl Batch {
    /// Number of instances (or strips) in the batch.
    pub fn len(&self) -> usize {
        match self {
            Batch::Rects(v) => v.len(),
            Batch::Circles(v) => v.len(),
            Batch::Sprites(v) => v.len(),
            Batch::Points(v) => v.len(),
            Batch::LineStrips(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered draw stream for a frame. Painter's order: later batches land on top.
///
/// The `push_*` helpers append to the last batch when it has the same kind, so
/// consecutive draws of one kind share a pass. Use [`Scene::push_batch`] to
/// force a new one.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scene {
    batches: Vec<Batch>,
}

macro_rules! push_helper {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $item:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self, item: $item) {
            if let Some(Batch::$variant(items)) = self.batches.last_mut() {
                items.push(item);
                return;
            }
            self.batches.push(Batch::$variant(vec![item]));
        }
    };
}

impl Scene {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears recorded batches. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    #[inline]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(Batch::is_empty)
    }

    /// Appends a whole batch. Empty batches are ignored.
    pub fn push_batch(&mut self, batch: Batch) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    push_helper!(push_rect, Rects, Rectangle);
    push_helper!(push_circle, Circles, Circle);
    push_helper!(push_sprite, Sprites, SpriteInstance);
    push_helper!(push_point, Points, PrimitiveVertex);
    push_helper!(
        /// Each strip is drawn as its own connected polyline.
        push_line_strip,
        LineStrips,
        LineStrip
    );
}
