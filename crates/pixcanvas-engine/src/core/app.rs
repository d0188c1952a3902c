use winit::event::WindowEvent;

use crate::sheet::SheetBuilder;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once after the GPU is ready. Every sprite added to `sheet` is
    /// uploaded before the first frame.
    fn build_sheet(&mut self, sheet: &mut SheetBuilder) -> anyhow::Result<()> {
        let _ = sheet;
        Ok(())
    }

    /// Called for window events, before the runtime handles them.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per frame with an empty scene to fill.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl;
}
