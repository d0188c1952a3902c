use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use pixcanvas_engine::core::{App, AppControl, FrameCtx};
use pixcanvas_engine::device::GpuInit;
use pixcanvas_engine::logging::{init_logging, LoggingConfig};
use pixcanvas_engine::render::shapes::{Circle, LineStrip, PrimitiveVertex, Rectangle, SpriteInstance};
use pixcanvas_engine::render::{RenderConfig, UpscaleFilter};
use pixcanvas_engine::sheet::{AnimationHandle, SheetBuilder, SpriteData, SpriteHandle};
use pixcanvas_engine::window::{Runtime, RuntimeConfig};

const CANVAS: (u32, u32) = (320, 180);
const SPINNER_FPS: f64 = 8.0;

#[derive(Default)]
struct Demo {
    tile: Option<SpriteHandle>,
    ball: Option<SpriteHandle>,
    spinner: Option<AnimationHandle>,
}

fn checker_tile() -> Result<SpriteData> {
    Ok(SpriteData::from_fn((16, 16), (0, 0), |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            [40, 44, 62, 255]
        } else {
            [52, 58, 80, 255]
        }
    })?)
}

fn ball() -> Result<SpriteData> {
    // Offset centers the 12×12 ball on the draw position.
    Ok(SpriteData::from_fn((12, 12), (-6, -6), |x, y| {
        let dx = x as f32 - 5.5;
        let dy = y as f32 - 5.5;
        let d2 = dx * dx + dy * dy;
        if d2 > 36.0 {
            [0, 0, 0, 0]
        } else if dx + dy < -3.0 {
            [255, 230, 160, 255]
        } else {
            [230, 140, 40, 255]
        }
    })?)
}

/// Four frames of a bar rotating through 45° steps.
fn spinner_frames() -> Result<Vec<SpriteData>> {
    (0..4)
        .map(|frame| {
            Ok(SpriteData::from_fn((9, 9), (-4, -4), move |x, y| {
                let (x, y) = (x as i32 - 4, y as i32 - 4);
                let on = match frame {
                    0 => y == 0,
                    1 => x == -y,
                    2 => x == 0,
                    _ => x == y,
                };
                if on { [120, 220, 255, 255] } else { [0, 0, 0, 0] }
            })?)
        })
        .collect()
}

impl App for Demo {
    fn build_sheet(&mut self, sheet: &mut SheetBuilder) -> Result<()> {
        self.tile = Some(sheet.add(checker_tile()?)?);
        self.ball = Some(sheet.add(ball()?)?);
        self.spinner = Some(sheet.add_animation(spinner_frames()?)?);
        log::info!("demo sheet: {} pixels", sheet.pixel_count());
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if event.state == ElementState::Pressed
                && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
            {
                return AppControl::Exit;
            }
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let (w, h) = (ctx.canvas.width() as i32, ctx.canvas.height() as i32);
        let t = ctx.time.elapsed as f32;

        // Floor tiles.
        if let Some(tile) = self.tile {
            for ty in (0..h).step_by(16) {
                for tx in (0..w).step_by(16) {
                    ctx.scene.push_sprite(SpriteInstance::new([tx, ty], tile));
                }
            }
        }

        // Frame and a one-pixel border exercising 1-wide rectangles.
        let border = [0.9, 0.9, 0.9, 1.0];
        ctx.scene.push_rect(Rectangle { offset: [0, 0], dimensions: [w as u32, 1], color: border });
        ctx.scene.push_rect(Rectangle { offset: [0, h - 1], dimensions: [w as u32, 1], color: border });
        ctx.scene.push_rect(Rectangle { offset: [0, 0], dimensions: [1, h as u32], color: border });
        ctx.scene.push_rect(Rectangle { offset: [w - 1, 0], dimensions: [1, h as u32], color: border });
        ctx.scene.push_rect(Rectangle { offset: [8, 8], dimensions: [1, 1], color: [1.0, 0.0, 0.0, 1.0] });

        // Rings of every diameter from 1 to 24.
        let mut x = 12;
        for d in 1..=24u32 {
            ctx.scene.push_circle(Circle { offset: [x, 140], diameter: d, color: [0.3, 1.0, 0.4, 1.0] });
            x += d as i32 + 2;
            if x > w - 30 {
                break;
            }
        }

        // Sine wave.
        let wave: LineStrip = (0..w)
            .step_by(2)
            .map(|px| {
                let py = 90.0 + 20.0 * (px as f32 * 0.05 + t * 2.0).sin();
                PrimitiveVertex::new([px as f32, py.round()], [1.0, 0.8, 0.2, 1.0])
            })
            .collect();
        ctx.scene.push_line_strip(wave);

        // Twinkling points.
        for i in 0..32 {
            let px = (i * 97 % w) as f32;
            let py = (120 + i * 13 % (h - 124)) as f32;
            let on = ((t * 3.0) as i32 + i) % 4 != 0;
            if on {
                ctx.scene.push_point(PrimitiveVertex::new([px, py], [1.0; 4]));
            }
        }

        // Bouncing ball and a spinner.
        if let Some(ball) = self.ball {
            let bx = (w / 2) as f32 + (w as f32 * 0.35) * (t * 0.9).sin();
            let by = 60.0 + 30.0 * (t * 2.3).sin().abs();
            ctx.scene.push_sprite(SpriteInstance::new([bx.round() as i32, by.round() as i32], ball));
        }
        if let Some(spinner) = self.spinner {
            let frame = spinner.frame(ctx.time.ticks(SPINNER_FPS));
            ctx.scene.push_sprite(SpriteInstance::new([w - 20, h - 20], frame));
        }

        AppControl::Continue
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let render_config = RenderConfig {
        canvas: CANVAS,
        upscale_filter: UpscaleFilter::Nearest,
        clear_color: [0.02, 0.02, 0.04, 1.0],
        ..RenderConfig::default()
    };

    Runtime::run(
        RuntimeConfig {
            title: "pixcanvas demo".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        render_config,
        Demo::default(),
    )
}
