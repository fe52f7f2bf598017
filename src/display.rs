use log::{debug, info};
use pixels::{Pixels, SurfaceTexture};
use winit::event_loop::{EventLoop, EventLoopProxy};
use winit::window::Window;
use winit::{dpi::LogicalSize, window::WindowBuilder};

use crate::error::{Error, Result};
use crate::screen::{Frame, HEIGHT, WIDTH};

/// Unlit pixel colour.
const DARK: [u8; 4] = [0x2A, 0x47, 0x33, 0xFF];
/// Lit pixel colour.
const LIGHT: [u8; 4] = [0x4B, 0x69, 0x33, 0xFF];

/// Rendering collaborator the interpreter hands its pixel grid to.
pub trait Renderer: Send {
    /// Shows `frame` on screen.
    fn present(&mut self, frame: &Frame) -> Result<()>;
    /// Blanks the backend's draw buffer without presenting it.
    fn clear(&mut self) -> Result<()>;
}

/// Messages from the interpreter thread to the window's event loop.
#[derive(Debug)]
pub enum DisplayEvent {
    Present(Box<Frame>),
    Clear,
}

/// [`Renderer`] that forwards frames to the event loop owning the window.
pub struct FrameSender {
    proxy: EventLoopProxy<DisplayEvent>,
}

impl FrameSender {
    pub fn new(event_loop: &EventLoop<DisplayEvent>) -> Self {
        Self {
            proxy: event_loop.create_proxy(),
        }
    }

    fn send(&self, event: DisplayEvent) -> Result<()> {
        self.proxy
            .send_event(event)
            .map_err(|_| Error::Render("window event loop has closed".into()))
    }
}

impl Renderer for FrameSender {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.send(DisplayEvent::Present(Box::new(*frame)))
    }

    fn clear(&mut self) -> Result<()> {
        self.send(DisplayEvent::Clear)
    }
}

/// RGBA copy of the pixel grid waiting to be drawn into the window.
#[derive(Debug, Clone, PartialEq)]
pub struct Scratch {
    pixels: [u8; WIDTH * HEIGHT * 4],
}

impl Default for Scratch {
    fn default() -> Self {
        let mut scratch = Self {
            pixels: [0; WIDTH * HEIGHT * 4],
        };
        scratch.clear();
        scratch
    }
}

impl Scratch {
    /// Applies a message from the interpreter. Returns true if the window
    /// should be redrawn.
    pub fn apply(&mut self, event: DisplayEvent) -> bool {
        match event {
            DisplayEvent::Present(frame) => {
                self.load(&frame);
                true
            }
            DisplayEvent::Clear => {
                self.clear();
                false
            }
        }
    }

    pub fn clear(&mut self) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel.copy_from_slice(&DARK);
        }
    }

    fn load(&mut self, frame: &Frame) {
        for (pixel, &lit) in self.pixels.chunks_exact_mut(4).zip(frame.iter()) {
            pixel.copy_from_slice(if lit { &LIGHT } else { &DARK });
        }
    }

    fn rgba(&self) -> &[u8] {
        &self.pixels
    }
}

/// The window and its scaled 64x32 framebuffer.
#[derive(Debug)]
pub struct Display {
    scratch: Scratch,
    window: Window,
    pixels: Pixels,
}

impl Display {
    pub fn new(event_loop: &EventLoop<DisplayEvent>, scale: u32) -> Result<Self> {
        let window = {
            let size = LogicalSize::new(WIDTH as u32, HEIGHT as u32);
            let scaled_size = LogicalSize::new(
                WIDTH as f64 * scale as f64,
                HEIGHT as f64 * scale as f64,
            );
            WindowBuilder::new()
                .with_title("CHIP-8")
                .with_inner_size(scaled_size)
                .with_min_inner_size(size)
                .build(event_loop)?
        };

        let pixels = {
            let size = window.inner_size();
            let texture = SurfaceTexture::new(size.width, size.height, &window);
            Pixels::new(WIDTH as u32, HEIGHT as u32, texture)?
        };

        info!("Attached display [scale: {scale}]");
        Ok(Self {
            scratch: Scratch::default(),
            window,
            pixels,
        })
    }

    pub fn handle(&mut self, event: DisplayEvent) {
        if self.scratch.apply(event) {
            self.window.request_redraw();
        }
    }

    pub fn render(&mut self) -> Result<()> {
        self.draw();
        self.pixels
            .render()
            .map_err(|err| Error::Render(err.to_string()))
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        debug!("Resizing surface to {width}x{height}");
        self.pixels
            .resize_surface(width, height)
            .map_err(|err| Error::Render(err.to_string()))
    }

    fn draw(&mut self) {
        let frame = self.pixels.get_frame_mut();
        for (pixel, scratch_pixel) in frame
            .chunks_exact_mut(4)
            .zip(self.scratch.rgba().chunks_exact(4))
        {
            pixel.copy_from_slice(scratch_pixel);
        }
    }
}
