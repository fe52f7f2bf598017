use log::trace;

use crate::bits;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

/// Row-major snapshot of the pixel grid; `true` is lit.
pub type Frame = [bool; WIDTH * HEIGHT];

/// The 64x32 monochrome pixel grid sprites are XORed onto.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pixels: Frame,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            pixels: [false; WIDTH * HEIGHT],
        }
    }
}

impl Screen {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn clear(&mut self) {
        self.pixels = [false; WIDTH * HEIGHT];
    }

    /// XORs an 8-pixel-wide sprite, one byte per row, onto the grid at
    /// `(x, y)`. Coordinates wrap around both edges.
    ///
    /// Returns 1 if any lit pixel was turned off, else 0.
    pub fn draw(&mut self, x: u8, y: u8, rows: &[u8]) -> u8 {
        let mut collision = 0;
        for (i, &row) in rows.iter().enumerate() {
            let py = (y as usize + i) % HEIGHT;
            trace!("Drawing sprite row {row:08b} at ({x}, {py})");
            for j in 0..8 {
                if !bits::set(7 - j as u8, row) {
                    continue;
                }
                let px = (x as usize + j) % WIDTH;
                let pixel = &mut self.pixels[py * WIDTH + px];
                if *pixel {
                    collision = 1;
                }
                *pixel = !*pixel;
            }
        }
        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(y % HEIGHT) * WIDTH + x % WIDTH]
    }

    pub fn frame(&self) -> &Frame {
        &self.pixels
    }
}
