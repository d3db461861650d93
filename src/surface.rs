// Diffusion surface: a pair of grayscale buffers that bleed and fade every tick.
// Visual expectation: strokes stamped here glow, blur outward (bleed) and
// fade to black (decay) over the following ticks.

use image::{GrayImage, Luma};

use crate::settings::{decay_factor, to_fixed};

/// Fixed-point scale used by `decay`: `SCALE` represents 1.0.
pub const SCALE_BITS: u32 = 20;
pub const SCALE: i32 = 1 << SCALE_BITS;

// Fractional bits of a pixel value kept when multiplying by the decay factor.
// 255 << 3 times SCALE still fits in an i32.
const FRACTION_BITS: u32 = 3;

/// One decay step's parameters, already converted to fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayParams {
    bleed: i32,  // [0, SCALE]
    factor: i32, // [0, SCALE]
    linear: i32, // [0, 255]
}

impl DecayParams {
    /// `bleed` in [0,1], `decay_exp` in [0,15], `decay_lin` subtracted per tick.
    pub fn new(bleed: f32, decay_exp: f32, decay_lin: u8) -> Self {
        Self::from_fixed(to_fixed(bleed), decay_factor(decay_exp), decay_lin)
    }

    pub fn from_fixed(bleed: i32, factor: i32, decay_lin: u8) -> Self {
        Self {
            bleed: bleed.clamp(0, SCALE),
            factor: factor.clamp(0, SCALE),
            linear: decay_lin as i32,
        }
    }

    pub fn bleeds(&self) -> bool {
        self.bleed > 0
    }
}

/// Front/back grayscale buffers of identical size.
/// Only the front buffer is readable; `decay` writes the back one and flips.
pub struct Surface {
    buffers: [GrayImage; 2],
    front: usize,
}

impl Surface {
    /// Two black buffers of `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffers: [GrayImage::new(width, height), GrayImage::new(width, height)],
            front: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.front().width()
    }

    pub fn height(&self) -> u32 {
        self.front().height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.front().dimensions()
    }

    /// The presentable buffer.
    pub fn front(&self) -> &GrayImage {
        &self.buffers[self.front]
    }

    fn front_mut(&mut self) -> &mut GrayImage {
        &mut self.buffers[self.front]
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    /// Panics outside the buffer, like slice indexing.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.front().get_pixel(x, y)[0]
    }

    /// 0 outside the buffer.
    pub fn get_clipped(&self, x: i32, y: i32) -> u8 {
        if self.contains(x, y) { self.get(x as u32, y as u32) } else { 0 }
    }

    /// Panics outside the buffer.
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.front_mut().put_pixel(x, y, Luma([value]));
    }

    /// Silently ignores writes outside the buffer.
    /// Visual: strokes near an edge are cut off, not rejected.
    pub fn set_clipped(&mut self, x: i32, y: i32, value: u8) {
        if self.contains(x, y) {
            self.set(x as u32, y as u32, value);
        }
    }

    /// One evolution step: blend each pixel with its 8 neighbors (bleed), then
    /// scale by the exponential factor and subtract the linear decay.
    /// Results land in the back buffer, which then becomes the front.
    pub fn decay(&mut self, params: DecayParams) {
        if params.bleeds() {
            self.decay_with_bleed(params);
        } else {
            self.decay_without_bleed(params);
        }
        self.front ^= 1;
    }

    // Hot path for bleed == 0: no neighbor reads at all.
    fn decay_without_bleed(&mut self, params: DecayParams) {
        let [first, second] = &mut self.buffers;
        let (src, dst) = if self.front == 0 { (first, second) } else { (second, first) };
        let src: &[u8] = src;
        let dst: &mut [u8] = dst;

        for (out, &value) in dst.iter_mut().zip(src) {
            *out = fade(value as i32 * SCALE, params);
        }
    }

    fn decay_with_bleed(&mut self, params: DecayParams) {
        let (w, h) = self.dimensions();
        let (w, h) = (w as usize, h as usize);
        let [first, second] = &mut self.buffers;
        let (src, dst) = if self.front == 0 { (first, second) } else { (second, first) };
        let src: &[u8] = src;
        let dst: &mut [u8] = dst;

        for y in 0..h {
            for x in 0..w {
                let idx = y * w + x;
                let sum = neighbor_sum(src, w, h, x, y);
                dst[idx] = fade(blend(src[idx] as i32, sum, params.bleed), params);
            }
        }
    }
}

/// Sum of the 8 surrounding pixels; cells past the edge count as 0.
#[inline]
fn neighbor_sum(src: &[u8], w: usize, h: usize, x: usize, y: usize) -> i32 {
    let mut sum = 0;
    for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
        let row = ny * w;
        for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
            if nx != x || ny != y {
                sum += src[row + nx] as i32;
            }
        }
    }
    sum
}

/// Weighted mix of the neighbor average and the center, in SCALE units.
/// Max: SCALE * 8 * 255 before the shift, inside i32.
#[inline]
fn blend(center: i32, neighbor_sum: i32, bleed: i32) -> i32 {
    ((bleed * neighbor_sum) >> 3) + (SCALE - bleed) * center
}

/// Apply exponential then linear decay to a SCALE-unit value; clamp to a pixel.
#[inline]
fn fade(value: i32, params: DecayParams) -> u8 {
    let kept = ((value >> (SCALE_BITS - FRACTION_BITS)) * params.factor) >> FRACTION_BITS;
    ((kept >> SCALE_BITS) - params.linear).clamp(0, 255) as u8
}

/* ---------- Strokes: filled circles and thick lines ---------- */

impl Surface {
    /// Stamp 255 into every cell within distance `radius` of (cx,cy).
    /// Visual: a solid white disc; partially visible when it overlaps an edge.
    pub fn circle(&mut self, cx: i32, cy: i32, radius: u32) {
        let r = radius as i64;
        let r2 = r * r;
        let mut reach = r; // largest dy with dx² + dy² <= r²; shrinks as dx grows

        for dx in 0..=r {
            while dx * dx + reach * reach > r2 {
                reach -= 1;
            }
            for dy in 0..=reach {
                self.stamp(cx as i64 + dx, cy as i64 + dy);
                self.stamp(cx as i64 - dx, cy as i64 + dy);
                self.stamp(cx as i64 + dx, cy as i64 - dy);
                self.stamp(cx as i64 - dx, cy as i64 - dy);
            }
        }
    }

    #[inline]
    fn stamp(&mut self, x: i64, y: i64) {
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.set_clipped(x, y, 255);
        }
    }

    /// Thick line from (x1,y1) to (x2,y2): a circle of `radius` at every point of
    /// the digital line. Ignored if either endpoint is outside the buffer.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, radius: u32) {
        if !self.contains(x1, y1) || !self.contains(x2, y2) {
            return;
        }

        let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
        let (dx, dy) = (x2 - x1, y2 - y1);

        if dx == 0 && dy == 0 {
            self.circle(x1 as i32, y1 as i32, radius);
            return;
        }

        // Step the dominant axis one cell at a time so the stroke has no gaps.
        if dx.abs() >= dy.abs() {
            let step = dx.signum();
            let mut x = x1;
            loop {
                let y = y1 + dy * (x - x1) / dx;
                self.circle(x as i32, y as i32, radius);
                if x == x2 {
                    break;
                }
                x += step;
            }
        } else {
            let step = dy.signum();
            let mut y = y1;
            loop {
                let x = x1 + dx * (y - y1) / dy;
                self.circle(x as i32, y as i32, radius);
                if y == y2 {
                    break;
                }
                y += step;
            }
        }
    }
}
