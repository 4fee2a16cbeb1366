//! CPU box blur over RGBA8 pixel buffers.

/// Bytes per RGBA8 pixel.
const CHANNELS: usize = 4;

/// Blur `pixels` in place with a square box of side `2 * radius + 1`.
///
/// Samples outside the image reuse the nearest edge pixel. Every channel,
/// alpha included, becomes the integer sum over the window divided by the
/// window area, truncated. A radius of zero, or an empty image, leaves the
/// buffer untouched.
///
/// The window sum is accumulated as a horizontal pass into `u32` row sums
/// followed by a vertical pass over those sums. Both passes are exact, so the
/// result matches a direct per-pixel 2D average.
///
/// # Panics
///
/// Panics if `pixels.len() != width * height * 4`.
pub fn box_blur(pixels: &mut [u8], width: usize, height: usize, radius: u32) {
    assert_eq!(
        pixels.len(),
        width * height * CHANNELS,
        "pixel buffer does not match {width}x{height} RGBA"
    );
    if radius == 0 || width == 0 || height == 0 {
        return;
    }

    let r = radius as usize;
    let side = 2 * radius + 1;
    let area = side * side;

    // Horizontal pass: row_sums[y][x][c] = sum over dx of p[y][clamp(x+dx)][c].
    let mut row_sums = vec![0u32; pixels.len()];
    for y in 0..height {
        let row = &pixels[y * width * CHANNELS..(y + 1) * width * CHANNELS];
        let sums = &mut row_sums[y * width * CHANNELS..(y + 1) * width * CHANNELS];
        for x in 0..width {
            let mut acc = [0u32; CHANNELS];
            for d in 0..=2 * r {
                let xx = window_index(x, d, r, width);
                for (c, sum) in acc.iter_mut().enumerate() {
                    *sum += u32::from(row[xx * CHANNELS + c]);
                }
            }
            sums[x * CHANNELS..(x + 1) * CHANNELS].copy_from_slice(&acc);
        }
    }

    // Vertical pass over the row sums, then one truncating division.
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0u32; CHANNELS];
            for d in 0..=2 * r {
                let yy = window_index(y, d, r, height);
                let base = (yy * width + x) * CHANNELS;
                for (c, sum) in acc.iter_mut().enumerate() {
                    *sum += row_sums[base + c];
                }
            }
            let dst = (y * width + x) * CHANNELS;
            for (c, sum) in acc.iter().enumerate() {
                // An average of u8 samples always fits in a u8.
                #[expect(clippy::cast_possible_truncation)]
                let average = (sum / area) as u8;
                pixels[dst + c] = average;
            }
        }
    }
}

/// Index of the `d`-th sample (of `2r + 1`) in the window centered on `pos`,
/// clamped into `0..len`.
fn window_index(pos: usize, d: usize, r: usize, len: usize) -> usize {
    (pos + d).saturating_sub(r).min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: usize, height: usize) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(width * height * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                pixels.extend_from_slice(&[v, v / 2, 255 - v, 255]);
            }
        }
        pixels
    }

    #[test]
    fn zero_radius_is_identity() {
        let original = checkerboard(5, 3);
        let mut pixels = original.clone();
        box_blur(&mut pixels, 5, 3, 0);
        assert_eq!(pixels, original);
    }

    #[test]
    fn uniform_field_is_fixed_point() {
        let original: Vec<u8> = [12, 200, 77, 255].repeat(16);
        let mut pixels = original.clone();
        box_blur(&mut pixels, 4, 4, 1);
        assert_eq!(pixels, original);
    }

    #[test]
    fn edges_clamp_and_division_truncates() {
        // 2x1 image: left pixel 0, right pixel 100 in every channel.
        let mut pixels = vec![0, 0, 0, 0, 100, 100, 100, 100];
        box_blur(&mut pixels, 2, 1, 1);

        // Left: columns {0, 0, 1} over three clamped rows = 300 / 9.
        assert_eq!(&pixels[..4], &[33, 33, 33, 33]);
        // Right: columns {0, 1, 1} over three clamped rows = 600 / 9.
        assert_eq!(&pixels[4..], &[66, 66, 66, 66]);
    }

    #[test]
    fn matches_direct_average() {
        let (width, height, radius) = (7usize, 5usize, 2u32);
        let original = checkerboard(width, height);
        let mut pixels = original.clone();
        box_blur(&mut pixels, width, height, radius);

        let r = radius as isize;
        let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;
        for y in 0..height {
            for x in 0..width {
                for c in 0..CHANNELS {
                    let mut sum = 0u32;
                    for dy in -r..=r {
                        for dx in -r..=r {
                            let yy = clamp(y as isize + dy, height);
                            let xx = clamp(x as isize + dx, width);
                            sum += u32::from(original[(yy * width + xx) * CHANNELS + c]);
                        }
                    }
                    let expected = sum / ((2 * radius + 1) * (2 * radius + 1));
                    assert_eq!(u32::from(pixels[(y * width + x) * CHANNELS + c]), expected);
                }
            }
        }
    }

    #[test]
    fn radius_larger_than_image() {
        let mut pixels = vec![0, 0, 0, 0, 90, 90, 90, 90];
        box_blur(&mut pixels, 1, 2, 10);
        // Column clamps to the single pixel; rows split 11 top, 10 bottom of 21.
        assert_eq!(&pixels[..4], &[42, 42, 42, 42]);
    }

    #[test]
    #[should_panic(expected = "pixel buffer does not match")]
    fn size_mismatch_panics() {
        let mut pixels = vec![0u8; 7];
        box_blur(&mut pixels, 2, 1, 1);
    }
}
