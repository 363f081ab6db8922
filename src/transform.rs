//! CPU reference warp
//!
//! Resamples a source image through the output-UV to source-UV matrix the
//! same way the fragment shader does: for each output pixel, map its UV with
//! the perspective divide, then sample the source bilinearly. Used for
//! previews and to check shader output without a GPU context.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::homography::Homography;

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Warp `src` into a `width x height` output.
///
/// `y_up` must match the window the homography was built with: it decides
/// how buffer rows map to UV on both textures. Source UVs outside `[0, 1]`
/// are clamped when `clamp_uv` is set and rendered transparent otherwise.
pub fn warp_rgba(
    src: &RgbaImage,
    homography: &Homography,
    width: u32,
    height: u32,
    y_up: bool,
    clamp_uv: bool,
) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
        return out;
    }

    let row_len = width as usize * 4;
    out.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(row, pixels)| {
            let v_img = (row as f64 + 0.5) / height as f64;
            let v = if y_up { 1.0 - v_img } else { v_img };

            for (col, pixel) in pixels.chunks_exact_mut(4).enumerate() {
                let u = (col as f64 + 0.5) / width as f64;
                pixel.copy_from_slice(&sample_uv(src, homography, u, v, y_up, clamp_uv));
            }
        });

    out
}

fn sample_uv(
    src: &RgbaImage,
    homography: &Homography,
    u: f64,
    v: f64,
    y_up: bool,
    clamp_uv: bool,
) -> [u8; 4] {
    let mapped = homography.map_point(u, v);
    if !mapped.valid {
        return TRANSPARENT;
    }

    let (mut su, mut sv) = (mapped.u, mapped.v);
    if clamp_uv {
        su = su.clamp(0.0, 1.0);
        sv = sv.clamp(0.0, 1.0);
    } else if !(0.0..=1.0).contains(&su) || !(0.0..=1.0).contains(&sv) {
        return TRANSPARENT;
    }

    let sv_img = if y_up { 1.0 - sv } else { sv };
    // UV addresses pixel edges; bilinear sampling works on pixel centers
    let x = su * src.width() as f64 - 0.5;
    let y = sv_img * src.height() as f64 - 0.5;
    bilinear_sample(src, x, y)
}

/// Bilinear interpolation with edge clamping
#[inline]
fn bilinear_sample(src: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let max_x = (src.width() - 1) as f64;
    let max_y = (src.height() - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut result = [0u8; 4];
    for c in 0..4 {
        let value = p00[c] as f64 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f64 * fx * (1.0 - fy)
            + p01[c] as f64 * (1.0 - fx) * fy
            + p11[c] as f64 * fx * fy;

        result[c] = value.round().clamp(0.0, 255.0) as u8;
    }

    result
}

/// Black and white checkerboard test pattern with `square` pixel cells
pub fn checkerboard(width: u32, height: u32, square: u32) -> RgbaImage {
    let square = square.max(1);
    RgbaImage::from_fn(width, height, |x, y| {
        if ((x / square) + (y / square)) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}
