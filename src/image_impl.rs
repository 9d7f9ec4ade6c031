//! Pixel primitives over `image` buffers
//!
//! Everything downstream works on single-channel `GrayImage` grids. Masks use
//! 255 for ink on a 0 background.

use std::path::Path;

use image::{imageops, DynamicImage, GrayImage, Luma};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Default for Point2d {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Point2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self { width, height }
    }

    /// Scale both sides, rounding to the nearest pixel and never below one.
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |side: u32| ((side as f64 * factor as f64).round() as u32).max(1);
        Self::new(scale(self.width), scale(self.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdType {
    /// `value > thresh` becomes `maxval`, everything else 0.
    Binary,
    /// `value > thresh` becomes 0, everything else `maxval`.
    BinaryInv,
}

pub fn imread<P: AsRef<Path>>(path: P) -> image::ImageResult<DynamicImage> {
    image::open(path)
}

pub fn imwrite<P: AsRef<Path>>(path: P, img: &DynamicImage) -> Result<()> {
    img.save(path)?;
    Ok(())
}

/// Single-channel luma using ITU-R BT.601 weights.
pub fn cvt_gray(src: &DynamicImage) -> GrayImage {
    let rgb = src.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let luma = 0.299 * p[0] as f64 + 0.587 * p[1] as f64 + 0.114 * p[2] as f64;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Bilinear resample to an exact size.
pub fn resize(src: &GrayImage, dsize: Size) -> GrayImage {
    if Size::of(src) == dsize {
        return src.clone();
    }
    imageops::resize(src, dsize.width, dsize.height, imageops::FilterType::Triangle)
}

pub fn threshold(src: &GrayImage, thresh: u8, maxval: u8, kind: ThresholdType) -> GrayImage {
    let mut dst = src.clone();
    for pixel in dst.pixels_mut() {
        let above = pixel[0] > thresh;
        pixel[0] = match (kind, above) {
            (ThresholdType::Binary, true) | (ThresholdType::BinaryInv, false) => maxval,
            _ => 0,
        };
    }
    dst
}

/// Surround `src` with a constant-valued border.
pub fn copy_make_border(
    src: &GrayImage,
    top: u32,
    bottom: u32,
    left: u32,
    right: u32,
    value: u8,
) -> GrayImage {
    let (width, height) = src.dimensions();
    let mut dst = GrayImage::from_pixel(width + left + right, height + top + bottom, Luma([value]));
    imageops::replace(&mut dst, src, left as i64, top as i64);
    dst
}

/// 2x3 matrix rotating by `angle` degrees about `center`.
///
/// Positive angles turn the picture counter-clockwise on screen (y down).
pub fn get_rotation_matrix_2d(center: Point2d, angle: f64, scale: f64) -> [[f64; 3]; 2] {
    let (sin, cos) = angle.to_radians().sin_cos();
    let alpha = scale * cos;
    let beta = scale * sin;
    [
        [alpha, beta, (1.0 - alpha) * center.x - beta * center.y],
        [-beta, alpha, beta * center.x + (1.0 - alpha) * center.y],
    ]
}

/// Affine warp with bilinear interpolation. Samples falling outside `src`
/// read as `border_value`.
pub fn warp_affine(
    src: &GrayImage,
    matrix: &[[f64; 3]; 2],
    dsize: Size,
    border_value: u8,
) -> Result<GrayImage> {
    let m_inv = invert_affine(matrix)?;
    let (m00, m01, m02) = (m_inv[0][0], m_inv[0][1], m_inv[0][2]);
    let (m10, m11, m12) = (m_inv[1][0], m_inv[1][1], m_inv[1][2]);

    let src_cols = src.width() as i64;
    let src_rows = src.height() as i64;
    let border = border_value as f64;
    let sample = |x: i64, y: i64| -> f64 {
        if x >= 0 && x < src_cols && y >= 0 && y < src_rows {
            src.get_pixel(x as u32, y as u32)[0] as f64
        } else {
            border
        }
    };

    let mut out = GrayImage::new(dsize.width, dsize.height);
    for y in 0..dsize.height {
        let y_f = y as f64;
        let m01y = m01 * y_f;
        let m11y = m11 * y_f;

        for x in 0..dsize.width {
            let x_f = x as f64;
            let src_x = m00 * x_f + m01y + m02;
            let src_y = m10 * x_f + m11y + m12;

            let x0 = src_x.floor() as i64;
            let y0 = src_y.floor() as i64;
            // Entirely outside, including the interpolation skirt.
            if x0 + 1 < 0 || y0 + 1 < 0 || x0 >= src_cols || y0 >= src_rows {
                out.put_pixel(x, y, Luma([border_value]));
                continue;
            }

            let fx = src_x - x0 as f64;
            let fy = src_y - y0 as f64;
            let value = (1.0 - fx) * (1.0 - fy) * sample(x0, y0)
                + fx * (1.0 - fy) * sample(x0 + 1, y0)
                + (1.0 - fx) * fy * sample(x0, y0 + 1)
                + fx * fy * sample(x0 + 1, y0 + 1);

            out.put_pixel(x, y, Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    Ok(out)
}

fn invert_affine(m: &[[f64; 3]; 2]) -> Result<[[f64; 3]; 2]> {
    use nalgebra::Matrix3;

    let mat = Matrix3::new(
        m[0][0], m[0][1], m[0][2],
        m[1][0], m[1][1], m[1][2],
        0.0, 0.0, 1.0,
    );

    let inv = mat.try_inverse().ok_or("Matrix is not invertible")?;

    Ok([
        [inv[(0, 0)], inv[(0, 1)], inv[(0, 2)]],
        [inv[(1, 0)], inv[(1, 1)], inv[(1, 2)]],
    ])
}

/// Dilate a binary mask with a flat `width`x1 rectangle anchored at its
/// middle. Pixels near the edges only consider in-bounds neighbours.
pub fn dilate_horizontal(src: &GrayImage, width: u32) -> GrayImage {
    let (cols, rows) = src.dimensions();
    let mut dst = GrayImage::new(cols, rows);
    if cols == 0 || width == 0 {
        return dst;
    }

    let anchor = (width / 2) as i64;
    let reach = width as i64 - 1 - anchor;
    let mut prefix = vec![0u32; cols as usize + 1];

    for y in 0..rows {
        for x in 0..cols {
            let ink = (src.get_pixel(x, y)[0] > 0) as u32;
            prefix[x as usize + 1] = prefix[x as usize] + ink;
        }
        for x in 0..cols as i64 {
            let lo = (x - anchor).max(0) as usize;
            let hi = (x + reach).min(cols as i64 - 1) as usize;
            if prefix[hi + 1] > prefix[lo] {
                dst.put_pixel(x as u32, y, Luma([255]));
            }
        }
    }

    dst
}

/// Number of ink (non-zero) pixels.
pub fn ink_mass(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] > 0).count() as u64
}

/// Ink pixels per row, top to bottom.
pub fn row_profile(mask: &GrayImage) -> Vec<u32> {
    mask.rows()
        .map(|row| row.filter(|p| p[0] > 0).count() as u32)
        .collect()
}

/// Spatial moments of a binary image, treating every non-zero pixel as 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    pub fn binary(mask: &GrayImage) -> Self {
        let mut moments = Self::default();
        for (x, y, p) in mask.enumerate_pixels() {
            if p[0] > 0 {
                moments.m00 += 1.0;
                moments.m10 += x as f64;
                moments.m01 += y as f64;
            }
        }
        moments
    }

    /// First-moment centroid, or `None` for an image without ink.
    pub fn centroid(&self) -> Option<Point2d> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point2d::new(self.m10 / self.m00, self.m01 / self.m00))
    }
}
