//! Pixel format conversions inserted by the graph between mismatching filters

use crate::error::FilterError;
use crate::filter::Stage;
use crate::unit::{DataType, MediaUnit};

struct Conversion {
    from: DataType,
    to: DataType,
    create: fn() -> Box<dyn Stage>,
}

static CONVERSIONS: &[Conversion] = &[
    Conversion {
        from: DataType::Rgb32Video,
        to: DataType::Yuv420Video,
        create: || Box::new(RgbToYuv),
    },
    Conversion {
        from: DataType::Yuv420Video,
        to: DataType::Rgb32Video,
        create: || Box::new(YuvToRgb),
    },
];

/// Create the stage converting `from` into `to`, if one is known
pub fn find_conversion(from: DataType, to: DataType) -> Option<Box<dyn Stage>> {
    CONVERSIONS
        .iter()
        .find(|conversion| conversion.from == from && conversion.to == to)
        .map(|conversion| (conversion.create)())
}

fn chroma_size(width: usize, height: usize) -> (usize, usize) {
    (width.div_ceil(2), height.div_ceil(2))
}

fn rgb32_len(width: usize, height: usize) -> Option<usize> {
    width.checked_mul(height)?.checked_mul(4)
}

fn i420_len(width: usize, height: usize) -> Option<usize> {
    let (cw, ch) = chroma_size(width, height);
    let chroma = cw.checked_mul(ch)?.checked_mul(2)?;
    width.checked_mul(height)?.checked_add(chroma)
}

/// Make sure `unit` carries exactly `expected` bytes of a `format` frame
fn check_size(
    unit: &MediaUnit,
    format: &str,
    expected: Option<usize>,
) -> Result<(), FilterError> {
    let Some(expected) = expected else {
        return Err(FilterError::Process(format!(
            "{}x{} {format} frame is too large",
            unit.width, unit.height
        )));
    };

    if unit.payload.len() != expected {
        return Err(FilterError::Process(format!(
            "expected {}x{} {format} frame, got {} bytes",
            unit.width,
            unit.height,
            unit.payload.len()
        )));
    }

    Ok(())
}

fn clamp(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Interleaved RGBX to planar I420 using BT.601 limited range coefficients
///
/// Chroma is computed from the average of each 2x2 pixel block.
#[derive(Debug, Default)]
pub struct RgbToYuv;

impl Stage for RgbToYuv {
    fn name(&self) -> &str {
        "rgb-to-yuv"
    }

    fn input_type(&self) -> DataType {
        DataType::Rgb32Video
    }

    fn output_type(&self) -> DataType {
        DataType::Yuv420Video
    }

    fn process(&mut self, unit: MediaUnit) -> Result<Vec<MediaUnit>, FilterError> {
        let width = unit.width as usize;
        let height = unit.height as usize;

        check_size(&unit, "RGB32", rgb32_len(width, height))?;

        // the payload's size bounds every product below
        let (cw, ch) = chroma_size(width, height);
        let mut out = vec![0u8; width * height + 2 * cw * ch];
        let (y_plane, chroma) = out.split_at_mut(width * height);
        let (u_plane, v_plane) = chroma.split_at_mut(cw * ch);

        let pixel = |x: usize, y: usize| {
            let i = (y * width + x) * 4;
            let p = &unit.payload[i..i + 3];
            [i32::from(p[0]), i32::from(p[1]), i32::from(p[2])]
        };

        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = pixel(x, y);
                y_plane[y * width + x] = clamp(((66 * r + 129 * g + 25 * b + 128) >> 8) + 16);
            }
        }

        for cy in 0..ch {
            for cx in 0..cw {
                let mut sum = [0i32; 3];
                let mut n = 0;

                for y in (cy * 2)..(cy * 2 + 2).min(height) {
                    for x in (cx * 2)..(cx * 2 + 2).min(width) {
                        let p = pixel(x, y);
                        sum[0] += p[0];
                        sum[1] += p[1];
                        sum[2] += p[2];
                        n += 1;
                    }
                }

                let [r, g, b] = sum.map(|c| c / n);

                u_plane[cy * cw + cx] = clamp(((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128);
                v_plane[cy * cw + cx] = clamp(((112 * r - 94 * g - 18 * b + 128) >> 8) + 128);
            }
        }

        Ok(vec![unit.with_payload(DataType::Yuv420Video, out)])
    }
}

/// Planar I420 to interleaved RGBX, inverse of [`RgbToYuv`]
#[derive(Debug, Default)]
pub struct YuvToRgb;

impl Stage for YuvToRgb {
    fn name(&self) -> &str {
        "yuv-to-rgb"
    }

    fn input_type(&self) -> DataType {
        DataType::Yuv420Video
    }

    fn output_type(&self) -> DataType {
        DataType::Rgb32Video
    }

    fn process(&mut self, unit: MediaUnit) -> Result<Vec<MediaUnit>, FilterError> {
        let width = unit.width as usize;
        let height = unit.height as usize;

        check_size(&unit, "I420", i420_len(width, height))?;

        let (cw, ch) = chroma_size(width, height);
        let (y_plane, chroma) = unit.payload.split_at(width * height);
        let (u_plane, v_plane) = chroma.split_at(cw * ch);

        let mut out = vec![0u8; width * height * 4];

        for y in 0..height {
            for x in 0..width {
                let c = i32::from(y_plane[y * width + x]) - 16;
                let d = i32::from(u_plane[(y / 2) * cw + x / 2]) - 128;
                let e = i32::from(v_plane[(y / 2) * cw + x / 2]) - 128;

                let i = (y * width + x) * 4;
                out[i] = clamp((298 * c + 409 * e + 128) >> 8);
                out[i + 1] = clamp((298 * c - 100 * d - 208 * e + 128) >> 8);
                out[i + 2] = clamp((298 * c + 516 * d + 128) >> 8);
                out[i + 3] = 255;
            }
        }

        Ok(vec![unit.with_payload(DataType::Rgb32Video, out)])
    }
}
