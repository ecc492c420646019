//! Level bar on the 5x5 LED matrix.

use crate::utils::error::ParameterError;

pub const MATRIX_SIZE: usize = 5;
/// Brightness of a lit pixel (0..=9).
pub const LEVEL_BRIGHTNESS: u8 = 9;

/// 5x5 LED matrix on the controller board.
pub trait MatrixDisplay {
    fn clear(&mut self);

    fn set_pixel(
        &mut self,
        x: usize,
        y: usize,
        brightness: u8,
    );
}

/// Number of matrix pixels that represent `value` out of `max`.
///
/// Values above `max` saturate at a full matrix, negative values light
/// nothing.
pub fn level_pixels(
    value: f32,
    max: f32,
) -> Result<usize, ParameterError> {
    if !max.is_finite() || max <= 0.0 {
        return Err(ParameterError::LevelMaximum(max));
    }
    let total = (MATRIX_SIZE * MATRIX_SIZE) as f32;
    let lit = libm::floorf(value.min(max) / max * total);
    if lit.is_nan() || lit <= 0.0 {
        return Ok(0);
    }
    Ok(lit as usize)
}

/// Clear `display` and light the level bar row by row from the top left.
/// Returns the number of lit pixels.
pub fn show_level<M: MatrixDisplay>(
    display: &mut M,
    value: f32,
    max: f32,
) -> Result<usize, ParameterError> {
    let lit = level_pixels(value, max)?;
    display.clear();
    for i in 0..lit {
        display.set_pixel(i % MATRIX_SIZE, i / MATRIX_SIZE, LEVEL_BRIGHTNESS);
    }
    Ok(lit)
}
