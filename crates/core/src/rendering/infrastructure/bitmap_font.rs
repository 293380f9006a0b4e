//! Minimal 5×7 bitmap font for overlay labels.
//!
//! Covers the letters used by emotion labels (case-insensitive) plus space.
//! Unknown characters advance the cursor without drawing.

use crate::shared::frame::Frame;

pub const GLYPH_WIDTH: i32 = 5;
pub const GLYPH_HEIGHT: i32 = 7;
/// Horizontal advance per character, in unscaled pixels.
const ADVANCE: i32 = GLYPH_WIDTH + 1;

/// Rows top to bottom; bit 4 is the leftmost column.
const LETTERS: [[u8; 7]; 26] = [
    [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001], // a
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110], // b
    [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110], // c
    [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110], // d
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111], // e
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000], // f
    [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111], // g
    [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001], // h
    [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110], // i
    [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100], // j
    [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001], // k
    [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111], // l
    [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001], // m
    [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001], // n
    [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110], // o
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000], // p
    [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101], // q
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001], // r
    [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110], // s
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100], // t
    [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110], // u
    [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100], // v
    [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010], // w
    [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001], // x
    [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100], // y
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111], // z
];

fn glyph(c: char) -> Option<&'static [u8; 7]> {
    let lower = c.to_ascii_lowercase();
    lower
        .is_ascii_lowercase()
        .then(|| &LETTERS[(lower as u8 - b'a') as usize])
}

/// Rendered `(width, height)` of `text` at `scale`.
pub fn text_size(text: &str, scale: i32) -> (i32, i32) {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        return (0, 0);
    }
    ((chars * ADVANCE - 1) * scale, GLYPH_HEIGHT * scale)
}

/// Draws `text` with its bottom edge on row `baseline - 1`, starting at
/// column `x`. Pixels outside the frame are skipped.
pub fn draw_text(frame: &mut Frame, text: &str, x: i32, baseline: i32, color: [u8; 3], scale: i32) {
    let scale = scale.max(1);
    let top = baseline - GLYPH_HEIGHT * scale;
    let mut cursor = x;

    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let px = cursor + col * scale;
                    let py = top + row as i32 * scale;
                    fill_block(frame, px, py, scale, color);
                }
            }
        }
        cursor += ADVANCE * scale;
    }
}

fn fill_block(frame: &mut Frame, x: i32, y: i32, size: i32, color: [u8; 3]) {
    for py in y..y + size {
        for px in x..x + size {
            put_pixel(frame, px, py, color);
        }
    }
}

/// Writes one RGB pixel if `(x, y)` lies inside the frame.
pub fn put_pixel(frame: &mut Frame, x: i32, y: i32, color: [u8; 3]) {
    if x < 0 || y < 0 || x >= frame.width() as i32 || y >= frame.height() as i32 {
        return;
    }
    let channels = frame.channels() as usize;
    let offset = (y as usize * frame.width() as usize + x as usize) * channels;
    let data = frame.data_mut();
    data[offset..offset + 3].copy_from_slice(&color);
}
