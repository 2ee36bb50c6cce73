//! Model-vs-metric comparison chart rendered straight into a PNG.

use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use tracing::info;

use crate::error::Result;
use crate::metrics::EvaluationRecord;

const SCALE: u32 = 3;
const LEFT: u32 = 240;
const TOP: u32 = 60;
const CELL_W: u32 = 130;
const CELL_H: u32 = 50;
const BOTTOM: u32 = 40;
const BAR_GAP: u32 = 20;
const BAR_W: u32 = 20;
const RIGHT: u32 = 20;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Anchor colours of a viridis-like ramp, dark to light.
const RAMP: [[f64; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

/// Writes the chart to `path`, replacing any existing file.
pub fn render(records: &[EvaluationRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    heatmap_image(records).save(path)?;
    info!("Saved heatmap: {:?}", path);
    Ok(())
}

/// One row per model, one column per metric, each cell annotated with its
/// value to three decimals.
pub fn heatmap_image(records: &[EvaluationRecord]) -> RgbImage {
    let cols = EvaluationRecord::METRICS.len() as u32;
    let rows = records.len() as u32;
    let width = LEFT + cols * CELL_W + BAR_GAP + BAR_W + RIGHT;
    let height = TOP + rows * CELL_H + BOTTOM;
    let mut img = RgbImage::from_pixel(width, height, WHITE);

    draw_text(&mut img, 10, 20, "MODEL VS METRICS - SMS SPAM CLASSIFICATION", BLACK);

    let values: Vec<f64> = records.iter().flat_map(|r| r.values()).collect();
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let normalise = |v: f64| if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };

    for (r, record) in records.iter().enumerate() {
        let y0 = TOP + r as u32 * CELL_H;
        let label_y = y0 + (CELL_H - glyph_height()) / 2;
        let label_x = LEFT.saturating_sub(text_width(record.model.as_str()) + 10);
        draw_text(&mut img, label_x, label_y, &record.model, BLACK);

        for (c, value) in record.values().into_iter().enumerate() {
            let x0 = LEFT + c as u32 * CELL_W;
            let t = normalise(value);
            fill_rect(&mut img, x0, y0, CELL_W, CELL_H, ramp(t));

            let text = format!("{value:.3}");
            let ink = if t < 0.6 { WHITE } else { BLACK };
            let tx = x0 + (CELL_W - text_width(&text)) / 2;
            draw_text(&mut img, tx, label_y, &text, ink);
        }
    }

    let axis_y = TOP + rows * CELL_H + 10;
    for (c, name) in EvaluationRecord::METRICS.iter().enumerate() {
        let x0 = LEFT + c as u32 * CELL_W;
        draw_text(&mut img, x0 + (CELL_W - text_width(name)) / 2, axis_y, name, BLACK);
    }

    let bar_x = LEFT + cols * CELL_W + BAR_GAP;
    let bar_h = rows * CELL_H;
    for dy in 0..bar_h {
        let t = 1.0 - dy as f64 / bar_h.max(1) as f64;
        fill_rect(&mut img, bar_x, TOP + dy, BAR_W, 1, ramp(t));
    }

    img
}

fn ramp(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0) * (RAMP.len() - 1) as f64;
    let i = (t.floor() as usize).min(RAMP.len() - 2);
    let frac = t - i as f64;
    let (a, b) = (RAMP[i], RAMP[i + 1]);
    let mix = |k: usize| (a[k] + (b[k] - a[k]) * frac).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

fn glyph_height() -> u32 {
    5 * SCALE
}

fn text_width(text: &str) -> u32 {
    let n = text.chars().count() as u32;
    (n * 4 * SCALE).saturating_sub(SCALE)
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    for (n, ch) in text.chars().enumerate() {
        let gx = x + n as u32 * 4 * SCALE;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..3u32 {
                if bits & (0b100 >> col) != 0 {
                    fill_rect(
                        img,
                        gx + col * SCALE,
                        y + row as u32 * SCALE,
                        SCALE,
                        SCALE,
                        color,
                    );
                }
            }
        }
    }
}

/// 3x5 bitmap glyphs, one byte per row, most significant of the low three
/// bits on the left. Lowercase maps to uppercase; unknown characters are blank.
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b110, 0b001, 0b010, 0b100, 0b111],
        '3' => [0b110, 0b001, 0b010, 0b001, 0b110],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b110, 0b001, 0b110],
        '6' => [0b011, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b110],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => [0; 5],
    }
}
