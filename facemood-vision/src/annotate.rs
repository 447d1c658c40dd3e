use image::{Rgb, RgbImage};

use crate::types::{BoundingBox, TickOutcome, TickReport};

const CANDIDATE: Rgb<u8> = Rgb([160, 160, 160]);
const PRIMARY: Rgb<u8> = Rgb([0, 255, 136]);
const LABEL_TEXT: Rgb<u8> = Rgb([0, 26, 18]);

const GLYPH_SCALE: u32 = 2;
const GLYPH_ADVANCE: u32 = 4 * GLYPH_SCALE;
const BANNER_PAD: u32 = 4;
const BANNER_GAP: u32 = 4;

/// Copy of the frame with every candidate outlined, the primary face
/// highlighted and, once classified, its label drawn on a banner above it.
pub fn annotate(frame: &RgbImage, report: &TickReport) -> RgbImage {
    let mut out = frame.clone();
    for candidate in &report.candidates {
        if Some(*candidate) != report.primary {
            draw_rect(&mut out, candidate, 1, CANDIDATE);
        }
    }
    if let Some(primary) = &report.primary {
        draw_rect(&mut out, primary, 3, PRIMARY);
        if let TickOutcome::Classified(result) = &report.outcome {
            draw_banner(&mut out, primary, &result.to_string());
        }
    }
    out
}

/// Outline `rect` with a border `thickness` pixels wide, drawn inward.
pub fn draw_rect(img: &mut RgbImage, rect: &BoundingBox, thickness: u32, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let x_end = rect.x.saturating_add(rect.width).min(w);
    let y_end = rect.y.saturating_add(rect.height).min(h);
    if rect.x >= x_end || rect.y >= y_end {
        return;
    }

    for y in rect.y..y_end {
        for x in rect.x..x_end {
            let edge = x < rect.x.saturating_add(thickness)
                || y < rect.y.saturating_add(thickness)
                || x.saturating_add(thickness) >= x_end
                || y.saturating_add(thickness) >= y_end;
            if edge {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Filled label box sitting just above `anchor`, pinned to the top edge
/// when there is no room.
fn draw_banner(img: &mut RgbImage, anchor: &BoundingBox, text: &str) {
    let chars = text.chars().count() as u32;
    let width = BANNER_PAD * 2 + (chars * GLYPH_ADVANCE).saturating_sub(GLYPH_SCALE);
    let height = BANNER_PAD * 2 + 5 * GLYPH_SCALE;
    let banner = BoundingBox::new(
        anchor.x,
        anchor.y.saturating_sub(height + BANNER_GAP),
        width,
        height,
    );
    fill_rect(img, &banner, PRIMARY);
    draw_text(
        img,
        banner.x.saturating_add(BANNER_PAD),
        banner.y.saturating_add(BANNER_PAD),
        text,
        LABEL_TEXT,
    );
}

fn fill_rect(img: &mut RgbImage, rect: &BoundingBox, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    for y in rect.y..rect.y.saturating_add(rect.height).min(h) {
        for x in rect.x..rect.x.saturating_add(rect.width).min(w) {
            img.put_pixel(x, y, color);
        }
    }
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let mut cursor = x;
    for ch in text.chars() {
        draw_char(img, cursor, y, ch, color);
        cursor = cursor.saturating_add(GLYPH_ADVANCE);
    }
}

fn draw_char(img: &mut RgbImage, x: u32, y: u32, ch: char, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    for (row, bits) in glyph(ch).iter().enumerate() {
        for col in 0..3u32 {
            if (bits >> (2 - col)) & 1 == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let px = x.saturating_add(col * GLYPH_SCALE + dx);
                    let py = y.saturating_add(row as u32 * GLYPH_SCALE + dy);
                    if px < w && py < h {
                        img.put_pixel(px, py, color);
                    }
                }
            }
        }
    }
}

/// 3x5 bitmap, one row per entry, most significant bit on the left.
/// Letters are drawn upper case; anything unknown is blank.
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
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        _ => [0; 5],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassificationResult;

    fn happy() -> TickOutcome {
        TickOutcome::Classified(ClassificationResult {
            label: "happy".into(),
            index: 0,
            confidence: 0.4683,
            distribution: vec![0.4683, 0.4683, 0.0634],
        })
    }

    #[test]
    fn test_outline_only() {
        let frame = RgbImage::new(50, 50);
        let primary = BoundingBox::new(10, 10, 20, 20);
        let other = BoundingBox::new(35, 35, 10, 10);
        let report = TickReport {
            frame_index: 0,
            candidates: vec![other, primary],
            primary: Some(primary),
            outcome: TickOutcome::NoFace,
        };

        let out = annotate(&frame, &report);
        assert_eq!(*out.get_pixel(10, 10), PRIMARY);
        assert_eq!(*out.get_pixel(12, 20), PRIMARY);
        assert_eq!(*out.get_pixel(29, 29), PRIMARY);
        assert_eq!(*out.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(35, 40), CANDIDATE);
        assert_eq!(*out.get_pixel(40, 40), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(10, 10), Rgb([0, 0, 0]));
        // no banner without a classification
        assert_eq!(*out.get_pixel(10, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_label_banner() {
        let frame = RgbImage::new(160, 100);
        let primary = BoundingBox::new(20, 40, 40, 40);
        let report = TickReport {
            frame_index: 0,
            candidates: vec![primary],
            primary: Some(primary),
            outcome: happy(),
        };

        let out = annotate(&frame, &report);
        // "happy 46.8%": 11 glyphs, banner 4 + 86 + 4 wide and 18 high,
        // ending 4px above the box.
        let top = 40 - 18 - 4;
        assert_eq!(*out.get_pixel(20, top), PRIMARY);
        assert_eq!(*out.get_pixel(20 + 93, top + 17), PRIMARY);
        assert_eq!(*out.get_pixel(20 + 94, top), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(20, top - 1), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(20, 40 - 2), Rgb([0, 0, 0]));
        // top-left stroke of the 'H'
        assert_eq!(*out.get_pixel(24, top + 4), LABEL_TEXT);
        assert_eq!(*out.get_pixel(26, top + 4), PRIMARY);
    }

    #[test]
    fn test_banner_clamped_to_top() {
        let frame = RgbImage::new(80, 60);
        let primary = BoundingBox::new(5, 6, 30, 30);
        let report = TickReport {
            frame_index: 0,
            candidates: vec![primary],
            primary: Some(primary),
            outcome: happy(),
        };

        let out = annotate(&frame, &report);
        assert_eq!(*out.get_pixel(5, 0), PRIMARY);
        assert_eq!(*out.get_pixel(9, 4), LABEL_TEXT);
        // banner runs off the right edge without panicking
        assert_eq!(*out.get_pixel(79, 0), PRIMARY);
    }

    #[test]
    fn test_huge_rect_does_not_overflow() {
        let mut img = RgbImage::new(20, 20);
        let rect = BoundingBox::new(u32::MAX - 2, 5, 10, 10);
        draw_rect(&mut img, &rect, 3, PRIMARY);
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));

        let tall = BoundingBox::new(2, 2, u32::MAX, u32::MAX);
        draw_rect(&mut img, &tall, 1, PRIMARY);
        assert_eq!(*img.get_pixel(2, 2), PRIMARY);
        assert_eq!(*img.get_pixel(19, 19), PRIMARY);
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
    }
}
