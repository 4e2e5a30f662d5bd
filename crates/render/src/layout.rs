//! Text layout: turns an outline into positioned lines grouped by page.
//!
//! Widths are estimated from an average Helvetica glyph width, which is
//! close enough for wrapping prose.

use docforge_core::DocumentOutline;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 56.0;

const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub font: Font,
    pub size: f32,
    /// Space consumed below the line
    pub leading: f32,
    pub centered: bool,
}

impl Style {
    const TITLE: Style = Style { font: Font::Bold, size: 16.0, leading: 20.0, centered: true };
    const HEADING: Style = Style { font: Font::Bold, size: 12.0, leading: 16.0, centered: false };
    const BODY: Style = Style { font: Font::Regular, size: 11.0, leading: 14.0, centered: false };
    const REFERENCE: Style = Style { font: Font::Regular, size: 10.0, leading: 13.0, centered: false };
}

/// One line of text with its final position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub style: Style,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Line(String, Style),
    Gap(f32),
}

/// Replace characters outside Latin-1 with `?` so the standard fonts can
/// show them.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\t' => ' ',
            c if (c as u32) <= 0xFF => c,
            _ => '?',
        })
        .collect()
}

/// Latin-1 bytes for a sanitized string.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
        .collect()
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_WIDTH
}

/// Greedy word wrap to `max_width` points. Words longer than a line are
/// split hard.
pub fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * AVG_GLYPH_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn push_wrapped(blocks: &mut Vec<Block>, text: &str, style: Style) {
    let width = PAGE_WIDTH - 2.0 * MARGIN;
    for line in wrap(&sanitize(text), style.size, width) {
        blocks.push(Block::Line(line, style));
    }
}

fn blocks(outline: &DocumentOutline) -> Vec<Block> {
    let mut blocks = Vec::new();
    push_wrapped(&mut blocks, &outline.title, Style::TITLE);
    blocks.push(Block::Gap(12.0));

    for section in &outline.sections {
        if !section.title.trim().is_empty() {
            push_wrapped(&mut blocks, &section.title, Style::HEADING);
            blocks.push(Block::Gap(2.0));
        }
        for paragraph in section.body.split("\n\n").filter(|p| !p.trim().is_empty()) {
            push_wrapped(&mut blocks, paragraph, Style::BODY);
            blocks.push(Block::Gap(6.0));
        }
        blocks.push(Block::Gap(4.0));
    }

    if !outline.references.is_empty() {
        push_wrapped(&mut blocks, "References", Style::HEADING);
        blocks.push(Block::Gap(2.0));
        for (i, reference) in outline.references.iter().enumerate() {
            push_wrapped(&mut blocks, &format!("{}. {}", i + 1, reference), Style::REFERENCE);
            blocks.push(Block::Gap(2.0));
        }
    }

    blocks
}

/// Lay the outline out into pages of placed lines, in reading order.
pub fn paginate(outline: &DocumentOutline) -> Vec<Vec<PlacedLine>> {
    let top = PAGE_HEIGHT - MARGIN;
    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = top;

    for block in blocks(outline) {
        match block {
            Block::Gap(h) => y -= h,
            Block::Line(text, style) => {
                if y - style.leading < MARGIN {
                    pages.push(Vec::new());
                    y = top;
                }
                y -= style.leading;
                let x = if style.centered {
                    ((PAGE_WIDTH - text_width(&text, style.size)) / 2.0).max(MARGIN)
                } else {
                    MARGIN
                };
                if let Some(page) = pages.last_mut() {
                    page.push(PlacedLine { text, style, x, y });
                }
            }
        }
    }

    pages
}
