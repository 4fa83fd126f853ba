//! Word wrapping by terminal display width.
//!
//! The transcript is pre-wrapped so the viewport knows its exact line count
//! and can stay pinned to the bottom. Breaks happen at spaces; a word wider
//! than the line is split between characters. Spaces inside a line are kept,
//! the one at a break is dropped.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|line| wrap_line(line.trim_end_matches('\r'), width))
        .collect()
}

pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    let mut wrapped = false;

    for (i, word) in line.split(' ').enumerate() {
        let word_width = UnicodeWidthStr::width(word);
        let separator = if i == 0 || (wrapped && current.is_empty()) {
            0
        } else {
            1
        };

        if current_width + separator + word_width > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
            wrapped = true;
        } else if separator == 1 {
            current.push(' ');
            current_width += 1;
        }

        for ch in word.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width + ch_width > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
                wrapped = true;
            }
            current.push(ch);
            current_width += ch_width;
        }
    }

    lines.push(current);
    lines
}
