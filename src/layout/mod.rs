//! Text Layout Layer
//!
//! Wraps translated fragments into pixel-width-constrained lines and applies
//! the font-size policy. Measurement is a collaborator: the core never
//! rasterizes text, it only asks the host how wide a candidate line would be.

use serde::{Deserialize, Serialize};

use crate::translate::base_lang;

/// Languages written without word-separating whitespace
pub const UNSPACED_LANGS: [&str; 5] = ["zh", "ja", "ko", "th", "vi"];

/// Hard floor for shrink-to-fit font sizing
pub const MIN_FIT_FONT_SIZE: u32 = 6;

/// Lower clamp for estimated block font sizes
pub const MIN_BLOCK_FONT_SIZE: u32 = 8;

/// Upper clamp for estimated block font sizes
pub const MAX_BLOCK_FONT_SIZE: u32 = 36;

/// Unspaced scripts tend to need slightly larger glyphs for readability
const UNSPACED_SIZE_SCALE: f32 = 1.2;

/// Margin applied to estimated sizes in adaptive mode
const ADAPTIVE_SIZE_SCALE: f32 = 0.9;

/// Font description handed to the measurement and render collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontDesc {
    /// Font family name
    pub family: String,
    /// Point size
    pub size: u32,
    /// Bold weight
    pub bold: bool,
}

impl FontDesc {
    /// Create a font descriptor
    pub fn new(family: impl Into<String>, size: u32, bold: bool) -> Self {
        Self {
            family: family.into(),
            size,
            bold,
        }
    }

    /// The same font at a different size
    pub fn with_size(&self, size: u32) -> Self {
        Self {
            family: self.family.clone(),
            size,
            bold: self.bold,
        }
    }
}

impl Default for FontDesc {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            size: 9,
            bold: true,
        }
    }
}

/// Measured pixel extent of a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
}

/// Text measurement collaborator
///
/// Must be pure and deterministic for identical inputs. `None` means the
/// text could not be measured and is treated as fitting.
pub trait Measure {
    fn measure(&self, text: &str, font: &FontDesc) -> Option<TextSize>;
}

/// A fragment wrapped into renderable lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedText {
    /// Lines in display order
    pub lines: Vec<String>,
    /// Font size the lines were measured at
    pub font_size_used: u32,
}

/// Whether the language uses a script without word-separating spaces
///
/// Region suffixes are stripped and case is ignored, so `zh-CN` and `ZH`
/// are both unspaced while `EN-us` is not.
pub fn is_unspaced_script(lang_code: &str) -> bool {
    let base = base_lang(lang_code);
    UNSPACED_LANGS.contains(&base.as_str())
}

/// Wrap text into lines no wider than `max_width_px`
///
/// Space-delimited scripts accumulate whole words; unspaced scripts build
/// lines character by character. In both cases an overflowing unit is rolled
/// back onto a fresh line only when the current line already holds at least
/// two units, so a single unit wider than the box stays on its own line
/// unshortened. Empty input yields exactly one empty line so block-to-render
/// index correspondence stays stable.
pub fn wrap(
    text: &str,
    max_width_px: u32,
    font: &FontDesc,
    measure: &dyn Measure,
    unspaced: bool,
) -> Vec<String> {
    let units: Vec<String> = if unspaced {
        text.chars().map(|c| c.to_string()).collect()
    } else {
        text.split_whitespace().map(str::to_string).collect()
    };

    if units.is_empty() {
        return vec![String::new()];
    }

    let separator = if unspaced { "" } else { " " };
    let mut lines = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for unit in units {
        current.push(unit);
        let candidate = current.join(separator);

        if let Some(size) = measure.measure(&candidate, font) {
            if size.width > max_width_px && current.len() > 1 {
                // Roll back the unit that overflowed and start a new line
                if let Some(overflow) = current.pop() {
                    lines.push(current.join(separator));
                    current = vec![overflow];
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current.join(separator));
    }

    lines
}

/// Wrap text for a block, shrinking the font when the result overflows
/// the block height
///
/// Starts at the font's configured size, rewrapping one size smaller until
/// the stacked lines fit vertically or [`MIN_FIT_FONT_SIZE`] is reached.
/// Unmeasurable lines contribute no height and so always fit.
pub fn wrap_to_block(
    text: &str,
    max_width_px: u32,
    max_height_px: u32,
    font: &FontDesc,
    measure: &dyn Measure,
    unspaced: bool,
) -> WrappedText {
    let mut size = font.size.max(MIN_FIT_FONT_SIZE);

    loop {
        let sized = font.with_size(size);
        let lines = wrap(text, max_width_px, &sized, measure, unspaced);
        let height: u32 = lines
            .iter()
            .filter_map(|line| measure.measure(line, &sized))
            .map(|extent| extent.height)
            .sum();

        if height <= max_height_px || size <= MIN_FIT_FONT_SIZE {
            return WrappedText {
                lines,
                font_size_used: size,
            };
        }

        size -= 1;
    }
}

/// Shrink a font size in unit steps until the full text fits the box
///
/// Stops at [`MIN_FIT_FONT_SIZE`]; an unmeasurable text is treated as
/// fitting at the current size.
pub fn fit_font_size(
    measure: &dyn Measure,
    text: &str,
    max_width_px: u32,
    max_height_px: u32,
    font: &FontDesc,
    starting_size: u32,
) -> u32 {
    let mut size = starting_size.max(MIN_FIT_FONT_SIZE);

    loop {
        let Some(extent) = measure.measure(text, &font.with_size(size)) else {
            return size;
        };

        if (extent.width <= max_width_px && extent.height <= max_height_px)
            || size <= MIN_FIT_FONT_SIZE
        {
            return size;
        }

        size -= 1;
    }
}

/// Derive the render size for a block from its estimated original size
///
/// Unspaced scripts get a readability boost before the adaptive margin and
/// final clamp are applied.
pub fn adaptive_font_size(estimated: u32, unspaced: bool) -> u32 {
    let mut size = estimated as f32;
    if unspaced {
        size *= UNSPACED_SIZE_SCALE;
    }
    ((size * ADAPTIVE_SIZE_SCALE) as u32).clamp(MIN_BLOCK_FONT_SIZE, MAX_BLOCK_FONT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-advance measurement: every char is 10px wide, height = size
    struct CharGrid;

    impl Measure for CharGrid {
        fn measure(&self, text: &str, font: &FontDesc) -> Option<TextSize> {
            Some(TextSize {
                width: text.chars().count() as u32 * 10,
                height: font.size,
            })
        }
    }

    /// Measurement that always fails
    struct Unmeasurable;

    impl Measure for Unmeasurable {
        fn measure(&self, _text: &str, _font: &FontDesc) -> Option<TextSize> {
            None
        }
    }

    #[test]
    fn test_is_unspaced_script() {
        assert!(is_unspaced_script("zh-CN"));
        assert!(is_unspaced_script("ja"));
        assert!(is_unspaced_script("KO"));
        assert!(!is_unspaced_script("en"));
        assert!(!is_unspaced_script("EN-us"));
        assert!(!is_unspaced_script("de"));
    }

    #[test]
    fn test_wrap_empty_is_single_empty_line() {
        let lines = wrap("", 100, &FontDesc::default(), &CharGrid, false);
        assert_eq!(lines, vec![String::new()]);
        let lines = wrap("", 100, &FontDesc::default(), &CharGrid, true);
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn test_wrap_whitespace_only_is_single_empty_line() {
        let lines = wrap("   ", 100, &FontDesc::default(), &CharGrid, false);
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn test_wrap_single_short_line() {
        let lines = wrap("ab cd", 100, &FontDesc::default(), &CharGrid, false);
        assert_eq!(lines, vec!["ab cd"]);
    }

    #[test]
    fn test_wrap_breaks_on_overflow() {
        // "aaaa bbbb cccc": each word 40px, joined pairs are 90px; box 80px
        let lines = wrap("aaaa bbbb cccc", 80, &FontDesc::default(), &CharGrid, false);
        assert_eq!(lines, vec!["aaaa", "bbbb", "cccc"]);
    }

    #[test]
    fn test_wrap_never_exceeds_width_except_single_unit() {
        let font = FontDesc::default();
        let lines = wrap("one two three four five", 90, &font, &CharGrid, false);
        for line in &lines {
            let width = CharGrid.measure(line, &font).unwrap().width;
            let is_single_word = !line.contains(' ');
            assert!(
                width <= 90 || is_single_word,
                "line {:?} is {}px wide",
                line,
                width
            );
        }
    }

    #[test]
    fn test_wrap_oversized_word_kept_whole() {
        // Single 140px word in an 80px box stays on its own line
        let lines = wrap("superlongword", 80, &FontDesc::default(), &CharGrid, false);
        assert_eq!(lines, vec!["superlongword"]);
    }

    #[test]
    fn test_wrap_unspaced_per_character() {
        // 6 chars at 10px each into a 30px box: 3 per line
        let lines = wrap("日本語翻訳文", 30, &FontDesc::default(), &CharGrid, true);
        assert_eq!(lines, vec!["日本語", "翻訳文"]);
    }

    #[test]
    fn test_wrap_unspaced_single_oversized_char() {
        let lines = wrap("語", 5, &FontDesc::default(), &CharGrid, true);
        assert_eq!(lines, vec!["語"]);
    }

    #[test]
    fn test_wrap_unmeasurable_keeps_one_line() {
        let lines = wrap("cannot be measured at all", 10, &FontDesc::default(), &Unmeasurable, false);
        assert_eq!(lines, vec!["cannot be measured at all"]);
    }

    #[test]
    fn test_wrap_to_block_fits_at_starting_size() {
        // Two lines of height 9 stack to 18px, within the 20px box
        let font = FontDesc::default().with_size(9);
        let wrapped = wrap_to_block("aaaa bbbb", 50, 20, &font, &CharGrid, false);
        assert_eq!(wrapped.lines, vec!["aaaa", "bbbb"]);
        assert_eq!(wrapped.font_size_used, 9);
    }

    #[test]
    fn test_wrap_to_block_shrinks_for_height() {
        // At size 9 the two lines are 18px tall; a 15px box forces size 7
        let font = FontDesc::default().with_size(9);
        let wrapped = wrap_to_block("aaaa bbbb", 50, 15, &font, &CharGrid, false);
        assert_eq!(wrapped.lines, vec!["aaaa", "bbbb"]);
        assert_eq!(wrapped.font_size_used, 7);
    }

    #[test]
    fn test_wrap_to_block_stops_at_floor() {
        let font = FontDesc::default().with_size(9);
        let wrapped = wrap_to_block("aaaa bbbb", 50, 5, &font, &CharGrid, false);
        assert_eq!(wrapped.font_size_used, MIN_FIT_FONT_SIZE);
    }

    #[test]
    fn test_fit_font_size_shrinks_to_fit() {
        // 8 chars * 10px = 80px wide regardless of size; height = size.
        // Box height 12 forces the size down from 20 to 12.
        let size = fit_font_size(&CharGrid, "12345678", 100, 12, &FontDesc::default(), 20);
        assert_eq!(size, 12);
    }

    #[test]
    fn test_fit_font_size_floor() {
        // Width never fits, so the floor stops the shrink
        let size = fit_font_size(&CharGrid, "12345678", 10, 10, &FontDesc::default(), 20);
        assert_eq!(size, MIN_FIT_FONT_SIZE);
    }

    #[test]
    fn test_fit_font_size_unmeasurable_is_fit() {
        let size = fit_font_size(&Unmeasurable, "anything", 10, 10, &FontDesc::default(), 20);
        assert_eq!(size, 20);
    }

    #[test]
    fn test_fit_font_size_already_fits() {
        let size = fit_font_size(&CharGrid, "ab", 100, 100, &FontDesc::default(), 14);
        assert_eq!(size, 14);
    }

    #[test]
    fn test_adaptive_font_size_clamps() {
        assert_eq!(adaptive_font_size(4, false), MIN_BLOCK_FONT_SIZE);
        assert_eq!(adaptive_font_size(100, false), MAX_BLOCK_FONT_SIZE);
    }

    #[test]
    fn test_adaptive_font_size_unspaced_scale() {
        // 20 * 1.2 * 0.9 = 21.6 -> 21; 20 * 0.9 = 18
        assert_eq!(adaptive_font_size(20, true), 21);
        assert_eq!(adaptive_font_size(20, false), 18);
    }
}
