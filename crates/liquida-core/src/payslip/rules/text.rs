//! Line splitting and text folding.

/// Page separator emitted by most text extractors.
pub const FORM_FEED: char = '\u{000C}';

/// Split raw text into trimmed, non-empty lines, preserving order.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Split a multi-page text blob on form feeds, dropping blank pages.
pub fn split_pages(text: &str) -> Vec<&str> {
    text.split(FORM_FEED)
        .filter(|page| !page.trim().is_empty())
        .collect()
}

/// Fold text for anchor matching: uppercase ASCII with Spanish accents removed.
///
/// Folding maps chars one to one, but byte offsets into the folded string do
/// not map back onto the original once accented chars are involved.
pub fn fold(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'Á' | 'à' | 'À' => 'A',
            'é' | 'É' | 'è' | 'È' => 'E',
            'í' | 'Í' | 'ì' | 'Ì' => 'I',
            'ó' | 'Ó' | 'ò' | 'Ò' => 'O',
            'ú' | 'Ú' | 'ù' | 'Ù' | 'ü' | 'Ü' => 'U',
            'ñ' | 'Ñ' => 'N',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}
