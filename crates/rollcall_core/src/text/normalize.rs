//! Name folding and input sanitization.
//!
//! # Responsibility
//! - Fold case and Latin diacritics into a stable matching key.
//! - Strip punctuation/symbols while keeping letters and digits of any script.
//!
//! # Invariants
//! - `normalize_name(normalize_name(s)) == normalize_name(s)`.
//! - Output never has leading/trailing or repeated whitespace.
//! - Sanitization runs before folding in `normalize_search_term`.

/// Characters kept by `sanitize_input` besides letters, digits and whitespace.
const SANITIZE_EXTRA_CHARS: &[char] = &['.', '@', '-', '_', '/'];

/// Folds a display name into its identity/search key.
///
/// Lower-cases, maps accented Latin characters through a fixed folding
/// table, drops anything that is not a letter, digit or whitespace, then
/// collapses whitespace runs to single spaces and trims.
///
/// Letters from non-Latin scripts (CJK, Arabic, Devanagari, Cyrillic, ...)
/// pass through unchanged apart from lower-casing.
pub fn normalize_name(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for lower in input.chars().flat_map(char::to_lowercase) {
        match fold_char(lower) {
            Some(replacement) => folded.push_str(replacement),
            None if is_word_char(lower) || lower.is_whitespace() => folded.push(lower),
            None => {}
        }
    }

    collapse_whitespace(&folded)
}

/// Keeps letters, digits, whitespace and `. @ - _ /`; drops everything else.
///
/// The result is trimmed but inner whitespace is left as-is.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|ch| {
            ch.is_alphanumeric() || ch.is_whitespace() || SANITIZE_EXTRA_CHARS.contains(ch)
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Prepares user-typed search text for matching against normalized keys.
pub fn normalize_search_term(input: &str) -> String {
    normalize_name(&sanitize_input(input))
}

/// Letters and digits of any script, plus the vowel signs and viramas of
/// Brahmic scripts, which Unicode does not classify as alphabetic but which
/// are part of the written word.
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '\u{0900}'..='\u{0DFF}' | '\u{0E00}'..='\u{0EFF}')
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Diacritic folding table. Input is already lower-cased.
fn fold_char(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' | 'ǎ' | 'ạ' | 'ả' | 'ấ' | 'ầ'
        | 'ẩ' | 'ẫ' | 'ậ' | 'ắ' | 'ằ' | 'ẳ' | 'ẵ' | 'ặ' => "a",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' | 'ẹ' | 'ẻ' | 'ẽ' | 'ế' | 'ề'
        | 'ể' | 'ễ' | 'ệ' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' | 'ǐ' | 'ỉ' | 'ị' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' | 'ŉ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' | 'ǒ' | 'ơ' | 'ọ' | 'ỏ' | 'ố'
        | 'ồ' | 'ổ' | 'ỗ' | 'ộ' | 'ớ' | 'ờ' | 'ở' | 'ỡ' | 'ợ' => "o",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' | 'ș' => "s",
        'ţ' | 'ť' | 'ŧ' | 'ț' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' | 'ǔ' | 'ư' | 'ụ' | 'ủ'
        | 'ứ' | 'ừ' | 'ử' | 'ữ' | 'ự' => "u",
        'ŵ' => "w",
        'ý' | 'ÿ' | 'ŷ' | 'ỳ' | 'ỵ' | 'ỷ' | 'ỹ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'œ' => "oe",
        'æ' => "ae",
        'þ' => "th",
        _ => return None,
    };
    Some(folded)
}
