use std::collections::HashSet;

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed to a
/// single `-`, no leading or trailing dash. Common Latin diacritics are
/// folded to their base letter first.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars().flat_map(fold_char) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn fold_char(ch: char) -> Vec<char> {
    match ch {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => vec!['a'],
        'č' | 'ć' | 'ç' | 'Č' | 'Ć' | 'Ç' => vec!['c'],
        'đ' | 'Đ' => vec!['d', 'j'],
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => vec!['e'],
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => vec!['i'],
        'ñ' | 'Ñ' => vec!['n'],
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => vec!['o'],
        'š' | 'Š' => vec!['s'],
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => vec!['u'],
        'ž' | 'Ž' => vec!['z'],
        '&' => vec![' ', 'a', 'n', 'd', ' '],
        other => vec![other],
    }
}

/// First free slug among `base`, `base-1`, `base-2`, ... given the slugs
/// already taken.
pub fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    (1..)
        .map(|i| format!("{base}-{i}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// LIKE pattern matching `base` and its numeric-suffixed variants.
pub fn suffix_pattern(base: &str) -> String {
    format!("{}-%", escape_like(base))
}

/// Escapes `%`, `_` and `\` for use inside a LIKE pattern.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
