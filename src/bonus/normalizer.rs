use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical form used for every cross-table key comparison (roles, cities,
/// person names, indicator labels, month names): trimmed, uppercased,
/// diacritics stripped, internal whitespace collapsed to single spaces.
///
/// Source data mixes accents and casing freely ("São Luís", "SAO LUIS",
/// "sao luis"); normalizing both sides keeps lookups from silently missing.
pub fn normalize_key(value: &str) -> String {
    let stripped: String = value
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_uppercase()
}

/// Word-initial capitalization for human-readable city names in missed
/// indicator descriptions ("SAO LUIS" -> "Sao Luis").
pub(crate) fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Observation text as shown to people: trimmed, with spreadsheet
/// null artifacts ("none", "nan") mapped to the empty string.
pub(crate) fn display_text(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("nan")
    {
        String::new()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_strips_accents_and_collapses_whitespace() {
        assert_eq!(normalize_key("  São   Luís "), "SAO LUIS");
        assert_eq!(normalize_key("Açailândia"), "ACAILANDIA");
        assert_eq!(normalize_key("Liderança & Organização"), "LIDERANCA & ORGANIZACAO");
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn normalize_key_is_idempotent() {
        for raw in ["  Presidente   Dutra ", "FUNÇÃO", "vistoriador", "Timon\t\tMA"] {
            let once = normalize_key(raw);
            assert_eq!(normalize_key(&once), once);
        }
    }

    #[test]
    fn title_case_recapitalizes_each_word() {
        assert_eq!(title_case("SAO LUIS"), "Sao Luis");
        assert_eq!(title_case("PRESIDENTE DUTRA"), "Presidente Dutra");
        assert_eq!(title_case("São LUÍS"), "São Luís");
    }

    #[test]
    fn display_text_drops_null_artifacts() {
        assert_eq!(display_text("  férias em janeiro  "), "férias em janeiro");
        assert_eq!(display_text("none"), "");
        assert_eq!(display_text("NaN"), "");
        assert_eq!(display_text("   "), "");
    }
}
