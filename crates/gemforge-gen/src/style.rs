//! Catalog of jewellery design styles offered to users

/// Styles a caller can offer for selection. Any string is accepted in a
/// `DesignRequest`; this list only drives suggestions and validation hints.
pub const STYLE_OPTIONS: &[&str] = &[
    "Modern",
    "Minimalist",
    "Classic",
    "Vintage",
    "Bohemian",
    "Art Deco",
    "Gothic",
    "Ethnic",
    "Geometric",
    "Nature-inspired",
    "Futuristic",
    "Industrial",
    "Romantic",
    "Abstract",
    "Retro",
    "Avant-Garde",
    "Sporty",
    "Elegant",
    "Casual",
    "Eclectic",
];

/// Case-insensitive lookup returning the catalog spelling
pub fn find_style(name: &str) -> Option<&'static str> {
    let name = name.trim();
    STYLE_OPTIONS
        .iter()
        .copied()
        .find(|s| s.eq_ignore_ascii_case(name))
}

/// Split styles into (known, unknown), normalizing known ones to catalog spelling
pub fn partition_styles(styles: &[String]) -> (Vec<String>, Vec<String>) {
    let mut known = Vec::new();
    let mut unknown = Vec::new();
    for style in styles {
        match find_style(style) {
            Some(s) => known.push(s.to_string()),
            None => unknown.push(style.clone()),
        }
    }
    (known, unknown)
}
