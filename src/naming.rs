//! Names derived from an entity type name: request fields, collection keys, plural keys.
//! Pure functions, computed once when the registry is built.

use regex::Regex;
use std::sync::OnceLock;

/// Suffix appended to the parameter base for the alias ("sid") request field.
pub const LOOKUP_FIELD_SUFFIX: &str = "Sid";
/// Suffix appended to the parameter base for the primary-key companion field.
pub const COMPANION_FIELD_SUFFIX: &str = "Id";

/// All names derived from one entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityNames {
    /// Bare type name without namespace, e.g. `UserProfile`.
    pub short_name: String,
    /// Lowercase-first short name, e.g. `userProfile`.
    pub param_base: String,
    /// Request field carrying the alias, e.g. `userProfileSid`.
    pub lookup_field: String,
    /// Request field receiving the resolved primary key, e.g. `userProfileId`.
    pub companion_field: String,
    /// Key for a single record in `data`, e.g. `userprofile`.
    pub collection_key: String,
    /// Key for a list in `data`, e.g. `userprofiles`.
    pub plural_collection_key: String,
}

impl EntityNames {
    pub fn derive(type_name: &str) -> Self {
        let short_name = short_name(type_name).to_string();
        let param_base = lcfirst(&short_name);
        let collection_key = short_name.to_lowercase();
        EntityNames {
            lookup_field: format!("{}{}", param_base, LOOKUP_FIELD_SUFFIX),
            companion_field: format!("{}{}", param_base, COMPANION_FIELD_SUFFIX),
            plural_collection_key: pluralize(&collection_key),
            collection_key,
            param_base,
            short_name,
        }
    }
}

/// Type name without any module or namespace prefix (`::`, `\`, `/` or `.` separated).
pub fn short_name(type_name: &str) -> &str {
    type_name
        .rsplit(|c| matches!(c, ':' | '\\' | '/' | '.'))
        .next()
        .unwrap_or(type_name)
        .trim()
}

/// Lowercase the first character only.
pub fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

const UNCOUNTABLE: &[&str] = &[
    "equipment", "information", "rice", "money", "species", "series", "fish", "sheep", "deer",
    "news", "moose", "swine", "bison", "metadata",
];

const IRREGULAR_SUFFIXES: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("woman", "women"),
    ("man", "men"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("goose", "geese"),
    ("mouse", "mice"),
    ("ox", "oxen"),
];

/// Words that end like an irregular but pluralize regularly.
const REGULAR_EXCEPTIONS: &[&str] = &["human", "german", "roman", "box", "fox"];

const RULES: &[(&str, &str)] = &[
    (r"(quiz)$", "${1}zes"),
    (r"(matr|vert|ind)(ix|ex)$", "${1}ices"),
    (r"(x|ch|ss|sh)$", "${1}es"),
    (r"([^aeiouy]|qu)y$", "${1}ies"),
    (r"(hive)$", "${1}s"),
    (r"(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
    (r"sis$", "ses"),
    (r"([ti])um$", "${1}a"),
    (r"(buffal|tomat|potat|ech|her|vet)o$", "${1}oes"),
    (r"(bu)s$", "${1}ses"),
    (r"(alias|status|campus)$", "${1}es"),
    (r"(octop|cact|vir)us$", "${1}i"),
    (r"(ax|test)is$", "${1}es"),
    (r"s$", "s"),
    (r"$", "s"),
];

fn compiled_rules() -> &'static [(Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .map(|(pattern, replacement)| {
                (Regex::new(pattern).expect("pluralization rule is a valid regex"), *replacement)
            })
            .collect()
    })
}

/// English plural of a (lowercase) word.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if !REGULAR_EXCEPTIONS.iter().any(|e| word.ends_with(e)) {
        for (singular, plural) in IRREGULAR_SUFFIXES {
            if let Some(stem) = word.strip_suffix(singular) {
                return format!("{}{}", stem, plural);
            }
        }
    }
    for (re, replacement) in compiled_rules() {
        if re.is_match(word) {
            return re.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}
