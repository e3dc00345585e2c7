use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::StoreError;

pub const MAX_SLUG_LEN: usize = 200;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("valid pattern"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid pattern"));
static SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid pattern"));

/// URL slug for a title: lowercase ASCII words joined by single dashes.
/// Accented letters fold to their base letter, other non-ASCII is dropped.
pub fn slugify(input: &str) -> String {
    let folded: String = input.nfkd().filter(char::is_ascii).collect();
    let s = UNSAFE_CHARS.replace_all(&folded, "").to_lowercase();
    let s = SEPARATORS.replace_all(s.trim(), "-");

    let mut slug = s.trim_matches(|c| c == '-' || c == '_').to_string();

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches(|c| c == '-' || c == '_').to_string();
    }

    slug
}

/// Slug from the title, or `<kind>-<8 hex>` when the title has no usable characters.
pub fn generate(kind: &str, title: &str) -> String {
    let slug = slugify(title);

    if slug.is_empty() {
        let id = Uuid::new_v4().simple().to_string();
        format!("{kind}-{}", &id[..8])
    } else {
        slug
    }
}

/// Slugs given explicitly are kept verbatim, so they only need to be URL safe.
pub fn validate(slug: &str) -> Result<(), StoreError> {
    if slug.len() > MAX_SLUG_LEN {
        return Err(StoreError::invalid(
            "slug",
            format!("at most {MAX_SLUG_LEN} characters"),
        ));
    }

    if !SLUG.is_match(slug) {
        return Err(StoreError::invalid(
            "slug",
            "only lowercase letters, numbers, underscores and hyphens",
        ));
    }

    Ok(())
}
