/// Public handle generation
///
/// A handle is derived from the first name: lowercased, with every run of
/// non-alphanumeric characters collapsed to a single `-`. When the base is
/// taken, numeric suffixes are tried in order (`ada`, `ada-1`, `ada-2`, ...)
/// and, past [`MAX_NUMERIC_SUFFIX`], random suffixes. Callers check each
/// candidate against the store and take the first free one.
///
/// ```
/// use taskmarket_shared::auth::handle::{candidates, slugify};
///
/// assert_eq!(slugify("  Ada María "), "ada-mar-a");
///
/// let first: Vec<String> = candidates("Ada").take(3).collect();
/// assert_eq!(first, ["ada", "ada-1", "ada-2"]);
/// ```

use rand::Rng;

/// Handle used when the first name has no usable characters
pub const FALLBACK_HANDLE: &str = "user";

/// Longest base slug kept before suffixing
pub const MAX_BASE_LENGTH: usize = 100;

/// Numeric suffixes tried before switching to random ones
pub const MAX_NUMERIC_SUFFIX: u32 = 50;

const RANDOM_SUFFIX_LENGTH: usize = 6;

/// Converts a name into a URL-safe lowercase slug
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }

        if slug.len() >= MAX_BASE_LENGTH {
            break;
        }
    }

    if slug.is_empty() {
        FALLBACK_HANDLE.to_string()
    } else {
        slug
    }
}

/// Endless sequence of handle candidates for a first name
pub fn candidates(first_name: &str) -> impl Iterator<Item = String> {
    let base = slugify(first_name);

    let numbered = {
        let base = base.clone();
        (0..=MAX_NUMERIC_SUFFIX).map(move |n| {
            if n == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, n)
            }
        })
    };

    let random = std::iter::repeat_with(move || format!("{}-{}", base, random_suffix()));

    numbered.chain(random)
}

fn random_suffix() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..RANDOM_SUFFIX_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
