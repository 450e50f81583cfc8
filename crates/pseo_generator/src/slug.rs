use rand::distributions::Alphanumeric;
use rand::Rng;

const MAX_BASE_LEN: usize = 80;
const SUFFIX_LEN: usize = 6;

/// Lower-case, ASCII alphanumerics separated by single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_BASE_LEN {
        slug.truncate(MAX_BASE_LEN);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// Slug for a new page: the slugified title plus a random disambiguator.
pub fn unique_slug(title: &str) -> String {
    let base = slugify(title);
    let suffix = random_suffix(&mut rand::thread_rng());
    if base.is_empty() {
        format!("page-{}", suffix)
    } else {
        format!("{}-{}", base, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("BPC-157 vs TB-500"), "bpc-157-vs-tb-500");
        assert_eq!(slugify("  What is GHK-Cu?  A Guide!! "), "what-is-ghk-cu-a-guide");
        assert_eq!(slugify("Épitalon"), "pitalon");
        assert_eq!(slugify("???"), "");
        assert!(slugify(&"word ".repeat(40)).len() <= MAX_BASE_LEN);
        assert!(!slugify(&"word ".repeat(40)).ends_with('-'));
    }

    #[test]
    fn test_unique_slug() {
        let slug = unique_slug("BPC-157 Benefits");
        assert!(slug.starts_with("bpc-157-benefits-"));
        assert_eq!(slug.len(), "bpc-157-benefits-".len() + SUFFIX_LEN);
        assert!(unique_slug("!!!").starts_with("page-"));

        let mut rng = StdRng::seed_from_u64(7);
        let suffix = random_suffix(&mut rng);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
