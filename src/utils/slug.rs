use uuid::Uuid;

// Variante apta para URL (name_en) a partir del nombre visible
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut prev_hyphen = false;

    for ch in input.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    slug.trim_matches('-').chars().take(50).collect::<String>().trim_end_matches('-').to_string()
}

// Nombres sin ningún carácter ASCII (p.ej. solo kanji) necesitan un slug de relleno
pub fn slugify_or_random(input: &str, prefix: &str) -> String {
    let slug = slugify(input);
    if slug.is_empty() {
        let id = Uuid::new_v4().simple().to_string();
        format!("{}-{}", prefix, &id[..8])
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_symbols_into_single_hyphens() {
        assert_eq!(slugify("  Rust & Web!! Dev "), "rust-web-dev");
    }

    #[test]
    fn non_ascii_names_get_a_fallback() {
        assert_eq!(slugify("技術"), "");
        let slug = slugify_or_random("技術", "category");
        assert!(slug.starts_with("category-"));
        assert_eq!(slug.len(), "category-".len() + 8);
    }

    #[test]
    fn slug_is_capped_at_fifty_chars() {
        assert!(slugify(&"ab ".repeat(40)).len() <= 50);
    }
}
