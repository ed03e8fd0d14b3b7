/// Filesystem- and flink-safe identifier for a `(username, filename)` job,
/// matching the checkpoint store's key used by both backends.
pub fn slug(username: &str, filename: &str) -> String {
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect()
    };
    format!("{}__{}", clean(username), clean(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_path_separators_and_ampersands() {
        assert_eq!(slug("ali&ce", "photos/beach.jpg"), "ali_ce__photos_beach.jpg");
    }
}
