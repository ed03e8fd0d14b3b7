use std::fmt;

/// The two media classes a worker can specialise in. Determines which
/// worker pool the Registry routes a job to (spec §3, §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Class {
    Text,
    Media,
}

impl Class {
    pub const ALL: [Class; 2] = [Class::Text, Class::Media];

    pub fn as_str(self) -> &'static str {
        match self {
            Class::Text => "text",
            Class::Media => "media",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Class {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Class::Text),
            "media" => Ok(Class::Media),
            _ => Err(()),
        }
    }
}

/// Canonical extension -> class table (spec §4.5 "Extension policy").
/// This is the one authority mapping a filename to a media class; the
/// Registry owns it and a worker never overrides it.
const EXTENSION_TABLE: &[(&str, Class)] = &[
    ("txt", Class::Text),
    ("wav", Class::Media),
    ("png", Class::Media),
    ("jpg", Class::Media),
    ("jpeg", Class::Media),
    ("bmp", Class::Media),
    ("tga", Class::Media),
];

/// Classify a filename by its extension, case-insensitively. Returns
/// `None` for unsupported or missing extensions (the caller sends
/// `MEDIA_KO`, spec §4.5).
pub fn classify(filename: &str) -> Option<Class> {
    let ext = filename.rsplit('.').next()?.to_ascii_lowercase();
    if ext == filename.to_ascii_lowercase() {
        // no '.' found, rsplit returned the whole string
        return None;
    }
    EXTENSION_TABLE.iter().find(|(e, _)| *e == ext).map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions_case_insensitively() {
        assert_eq!(classify("hello.txt"), Some(Class::Text));
        assert_eq!(classify("hello.TXT"), Some(Class::Text));
        assert_eq!(classify("photo.PNG"), Some(Class::Media));
        assert_eq!(classify("clip.wav"), Some(Class::Media));
    }

    #[test]
    fn rejects_unknown_or_missing_extension() {
        assert_eq!(classify("archive.zip"), None);
        assert_eq!(classify("noextension"), None);
    }
}
