use serde::{Deserialize, Serialize};

/// A user interest the digest groups stories by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: String,
    pub description: String,
}

impl Interest {
    /// Create an interest; a blank description defaults to `About <name>`.
    pub fn new(name: &str, description: Option<&str>) -> Self {
        let name = name.trim().to_string();
        let description = match description.map(str::trim) {
            Some(description) if !description.is_empty() => description.to_string(),
            _ => format!("About {}", name),
        };
        Self { name, description }
    }

    /// Parse `name: description; name; ...` as used in configuration.
    ///
    /// Blank entries are skipped.
    pub fn parse_list(raw: &str) -> Vec<Interest> {
        raw.split(';')
            .filter_map(|entry| {
                let (name, description) = match entry.split_once(':') {
                    Some((name, description)) => (name, Some(description)),
                    None => (entry, None),
                };
                (!name.trim().is_empty()).then(|| Interest::new(name, description))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_description() {
        let interest = Interest::new("  Rust ", None);
        assert_eq!(interest.name, "Rust");
        assert_eq!(interest.description, "About Rust");
    }

    #[test]
    fn test_parse_list() {
        let interests = Interest::parse_list("Rust: systems programming; AI ;; Security:  ");

        assert_eq!(
            interests,
            vec![
                Interest::new("Rust", Some("systems programming")),
                Interest::new("AI", None),
                Interest::new("Security", None),
            ]
        );
        assert_eq!(interests[2].description, "About Security");
    }
}
