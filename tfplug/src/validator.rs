use crate::schema::Validator;
use crate::types::{AttributePath, Diagnostic, Dynamic};
use std::sync::Arc;

/// Accepts only strings from a fixed set
pub struct StringOneOf {
    pub allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create(allowed: &[&str]) -> Arc<dyn Validator> {
        Arc::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} has an unsupported value", path),
                        format!(
                            "expected one of [{}], got \"{}\"",
                            self.allowed.join(", "),
                            s
                        ),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    /// Rejects empty and whitespace-only strings
    pub fn not_blank() -> Arc<dyn Validator> {
        Arc::new(NotBlank)
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", path, min),
                            format!("Got length {}", len),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", path, max),
                            format!("Got length {}", len),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

struct NotBlank;

impl Validator for NotBlank {
    fn description(&self) -> String {
        "value must not be blank".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if s.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must not be blank", path),
                        "An empty or whitespace-only value was configured",
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("value must match {}", self.description)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at least {}", path, min),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at most {}", path, max),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

/// Runs an element validator against every item of a list
pub struct ListElements {
    pub element: Arc<dyn Validator>,
}

impl ListElements {
    pub fn create(element: Arc<dyn Validator>) -> Arc<dyn Validator> {
        Arc::new(Self { element })
    }
}

impl Validator for ListElements {
    fn description(&self) -> String {
        format!("each element: {}", self.element.description())
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::List(items) = value {
            for (idx, item) in items.iter().enumerate() {
                if item.is_null() || item.is_unknown() {
                    continue;
                }
                let item_path = path.clone().index(idx as i64);
                self.element.validate(item, &item_path, diagnostics);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> AttributePath {
        AttributePath::new("test_field")
    }

    #[test]
    fn string_one_of_accepts_allowed_value() {
        let validator = StringOneOf::create(&["Untenanted", "Tenanted"]);
        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("Tenanted"), &path(), &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn string_one_of_rejects_other_value() {
        let validator = StringOneOf::create(&["Untenanted", "Tenanted"]);
        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("Sometimes"), &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("Sometimes"));
        assert_eq!(diags[0].attribute, Some(path()));
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator {
            min: Some(5),
            max: None,
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("hi"), &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length"));
    }

    #[test]
    fn string_length_validator_rejects_too_long() {
        let validator = StringLengthValidator {
            min: None,
            max: Some(5),
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("hello world"), &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("maximum length"));
    }

    #[test]
    fn not_blank_rejects_whitespace() {
        let validator = StringLengthValidator::not_blank();
        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("   "), &path(), &mut diags);
        validator.validate(&Dynamic::from("ok"), &path(), &mut diags);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator {
            pattern: regex::Regex::new(r"^[^/]+/[^/]+$").unwrap(),
            description: "the form TagSet/Tag".to_string(),
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("Region/West"), &path(), &mut diags);
        assert!(diags.is_empty());

        validator.validate(&Dynamic::from("invalid"), &path(), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("TagSet/Tag"));
    }

    #[test]
    fn number_range_validator_rejects_too_small() {
        let validator = NumberRangeValidator {
            min: Some(0.0),
            max: None,
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::Number(5.0), &path(), &mut diags);
        validator.validate(&Dynamic::Number(-1.0), &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("at least"));
    }

    #[test]
    fn list_elements_reports_element_index() {
        let validator = ListElements::create(StringLengthValidator::not_blank());
        let list = Dynamic::List(vec![Dynamic::from("a"), Dynamic::from("")]);

        let mut diags = Vec::new();
        validator.validate(&list, &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some(path().index(1)));
    }
}
