//! Render option tables and per-request merging.
//!
//! Options are opaque key/value mappings forwarded to the rendering API
//! untouched, with one exception: `landscape` and `fullPage` are coerced to
//! booleans so loosely-typed caller input ("1", "0", 1, 0) behaves the way
//! the API expects.

use serde_json::{Map, Value, json};

/// Free-form option mapping passed through to the rendering API.
pub type OptionSet = Map<String, Value>;

const COERCED_KEYS: [&str; 2] = ["landscape", "fullPage"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Pdf,
    Image,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Pdf => "pdf",
            OutputType::Image => "image",
        }
    }
}

/// Default option tables, one per output type.
#[derive(Debug, Clone)]
pub struct RenderOptionDefaults {
    pub pdf: OptionSet,
    pub image: OptionSet,
}

impl Default for RenderOptionDefaults {
    fn default() -> Self {
        let pdf = json!({
            "landscape": false,
            "width": "8.27in",
            "height": "11.69in",
            "marginTop": ".4in",
            "marginBottom": ".4in",
            "marginLeft": ".4in",
            "marginRight": ".4in",
        });
        let image = json!({
            "fullPage": true,
            "viewPortOptions": {
                "width": 1920,
                "height": 1080,
            },
        });

        let as_map = |value: Value| match value {
            Value::Object(map) => map,
            _ => unreachable!("default option tables are objects"),
        };

        Self {
            pdf: as_map(pdf),
            image: as_map(image),
        }
    }
}

impl RenderOptionDefaults {
    pub fn for_output(&self, output: OutputType) -> &OptionSet {
        match output {
            OutputType::Pdf => &self.pdf,
            OutputType::Image => &self.image,
        }
    }

    /// Merge caller-supplied options over the defaults for `output`.
    ///
    /// Caller keys overwrite defaults key-by-key; keys only the caller
    /// supplies are added; all other default keys survive. `landscape` and
    /// `fullPage` are forced to booleans when present.
    pub fn resolve(&self, output: OutputType, overrides: &OptionSet) -> OptionSet {
        let mut merged = self.for_output(output).clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        for key in COERCED_KEYS {
            if let Some(value) = merged.get(key) {
                let coerced = Value::Bool(truthy(value));
                merged.insert(key.to_string(), coerced);
            }
        }
        merged
    }
}

/// Loose boolean coercion for option values arriving as JSON.
///
/// Mirrors the cast semantics of the original plugin: empty strings, "0",
/// zero numbers and null are false; everything else is true.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Null => false,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: Value) -> OptionSet {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn caller_keys_override_defaults_and_other_defaults_survive() {
        let defaults = RenderOptionDefaults::default();
        let overrides = object(json!({"width": "11.69in", "scale": 2}));

        let merged = defaults.resolve(OutputType::Pdf, &overrides);

        assert_eq!(merged["width"], json!("11.69in"));
        assert_eq!(merged["scale"], json!(2));
        assert_eq!(merged["height"], json!("11.69in"));
        assert_eq!(merged["marginTop"], json!(".4in"));
    }

    #[test]
    fn empty_overrides_reproduce_the_default_table() {
        let defaults = RenderOptionDefaults::default();
        let merged = defaults.resolve(OutputType::Image, &OptionSet::new());
        assert_eq!(merged, defaults.image);
    }

    #[test]
    fn landscape_string_is_coerced_to_boolean() {
        let defaults = RenderOptionDefaults::default();
        let overrides = object(json!({"landscape": "1"}));

        let merged = defaults.resolve(OutputType::Pdf, &overrides);

        assert_eq!(merged["landscape"], Value::Bool(true));
    }

    #[test]
    fn full_page_zero_string_is_coerced_to_false() {
        let defaults = RenderOptionDefaults::default();
        let overrides = object(json!({"fullPage": "0"}));

        let merged = defaults.resolve(OutputType::Image, &overrides);

        assert_eq!(merged["fullPage"], Value::Bool(false));
    }

    #[test]
    fn unrelated_values_pass_through_unvalidated() {
        let defaults = RenderOptionDefaults::default();
        let overrides = object(json!({"marginTop": {"bogus": true}}));

        let merged = defaults.resolve(OutputType::Pdf, &overrides);

        assert_eq!(merged["marginTop"], json!({"bogus": true}));
    }

    #[test]
    fn truthiness_matches_loose_casting() {
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!("yes")));
        assert!(truthy(&json!(1)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!("0")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&Value::Null));
    }
}
