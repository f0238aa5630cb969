//! Attribute and style value constraints.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use smol_str::SmolStr;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("valid number regex"));
static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?(\w*|%)$").expect("valid length regex"));
static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(rgb(.+?)|#\w{3,6}|\w+)$").expect("valid color regex"));

/// URL schemes accepted by the `@url` macro.
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "ftp"];

/// Named value checks written as `@name` in rule declarations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaMacro {
    Number,
    Length,
    Color,
    Url,
}

impl SchemaMacro {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "@number" => Some(SchemaMacro::Number),
            "@length" => Some(SchemaMacro::Length),
            "@color" => Some(SchemaMacro::Color),
            "@url" => Some(SchemaMacro::Url),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaMacro::Number => "@number",
            SchemaMacro::Length => "@length",
            SchemaMacro::Color => "@color",
            SchemaMacro::Url => "@url",
        }
    }

    pub fn check(&self, value: &str) -> bool {
        match self {
            SchemaMacro::Number => NUMBER_RE.is_match(value),
            SchemaMacro::Length => LENGTH_RE.is_match(value),
            SchemaMacro::Color => COLOR_RE.is_match(value),
            SchemaMacro::Url => is_valid_url(value),
        }
    }
}

/// Whether `value` is a link target safe to keep in content.
///
/// Relative references pass. Absolute URLs need a safe scheme; `data:` is
/// only accepted for images.
pub fn is_valid_url(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if value.starts_with('/')
        || value.starts_with('#')
        || value.starts_with('?')
        || value.starts_with("./")
        || value.starts_with("../")
    {
        return true;
    }
    if value
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image/"))
    {
        return true;
    }
    match url::Url::parse(value) {
        Ok(url) => SAFE_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

/// Predicate signature for code-declared value checks.
pub type ValuePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A constraint on one attribute or style value.
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawSchemaValue")]
pub enum SchemaValue {
    /// `"*"`: anything goes.
    Any,
    Exact(SmolStr),
    OneOf(Vec<SmolStr>),
    Pattern(Regex),
    Macro(SchemaMacro),
    /// Wrapper carrying the required flag.
    Object {
        required: bool,
        value: Box<SchemaValue>,
    },
    Predicate(ValuePredicate),
}

impl SchemaValue {
    /// Parse a declared string: `*`, a known macro, or a literal.
    pub fn parse(value: &str) -> Self {
        if value == "*" {
            return SchemaValue::Any;
        }
        match SchemaMacro::parse(value) {
            Some(m) => SchemaValue::Macro(m),
            None => SchemaValue::Exact(SmolStr::new(value)),
        }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        SchemaValue::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(SchemaValue::Pattern(Regex::new(pattern)?))
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        SchemaValue::Predicate(Arc::new(f))
    }

    /// Wrap a value so that the attribute must be present.
    pub fn required(value: impl Into<SchemaValue>) -> Self {
        SchemaValue::Object {
            required: true,
            value: Box::new(value.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, SchemaValue::Object { required: true, .. })
    }

    /// Check a possibly absent value for the attribute `name`.
    pub fn check(&self, name: &str, value: Option<&str>) -> bool {
        match (self, value) {
            (SchemaValue::Object { required, .. }, None) => !required,
            (SchemaValue::Object { value: inner, .. }, Some(value)) => {
                inner.check(name, Some(value))
            }
            (_, None) => true,
            (_, Some(value)) => self.check_present(name, value),
        }
    }

    fn check_present(&self, name: &str, value: &str) -> bool {
        let is_class = name == "class";
        match self {
            SchemaValue::Any => true,
            SchemaValue::Exact(expected) if is_class => {
                value.split_whitespace().any(|token| token == expected.as_str())
            }
            SchemaValue::Exact(expected) => value == expected.as_str(),
            SchemaValue::OneOf(list) if is_class => value
                .split_whitespace()
                .all(|token| list.iter().any(|item| item == token)),
            SchemaValue::OneOf(list) => list.iter().any(|item| item == value),
            SchemaValue::Pattern(re) if is_class => {
                value.split_whitespace().all(|token| re.is_match(token))
            }
            SchemaValue::Pattern(re) => re.is_match(value),
            SchemaValue::Macro(SchemaMacro::Url) => is_valid_url(value),
            SchemaValue::Macro(m) if is_class => {
                value.split_whitespace().all(|token| m.check(token))
            }
            SchemaValue::Macro(m) => m.check(value),
            SchemaValue::Object { value: inner, .. } => inner.check_present(name, value),
            SchemaValue::Predicate(f) => f(value),
        }
    }
}

impl From<&str> for SchemaValue {
    fn from(value: &str) -> Self {
        SchemaValue::parse(value)
    }
}

impl From<SchemaMacro> for SchemaValue {
    fn from(value: SchemaMacro) -> Self {
        SchemaValue::Macro(value)
    }
}

impl From<Regex> for SchemaValue {
    fn from(value: Regex) -> Self {
        SchemaValue::Pattern(value)
    }
}

impl PartialEq for SchemaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SchemaValue::Any, SchemaValue::Any) => true,
            (SchemaValue::Exact(a), SchemaValue::Exact(b)) => a == b,
            (SchemaValue::OneOf(a), SchemaValue::OneOf(b)) => a == b,
            (SchemaValue::Pattern(a), SchemaValue::Pattern(b)) => a.as_str() == b.as_str(),
            (SchemaValue::Macro(a), SchemaValue::Macro(b)) => a == b,
            (
                SchemaValue::Object {
                    required: ra,
                    value: va,
                },
                SchemaValue::Object {
                    required: rb,
                    value: vb,
                },
            ) => ra == rb && va == vb,
            (SchemaValue::Predicate(a), SchemaValue::Predicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for SchemaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaValue::Any => f.write_str("*"),
            SchemaValue::Exact(value) => write!(f, "{value:?}"),
            SchemaValue::OneOf(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value:?}")?;
                }
                f.write_str("]")
            }
            SchemaValue::Pattern(re) => write!(f, "/{}/", re.as_str()),
            SchemaValue::Macro(m) => f.write_str(m.as_str()),
            SchemaValue::Object { required, value } => {
                if *required {
                    write!(f, "required {value}")
                } else {
                    write!(f, "{value}")
                }
            }
            SchemaValue::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

impl fmt::Debug for SchemaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaValue({self})")
    }
}

/// Wire shape of a value in JSON rule declarations.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSchemaValue {
    Text(String),
    List(Vec<String>),
    Pattern {
        regex: String,
    },
    Object {
        #[serde(default)]
        required: bool,
        value: Box<RawSchemaValue>,
    },
}

impl TryFrom<RawSchemaValue> for SchemaValue {
    type Error = regex::Error;

    fn try_from(raw: RawSchemaValue) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawSchemaValue::Text(text) => SchemaValue::parse(&text),
            RawSchemaValue::List(values) => SchemaValue::one_of(values),
            RawSchemaValue::Pattern { regex } => SchemaValue::pattern(&regex)?,
            RawSchemaValue::Object { required, value } => SchemaValue::Object {
                required,
                value: Box::new(SchemaValue::try_from(*value)?),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strings() {
        assert_eq!(SchemaValue::parse("*"), SchemaValue::Any);
        assert_eq!(SchemaValue::parse("@color"), SchemaValue::Macro(SchemaMacro::Color));
        assert_eq!(SchemaValue::parse("@var0"), SchemaValue::Exact("@var0".into()));
        assert_eq!(SchemaValue::parse("red"), SchemaValue::Exact("red".into()));
    }

    #[test]
    fn test_object_presence() {
        let required = SchemaValue::required("@number");
        assert!(!required.check("width", None));
        assert!(required.check("width", Some("12")));
        assert!(!required.check("width", Some("wide")));

        let optional = SchemaValue::Object {
            required: false,
            value: Box::new(SchemaValue::Any),
        };
        assert!(optional.check("title", None));
        assert!(SchemaValue::parse("red").check("color", None));
    }

    #[test]
    fn test_class_asymmetry() {
        let exact = SchemaValue::parse("a");
        assert!(exact.check("class", Some("a b")));
        assert!(!exact.check("title", Some("a b")));

        let set = SchemaValue::one_of(["a", "c"]);
        assert!(!set.check("class", Some("a b")));
        assert!(set.check("class", Some("a  c ")));
        assert!(set.check("title", Some("c")));

        let re = SchemaValue::pattern("^x-").unwrap();
        assert!(re.check("class", Some("x-1 x-2")));
        assert!(!re.check("class", Some("x-1 y")));
    }

    #[test]
    fn test_macros() {
        assert!(SchemaMacro::Number.check("-1.5"));
        assert!(!SchemaMacro::Number.check("1e3"));
        assert!(SchemaMacro::Length.check("12px"));
        assert!(SchemaMacro::Length.check("50%"));
        assert!(!SchemaMacro::Length.check("px"));
        assert!(SchemaMacro::Color.check("#fff"));
        assert!(SchemaMacro::Color.check("RGB(1, 2, 3)"));
        assert!(SchemaMacro::Color.check("red"));
        assert!(!SchemaMacro::Color.check("red; background: url(x)"));
    }

    #[test]
    fn test_url_macro() {
        assert!(is_valid_url("https://example.com/a?b=1"));
        assert!(is_valid_url("/relative/path"));
        assert!(is_valid_url("#anchor"));
        assert!(is_valid_url("mailto:someone@example.com"));
        assert!(is_valid_url("data:image/png;base64,AAAA"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("data:text/html,<b>"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_predicate_identity() {
        let f = SchemaValue::predicate(|v| v.len() < 3);
        assert_eq!(f, f.clone());
        assert_ne!(f, SchemaValue::predicate(|v| v.len() < 3));
        assert!(f.check("x", Some("ab")));
        assert!(!f.check("x", Some("abc")));
    }

    #[test]
    fn test_deserialize() {
        let value: SchemaValue =
            serde_json::from_str(r#"{"required": true, "value": "@color"}"#).unwrap();
        assert_eq!(value, SchemaValue::required(SchemaMacro::Color));

        let value: SchemaValue = serde_json::from_str(r#"["left", "right"]"#).unwrap();
        assert_eq!(value, SchemaValue::one_of(["left", "right"]));

        let value: SchemaValue = serde_json::from_str(r#"{"regex": "^h[1-6]$"}"#).unwrap();
        assert_eq!(value, SchemaValue::pattern("^h[1-6]$").unwrap());

        assert!(serde_json::from_str::<SchemaValue>(r#"{"regex": "("}"#).is_err());
    }
}
