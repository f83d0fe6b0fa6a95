//! Field validators.
//!
//! Validators are declared as data ([`ValidatorSpec`], [`AsyncValidatorSpec`],
//! [`GroupValidatorSpec`]) and interpreted by a single `check` dispatch per
//! family. A check returns `None` for a valid value and the [`ErrorKind`] it
//! detected otherwise.

use std::fmt;
use std::sync::{Arc, LazyLock};

use futures::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{LookupError, Result};
use crate::group::FormGroup;

/// The kinds of validation failure a field can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The value is empty or whitespace.
    Required,
    /// The value is shorter than the configured minimum.
    MinLength,
    /// The value does not match the configured pattern.
    PatternMismatch,
    /// The value is not shaped like an email address.
    InvalidEmail,
    /// The value fails the national identifier check-digit algorithm.
    ChecksumInvalid,
    /// Two fields that must be equal differ.
    Mismatch,
    /// The identifier is already registered.
    AlreadyExists,
}

impl ErrorKind {
    /// Returns the stable key of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::MinLength => "minLength",
            Self::PatternMismatch => "patternMismatch",
            Self::InvalidEmail => "invalidEmail",
            Self::ChecksumInvalid => "checksumInvalid",
            Self::Mismatch => "mismatch",
            Self::AlreadyExists => "alreadyExists",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns whether a value counts as empty for validation purposes.
///
/// Strings are empty when they hold only whitespace, lists when they have no
/// elements. Numbers and booleans are never empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Length of a value as seen by [`ValidatorSpec::MinLength`].
fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// A compiled, fully anchored pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern that must match the whole value.
    ///
    /// `^` and `$` are added when the source does not already carry them.
    pub fn new(source: &str) -> Result<Self> {
        let mut anchored = String::with_capacity(source.len() + 2);
        if !source.starts_with('^') {
            anchored.push('^');
        }
        anchored.push_str(source);
        if !source.ends_with('$') {
            anchored.push('$');
        }

        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(&anchored)?,
        })
    }

    /// The pattern as it was declared.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns whether the whole text matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// A synchronous validator declaration.
#[derive(Debug, Clone)]
pub enum ValidatorSpec {
    /// Fails on empty or whitespace-only values and empty lists.
    Required,
    /// Fails when a non-empty string or list is shorter than the bound.
    MinLength(usize),
    /// Fails when a non-empty string does not match the pattern.
    Pattern(Pattern),
    /// Fails when a non-empty string is not shaped like an email address.
    Email,
    /// Fails when a non-empty string is not a valid CPF number.
    Cpf,
}

impl ValidatorSpec {
    /// Declares a pattern validator.
    pub fn pattern(source: &str) -> Result<Self> {
        Ok(Self::Pattern(Pattern::new(source)?))
    }

    /// Runs the validator against a value.
    pub fn check(&self, value: &Value) -> Option<ErrorKind> {
        if let Self::Required = self {
            return is_empty_value(value).then_some(ErrorKind::Required);
        }

        // Every other validator lets empty values through; `Required` owns them.
        if is_empty_value(value) {
            return None;
        }

        match self {
            Self::Required => None,
            Self::MinLength(min) => match value_len(value) {
                Some(len) if len < *min => Some(ErrorKind::MinLength),
                _ => None,
            },
            Self::Pattern(pattern) => match value.as_str() {
                Some(text) if pattern.is_match(text) => None,
                _ => Some(ErrorKind::PatternMismatch),
            },
            Self::Email => match value.as_str() {
                Some(text) if is_email_shaped(text) => None,
                _ => Some(ErrorKind::InvalidEmail),
            },
            Self::Cpf => match value.as_str() {
                Some(text) if cpf_is_valid(text) => None,
                _ => Some(ErrorKind::ChecksumInvalid),
            },
        }
    }
}

/// `local@domain.tld`, with a TLD of at least two letters.
static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}$").ok()
});

fn is_email_shaped(text: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(text))
}

/// Validates a CPF (Brazilian individual taxpayer number).
///
/// Accepts eleven bare digits or the `000.000.000-00` layout. Both check
/// digits are verified with the weighted mod-11 algorithm, and numbers made
/// of a single repeated digit are rejected.
pub fn cpf_is_valid(input: &str) -> bool {
    let Some(digits) = cpf_digits(input) else {
        return false;
    };

    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

/// Extracts the eleven digits of a CPF in either accepted layout.
fn cpf_digits(input: &str) -> Option<[u32; 11]> {
    let bytes = input.as_bytes();
    let bare: String = match bytes.len() {
        11 => input.to_string(),
        14 if bytes[3] == b'.' && bytes[7] == b'.' && bytes[11] == b'-' => input
            .char_indices()
            .filter(|(i, _)| ![3, 7, 11].contains(i))
            .map(|(_, c)| c)
            .collect(),
        _ => return None,
    };

    let mut digits = [0u32; 11];
    let mut count = 0;
    for c in bare.chars() {
        let slot = digits.get_mut(count)?;
        *slot = c.to_digit(10)?;
        count += 1;
    }
    (count == 11).then_some(digits)
}

/// Computes the check digit over a prefix of nine or ten digits.
///
/// Weights run from `prefix.len() + 1` down to 2.
fn cpf_check_digit(prefix: &[u32]) -> u32 {
    let top = u32::try_from(prefix.len()).unwrap_or(0) + 1;
    let sum: u32 = prefix
        .iter()
        .zip((2..=top).rev())
        .map(|(digit, weight)| digit * weight)
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 {
        0
    } else {
        rest
    }
}

/// External predicate answering "is this identifier already registered?".
pub trait ExistenceCheck: Send + Sync {
    /// Resolves to `true` when the identifier is taken.
    fn exists<'a>(&'a self, identifier: &'a str) -> BoxFuture<'a, std::result::Result<bool, LookupError>>;
}

/// An asynchronous validator declaration, bound to its dependency.
#[derive(Clone)]
pub enum AsyncValidatorSpec {
    /// Fails with [`ErrorKind::AlreadyExists`] when the lookup reports the
    /// value as taken.
    AlreadyExists(Arc<dyn ExistenceCheck>),
}

impl fmt::Debug for AsyncValidatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists(_) => f.write_str("AlreadyExists(..)"),
        }
    }
}

impl AsyncValidatorSpec {
    /// Runs the validator against a value.
    ///
    /// Empty values resolve to valid without consulting the dependency. A
    /// failing lookup cannot prove the identifier is taken, so it is logged
    /// and treated as valid.
    pub async fn check(&self, value: &Value) -> Option<ErrorKind> {
        if is_empty_value(value) {
            return None;
        }

        match self {
            Self::AlreadyExists(lookup) => {
                let identifier = value.as_str()?;
                match lookup.exists(identifier).await {
                    Ok(true) => Some(ErrorKind::AlreadyExists),
                    Ok(false) => None,
                    Err(e) => {
                        warn!(error = %e, "Existence check failed, accepting value");
                        None
                    }
                }
            }
        }
    }
}

/// An error produced by a group-level validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// The field the error is shown on, if any.
    pub field: Option<String>,
}

/// A validator spanning several controls of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupValidatorSpec {
    /// `confirmation` must equal `field`. Reported on `confirmation`.
    FieldsMatch {
        /// The field holding the reference value.
        field: String,
        /// The field that must repeat it.
        confirmation: String,
    },
}

impl GroupValidatorSpec {
    /// Declares a confirmation rule.
    pub fn fields_match(field: impl Into<String>, confirmation: impl Into<String>) -> Self {
        Self::FieldsMatch {
            field: field.into(),
            confirmation: confirmation.into(),
        }
    }

    /// Runs the validator against a group.
    ///
    /// Stays silent until both fields are filled.
    pub fn check(&self, group: &FormGroup) -> Option<GroupError> {
        match self {
            Self::FieldsMatch {
                field,
                confirmation,
            } => {
                let first = group.value_of(field)?;
                let second = group.value_of(confirmation)?;
                if is_empty_value(first) || is_empty_value(second) || first == second {
                    None
                } else {
                    Some(GroupError {
                        kind: ErrorKind::Mismatch,
                        field: Some(confirmation.clone()),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_CPFS: [&str; 3] = ["52998224725", "11144477735", "529.982.247-25"];

    struct Taken(&'static [&'static str]);

    impl ExistenceCheck for Taken {
        fn exists<'a>(
            &'a self,
            identifier: &'a str,
        ) -> BoxFuture<'a, std::result::Result<bool, LookupError>> {
            Box::pin(async move { Ok(self.0.contains(&identifier)) })
        }
    }

    struct Broken;

    impl ExistenceCheck for Broken {
        fn exists<'a>(
            &'a self,
            _identifier: &'a str,
        ) -> BoxFuture<'a, std::result::Result<bool, LookupError>> {
            Box::pin(async { Err(LookupError::Unavailable("offline".to_string())) })
        }
    }

    struct Unreachable;

    impl ExistenceCheck for Unreachable {
        fn exists<'a>(
            &'a self,
            _identifier: &'a str,
        ) -> BoxFuture<'a, std::result::Result<bool, LookupError>> {
            panic!("empty values must not reach the lookup")
        }
    }

    #[test]
    fn test_required() {
        let v = ValidatorSpec::Required;
        assert_eq!(v.check(&json!("hello")), None);
        assert_eq!(v.check(&json!("")), Some(ErrorKind::Required));
        assert_eq!(v.check(&json!("   ")), Some(ErrorKind::Required));
        assert_eq!(v.check(&Value::Null), Some(ErrorKind::Required));
        assert_eq!(v.check(&json!([])), Some(ErrorKind::Required));
        assert_eq!(v.check(&json!(["React"])), None);
    }

    #[test]
    fn test_min_length() {
        let v = ValidatorSpec::MinLength(6);
        assert_eq!(v.check(&json!("secret")), None);
        assert_eq!(v.check(&json!("short")), Some(ErrorKind::MinLength));
        assert_eq!(v.check(&json!("")), None);
        // Counts characters, not bytes.
        assert_eq!(v.check(&json!("ãéíõúç")), None);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let v = ValidatorSpec::pattern("https?://.+").unwrap();
        assert_eq!(v.check(&json!("https://meu.portfolio.dev")), None);
        assert_eq!(v.check(&json!("http://x")), None);
        assert_eq!(
            v.check(&json!("see https://x.dev")),
            Some(ErrorKind::PatternMismatch)
        );
        assert_eq!(v.check(&json!("")), None);

        let linkedin = ValidatorSpec::pattern(r"https://(www\.)?linkedin\.com/.+").unwrap();
        assert_eq!(linkedin.check(&json!("https://www.linkedin.com/in/ana")), None);
        assert_eq!(linkedin.check(&json!("https://linkedin.com/in/ana")), None);
        assert_eq!(
            linkedin.check(&json!("http://linkedin.com/in/ana")),
            Some(ErrorKind::PatternMismatch)
        );
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        assert!(ValidatorSpec::pattern("(unclosed").is_err());
    }

    #[test]
    fn test_email_shape() {
        let v = ValidatorSpec::Email;
        assert_eq!(v.check(&json!("user@example.com")), None);
        assert_eq!(v.check(&json!("user.name@domain.co.uk")), None);
        assert_eq!(v.check(&json!("invalid")), Some(ErrorKind::InvalidEmail));
        assert_eq!(v.check(&json!("@example.com")), Some(ErrorKind::InvalidEmail));
        assert_eq!(v.check(&json!("a@b")), Some(ErrorKind::InvalidEmail));
        assert_eq!(v.check(&json!("ana@example..com")), Some(ErrorKind::InvalidEmail));
        assert_eq!(v.check(&json!("ana souza@example.com")), Some(ErrorKind::InvalidEmail));
        assert_eq!(v.check(&json!("ana@example.c0m")), Some(ErrorKind::InvalidEmail));
        assert_eq!(v.check(&json!("")), None);
    }

    #[test]
    fn test_cpf_accepts_valid_numbers() {
        for cpf in VALID_CPFS {
            assert!(cpf_is_valid(cpf), "{cpf} should be valid");
            assert_eq!(ValidatorSpec::Cpf.check(&json!(cpf)), None);
        }
    }

    #[test]
    fn test_cpf_rejects_malformed_input() {
        for cpf in ["", "5299822472", "529982247251", "5299822472a", "529-982-247.25"] {
            assert!(!cpf_is_valid(cpf), "{cpf:?} should be invalid");
        }
        assert_eq!(
            ValidatorSpec::Cpf.check(&json!("123.456.789-00")),
            Some(ErrorKind::ChecksumInvalid)
        );
    }

    #[test]
    fn test_cpf_rejects_repeated_digits() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert!(!cpf_is_valid(&cpf), "{cpf} should be invalid");
        }
    }

    #[test]
    fn test_cpf_detects_single_digit_mutations() {
        let mut total = 0;
        let mut rejected = 0;
        for cpf in ["52998224725", "11144477735"] {
            for position in 0..11 {
                for replacement in '0'..='9' {
                    let mut chars: Vec<char> = cpf.chars().collect();
                    if chars[position] == replacement {
                        continue;
                    }
                    chars[position] = replacement;
                    let mutated: String = chars.into_iter().collect();
                    total += 1;
                    if !cpf_is_valid(&mutated) {
                        rejected += 1;
                    }
                }
            }
        }
        assert!(rejected * 10 >= total * 9, "{rejected}/{total} rejected");
    }

    #[test]
    fn test_fields_match() {
        let rule = GroupValidatorSpec::fields_match("senha", "repitaSenha");
        let GroupValidatorSpec::FieldsMatch {
            field,
            confirmation,
        } = &rule;
        assert_eq!(field, "senha");
        assert_eq!(confirmation, "repitaSenha");
    }

    #[tokio::test]
    async fn test_already_exists() {
        let v = AsyncValidatorSpec::AlreadyExists(Arc::new(Taken(&["f@g.com"])));
        assert_eq!(v.check(&json!("f@g.com")).await, Some(ErrorKind::AlreadyExists));
        assert_eq!(v.check(&json!("new@g.com")).await, None);
    }

    #[tokio::test]
    async fn test_already_exists_skips_empty_values() {
        let v = AsyncValidatorSpec::AlreadyExists(Arc::new(Unreachable));
        assert_eq!(v.check(&json!("")).await, None);
        assert_eq!(v.check(&Value::Null).await, None);
    }

    #[tokio::test]
    async fn test_already_exists_tolerates_lookup_failure() {
        let v = AsyncValidatorSpec::AlreadyExists(Arc::new(Broken));
        assert_eq!(v.check(&json!("f@g.com")).await, None);
    }

    #[test]
    fn test_error_kind_keys() {
        assert_eq!(ErrorKind::MinLength.as_str(), "minLength");
        assert_eq!(
            serde_json::to_value(ErrorKind::AlreadyExists).unwrap(),
            json!("alreadyExists")
        );
    }
}
