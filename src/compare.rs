use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// How an expected sequence is matched against the actual one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceMatch {
    /// Elements are compared pairwise up to the shorter length. Expected
    /// elements past the end of the actual sequence are not checked.
    #[default]
    Truncate,
    /// Like `Truncate`, but an actual sequence shorter than the expected one
    /// is a mismatch.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a response body, rendered as
/// `field > nested[2]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.to_string()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<root>");
        }

        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, " > {key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }

        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Mismatch {
    #[error("field `{path}` is missing from the response")]
    MissingField { path: FieldPath },

    #[error("field `{path}` should be {expected}, got {actual}")]
    TypeMismatch {
        path: FieldPath,
        expected: &'static str,
        actual: Value,
    },

    #[error("field `{path}` should be {expected}, got {actual}")]
    ValueMismatch {
        path: FieldPath,
        expected: Value,
        actual: Value,
    },

    #[error("field `{path}` should have at least {expected_len} elements, got {actual_len}")]
    MissingElements {
        path: FieldPath,
        expected_len: usize,
        actual_len: usize,
    },
}

impl Mismatch {
    pub fn path(&self) -> &FieldPath {
        match self {
            Mismatch::MissingField { path }
            | Mismatch::TypeMismatch { path, .. }
            | Mismatch::ValueMismatch { path, .. }
            | Mismatch::MissingElements { path, .. } => path,
        }
    }
}

/// Checks that `actual` contains everything `expected` describes.
///
/// Objects match when every expected key is present with a matching value;
/// keys only present in `actual` are ignored. Arrays match element by element
/// according to `sequences`. Anything else must be equal.
pub fn assert_partial(
    expected: &Value,
    actual: &Value,
    sequences: SequenceMatch,
) -> Result<(), Mismatch> {
    compare(expected, actual, &FieldPath::root(), sequences)
}

fn compare(
    expected: &Value,
    actual: &Value,
    path: &FieldPath,
    sequences: SequenceMatch,
) -> Result<(), Mismatch> {
    match expected {
        Value::Object(expected_fields) => {
            let Value::Object(actual_fields) = actual else {
                return Err(Mismatch::TypeMismatch {
                    path: path.clone(),
                    expected: "an object",
                    actual: actual.clone(),
                });
            };

            for (key, expected_value) in expected_fields {
                let field_path = path.key(key);
                let Some(actual_value) = actual_fields.get(key) else {
                    return Err(Mismatch::MissingField { path: field_path });
                };

                compare(expected_value, actual_value, &field_path, sequences)?;
            }

            Ok(())
        }

        Value::Array(expected_items) => {
            let Value::Array(actual_items) = actual else {
                return Err(Mismatch::TypeMismatch {
                    path: path.clone(),
                    expected: "an array",
                    actual: actual.clone(),
                });
            };

            if sequences == SequenceMatch::Strict && actual_items.len() < expected_items.len() {
                return Err(Mismatch::MissingElements {
                    path: path.clone(),
                    expected_len: expected_items.len(),
                    actual_len: actual_items.len(),
                });
            }

            for (index, (expected_item, actual_item)) in
                expected_items.iter().zip(actual_items).enumerate()
            {
                compare(expected_item, actual_item, &path.index(index), sequences)?;
            }

            Ok(())
        }

        scalar => {
            if scalars_equal(scalar, actual) {
                Ok(())
            } else {
                Err(Mismatch::ValueMismatch {
                    path: path.clone(),
                    expected: scalar.clone(),
                    actual: actual.clone(),
                })
            }
        }
    }
}

/// Numbers compare by value, so `2` matches `2.0`. Other scalars must be
/// identical.
fn scalars_equal(expected: &Value, actual: &Value) -> bool {
    let (Value::Number(expected), Value::Number(actual)) = (expected, actual) else {
        return expected == actual;
    };

    if let (Some(e), Some(a)) = (expected.as_i64(), actual.as_i64()) {
        return e == a;
    }
    if let (Some(e), Some(a)) = (expected.as_u64(), actual.as_u64()) {
        return e == a;
    }
    if (expected.is_i64() || expected.is_u64()) && (actual.is_i64() || actual.is_u64()) {
        return false;
    }

    match (expected.as_f64(), actual.as_f64()) {
        (Some(e), Some(a)) => e == a,
        _ => false,
    }
}
