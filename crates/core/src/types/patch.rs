//! Tri-state field for partial updates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field in a partial-update body.
///
/// JSON has three states for a key - missing, `null`, or a value - and
/// update semantics depend on telling them apart: a missing key leaves the
/// column alone, `null` clears a nullable column.
///
/// Fields must be declared with `#[serde(default)]` so a missing key
/// deserializes to [`Patch::Absent`]:
///
/// ```
/// use orderly_core::Patch;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Body {
///     #[serde(default)]
///     description: Patch<String>,
/// }
///
/// let body: Body = serde_json::from_str("{}").unwrap();
/// assert!(body.description.is_absent());
///
/// let body: Body = serde_json::from_str(r#"{"description": null}"#).unwrap();
/// assert!(body.description.is_null());
///
/// let body: Body = serde_json::from_str(r#"{"description": "hi"}"#).unwrap();
/// assert_eq!(body.description.value().map(String::as_str), Some("hi"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Patch<T> {
    /// Key not present; leave the field untouched.
    #[default]
    Absent,
    /// Explicit `null`.
    Null,
    /// New value.
    Value(T),
}

impl<T> Patch<T> {
    /// Returns `true` if the key was not supplied.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if the key was supplied as `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the supplied value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Null => None,
        }
    }

    /// Borrows the contained value.
    #[must_use]
    pub const fn as_ref(&self) -> Patch<&T> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Value(v) => Patch::Value(v),
        }
    }

    /// Maps the contained value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Value(v) => Patch::Value(f(v)),
        }
    }

    /// `None` when absent, `Some(None)` when null, `Some(Some(v))` otherwise.
    #[must_use]
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Self::Absent => None,
            Self::Null => Some(None),
            Self::Value(v) => Some(Some(v)),
        }
    }

    /// Applies the patch to an existing nullable value.
    pub fn apply_to(self, target: &mut Option<T>) {
        if let Some(next) = self.into_option() {
            *target = next;
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

/// Absent fields should be skipped with
/// `#[serde(skip_serializing_if = "Patch::is_absent")]`; otherwise they
/// serialize as `null`.
impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_some(v),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        quantity: Patch<i32>,
    }

    #[test]
    fn test_zero_is_a_value_not_absence() {
        let body: Body = serde_json::from_str(r#"{"quantity": 0}"#).unwrap();
        assert_eq!(body.quantity, Patch::Value(0));
    }

    #[test]
    fn test_apply_to() {
        let mut current = Some(5);
        Patch::Absent.apply_to(&mut current);
        assert_eq!(current, Some(5));

        Patch::Value(7).apply_to(&mut current);
        assert_eq!(current, Some(7));

        Patch::<i32>::Null.apply_to(&mut current);
        assert_eq!(current, None);
    }

    #[test]
    fn test_absent_is_skipped_when_serializing() {
        let json = serde_json::to_string(&Body {
            quantity: Patch::Absent,
        })
        .unwrap();
        assert_eq!(json, "{}");

        let json = serde_json::to_string(&Body {
            quantity: Patch::Null,
        })
        .unwrap();
        assert_eq!(json, r#"{"quantity":null}"#);
    }
}
