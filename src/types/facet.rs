use serde::{Serialize, Serializer};

/// Something with a stable identity and a display name.
pub trait Identifiable {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// A value dimension that can be filtered on, with labels for the sentinels.
pub trait Faceted: Identifiable + Clone {
    const ANY_LABEL: &'static str;
    const UNKNOWN_LABEL: &'static str;
}

/// A filter choice over a facet dimension.
///
/// `Any` disables the dimension, `Unknown` stands for "no value on the issue".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet<T> {
    Any,
    Unknown,
    Value(T),
}

const ANY_ID: &str = "*";
const UNKNOWN_ID: &str = "";

impl<T: Faceted> Facet<T> {
    /// Facet for the value an issue actually carries.
    pub fn of(value: Option<&T>) -> Self {
        match value {
            Some(v) => Facet::Value(v.clone()),
            None => Facet::Unknown,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Facet::Any)
    }

    /// Id equality against an issue value; `Any` matches everything.
    pub fn matches(&self, value: Option<&T>) -> bool {
        match self {
            Facet::Any => true,
            _ => self.id() == value.map_or(UNKNOWN_ID, Identifiable::id),
        }
    }

    /// Display name of an issue value, with the unknown label for `None`.
    pub fn label_of(value: Option<&T>) -> &str {
        value.map_or(T::UNKNOWN_LABEL, Identifiable::name)
    }
}

impl<T: Faceted> Identifiable for Facet<T> {
    fn id(&self) -> &str {
        match self {
            Facet::Any => ANY_ID,
            Facet::Unknown => UNKNOWN_ID,
            Facet::Value(v) => v.id(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Facet::Any => T::ANY_LABEL,
            Facet::Unknown => T::UNKNOWN_LABEL,
            Facet::Value(v) => v.name(),
        }
    }
}

impl<T: Faceted> Serialize for Facet<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}
