//! Built-in EL functions.
//!
//! Two namespaces: `record:` reads the bound record, `str:` works on text.

use super::check::Ty;
use std::fmt;

/// How a function argument is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Param {
    /// Must be a string: a field path or attribute name.
    Path,
    /// Coerced to text; anything but a list or map.
    Text,
    /// Any value.
    Any,
}

/// A built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `record:value(path)`
    Value,
    /// `record:exists(path)`
    Exists,
    /// `record:valueOrDefault(path, default)`
    ValueOrDefault,
    /// `record:attribute(name)`
    Attribute,
    /// `record:id()`
    Id,
    /// `str:length(s)`
    Length,
    /// `str:toUpper(s)`
    ToUpper,
    /// `str:toLower(s)`
    ToLower,
    /// `str:trim(s)`
    Trim,
    /// `str:contains(s, part)`
    Contains,
    /// `str:startsWith(s, prefix)`
    StartsWith,
    /// `str:endsWith(s, suffix)`
    EndsWith,
    /// `str:matches(s, 'regex')`
    Matches,
}

impl Function {
    /// Every built-in function, in documentation order.
    pub const ALL: [Self; 13] = [
        Self::Value,
        Self::Exists,
        Self::ValueOrDefault,
        Self::Attribute,
        Self::Id,
        Self::Length,
        Self::ToUpper,
        Self::ToLower,
        Self::Trim,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
        Self::Matches,
    ];

    /// Look up a function by its qualified `ns:name`.
    #[must_use]
    pub fn resolve(qualified: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == qualified)
    }

    /// Qualified name, e.g. `"record:value"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Value => "record:value",
            Self::Exists => "record:exists",
            Self::ValueOrDefault => "record:valueOrDefault",
            Self::Attribute => "record:attribute",
            Self::Id => "record:id",
            Self::Length => "str:length",
            Self::ToUpper => "str:toUpper",
            Self::ToLower => "str:toLower",
            Self::Trim => "str:trim",
            Self::Contains => "str:contains",
            Self::StartsWith => "str:startsWith",
            Self::EndsWith => "str:endsWith",
            Self::Matches => "str:matches",
        }
    }

    /// Call signature as written in expressions.
    #[must_use]
    pub fn signature(self) -> &'static str {
        match self {
            Self::Value => "record:value(path)",
            Self::Exists => "record:exists(path)",
            Self::ValueOrDefault => "record:valueOrDefault(path, default)",
            Self::Attribute => "record:attribute(name)",
            Self::Id => "record:id()",
            Self::Length => "str:length(s)",
            Self::ToUpper => "str:toUpper(s)",
            Self::ToLower => "str:toLower(s)",
            Self::Trim => "str:trim(s)",
            Self::Contains => "str:contains(s, part)",
            Self::StartsWith => "str:startsWith(s, prefix)",
            Self::EndsWith => "str:endsWith(s, suffix)",
            Self::Matches => "str:matches(s, 'regex')",
        }
    }

    /// One-line description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Value => "field at path; fails if the field does not exist",
            Self::Exists => "true if the field at path exists",
            Self::ValueOrDefault => "field at path, or default if it does not exist",
            Self::Attribute => "record attribute, or null if not set",
            Self::Id => "record source id",
            Self::Length => "number of characters",
            Self::ToUpper => "upper-cased text",
            Self::ToLower => "lower-cased text",
            Self::Trim => "text without surrounding whitespace",
            Self::Contains => "true if s contains part",
            Self::StartsWith => "true if s starts with prefix",
            Self::EndsWith => "true if s ends with suffix",
            Self::Matches => "true if the regex matches anywhere in s (pattern must be a literal)",
        }
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(self) -> usize {
        self.params().len()
    }

    /// Returns `true` for the `record:` namespace.
    #[must_use]
    pub fn reads_record(self) -> bool {
        matches!(
            self,
            Self::Value | Self::Exists | Self::ValueOrDefault | Self::Attribute | Self::Id
        )
    }

    pub(crate) fn params(self) -> &'static [Param] {
        match self {
            Self::Value | Self::Exists | Self::Attribute => &[Param::Path],
            Self::ValueOrDefault => &[Param::Path, Param::Any],
            Self::Id => &[],
            Self::Length | Self::ToUpper | Self::ToLower | Self::Trim => &[Param::Text],
            Self::Contains | Self::StartsWith | Self::EndsWith | Self::Matches => {
                &[Param::Text, Param::Text]
            }
        }
    }

    /// Statically known result type.
    pub(crate) fn returns(self) -> Ty {
        match self {
            Self::Value | Self::ValueOrDefault | Self::Attribute => Ty::Any,
            Self::Exists
            | Self::Contains
            | Self::StartsWith
            | Self::EndsWith
            | Self::Matches => Ty::Bool,
            Self::Id | Self::ToUpper | Self::ToLower | Self::Trim => Ty::String,
            Self::Length => Ty::Number,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
