//! Structural types used to describe requests and candidates
//!
//! A [`Type`] is an immutable value: every "modifier" returns a new type.
//! Types are compared structurally, tags included.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Shared, cheaply clonable name
pub type Name = Arc<str>;

/// Opaque marker distinguishing producers of the same underlying shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Name);

impl Tag {
    /// Create a tag from its marker name
    pub fn new(name: impl Into<Name>) -> Self {
        Self(name.into())
    }

    /// The marker name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Whether a type names a classifier or a type variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// A class, interface or other named classifier
    #[default]
    Class,
    /// A type variable
    Parameter,
}

/// Immutable structural type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    name: Name,
    #[serde(default)]
    kind: TypeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<Type>,
    #[serde(default)]
    nullable: bool,
    /// A nullable producer marked this way may satisfy a non-null request
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    null_compatible: bool,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<Tag>,
}

impl Type {
    /// A classifier type without arguments
    pub fn named(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            arguments: Vec::new(),
            nullable: false,
            null_compatible: false,
            tags: BTreeSet::new(),
        }
    }

    /// A classifier type applied to `arguments`
    pub fn generic(name: impl Into<Name>, arguments: impl IntoIterator<Item = Type>) -> Self {
        Self {
            arguments: arguments.into_iter().collect(),
            ..Self::named(name)
        }
    }

    /// A type variable
    pub fn param(name: impl Into<Name>) -> Self {
        Self {
            kind: TypeKind::Parameter,
            ..Self::named(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> &Name {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn arguments(&self) -> &[Type] {
        &self.arguments
    }

    pub fn tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_null_compatible(&self) -> bool {
        self.null_compatible
    }

    pub fn is_parameter(&self) -> bool {
        self.kind == TypeKind::Parameter
    }

    /// The nullable variant of this type
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// The non-null variant of this type
    pub fn non_null(mut self) -> Self {
        self.nullable = false;
        self.null_compatible = false;
        self
    }

    /// A nullable type that is allowed to satisfy non-null requests
    pub fn null_compatible(mut self) -> Self {
        self.nullable = true;
        self.null_compatible = true;
        self
    }

    /// Add a tag
    pub fn tagged(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Replace the tag set
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Same shape, no tags
    pub fn untagged(mut self) -> Self {
        self.tags.clear();
        self
    }

    /// Same classifier applied to different arguments
    pub fn with_arguments(&self, arguments: Vec<Type>) -> Self {
        if self.arguments == arguments {
            return self.clone();
        }
        Self {
            arguments,
            ..self.clone()
        }
    }

    /// Whether any type variable occurs in this type
    pub fn has_parameters(&self) -> bool {
        self.is_parameter() || self.arguments.iter().any(Type::has_parameters)
    }

    /// Names of all type variables occurring in this type
    pub fn parameters(&self) -> BTreeSet<Name> {
        let mut names = BTreeSet::new();
        self.collect_parameters(&mut names);
        names
    }

    pub(crate) fn collect_parameters(&self, names: &mut BTreeSet<Name>) {
        if self.is_parameter() {
            names.insert(self.name.clone());
        }
        for argument in &self.arguments {
            argument.collect_parameters(names);
        }
    }

    /// Nesting depth, 1 for a type without arguments
    pub fn depth(&self) -> usize {
        self.arguments.iter().map(Type::depth).max().unwrap_or(0) + 1
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.tags {
            write!(f, "{} ", tag)?;
        }
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            write!(f, "<")?;
            for (index, argument) in self.arguments.iter().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", argument)?;
            }
            write!(f, ">")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ty = Type::generic(
            "Map",
            [Type::named("String"), Type::named("Int").nullable()],
        )
        .tagged("Config");
        assert_eq!(ty.to_string(), "@Config Map<String, Int?>");
    }

    #[test]
    fn test_modifiers_produce_new_values() {
        let base = Type::named("Foo");
        let tagged = base.clone().tagged("a");
        assert!(base.tags().is_empty());
        assert_eq!(tagged.tags().len(), 1);
        assert_ne!(base, tagged);
        assert_eq!(tagged.untagged(), base);
    }

    #[test]
    fn test_null_compatible_implies_nullable() {
        let ty = Type::named("Foo").null_compatible();
        assert!(ty.is_nullable());
        assert!(ty.is_null_compatible());
        let ty = ty.non_null();
        assert!(!ty.is_nullable());
        assert!(!ty.is_null_compatible());
    }

    #[test]
    fn test_parameters() {
        let ty = Type::generic(
            "Pair",
            [Type::param("A"), Type::generic("List", [Type::param("B")])],
        );
        assert!(ty.has_parameters());
        let names: Vec<_> = ty.parameters().into_iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(ty.depth(), 3);
        assert!(!Type::named("Foo").has_parameters());
    }

    #[test]
    fn test_serde_defaults() {
        let ty: Type = serde_json::from_str(r#"{"name":"Foo","tags":["primary"]}"#).unwrap();
        assert_eq!(ty, Type::named("Foo").tagged("primary"));
        assert_eq!(ty.kind(), TypeKind::Class);
    }
}
