//! Type variable substitution

use crate::types::{Name, Type};
use std::collections::BTreeMap;

/// Bindings from type variable names to types
///
/// Application is simultaneous: a bound type is inserted as-is and never
/// substituted again, so a binding that mentions another bound variable
/// cannot be captured by it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Substitution {
    bindings: BTreeMap<Name, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `ty`, returning the previous binding
    pub fn insert(&mut self, name: impl Into<Name>, ty: Type) -> Option<Type> {
        self.bindings.insert(name.into(), ty)
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Bindings ordered by variable name
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Type)> {
        self.bindings.iter()
    }

    /// Bound types ordered by variable name
    pub fn values(&self) -> impl Iterator<Item = &Type> {
        self.bindings.values()
    }

    /// Rename every variable in `names` to a name qualified by `discriminator`
    ///
    /// Applying the result to a declaration's types keeps its own type
    /// variables apart from the variables of whoever requests it.
    pub fn freshening<'a>(names: impl IntoIterator<Item = &'a Name>, discriminator: &str) -> Self {
        let bindings = names
            .into_iter()
            .map(|name| {
                let fresh = Type::param(format!("{}#{}", name, discriminator));
                (name.clone(), fresh)
            })
            .collect();
        Self { bindings }
    }

    /// Apply the bindings to `ty`
    pub fn apply(&self, ty: &Type) -> Type {
        if self.is_empty() {
            return ty.clone();
        }
        ty.substitute(self)
    }
}

impl FromIterator<(Name, Type)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Name, Type)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl Type {
    /// Structural replacement of type variables
    ///
    /// An occurrence `T?` bound to a non-null type stays nullable, and the
    /// tags of the occurrence are added to the bound type.
    pub fn substitute(&self, substitution: &Substitution) -> Type {
        if self.is_parameter() {
            if let Some(bound) = substitution.get(self.name()) {
                let mut result = bound.clone();
                if self.is_nullable() && !result.is_nullable() {
                    result = result.nullable();
                }
                if self.is_null_compatible() && !result.is_null_compatible() {
                    result = result.null_compatible();
                }
                if !self.tags().is_empty() {
                    let tags = result.tags().iter().chain(self.tags()).cloned().collect::<Vec<_>>();
                    result = result.with_tags(tags);
                }
                return result;
            }
            return self.clone();
        }

        if self.arguments().is_empty() {
            return self.clone();
        }

        let arguments = self
            .arguments()
            .iter()
            .map(|argument| argument.substitute(substitution))
            .collect();
        self.with_arguments(arguments)
    }

    /// Rename this type's variables so they cannot collide with a caller's
    pub fn freshen(&self, discriminator: &str) -> Type {
        let names = self.parameters();
        Substitution::freshening(&names, discriminator).apply(self)
    }
}
