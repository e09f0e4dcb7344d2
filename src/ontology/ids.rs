//! Vocabulary identifiers and class labels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier from its name
            pub fn new(name: impl AsRef<str>) -> Self {
                $name(Arc::from(name.as_ref()))
            }

            /// The identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                $name::new(name)
            }
        }
    };
}

identifier!(
    /// Atomic class name
    ClassId
);
identifier!(
    /// Object property (role) name
    RoleId
);
identifier!(
    /// Data property name
    DataPropertyId
);
identifier!(
    /// Named individual
    IndividualId
);

/// A conjunct or disjunct of a concept node: an atomic class or its negation
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    /// Atomic class `A`
    Atom(ClassId),
    /// Negated atomic class `¬A`
    Negated(ClassId),
}

impl Label {
    /// Shorthand for an atomic label
    pub fn atom(name: impl AsRef<str>) -> Self {
        Label::Atom(ClassId::new(name))
    }

    /// Shorthand for a negated label
    pub fn not(name: impl AsRef<str>) -> Self {
        Label::Negated(ClassId::new(name))
    }

    /// The underlying class
    pub fn class(&self) -> &ClassId {
        match self {
            Label::Atom(c) | Label::Negated(c) => c,
        }
    }

    /// Whether this is a negated label
    pub fn is_negated(&self) -> bool {
        matches!(self, Label::Negated(_))
    }

    /// The complementary label
    pub fn complement(&self) -> Label {
        match self {
            Label::Atom(c) => Label::Negated(c.clone()),
            Label::Negated(c) => Label::Atom(c.clone()),
        }
    }

    /// Syntactic length: 1 for `A`, 2 for `¬A`
    pub fn length(&self) -> usize {
        match self {
            Label::Atom(_) => 1,
            Label::Negated(_) => 2,
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Atom(c) => write!(f, "{}", c),
            Label::Negated(c) => write!(f, "¬{}", c),
        }
    }
}

impl From<ClassId> for Label {
    fn from(class: ClassId) -> Self {
        Label::Atom(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_complement_and_length() {
        let a = Label::atom("A");
        assert_eq!(a.complement(), Label::not("A"));
        assert_eq!(a.complement().complement(), a);
        assert_eq!(a.length(), 1);
        assert_eq!(Label::not("A").length(), 2);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::atom("Person").to_string(), "Person");
        assert_eq!(Label::not("Person").to_string(), "¬Person");
    }
}
