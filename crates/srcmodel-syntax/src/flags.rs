//! Modifier and kind flags carried by declarations.

use bitflags::bitflags;

bitflags! {
    /// Source modifiers plus the few compiler-set markers synthesized
    /// declarations carry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const INTERNAL = 1 << 2;
        const PRIVATE = 1 << 3;
        const STATIC = 1 << 4;
        const ABSTRACT = 1 << 5;
        const SEALED = 1 << 6;
        const VIRTUAL = 1 << 7;
        const OVERRIDE = 1 << 8;
        const NEW = 1 << 9;
        const PARTIAL = 1 << 10;
        const EXTERN = 1 << 11;
        const READONLY = 1 << 12;
        const CONST = 1 << 13;
        const VOLATILE = 1 << 14;
        const UNSAFE = 1 << 15;
        /// First parameter is declared with `this`.
        const EXTENSION = 1 << 16;
        /// Contract `[Pure]` marker; calls to pure methods have no side effects.
        const PURE = 1 << 17;
        const SPECIAL_NAME = 1 << 20;
        const COMPILER_GENERATED = 1 << 21;

        const VISIBILITY = Self::PUBLIC.bits()
            | Self::PROTECTED.bits()
            | Self::INTERNAL.bits()
            | Self::PRIVATE.bits();
    }
}

impl Modifiers {
    /// The visibility spelled by these modifiers, if any was spelled.
    pub fn visibility(self) -> Option<Visibility> {
        let v = self & Modifiers::VISIBILITY;
        if v.is_empty() {
            return None;
        }
        Some(if v.contains(Modifiers::PUBLIC) {
            Visibility::Public
        } else if v.contains(Modifiers::PROTECTED | Modifiers::INTERNAL) {
            Visibility::ProtectedInternal
        } else if v.contains(Modifiers::PROTECTED) {
            Visibility::Protected
        } else if v.contains(Modifiers::INTERNAL) {
            Visibility::Internal
        } else {
            Visibility::Private
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    Private,
    Protected,
    Internal,
    ProtectedInternal,
    Public,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

impl TypeKind {
    pub fn is_value_type(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Enum)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

bitflags! {
    /// Special constraints of a generic parameter declaration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GenericConstraints: u8 {
        const REFERENCE_TYPE = 1 << 0;
        const VALUE_TYPE = 1 << 1;
        const DEFAULT_CONSTRUCTOR = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ParameterModifier {
    #[default]
    None,
    Ref,
    Out,
    Params,
    /// The receiver of an extension method.
    This,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeTarget {
    Assembly,
    Module,
    Type,
    Method,
    Field,
    Property,
    Event,
    Parameter,
    Return,
}
