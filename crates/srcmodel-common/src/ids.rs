//! Stable handles shared by the syntax and binder crates.
//!
//! Parent/child and declaration/definition relationships are cyclic in the
//! object model. They are stored as `u32` handles into arenas and stores
//! instead of pointers, with `0` reserved as the invalid handle.

use serde::Serialize;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
        pub struct $name(pub u32);

        impl $name {
            /// Sentinel for "no handle".
            pub const INVALID: $name = $name(0);

            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != 0
            }

            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// A declaration node in a `DeclArena`.
    DeclId
);
define_id!(
    /// A named type definition (class, struct, interface, enum, delegate).
    TypeDefId
);
define_id!(
    /// A unit namespace (root or nested).
    NamespaceDefId
);
define_id!(
    /// A field, method, property or event definition.
    MemberDefId
);
define_id!(
    /// A unified generic parameter of a type or method.
    GenericParamId
);
define_id!(
    /// An interned generic type instance.
    InstanceId
);
define_id!(
    /// One compilation unit (generation).
    UnitId
);

/// Platform types the engine synthesizes code against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BuiltinType {
    Object,
    ValueType,
    Enum,
    MulticastDelegate,
    Void,
    Boolean,
    Int32,
    Int64,
    String,
    IntPtr,
    IAsyncResult,
    AsyncCallback,
    Attribute,
    ExtensionAttribute,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 14] = [
        BuiltinType::Object,
        BuiltinType::ValueType,
        BuiltinType::Enum,
        BuiltinType::MulticastDelegate,
        BuiltinType::Void,
        BuiltinType::Boolean,
        BuiltinType::Int32,
        BuiltinType::Int64,
        BuiltinType::String,
        BuiltinType::IntPtr,
        BuiltinType::IAsyncResult,
        BuiltinType::AsyncCallback,
        BuiltinType::Attribute,
        BuiltinType::ExtensionAttribute,
    ];

    pub fn full_name(self) -> &'static str {
        match self {
            BuiltinType::Object => "System.Object",
            BuiltinType::ValueType => "System.ValueType",
            BuiltinType::Enum => "System.Enum",
            BuiltinType::MulticastDelegate => "System.MulticastDelegate",
            BuiltinType::Void => "System.Void",
            BuiltinType::Boolean => "System.Boolean",
            BuiltinType::Int32 => "System.Int32",
            BuiltinType::Int64 => "System.Int64",
            BuiltinType::String => "System.String",
            BuiltinType::IntPtr => "System.IntPtr",
            BuiltinType::IAsyncResult => "System.IAsyncResult",
            BuiltinType::AsyncCallback => "System.AsyncCallback",
            BuiltinType::Attribute => "System.Attribute",
            BuiltinType::ExtensionAttribute => {
                "System.Runtime.CompilerServices.ExtensionAttribute"
            }
        }
    }

    /// Keyword spelling, for the types that have one.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            BuiltinType::Object => Some("object"),
            BuiltinType::Void => Some("void"),
            BuiltinType::Boolean => Some("bool"),
            BuiltinType::Int32 => Some("int"),
            BuiltinType::Int64 => Some("long"),
            BuiltinType::String => Some("string"),
            _ => None,
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<BuiltinType> {
        BuiltinType::ALL
            .into_iter()
            .find(|ty| ty.keyword() == Some(keyword))
    }

    pub fn is_interface(self) -> bool {
        matches!(self, BuiltinType::IAsyncResult)
    }

    pub fn is_value_type(self) -> bool {
        matches!(
            self,
            BuiltinType::Boolean | BuiltinType::Int32 | BuiltinType::Int64 | BuiltinType::IntPtr
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(self, BuiltinType::Int32 | BuiltinType::Int64)
    }

    /// The builtin base class, `None` for the root object type and interfaces.
    pub fn base_class(self) -> Option<BuiltinType> {
        match self {
            BuiltinType::Object | BuiltinType::IAsyncResult => None,
            BuiltinType::Enum => Some(BuiltinType::ValueType),
            BuiltinType::AsyncCallback => Some(BuiltinType::MulticastDelegate),
            BuiltinType::ExtensionAttribute => Some(BuiltinType::Attribute),
            ty if ty.is_value_type() => Some(BuiltinType::ValueType),
            _ => Some(BuiltinType::Object),
        }
    }
}

/// A reference to a type, as produced by resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeRef {
    Def(TypeDefId),
    Builtin(BuiltinType),
    GenericParam(GenericParamId),
    Instance(InstanceId),
    /// Placeholder substituted for anything that failed to resolve.
    Error,
}

impl TypeRef {
    pub const OBJECT: TypeRef = TypeRef::Builtin(BuiltinType::Object);
    pub const VOID: TypeRef = TypeRef::Builtin(BuiltinType::Void);
    pub const BOOLEAN: TypeRef = TypeRef::Builtin(BuiltinType::Boolean);
    pub const INT32: TypeRef = TypeRef::Builtin(BuiltinType::Int32);

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, TypeRef::Error)
    }

    pub fn as_def(self) -> Option<TypeDefId> {
        match self {
            TypeRef::Def(id) => Some(id),
            _ => None,
        }
    }
}

/// What an expression resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Resolved {
    Namespace(NamespaceDefId),
    Type(TypeRef),
    /// The first member of a member group (field, method, property, event).
    Member(MemberDefId),
    /// A parameter declaration in scope.
    Parameter(DeclId),
    Nothing,
}

impl Resolved {
    pub fn is_nothing(self) -> bool {
        matches!(self, Resolved::Nothing)
    }

    pub fn as_type(self) -> Option<TypeRef> {
        match self {
            Resolved::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_namespace(self) -> Option<NamespaceDefId> {
        match self {
            Resolved::Namespace(ns) => Some(ns),
            _ => None,
        }
    }
}
