use std::{collections::BTreeMap, fmt};

use itertools::Itertools;

use super::types::Type;

/// Attribute dictionary of an operation, ordered by name so printing is stable.
pub type Attributes = BTreeMap<String, Attribute>;

/// An attribute restricted to a closed set of named integer codes.
///
/// The textual spelling is the keyword, any binary encoding uses the code.
pub trait EnumAttribute: Copy + Sized + 'static {
    const KIND: EnumKind;
    const ALL: &'static [Self];

    fn code(self) -> u64;
    fn keyword(self) -> &'static str;

    fn from_code(code: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|x| x.code() == code)
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|x| x.keyword() == keyword)
    }
}

macro_rules! enum_attribute {
    (
        $(#[$meta:meta])*
        $name:ident => $kind:ident {
            $($variant:ident = $code:literal => $keyword:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $code),+
        }

        impl EnumAttribute for $name {
            const KIND: EnumKind = EnumKind::$kind;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn code(self) -> u64 {
                self as u64
            }

            fn keyword(self) -> &'static str {
                match self {
                    $(Self::$variant => $keyword),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.keyword())
            }
        }
    };
}

enum_attribute! {
    /// Integer comparison predicates of `llvm.icmp`.
    IntPredicate => IntPredicate {
        Eq = 0 => "eq",
        Ne = 1 => "ne",
        Slt = 2 => "slt",
        Sle = 3 => "sle",
        Sgt = 4 => "sgt",
        Sge = 5 => "sge",
        Ult = 6 => "ult",
        Ule = 7 => "ule",
        Ugt = 8 => "ugt",
        Uge = 9 => "uge",
    }
}

enum_attribute! {
    /// Float comparison predicates of `llvm.fcmp`, including the two constant ones.
    FloatPredicate => FloatPredicate {
        False = 0 => "_false",
        Oeq = 1 => "oeq",
        Ogt = 2 => "ogt",
        Oge = 3 => "oge",
        Olt = 4 => "olt",
        Ole = 5 => "ole",
        One = 6 => "one",
        Ord = 7 => "ord",
        Ueq = 8 => "ueq",
        Ugt = 9 => "ugt",
        Uge = 10 => "uge",
        Ult = 11 => "ult",
        Ule = 12 => "ule",
        Une = 13 => "une",
        Uno = 14 => "uno",
        True = 15 => "_true",
    }
}

enum_attribute! {
    /// Linkage of globals and functions.
    Linkage => Linkage {
        Private = 0 => "private",
        Internal = 1 => "internal",
        AvailableExternally = 2 => "available_externally",
        Linkonce = 3 => "linkonce",
        Weak = 4 => "weak",
        Common = 5 => "common",
        Appending = 6 => "appending",
        ExternWeak = 7 => "extern_weak",
        LinkonceOdr = 8 => "linkonce_odr",
        WeakOdr = 9 => "weak_odr",
        External = 10 => "external",
    }
}

/// Which closed set an enum attribute value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumKind {
    IntPredicate,
    FloatPredicate,
    Linkage,
}

impl EnumKind {
    pub const fn name(self) -> &'static str {
        match self {
            EnumKind::IntPredicate => "integer predicate",
            EnumKind::FloatPredicate => "float predicate",
            EnumKind::Linkage => "linkage",
        }
    }

    pub fn keyword(self, code: u64) -> Option<&'static str> {
        match self {
            EnumKind::IntPredicate => IntPredicate::from_code(code).map(|x| x.keyword()),
            EnumKind::FloatPredicate => FloatPredicate::from_code(code).map(|x| x.keyword()),
            EnumKind::Linkage => Linkage::from_code(code).map(|x| x.keyword()),
        }
    }

    pub fn code_of(self, keyword: &str) -> Option<u64> {
        match self {
            EnumKind::IntPredicate => IntPredicate::from_keyword(keyword).map(|x| x.code()),
            EnumKind::FloatPredicate => FloatPredicate::from_keyword(keyword).map(|x| x.code()),
            EnumKind::Linkage => Linkage::from_keyword(keyword).map(|x| x.code()),
        }
    }

    pub fn is_member(self, code: u64) -> bool {
        self.keyword(code).is_some()
    }

    /// All the keywords of this set, in code order.
    pub fn keywords(self) -> Vec<&'static str> {
        match self {
            EnumKind::IntPredicate => IntPredicate::ALL.iter().map(|x| x.keyword()).collect(),
            EnumKind::FloatPredicate => FloatPredicate::ALL.iter().map(|x| x.keyword()).collect(),
            EnumKind::Linkage => Linkage::ALL.iter().map(|x| x.keyword()).collect(),
        }
    }
}

/// A compile time constant attached to an operation.
#[derive(Debug, Clone)]
pub enum Attribute {
    /// A flag, present or not.
    Unit,
    Bool(bool),
    Integer { value: i64, ty: Type },
    Float { value: f64, ty: Type },
    String(String),
    Type(Type),
    /// A reference to a module level symbol, without the `@`.
    Symbol(String),
    Array(Vec<Attribute>),
    Enum { kind: EnumKind, code: u64 },
}

impl Attribute {
    pub fn int(value: i64, ty: Type) -> Self {
        Attribute::Integer { value, ty }
    }

    pub fn float(value: f64, ty: Type) -> Self {
        Attribute::Float { value, ty }
    }

    pub fn enumeration<E: EnumAttribute>(value: E) -> Self {
        Attribute::Enum {
            kind: E::KIND,
            code: value.code(),
        }
    }

    pub fn int_array(values: &[i64]) -> Self {
        Attribute::Array(
            values
                .iter()
                .map(|x| Attribute::int(*x, Type::i64()))
                .collect(),
        )
    }

    pub fn as_enum<E: EnumAttribute>(&self) -> Option<E> {
        match self {
            Attribute::Enum { kind, code } if *kind == E::KIND => E::from_code(*code),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(x) | Attribute::Symbol(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Attribute::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<Vec<i64>> {
        match self {
            Attribute::Array(items) => items.iter().map(|x| x.as_int()).collect(),
            _ => None,
        }
    }

    /// The type a literal attribute carries, if it is a literal.
    pub fn literal_type(&self) -> Option<Type> {
        match self {
            Attribute::Bool(_) => Some(Type::i1()),
            Attribute::Integer { ty, .. } | Attribute::Float { ty, .. } => Some(ty.clone()),
            Attribute::String(x) => Some(Type::array(x.len() as u64, Type::i8())),
            _ => None,
        }
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Attribute::Unit, Attribute::Unit) => true,
            (Attribute::Bool(a), Attribute::Bool(b)) => a == b,
            (
                Attribute::Integer { value: a, ty: ta },
                Attribute::Integer { value: b, ty: tb },
            ) => a == b && ta == tb,
            // Bitwise, so NaNs and signed zeros round trip.
            (Attribute::Float { value: a, ty: ta }, Attribute::Float { value: b, ty: tb }) => {
                a.to_bits() == b.to_bits() && ta == tb
            }
            (Attribute::String(a), Attribute::String(b)) => a == b,
            (Attribute::Type(a), Attribute::Type(b)) => a == b,
            (Attribute::Symbol(a), Attribute::Symbol(b)) => a == b,
            (Attribute::Array(a), Attribute::Array(b)) => a == b,
            (Attribute::Enum { kind: ka, code: a }, Attribute::Enum { kind: kb, code: b }) => {
                ka == kb && a == b
            }
            _ => false,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Unit => f.write_str("unit"),
            Attribute::Bool(value) => write!(f, "{value}"),
            Attribute::Integer { value, ty } => {
                if *ty == Type::i64() {
                    write!(f, "{value}")
                } else {
                    write!(f, "{value} : {ty}")
                }
            }
            Attribute::Float { value, ty } => {
                if value.is_finite() {
                    write!(f, "{value:?}")?;
                } else {
                    write!(f, "0x{:016X}", value.to_bits())?;
                }
                if *ty != Type::f64() || !value.is_finite() {
                    write!(f, " : {ty}")?;
                }
                Ok(())
            }
            Attribute::String(value) => {
                f.write_str("\"")?;
                for c in value.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c if c.is_ascii_graphic() || c == ' ' => write!(f, "{c}")?,
                        c => write!(f, "\\u{{{:x}}}", c as u32)?,
                    }
                }
                f.write_str("\"")
            }
            Attribute::Type(ty) => write!(f, "{ty}"),
            Attribute::Symbol(name) => write!(f, "@{name}"),
            Attribute::Array(items) => write!(f, "[{}]", items.iter().join(", ")),
            Attribute::Enum { kind, code } => match kind.keyword(*code) {
                Some(keyword) => f.write_str(keyword),
                None => write!(f, "{code}"),
            },
        }
    }
}
