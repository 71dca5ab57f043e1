use std::fmt;

use itertools::Itertools;

/// The floating point formats the dialect knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    Half,
    BFloat,
    Single,
    Double,
}

impl FloatKind {
    pub const fn bit_width(self) -> u32 {
        match self {
            FloatKind::Half | FloatKind::BFloat => 16,
            FloatKind::Single => 32,
            FloatKind::Double => 64,
        }
    }

    /// The largest finite value of the format.
    pub const fn max_finite(self) -> f64 {
        match self {
            FloatKind::Half => 65504.0,
            FloatKind::BFloat => 3.389_531_389_251_535_5e38,
            FloatKind::Single => f32::MAX as f64,
            FloatKind::Double => f64::MAX,
        }
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            FloatKind::Half => "f16",
            FloatKind::BFloat => "bf16",
            FloatKind::Single => "f32",
            FloatKind::Double => "f64",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "f16" => FloatKind::Half,
            "bf16" => FloatKind::BFloat,
            "f32" => FloatKind::Single,
            "f64" => FloatKind::Double,
            _ => return None,
        })
    }
}

/// A function signature, used both as a type and as the signature of `llvm.func`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub result: Type,
    pub params: Vec<Type>,
    /// Whether extra arguments are accepted after `params`.
    pub variadic: bool,
}

impl FunctionType {
    pub fn new(result: Type, params: Vec<Type>) -> Self {
        Self {
            result,
            params,
            variadic: false,
        }
    }

    pub fn returns_void(&self) -> bool {
        matches!(self.result, Type::Void)
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = self.params.iter().map(|x| x.to_string()).collect_vec();
        if self.variadic {
            params.push("...".to_string());
        }
        write!(f, "{} ({})", self.result, params.join(", "))
    }
}

/// A low level type, cheaply clonable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// An integer with the given bit width.
    Int(u32),
    Float(FloatKind),
    /// A typed pointer.
    Ptr(Box<Type>),
    /// A fixed size vector of scalars.
    Vector(u32, Box<Type>),
    /// A fixed size array.
    Array(u64, Box<Type>),
    Struct(Vec<Type>),
    Func(Box<FunctionType>),
}

impl Type {
    pub const fn i1() -> Self {
        Type::Int(1)
    }

    pub const fn i8() -> Self {
        Type::Int(8)
    }

    pub const fn i32() -> Self {
        Type::Int(32)
    }

    pub const fn i64() -> Self {
        Type::Int(64)
    }

    pub const fn f32() -> Self {
        Type::Float(FloatKind::Single)
    }

    pub const fn f64() -> Self {
        Type::Float(FloatKind::Double)
    }

    pub fn ptr(pointee: Type) -> Self {
        Type::Ptr(Box::new(pointee))
    }

    pub fn vector(lanes: u32, element: Type) -> Self {
        Type::Vector(lanes, Box::new(element))
    }

    pub fn array(len: u64, element: Type) -> Self {
        Type::Array(len, Box::new(element))
    }

    pub fn func(ty: FunctionType) -> Self {
        Type::Func(Box::new(ty))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float(_))
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array(..) | Type::Struct(_))
    }

    /// Types that can be held by an SSA value.
    pub fn is_first_class(&self) -> bool {
        !matches!(self, Type::Void | Type::Func(_))
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Vector(_, inner) | Type::Array(_, inner) => Some(inner),
            _ => None,
        }
    }

    pub fn lanes(&self) -> Option<u32> {
        match self {
            Type::Vector(lanes, _) => Some(*lanes),
            _ => None,
        }
    }

    /// The element type of a vector, or the type itself.
    pub fn scalar_type(&self) -> &Type {
        match self {
            Type::Vector(_, inner) => inner,
            other => other,
        }
    }

    pub fn int_width(&self) -> Option<u32> {
        match self.scalar_type() {
            Type::Int(width) => Some(*width),
            _ => None,
        }
    }

    pub fn float_width(&self) -> Option<u32> {
        match self.scalar_type() {
            Type::Float(kind) => Some(kind.bit_width()),
            _ => None,
        }
    }

    /// The comparison result shape for this operand type: `i1`, or a vector of `i1`.
    pub fn bool_like(&self) -> Type {
        match self {
            Type::Vector(lanes, _) => Type::vector(*lanes, Type::i1()),
            _ => Type::i1(),
        }
    }

    /// Size in bits for types whose layout doesn't depend on a data layout.
    pub fn primitive_size_in_bits(&self) -> Option<u64> {
        match self {
            Type::Int(width) => Some(u64::from(*width)),
            Type::Float(kind) => Some(u64::from(kind.bit_width())),
            Type::Vector(lanes, inner) => {
                Some(u64::from(*lanes) * inner.primitive_size_in_bits()?)
            }
            _ => None,
        }
    }

    /// Walks an aggregate type following `position`, as `extractvalue` does.
    pub fn aggregate_member(&self, position: &[i64]) -> Option<&Type> {
        let mut current = self;
        for index in position {
            let index = usize::try_from(*index).ok()?;
            current = match current {
                Type::Struct(fields) => fields.get(index)?,
                Type::Array(len, inner) if (index as u64) < *len => inner,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Int(width) => write!(f, "i{width}"),
            Type::Float(kind) => f.write_str(kind.keyword()),
            Type::Ptr(inner) => write!(f, "ptr<{inner}>"),
            Type::Vector(lanes, inner) => write!(f, "vector<{lanes} x {inner}>"),
            Type::Array(len, inner) => write!(f, "array<{len} x {inner}>"),
            Type::Struct(fields) => write!(f, "struct<({})>", fields.iter().join(", ")),
            Type::Func(func) => write!(f, "func<{func}>"),
        }
    }
}
