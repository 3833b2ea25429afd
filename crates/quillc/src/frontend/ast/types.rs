//! Type syntax

use crate::common::Span;
use std::fmt;

/// Built-in type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    Bool,
    Void,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Int => "int",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::UInt => "uint",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Void => "void",
        }
    }

    /// Width in bits; `int`/`uint` are 32 bits, `void` is 0
    pub fn bits(self) -> u8 {
        match self {
            PrimitiveType::Bool => 1,
            PrimitiveType::Int8 | PrimitiveType::UInt8 => 8,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 16,
            PrimitiveType::Int
            | PrimitiveType::Int32
            | PrimitiveType::UInt
            | PrimitiveType::UInt32
            | PrimitiveType::Float => 32,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Double => 64,
            PrimitiveType::Void => 0,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveType::Int
                | PrimitiveType::Int8
                | PrimitiveType::Int16
                | PrimitiveType::Int32
                | PrimitiveType::Int64
                | PrimitiveType::Float
                | PrimitiveType::Double
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// int, uint8, double, bool, void
    Primitive(PrimitiveType),
    /// Point, geo.Point, Box<int>
    Named { path: Vec<String>, args: Vec<TypeExpr> },
    /// [T; N]
    Array { element: Box<TypeExpr>, len: u64 },
    /// &T
    Reference(Box<TypeExpr>),
    /// func(T, U) => R
    Function { params: Vec<TypeExpr>, ret: Option<Box<TypeExpr>> },
    /// Self
    SelfType,
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Primitive(p) => write!(f, "{}", p),
            TypeExprKind::Named { path, args } => {
                write!(f, "{}", path.join("."))?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            TypeExprKind::Array { element, len } => write!(f, "[{}; {}]", element, len),
            TypeExprKind::Reference(inner) => write!(f, "&{}", inner),
            TypeExprKind::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(ToString::to_string).collect();
                write!(f, "func({})", params.join(", "))?;
                if let Some(ret) = ret {
                    write!(f, " => {}", ret)?;
                }
                Ok(())
            }
            TypeExprKind::SelfType => write!(f, "Self"),
        }
    }
}
