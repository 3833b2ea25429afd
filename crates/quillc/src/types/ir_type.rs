//! Target-level types for the IR
//!
//! These types carry no signedness: integers are plain bit vectors and the
//! instructions that care (division, comparison, casts) say how to read them.

use std::fmt;

/// Target-independent IR type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    /// Void type (no value)
    Void,

    /// Integer type of the given width; `Int(1)` is a boolean
    Int(u8),

    /// IEEE floating point, 32 or 64 bits
    Float(u8),

    /// Pointer to a value of the inner type
    Pointer(Box<IrType>),

    /// Fixed-length array
    Array {
        element: Box<IrType>,
        count: u64,
    },

    /// Named aggregate, defined in the module's struct table
    Struct(String),

    /// Function type
    Function {
        params: Vec<IrType>,
        return_type: Box<IrType>,
    },
}

impl IrType {
    pub fn void() -> Self {
        Self::Void
    }

    pub fn bool() -> Self {
        Self::Int(1)
    }

    pub fn int(bits: u8) -> Self {
        Self::Int(bits)
    }

    pub fn float(bits: u8) -> Self {
        Self::Float(bits)
    }

    pub fn ptr(inner: IrType) -> Self {
        Self::Pointer(Box::new(inner))
    }

    pub fn array(element: IrType, count: u64) -> Self {
        Self::Array { element: Box::new(element), count }
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::Struct(name.into())
    }

    pub fn function(params: Vec<IrType>, return_type: IrType) -> Self {
        Self::Function { params, return_type: Box::new(return_type) }
    }

    // ==================== Type queries ====================

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, IrType::Int(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, IrType::Int(1))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::Float(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, IrType::Pointer(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, IrType::Struct(_) | IrType::Array { .. })
    }

    /// Get the element type if this is a pointer or array
    pub fn element_type(&self) -> Option<&IrType> {
        match self {
            IrType::Pointer(inner) => Some(inner),
            IrType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Bit width of integer and float types
    pub fn bits(&self) -> Option<u8> {
        match self {
            IrType::Int(bits) | IrType::Float(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Names of every struct this type refers to, directly or nested
    pub fn referenced_structs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            IrType::Struct(name) => out.push(name),
            IrType::Pointer(inner) => inner.referenced_structs(out),
            IrType::Array { element, .. } => element.referenced_structs(out),
            IrType::Function { params, return_type } => {
                for param in params {
                    param.referenced_structs(out);
                }
                return_type.referenced_structs(out);
            }
            IrType::Void | IrType::Int(_) | IrType::Float(_) => {}
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(bits) => write!(f, "i{}", bits),
            IrType::Float(bits) => write!(f, "f{}", bits),
            IrType::Pointer(inner) => write!(f, "ptr<{}>", inner),
            IrType::Array { element, count } => write!(f, "[{} x {}]", count, element),
            IrType::Struct(name) => write!(f, "%{}", name),
            IrType::Function { params, return_type } => {
                write!(f, "fn(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param)?;
                }
                write!(f, ") -> {}", return_type)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(IrType::int(32).to_string(), "i32");
        assert_eq!(IrType::ptr(IrType::structure("Point")).to_string(), "ptr<%Point>");
        assert_eq!(IrType::array(IrType::int(8), 4).to_string(), "[4 x i8]");
        assert_eq!(
            IrType::function(vec![IrType::int(32)], IrType::void()).to_string(),
            "fn(i32) -> void"
        );
    }

    #[test]
    fn test_referenced_structs_nested() {
        let ty = IrType::function(
            vec![IrType::ptr(IrType::structure("A"))],
            IrType::array(IrType::structure("B"), 2),
        );
        let mut names = Vec::new();
        ty.referenced_structs(&mut names);
        assert_eq!(names, vec!["A", "B"]);
    }
}
