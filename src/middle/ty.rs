use std::rc::Rc;

use itertools::Itertools;

use crate::middle::frame::WORD_SIZE;

/// A resolved (structural) type as computed by the type checker. Type names
/// never show up here, they are already replaced by the type they stand for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// integer
    Int,
    /// logical
    Log,
    /// string, represented as a pointer to NUL terminated bytes
    Str,
    /// The type of expressions which are only evaluated for their effect
    /// (assignments, loops, conditionals)
    Void,
    /// arr[size] element
    ///
    /// Stored inline wherever it is declared
    Array { size: usize, element: Rc<Type> },
    Function {
        parameters: Rc<[Type]>,
        result: Rc<Type>,
    },
}

impl Type {
    pub fn array(size: usize, element: Type) -> Self {
        Self::Array {
            size,
            element: Rc::new(element),
        }
    }

    pub fn function(parameters: impl IntoIterator<Item = Type>, result: Type) -> Self {
        Self::Function {
            parameters: parameters.into_iter().collect(),
            result: Rc::new(result),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// Number of bytes a value of this type occupies in memory
    pub fn size_in_bytes(&self) -> i64 {
        match self {
            Type::Int | Type::Log | Type::Str => WORD_SIZE,
            Type::Void => 0,
            Type::Array { size, element } => *size as i64 * element.size_in_bytes(),
            // functions are never stored, only their label is referenced
            Type::Function { .. } => WORD_SIZE,
        }
    }

    /// Number of bytes a value of this type occupies in a parameter slot.
    /// Arrays are passed by reference so they only take up a single word.
    pub fn size_in_bytes_as_param(&self) -> i64 {
        match self {
            Type::Array { .. } => WORD_SIZE,
            _ => self.size_in_bytes(),
        }
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "integer"),
            Type::Log => write!(f, "logical"),
            Type::Str => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Array { size, element } => write!(f, "arr[{size}] {element}"),
            Type::Function { parameters, result } => {
                write!(f, "({}) -> {result}", parameters.iter().join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_arrays_multiply_their_sizes() {
        let matrix = Type::array(3, Type::array(4, Type::Int));

        assert_eq!(matrix.size_in_bytes(), 3 * 4 * WORD_SIZE);
        assert_eq!(matrix.size_in_bytes_as_param(), WORD_SIZE);
    }

    #[test]
    fn atoms_take_one_word_everywhere() {
        for ty in [Type::Int, Type::Log, Type::Str] {
            assert_eq!(ty.size_in_bytes(), WORD_SIZE);
            assert_eq!(ty.size_in_bytes_as_param(), WORD_SIZE);
        }
    }

    #[test]
    fn display_matches_source_syntax() {
        let ty = Type::function([Type::array(2, Type::Log), Type::Int], Type::Str);

        assert_eq!(ty.to_string(), "(arr[2] logical, integer) -> string");
    }
}
