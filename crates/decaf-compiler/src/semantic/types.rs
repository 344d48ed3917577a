use std::collections::HashMap;

use decaf_common::CompileError;
use serde::Serialize;

/// Internal type representation for semantic analysis.
///
/// Types compare by exact equality; there are no implicit conversions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Int,
    Char,
    Boolean,
    Void,
    /// A registered struct, by name.
    Struct(String),
    /// Sentinel substituted after a violation so analysis can continue.
    Error,
}

impl Type {
    /// Map a built-in type name to its `Type`; anything else is a struct name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" => Type::Int,
            "char" => Type::Char,
            "boolean" => Type::Boolean,
            "void" => Type::Void,
            other => Type::Struct(other.to_string()),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Type::Int | Type::Char | Type::Boolean | Type::Void)
    }

    /// Human-readable name for error messages.
    pub fn display_name(&self) -> String {
        match self {
            Type::Int => "int".into(),
            Type::Char => "char".into(),
            Type::Boolean => "boolean".into(),
            Type::Void => "void".into(),
            Type::Struct(name) => name.clone(),
            Type::Error => "error".into(),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

const BUILTINS: [(&str, u32); 4] = [("int", 4), ("char", 1), ("boolean", 1), ("void", 0)];

/// Placeholder size of a struct type; layout is decided by later stages.
pub const STRUCT_PLACEHOLDER_SIZE: u32 = 0;

/// Catalog of known type names and their byte sizes.
///
/// A type name is valid iff the registry knows its size.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    sizes: HashMap<String, u32>,
}

impl TypeRegistry {
    /// A registry holding only the built-in types.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_builtins();
        registry
    }

    pub fn register_builtins(&mut self) {
        for (name, size) in BUILTINS {
            self.sizes.insert(name.to_string(), size);
        }
    }

    /// Record `name` as a struct type.
    ///
    /// Fails if the name already denotes a built-in or a registered struct;
    /// the existing entry is left untouched.
    pub fn register_struct(&mut self, name: &str) -> Result<(), CompileError> {
        if self.sizes.contains_key(name) {
            return Err(CompileError::StructRedefinition {
                name: name.to_string(),
            });
        }
        self.sizes.insert(name.to_string(), STRUCT_PLACEHOLDER_SIZE);
        Ok(())
    }

    /// Resolve a declared type name.
    pub fn resolve(&self, name: &str) -> Result<Type, CompileError> {
        if self.sizes.contains_key(name) {
            Ok(Type::from_name(name))
        } else {
            Err(CompileError::UndefinedName {
                name: name.to_string(),
            })
        }
    }

    pub fn size_of(&self, ty: &Type) -> Option<u32> {
        match ty {
            Type::Error => None,
            other => self.sizes.get(&other.display_name()).copied(),
        }
    }
}
