//! Per-compilation symbol tables
//!
//! Every non-punctuation token indexes into exactly one of these tables. The
//! tables are created fresh for each compilation; backends may append
//! identifiers they synthesize while rewriting.

use indexmap::{IndexMap, IndexSet};

use crate::types::{BaseType, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacroId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Float,
    Half,
    Int,
    Uint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    /// Digits as written, without any suffix
    pub text: String,
    pub kind: NumberKind,
    pub value: f64,
}

impl NumberLiteral {
    pub fn is_float(&self) -> bool {
        matches!(self.kind, NumberKind::Float | NumberKind::Half)
    }

    /// Integer value of an array-size style literal
    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            NumberKind::Int | NumberKind::Uint => Some(self.value as i64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub name: String,
    pub ty: Type,
}

/// Dialect spellings of the built-in types
pub const BUILTIN_TYPES: &[(&str, BaseType)] = &[
    ("void", BaseType::Void),
    ("bool", BaseType::Bool),
    ("bvec2", BaseType::Bool2),
    ("bvec3", BaseType::Bool3),
    ("bvec4", BaseType::Bool4),
    ("int", BaseType::Int),
    ("ivec2", BaseType::Int2),
    ("ivec3", BaseType::Int3),
    ("ivec4", BaseType::Int4),
    ("uint", BaseType::Uint),
    ("uvec2", BaseType::Uint2),
    ("uvec3", BaseType::Uint3),
    ("uvec4", BaseType::Uint4),
    ("float", BaseType::Float),
    ("vec2", BaseType::Vec2),
    ("vec3", BaseType::Vec3),
    ("vec4", BaseType::Vec4),
    ("mat2", BaseType::Mat2),
    ("mat3", BaseType::Mat3),
    ("mat4", BaseType::Mat4),
    ("sampler2D", BaseType::Sampler2D),
    ("sampler2DArray", BaseType::Sampler2DArray),
    ("samplerCube", BaseType::SamplerCube),
    ("samplerCubeArray", BaseType::SamplerCubeArray),
    ("sampler2DShadow", BaseType::Sampler2DShadow),
    ("sampler2DArrayShadow", BaseType::Sampler2DArrayShadow),
    ("samplerCubeShadow", BaseType::SamplerCubeShadow),
    ("image2D", BaseType::Image2D),
    ("subpassInput", BaseType::SubpassInput),
];

#[derive(Debug, Clone)]
pub struct SymbolTables {
    identifiers: IndexSet<String>,
    numbers: Vec<NumberLiteral>,
    macros: Vec<String>,
    types: IndexMap<String, TypeEntry>,
    struct_count: u32,
}

impl Default for SymbolTables {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTables {
    pub fn new() -> Self {
        let types = BUILTIN_TYPES
            .iter()
            .map(|(name, base)| {
                let entry = TypeEntry { name: name.to_string(), ty: Type::high(*base) };
                (name.to_string(), entry)
            })
            .collect();
        Self {
            identifiers: IndexSet::new(),
            numbers: Vec::new(),
            macros: Vec::new(),
            types,
            struct_count: 0,
        }
    }

    pub fn intern(&mut self, name: &str) -> IdentId {
        if let Some(index) = self.identifiers.get_index_of(name) {
            return IdentId(index as u32);
        }
        let (index, _) = self.identifiers.insert_full(name.to_string());
        IdentId(index as u32)
    }

    pub fn lookup_identifier(&self, name: &str) -> Option<IdentId> {
        self.identifiers.get_index_of(name).map(|i| IdentId(i as u32))
    }

    pub fn identifier(&self, id: IdentId) -> &str {
        self.identifiers
            .get_index(id.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }

    pub fn add_number(&mut self, literal: NumberLiteral) -> NumberId {
        self.numbers.push(literal);
        NumberId(self.numbers.len() as u32 - 1)
    }

    pub fn number(&self, id: NumberId) -> &NumberLiteral {
        &self.numbers[id.0 as usize]
    }

    pub fn add_macro(&mut self, text: &str) -> MacroId {
        self.macros.push(text.to_string());
        MacroId(self.macros.len() as u32 - 1)
    }

    pub fn macro_text(&self, id: MacroId) -> &str {
        &self.macros[id.0 as usize]
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.types.get_index_of(name).map(|i| TypeId(i as u32))
    }

    /// Id of a built-in type, which every table contains
    pub fn builtin_type(&self, base: BaseType) -> TypeId {
        let index = BUILTIN_TYPES
            .iter()
            .position(|(_, b)| *b == base)
            .unwrap_or(0);
        TypeId(index as u32)
    }

    pub fn type_entry(&self, id: TypeId) -> &TypeEntry {
        &self.types[id.0 as usize]
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.type_entry(id).ty
    }

    /// Register a struct type, returning the existing id on redefinition
    pub fn add_struct_type(&mut self, name: &str) -> TypeId {
        if let Some(id) = self.type_id(name) {
            return id;
        }
        let ty = Type::high(BaseType::Struct(self.struct_count));
        self.struct_count += 1;
        let (index, _) = self
            .types
            .insert_full(name.to_string(), TypeEntry { name: name.to_string(), ty });
        TypeId(index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let mut tables = SymbolTables::new();
        let a = tables.intern("color");
        let b = tables.intern("uv");
        assert_eq!(tables.intern("color"), a);
        assert_ne!(a, b);
        assert_eq!(tables.identifier(b), "uv");
    }

    #[test]
    fn test_builtin_and_struct_types() {
        let mut tables = SymbolTables::new();
        let vec3 = tables.type_id("vec3").unwrap();
        assert_eq!(tables.builtin_type(BaseType::Vec3), vec3);

        let light = tables.add_struct_type("Light");
        assert_eq!(tables.ty(light).base(), BaseType::Struct(0));
        assert_eq!(tables.add_struct_type("Light"), light);
        assert_eq!(tables.type_entry(light).name, "Light");
    }
}
