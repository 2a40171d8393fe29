//! Closed type system of the shading dialect
//!
//! Every value in a shader has one of a fixed set of base types plus a
//! precision tag. Types are plain values; arrays own their element type.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Int,
    Int2,
    Int3,
    Int4,
    Uint,
    Uint2,
    Uint3,
    Uint4,
    Bool,
    Bool2,
    Bool3,
    Bool4,
    Sampler2D,
    Sampler2DArray,
    SamplerCube,
    SamplerCubeArray,
    Sampler2DShadow,
    Sampler2DArrayShadow,
    SamplerCubeShadow,
    Image2D,
    SubpassInput,
    Array,
    /// User struct, by index into the struct type list
    Struct(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Void,
    Float,
    Int,
    Uint,
    Bool,
    Sampler,
    Image,
    SubpassInput,
    Array,
    UserDefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    High,
    Medium,
    Low,
    None,
}

impl BaseType {
    pub fn class(self) -> TypeClass {
        use BaseType::*;
        match self {
            Void => TypeClass::Void,
            Float | Vec2 | Vec3 | Vec4 | Mat2 | Mat3 | Mat4 => TypeClass::Float,
            Int | Int2 | Int3 | Int4 => TypeClass::Int,
            Uint | Uint2 | Uint3 | Uint4 => TypeClass::Uint,
            Bool | Bool2 | Bool3 | Bool4 => TypeClass::Bool,
            Sampler2D | Sampler2DArray | SamplerCube | SamplerCubeArray | Sampler2DShadow
            | Sampler2DArrayShadow | SamplerCubeShadow => TypeClass::Sampler,
            Image2D => TypeClass::Image,
            SubpassInput => TypeClass::SubpassInput,
            Array => TypeClass::Array,
            Struct(_) => TypeClass::UserDefined,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Type {
    base: BaseType,
    precision: Precision,
    element: Option<Box<Type>>,
}

impl Type {
    /// # Panics
    /// When `base` is `Array`; arrays are built with [`Type::array`].
    pub fn new(base: BaseType, precision: Precision) -> Self {
        assert!(base != BaseType::Array, "array types need an element type");
        Self { base, precision, element: None }
    }

    pub fn high(base: BaseType) -> Self {
        Self::new(base, Precision::High)
    }

    pub fn array(element: Type) -> Self {
        Self {
            base: BaseType::Array,
            precision: element.precision,
            element: Some(Box::new(element)),
        }
    }

    /// Numeric or bool type with the given class and component count
    pub fn create(class: TypeClass, components: u32) -> Option<Type> {
        use BaseType::*;
        let base = match (class, components) {
            (TypeClass::Float, 1) => Float,
            (TypeClass::Float, 2) => Vec2,
            (TypeClass::Float, 3) => Vec3,
            (TypeClass::Float, 4) => Vec4,
            (TypeClass::Float, 9) => Mat3,
            (TypeClass::Float, 16) => Mat4,
            (TypeClass::Int, 1) => Int,
            (TypeClass::Int, 2) => Int2,
            (TypeClass::Int, 3) => Int3,
            (TypeClass::Int, 4) => Int4,
            (TypeClass::Uint, 1) => Uint,
            (TypeClass::Uint, 2) => Uint2,
            (TypeClass::Uint, 3) => Uint3,
            (TypeClass::Uint, 4) => Uint4,
            (TypeClass::Bool, 1) => Bool,
            (TypeClass::Bool, 2) => Bool2,
            (TypeClass::Bool, 3) => Bool3,
            (TypeClass::Bool, 4) => Bool4,
            _ => return None,
        };
        Some(Type::high(base))
    }

    pub fn base(&self) -> BaseType {
        self.base
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        if let Some(element) = self.element.take() {
            self.element = Some(Box::new(element.with_precision(precision)));
        }
        self
    }

    pub fn class(&self) -> TypeClass {
        self.base.class()
    }

    /// Element type of an array
    ///
    /// # Panics
    /// When called on a non-array type.
    pub fn element_type(&self) -> &Type {
        match &self.element {
            Some(element) => element,
            None => panic!("element_type called on non-array type {}", self),
        }
    }

    pub fn is_sampler(&self) -> bool {
        self.class() == TypeClass::Sampler
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.class(), TypeClass::Float | TypeClass::Int | TypeClass::Uint)
    }

    pub fn is_bool(&self) -> bool {
        self.class() == TypeClass::Bool
    }

    pub fn is_array(&self) -> bool {
        self.base == BaseType::Array
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.class(), TypeClass::Int | TypeClass::Uint)
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self.base, BaseType::Mat2 | BaseType::Mat3 | BaseType::Mat4)
    }

    pub fn is_vector(&self) -> bool {
        (self.is_numeric() || self.is_bool()) && !self.is_matrix() && self.component_count() > 1
    }

    pub fn is_scalar(&self) -> bool {
        (self.is_numeric() || self.is_bool()) && self.component_count() == 1
    }

    /// # Panics
    /// For types that are neither numeric nor bool.
    pub fn component_count(&self) -> u32 {
        use BaseType::*;
        match self.base {
            Float | Int | Uint | Bool => 1,
            Vec2 | Int2 | Uint2 | Bool2 => 2,
            Vec3 | Int3 | Uint3 | Bool3 => 3,
            Vec4 | Int4 | Uint4 | Bool4 | Mat2 => 4,
            Mat3 => 9,
            Mat4 => 16,
            other => panic!("component count is undefined for {:?}", other),
        }
    }

    /// # Panics
    /// For non-numeric types and for numeric types below high precision.
    pub fn size_in_bytes(&self) -> u32 {
        use BaseType::*;
        match self.base {
            Bool => 1,
            Bool2 => 2,
            Bool3 | Bool4 => 4,
            _ if self.is_numeric() => {
                assert!(
                    self.precision == Precision::High,
                    "size of {:?} is only defined at high precision",
                    self.base
                );
                match self.base {
                    Float | Int | Uint => 4,
                    Vec2 | Int2 | Uint2 => 8,
                    Vec3 | Vec4 | Int3 | Int4 | Uint3 | Uint4 | Mat2 => 16,
                    Mat3 => 48,
                    Mat4 => 64,
                    _ => unreachable!(),
                }
            }
            other => panic!("size in bytes is undefined for {:?}", other),
        }
    }
}

/// Precision is not compared; arrays compare element types
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if self.base != other.base {
            return false;
        }
        match (&self.element, &other.element) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl Eq for Type {}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BaseType::*;
        let (fp, ip) = match self.precision {
            Precision::High => ("float", "int"),
            Precision::Medium => ("half", "short"),
            Precision::Low => ("lowp", "byte"),
            Precision::None => ("float_noprec", "int_noprec"),
        };
        match self.base {
            Void => write!(f, "void"),
            Float => write!(f, "{}", fp),
            Vec2 => write!(f, "{}2", fp),
            Vec3 => write!(f, "{}3", fp),
            Vec4 => write!(f, "{}4", fp),
            Mat2 => write!(f, "{}2x2", fp),
            Mat3 => write!(f, "{}3x3", fp),
            Mat4 => write!(f, "{}4x4", fp),
            Int => write!(f, "{}", ip),
            Int2 => write!(f, "{}2", ip),
            Int3 => write!(f, "{}3", ip),
            Int4 => write!(f, "{}4", ip),
            Uint => write!(f, "u{}", ip),
            Uint2 => write!(f, "u{}2", ip),
            Uint3 => write!(f, "u{}3", ip),
            Uint4 => write!(f, "u{}4", ip),
            Bool => write!(f, "bool"),
            Bool2 => write!(f, "bool2"),
            Bool3 => write!(f, "bool3"),
            Bool4 => write!(f, "bool4"),
            Sampler2D => write!(f, "sampler2D<{}>", fp),
            Sampler2DArray => write!(f, "sampler2DArray<{}>", fp),
            SamplerCube => write!(f, "samplerCube<{}>", fp),
            SamplerCubeArray => write!(f, "samplerCubeArray<{}>", fp),
            Sampler2DShadow => write!(f, "sampler2DShadow<{}>", fp),
            Sampler2DArrayShadow => write!(f, "sampler2DArrayShadow<{}>", fp),
            SamplerCubeShadow => write!(f, "samplerCubeShadow<{}>", fp),
            Image2D => write!(f, "image2D<{}>", fp),
            SubpassInput => write!(f, "subpassInput<{}>", fp),
            Array => write!(f, "{}[]", self.element_type()),
            Struct(index) => write!(f, "struct#{}", index),
        }
    }
}
