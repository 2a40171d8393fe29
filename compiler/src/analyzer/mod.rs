//! Semantic analysis over the token stream
//!
//! The analyzer never builds a tree. It annotates the interned identifiers of
//! a [`ShaderUnit`] with their declared type and storage role, records struct
//! definitions, and finally slices the stream into [`Function`] ranges.
//!
//! Passes run in a fixed order: frag-data rewrite, type inference, structs,
//! declaration classification. Backend rewrites follow, and only after every
//! deletion has happened are function ranges discovered.

mod declarations;
pub mod frag_data;
pub mod functions;
mod structs;

use std::collections::BTreeSet;

use diagnostics::{Diagnostics, FileId, ShaderStage, SourceSpan};
use parser::{
    token_text, IdentId, Keyword, MacroId, Precision, SymbolTables, Token, Type,
    TypeId,
};

pub(crate) use declarations::FRAG_DATA_PREFIX;
pub use functions::Function;
pub use structs::{Struct, StructMember};

/// Resource role of a declared variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageQualifier {
    #[default]
    Unset,
    Uniform,
    In,
    Out,
    Sampler,
    Buffer,
    Shared,
    Global,
    Image,
}

impl StorageQualifier {
    pub(crate) fn from_keyword(keyword: Keyword) -> Option<Self> {
        Some(match keyword {
            Keyword::Uniform => StorageQualifier::Uniform,
            Keyword::In => StorageQualifier::In,
            Keyword::Out => StorageQualifier::Out,
            Keyword::Buffer => StorageQualifier::Buffer,
            Keyword::Shared => StorageQualifier::Shared,
            Keyword::Global => StorageQualifier::Global,
            Keyword::Image => StorageQualifier::Image,
            _ => return None,
        })
    }

    /// Whether Metal helper functions need the variable passed explicitly
    pub fn is_threaded(self) -> bool {
        matches!(
            self,
            StorageQualifier::Buffer | StorageQualifier::Shared | StorageQualifier::Global
        )
    }
}

/// What the analyzer knows about one interned identifier
#[derive(Debug, Clone, Default)]
pub struct Variable {
    pub ty: Option<TypeId>,
    pub storage: StorageQualifier,
    /// 0 scalar, -1 unbounded, N fixed length
    pub array_size: i32,
    pub precision: Precision,
}

/// A single stage's tokens plus everything derived from them
#[derive(Debug, Clone)]
pub struct ShaderUnit {
    pub stage: ShaderStage,
    pub file_id: FileId,
    pub tokens: Vec<Token>,
    pub tables: SymbolTables,
    /// Indexed by `IdentId`
    pub variables: Vec<Variable>,
    pub uniforms: Vec<IdentId>,
    pub samplers: Vec<IdentId>,
    pub inputs: Vec<IdentId>,
    pub outputs: Vec<IdentId>,
    pub buffers: Vec<IdentId>,
    pub shared: Vec<IdentId>,
    pub globals: Vec<IdentId>,
    pub images: Vec<IdentId>,
    pub structs: Vec<Struct>,
    pub functions: Vec<Function>,
    /// Index into `functions`
    pub entry_point: Option<usize>,
    pub frag_data_indices: BTreeSet<u32>,
    /// Macro lines found outside any function
    pub macros: Vec<MacroId>,
    pub force_highp: bool,
    pub diagnostics: Diagnostics,
}

impl ShaderUnit {
    pub fn new(
        stage: ShaderStage,
        file_id: FileId,
        tokens: Vec<Token>,
        tables: SymbolTables,
        force_highp: bool,
    ) -> Self {
        let variables = vec![Variable::default(); tables.identifier_count()];
        Self {
            stage,
            file_id,
            tokens,
            tables,
            variables,
            uniforms: Vec::new(),
            samplers: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            buffers: Vec::new(),
            shared: Vec::new(),
            globals: Vec::new(),
            images: Vec::new(),
            structs: Vec::new(),
            functions: Vec::new(),
            entry_point: None,
            frag_data_indices: BTreeSet::new(),
            macros: Vec::new(),
            force_highp,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Intern a compiler-made identifier, keeping `variables` in step
    pub fn intern(&mut self, name: &str) -> IdentId {
        let id = self.tables.intern(name);
        if self.variables.len() < self.tables.identifier_count() {
            self.variables.resize(self.tables.identifier_count(), Variable::default());
        }
        id
    }

    pub fn variable(&self, id: IdentId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    pub(crate) fn variable_mut(&mut self, id: IdentId) -> &mut Variable {
        &mut self.variables[id.0 as usize]
    }

    pub fn name(&self, id: IdentId) -> &str {
        self.tables.identifier(id)
    }

    pub fn lookup(&self, name: &str) -> Option<IdentId> {
        self.tables.lookup_identifier(name)
    }

    /// Declared type of a variable
    pub fn type_of(&self, id: IdentId) -> Option<&Type> {
        self.variable(id).ty.map(|ty| self.tables.ty(ty))
    }

    pub fn type_name(&self, ty: TypeId) -> &str {
        &self.tables.type_entry(ty).name
    }

    pub fn is_sampler_variable(&self, id: IdentId) -> bool {
        self.type_of(id).is_some_and(Type::is_sampler)
    }

    pub fn entry(&self) -> Option<&Function> {
        self.entry_point.and_then(|index| self.functions.get(index))
    }

    /// Span of the token at `index`, or a dummy span for synthesized tokens
    pub fn span_at(&self, index: usize) -> SourceSpan {
        match self.tokens.get(index) {
            Some(token) if token.line > 0 => {
                let len = token_text(token, &self.tables).len().max(1);
                SourceSpan::on_line(self.file_id, token.line as usize, token.column as usize, len)
            }
            _ => SourceSpan::dummy(),
        }
    }

    /// List a classified variable is recorded in
    pub(crate) fn storage_list_mut(&mut self, storage: StorageQualifier) -> Option<&mut Vec<IdentId>> {
        Some(match storage {
            StorageQualifier::Uniform => &mut self.uniforms,
            StorageQualifier::Sampler => &mut self.samplers,
            StorageQualifier::In => &mut self.inputs,
            StorageQualifier::Out => &mut self.outputs,
            StorageQualifier::Buffer => &mut self.buffers,
            StorageQualifier::Shared => &mut self.shared,
            StorageQualifier::Global => &mut self.globals,
            StorageQualifier::Image => &mut self.images,
            StorageQualifier::Unset => return None,
        })
    }
}

/// Run the backend independent passes
pub fn analyze(unit: &mut ShaderUnit) {
    if unit.stage == ShaderStage::Fragment {
        frag_data::rewrite(unit);
    }
    declarations::infer_types(unit);
    structs::build(unit);
    declarations::classify(unit);
    log::debug!(
        "{} stage: {} uniforms, {} samplers, {} inputs, {} outputs, {} buffers, {} structs",
        unit.stage,
        unit.uniforms.len(),
        unit.samplers.len(),
        unit.inputs.len(),
        unit.outputs.len(),
        unit.buffers.len(),
        unit.structs.len()
    );
}

/// `N` of a `_Frag_DataN` output
pub fn frag_data_index(name: &str) -> Option<u32> {
    name.strip_prefix(FRAG_DATA_PREFIX)?.parse().ok()
}

pub(crate) fn precision_of(keyword: Keyword) -> Option<Precision> {
    match keyword {
        Keyword::Highp => Some(Precision::High),
        Keyword::Mediump => Some(Precision::Medium),
        Keyword::Lowp => Some(Precision::Low),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parser::Lexer;

    /// Lex `source` into an unanalyzed unit
    pub fn unit(stage: ShaderStage, source: &str) -> ShaderUnit {
        let mut tables = SymbolTables::new();
        let mut lexer = Lexer::new(FileId::new(0));
        let mut tokens = lexer.scan(source, &mut tables);
        assert!(!lexer.failed(), "test source failed to lex");
        parser::finish(&mut tokens, &mut tables);
        ShaderUnit::new(stage, FileId::new(0), tokens, tables, false)
    }

    pub fn analyzed(stage: ShaderStage, source: &str) -> ShaderUnit {
        let mut unit = unit(stage, source);
        analyze(&mut unit);
        unit
    }
}
