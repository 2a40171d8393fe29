use std::fmt;
use std::str::FromStr;

/// Pipeline stage a shader source is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Stages in descriptor slot order
    pub const ALL: [ShaderStage; 6] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    pub fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::TessControl => 1,
            ShaderStage::TessEval => 2,
            ShaderStage::Geometry => 3,
            ShaderStage::Fragment => 4,
            ShaderStage::Compute => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tessellation_control",
            ShaderStage::TessEval => "tessellation_evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }

    /// Suffix of the `TYPE_<stage>` define injected into every stage source.
    ///
    /// The evaluation stage keeps the historical `evalulation` spelling that
    /// existing shader headers test for.
    pub fn type_define(self) -> &'static str {
        match self {
            ShaderStage::TessEval => "tessellation_evalulation",
            other => other.name(),
        }
    }

    /// Short key used in descriptor files (`vs`, `fs`, ...)
    pub fn short_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs",
            ShaderStage::TessControl => "tcs",
            ShaderStage::TessEval => "tes",
            ShaderStage::Geometry => "gs",
            ShaderStage::Fragment => "fs",
            ShaderStage::Compute => "cs",
        }
    }

    pub fn is_tessellation(self) -> bool {
        matches!(self, ShaderStage::TessControl | ShaderStage::TessEval)
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShaderStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShaderStage::ALL
            .into_iter()
            .find(|stage| stage.name() == s || stage.short_name() == s)
            .ok_or_else(|| format!("unknown shader stage '{}'", s))
    }
}
