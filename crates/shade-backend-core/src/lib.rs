#![warn(missing_docs)]
//! Backend trait and plugin architecture for Shade.
//!
//! Defines the [`Backend`] trait that every output format implements,
//! along with supporting types ([`BackendOptions`], [`BackendOutput`],
//! [`BackendError`]) and a [`BackendRegistry`] for CLI dispatch. The
//! built-in backends dump the graph as text or JSON, or evaluate it on
//! the host.

use std::fmt::{self, Debug};

use shade_analysis::Resources;
use shade_ir::{Graph, NodeHandle, ShadeError};
use shade_opt::OptLevel;

/// The pipeline stage a shader program is emitted for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShaderStage {
    /// Writes the expression to `gl_FragColor`.
    #[default]
    Fragment,
    /// Writes the expression to `gl_Position`.
    Vertex,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fragment => "fragment",
            Self::Vertex => "vertex",
        })
    }
}

/// A backend that turns an expression graph into target-specific output.
pub trait Backend: Debug + Send + Sync {
    /// Human-readable name (e.g. "GLSL ES 1.0").
    fn name(&self) -> &str;

    /// Target identifiers this backend handles (for `--target` dispatch).
    fn targets(&self) -> &[&str];

    /// Compiles the expression rooted at `root`.
    ///
    /// The graph is mutable so backends can consult the memoized constancy
    /// and element caches; existing nodes are never changed.
    fn compile(
        &self,
        g: &mut Graph,
        root: NodeHandle,
        opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError>;
}

/// Options passed to a backend during compilation.
///
/// The caller runs the optimization pipeline for `opt_level` before
/// calling [`Backend::compile`]; backends read it to decide how much
/// host-side folding to do while emitting.
#[derive(Clone, Debug, Default)]
pub struct BackendOptions {
    /// Optimization level the graph was prepared with.
    pub opt_level: OptLevel,
    /// Pipeline stage of the emitted program.
    pub stage: ShaderStage,
}

impl fmt::Display for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BackendOptions {{ opt_level: {:?}, stage: {} }}",
            self.opt_level, self.stage
        )
    }
}

/// The output produced by a backend.
#[derive(Clone, Debug)]
pub struct BackendOutput {
    /// One or more output files.
    pub files: Vec<OutputFile>,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl BackendOutput {
    /// A single text file without diagnostics.
    pub fn single(name: impl Into<String>, content: String) -> Self {
        Self {
            files: vec![OutputFile {
                name: name.into(),
                content,
            }],
            diagnostics: vec![],
        }
    }
}

impl fmt::Display for BackendOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s), {} diagnostic(s)",
            self.files.len(),
            self.diagnostics.len()
        )
    }
}

/// A single output file.
#[derive(Clone, Debug)]
pub struct OutputFile {
    /// Suggested filename (e.g. "shader.frag", "graph.ir").
    pub name: String,
    /// UTF-8 file content.
    pub content: String,
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A non-fatal diagnostic message from a backend.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// An informational note.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    /// A warning; also logged.
    pub fn warning(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{message}");
        Self {
            level: DiagnosticLevel::Warning,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Severity level for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticLevel {
    /// A warning that does not prevent compilation.
    Warning,
    /// An informational note.
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "Warning",
            Self::Info => "Info",
        })
    }
}

/// Errors that can occur during backend compilation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The graph uses a feature the target cannot express.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// The graph itself is invalid or cannot be evaluated.
    #[error(transparent)]
    Graph(#[from] ShadeError),
    /// A general backend error.
    #[error("{0}")]
    Other(String),
}

/// Registry of available backends, used for CLI `--target` dispatch.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-populated with the backends of this crate.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(IrDumpBackend));
        reg.register(Box::new(JsonBackend));
        reg.register(Box::new(EvalBackend));
        reg
    }

    /// Registers a backend.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    /// Finds a backend that handles the given target identifier.
    pub fn find(&self, target: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.targets().contains(&target))
            .map(|b| &**b)
    }

    /// Lists all supported target identifiers.
    pub fn list_targets(&self) -> Vec<&str> {
        self.backends
            .iter()
            .flat_map(|b| b.targets().iter().copied())
            .collect()
    }
}

/// Dumps the graph as an indented tree using [`shade_ir::debug_print`].
#[derive(Debug)]
pub struct IrDumpBackend;

impl Backend for IrDumpBackend {
    fn name(&self) -> &str {
        "IR Dump"
    }

    fn targets(&self) -> &[&str] {
        &["ir-dump", "ir"]
    }

    fn compile(
        &self,
        g: &mut Graph,
        root: NodeHandle,
        _opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        g.try_node(root)?;
        Ok(BackendOutput::single("graph.ir", shade_ir::debug_print(g, root)))
    }
}

/// Dumps the graph structure as JSON using [`shade_ir::to_json`].
#[derive(Debug)]
pub struct JsonBackend;

impl Backend for JsonBackend {
    fn name(&self) -> &str {
        "JSON"
    }

    fn targets(&self) -> &[&str] {
        &["json"]
    }

    fn compile(
        &self,
        g: &mut Graph,
        root: NodeHandle,
        _opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        g.try_node(root)?;
        let text = serde_json::to_string_pretty(&shade_ir::to_json(g, root))
            .map_err(|e| BackendError::Other(format!("JSON serialization failed: {e}")))?;
        Ok(BackendOutput::single("graph.json", text))
    }
}

/// Evaluates the expression on the host and prints the value.
#[derive(Debug)]
pub struct EvalBackend;

impl Backend for EvalBackend {
    fn name(&self) -> &str {
        "Host evaluation"
    }

    fn targets(&self) -> &[&str] {
        &["eval", "host"]
    }

    fn compile(
        &self,
        g: &mut Graph,
        root: NodeHandle,
        _opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        let value = shade_core::evaluate(g, root)?;
        let mut output = BackendOutput::single("value.txt", format!("{value}\n"));
        if !shade_core::is_constant(g, root)? {
            let resources = Resources::collect(g, root);
            output.diagnostics.push(Diagnostic::info(format!(
                "evaluated with {} bound uniform(s)",
                resources.uniforms.len()
            )));
        }
        Ok(output)
    }
}
