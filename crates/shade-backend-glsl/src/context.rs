//! Compilation context: emitted source fragments and temporary names.

use std::collections::{HashMap, HashSet};

use shade_analysis::{ExecutionConditions, use_counts};
use shade_backend_core::ShaderStage;
use shade_ir::{Graph, NodeHandle, ShadeError, Type};

use crate::GlslOptions;

/// Accumulates the pieces of one GLSL program.
///
/// Owned by the code generator; each node's compile step writes into it.
/// Nodes that were materialized or folded are bound to the text that
/// stands for them from then on.
#[derive(Debug)]
pub struct CompilationContext {
    options: GlslOptions,
    stage: ShaderStage,
    uses: HashMap<NodeHandle, usize>,
    conditions: ExecutionConditions,
    extensions: Vec<String>,
    types: Vec<String>,
    declared_types: HashSet<String>,
    globals: Vec<String>,
    declared_globals: HashMap<String, Type>,
    statements: Vec<String>,
    bound: HashMap<NodeHandle, String>,
    next_temp: usize,
}

impl CompilationContext {
    /// A fresh context for compiling the sub-graph of `root`.
    pub fn new(g: &Graph, root: NodeHandle, options: GlslOptions, stage: ShaderStage) -> Self {
        Self {
            options,
            stage,
            uses: use_counts(g, root),
            conditions: ExecutionConditions::propagate(g, root),
            extensions: Vec::new(),
            types: Vec::new(),
            declared_types: HashSet::new(),
            globals: Vec::new(),
            declared_globals: HashMap::new(),
            statements: Vec::new(),
            bound: HashMap::new(),
            next_temp: 0,
        }
    }

    pub fn options(&self) -> &GlslOptions {
        &self.options
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Number of consumers of `h` inside the compiled sub-graph.
    pub fn uses(&self, h: NodeHandle) -> usize {
        self.uses.get(&h).copied().unwrap_or(0)
    }

    pub fn is_unconditional(&self, h: NodeHandle) -> bool {
        self.conditions.is_unconditional(h)
    }

    /// A temporary name not used before in this program.
    pub fn fresh_name(&mut self) -> String {
        let name = format!("tmp{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    /// Makes `text` stand for `h` in every later expression.
    pub fn bind(&mut self, h: NodeHandle, text: String) {
        self.bound.insert(h, text);
    }

    pub fn bound(&self, h: NodeHandle) -> Option<&str> {
        self.bound.get(&h).map(String::as_str)
    }

    /// Appends a statement to the body of `main`.
    pub fn emit(&mut self, statement: String) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Declares a global of type `ty` once per `name`; returns whether it
    /// was new. A second global of the same name must have the same type.
    pub fn declare_global(
        &mut self,
        name: &str,
        ty: &Type,
        line: String,
    ) -> Result<bool, ShadeError> {
        if let Some(existing) = self.declared_globals.get(name) {
            if existing != ty {
                return Err(ShadeError::type_mismatch(
                    format!("global '{name}'"),
                    "one type per name",
                    &[existing, ty],
                ));
            }
            return Ok(false);
        }
        self.declared_globals.insert(name.to_string(), ty.clone());
        self.globals.push(line);
        Ok(true)
    }

    /// Emits struct declarations for `ty` and any struct it contains,
    /// innermost first.
    pub fn declare_type(&mut self, ty: &Type) {
        match ty {
            Type::Array { base, .. } => self.declare_type(base),
            Type::Struct { members } => {
                for m in members {
                    self.declare_type(&m.ty);
                }
                if let Some(decl) = ty.struct_declaration() {
                    if self.declared_types.insert(ty.glsl_name()) {
                        self.types.push(decl);
                    }
                }
            }
            _ => {}
        }
    }

    pub fn require_extension(&mut self, name: &str) {
        if !self.extensions.iter().any(|e| e == name) {
            self.extensions.push(name.to_string());
        }
    }

    /// Assembles the program around the final `output` statement.
    pub fn finish(self, output: &str) -> String {
        let mut src = String::new();
        for ext in &self.extensions {
            src.push_str(&format!("#extension {ext} : enable\n"));
        }
        if self.stage == ShaderStage::Fragment {
            src.push_str("precision highp float;\n");
        }
        src.push('\n');
        for decl in &self.types {
            src.push_str(decl);
            src.push('\n');
        }
        for line in &self.globals {
            src.push_str(line);
            src.push('\n');
        }
        if !self.globals.is_empty() {
            src.push('\n');
        }
        src.push_str("void main() {\n");
        for stmt in &self.statements {
            src.push_str("    ");
            src.push_str(stmt);
            src.push('\n');
        }
        src.push_str("    ");
        src.push_str(output);
        src.push_str("\n}\n");
        src
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::ops;

    #[test]
    fn fresh_names_are_unique() {
        let mut g = Graph::new();
        let root = ops::frag_coord(&mut g).unwrap();
        let mut ctx =
            CompilationContext::new(&g, root, GlslOptions::default(), ShaderStage::Fragment);
        assert_eq!(ctx.fresh_name(), "tmp0");
        assert_eq!(ctx.fresh_name(), "tmp1");
    }

    #[test]
    fn nested_structs_are_declared_inner_first() {
        let mut g = Graph::new();
        let root = ops::frag_coord(&mut g).unwrap();
        let mut ctx =
            CompilationContext::new(&g, root, GlslOptions::default(), ShaderStage::Fragment);
        let inner = Type::structure([("x".to_string(), Type::FLOAT)]).unwrap();
        let outer = Type::structure([
            ("a".to_string(), inner.clone()),
            ("b".to_string(), Type::VEC2),
        ])
        .unwrap();
        ctx.declare_type(&outer);
        ctx.declare_type(&inner);
        let src = ctx.finish("gl_FragColor = vec4(1.0);");
        let inner_at = src.find(&format!("struct {} {{", inner.glsl_name())).unwrap();
        let outer_at = src.find(&format!("struct {} {{", outer.glsl_name())).unwrap();
        assert!(inner_at < outer_at);
        assert_eq!(src.matches("struct ").count(), 2);
    }

    #[test]
    fn program_layout() {
        let mut g = Graph::new();
        let root = ops::frag_coord(&mut g).unwrap();
        let mut ctx =
            CompilationContext::new(&g, root, GlslOptions::default(), ShaderStage::Fragment);
        assert!(ctx.declare_global("t", &Type::FLOAT, "uniform float t;".into()).unwrap());
        assert!(!ctx.declare_global("t", &Type::FLOAT, "uniform float t;".into()).unwrap());
        assert!(matches!(
            ctx.declare_global("t", &Type::VEC2, "uniform vec2 t;".into()),
            Err(ShadeError::TypeMismatch { .. })
        ));
        ctx.emit("float tmp0 = t * 2.0;".into());
        ctx.require_extension("GL_OES_standard_derivatives");
        let src = ctx.finish("gl_FragColor = vec4(tmp0);");
        assert_eq!(
            src,
            "#extension GL_OES_standard_derivatives : enable\n\
             precision highp float;\n\
             \n\
             uniform float t;\n\
             \n\
             void main() {\n\
             \x20   float tmp0 = t * 2.0;\n\
             \x20   gl_FragColor = vec4(tmp0);\n\
             }\n"
        );
    }
}
