//! GLSL ES 1.0 backend for Shade.
//!
//! Walks the sub-graph of the root in topological order, declaring inputs
//! as uniforms, attributes and samplers, folding constant sub-expressions
//! into literals and hoisting shared work into temporaries. The root value
//! ends up in `gl_FragColor` or `gl_Position`.

use shade_analysis::Resources;
use shade_backend_core::{
    Backend, BackendError, BackendOptions, BackendOutput, Diagnostic, ShaderStage,
};
use shade_ir::{Graph, NodeHandle, Type};
use shade_opt::OptLevel;

mod compile;
mod context;
mod expr;

pub use compile::compile_node;
pub use context::CompilationContext;
pub use expr::{glsl_expression, literal};

/// Code generation switches.
#[derive(Clone, Debug)]
pub struct GlslOptions {
    /// Replace constant sub-expressions with literals.
    pub fold_constants: bool,
    /// Copy dynamically indexed values into temporaries.
    pub materialize_dynamic_indices: bool,
}

impl Default for GlslOptions {
    fn default() -> Self {
        Self {
            fold_constants: true,
            materialize_dynamic_indices: false,
        }
    }
}

impl From<&BackendOptions> for GlslOptions {
    fn from(opts: &BackendOptions) -> Self {
        Self {
            fold_constants: opts.opt_level != OptLevel::O0,
            ..Self::default()
        }
    }
}

/// Compiles the expression rooted at `root` into a complete shader.
pub fn compile_program(
    g: &mut Graph,
    root: NodeHandle,
    options: &GlslOptions,
    stage: ShaderStage,
) -> Result<String, BackendError> {
    g.try_node(root)?;
    let mut ctx = CompilationContext::new(g, root, options.clone(), stage);
    for h in g.sorted_sub_expressions(root) {
        compile_node(g, &mut ctx, h)?;
    }
    let value = glsl_expression(g, &ctx, root)?;
    let output = output_statement(g.ty(root), &value, stage)?;
    Ok(ctx.finish(&output))
}

/// The assignment of the root value to the stage's output variable.
fn output_statement(ty: &Type, value: &str, stage: ShaderStage) -> Result<String, BackendError> {
    let target = match stage {
        ShaderStage::Fragment => "gl_FragColor",
        ShaderStage::Vertex => "gl_Position",
    };
    let widened = if *ty == Type::VEC4 {
        value.to_string()
    } else if *ty == Type::VEC3 {
        format!("vec4({value}, 1.0)")
    } else if *ty == Type::VEC2 {
        format!("vec4({value}, 0.0, 1.0)")
    } else if *ty == Type::FLOAT && stage == ShaderStage::Fragment {
        format!("vec4(vec3({value}), 1.0)")
    } else {
        return Err(BackendError::Unsupported(format!(
            "a {ty} result cannot be written to {target}"
        )));
    };
    Ok(format!("{target} = {widened};"))
}

/// Backend emitting GLSL ES 1.0 source.
#[derive(Debug)]
pub struct GlslBackend;

impl Backend for GlslBackend {
    fn name(&self) -> &str {
        "GLSL ES 1.0"
    }

    fn targets(&self) -> &[&str] {
        &["glsl", "glsl-es"]
    }

    fn compile(
        &self,
        g: &mut Graph,
        root: NodeHandle,
        opts: &BackendOptions,
    ) -> Result<BackendOutput, BackendError> {
        let source = compile_program(g, root, &GlslOptions::from(opts), opts.stage)?;
        let name = match opts.stage {
            ShaderStage::Fragment => "shader.frag",
            ShaderStage::Vertex => "shader.vert",
        };
        let resources = Resources::collect(g, root);
        let mut output = BackendOutput::single(name, source);
        output.diagnostics.push(Diagnostic::info(format!(
            "{} shader: {} uniform(s), {} texture(s), {} attribute buffer(s)",
            opts.stage,
            resources.uniforms.len(),
            resources.textures.len(),
            resources.attribute_buffers.len()
        )));
        Ok(output)
    }
}
