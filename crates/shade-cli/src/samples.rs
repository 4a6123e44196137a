//! Built-in sample graphs the driver can compile.

use shade_backend_core::ShaderStage;
use shade_core::builtins::{add, clamp, dot, lt, max, mul, normalize, sin, texture2d};
use shade_core::{make, ops};
use shade_ir::{AttributeBuffer, Graph, NodeHandle, Result, Texture, Type, Value};

/// A named expression together with the stage it is meant for.
pub struct Sample {
    pub name: &'static str,
    pub description: &'static str,
    pub stage: ShaderStage,
    build: fn(&mut Graph) -> Result<NodeHandle>,
}

impl Sample {
    /// Builds the sample into a fresh graph.
    pub fn build(&self) -> Result<(Graph, NodeHandle)> {
        let mut g = Graph::new();
        let root = (self.build)(&mut g)?;
        Ok((g, root))
    }
}

pub static SAMPLES: &[Sample] = &[
    Sample {
        name: "gradient",
        description: "screen-space color ramp from gl_FragCoord",
        stage: ShaderStage::Fragment,
        build: gradient,
    },
    Sample {
        name: "swizzle",
        description: "channel reordering of a uniform color",
        stage: ShaderStage::Fragment,
        build: swizzle,
    },
    Sample {
        name: "lighting",
        description: "Lambertian diffuse term with an ambient floor",
        stage: ShaderStage::Fragment,
        build: lighting,
    },
    Sample {
        name: "scatter",
        description: "scaled point positions from two attribute buffers",
        stage: ShaderStage::Vertex,
        build: scatter,
    },
    Sample {
        name: "texture",
        description: "texture lookup at the fragment position",
        stage: ShaderStage::Fragment,
        build: texture,
    },
    Sample {
        name: "folding",
        description: "constant sub-expressions, a lookup table and a discard",
        stage: ShaderStage::Fragment,
        build: folding,
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|s| s.name == name)
}

fn gradient(g: &mut Graph) -> Result<NodeHandle> {
    let coord = ops::frag_coord(g)?;
    let xy = ops::swizzle(g, coord, "xy")?;
    let uv = mul(g, xy, 1.0 / 512.0)?;
    let uv = clamp(g, uv, 0.0, 1.0)?;
    ops::vec(g, vec![uv.into(), 0.5.into(), 1.0.into()])
}

fn swizzle(g: &mut Graph) -> Result<NodeHandle> {
    let color = ops::uniform(g, "color", Value::Vec(vec![1.0, 0.5, 0.25, 1.0]))?;
    let bgr = ops::swizzle(g, color, "bgr")?;
    let alpha = ops::swizzle(g, color, "a")?;
    ops::vec(g, vec![bgr.into(), alpha.into()])
}

fn lighting(g: &mut Graph) -> Result<NodeHandle> {
    let normal = ops::uniform(g, "normal", Value::Vec(vec![0.0, 0.0, 1.0]))?;
    let light = ops::uniform(g, "light_dir", Value::Vec(vec![0.0, 0.6, 0.8]))?;
    let n = normalize(g, normal)?;
    let l = normalize(g, light)?;
    let lambert = dot(g, n, l)?;
    let diffuse = max(g, lambert, 0.0)?;
    let intensity = add(g, diffuse, 0.1)?;
    mul(g, Value::Vec(vec![0.8, 0.6, 0.4]), intensity)
}

fn scatter(g: &mut Graph) -> Result<NodeHandle> {
    let position = make(
        g,
        AttributeBuffer {
            name: "position".into(),
            ty: Type::VEC2,
        },
    )?;
    let offset = make(
        g,
        AttributeBuffer {
            name: "offset".into(),
            ty: Type::VEC2,
        },
    )?;
    let scale = ops::uniform(g, "scale", Value::Float(0.5))?;
    let moved = add(g, position, offset)?;
    let scaled = mul(g, moved, scale)?;
    ops::vec(g, vec![scaled.into(), 0.0.into(), 1.0.into()])
}

fn texture(g: &mut Graph) -> Result<NodeHandle> {
    let image = make(
        g,
        Texture {
            name: "image".into(),
            width: 512,
            height: 512,
        },
    )?;
    let coord = ops::frag_coord(g)?;
    let xy = ops::swizzle(g, coord, "xy")?;
    let uv = mul(g, xy, 1.0 / 512.0)?;
    texture2d(g, image, uv)
}

fn folding(g: &mut Graph) -> Result<NodeHandle> {
    let t = ops::uniform(g, "t", Value::Float(0.25))?;
    let wave = sin(g, 0.5)?;
    let gain = mul(g, wave, 2.0)?;
    let table = make(g, vec![0.5, 0.25, 0.125])?;
    let bias = ops::at(g, table, 1)?;
    let scaled = mul(g, t, gain)?;
    let value = add(g, scaled, bias)?;
    let negative = lt(g, t, 0.0)?;
    ops::discard_if(g, value, negative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_backend_glsl::{GlslOptions, compile_program};

    #[test]
    fn names_are_unique() {
        for (i, s) in SAMPLES.iter().enumerate() {
            assert!(SAMPLES[i + 1..].iter().all(|o| o.name != s.name));
            assert!(std::ptr::eq(find(s.name).unwrap(), s));
        }
        assert!(find("missing").is_none());
    }

    #[test]
    fn every_sample_compiles_to_glsl() {
        for s in SAMPLES {
            let (mut g, root) = s.build().unwrap();
            let src = compile_program(&mut g, root, &GlslOptions::default(), s.stage)
                .unwrap_or_else(|e| panic!("{}: {e}", s.name));
            assert!(src.contains("void main()"), "{}", s.name);
        }
    }

    #[test]
    fn folding_sample_evaluates_on_host() {
        let (g, root) = find("folding").unwrap().build().unwrap();
        let v = shade_core::evaluate(&g, root).unwrap().as_f32().unwrap();
        let expected = 0.25 * 0.5f32.sin() * 2.0 + 0.25;
        assert!((v - expected).abs() < 1e-6);
    }
}
