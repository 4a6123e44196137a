//! External inputs referenced by an expression.

use shade_ir::{AttributeBuffer, Graph, NodeHandle, NodeKind, Texture};

/// Inputs the rendering layer must bind before drawing `root`.
///
/// Each list is in topological order with duplicates (same name) removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resources {
    pub attribute_buffers: Vec<AttributeBuffer>,
    /// Parameter nodes; their host values live on the graph.
    pub uniforms: Vec<NodeHandle>,
    pub textures: Vec<Texture>,
}

impl Resources {
    pub fn collect(g: &Graph, root: NodeHandle) -> Self {
        let mut out = Self::default();
        for h in g.sorted_sub_expressions(root) {
            match g.kind(h) {
                NodeKind::Attribute(buffer) => {
                    if !out.attribute_buffers.iter().any(|b| b.name == buffer.name) {
                        out.attribute_buffers.push(buffer.clone());
                    }
                }
                NodeKind::Parameter { name } => {
                    let seen = out.uniforms.iter().any(|&u| {
                        matches!(g.kind(u), NodeKind::Parameter { name: other } if other == name)
                    });
                    if !seen {
                        out.uniforms.push(h);
                    }
                }
                NodeKind::Sampler(texture) => {
                    if !out.textures.iter().any(|t| t.name == texture.name) {
                        out.textures.push(texture.clone());
                    }
                }
                _ => {}
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_buffers.is_empty() && self.uniforms.is_empty() && self.textures.is_empty()
    }
}

pub fn attribute_buffers(g: &Graph, root: NodeHandle) -> Vec<AttributeBuffer> {
    Resources::collect(g, root).attribute_buffers
}

pub fn uniforms(g: &Graph, root: NodeHandle) -> Vec<NodeHandle> {
    Resources::collect(g, root).uniforms
}

pub fn textures(g: &Graph, root: NodeHandle) -> Vec<Texture> {
    Resources::collect(g, root).textures
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_core::builtins::{add, mul, texture2d};
    use shade_core::ops;
    use shade_ir::{Type, Value};

    #[test]
    fn collects_each_input_once() {
        let mut g = Graph::new();
        let pos = AttributeBuffer {
            name: "position".into(),
            ty: Type::VEC2,
        };
        let p1 = ops::attribute(&mut g, pos.clone()).unwrap();
        let p2 = ops::attribute(&mut g, pos.clone()).unwrap();
        let scale = ops::uniform(&mut g, "scale", Value::Float(2.0)).unwrap();
        let tex = Texture {
            name: "image".into(),
            width: 8,
            height: 8,
        };
        let sampler = ops::sampler2d(&mut g, tex.clone()).unwrap();
        let sum = add(&mut g, p1, p2).unwrap();
        let scaled = mul(&mut g, sum, scale).unwrap();
        let texel = texture2d(&mut g, sampler, scaled).unwrap();

        let r = Resources::collect(&g, texel);
        assert_eq!(r.attribute_buffers, vec![pos]);
        assert_eq!(r.uniforms, vec![scale]);
        assert_eq!(r.textures, vec![tex]);
        assert_eq!(uniforms(&g, texel), vec![scale]);
    }

    #[test]
    fn constant_graphs_need_nothing() {
        let mut g = Graph::new();
        let root = add(&mut g, 1.0, 2.0).unwrap();
        assert!(Resources::collect(&g, root).is_empty());
        assert!(attribute_buffers(&g, root).is_empty());
        assert!(textures(&g, root).is_empty());
    }
}
