//! Integration test: build a small color-gradient graph by hand and check
//! its structure and diagnostic dumps.

use shade_ir::*;

/// Builds `vec4(fragCoord.x, 0.25, 0.25, 1.0)` with the constant shared.
fn gradient() -> (Graph, NodeHandle) {
    let mut g = Graph::new();
    let coord = g.append(NodeKind::FragCoord, Type::VEC4, vec![]).unwrap();
    let x = g
        .append(
            NodeKind::Swizzle {
                pattern: "x".into(),
                indices: vec![0],
                materialize: false,
            },
            Type::FLOAT,
            vec![coord],
        )
        .unwrap();
    let quarter = g
        .append(NodeKind::Constant(Value::Float(0.25)), Type::FLOAT, vec![])
        .unwrap();
    let one = g
        .append(NodeKind::Constant(Value::Float(1.0)), Type::FLOAT, vec![])
        .unwrap();
    let color = g
        .append(NodeKind::Construct, Type::VEC4, vec![x, quarter, quarter, one])
        .unwrap();
    (g, color)
}

#[test]
fn build_gradient_graph() {
    let (g, color) = gradient();
    assert_eq!(g.len(), 5);
    assert_eq!(g.ty(color), &Type::VEC4);
    assert_eq!(g.parents(color).len(), 4);

    let order = g.sorted_sub_expressions(color);
    assert_eq!(order.len(), 5);
    for (pos, &h) in order.iter().enumerate() {
        for p in g.parents(h) {
            let ppos = order.iter().position(|x| x == p).unwrap();
            assert!(ppos < pos, "parent {p} listed after child {h}");
        }
    }
    assert_eq!(*order.last().unwrap(), color);
}

#[test]
fn gradient_dumps() {
    let (g, color) = gradient();
    let text = debug_print(&g, color);
    assert!(text.starts_with("[construct:4] vec4 ("));
    assert!(text.contains("[swizzle{x}:1] float ("));
    assert!(text.contains("[fragCoord:0] vec4 ()"));
    assert!(text.contains("{{2}}"));

    let json = to_json(&g, color);
    assert_eq!(json["parents"].as_array().unwrap().len(), 4);
    assert_eq!(json["parents"][0]["kind"], "swizzle{x}");
    assert_eq!(json["parents"][2]["ref"], 2);
}

#[test]
fn handles_from_another_graph_are_rejected() {
    let (mut g, _) = gradient();
    let (mut big, _) = gradient();
    let mut far = None;
    for _ in 0..10 {
        far = Some(
            big.append(NodeKind::FragCoord, Type::VEC4, vec![])
                .unwrap(),
        );
    }
    let err = g
        .append(NodeKind::Array, Type::array(Type::VEC4, 1), vec![far.unwrap()])
        .unwrap_err();
    assert!(matches!(err, ShadeError::BadHandle { size: 5, .. }));
}
