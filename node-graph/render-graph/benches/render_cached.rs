use chunky_image::operation::EllipseOperation;
use chunky_image::{ChunkCoordinate, Color, IRect, Paint, Resolution};
use criterion::{Criterion, criterion_group, criterion_main};
use glam::IVec2;
use render_graph::{FrameTime, Node, NodeGraph, RenderConfig};
use std::hint::black_box;

fn layered_graph() -> NodeGraph {
	let config = RenderConfig {
		document_width: 1024,
		document_height: 1024,
		..Default::default()
	};
	let mut graph = NodeGraph::from_config(&config);

	let mut image = config.new_image();
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(64, 64), IVec2::new(900, 700)), Paint::new(Color::RED));
	image.commit();
	image.enqueue_ellipse(EllipseOperation::filled(IRect::from_corners(IVec2::splat(100), IVec2::splat(600)), Paint::new(Color::BLUE)));

	let background = graph.add_node(Node::solid_color(Color::WHITE)).unwrap();
	let layer = graph.add_node(Node::image_layer(image)).unwrap();
	let tint = graph.add_node(Node::tint(Color::GREEN)).unwrap();
	let merge = graph.add_node(Node::merge()).unwrap();
	graph.connect(background, "Output", layer, "Background").unwrap();
	graph.connect(layer, "Output", tint, "Input").unwrap();
	graph.connect(background, "Output", merge, "Background").unwrap();
	graph.connect(tint, "Output", merge, "Foreground").unwrap();
	graph.set_input_value(merge, "Opacity", 0.5).unwrap();
	graph.connect(merge, "Output", graph.output_node(), "Background").unwrap();
	graph
}

fn render_chunk(c: &mut Criterion) {
	let graph = layered_graph();
	let coordinate = ChunkCoordinate::new(1, 1);
	let render = |graph: &NodeGraph| black_box(graph.render_chunk(black_box(coordinate), Resolution::Full, FrameTime::default()).unwrap());

	let mut group = c.benchmark_group("Render Chunk");
	group.bench_function("uncached", |b| {
		b.iter(|| {
			for id in graph.node_ids() {
				graph.node(id).unwrap().clear_cache();
			}
			render(&graph)
		})
	});
	render(&graph);
	group.bench_function("cached", |b| b.iter(|| render(&graph)));
	group.finish();
}

criterion_group!(benches, render_chunk);
criterion_main!(benches);
