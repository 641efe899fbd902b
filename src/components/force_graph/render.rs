use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{EdgeInfo, ForceGraphState, NODE_RADIUS, control_point, loop_circle};

const BACKGROUND: &str = "#1a1a2e";
const FOUND_RING: &str = "#ffd54f";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// Opacity of a link or node: hover fades the rest, a find selection dims
/// everything not selected.
fn alpha(state: &ForceGraphState, highlighted: bool, found: bool, t: f64) -> f64 {
	let base = if state.has_found() && !found { 0.25 } else { 1.0 };
	if highlighted {
		base
	} else {
		base * (1.0 - 0.75 * t)
	}
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, arrow_size) = (1.5 / k, 6.0 / k);
	let t = ease_out_cubic(state.hover.highlight_t);
	let positions = state.positions();

	for edge in &state.edges {
		let (Some(&start), Some(&end)) = (positions.get(&edge.source), positions.get(&edge.target))
		else {
			continue;
		};
		let highlighted = !state.has_active_highlight()
			|| (state.is_highlighted(edge.source) && state.is_highlighted(edge.target));
		let found = state.found_links.contains(&edge.id);

		ctx.set_global_alpha(alpha(state, highlighted, found, t));
		ctx.set_stroke_style_str(&edge.color);
		ctx.set_fill_style_str(&edge.color);
		ctx.set_line_width(if found { line_width * 2.0 } else { line_width });

		if edge.source == edge.target {
			draw_loop(ctx, start, edge);
		} else {
			draw_curve(ctx, start, end, edge.curvature, arrow_size);
		}
	}
	ctx.set_global_alpha(1.0);
}

fn draw_loop(ctx: &CanvasRenderingContext2d, at: (f64, f64), edge: &EdgeInfo) {
	let ((cx, cy), radius) = loop_circle(at, edge.curvature, edge.rotation);
	ctx.begin_path();
	let _ = ctx.arc(cx, cy, radius, 0.0, 2.0 * PI);
	ctx.stroke();
}

fn draw_curve(
	ctx: &CanvasRenderingContext2d,
	start: (f64, f64),
	end: (f64, f64),
	curvature: f64,
	arrow_size: f64,
) {
	let (cx, cy) = control_point(start, end, curvature);

	// leave room for the node discs at both ends
	let trim = |from: (f64, f64), toward: (f64, f64)| {
		let (dx, dy) = (toward.0 - from.0, toward.1 - from.1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			return None;
		}
		Some(((dx / dist, dy / dist), (from.0 + dx / dist * NODE_RADIUS, from.1 + dy / dist * NODE_RADIUS)))
	};
	let (Some((_, from)), Some(((ux, uy), tip))) = (trim(start, (cx, cy)), trim(end, (cx, cy))) else {
		return;
	};

	ctx.begin_path();
	ctx.move_to(from.0, from.1);
	ctx.quadratic_curve_to(cx, cy, tip.0, tip.1);
	ctx.stroke();

	// (ux, uy) points from the target back along the curve
	let (back_x, back_y) = (tip.0 + ux * arrow_size, tip.1 + uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip.0, tip.1);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		let (x, y) = (node.x() as f64, node.y() as f64);
		let highlighted = !has_highlight || state.is_highlighted(idx);
		let found = state.found_nodes.contains(&idx);
		let alpha = alpha(state, highlighted, found, t);
		let radius = if state.is_hovered(idx) {
			NODE_RADIUS * (1.0 + 0.35 * t)
		} else {
			NODE_RADIUS
		};

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.data.user_data.color);
		ctx.fill();

		if found {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.5 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(FOUND_RING);
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		if let Some(label) = &node.data.user_data.label {
			ctx.set_fill_style_str("white");
			ctx.set_global_alpha(alpha * 0.8);
			ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
			let _ = ctx.fill_text(label, x + radius + 3.0, y + 3.0);
		}
		ctx.set_global_alpha(1.0);
	});
}
