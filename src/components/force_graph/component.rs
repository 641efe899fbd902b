use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use crate::graph::GraphModel;

/// Ids selected by the find tool, drawn with a ring.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Highlight {
	pub nodes: Vec<String>,
	pub links: Vec<String>,
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

fn local_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphModel>,
	#[prop(into, default = Signal::stored(Highlight::default()))] highlight: Signal<Highlight>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<ForceGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	// Rebuilt whenever the pipeline produces a new model; the animation loop
	// and resize listener are installed once.
	Effect::new(move |_| {
		let model = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			warn!("no window, canvas not started");
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let mut next = ForceGraphState::new(&model, w, h);
		let current = highlight.get_untracked();
		next.set_found(
			current.nodes.iter().map(String::as_str),
			current.links.iter().map(String::as_str),
		);
		debug!("canvas: {} nodes, {} links", model.nodes.len(), model.links.len());
		*state_init.borrow_mut() = Some(next);

		if animate_init.borrow().is_some() {
			return;
		}
		let Some(ctx) = context_2d(&canvas) else {
			warn!("2d canvas context unavailable");
			return;
		};

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				if s.animation_running {
					s.tick(0.016);
				}
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_hl = state.clone();
	Effect::new(move |_| {
		let current = highlight.get();
		if let Some(ref mut s) = *state_hl.borrow_mut() {
			s.set_found(
				current.nodes.iter().map(String::as_str),
				current.links.iter().map(String::as_str),
			);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};

		if let Some(ref mut s) = *state_md.borrow_mut() {
			if let Some(idx) = s.node_at_position(x, y) {
				s.drag.active = true;
				s.drag.node_idx = Some(idx);
				s.drag.start_x = x;
				s.drag.start_y = y;
				let mut start = (0.0, 0.0);
				s.graph.visit_nodes(|node| {
					if node.index() == idx {
						start = (node.x(), node.y());
					}
				});
				(s.drag.node_start_x, s.drag.node_start_y) = start;
			} else {
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};

		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if !s.drag.active {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
			}

			if s.drag.active {
				if let Some(idx) = s.drag.node_idx {
					let (dx, dy) = (
						(x - s.drag.start_x) / s.transform.k,
						(y - s.drag.start_y) / s.transform.k,
					);
					let (nx, ny) = (
						s.drag.node_start_x + dx as f32,
						s.drag.node_start_y + dy as f32,
					);
					s.graph.visit_nodes_mut(|node| {
						if node.index() == idx {
							node.data.x = nx;
							node.data.y = ny;
							node.data.is_anchor = true;
						}
					});
				}
			} else if s.pan.active {
				s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
				s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
			s.set_hover(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
