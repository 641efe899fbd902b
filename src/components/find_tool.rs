use leptos::prelude::*;

use super::force_graph::Highlight;
use crate::find;
use crate::graph::Message;

/// Text box for selector queries. Every edit re-runs the query against the
/// current graph and reports the selection through `on_result`.
#[component]
pub fn FindTool(message: RwSignal<Message>, on_result: Callback<Highlight>) -> impl IntoView {
	let (query, set_query) = signal(String::new());
	let (status, set_status) = signal(String::new());

	Effect::new(move |_| {
		let text = query.get();
		if text.trim().is_empty() {
			set_status.set(String::new());
			on_result.run(Highlight::default());
			return;
		}
		let outcome = message.with(|m| {
			find::search(m, &text).map(|found| Highlight {
				nodes: found.nodes.iter().map(|n| n.id.clone()).collect(),
				links: found.links.iter().map(|l| l.id.clone()).collect(),
			})
		});
		match outcome {
			Ok(highlight) => {
				set_status.set(format!(
					"{} nodes, {} links",
					highlight.nodes.len(),
					highlight.links.len()
				));
				on_result.run(highlight);
			}
			Err(e) => {
				set_status.set(e);
				on_result.run(Highlight::default());
			}
		}
	});

	view! {
		<div class="find-tool">
			<input
				type="text"
				placeholder=r#"nodes{"type:includes": "gene"} -> links -> nodes"#
				prop:value=query
				on:input=move |ev| set_query.set(event_target_value(&ev))
			/>
			<p class="find-status">{status}</p>
		</div>
	}
}
