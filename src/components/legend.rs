use leptos::prelude::*;

use crate::graph::{HiddenTypes, TypeMappings, TypeTable};

/// Which table a legend entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegendKind {
	Node,
	Link,
}

/// Node and link type tables with click-to-hide entries.
#[component]
pub fn Legend(
	#[prop(into)] types: Signal<TypeMappings>,
	#[prop(into)] hidden: Signal<HiddenTypes>,
	/// Called with the clicked type; the caller toggles it and re-runs the
	/// pipeline.
	on_toggle: Callback<(LegendKind, String)>,
) -> impl IntoView {
	view! {
		<div class="legend">
			<h3>"Nodes"</h3>
			<LegendTable
				table=Signal::derive(move || types.with(|t| t.nodes.clone()))
				hidden=Signal::derive(move || hidden.with(|h| h.nodes.iter().cloned().collect::<Vec<_>>()))
				kind=LegendKind::Node
				on_toggle=on_toggle
			/>
			<h3>"Links"</h3>
			<LegendTable
				table=Signal::derive(move || types.with(|t| t.links.clone()))
				hidden=Signal::derive(move || hidden.with(|h| h.links.iter().cloned().collect::<Vec<_>>()))
				kind=LegendKind::Link
				on_toggle=on_toggle
			/>
		</div>
	}
}

#[component]
fn LegendTable(
	table: Signal<TypeTable>,
	hidden: Signal<Vec<String>>,
	kind: LegendKind,
	on_toggle: Callback<(LegendKind, String)>,
) -> impl IntoView {
	view! {
		<ul class="legend-table">
			{move || {
				let hidden = hidden.get();
				table
					.get()
					.0
					.into_iter()
					.map(|entry| {
						let is_hidden = hidden.contains(&entry.name);
						// shown count differs from the total once filters apply
						let count = match entry.actual_quantity {
							Some(actual) if actual != entry.quantity => {
								format!("{actual}/{}", entry.quantity)
							}
							_ => entry.quantity.to_string(),
						};
						let name = entry.name.clone();
						view! {
							<li
								class="legend-entry"
								class:hidden=is_hidden
								on:click=move |_| on_toggle.run((kind, name.clone()))
							>
								<span class="swatch" style=format!("background: {}", entry.color)></span>
								<span class="type-name">{entry.name}</span>
								<span class="type-count">{count}</span>
							</li>
						}
					})
					.collect_view()
			}}
		</ul>
	}
}
