use leptos::prelude::*;
use log::{error, info};

use crate::components::filter_panel::FilterPanel;
use crate::components::find_tool::FindTool;
use crate::components::force_graph::{ForceGraphCanvas, Highlight};
use crate::components::legend::{Legend, LegendKind};
use crate::graph::{DataSource, FilterSettings, Message, Pipeline};

const SAMPLE_MESSAGE: &str = include_str!("../../assets/sample_message.json");

fn load_sample() -> Message {
	Message::from_json(SAMPLE_MESSAGE).unwrap_or_else(|e| {
		error!("{e}");
		Message::default()
	})
}

/// Runs the query pipeline in place, from `from` onwards or in full,
/// reporting a broken stage instead of rendering a half-built graph.
fn rerun(message: &mut Message, settings: &FilterSettings, from: Option<&str>) -> Option<String> {
	let pipeline = Pipeline::query();
	let outcome = match from {
		Some(stage) => pipeline.run_from(stage, message, settings),
		None => pipeline.run(message, settings),
	};
	match outcome {
		Ok(graph) => {
			info!("graph: {} nodes, {} links", graph.nodes.len(), graph.links.len());
			None
		}
		Err(e) => {
			error!("{e}");
			Some(e.to_string())
		}
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let initial = load_sample();
	let settings = RwSignal::new(FilterSettings {
		data_sources: DataSource::collect(&initial.knowledge_graph),
		..FilterSettings::default()
	});
	let message = RwSignal::new(initial);
	let (failure, set_failure) = signal(None::<String>);
	let (highlight, set_highlight) = signal(Highlight::default());

	Effect::new(move |_| {
		let current = settings.get();
		set_failure.set(message.try_update(|m| rerun(m, &current, None)).flatten());
	});

	let graph = Signal::derive(move || message.with(|m| m.graph.clone()));
	let types = Signal::derive(move || message.with(|m| m.graph.type_mappings.clone()));
	let hidden = Signal::derive(move || message.with(|m| m.graph.hidden_types.clone()));

	let on_toggle = Callback::new(move |(kind, name): (LegendKind, String)| {
		let current = settings.get_untracked();
		let outcome = message.try_update(|m| {
			match kind {
				LegendKind::Node => m.graph.hidden_types.toggle_node_type(&name),
				LegendKind::Link => m.graph.hidden_types.toggle_link_type(&name),
			};
			rerun(m, &current, Some("type-color"))
		});
		set_failure.set(outcome.flatten());
	});

	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas data=graph highlight=highlight fullscreen=true />
			<div class="graph-overlay">
				<h1>"Knowledge Graph"</h1>
				<p class="subtitle">"Click a legend entry to hide its type. Drag nodes, scroll to zoom."</p>
				{move || failure.get().map(|e| view! { <p class="error">{e}</p> })}
				<FindTool message=message on_result=Callback::new(move |h| set_highlight.set(h)) />
				<FilterPanel settings=settings />
				<Legend types=types hidden=hidden on_toggle=on_toggle />
			</div>
		</div>
	}
}
