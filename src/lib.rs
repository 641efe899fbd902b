//! Knowledge-graph query canvas: the filter/annotation pipeline that turns a
//! backend message into a colored render graph, the find tool's selector
//! language, and the Leptos client-side app that wires them to a canvas.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

pub mod find;
pub mod graph;

// UI
mod components;
mod pages;

use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// An app router which renders the query canvas and handles 404's
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		<Title text="Knowledge Graph Query Canvas" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
