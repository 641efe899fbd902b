use leptos::prelude::*;

use crate::graph::FilterSettings;

/// Link weight bounds and data-source checkboxes.
#[component]
pub fn FilterPanel(settings: RwSignal<FilterSettings>) -> impl IntoView {
	let set_bound = move |upper: bool, raw: String| {
		let Ok(value) = raw.trim().parse::<f64>() else {
			return;
		};
		settings.update(|s| {
			let value = value.clamp(0.0, 100.0);
			if upper {
				s.link_weight_range.1 = value;
			} else {
				s.link_weight_range.0 = value;
			}
		});
	};

	view! {
		<div class="filter-panel">
			<label>
				"Link weight "
				<input
					type="number"
					min="0"
					max="100"
					prop:value=move || settings.with(|s| s.link_weight_range.0.to_string())
					on:change=move |ev| set_bound(false, event_target_value(&ev))
				/>
				" to "
				<input
					type="number"
					min="0"
					max="100"
					prop:value=move || settings.with(|s| s.link_weight_range.1.to_string())
					on:change=move |ev| set_bound(true, event_target_value(&ev))
				/>
			</label>
			<ul class="data-sources">
				{move || {
					settings
						.with(|s| s.data_sources.clone())
						.into_iter()
						.enumerate()
						.map(|(i, source)| {
							view! {
								<li>
									<label>
										<input
											type="checkbox"
											prop:checked=source.checked
											on:change=move |ev| {
												let checked = event_target_checked(&ev);
												settings.update(|s| {
													if let Some(entry) = s.data_sources.get_mut(i) {
														entry.checked = checked;
													}
												});
											}
										/>
										{source.label}
									</label>
								</li>
							}
						})
						.collect_view()
				}}
			</ul>
		</div>
	}
}
