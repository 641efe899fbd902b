pub mod filter_panel;
pub mod find_tool;
pub mod force_graph;
pub mod legend;
