pub mod graph_editor;
pub mod panorama;
