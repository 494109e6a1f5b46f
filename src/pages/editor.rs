use std::rc::Rc;

use leptos::prelude::*;

use crate::components::graph_editor::{
	Floorplan, FloorplanBounds, GraphEditor, GraphModel, GraphSnapshot, MediaAsset, MemoryStore, NewArea, NodeAttrs,
	PANORAMA_CATEGORY, Point, Position, category,
};

const STOPS: [(&str, f64, f64, Option<&str>); 7] = [
	("Entrance", 120.0, 520.0, Some("pano-entrance")),
	("Lobby", 260.0, 420.0, Some("pano-lobby")),
	("Gallery A", 440.0, 300.0, Some("pano-gallery-a")),
	("Gallery B", 660.0, 300.0, None),
	("Cafe", 440.0, 520.0, None),
	("Stairs", 660.0, 520.0, None),
	("Garden", 840.0, 160.0, Some("pano-garden")),
];

const LINKS: [(usize, usize); 7] = [(0, 1), (1, 2), (2, 3), (1, 4), (4, 5), (3, 5), (3, 6)];

fn pano_url(asset_id: &str) -> String {
	format!("/panoramas/{asset_id}.jpg")
}

/// A small two-wing museum floor used by the demo store.
fn sample_venue() -> GraphSnapshot {
	let mut model = GraphModel::new();
	model.set_floorplan(Floorplan {
		image_ref: None,
		scale: 1.0,
		bounds: FloorplanBounds::from_extents(0.0, 0.0, 960.0, 640.0),
	});

	let ids: Vec<_> = STOPS
		.iter()
		.map(|&(label, x, y, pano)| {
			let attrs = NodeAttrs {
				label: Some(label.to_owned()),
				panorama_asset_id: pano.map(str::to_owned),
				panorama_url: pano.map(pano_url),
				..Default::default()
			};
			model.add_node(Position::new(x, y, 0.0), attrs).id
		})
		.collect();
	for (a, b) in LINKS {
		model.add_connection(&ids[a], &ids[b]);
	}

	let rooms = [
		("Main hall", category::HALL, [(60.0, 360.0), (340.0, 360.0), (340.0, 600.0), (60.0, 600.0)], 0),
		("East gallery", category::EXHIBIT, [(380.0, 220.0), (720.0, 220.0), (720.0, 360.0), (380.0, 360.0)], 2),
		("Garden", category::OUTDOOR, [(760.0, 60.0), (920.0, 60.0), (920.0, 260.0), (760.0, 260.0)], 6),
	];
	for (name, kind, corners, start) in rooms {
		let area = model.add_area(NewArea {
			name: name.to_owned(),
			category: kind.to_owned(),
			description: String::new(),
			boundary: corners.iter().map(|&(x, y)| Point::new(x, y)).collect(),
		});
		if let Some(area) = area {
			model.set_area_start_node(&area.id, Some(ids[start].clone()));
		}
	}
	model.snapshot()
}

fn sample_media() -> Vec<MediaAsset> {
	let panoramas = STOPS.iter().filter_map(|s| s.3).chain(["pano-stairs"]).map(|id| MediaAsset {
		asset_id: id.to_owned(),
		url: pano_url(id),
		width: 4096,
		height: 2048,
		category: PANORAMA_CATEGORY.to_owned(),
	});
	let photos = ["cafe-counter", "gallery-b-wall"].into_iter().map(|id| MediaAsset {
		asset_id: id.to_owned(),
		url: format!("/photos/{id}.jpg"),
		width: 1600,
		height: 1200,
		category: "photo".to_owned(),
	});
	panoramas.chain(photos).collect()
}

/// Editor page backed by an in-memory store seeded with a sample venue.
#[component]
pub fn EditorPage() -> impl IntoView {
	let store = Rc::new(MemoryStore::new(sample_venue()));
	let media = Signal::derive(sample_media);

	view! {
		<div class="fullscreen-editor">
			<GraphEditor store=store media=media />
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sample_venue_is_connected_and_consistent() {
		let snapshot = sample_venue();
		assert_eq!(snapshot.nodes.len(), STOPS.len());
		assert_eq!(snapshot.connections.len(), LINKS.len());
		assert_eq!(snapshot.areas.len(), 3);
		assert!(snapshot.areas.iter().all(|a| a.start_node_id.is_some()));
		assert!(GraphModel::from_snapshot(snapshot).is_consistent());
	}

	#[test]
	fn sample_media_offers_unbound_panorama() {
		let media = sample_media();
		assert!(media.iter().any(|m| m.asset_id == "pano-stairs" && m.is_panorama()));
		assert_eq!(media.iter().filter(|m| !m.is_panorama()).count(), 2);
	}
}
