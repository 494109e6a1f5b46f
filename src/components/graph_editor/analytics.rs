//! Read-only graph analytics: A* routing, force-directed layout, statistics.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::model::GraphModel;
use super::types::{NodeId, Position};

#[derive(Clone, Copy, Debug)]
struct OpenEntry {
	f: f64,
	g: f64,
	index: usize,
}

impl PartialEq for OpenEntry {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for OpenEntry {
	// BinaryHeap is a max-heap: invert so the lowest f-score pops first,
	// then the lowest node index for a stable tie-break.
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.f
			.total_cmp(&self.f)
			.then_with(|| other.index.cmp(&self.index))
	}
}

/// Directed adjacency by node index. One-way connections only go `from -> to`.
fn adjacency(model: &GraphModel, index_of: &HashMap<&NodeId, usize>) -> Vec<Vec<(usize, f64)>> {
	let mut adj = vec![Vec::new(); model.nodes().len()];
	for c in model.connections() {
		let (Some(&a), Some(&b)) = (index_of.get(&c.from_node_id), index_of.get(&c.to_node_id)) else {
			continue;
		};
		adj[a].push((b, c.distance));
		if c.bidirectional {
			adj[b].push((a, c.distance));
		}
	}
	adj
}

/// Shortest route from `start` to `goal` as an ordered list of node ids,
/// or `None` when the goal is unreachable or either id is unknown.
pub fn find_path(model: &GraphModel, start: &NodeId, goal: &NodeId) -> Option<Vec<NodeId>> {
	let nodes = model.nodes();
	let index_of: HashMap<&NodeId, usize> = nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();
	let (&s, &t) = (index_of.get(start)?, index_of.get(goal)?);
	if s == t {
		return Some(vec![start.clone()]);
	}

	let adj = adjacency(model, &index_of);
	let heuristic = |i: usize| nodes[i].position.planar_distance(&nodes[t].position);

	let mut g_score = vec![f64::INFINITY; nodes.len()];
	let mut came_from: Vec<Option<usize>> = vec![None; nodes.len()];
	let mut closed = vec![false; nodes.len()];
	let mut open = BinaryHeap::new();

	g_score[s] = 0.0;
	open.push(OpenEntry {
		f: heuristic(s),
		g: 0.0,
		index: s,
	});

	while let Some(OpenEntry { g, index, .. }) = open.pop() {
		if index == t {
			let mut path = vec![nodes[t].id.clone()];
			let mut cursor = t;
			while let Some(prev) = came_from[cursor] {
				path.push(nodes[prev].id.clone());
				cursor = prev;
			}
			path.reverse();
			return Some(path);
		}
		if closed[index] || g > g_score[index] {
			continue;
		}
		closed[index] = true;

		for &(next, cost) in &adj[index] {
			if closed[next] {
				continue;
			}
			let tentative = g + cost;
			if tentative < g_score[next] {
				g_score[next] = tentative;
				came_from[next] = Some(index);
				open.push(OpenEntry {
					f: tentative + heuristic(next),
					g: tentative,
					index: next,
				});
			}
		}
	}
	None
}

/// Sum of connection distances along `path`, `None` if a hop is not connected.
pub fn path_length(model: &GraphModel, path: &[NodeId]) -> Option<f64> {
	path.windows(2)
		.map(|hop| model.connection_between(&hop[0], &hop[1]).map(|c| c.distance))
		.sum()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
	pub iterations: usize,
	pub repulsion: f64,
	pub spring: f64,
	pub damping: f64,
	pub step: f64,
	/// Per-iteration displacement cap, keeps far-apart starts from overshooting.
	pub max_speed: f64,
}

impl Default for LayoutParams {
	fn default() -> Self {
		Self {
			iterations: 100,
			repulsion: 1_000_000.0,
			spring: 100.0,
			damping: 0.9,
			step: 0.01,
			max_speed: 50.0,
		}
	}
}

/// Force-directed layout in the floor plane. Locked nodes stay put and the
/// height (`z`) of every moved node is pinned to 0. Returns the new position
/// of every unlocked node; applying them is up to the caller.
pub fn auto_layout(model: &GraphModel, params: &LayoutParams) -> Vec<(NodeId, Position)> {
	let nodes = model.nodes();
	let n = nodes.len();
	let index_of: HashMap<&NodeId, usize> = nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();
	let edges: Vec<(usize, usize)> = model
		.connections()
		.iter()
		.filter_map(|c| Some((*index_of.get(&c.from_node_id)?, *index_of.get(&c.to_node_id)?)))
		.collect();

	let mut pos: Vec<(f64, f64)> = nodes.iter().map(|n| (n.position.x, n.position.y)).collect();
	let mut vel = vec![(0.0, 0.0); n];

	for _ in 0..params.iterations {
		let mut force = vec![(0.0, 0.0); n];

		for i in 0..n {
			for j in (i + 1)..n {
				let (mut dx, mut dy) = (pos[i].0 - pos[j].0, pos[i].1 - pos[j].1);
				let mut dist = dx.hypot(dy);
				if dist < 1e-6 {
					// coincident nodes: push apart along a deterministic axis
					(dx, dy, dist) = (1.0, 0.0, 1.0);
				}
				let dist = dist.max(0.01);
				let f = params.repulsion / (dist * dist);
				let (fx, fy) = (dx / dist * f, dy / dist * f);
				force[i].0 += fx;
				force[i].1 += fy;
				force[j].0 -= fx;
				force[j].1 -= fy;
			}
		}

		for &(a, b) in &edges {
			let (dx, dy) = (pos[b].0 - pos[a].0, pos[b].1 - pos[a].1);
			let dist = dx.hypot(dy);
			if dist < 1e-6 {
				continue;
			}
			let f = dist * dist / params.spring;
			let (fx, fy) = (dx / dist * f, dy / dist * f);
			force[a].0 += fx;
			force[a].1 += fy;
			force[b].0 -= fx;
			force[b].1 -= fy;
		}

		for i in 0..n {
			if nodes[i].locked {
				continue;
			}
			vel[i].0 = (vel[i].0 + force[i].0 * params.step) * params.damping;
			vel[i].1 = (vel[i].1 + force[i].1 * params.step) * params.damping;
			let speed = vel[i].0.hypot(vel[i].1);
			if speed > params.max_speed {
				let scale = params.max_speed / speed;
				vel[i].0 *= scale;
				vel[i].1 *= scale;
			}
			pos[i].0 += vel[i].0;
			pos[i].1 += vel[i].1;
		}
	}

	nodes
		.iter()
		.zip(pos)
		.filter(|(node, _)| !node.locked)
		.map(|(node, (x, y))| (node.id.clone(), Position::new(x, y, 0.0)))
		.collect()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphStats {
	pub node_count: usize,
	pub connection_count: usize,
	pub isolated_nodes: usize,
	pub components: usize,
	pub average_degree: f64,
	pub max_degree: usize,
	pub density: f64,
	pub with_panorama: usize,
}

pub fn graph_stats(model: &GraphModel) -> GraphStats {
	let nodes = model.nodes();
	let n = nodes.len();
	let e = model.connections().len();

	let mut seen: HashSet<&NodeId> = HashSet::new();
	let mut components = 0;
	for node in nodes {
		if !seen.insert(&node.id) {
			continue;
		}
		components += 1;
		let mut stack = vec![node];
		while let Some(current) = stack.pop() {
			for neighbor in &current.connections {
				if seen.insert(neighbor) {
					if let Some(next) = model.node(neighbor) {
						stack.push(next);
					}
				}
			}
		}
	}

	GraphStats {
		node_count: n,
		connection_count: e,
		isolated_nodes: nodes.iter().filter(|n| n.connections.is_empty()).count(),
		components,
		average_degree: if n == 0 { 0.0 } else { 2.0 * e as f64 / n as f64 },
		max_degree: nodes.iter().map(|n| n.connections.len()).max().unwrap_or(0),
		density: if n < 2 {
			0.0
		} else {
			2.0 * e as f64 / (n as f64 * (n as f64 - 1.0))
		},
		with_panorama: nodes.iter().filter(|n| n.has_panorama()).count(),
	}
}

#[cfg(test)]
mod tests {
	use float_cmp::approx_eq;

	use super::*;
	use crate::components::graph_editor::types::NodeAttrs;

	fn add(model: &mut GraphModel, x: f64, y: f64) -> NodeId {
		model.add_node(Position::new(x, y, 0.0), NodeAttrs::default()).id
	}

	#[test]
	fn astar_walks_the_chain_and_misses_disconnected() {
		let mut model = GraphModel::new();
		let a = add(&mut model, 0.0, 0.0);
		let b = add(&mut model, 3.0, 0.0);
		let c = add(&mut model, 3.0, 4.0);
		let d = add(&mut model, 100.0, 100.0);
		model.add_connection(&a, &b);
		model.add_connection(&b, &c);
		assert!(approx_eq!(f64, model.connection_between(&a, &b).unwrap().distance, 3.0));
		assert!(approx_eq!(f64, model.connection_between(&b, &c).unwrap().distance, 4.0));

		let path = find_path(&model, &a, &c).unwrap();
		assert_eq!(path, vec![a.clone(), b.clone(), c.clone()]);
		assert!(approx_eq!(f64, path_length(&model, &path).unwrap(), 7.0));
		assert_eq!(find_path(&model, &a, &d), None);
		assert_eq!(find_path(&model, &a, &a), Some(vec![a.clone()]));
	}

	#[test]
	fn loaded_graph_routes_on_true_lengths() {
		let mut model = GraphModel::new();
		let a = add(&mut model, 0.0, 0.0);
		let b = add(&mut model, 10.0, 0.0);
		let c = add(&mut model, 5.0, 5.0);
		model.add_connection(&a, &b);
		model.add_connection(&a, &c);
		model.add_connection(&c, &b);
		let mut snapshot = model.snapshot();
		for connection in &mut snapshot.connections {
			if connection.joins(&a, &b) {
				connection.distance = 100.0;
			}
		}

		let loaded = GraphModel::from_snapshot(snapshot);
		assert_eq!(find_path(&loaded, &a, &b), Some(vec![a.clone(), b.clone()]));
	}

	#[test]
	fn astar_prefers_cheaper_detour() {
		let mut model = GraphModel::new();
		let a = add(&mut model, 0.0, 0.0);
		let b = add(&mut model, 5.0, 1.0);
		let c = add(&mut model, 10.0, 0.0);
		let far = add(&mut model, 5.0, 40.0);
		model.add_connection(&a, &far);
		model.add_connection(&far, &c);
		model.add_connection(&a, &b);
		model.add_connection(&b, &c);
		assert_eq!(find_path(&model, &a, &c).unwrap(), vec![a, b, c]);
	}

	#[test]
	fn astar_respects_one_way_connections() {
		let mut model = GraphModel::new();
		let a = add(&mut model, 0.0, 0.0);
		let b = add(&mut model, 1.0, 0.0);
		model.try_add_connection(&a, &b, false).unwrap();
		assert!(find_path(&model, &a, &b).is_some());
		assert!(find_path(&model, &b, &a).is_none());
	}

	#[test]
	fn layout_separates_nodes_and_flattens_height() {
		let mut model = GraphModel::new();
		let a = model.add_node(Position::new(0.0, 0.0, 3.0), NodeAttrs::default()).id;
		let b = add(&mut model, 1.0, 0.0);
		let pinned = model
			.add_node(
				Position::new(-50.0, -50.0, 0.0),
				NodeAttrs {
					locked: true,
					..Default::default()
				},
			)
			.id;
		let layout = auto_layout(&model, &LayoutParams::default());

		assert_eq!(layout.len(), 2);
		assert!(layout.iter().all(|(id, _)| id != &pinned));
		let pa = layout.iter().find(|(id, _)| id == &a).unwrap().1;
		let pb = layout.iter().find(|(id, _)| id == &b).unwrap().1;
		assert!(pa.planar_distance(&pb) > 1.0);
		assert_eq!(pa.z, 0.0);
	}

	#[test]
	fn layout_pulls_connected_far_nodes_together() {
		let mut model = GraphModel::new();
		let a = add(&mut model, 0.0, 0.0);
		let b = add(&mut model, 2000.0, 0.0);
		model.add_connection(&a, &b);
		let layout = auto_layout(&model, &LayoutParams::default());
		let pa = layout[0].1;
		let pb = layout[1].1;
		assert!(pa.planar_distance(&pb) < 2000.0);
	}

	#[test]
	fn stats_count_components_and_density() {
		let mut model = GraphModel::new();
		let a = add(&mut model, 0.0, 0.0);
		let b = add(&mut model, 1.0, 0.0);
		let c = add(&mut model, 2.0, 0.0);
		add(&mut model, 9.0, 9.0);
		model.add_connection(&a, &b);
		model.add_connection(&b, &c);

		let stats = graph_stats(&model);
		assert_eq!(stats.node_count, 4);
		assert_eq!(stats.connection_count, 2);
		assert_eq!(stats.isolated_nodes, 1);
		assert_eq!(stats.components, 2);
		assert_eq!(stats.max_degree, 2);
		assert!(approx_eq!(f64, stats.average_degree, 1.0));
		assert!(approx_eq!(f64, stats.density, 4.0 / 12.0));
		assert_eq!(graph_stats(&GraphModel::new()), GraphStats::default());
	}
}
