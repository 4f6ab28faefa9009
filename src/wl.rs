use indexmap::{IndexMap, IndexSet};
use petgraph::visit::EdgeRef;

use crate::graph::GraphRecord;

// the round that hits the cap is computed but not adopted
pub const WL_MAX_ITERATIONS: usize = 2;

const SIGNATURE_SEPARATOR: &str = "_";
// 128 bits of hex
const DIGEST_HEX_LEN: usize = 32;

/// Weisfeiler-Lehman colors in node-index order, edges read as undirected.
/// Stops on a fixed point or after [`WL_MAX_ITERATIONS`] rounds.
pub fn wl_positional_encoding(record: &GraphRecord) -> Vec<u32> {
    let neighbors = neighbor_sets(record);
    let mut colors = vec![1u32; record.node_count()];

    let mut iteration = 1;
    loop {
        let next = refine_colors(&colors, &neighbors);
        if next == colors || iteration == WL_MAX_ITERATIONS {
            break;
        }
        colors = next;
        iteration += 1;
    }
    colors
}

fn neighbor_sets(record: &GraphRecord) -> Vec<IndexSet<usize>> {
    let mut neighbors = vec![IndexSet::new(); record.node_count()];
    for edge in record.graph.edge_references() {
        let (u, v) = (edge.source().index(), edge.target().index());
        neighbors[u].insert(v);
        neighbors[v].insert(u);
    }
    neighbors
}

fn refine_colors(colors: &[u32], neighbors: &[IndexSet<usize>]) -> Vec<u32> {
    let digests: Vec<String> = neighbors
        .iter()
        .enumerate()
        .map(|(node, adjacent)| signature_digest(&signature(node, colors, adjacent)))
        .collect();

    let mut distinct: Vec<&str> = digests.iter().map(String::as_str).collect();
    distinct.sort_unstable();
    distinct.dedup();
    let palette: IndexMap<&str, u32> = distinct.into_iter().zip(1..).collect();

    digests.iter().map(|digest| palette[digest.as_str()]).collect()
}

// neighbor colors sort as strings, so "10" precedes "2"
fn signature(node: usize, colors: &[u32], adjacent: &IndexSet<usize>) -> String {
    let mut neighbor_colors: Vec<String> = adjacent
        .iter()
        .map(|&neighbor| colors[neighbor].to_string())
        .collect();
    neighbor_colors.sort_unstable();

    let mut parts = Vec::with_capacity(neighbor_colors.len() + 1);
    parts.push(colors[node].to_string());
    parts.extend(neighbor_colors);
    parts.join(SIGNATURE_SEPARATOR)
}

fn signature_digest(signature: &str) -> String {
    let hash = blake3::hash(signature.as_bytes());
    hash.to_hex().as_str()[..DIGEST_HEX_LEN].to_string()
}
