use std::collections::BTreeMap;

use bio::alphabets::dna;
use log::{debug, info, warn};
use petgraph::unionfind::UnionFind;
use rustc_hash::FxHashMap;

use super::graph::{Edge, EdgeComp, EdgeDir, StringGraph};
use crate::runtime::{AssemblyParams, Result};

/// Slack, in bases, when deciding that a longer path explains an edge
const TRANSITIVE_FUZZ: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    InPlay,
    Eliminated,
}

///////////////////////////////
/// Counters reported after simplification
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimplifyReport {
    pub containment_rounds: usize,
    pub contained_removed: usize,
    pub transitive_removed: usize,
    pub merges: usize,
    pub structure_errors: usize,
    pub trimmed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub vertices: usize,
    pub edges: usize,
    /// No edges at all
    pub islands: usize,
    /// Edges on one side only
    pub tips: usize,
    /// More than one edge on some side
    pub branched: usize,
}

impl GraphStats {
    pub fn of(graph: &StringGraph) -> Self {
        let mut stats = GraphStats {
            vertices: graph.vertex_count(),
            edges: graph.edge_count(),
            ..GraphStats::default()
        };
        for v in graph.vertices() {
            let sense = v.degree(EdgeDir::Sense);
            let antisense = v.degree(EdgeDir::Antisense);
            if sense == 0 && antisense == 0 {
                stats.islands += 1;
            } else if sense == 0 || antisense == 0 {
                stats.tips += 1;
            }
            if sense > 1 || antisense > 1 {
                stats.branched += 1;
            }
        }
        stats
    }
}

/// Run every simplification pass, in order, on a freshly loaded graph
pub fn simplify(graph: &mut StringGraph, params: &AssemblyParams) -> Result<SimplifyReport> {
    let mut report = SimplifyReport::default();

    let (rounds, removed) = remove_containments(graph, params.max_containment_rounds);
    report.containment_rounds = rounds;
    report.contained_removed = removed;

    if params.perform_transitive_reduction {
        report.transitive_removed = transitive_reduction(graph);
    }

    report.merges = merge_unbranched(graph)?;

    if params.validate_structure {
        report.structure_errors = validate_structure(graph);
        if report.structure_errors > 0 {
            warn!(
                "Graph structure check found {} inconsistent edges",
                report.structure_errors
            );
        }
    }

    for round in 0..params.trim_rounds {
        let trimmed = trim_dead_ends(graph, params.trim_length_threshold);
        debug!("Trim round {}: removed {} vertices", round + 1, trimmed);
        report.trimmed += trimmed;
    }

    debug!("Simplification: {:?}; graph now {:?}", report, GraphStats::of(graph));
    Ok(report)
}

/// Delete contained vertices until none is left, or until `max_rounds` rounds have run.
/// Returns the number of rounds and of removed vertices
pub fn remove_containments(graph: &mut StringGraph, max_rounds: usize) -> (usize, usize) {
    let mut rounds = 0;
    let mut removed = 0;
    while graph.has_containment() {
        if rounds == max_rounds {
            warn!(
                "Containment removal stopped after {} rounds with contained vertices left",
                rounds
            );
            break;
        }
        let doomed: Vec<String> = graph
            .vertices()
            .filter(|v| v.contained)
            .map(|v| v.id.clone())
            .collect();
        for id in &doomed {
            graph.remove_vertex(id);
        }
        removed += doomed.len();
        graph.refresh_containment();
        rounds += 1;
    }
    (rounds, removed)
}

/// Bases an edge adds beyond its source
fn extension(graph: &StringGraph, e: &Edge) -> usize {
    graph
        .vertex(&e.end)
        .map(|w| w.len().saturating_sub(e.end_overlap))
        .unwrap_or(0)
}

fn sorted_edges<'a>(graph: &'a StringGraph, id: &str, dir: EdgeDir) -> Vec<&'a Edge> {
    let Some(v) = graph.vertex(id) else {
        return Vec::new();
    };
    let mut edges: Vec<&Edge> = v.edges_in(dir).collect();
    edges.sort_by_key(|e| extension(graph, e));
    edges
}

/// Myers' transitive reduction. An edge v->x is dropped when some v->w->x path
/// reaches x with about the same extension. Returns the number of edges removed
pub fn transitive_reduction(graph: &mut StringGraph) -> usize {
    let mut doomed: Vec<(String, Edge)> = Vec::new();

    for v in graph.vertices() {
        for dir in EdgeDir::BOTH {
            let edges = sorted_edges(graph, &v.id, dir);
            if edges.len() < 2 {
                continue;
            }
            let mut marks: FxHashMap<&str, Mark> = edges
                .iter()
                .map(|e| (e.end.as_str(), Mark::InPlay))
                .collect();
            let longest = edges
                .last()
                .map(|e| extension(graph, e))
                .unwrap_or(0)
                + TRANSITIVE_FUZZ;

            for e in &edges {
                if marks.get(e.end.as_str()) != Some(&Mark::InPlay) {
                    continue;
                }
                let reach = extension(graph, e);
                for f in sorted_edges(graph, &e.end, e.transitive_dir()) {
                    if reach + extension(graph, f) > longest {
                        break;
                    }
                    if let Some(m) = marks.get_mut(f.end.as_str()) {
                        if *m == Mark::InPlay {
                            *m = Mark::Eliminated;
                        }
                    }
                }
            }

            for e in &edges {
                for (j, f) in sorted_edges(graph, &e.end, e.transitive_dir())
                    .into_iter()
                    .enumerate()
                {
                    if j > 0 && extension(graph, f) >= TRANSITIVE_FUZZ {
                        break;
                    }
                    if let Some(m) = marks.get_mut(f.end.as_str()) {
                        if *m == Mark::InPlay {
                            *m = Mark::Eliminated;
                        }
                    }
                }
            }

            for e in &edges {
                if marks.get(e.end.as_str()) == Some(&Mark::Eliminated) {
                    doomed.push((v.id.clone(), (*e).clone()));
                }
            }
        }
    }

    let before = graph.edge_count();
    for (from, edge) in &doomed {
        graph.remove_edge(from, edge);
    }
    before - graph.edge_count()
}

/// Collapse every non-branching run into one vertex. Returns the number of merges
pub fn merge_unbranched(graph: &mut StringGraph) -> Result<usize> {
    let mut merges = 0;
    for id in graph.ids() {
        if !graph.contains(&id) {
            continue;
        }
        for dir in EdgeDir::BOTH {
            while let Some(edge) = graph.mergeable_edge(&id, dir) {
                graph.merge(&id, &edge)?;
                merges += 1;
            }
        }
    }
    Ok(merges)
}

/// Check that every edge has its twin and that the overlapping bases agree within
/// the error budget. Diagnostic only; returns the number of bad edges
pub fn validate_structure(graph: &StringGraph) -> usize {
    let mut errors = 0;
    for v in graph.vertices() {
        for e in &v.edges {
            let Some(w) = graph.vertex(&e.end) else {
                warn!("Edge {} -> {} points to a missing vertex", v.id, e.end);
                errors += 1;
                continue;
            };
            let has_twin = w.edges.iter().any(|f| {
                f.end == v.id && f.dir == e.twin_dir() && f.comp == e.comp
            });
            if !has_twin {
                warn!("Edge {} -> {} has no twin", v.id, e.end);
                errors += 1;
                continue;
            }
            if e.overlap != e.end_overlap || e.overlap > v.len() || e.end_overlap > w.len() {
                warn!(
                    "Edge {} -> {} has overlap extents {}/{}",
                    v.id, e.end, e.overlap, e.end_overlap
                );
                errors += 1;
                continue;
            }

            let ours = v.overlap_bases(e.dir, e.overlap);
            let theirs = w.overlap_bases(e.twin_dir(), e.end_overlap);
            let theirs = match e.comp {
                EdgeComp::Same => theirs.to_vec(),
                EdgeComp::Reverse => dna::revcomp(theirs),
            };
            let diff = ours.iter().zip(&theirs).filter(|(a, b)| a != b).count();
            if diff > graph.max_diff(e.overlap) {
                warn!(
                    "Edge {} -> {}: {} differences over {} bases",
                    v.id, e.end, diff, e.overlap
                );
                errors += 1;
            }
        }
    }
    errors
}

/// One trimming round: remove vertices shorter than `min_length` that have no edges
/// on at least one side. Returns the number removed
pub fn trim_dead_ends(graph: &mut StringGraph, min_length: usize) -> usize {
    let doomed: Vec<String> = graph
        .vertices()
        .filter(|v| {
            v.len() < min_length
                && (v.degree(EdgeDir::Sense) == 0 || v.degree(EdgeDir::Antisense) == 0)
        })
        .map(|v| v.id.clone())
        .collect();
    for id in &doomed {
        graph.remove_vertex(id);
    }
    doomed.len()
}

/// Connected component index of every vertex, numbered from 0 in id order
pub fn connected_components(graph: &StringGraph) -> BTreeMap<String, usize> {
    let index: FxHashMap<&str, usize> = graph
        .vertices()
        .enumerate()
        .map(|(i, v)| (v.id.as_str(), i))
        .collect();

    let mut sets = UnionFind::<usize>::new(index.len());
    for v in graph.vertices() {
        let a = index[v.id.as_str()];
        for e in &v.edges {
            if let Some(&b) = index.get(e.end.as_str()) {
                sets.union(a, b);
            }
        }
    }

    let mut numbering: FxHashMap<usize, usize> = FxHashMap::default();
    let mut component = BTreeMap::new();
    for (i, v) in graph.vertices().enumerate() {
        let next = numbering.len();
        let c = *numbering.entry(sets.find(i)).or_insert(next);
        component.insert(v.id.clone(), c);
    }
    info!("Graph has {} connected components", numbering.len());
    component
}
