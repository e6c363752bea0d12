use std::collections::BTreeMap;

use bio::alphabets::dna;
use log::debug;

use crate::fileformat::{AsqgGraph, AsqgHeader, Overlap, SeqCoord, VertexRecord};
use crate::runtime::{max_overlap_diff, Error, Result};

/// Which end of the source vertex an edge leaves from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeDir {
    /// 3' end
    Sense,
    /// 5' end
    Antisense,
}

impl EdgeDir {
    pub const BOTH: [EdgeDir; 2] = [EdgeDir::Sense, EdgeDir::Antisense];

    pub fn flip(self) -> Self {
        match self {
            EdgeDir::Sense => EdgeDir::Antisense,
            EdgeDir::Antisense => EdgeDir::Sense,
        }
    }
}

/// Relative orientation of the two sequences of an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeComp {
    Same,
    Reverse,
}

impl EdgeComp {
    pub fn compose(self, other: EdgeComp) -> Self {
        if self == other {
            EdgeComp::Same
        } else {
            EdgeComp::Reverse
        }
    }
}

///////////////////////////////
/// Half of a bidirected edge, stored on its source vertex. The other half (the twin)
/// is stored on `end`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub end: String,
    pub dir: EdgeDir,
    pub comp: EdgeComp,
    /// Bases of the source sequence covered by the overlap
    pub overlap: usize,
    /// Bases of the end sequence covered by the overlap
    pub end_overlap: usize,
    pub num_diff: usize,
}

impl Edge {
    /// Direction of the twin, as seen from `end`
    pub fn twin_dir(&self) -> EdgeDir {
        match self.comp {
            EdgeComp::Same => self.dir.flip(),
            EdgeComp::Reverse => self.dir,
        }
    }

    /// Direction to continue in when walking through `end`
    pub fn transitive_dir(&self) -> EdgeDir {
        self.twin_dir().flip()
    }

    fn is_twin_of(&self, other: &Edge, other_source: &str) -> bool {
        self.end == other_source && self.dir == other.twin_dir() && self.comp == other.comp
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vertex {
    pub id: String,
    pub seq: Vec<u8>,
    pub contained: bool,
    /// Number of reads merged into this vertex
    pub sources: usize,
    pub edges: Vec<Edge>,
}

impl Vertex {
    pub fn new<I: Into<String>>(id: I, seq: Vec<u8>) -> Self {
        Vertex {
            id: id.into(),
            seq,
            contained: false,
            sources: 1,
            edges: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn edges_in(&self, dir: EdgeDir) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.dir == dir)
    }

    pub fn degree(&self, dir: EdgeDir) -> usize {
        self.edges_in(dir).count()
    }

    /// Interval of this sequence that an edge in `dir` with `overlap` bases covers
    pub fn overlap_coord(&self, dir: EdgeDir, overlap: usize) -> SeqCoord {
        let len = self.len();
        match dir {
            EdgeDir::Sense => SeqCoord::new(len - overlap, len - 1, len),
            EdgeDir::Antisense => SeqCoord::new(0, overlap - 1, len),
        }
    }

    pub fn overlap_bases(&self, dir: EdgeDir, overlap: usize) -> &[u8] {
        let coord = self.overlap_coord(dir, overlap);
        &self.seq[coord.start..=coord.end]
    }
}

///////////////////////////////
/// Bidirected string graph. Vertices are kept sorted by id so every traversal, and
/// every file written from the graph, is deterministic
#[derive(Clone, Debug)]
pub struct StringGraph {
    vertices: BTreeMap<String, Vertex>,
    containments: Vec<Overlap>,
    error_rate: f64,
    min_overlap: usize,
}

impl StringGraph {
    pub fn new(error_rate: f64, min_overlap: usize) -> Self {
        StringGraph {
            vertices: BTreeMap::new(),
            containments: Vec::new(),
            error_rate,
            min_overlap,
        }
    }

    /// Load an exchange-format graph. Overlaps shorter than the graph's minimum overlap
    /// and improper overlaps are skipped; references to unknown vertices are fatal
    pub fn from_asqg(asqg: &AsqgGraph) -> Result<Self> {
        let mut graph = StringGraph::new(asqg.header.error_rate, asqg.header.min_overlap);
        for record in &asqg.vertices {
            let mut vertex = Vertex::new(record.id.clone(), record.seq.as_bytes().to_vec());
            vertex.contained = record.substring;
            if graph.vertices.insert(record.id.clone(), vertex).is_some() {
                return Err(Error::graph_build(Some(format!(
                    "vertex {} defined twice",
                    record.id
                ))));
            }
        }

        let mut skipped = 0;
        for ovr in &asqg.overlaps {
            if !graph.add_overlap(ovr)? {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!("Skipped {} overlaps while loading graph", skipped);
        }
        Ok(graph)
    }

    pub fn to_asqg(&self, containment: bool, transitive: bool) -> AsqgGraph {
        let mut asqg = AsqgGraph::new(AsqgHeader {
            version: crate::fileformat::asqg::ASQG_VERSION,
            error_rate: self.error_rate,
            min_overlap: self.min_overlap,
            containment,
            transitive,
        });

        for v in self.vertices.values() {
            asqg.vertices.push(VertexRecord {
                id: v.id.clone(),
                seq: String::from_utf8_lossy(&v.seq).to_string(),
                substring: v.contained,
            });
        }
        for v in self.vertices.values() {
            for e in v.edges.iter().filter(|e| v.id < e.end) {
                let Some(w) = self.vertices.get(&e.end) else {
                    continue;
                };
                asqg.overlaps.push(Overlap {
                    ids: [v.id.clone(), w.id.clone()],
                    coords: [
                        v.overlap_coord(e.dir, e.overlap),
                        w.overlap_coord(e.twin_dir(), e.end_overlap),
                    ],
                    is_reverse: e.comp == EdgeComp::Reverse,
                    num_diff: e.num_diff,
                });
            }
        }
        asqg.overlaps.extend(self.containments.iter().cloned());
        asqg
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn min_overlap(&self) -> usize {
        self.min_overlap
    }

    /// Mismatches tolerated over an overlap of `len` bases
    pub fn max_diff(&self, len: usize) -> usize {
        max_overlap_diff(self.error_rate, len)
    }

    pub fn add_vertex(&mut self, vertex: Vertex) {
        self.vertices.insert(vertex.id.clone(), vertex);
    }

    /// Insert an overlap. Dovetails become a pair of twin edges, containments are kept
    /// as records and flag the contained vertex. Returns false if the overlap was skipped
    pub fn add_overlap(&mut self, ovr: &Overlap) -> Result<bool> {
        let [a, b] = &ovr.ids;
        for id in [a, b] {
            if !self.vertices.contains_key(id) {
                return Err(Error::graph_build(Some(format!(
                    "overlap references unknown vertex {}",
                    id
                ))));
            }
        }
        if a == b || ovr.coords[0].len() < self.min_overlap || ovr.coords[1].len() < self.min_overlap {
            return Ok(false);
        }

        if let Some(idx) = ovr.contained_idx() {
            if let Some(v) = self.vertices.get_mut(&ovr.ids[idx]) {
                v.contained = true;
            }
            self.containments.push(ovr.clone());
            return Ok(true);
        }
        if !ovr.is_dovetail() {
            return Ok(false);
        }

        let comp = if ovr.is_reverse {
            EdgeComp::Reverse
        } else {
            EdgeComp::Same
        };
        let dir_of = |c: &SeqCoord| {
            if c.is_right_extreme() {
                EdgeDir::Sense
            } else {
                EdgeDir::Antisense
            }
        };
        let forward = Edge {
            end: b.clone(),
            dir: dir_of(&ovr.coords[0]),
            comp,
            overlap: ovr.coords[0].len(),
            end_overlap: ovr.coords[1].len(),
            num_diff: ovr.num_diff,
        };
        let twin = Edge {
            end: a.clone(),
            dir: dir_of(&ovr.coords[1]),
            comp,
            overlap: ovr.coords[1].len(),
            end_overlap: ovr.coords[0].len(),
            num_diff: ovr.num_diff,
        };
        if let Some(v) = self.vertices.get_mut(a) {
            v.edges.push(forward);
        }
        if let Some(w) = self.vertices.get_mut(b) {
            w.edges.push(twin);
        }
        Ok(true)
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    pub fn ids(&self) -> Vec<String> {
        self.vertices.keys().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vertices.contains_key(id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of bidirected edges, each twin pair counted once
    pub fn edge_count(&self) -> usize {
        self.vertices.values().map(|v| v.edges.len()).sum::<usize>() / 2
    }

    pub fn containments(&self) -> &[Overlap] {
        &self.containments
    }

    pub fn has_containment(&self) -> bool {
        self.vertices.values().any(|v| v.contained)
    }

    /// Drop a vertex together with the twins of all its edges
    pub fn remove_vertex(&mut self, id: &str) -> Option<Vertex> {
        let vertex = self.vertices.remove(id)?;
        for e in &vertex.edges {
            if let Some(w) = self.vertices.get_mut(&e.end) {
                w.edges.retain(|f| !f.is_twin_of(e, id));
            }
        }
        Some(vertex)
    }

    /// Drop one bidirected edge, both halves
    pub fn remove_edge(&mut self, from: &str, edge: &Edge) {
        if let Some(v) = self.vertices.get_mut(from) {
            v.edges
                .retain(|e| !(e.end == edge.end && e.dir == edge.dir && e.comp == edge.comp));
        }
        if let Some(w) = self.vertices.get_mut(&edge.end) {
            w.edges.retain(|f| !f.is_twin_of(edge, from));
        }
    }

    /// Forget containment records whose endpoints are gone, then derive the
    /// containment flags from the records that remain
    pub fn refresh_containment(&mut self) {
        let vertices = &self.vertices;
        self.containments
            .retain(|c| c.ids.iter().all(|id| vertices.contains_key(id)));
        for v in self.vertices.values_mut() {
            v.contained = false;
        }
        for c in &self.containments {
            if let Some(idx) = c.contained_idx() {
                if let Some(v) = self.vertices.get_mut(&c.ids[idx]) {
                    v.contained = true;
                }
            }
        }
    }

    /// The single edge of `id` in `dir` if it can be collapsed: the neighbour has no
    /// other edge pointing back, and the merge would not close a loop
    pub fn mergeable_edge(&self, id: &str, dir: EdgeDir) -> Option<Edge> {
        let v = self.vertices.get(id)?;
        let mut edges = v.edges_in(dir);
        let e = edges.next()?;
        if edges.next().is_some() || e.end == id {
            return None;
        }
        let w = self.vertices.get(&e.end)?;
        if w.degree(e.twin_dir()) != 1 {
            return None;
        }
        if w
            .edges_in(e.transitive_dir())
            .any(|f| f.end == id || f.end == w.id)
        {
            return None;
        }
        Some(e.clone())
    }

    /// Absorb the end of `edge` into `id`. The merged vertex keeps `id`, the sequences
    /// are joined across the overlap, and the absorbed vertex's outer edges move over
    pub fn merge(&mut self, id: &str, edge: &Edge) -> Result<()> {
        let w = self.vertices.remove(&edge.end).ok_or_else(|| {
            Error::graph_build(Some(format!("merge target {} does not exist", edge.end)))
        })?;
        let v = self.vertices.get_mut(id).ok_or_else(|| {
            Error::graph_build(Some(format!("merge source {} does not exist", id)))
        })?;

        v.edges
            .retain(|e| !(e.end == edge.end && e.dir == edge.dir && e.comp == edge.comp));

        let w_seq = match edge.comp {
            EdgeComp::Same => w.seq.clone(),
            EdgeComp::Reverse => dna::revcomp(&w.seq),
        };
        if edge.end_overlap > w_seq.len() {
            return Err(Error::graph_build(Some(format!(
                "overlap of {} bases exceeds vertex {} of length {}",
                edge.end_overlap,
                w.id,
                w_seq.len()
            ))));
        }
        match edge.dir {
            EdgeDir::Sense => v.seq.extend_from_slice(&w_seq[edge.end_overlap..]),
            EdgeDir::Antisense => {
                let mut seq = w_seq[..w_seq.len() - edge.end_overlap].to_vec();
                seq.extend_from_slice(&v.seq);
                v.seq = seq;
            }
        }
        v.sources += w.sources;

        let inherit_dir = edge.transitive_dir();
        let mut redirects = Vec::new();
        for f in w.edges.iter().filter(|f| f.dir == inherit_dir) {
            let comp = edge.comp.compose(f.comp);
            v.edges.push(Edge {
                end: f.end.clone(),
                dir: edge.dir,
                comp,
                overlap: f.overlap,
                end_overlap: f.end_overlap,
                num_diff: f.num_diff,
            });
            redirects.push((f.clone(), comp));
        }

        for (f, comp) in redirects {
            if let Some(x) = self.vertices.get_mut(&f.end) {
                for g in x.edges.iter_mut().filter(|g| g.is_twin_of(&f, &w.id)) {
                    g.end = id.to_string();
                    g.comp = comp;
                }
            }
        }
        Ok(())
    }

    /// Prefix every vertex id
    pub fn rename_vertices(&mut self, prefix: &str) {
        let renamed = |id: &str| format!("{}{}", prefix, id);
        let old = std::mem::take(&mut self.vertices);
        for (_, mut v) in old {
            v.id = renamed(&v.id);
            for e in &mut v.edges {
                e.end = renamed(&e.end);
            }
            self.vertices.insert(v.id.clone(), v);
        }
        for c in &mut self.containments {
            for id in &mut c.ids {
                *id = renamed(id);
            }
        }
    }
}
