use std::collections::{BTreeMap, BTreeSet};

use tracing::*;

use crate::*;

/// Produces a canonical text form of a molecule: isomorphic molecules, in any
/// atom order, give the same text.
pub trait Canonicalizer {
    fn canonical_form(&self, molecule: &Molecule) -> String;
}

/// Canonical SMILES from Morgan-style rank refinement.
///
/// Atoms are ranked by (atomic number, degree), then repeatedly re-ranked by
/// their own rank together with the ranks and bond orders of their neighbors.
/// Remaining ties are broken by trying each atom of the lowest tied class in
/// turn, and the smallest SMILES string over all complete rankings wins.
/// Complete rankings that write the same string reveal automorphisms, and a
/// tied atom that a known automorphism maps onto an atom already tried at the
/// same point of the search is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MorganCanonicalizer;

impl Canonicalizer for MorganCanonicalizer {
    fn canonical_form(&self, molecule: &Molecule) -> String {
        if molecule.is_empty() {
            return String::new();
        }

        let search = Search::run(molecule);
        debug!(
            "Canonical form chosen from {} ranking(s) with {} automorphism(s) found",
            search.leaves,
            search.automorphisms.len()
        );
        search.best.map(|leaf| leaf.smiles).unwrap_or_default()
    }
}

/// Replace each key by its position among the distinct keys.
fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut distinct: Vec<&K> = keys.iter().collect();
    distinct.sort();
    distinct.dedup();
    keys.iter()
        .map(|key| distinct.binary_search(&key).unwrap_or_default())
        .collect()
}

fn class_count(ranks: &[usize]) -> usize {
    let mut distinct = ranks.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len()
}

fn initial_ranks(molecule: &Molecule) -> Vec<usize> {
    let keys: Vec<(u8, usize)> = molecule
        .atoms()
        .map(|atom| (atom.element.atomic_number(), molecule.degree(atom.index)))
        .collect();
    dense_ranks(&keys)
}

/// Split rank classes by neighborhood until nothing splits further. The
/// relative order of existing classes is preserved.
fn refine(molecule: &Molecule, mut ranks: Vec<usize>) -> Vec<usize> {
    loop {
        let classes = class_count(&ranks);
        let keys: Vec<(usize, Vec<(usize, BondOrder)>)> = (0..ranks.len())
            .map(|atom| {
                let mut neighborhood: Vec<(usize, BondOrder)> = molecule
                    .bonded_neighbors(atom)
                    .map(|(neighbor, order)| (ranks[neighbor], order))
                    .collect();
                neighborhood.sort();
                (ranks[atom], neighborhood)
            })
            .collect();
        let refined = dense_ranks(&keys);
        if class_count(&refined) == classes {
            return ranks;
        }
        ranks = refined;
    }
}

/// The lowest rank shared by more than one atom.
fn lowest_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &rank in ranks {
        *counts.entry(rank).or_default() += 1;
    }
    counts
        .into_iter()
        .find(|&(_, count)| count > 1)
        .map(|(rank, _)| rank)
}

/// Give `atom` a rank of its own, just below the rest of its class.
fn individualize(ranks: &[usize], atom: AtomIndex) -> Vec<usize> {
    let keys: Vec<usize> = ranks
        .iter()
        .enumerate()
        .map(|(index, &rank)| 2 * rank + usize::from(index != atom))
        .collect();
    dense_ranks(&keys)
}

/// Union-find over atom indices.
#[derive(Debug, Clone)]
struct OrbitSet {
    parent: Vec<usize>,
}

impl OrbitSet {
    fn new(n: usize) -> Self {
        OrbitSet {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx != ry {
            self.parent[ry] = rx;
        }
    }

    fn same_orbit(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }
}

/// A SMILES string written from one complete ranking.
#[derive(Debug, Clone)]
struct Leaf {
    smiles: String,
    /// The atoms in the order they appear in `smiles`.
    order: Vec<AtomIndex>,
}

/// The map sending the i-th written atom of `from` to the i-th written atom of `to`.
fn leaf_mapping(from: &Leaf, to: &Leaf) -> Vec<AtomIndex> {
    let mut mapping = vec![0; from.order.len()];
    for (&a, &b) in from.order.iter().zip(&to.order) {
        mapping[a] = b;
    }
    mapping
}

fn is_automorphism(molecule: &Molecule, mapping: &[AtomIndex]) -> bool {
    mapping.len() == molecule.atom_count()
        && molecule.atoms().all(|atom| {
            molecule.atom(mapping[atom.index]).map(|image| image.element) == Some(atom.element)
        })
        && molecule.bonds().all(|bond| {
            let (a, b) = bond.atoms;
            molecule.bond_between(mapping[a], mapping[b]) == Some(bond.order)
        })
}

fn is_identity(mapping: &[AtomIndex]) -> bool {
    mapping.iter().enumerate().all(|(from, &to)| from == to)
}

/// The tie-breaking search over complete rankings.
struct Search<'a> {
    molecule: &'a Molecule,
    first: Option<Leaf>,
    best: Option<Leaf>,
    automorphisms: Vec<Vec<AtomIndex>>,
    /// Complete rankings visited.
    leaves: usize,
}

impl<'a> Search<'a> {
    fn run(molecule: &'a Molecule) -> Self {
        let mut search = Search {
            molecule,
            first: None,
            best: None,
            automorphisms: Vec::new(),
            leaves: 0,
        };
        let ranks = refine(molecule, initial_ranks(molecule));
        search.explore(ranks, &mut Vec::new());
        search
    }

    /// `path` holds the atoms individualized on the way to `ranks`.
    fn explore(&mut self, ranks: Vec<usize>, path: &mut Vec<AtomIndex>) {
        let tied = match lowest_tied_rank(&ranks) {
            Some(tied) => tied,
            None => return self.visit_leaf(&ranks),
        };

        let cell: Vec<AtomIndex> = (0..ranks.len()).filter(|&atom| ranks[atom] == tied).collect();
        let mut explored: Vec<AtomIndex> = Vec::new();
        for atom in cell {
            if self.in_explored_orbit(atom, &explored, path) {
                trace!("Skipping atom {}, symmetric to one already tried", atom);
                continue;
            }
            path.push(atom);
            let individualized = refine(self.molecule, individualize(&ranks, atom));
            self.explore(individualized, path);
            path.pop();
            explored.push(atom);
        }
    }

    /// Is `atom` the image of an explored atom under the known automorphisms
    /// that fix every atom of `path`?
    fn in_explored_orbit(&self, atom: AtomIndex, explored: &[AtomIndex], path: &[AtomIndex]) -> bool {
        if explored.is_empty() {
            return false;
        }
        let mut orbits = OrbitSet::new(self.molecule.atom_count());
        for mapping in self
            .automorphisms
            .iter()
            .filter(|mapping| path.iter().all(|&fixed| mapping[fixed] == fixed))
        {
            for (from, &to) in mapping.iter().enumerate() {
                orbits.union(from, to);
            }
        }
        explored.iter().any(|&other| orbits.same_orbit(other, atom))
    }

    fn visit_leaf(&mut self, ranks: &[usize]) {
        self.leaves += 1;
        let leaf = write_smiles(self.molecule, ranks);
        trace!("Candidate canonical form {}", leaf.smiles);

        let found: Vec<Vec<AtomIndex>> = [&self.first, &self.best]
            .into_iter()
            .flatten()
            .filter(|known| known.smiles == leaf.smiles)
            .map(|known| leaf_mapping(known, &leaf))
            .filter(|mapping| !is_identity(mapping) && is_automorphism(self.molecule, mapping))
            .collect();
        for mapping in found {
            if !self.automorphisms.contains(&mapping) {
                self.automorphisms.push(mapping);
            }
        }

        if self.first.is_none() {
            self.first = Some(leaf.clone());
        }
        if self.best.as_ref().map_or(true, |best| leaf.smiles < best.smiles) {
            self.best = Some(leaf);
        }
    }
}

/// A bond that is not part of the spanning tree, written as a ring-closure digit.
#[derive(Debug, Clone, Copy)]
struct RingClosure {
    /// The endpoint written first.
    opening: AtomIndex,
    closing: AtomIndex,
    order: BondOrder,
}

/// The DFS spanning tree of one connected component.
#[derive(Debug, Default)]
struct SpanningTree {
    children: BTreeMap<AtomIndex, Vec<AtomIndex>>,
    closures: Vec<RingClosure>,
    /// Atoms in DFS preorder, which is also the order they are written in.
    order: Vec<AtomIndex>,
    /// Position of each visited atom in `order`.
    preorder: BTreeMap<AtomIndex, usize>,
}

impl SpanningTree {
    /// Record every bond inside the component that is not a tree edge.
    fn find_closures(&mut self, molecule: &Molecule) {
        let tree_edges: BTreeSet<(AtomIndex, AtomIndex)> = self
            .children
            .iter()
            .flat_map(|(&parent, children)| {
                children
                    .iter()
                    .map(move |&child| (parent.min(child), parent.max(child)))
            })
            .collect();

        for bond in molecule.bonds() {
            let (a, b) = bond.atoms;
            if tree_edges.contains(&(a, b)) {
                continue;
            }
            if let (Some(&pa), Some(&pb)) = (self.preorder.get(&a), self.preorder.get(&b)) {
                let (opening, closing) = if pa < pb { (a, b) } else { (b, a) };
                self.closures.push(RingClosure {
                    opening,
                    closing,
                    order: bond.order,
                });
            }
        }
    }
}

/// Write a SMILES string for a molecule whose atoms all have distinct ranks.
fn write_smiles(molecule: &Molecule, ranks: &[usize]) -> Leaf {
    let mut by_rank: Vec<AtomIndex> = (0..molecule.atom_count()).collect();
    by_rank.sort_by_key(|&atom| ranks[atom]);

    let mut visited = vec![false; molecule.atom_count()];
    let mut reserved = vec![false; molecule.atom_count()];
    let mut components = Vec::new();
    for root in by_rank {
        if visited[root] {
            continue;
        }
        let mut tree = SpanningTree::default();
        build_tree(molecule, ranks, root, &mut visited, &mut reserved, &mut tree);
        tree.find_closures(molecule);

        let mut writer = ComponentWriter::new(molecule, &tree);
        writer.write_atom(root);
        let smiles = writer.output;
        components.push(Leaf {
            smiles,
            order: tree.order,
        });
    }
    components.sort_by(|a, b| a.smiles.cmp(&b.smiles));

    let mut leaf = Leaf {
        smiles: String::new(),
        order: Vec::with_capacity(molecule.atom_count()),
    };
    for (position, component) in components.into_iter().enumerate() {
        if position > 0 {
            leaf.smiles.push('.');
        }
        leaf.smiles.push_str(&component.smiles);
        leaf.order.extend(component.order);
    }
    leaf
}

/// Mark every atom joined to `atom` by a chain of double bonds.
fn reserve_double_bonded(molecule: &Molecule, atom: AtomIndex, reserved: &mut [bool]) {
    reserved[atom] = true;
    for (neighbor, order) in molecule.bonded_neighbors(atom) {
        if order == BondOrder::Double && !reserved[neighbor] {
            reserve_double_bonded(molecule, neighbor, reserved);
        }
    }
}

/// Grow a DFS tree from `atom`, visiting neighbors by rank.
///
/// When the tree first reaches a group of atoms joined by double bonds, the
/// whole group is reserved: its atoms may then only be entered over a double
/// bond. If the double bonds form a forest, as they do in every parsed
/// molecule, each of them becomes a tree edge and every ring closure is single.
fn build_tree(
    molecule: &Molecule,
    ranks: &[usize],
    atom: AtomIndex,
    visited: &mut [bool],
    reserved: &mut [bool],
    tree: &mut SpanningTree,
) {
    visited[atom] = true;
    tree.preorder.insert(atom, tree.order.len());
    tree.order.push(atom);
    if !reserved[atom] {
        reserve_double_bonded(molecule, atom, reserved);
    }

    let mut neighbors: Vec<(AtomIndex, BondOrder)> = molecule.bonded_neighbors(atom).collect();
    neighbors.sort_by_key(|&(neighbor, _)| ranks[neighbor]);

    for (neighbor, order) in neighbors {
        if visited[neighbor] || (reserved[neighbor] && order != BondOrder::Double) {
            continue;
        }
        tree.children.entry(atom).or_default().push(neighbor);
        build_tree(molecule, ranks, neighbor, visited, reserved, tree);
    }
}

struct ComponentWriter<'a> {
    molecule: &'a Molecule,
    tree: &'a SpanningTree,
    /// Ring-closure labels in use, keyed by closure.
    open_digits: BTreeMap<(AtomIndex, AtomIndex), usize>,
    output: String,
}

impl<'a> ComponentWriter<'a> {
    fn new(molecule: &'a Molecule, tree: &'a SpanningTree) -> Self {
        ComponentWriter {
            molecule,
            tree,
            open_digits: BTreeMap::new(),
            output: String::new(),
        }
    }

    fn lowest_free_digit(&self) -> usize {
        (1..)
            .find(|digit| !self.open_digits.values().any(|used| used == digit))
            .unwrap_or(1)
    }

    fn write_atom(&mut self, atom: AtomIndex) {
        if let Some(element) = self.molecule.atom(atom).map(|atom| atom.element) {
            self.output.push_str(element.symbol());
        }

        let mut closing: Vec<(usize, (AtomIndex, AtomIndex))> = self
            .tree
            .closures
            .iter()
            .filter(|closure| closure.closing == atom)
            .filter_map(|closure| {
                let key = (closure.opening, closure.closing);
                self.open_digits.get(&key).map(|&digit| (digit, key))
            })
            .collect();
        closing.sort();
        for (digit, key) in closing {
            self.open_digits.remove(&key);
            self.output.push_str(&format_ring(digit));
        }

        let mut opening: Vec<RingClosure> = self
            .tree
            .closures
            .iter()
            .filter(|closure| closure.opening == atom)
            .copied()
            .collect();
        opening.sort_by_key(|closure| self.tree.preorder.get(&closure.closing).copied());
        for closure in opening {
            let digit = self.lowest_free_digit();
            self.open_digits
                .insert((closure.opening, closure.closing), digit);
            self.output.push_str(closure.order.smiles_symbol());
            self.output.push_str(&format_ring(digit));
        }

        let children = self.tree.children.get(&atom).cloned().unwrap_or_default();
        let last = children.len().saturating_sub(1);
        for (position, child) in children.into_iter().enumerate() {
            let order = self
                .molecule
                .bond_between(atom, child)
                .unwrap_or_default();
            if position < last {
                self.output.push('(');
                self.output.push_str(order.smiles_symbol());
                self.write_atom(child);
                self.output.push(')');
            } else {
                self.output.push_str(order.smiles_symbol());
                self.write_atom(child);
            }
        }
    }
}

/// Formats a ring-closure label: `1` to `9`, then `%10` to `%99`, then the
/// extended `%(100)` form.
fn format_ring(digit: usize) -> String {
    match digit {
        0..=9 => digit.to_string(),
        10..=99 => format!("%{}", digit),
        _ => format!("%({})", digit),
    }
}
