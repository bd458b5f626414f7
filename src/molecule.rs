use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::*;

/// The position of an atom in creation order.
pub type AtomIndex = usize;

/// The graph backing a molecule: elements on the nodes, bond orders on the edges.
pub type MoleculeGraph = UnGraph<Element, BondOrder>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Atom index {0} does not exist in the molecule")]
    AtomOutOfRange(AtomIndex),
    #[error("Atom {0} cannot be bonded to itself")]
    SelfBond(AtomIndex),
    #[error("A bond between atoms {0} and {1} already exists")]
    DuplicateBond(AtomIndex, AtomIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    pub index: AtomIndex,
    pub element: Element,
}

/// An undirected bond. The atom pair is stored lowest index first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bond {
    pub atoms: (AtomIndex, AtomIndex),
    pub order: BondOrder,
}

impl Bond {
    pub fn new(a: AtomIndex, b: AtomIndex, order: BondOrder) -> Self {
        Bond {
            atoms: (a.min(b), a.max(b)),
            order,
        }
    }
}

/// A molecular graph built one atom and one bond at a time.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: MoleculeGraph,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a molecule from a SMILES string.
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        parse_smiles(smiles)
    }

    /// Add an atom and return its index. Indices are handed out densely, in order.
    pub fn create_atom(&mut self, element: Element) -> AtomIndex {
        self.graph.add_node(element).index()
    }

    pub fn create_atom_from_symbol(&mut self, symbol: &str) -> Result<AtomIndex, LexError> {
        let element = symbol.parse::<Element>()?;
        Ok(self.create_atom(element))
    }

    /// Bond two existing atoms.
    ///
    /// Fails if either atom does not exist, if both indices name the same atom,
    /// or if the two atoms are already bonded.
    pub fn create_bond(
        &mut self,
        a: AtomIndex,
        b: AtomIndex,
        order: BondOrder,
    ) -> Result<(), GraphError> {
        for atom in [a, b] {
            if atom >= self.atom_count() {
                return Err(GraphError::AtomOutOfRange(atom));
            }
        }
        if a == b {
            return Err(GraphError::SelfBond(a));
        }
        let (a, b) = (NodeIndex::new(a), NodeIndex::new(b));
        if self.graph.find_edge(a, b).is_some() {
            return Err(GraphError::DuplicateBond(
                a.index().min(b.index()),
                a.index().max(b.index()),
            ));
        }
        self.graph.add_edge(a, b, order);
        Ok(())
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_count() == 0
    }

    pub fn atom(&self, index: AtomIndex) -> Option<Atom> {
        self.graph
            .node_weight(NodeIndex::new(index))
            .map(|&element| Atom { index, element })
    }

    /// The atoms in creation order.
    pub fn atoms(&self) -> impl Iterator<Item = Atom> + '_ {
        self.graph.node_indices().map(move |node| Atom {
            index: node.index(),
            element: self.graph[node],
        })
    }

    pub fn bonds(&self) -> impl Iterator<Item = Bond> + '_ {
        self.graph
            .edge_references()
            .map(|edge| Bond::new(edge.source().index(), edge.target().index(), *edge.weight()))
    }

    pub fn bond_between(&self, a: AtomIndex, b: AtomIndex) -> Option<BondOrder> {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|edge| self.graph[edge])
    }

    pub fn neighbors(&self, atom: AtomIndex) -> impl Iterator<Item = AtomIndex> + '_ {
        self.bonded_neighbors(atom).map(|(neighbor, _)| neighbor)
    }

    /// The atoms bonded to `atom`, with the order of each bond.
    pub fn bonded_neighbors(
        &self,
        atom: AtomIndex,
    ) -> impl Iterator<Item = (AtomIndex, BondOrder)> + '_ {
        self.graph.edges(NodeIndex::new(atom)).map(move |edge| {
            let neighbor = if edge.source().index() == atom {
                edge.target()
            } else {
                edge.source()
            };
            (neighbor.index(), *edge.weight())
        })
    }

    pub fn degree(&self, atom: AtomIndex) -> usize {
        self.neighbors(atom).count()
    }

    /// Do the two molecules have the same structure, ignoring atom order?
    pub fn is_isomorphic(&self, other: &Molecule) -> bool {
        petgraph::algo::is_isomorphic_matching(
            &self.graph,
            &other.graph,
            |a, b| a == b,
            |a, b| a == b,
        )
    }

    /// The canonical SMILES form of this molecule.
    pub fn to_canonical_form(&self) -> String {
        self.to_canonical_form_with(&MorganCanonicalizer)
    }

    pub fn to_canonical_form_with<C: Canonicalizer + ?Sized>(&self, canonicalizer: &C) -> String {
        canonicalizer.canonical_form(self)
    }

    fn sorted_bonds(&self) -> Vec<Bond> {
        let mut bonds: Vec<Bond> = self.bonds().collect();
        bonds.sort();
        bonds
    }
}

/// Two molecules are equal when they have the same atoms in the same order and
/// the same bonds. Use [`Molecule::is_isomorphic`] to ignore atom order.
impl PartialEq for Molecule {
    fn eq(&self, other: &Self) -> bool {
        self.atoms().eq(other.atoms()) && self.sorted_bonds() == other.sorted_bonds()
    }
}

impl Eq for Molecule {}

impl Display for Molecule {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.to_canonical_form())
    }
}

impl FromStr for Molecule {
    type Err = SmilesError;

    fn from_str(smiles: &str) -> Result<Self, Self::Err> {
        parse_smiles(smiles)
    }
}
