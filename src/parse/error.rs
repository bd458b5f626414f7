use thiserror::Error;

use crate::GraphError;

/// A lexeme that is not part of the supported SMILES alphabet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Token {0} is not a supported value")]
    UnrecognizedToken(String),
}

/// A token sequence that does not describe a valid molecule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected atom before bond")]
    ExpectedAtomBeforeBond,
    #[error("Expected atom before branch")]
    ExpectedAtomBeforeBranch,
    #[error("Expected atom before ring")]
    ExpectedAtomBeforeRing,
    #[error("Branch end ')' without a matching '('")]
    UnmatchedBranchClose,
    #[error("{0} branch(es) opened with '(' were never closed")]
    UnclosedBranches(usize),
    #[error("Ring closure digit(s) {0:?} were opened but never closed")]
    UnclosedRings(Vec<u8>),
    #[error("Bond symbol at the end of the input has no atom to bond to")]
    DanglingBond,
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Invalid bond while building the molecule: {0}")]
    Graph(#[from] GraphError),
}

/// Everything that can go wrong turning input into a molecule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Smiles string required as input")]
    InvalidInputType,
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}
