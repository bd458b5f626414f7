use std::collections::BTreeMap;

use tracing::*;

use crate::*;

/// How strictly the parser checks that the input was complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject input that ends with open branches, open rings or a dangling bond.
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        ParseOptions { strict: true }
    }

    /// Accept unclosed branches, unclosed rings and trailing bond symbols,
    /// silently dropping them.
    pub fn lenient() -> Self {
        ParseOptions { strict: false }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions::strict()
    }
}

/// The state threaded through a single parse.
#[derive(Debug, Default)]
struct ParserState {
    /// The atom the next bond starts from.
    previous_atom: Option<AtomIndex>,
    /// Set by a bond symbol, taken by the next atom.
    pending_bond: Option<BondOrder>,
    /// Attachment points to return to when a branch closes.
    branch_stack: Vec<AtomIndex>,
    /// Open ring-closure digits and the atoms that opened them.
    ring_map: BTreeMap<u8, AtomIndex>,
    next_atom: AtomIndex,
}

impl ParserState {
    fn consume(&mut self, molecule: &mut Molecule, token: Token) -> Result<(), ParseError> {
        let kind = classify(token)?;
        trace!("Token {:?} classified as {:?}", token.lexeme(), kind);

        match kind {
            TokenKind::Atom(element) => {
                let atom = molecule.create_atom(element);
                debug_assert_eq!(atom, self.next_atom);
                if let Some(previous) = self.previous_atom {
                    let order = self.pending_bond.take().unwrap_or_default();
                    molecule.create_bond(previous, atom, order)?;
                }
                self.previous_atom = Some(atom);
                self.next_atom += 1;
            }
            TokenKind::BranchOpen => {
                let attachment = self
                    .previous_atom
                    .ok_or(ParseError::ExpectedAtomBeforeBranch)?;
                self.branch_stack.push(attachment);
            }
            TokenKind::BranchClose => {
                if self.previous_atom.is_none() {
                    return Err(ParseError::ExpectedAtomBeforeBranch);
                }
                let attachment = self
                    .branch_stack
                    .pop()
                    .ok_or(ParseError::UnmatchedBranchClose)?;
                self.previous_atom = Some(attachment);
            }
            TokenKind::Ring(digit) => {
                let current = self
                    .previous_atom
                    .ok_or(ParseError::ExpectedAtomBeforeRing)?;
                if let Some(opening) = self.ring_map.remove(&digit) {
                    trace!("Closing ring {} between atoms {} and {}", digit, opening, current);
                    molecule.create_bond(opening, current, BondOrder::Single)?;
                } else {
                    trace!("Opening ring {} at atom {}", digit, current);
                    self.ring_map.insert(digit, current);
                }
            }
            TokenKind::Bond(order) => {
                if self.previous_atom.is_none() {
                    return Err(ParseError::ExpectedAtomBeforeBond);
                }
                self.pending_bond = Some(order);
            }
        }
        Ok(())
    }

    /// Check the end-of-input conditions.
    fn finish(self, options: &ParseOptions) -> Result<(), ParseError> {
        if options.strict {
            if !self.branch_stack.is_empty() {
                return Err(ParseError::UnclosedBranches(self.branch_stack.len()));
            }
            if !self.ring_map.is_empty() {
                return Err(ParseError::UnclosedRings(
                    self.ring_map.keys().copied().collect(),
                ));
            }
            if self.pending_bond.is_some() {
                return Err(ParseError::DanglingBond);
            }
        } else {
            if !self.branch_stack.is_empty() {
                warn!("Ignoring {} unclosed branch(es)", self.branch_stack.len());
            }
            if !self.ring_map.is_empty() {
                warn!("Ignoring unclosed ring digit(s) {:?}", self.ring_map.keys());
            }
            if self.pending_bond.is_some() {
                warn!("Ignoring trailing bond symbol");
            }
        }
        Ok(())
    }
}

/// Build a molecule from a token sequence, with the default (strict) options.
pub fn parse<'a, I>(tokens: I) -> Result<Molecule, ParseError>
where
    I: IntoIterator<Item = Token<'a>>,
{
    parse_with(tokens, &ParseOptions::default())
}

/// Build a molecule from a token sequence.
///
/// The first invalid token or structural violation aborts the parse; no partial
/// molecule is returned.
pub fn parse_with<'a, I>(tokens: I, options: &ParseOptions) -> Result<Molecule, ParseError>
where
    I: IntoIterator<Item = Token<'a>>,
{
    let mut molecule = Molecule::new();
    let mut state = ParserState::default();
    for token in tokens {
        state.consume(&mut molecule, token)?;
    }
    state.finish(options)?;
    debug!(
        "Parsed molecule with {} atoms and {} bonds",
        molecule.atom_count(),
        molecule.bond_count()
    );
    Ok(molecule)
}

/// Parses a SMILES string into a Molecule.
///
/// # Arguments
///
/// * `smiles` - The SMILES string to parse.
///
/// # Returns
///
/// * `Result<Molecule, SmilesError>` - The parsed molecule or the first error found.
pub fn parse_smiles(smiles: &str) -> Result<Molecule, SmilesError> {
    parse_smiles_with(smiles, &ParseOptions::default())
}

pub fn parse_smiles_with(smiles: &str, options: &ParseOptions) -> Result<Molecule, SmilesError> {
    let tokens = tokenize(smiles)?;
    Ok(parse_with(tokens, options)?)
}

/// Create a molecule from anything that should hold SMILES text.
///
/// Input that is not valid UTF-8 is rejected with
/// [`SmilesError::InvalidInputType`] before tokenizing.
pub fn smiles_to_molecule<T: AsRef<[u8]>>(input: T) -> Result<Molecule, SmilesError> {
    let smiles = std::str::from_utf8(input.as_ref()).map_err(|_| SmilesError::InvalidInputType)?;
    parse_smiles(smiles)
}

/// Convert a SMILES string into its canonical form.
pub fn canonize_smiles(smiles: &str) -> Result<String, SmilesError> {
    Ok(parse_smiles(smiles)?.to_canonical_form())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bonds(molecule: &Molecule) -> Vec<(usize, usize, BondOrder)> {
        let mut bonds: Vec<_> = molecule
            .bonds()
            .map(|bond| (bond.atoms.0, bond.atoms.1, bond.order))
            .collect();
        bonds.sort();
        bonds
    }

    #[test]
    fn test_parse_empty() {
        let molecule = parse(vec![]).expect("Failed to parse empty token list");
        assert_eq!(molecule.atom_count(), 0);
        assert_eq!(molecule.bond_count(), 0);
        assert!(parse_smiles("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").expect("Failed to parse SMILES");
        let elements: Vec<Element> = molecule.atoms().map(|atom| atom.element).collect();
        assert_eq!(elements, vec![Element::C, Element::C, Element::O]);
        assert_eq!(
            bonds(&molecule),
            vec![(0, 1, BondOrder::Single), (1, 2, BondOrder::Single)]
        );
    }

    #[test]
    fn test_branch_returns_to_attachment_point() {
        let molecule = parse_smiles("C(N)O").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 3);
        assert_eq!(
            bonds(&molecule),
            vec![(0, 1, BondOrder::Single), (0, 2, BondOrder::Single)]
        );
    }

    #[test]
    fn test_parse_isobutane() {
        let molecule = parse_smiles("CC(C)C").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 4);
        assert_eq!(
            bonds(&molecule),
            vec![
                (0, 1, BondOrder::Single),
                (1, 2, BondOrder::Single),
                (1, 3, BondOrder::Single)
            ]
        );
    }

    #[test]
    fn test_nested_branches() {
        let molecule = parse_smiles("CC(C(F)F)(Cl)Br").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 7);
        assert_eq!(
            bonds(&molecule),
            vec![
                (0, 1, BondOrder::Single),
                (1, 2, BondOrder::Single),
                (1, 5, BondOrder::Single),
                (1, 6, BondOrder::Single),
                (2, 3, BondOrder::Single),
                (2, 4, BondOrder::Single),
            ]
        );
    }

    #[test]
    fn test_ring_closure() {
        let molecule = parse_smiles("C1CC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 3);
        assert_eq!(
            bonds(&molecule),
            vec![
                (0, 1, BondOrder::Single),
                (0, 2, BondOrder::Single),
                (1, 2, BondOrder::Single)
            ]
        );
    }

    #[test]
    fn test_parse_cyclohexane() {
        let molecule = parse_smiles("C1CCCCC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.bond_count(), 6);
        for atom in molecule.atoms() {
            assert_eq!(atom.element, Element::C);
            assert_eq!(molecule.neighbors(atom.index).count(), 2);
        }
    }

    #[test]
    fn test_ring_digit_reuse() {
        let molecule = parse_smiles("C1CC1C1CC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 6);
        assert_eq!(molecule.bond_count(), 7);
        assert_eq!(molecule.bond_between(0, 2), Some(BondOrder::Single));
        assert_eq!(molecule.bond_between(3, 5), Some(BondOrder::Single));
    }

    #[test]
    fn test_double_bond() {
        let molecule = parse_smiles("C=C").expect("Failed to parse SMILES");
        assert_eq!(bonds(&molecule), vec![(0, 1, BondOrder::Double)]);
    }

    #[test]
    fn test_pending_bond_resets_after_one_atom() {
        let molecule = parse_smiles("C=CC").expect("Failed to parse SMILES");
        assert_eq!(
            bonds(&molecule),
            vec![(0, 1, BondOrder::Double), (1, 2, BondOrder::Single)]
        );
    }

    #[test]
    fn test_explicit_single_bond() {
        let molecule = parse_smiles("C-C=O").expect("Failed to parse SMILES");
        assert_eq!(
            bonds(&molecule),
            vec![(0, 1, BondOrder::Single), (1, 2, BondOrder::Double)]
        );
    }

    #[test]
    fn test_double_bond_in_branch() {
        let molecule = parse_smiles("CC(=O)O").expect("Failed to parse SMILES");
        assert_eq!(
            bonds(&molecule),
            vec![
                (0, 1, BondOrder::Single),
                (1, 2, BondOrder::Double),
                (1, 3, BondOrder::Single)
            ]
        );
    }

    #[test]
    fn test_ring_closure_is_always_single() {
        // The bond symbol applies to the next atom, not to the ring closure.
        let molecule = parse_smiles("C1CC=1C").expect("Failed to parse SMILES");
        assert_eq!(molecule.bond_between(0, 2), Some(BondOrder::Single));
        assert_eq!(molecule.bond_between(2, 3), Some(BondOrder::Double));
    }

    #[test]
    fn test_bond_before_any_atom() {
        assert_eq!(
            parse_smiles("==-"),
            Err(ParseError::ExpectedAtomBeforeBond.into())
        );
        assert_eq!(
            parse_smiles("=C"),
            Err(ParseError::ExpectedAtomBeforeBond.into())
        );
    }

    #[test]
    fn test_branch_before_any_atom() {
        assert_eq!(
            parse_smiles("(C)"),
            Err(ParseError::ExpectedAtomBeforeBranch.into())
        );
        assert_eq!(
            parse_smiles(")C"),
            Err(ParseError::ExpectedAtomBeforeBranch.into())
        );
    }

    #[test]
    fn test_ring_before_any_atom() {
        assert_eq!(
            parse_smiles("1CC1"),
            Err(ParseError::ExpectedAtomBeforeRing.into())
        );
    }

    #[test]
    fn test_unrecognized_token() {
        assert_eq!(
            parse_smiles("==-:"),
            Err(LexError::UnrecognizedToken(":".to_string()).into())
        );
        assert_eq!(
            parse_smiles("==-:").unwrap_err().to_string(),
            "Token : is not a supported value"
        );
    }

    #[test]
    fn test_classification_error_from_hand_built_tokens() {
        let tokens = vec![Token::new("C"), Token::new("S")];
        assert_eq!(
            parse(tokens),
            Err(ParseError::Lex(LexError::UnrecognizedToken("S".to_string())))
        );
    }

    #[test]
    fn test_unmatched_branch_close() {
        assert_eq!(
            parse_smiles("CC)C"),
            Err(ParseError::UnmatchedBranchClose.into())
        );
        assert_eq!(
            parse_smiles_with("CC)C", &ParseOptions::lenient()),
            Err(ParseError::UnmatchedBranchClose.into())
        );
    }

    #[test]
    fn test_strict_end_of_input() {
        assert_eq!(
            parse_smiles("CC(C"),
            Err(ParseError::UnclosedBranches(1).into())
        );
        assert_eq!(
            parse_smiles("C1CC2C"),
            Err(ParseError::UnclosedRings(vec![1, 2]).into())
        );
        assert_eq!(parse_smiles("CC="), Err(ParseError::DanglingBond.into()));
    }

    #[test]
    fn test_lenient_end_of_input() {
        let lenient = ParseOptions::lenient();

        let molecule = parse_smiles_with("CC(C", &lenient).expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 3);
        assert_eq!(molecule.bond_count(), 2);

        let molecule = parse_smiles_with("C1CC", &lenient).expect("Failed to parse SMILES");
        assert_eq!(molecule.bond_count(), 2);

        let molecule = parse_smiles_with("CC=", &lenient).expect("Failed to parse SMILES");
        assert_eq!(molecule.bond_count(), 1);
    }

    #[test]
    fn test_ring_onto_same_atom() {
        assert_eq!(
            parse_smiles("C11"),
            Err(ParseError::Graph(GraphError::SelfBond(0)).into())
        );
    }

    #[test]
    fn test_ring_onto_bonded_atom() {
        assert_eq!(
            parse_smiles("C1C1"),
            Err(ParseError::Graph(GraphError::DuplicateBond(0, 1)).into())
        );
    }

    #[test]
    fn test_invalid_input_type() {
        assert_eq!(
            smiles_to_molecule([0xffu8, 0xfe, 0x43]),
            Err(SmilesError::InvalidInputType)
        );
        assert_eq!(
            smiles_to_molecule(vec![0xc3u8]).unwrap_err().to_string(),
            "Smiles string required as input"
        );
    }

    #[test]
    fn test_text_input_types() {
        assert_eq!(smiles_to_molecule("CCO").unwrap().atom_count(), 3);
        assert_eq!(smiles_to_molecule(String::from("CBr")).unwrap().atom_count(), 2);
        assert_eq!(smiles_to_molecule(b"C=C").unwrap().bond_count(), 1);
    }

    #[test]
    fn test_canonize_smiles() {
        assert_eq!(canonize_smiles("OCC").unwrap(), canonize_smiles("CCO").unwrap());
        assert!(canonize_smiles("C(").is_err());
    }
}
