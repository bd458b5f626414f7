use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use lazy_static::lazy_static;
use tracing::*;

use crate::{BondOrder, Element, LexError};

pub const BRANCH_SYMBOLS: [&str; 2] = ["(", ")"];
pub const RING_SYMBOLS: [&str; 9] = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
pub const BOND_SYMBOLS: [&str; 2] = ["-", "="];

lazy_static! {
    /// Every recognized lexeme and the kind it classifies as.
    static ref TOKEN_KINDS: HashMap<&'static str, TokenKind> = {
        let mut kinds = HashMap::new();
        for element in Element::ALL {
            kinds.insert(element.symbol(), TokenKind::Atom(element));
        }
        kinds.insert(BRANCH_SYMBOLS[0], TokenKind::BranchOpen);
        kinds.insert(BRANCH_SYMBOLS[1], TokenKind::BranchClose);
        for (digit, symbol) in (1u8..).zip(RING_SYMBOLS) {
            kinds.insert(symbol, TokenKind::Ring(digit));
        }
        kinds.insert(BOND_SYMBOLS[0], TokenKind::Bond(BondOrder::Single));
        kinds.insert(BOND_SYMBOLS[1], TokenKind::Bond(BondOrder::Double));
        kinds
    };
}

/// A single lexeme borrowed from the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token<'a>(&'a str);

impl<'a> Token<'a> {
    pub fn new(lexeme: &'a str) -> Self {
        Token(lexeme)
    }

    pub fn lexeme(&self) -> &'a str {
        self.0
    }

    pub fn kind(&self) -> Result<TokenKind, LexError> {
        classify(*self)
    }
}

impl PartialEq<&str> for Token<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// The semantic category of a token, which drives the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Atom(Element),
    BranchOpen,
    BranchClose,
    /// A ring-closure digit, 1 through 9.
    Ring(u8),
    Bond(BondOrder),
}

/// Is `lexeme` one of the supported atoms, branch delimiters, ring digits or bonds?
pub fn is_recognized(lexeme: &str) -> bool {
    TOKEN_KINDS.contains_key(lexeme)
}

/// Map a token to its kind, failing on anything outside the supported alphabet.
pub fn classify(token: Token) -> Result<TokenKind, LexError> {
    TOKEN_KINDS
        .get(token.lexeme())
        .copied()
        .ok_or_else(|| LexError::UnrecognizedToken(token.lexeme().to_string()))
}

/// Split a SMILES string into tokens.
///
/// Element symbols are ambiguous from the left ("C" is a prefix of "Cl"), but
/// not from the right: a lowercase letter is always the tail of a two-letter
/// symbol. The input is therefore scanned back to front, each uppercase or
/// non-letter character closing the lexeme that ends at the previous boundary.
///
/// # Arguments
///
/// * `input` - The SMILES string to split.
///
/// # Returns
///
/// * `Result<Vec<Token>, LexError>` - The tokens in left-to-right order, or the
///   first (rightmost) unrecognized lexeme.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut tokens = Vec::new();
    let mut end = input.len();

    for (start, ch) in input.char_indices().rev() {
        if ch.is_lowercase() {
            continue;
        }

        let lexeme = &input[start..end];
        if !is_recognized(lexeme) {
            debug!("Unrecognized lexeme {:?} at byte {} of {:?}", lexeme, start, input);
            return Err(LexError::UnrecognizedToken(lexeme.to_string()));
        }
        tokens.push(Token::new(lexeme));
        end = start;
    }

    // Lowercase letters with nothing in front of them to attach to.
    if end > 0 {
        let lexeme = &input[..end];
        debug!("Unrecognized leading lexeme {:?} of {:?}", lexeme, input);
        return Err(LexError::UnrecognizedToken(lexeme.to_string()));
    }

    tokens.reverse();
    trace!("Tokenized {:?} into {} tokens", input, tokens.len());
    Ok(tokens)
}
