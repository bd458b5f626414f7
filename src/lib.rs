use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

mod parse;
pub use parse::*;

mod molecule;
pub use molecule::*;

mod canon;
pub use canon::*;

mod database;
pub use database::*;

/// The elements that may appear as atoms in a supported SMILES string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    C,
    N,
    O,
    F,
    Cl,
    Br,
}

impl Element {
    /// Every supported element, in order of atomic number.
    pub const ALL: [Element; 6] = [
        Element::C,
        Element::N,
        Element::O,
        Element::F,
        Element::Cl,
        Element::Br,
    ];

    /// Look up an element by its SMILES symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "C" => Some(Element::C),
            "N" => Some(Element::N),
            "O" => Some(Element::O),
            "F" => Some(Element::F),
            "Cl" => Some(Element::Cl),
            "Br" => Some(Element::Br),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Cl => "Cl",
            Element::Br => "Br",
        }
    }

    pub fn atomic_number(&self) -> u8 {
        match self {
            Element::C => 6,
            Element::N => 7,
            Element::O => 8,
            Element::F => 9,
            Element::Cl => 17,
            Element::Br => 35,
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = LexError;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        Element::from_symbol(symbol).ok_or_else(|| LexError::UnrecognizedToken(symbol.to_string()))
    }
}

/// The multiplicity of a bond. Bonds are single unless marked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
}

impl BondOrder {
    /// The symbol written for this bond in SMILES. Single bonds are implicit.
    pub fn smiles_symbol(&self) -> &'static str {
        match self {
            BondOrder::Single => "",
            BondOrder::Double => "=",
        }
    }
}

/// Install a global `tracing` subscriber that prints events at `level` and above.
///
/// Unknown levels fall back to `info`. Calling this more than once is harmless:
/// only the first subscriber is installed.
pub fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
