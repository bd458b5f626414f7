mod error;
pub use error::*;

mod token;
pub use token::*;

mod smiles;
pub use smiles::*;
