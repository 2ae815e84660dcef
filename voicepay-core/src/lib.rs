pub mod amount;
pub mod command;
pub mod lexicon;
pub mod types;

mod payee;

// Keep the public surface small and intentional.
pub use amount::*;
pub use command::*;
pub use lexicon::*;
pub use types::*;
