//! Formula parsing and bead-backed storage.
//!
//! Formulas are workflow templates that expand into bead hierarchies. The
//! expansion itself happens outside the core; this crate covers the store
//! contract: parsing `.formula.toml` / `.formula.json` files, converting
//! between the two encodings, and persisting formulas as beads of type
//! `formula`.

pub mod parser;
pub mod store;
pub mod types;

pub use parser::{find_formula, load_formula, parse_json, parse_toml};
pub use store::{formula_from_issue, list_formulas, load_stored_formula, save_formula};
pub use types::{Formula, FormulaError, Step, VarDef};
