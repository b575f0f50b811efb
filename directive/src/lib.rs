pub mod diagnostic;
pub mod extract;
pub mod grammar;
pub mod normalize;
pub mod region;

pub use diagnostic::{Finding, Issue};
pub use extract::{DirectiveCall, Extractor, Scan, ScanResult, extract};
pub use grammar::{Delimiters, Grammar, GrammarError, RegionGrammar};
pub use region::{Line, LineKind, RegionFilter, filter};
