pub mod compiler;
pub mod concepts;
pub mod intent;
pub mod model;
pub mod terminology;
pub mod text;

pub use compiler::compile;
pub use concepts::extract;
pub use model::{
	Candidate, CandidateKind, CandidateMetrics, CompiledQuery, ConceptSet, ExtractedQuery, Filters,
	Intent, Profile, QueryKind, SortMode,
};
pub use terminology::{StaticTerminology, Terminology};
