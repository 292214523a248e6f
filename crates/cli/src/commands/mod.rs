pub mod combine;
pub mod evaluate;
pub mod extract;
pub mod hints;
pub mod plan;
pub mod project;
pub mod runs;
pub mod scoring;
pub mod train;
pub mod util;

pub use combine::*;
pub use evaluate::*;
pub use extract::*;
pub use hints::*;
pub use plan::*;
pub use project::*;
pub use runs::*;
pub use scoring::*;
pub use train::*;
pub use util::*;
