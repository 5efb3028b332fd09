pub mod lane;
pub mod loaders;
pub mod paper;
pub mod result;
pub mod score;

pub use lane::Lane;
pub use loaders::{load_all_papers, load_paper, LoadedPaper};
pub use paper::{Paper, PaperBuilder, DEFAULT_LOCALE};
pub use result::{AssessmentResult, Diagnostic, Mark, OverallScore, ResultSet};
pub use score::{Rating, ScoreScale, DEFAULT_SCALE_MAX};
