pub mod toml_loader;

pub use toml_loader::{load_all_papers, load_paper, LoadedPaper};
