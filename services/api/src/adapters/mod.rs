pub mod chime;
pub mod json_file;

pub use chime::ChimeCue;
pub use json_file::JsonFileRepository;
