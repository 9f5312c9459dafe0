pub mod extract_faces_use_case;
pub mod extraction_config;
pub mod run_statistics;
pub mod save_faces_use_case;
