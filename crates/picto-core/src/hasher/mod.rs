pub mod content;

pub use content::{hash_data, hash_file, hash_files, DIGEST_BYTES};
