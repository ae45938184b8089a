mod checksum;

pub use checksum::{digests_match, sha256_file_hex, sha256_hex, sha256_reader_hex};
