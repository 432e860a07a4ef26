//! Identifier utilities

use rand::Rng;
use uuid::Uuid;

/// Generate a fresh experiment setup uid: four random 4-digit groups joined by dashes
/// (e.g. `4821-1093-7750-2316`).
pub fn generate_setup_uid() -> String {
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| rng.gen_range(1000..10000).to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Generate a new UUIDv4 (result run identifiers)
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}
