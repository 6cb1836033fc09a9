//! Prefixed identifiers for Workshop entities (`project_…`, `step_…`, `snapshot_…`).

use uuid::Uuid;

/// Returns `"{prefix}_{uuid-v4}"`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_are_unique() {
        let a = new_id("step");
        let b = new_id("step");
        assert!(a.starts_with("step_"));
        assert_ne!(a, b);
    }
}
