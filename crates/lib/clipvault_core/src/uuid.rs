// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// Used for account ids and for the `jti` claim of every minted token, so two
// tokens issued for the same account within one second never collide.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn uuidv7_values_are_distinct() {
        let a = uuidv7();
        let b = uuidv7();
        assert_ne!(a, b);
        assert!(b >= a);
    }
}
