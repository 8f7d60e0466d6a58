use uuid::Uuid;

/// Source of fresh item identifiers.
///
/// Uniqueness is best-effort; the store's non-existence precondition on create
/// is what actually rejects a duplicate.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs in hyphenated form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
