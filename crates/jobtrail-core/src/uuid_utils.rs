//! UUID utilities: time-ordered v7 identifiers for fresh entities and
//! name-based v5 identifiers for deterministically-keyed records.
//!
//! Records imported from a one-time source (bulk mail scans, minted thread
//! identifiers) derive their store id by hashing a namespace constant with
//! the natural key, so repeated ingestion of the same natural key always
//! maps to the same store identifier. That turns blind inserts into
//! idempotent upserts without a lookup round-trip.

use uuid::Uuid;

/// Namespace for all deterministic jobtrail identifiers (UUIDv5).
///
/// Fixed at first release; changing it would re-key every deterministic
/// record on re-import.
pub const NAMESPACE_JOBTRAIL: Uuid = Uuid::from_bytes([
    0x6a, 0x0b, 0x74, 0x72, 0x61, 0x69, 0x6c, 0x00, 0x8f, 0x3d, 0x41, 0xc2, 0x9e, 0x55, 0x27,
    0x01,
]);

/// Generate a new time-ordered UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Derive a deterministic id from a natural key within a sub-namespace.
///
/// The sub-namespace keeps different record kinds from colliding when their
/// natural keys happen to match (e.g. a message and a thread both keyed by
/// a provider thread id).
pub fn deterministic_id(kind: &str, natural_key: &str) -> Uuid {
    let name = format!("{kind}:{natural_key}");
    Uuid::new_v5(&NAMESPACE_JOBTRAIL, name.as_bytes())
}

/// Deterministic id for a message imported from a bulk source.
pub fn message_id(user_id: Uuid, provider_message_id: &str) -> Uuid {
    deterministic_id("message", &format!("{user_id}/{provider_message_id}"))
}

/// Deterministic id for a thread record keyed by its thread identifier.
pub fn thread_record_id(user_id: Uuid, thread_id: &str) -> Uuid {
    deterministic_id("thread", &format!("{user_id}/{thread_id}"))
}

/// Check if a UUID is version 7.
#[inline]
pub fn is_v7(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_v7_is_version_7() {
        assert!(is_v7(&new_v7()));
    }

    #[test]
    fn test_v7_ordering() {
        let id1 = new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = new_v7();
        assert!(id2 > id1);
    }

    #[test]
    fn test_deterministic_id_stable() {
        let a = deterministic_id("message", "u1/m1");
        let b = deterministic_id("message", "u1/m1");
        assert_eq!(a, b, "Same natural key must map to the same id");
    }

    #[test]
    fn test_deterministic_id_kind_separation() {
        let msg = deterministic_id("message", "t1");
        let thread = deterministic_id("thread", "t1");
        assert_ne!(msg, thread);
    }

    #[test]
    fn test_deterministic_id_is_v5() {
        let id = deterministic_id("thread", "abc");
        assert_eq!(id.get_version_num(), 5);
    }

    #[test]
    fn test_message_id_scoped_by_user() {
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();
        assert_ne!(message_id(u1, "m1"), message_id(u2, "m1"));
        assert_eq!(message_id(u1, "m1"), message_id(u1, "m1"));
    }

    #[test]
    fn test_thread_record_id_stable_across_runs() {
        let user = Uuid::nil();
        let a = thread_record_id(user, "thread-1704067200000");
        let b = thread_record_id(user, "thread-1704067200000");
        assert_eq!(a, b);
    }
}
