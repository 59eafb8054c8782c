/// Generate a fresh coupon code (UUIDv4).
///
/// Random, globally unique for any realistic pool size — collision
/// probability is negligible and the storage layer's unique constraint
/// backstops it anyway.
pub fn new_code() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Get the current time as unix seconds.
///
/// Used wherever the storage layer does window arithmetic (claim
/// expiry cutoffs) — integer seconds compare cheaply in SQL.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_code() {
        let code = new_code();
        assert_eq!(code.len(), 36);
        assert_eq!(code.matches('-').count(), 4);
        assert_ne!(code, new_code());
    }

    #[test]
    fn test_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_now_epoch() {
        // Sanity: after 2020-01-01, before 2100.
        let now = now_epoch();
        assert!(now > 1_577_836_800);
        assert!(now < 4_102_444_800);
    }
}
