use chrono::{
    DateTime,
    Utc,
};
use sha2::{
    Digest,
    Sha256,
};

pub const DEFAULT_NONCE_BUCKET_SECS: u64 = 86_400;

pub const DEFAULT_GREETING: &str = "Welcome to the farm!";

/// Coarse nonce: the index of the time bucket `now` falls in. The same message is
/// produced for every request inside a bucket.
pub fn challenge_nonce(now: DateTime<Utc>, bucket_secs: u64) -> i64 {
    let bucket_millis = i64::try_from(bucket_secs.max(1))
        .unwrap_or(i64::MAX)
        .saturating_mul(1_000);
    now.timestamp_millis().div_euclid(bucket_millis)
}

pub fn challenge_message(greeting: &str, address: &str, nonce: i64) -> String {
    format!(
        "{greeting}\n\nClick to sign in and accept the Terms of Service.\n\n\
         This request will not trigger a blockchain transaction or cost any gas fees.\n\n\
         Wallet address:\n{address}\n\nNonce: {nonce}"
    )
}

/// Hex sha256 of a challenge, used to refer to it in logs.
pub fn challenge_digest(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use chrono::{
        Duration,
        TimeZone,
    };

    #[test]
    fn challenge_nonce__is_stable_within_a_day() {
        // given
        let morning = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 1).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();

        // then
        assert_eq!(
            challenge_nonce(morning, DEFAULT_NONCE_BUCKET_SECS),
            challenge_nonce(evening, DEFAULT_NONCE_BUCKET_SECS)
        );
    }

    #[test]
    fn challenge_nonce__changes_once_per_bucket() {
        // given
        let midnight = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        let just_before = midnight - Duration::milliseconds(1);

        // when
        let before = challenge_nonce(just_before, DEFAULT_NONCE_BUCKET_SECS);
        let after = challenge_nonce(midnight, DEFAULT_NONCE_BUCKET_SECS);

        // then
        assert_eq!(after, before + 1);
        assert_eq!(after, midnight.timestamp() / 86_400);
    }

    #[test]
    fn challenge_message__embeds_address_and_nonce() {
        let message = challenge_message(DEFAULT_GREETING, "0xABC", 19_800);
        assert!(message.starts_with(DEFAULT_GREETING));
        assert!(message.contains("Wallet address:\n0xABC"));
        assert!(message.ends_with("Nonce: 19800"));
    }

    #[test]
    fn challenge_digest__is_hex_sha256() {
        let digest = challenge_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
