use std::sync::Arc;
use tracing::{debug, info};

use crate::managers::cooldown::{Clock, CooldownDecision, CooldownTracker};
use crate::managers::like_client::LikeClient;
use crate::models::{InvalidUidReason, LikeInvocation, LikeLookupResult};
use crate::state::SharedAllowList;

/// Minimum number of digits in a player UID
pub const MIN_UID_LEN: usize = 6;

/// A UID is all ASCII digits and at least `MIN_UID_LEN` long
pub fn validate_uid(raw: &str) -> std::result::Result<&str, InvalidUidReason> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(InvalidUidReason::NonDigit);
    }
    if raw.len() < MIN_UID_LEN {
        return Err(InvalidUidReason::TooShort);
    }
    Ok(raw)
}

/// Runs the `/like` flow: allow-list, cooldown, UID check, upstream lookup.
pub struct LikeService {
    allow_list: SharedAllowList,
    cooldowns: CooldownTracker,
    client: LikeClient,
    clock: Arc<dyn Clock>,
}

impl LikeService {
    pub fn new(
        allow_list: SharedAllowList,
        cooldowns: CooldownTracker,
        client: LikeClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            allow_list,
            cooldowns,
            client,
            clock,
        }
    }

    /// Stops at the first gate that fails. The cooldown is recorded as soon
    /// as that gate passes, even if the UID later turns out to be invalid.
    pub async fn handle_like_command(&self, invocation: &LikeInvocation) -> LikeLookupResult {
        if !self
            .allow_list
            .is_channel_allowed(invocation.guild_id, invocation.channel_id)
            .await
        {
            debug!(
                "Like from {} rejected: channel {} not allowed",
                invocation.user_id, invocation.channel_id
            );
            return LikeLookupResult::Forbidden;
        }

        let now = self.clock.now();
        if let CooldownDecision::Blocked { remaining_seconds } =
            self.cooldowns.check_and_record(invocation.user_id, now)
        {
            debug!(
                "Like from {} on cooldown for {}s",
                invocation.user_id, remaining_seconds
            );
            return LikeLookupResult::CooldownActive { remaining_seconds };
        }
        debug!(
            "Cooldown started for {} ({} users tracked)",
            invocation.user_id,
            self.cooldowns.tracked_users()
        );

        let uid = match validate_uid(&invocation.raw_uid) {
            Ok(uid) => uid,
            Err(reason) => {
                debug!("Like from {} rejected: {}", invocation.user_id, reason);
                return LikeLookupResult::InvalidInput { reason };
            }
        };

        let result = self.client.lookup_player(uid).await;
        info!(
            "Like for uid {} requested by {}: {}",
            uid,
            invocation.user_id,
            outcome_label(&result)
        );
        result
    }

    pub fn cooldown_secs(&self) -> u64 {
        self.cooldowns.window_secs()
    }
}

fn outcome_label(result: &LikeLookupResult) -> &'static str {
    match result {
        LikeLookupResult::Success(_) => "success",
        LikeLookupResult::AlreadyMaxedToday { .. } => "already maxed today",
        LikeLookupResult::PlayerNotFound { .. } => "player not found",
        LikeLookupResult::RateLimited => "rate limited",
        LikeLookupResult::UpstreamError { .. } => "upstream error",
        LikeLookupResult::Timeout => "timeout",
        LikeLookupResult::InvalidInput { .. } => "invalid input",
        LikeLookupResult::Forbidden => "forbidden",
        LikeLookupResult::CooldownActive { .. } => "cooldown",
    }
}

/// Shared like service type
pub type SharedLikeService = Arc<LikeService>;

pub fn create_shared_like_service(
    allow_list: SharedAllowList,
    cooldowns: CooldownTracker,
    client: LikeClient,
    clock: Arc<dyn Clock>,
) -> SharedLikeService {
    Arc::new(LikeService::new(allow_list, cooldowns, client, clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LikeApiSettings;
    use crate::state::allow_list::MemoryPersistence;
    use crate::state::{create_shared_allow_list, AllowListConfig, AllowListStore};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that only moves when told to
    struct ManualClock {
        secs: AtomicI64,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                secs: AtomicI64::new(1_700_000_000),
            })
        }

        fn advance(&self, secs: i64) {
            self.secs.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(self.secs.load(Ordering::SeqCst), 0).unwrap()
        }
    }

    fn service(api_host: &str, config: AllowListConfig, clock: Arc<ManualClock>) -> LikeService {
        let allow_list =
            create_shared_allow_list(AllowListStore::new(MemoryPersistence::new(), config));
        let client = LikeClient::new(LikeApiSettings {
            api_host: api_host.to_string(),
            ..Default::default()
        })
        .unwrap();
        LikeService::new(allow_list, CooldownTracker::new(30), client, clock)
    }

    fn invocation(user_id: u64, guild_id: Option<u64>, channel_id: u64, uid: &str) -> LikeInvocation {
        LikeInvocation {
            user_id,
            guild_id,
            channel_id,
            raw_uid: uid.to_string(),
        }
    }

    #[test]
    fn test_validate_uid() {
        assert_eq!(validate_uid("12345"), Err(InvalidUidReason::TooShort));
        assert_eq!(validate_uid("abcdef"), Err(InvalidUidReason::NonDigit));
        assert_eq!(validate_uid("12345a"), Err(InvalidUidReason::NonDigit));
        assert_eq!(validate_uid(""), Err(InvalidUidReason::NonDigit));
        assert_eq!(validate_uid("123456"), Ok("123456"));
        assert_eq!(validate_uid("12345678901234567890"), Ok("12345678901234567890"));
    }

    #[tokio::test]
    async fn test_forbidden_channel_short_circuits() {
        let mut config = AllowListConfig::new();
        config.toggle_channel("1", "10");
        let svc = service("http://127.0.0.1:1", config, ManualClock::new());

        let result = svc.handle_like_command(&invocation(5, Some(1), 11, "123456")).await;
        assert_eq!(result, LikeLookupResult::Forbidden);
        // No cooldown was recorded for the rejected call
        assert_eq!(svc.cooldowns.tracked_users(), 0);
    }

    #[tokio::test]
    async fn test_invalid_uid_still_starts_cooldown() {
        let clock = ManualClock::new();
        let svc = service("http://127.0.0.1:1", AllowListConfig::new(), clock.clone());

        let result = svc.handle_like_command(&invocation(5, None, 11, "12345")).await;
        assert_eq!(
            result,
            LikeLookupResult::InvalidInput {
                reason: InvalidUidReason::TooShort
            }
        );

        clock.advance(5);
        let result = svc.handle_like_command(&invocation(5, None, 11, "123456")).await;
        assert_eq!(
            result,
            LikeLookupResult::CooldownActive {
                remaining_seconds: 25
            }
        );
    }

    #[tokio::test]
    async fn test_full_flow_and_cooldown_expiry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/likes")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status":200,"sent":"100 likes","nickname":"P"}"#)
            .expect(2)
            .create_async()
            .await;

        let clock = ManualClock::new();
        let mut config = AllowListConfig::new();
        config.toggle_channel("1", "10");
        let svc = service(&server.url(), config, clock.clone());

        let call = invocation(5, Some(1), 10, "123456");
        assert!(matches!(
            svc.handle_like_command(&call).await,
            LikeLookupResult::Success(_)
        ));

        clock.advance(29);
        assert_eq!(
            svc.handle_like_command(&call).await,
            LikeLookupResult::CooldownActive {
                remaining_seconds: 1
            }
        );

        clock.advance(1);
        assert!(matches!(
            svc.handle_like_command(&call).await,
            LikeLookupResult::Success(_)
        ));
        mock.assert_async().await;
    }
}
