//! End-to-end flows through the session authenticator with in-memory
//! collaborators and a manual clock.

use anyhow::Result;
use secrecy::SecretString;
use sesio::{
    AuthConfig, AuthError, ManualClock, Principal, SessionAuthenticator, SigningKey,
    SigningKeyset,
    memory::{MemoryAttemptStore, MemoryPrincipalStore, MemoryRevocationStore},
};
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000;

struct Harness {
    auth: SessionAuthenticator,
    clock: Arc<ManualClock>,
}

async fn harness(config: AuthConfig) -> Result<Harness> {
    let principals = Arc::new(MemoryPrincipalStore::new());
    principals
        .upsert(Principal {
            id: "u1".to_string(),
            credential_hash: sesio::hash_secret(&secret("correct"))?,
            disabled: false,
        })
        .await;

    let clock = Arc::new(ManualClock::new(NOW));
    let keyset = SigningKeyset::new(vec![SigningKey::new("k1", vec![7u8; 32])?])?;
    let auth = SessionAuthenticator::new(
        principals,
        Arc::new(MemoryAttemptStore::new()),
        Arc::new(MemoryRevocationStore::new()),
        keyset,
        config,
        Arc::clone(&clock) as Arc<dyn sesio::Clock>,
    );
    Ok(Harness { auth, clock })
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn login_then_validate_at_same_instant() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;
    let pair = h.auth.login("u1", &secret("correct"), "origin-a").await?;

    let claims = h.auth.validate_access(&pair.access_token)?;
    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.iat, NOW);
    Ok(())
}

#[tokio::test]
async fn access_token_expires_after_fifteen_minutes() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;
    let pair = h.auth.login("u1", &secret("correct"), "origin-a").await?;

    h.clock.advance(15 * 60 - 1);
    assert!(h.auth.validate_access(&pair.access_token).is_ok());

    h.clock.advance(2);
    assert!(matches!(
        h.auth.validate_access(&pair.access_token),
        Err(AuthError::Expired)
    ));
    Ok(())
}

#[tokio::test]
async fn lockout_blocks_even_the_correct_secret() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;

    // Five wrong secrets inside one minute.
    for _ in 0..5 {
        let result = h.auth.login("u1", &secret("wrong"), "origin-a").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        h.clock.advance(10);
    }

    let locked = h.auth.login("u1", &secret("correct"), "origin-a").await;
    let Err(AuthError::LockedOut { retry_after }) = locked else {
        panic!("expected LockedOut, got {locked:?}");
    };
    assert!(retry_after > Duration::ZERO);

    // Once the lock lapses, the correct secret goes through.
    h.clock.advance(i64::try_from(retry_after.as_secs())? + 1);
    assert!(
        h.auth
            .login("u1", &secret("correct"), "origin-a")
            .await
            .is_ok()
    );
    Ok(())
}

#[tokio::test]
async fn lockout_is_scoped_to_the_origin() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;

    for _ in 0..5 {
        let _ = h.auth.login("u1", &secret("wrong"), "origin-a").await;
    }
    assert!(matches!(
        h.auth.login("u1", &secret("correct"), "origin-a").await,
        Err(AuthError::LockedOut { .. })
    ));

    // A different origin is unaffected.
    assert!(
        h.auth
            .login("u1", &secret("correct"), "origin-b")
            .await
            .is_ok()
    );
    Ok(())
}

#[tokio::test]
async fn refresh_rotation_is_exactly_once() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;
    let pair = h.auth.login("u1", &secret("correct"), "origin-a").await?;

    let rotated = h.auth.refresh(&pair.refresh_token).await?;
    assert!(matches!(
        h.auth.refresh(&pair.refresh_token).await,
        Err(AuthError::Revoked)
    ));
    assert!(h.auth.validate_access(&rotated.access_token).is_ok());
    Ok(())
}

#[tokio::test]
async fn concurrent_refreshes_grant_exactly_one_pair() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;
    let pair = h.auth.login("u1", &secret("correct"), "origin-a").await?;

    let auth = Arc::new(h.auth);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let auth = Arc::clone(&auth);
        let token = pair.refresh_token.clone();
        tasks.push(tokio::spawn(async move { auth.refresh(&token).await }));
    }

    let mut granted = 0;
    let mut revoked = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => granted += 1,
            Err(AuthError::Revoked) => revoked += 1,
            Err(other) => panic!("unexpected failure: {other:?}"),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(revoked, 7);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() -> Result<()> {
    let h = harness(AuthConfig::new()).await?;
    let pair = h.auth.login("u1", &secret("correct"), "origin-a").await?;

    h.auth.logout(&pair.refresh_token).await?;
    assert!(matches!(
        h.auth.refresh(&pair.refresh_token).await,
        Err(AuthError::Revoked)
    ));
    Ok(())
}

#[tokio::test]
async fn refresh_chain_survives_key_rotation() -> Result<()> {
    let principals = Arc::new(MemoryPrincipalStore::new());
    principals
        .upsert(Principal {
            id: "u1".to_string(),
            credential_hash: sesio::hash_secret(&secret("correct"))?,
            disabled: false,
        })
        .await;
    let attempts = Arc::new(MemoryAttemptStore::new());
    let revocations = Arc::new(MemoryRevocationStore::new());
    let clock = Arc::new(ManualClock::new(NOW));

    let old_keys = SigningKeyset::new(vec![SigningKey::new("k1", vec![7u8; 32])?])?;
    let auth = SessionAuthenticator::new(
        Arc::clone(&principals) as Arc<dyn sesio::PrincipalStore>,
        Arc::clone(&attempts) as Arc<dyn sesio::AttemptStore>,
        Arc::clone(&revocations) as Arc<dyn sesio::RevocationStore>,
        old_keys,
        AuthConfig::new(),
        Arc::clone(&clock) as Arc<dyn sesio::Clock>,
    );
    let pair = auth.login("u1", &secret("correct"), "origin-a").await?;

    // Restarted with a rotated keyset over the same stores: k2 mints, k1
    // still verifies.
    let rotated_keys = SigningKeyset::new(vec![
        SigningKey::new("k2", vec![9u8; 32])?,
        SigningKey::new("k1", vec![7u8; 32])?,
    ])?;
    let rotated_auth = SessionAuthenticator::new(
        principals,
        attempts,
        revocations,
        rotated_keys,
        AuthConfig::new(),
        Arc::clone(&clock) as Arc<dyn sesio::Clock>,
    );

    assert!(rotated_auth.validate_access(&pair.access_token).is_ok());
    let fresh = rotated_auth.refresh(&pair.refresh_token).await?;
    assert!(rotated_auth.validate_access(&fresh.access_token).is_ok());
    Ok(())
}

#[tokio::test]
async fn escalating_lockouts_double_the_wait() -> Result<()> {
    let config = AuthConfig::new().with_failure_threshold(2);
    let h = harness(config).await?;

    for _ in 0..2 {
        let _ = h.auth.login("u1", &secret("wrong"), "origin-a").await;
    }
    let Err(AuthError::LockedOut { retry_after: first }) =
        h.auth.login("u1", &secret("correct"), "origin-a").await
    else {
        panic!("expected first lockout");
    };
    assert_eq!(first, Duration::from_secs(30));

    h.clock.advance(31);
    for _ in 0..2 {
        let _ = h.auth.login("u1", &secret("wrong"), "origin-a").await;
    }
    let Err(AuthError::LockedOut { retry_after: second }) =
        h.auth.login("u1", &secret("correct"), "origin-a").await
    else {
        panic!("expected second lockout");
    };
    assert_eq!(second, Duration::from_secs(60));
    Ok(())
}

#[tokio::test]
async fn pruning_clears_expired_revocations() -> Result<()> {
    let config = AuthConfig::new().with_refresh_ttl(Duration::from_secs(3600));
    let h = harness(config).await?;
    let pair = h.auth.login("u1", &secret("correct"), "origin-a").await?;
    h.auth.logout(&pair.refresh_token).await?;

    assert_eq!(h.auth.prune_revocations().await?, 0);
    h.clock.advance(3601);
    assert_eq!(h.auth.prune_revocations().await?, 1);
    Ok(())
}
