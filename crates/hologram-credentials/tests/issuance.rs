//! Integration tests for `DirectCredentialService` with a counting STS stub.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, Utc};
use hologram_credentials::{
    AssumeRoleRequest, CredentialError, CredentialService, Credentials, DirectCredentialService,
    IssuanceConfig, Sts, StsError,
};
use hologram_users::{Group, User};

// =========================================================================
// Stub STS
// =========================================================================

/// Records every request and answers with fixed credentials, or with an
/// error when `fail_with` is set.
#[derive(Default)]
struct RecordingSts {
    assume_role_calls: Mutex<Vec<AssumeRoleRequest>>,
    session_token_calls: Mutex<Vec<u64>>,
    fail_with: Option<String>,
}

impl RecordingSts {
    fn assume_role_calls(&self) -> Vec<AssumeRoleRequest> {
        self.assume_role_calls.lock().unwrap().clone()
    }
}

fn issued(token: &str) -> Credentials {
    Credentials {
        access_key_id: "AKIDEXAMPLE".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: token.to_string(),
        expiration: Utc::now() + TimeDelta::hours(1),
    }
}

impl Sts for RecordingSts {
    async fn assume_role(&self, req: AssumeRoleRequest) -> Result<Credentials, StsError> {
        let token = format!("token-for-{}", req.role_arn);
        self.assume_role_calls.lock().unwrap().push(req);
        match &self.fail_with {
            Some(msg) => Err(StsError::new(msg.clone())),
            None => Ok(issued(&token)),
        }
    }

    async fn get_session_token(&self, duration_secs: u64) -> Result<Credentials, StsError> {
        self.session_token_calls.lock().unwrap().push(duration_secs);
        Ok(issued("session-token"))
    }
}

// =========================================================================
// Fixtures
// =========================================================================

fn user_with_groups(groups: Vec<Group>) -> User {
    User {
        username: "alice".to_string(),
        ssh_public_keys: Vec::new(),
        groups: groups.into_iter().map(Arc::new).collect(),
        default_role: "X".to_string(),
    }
}

fn group(roles: &[&str], timeout: u64) -> Group {
    Group {
        dn: "cn=grp,dc=example,dc=com".to_string(),
        role_arns: roles.iter().map(|r| r.to_string()).collect(),
        session_timeout_secs: timeout,
    }
}

fn service(sts: Arc<RecordingSts>) -> DirectCredentialService<Arc<RecordingSts>> {
    DirectCredentialService::new(
        sts,
        IssuanceConfig {
            account: "999".to_string(),
            account_aliases: BTreeMap::from([(
                "prod".to_string(),
                "arn:aws:iam::1234".to_string(),
            )]),
            session_token_duration_secs: 900,
        },
    )
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_assume_role_granted_uses_group_timeout() {
    let sts = Arc::new(RecordingSts::default());
    let svc = service(Arc::clone(&sts));
    let user = user_with_groups(vec![group(&["arn:aws:iam::999:role/X"], 120)]);

    let creds = svc.assume_role(&user, "X", true).await.unwrap();

    assert_eq!(creds.session_token, "token-for-arn:aws:iam::999:role/X");
    assert_eq!(
        sts.assume_role_calls(),
        vec![AssumeRoleRequest {
            role_arn: "arn:aws:iam::999:role/X".to_string(),
            session_name: "alice".to_string(),
            duration_secs: 120,
        }]
    );
}

#[tokio::test]
async fn test_assume_role_several_granting_groups_last_timeout_wins() {
    let sts = Arc::new(RecordingSts::default());
    let svc = service(Arc::clone(&sts));
    let user = user_with_groups(vec![
        group(&["X"], 120),
        group(&["readonly"], 300),
        group(&["arn:aws:iam::999:role/X"], 900),
    ]);

    svc.assume_role(&user, "X", true).await.unwrap();

    let calls = sts.assume_role_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].duration_secs, 900);
}

#[tokio::test]
async fn test_assume_role_not_granted_never_calls_sts() {
    let sts = Arc::new(RecordingSts::default());
    let svc = service(Arc::clone(&sts));
    let user = user_with_groups(vec![group(&["arn:aws:iam::999:role/X"], 120)]);

    let err = svc.assume_role(&user, "Y", true).await.unwrap_err();

    assert!(matches!(err, CredentialError::Unauthorized { .. }));
    assert!(sts.assume_role_calls().is_empty());
}

#[tokio::test]
async fn test_assume_role_group_grants_are_normalized() {
    let sts = Arc::new(RecordingSts::default());
    let svc = service(Arc::clone(&sts));
    // Grants written in short forms still match the full ARN requested.
    let user = user_with_groups(vec![
        group(&["X"], 300),
        group(&["prod/deploy"], 600),
    ]);

    svc.assume_role(&user, "arn:aws:iam::999:role/X", true).await.unwrap();
    svc.assume_role(&user, "prod/deploy", true).await.unwrap();

    let calls = sts.assume_role_calls();
    assert_eq!(calls[0].duration_secs, 300);
    assert_eq!(calls[1].role_arn, "arn:aws:iam::1234:role/deploy");
    assert_eq!(calls[1].duration_secs, 600);
}

#[tokio::test]
async fn test_assume_role_without_enforcement_uses_default_duration() {
    let sts = Arc::new(RecordingSts::default());
    let svc = service(Arc::clone(&sts));
    let user = user_with_groups(Vec::new());

    svc.assume_role(&user, "anything", false).await.unwrap();

    let calls = sts.assume_role_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].role_arn, "arn:aws:iam::999:role/anything");
    assert_eq!(calls[0].duration_secs, 3600);
}

#[tokio::test]
async fn test_assume_role_sts_error_forwarded() {
    let sts = Arc::new(RecordingSts {
        fail_with: Some("AccessDenied: trust policy".to_string()),
        ..RecordingSts::default()
    });
    let svc = service(Arc::clone(&sts));
    let user = user_with_groups(Vec::new());

    let err = svc.assume_role(&user, "X", false).await.unwrap_err();
    assert_eq!(err.to_string(), "AccessDenied: trust policy");
}

#[tokio::test]
async fn test_get_session_token_ignores_grants_and_uses_configured_duration() {
    let sts = Arc::new(RecordingSts::default());
    let svc = service(Arc::clone(&sts));
    let user = user_with_groups(Vec::new());

    let creds = svc.get_session_token(&user).await.unwrap();

    assert_eq!(creds.session_token, "session-token");
    assert_eq!(*sts.session_token_calls.lock().unwrap(), vec![900]);
    assert!(sts.assume_role_calls().is_empty());
}
