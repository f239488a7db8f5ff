//! Per-connection handler: the request state machine.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive a message
//!   2. `Ping` → answer, loop
//!   3. `AssumeRole` / `GetUserCredentials` → SSH challenge, then issue
//!   4. `AddSshKey` → password check, then directory modify
//!
//! The connection stays open after a request completes; the client
//! decides when to hang up.

use std::sync::Arc;

use hologram_credentials::CredentialService;
use hologram_directory::{Directory, Filter, ModifyRequest, SearchRequest};
use hologram_protocol::{CHALLENGE_LEN, Message, PingKind, ServerRequest};
use hologram_transport::Connection;
use hologram_users::{ChallengeSignature, User, UserCache, same_key_material};
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::HologramError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, U, K, D>(
    mut conn: C,
    state: Arc<ServerState<U, K, D>>,
) -> Result<(), HologramError>
where
    C: Connection,
    U: UserCache,
    K: CredentialService,
    D: Directory,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    loop {
        let msg = match conn.recv().await {
            Ok(msg) => msg,
            Err(e) if e.is_closed() => {
                tracing::debug!(%conn_id, "connection closed by peer");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let should_close = match msg {
            Message::Ping(PingKind::Request) => {
                state.stats.counter("messages.ping", 1);
                conn.send(&Message::Ping(PingKind::Response)).await?;
                false
            }
            Message::ServerRequest(request) => {
                handle_server_request(&mut conn, &state, request).await?
            }
            other => {
                tracing::debug!(%conn_id, kind = other.kind(), "ignoring unexpected message");
                false
            }
        };

        if should_close {
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    Ok(())
}

/// Dispatches one request. Returns `true` if the connection should close.
async fn handle_server_request<C, U, K, D>(
    conn: &mut C,
    state: &ServerState<U, K, D>,
    request: ServerRequest,
) -> Result<bool, HologramError>
where
    C: Connection,
    U: UserCache,
    K: CredentialService,
    D: Directory,
{
    match request {
        ServerRequest::AssumeRole { role } => {
            state.stats.counter("messages.assumeRole", 1);
            let Some(user) = ssh_challenge(conn, state).await? else {
                return Ok(true);
            };
            assume_role(conn, state, &user, &role).await?;
            Ok(false)
        }
        ServerRequest::GetUserCredentials => {
            state.stats.counter("messages.getUserCredentials", 1);
            let Some(user) = ssh_challenge(conn, state).await? else {
                return Ok(true);
            };
            get_user_credentials(conn, state, &user).await
        }
        ServerRequest::AddSshKey {
            username,
            password_hash,
            ssh_public_key,
        } => {
            state.stats.counter("messages.addSSHKey", 1);
            add_ssh_key(conn, state, &username, &password_hash, &ssh_public_key).await?;
            Ok(false)
        }
        ServerRequest::ChallengeResponse { .. } => {
            tracing::debug!(conn_id = %conn.id(), "challenge response without a challenge");
            Ok(false)
        }
    }
}

fn fresh_challenge() -> Vec<u8> {
    let mut challenge = vec![0u8; CHALLENGE_LEN];
    rand::rng().fill(&mut challenge[..]);
    challenge
}

/// Runs the challenge sub-protocol until a key verifies.
///
/// Returns `None` when the connection should be dropped: the client sent
/// something other than a `ChallengeResponse`, or ran out of attempts.
async fn ssh_challenge<C, U, K, D>(
    conn: &mut C,
    state: &ServerState<U, K, D>,
) -> Result<Option<Arc<User>>, HologramError>
where
    C: Connection,
    U: UserCache,
{
    let conn_id = conn.id();
    let mut attempts: u32 = 0;

    loop {
        if let Some(max) = state.config.max_challenge_attempts {
            if attempts >= max {
                tracing::info!(%conn_id, attempts, "too many failed verification attempts");
                conn.send(&Message::error("Too many failed verification attempts"))
                    .await?;
                return Ok(None);
            }
        }
        attempts += 1;

        let challenge = fresh_challenge();
        conn.send(&Message::challenge(challenge.clone())).await?;

        let signature = match conn.recv().await? {
            Message::ServerRequest(ServerRequest::ChallengeResponse { format, signature }) => {
                ChallengeSignature::new(format, signature)
            }
            other => {
                tracing::debug!(%conn_id, kind = other.kind(), "expected ChallengeResponse");
                return Ok(None);
            }
        };

        match state.users.authenticate(&challenge, &signature).await? {
            Some(user) => {
                tracing::info!(%conn_id, username = %user.username, "user verified");
                return Ok(Some(user));
            }
            None => {
                tracing::debug!(%conn_id, attempts, "signature did not match any user");
                state.stats.counter("errors.verification", 1);
                conn.send(&Message::verification_failure()).await?;
            }
        }
    }
}

async fn assume_role<C, U, K, D>(
    conn: &mut C,
    state: &ServerState<U, K, D>,
    user: &User,
    role: &str,
) -> Result<(), HologramError>
where
    C: Connection,
    K: CredentialService,
{
    let conn_id = conn.id();
    let enforce = state.config.enable_directory_roles;

    let err = match state.credentials.assume_role(user, role, enforce).await {
        Ok(creds) => {
            tracing::info!(%conn_id, username = %user.username, role, "issued credentials");
            conn.send(&Message::credentials(creds.into())).await?;
            return Ok(());
        }
        Err(e) => e,
    };

    state.stats.counter("errors.assumeRole", 1);
    tracing::warn!(%conn_id, username = %user.username, role, error = %err, "assume role failed");
    conn.send(&Message::error(err.to_string())).await?;

    if role == user.default_role {
        return Ok(());
    }

    match state
        .credentials
        .assume_role(user, &user.default_role, enforce)
        .await
    {
        Ok(creds) => {
            tracing::info!(
                %conn_id,
                username = %user.username,
                role = %user.default_role,
                "issued default role credentials"
            );
            conn.send(&Message::credentials(creds.into())).await?;
        }
        Err(e) => {
            tracing::debug!(%conn_id, username = %user.username, error = %e, "default role failed too");
        }
    }
    Ok(())
}

/// Issues credentials for the user's default role. On failure the cache is
/// refreshed once and the user re-resolved, in case access was granted
/// after the last refresh. Returns `true` if the connection should close.
async fn get_user_credentials<C, U, K, D>(
    conn: &mut C,
    state: &ServerState<U, K, D>,
    user: &User,
) -> Result<bool, HologramError>
where
    C: Connection,
    U: UserCache,
    K: CredentialService,
{
    let conn_id = conn.id();
    let enforce = state.config.enable_directory_roles;

    match state
        .credentials
        .assume_role(user, &user.default_role, enforce)
        .await
    {
        Ok(creds) => {
            tracing::info!(%conn_id, username = %user.username, "issued user credentials");
            conn.send(&Message::credentials(creds.into())).await?;
            return Ok(false);
        }
        Err(e) => {
            tracing::info!(
                %conn_id,
                username = %user.username,
                error = %e,
                "user credentials failed, refreshing cache and retrying"
            );
        }
    }

    if let Err(e) = state.users.refresh().await {
        tracing::error!(%conn_id, error = %e, "user cache refresh failed");
    }

    if let Some(fresh) = state.users.find_user(&user.username).await {
        match state
            .credentials
            .assume_role(&fresh, &fresh.default_role, enforce)
            .await
        {
            Ok(creds) => {
                tracing::info!(%conn_id, username = %fresh.username, "issued user credentials after refresh");
                conn.send(&Message::credentials(creds.into())).await?;
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!(%conn_id, username = %fresh.username, error = %e, "user credentials failed after refresh");
            }
        }
    }

    state.stats.counter("errors.getUserCredentials", 1);
    conn.send(&Message::error(format!(
        "Could not get user credentials. {} may not have been given access yet.",
        user.username
    )))
    .await?;
    Ok(true)
}

/// Registers a public key for a user authenticated by password hash.
async fn add_ssh_key<C, U, K, D>(
    conn: &mut C,
    state: &ServerState<U, K, D>,
    username: &str,
    password_hash: &str,
    ssh_public_key: &str,
) -> Result<(), HologramError>
where
    C: Connection,
    D: Directory,
{
    match store_ssh_key(state, username, password_hash, ssh_public_key).await {
        Ok(()) => conn.send(&Message::Success).await?,
        Err(text) => {
            state.stats.counter("errors.addSSHKey", 1);
            tracing::warn!(conn_id = %conn.id(), %username, error = %text, "add ssh key rejected");
            conn.send(&Message::error(text)).await?;
        }
    }
    Ok(())
}

/// Compares password hashes without an early exit on the first differing
/// byte. Length mismatches still return early.
fn password_matches(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// Returns the client-facing error text on failure.
async fn store_ssh_key<U, K, D: Directory>(
    state: &ServerState<U, K, D>,
    username: &str,
    password_hash: &str,
    ssh_public_key: &str,
) -> Result<(), String> {
    let schema = &state.config.schema;
    let request = SearchRequest::new(
        schema.base_dn.clone(),
        Filter::equality(schema.user_attr.clone(), username),
    )
    .attribute(schema.password_attr.clone())
    .attribute(schema.pub_keys_attr.clone());

    let entries = state
        .directory
        .search(&request)
        .await
        .map_err(|e| e.to_string())?;

    let Some(entry) = entries.into_iter().next() else {
        return Err(format!("User {username} not found"));
    };

    let stored = entry.attribute_value(&schema.password_attr);
    if !stored.is_some_and(|stored| password_matches(stored, password_hash)) {
        return Err("Invalid password".to_string());
    }

    let already_present = entry
        .attribute_values(&schema.pub_keys_attr)
        .iter()
        .any(|existing| same_key_material(existing, ssh_public_key));
    if already_present {
        tracing::debug!(%username, "key already registered");
        return Ok(());
    }

    let modify = ModifyRequest::new(entry.dn.clone())
        .add(schema.pub_keys_attr.clone(), vec![ssh_public_key.to_string()]);
    state
        .directory
        .modify(&modify)
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(%username, "registered new ssh key");
    Ok(())
}
