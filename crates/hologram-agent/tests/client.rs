//! Integration tests for `RemoteClient::request_over`, with a scripted
//! server on the other end of an in-memory duplex stream.

use hologram_agent::{AgentError, KeyringSigner, RemoteClient};
use hologram_protocol::{CHALLENGE_LEN, Message, ServerRequest, WireCredentials};
use hologram_transport::{Connection, MessageConnection};
use hologram_users::ChallengeSignature;
use ssh_key::PrivateKey;
use ssh_key::private::{Ed25519Keypair, KeypairData};
use tokio::io::DuplexStream;

fn keypair(seed: u8) -> PrivateKey {
    PrivateKey::new(KeypairData::Ed25519(Ed25519Keypair::from_seed(&[seed; 32])), "t").unwrap()
}

fn wire_credentials() -> WireCredentials {
    WireCredentials {
        access_key_id: "AKIDEXAMPLE".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: "token".to_string(),
        expiration: 4_000_000_000,
    }
}

fn pair() -> (MessageConnection<DuplexStream>, MessageConnection<DuplexStream>) {
    let (a, b) = tokio::io::duplex(4096);
    (MessageConnection::new(a), MessageConnection::new(b))
}

/// Reads a `ChallengeResponse` and returns it as a signature.
async fn expect_challenge_response(
    conn: &mut MessageConnection<DuplexStream>,
) -> ChallengeSignature {
    match conn.recv().await.unwrap() {
        Message::ServerRequest(ServerRequest::ChallengeResponse { format, signature }) => {
            ChallengeSignature::new(format, signature)
        }
        other => panic!("expected ChallengeResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_over_advances_to_next_key_after_verification_failure() {
    let first = keypair(1);
    let second = keypair(2);
    let client = RemoteClient::new(
        "unused:0",
        KeyringSigner::new(vec![first.clone(), second.clone()]),
    );
    let (mut client_conn, mut server_conn) = pair();

    let server = tokio::spawn(async move {
        let request = server_conn.recv().await.unwrap();
        assert_eq!(
            request,
            Message::ServerRequest(ServerRequest::AssumeRole { role: "admin".to_string() })
        );

        let challenge = vec![1u8; CHALLENGE_LEN];
        server_conn.send(&Message::challenge(challenge.clone())).await.unwrap();
        let sig = expect_challenge_response(&mut server_conn).await;
        assert!(sig.verify_with(first.public_key(), &challenge));
        server_conn.send(&Message::verification_failure()).await.unwrap();

        let challenge = vec![2u8; CHALLENGE_LEN];
        server_conn.send(&Message::challenge(challenge.clone())).await.unwrap();
        let sig = expect_challenge_response(&mut server_conn).await;
        assert!(sig.verify_with(second.public_key(), &challenge));
        server_conn.send(&Message::credentials(wire_credentials())).await.unwrap();
    });

    let creds = client
        .request_over(
            &mut client_conn,
            ServerRequest::AssumeRole { role: "admin".to_string() },
        )
        .await
        .unwrap();

    assert_eq!(creds.access_key_id, "AKIDEXAMPLE");
    assert_eq!(creds.expiration.timestamp(), 4_000_000_000);
    server.await.unwrap();
}

#[tokio::test]
async fn test_request_over_keyring_exhausted_fails_with_no_keys_worked() {
    let client = RemoteClient::new("unused:0", KeyringSigner::new(vec![keypair(1)]));
    let (mut client_conn, mut server_conn) = pair();

    let server = tokio::spawn(async move {
        server_conn.recv().await.unwrap();
        server_conn.send(&Message::challenge(vec![0; CHALLENGE_LEN])).await.unwrap();
        expect_challenge_response(&mut server_conn).await;
        server_conn.send(&Message::verification_failure()).await.unwrap();
        server_conn.send(&Message::challenge(vec![0; CHALLENGE_LEN])).await.unwrap();
    });

    let err = client
        .request_over(&mut client_conn, ServerRequest::GetUserCredentials)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::NoKeysWorked));
    server.await.unwrap();
}

#[tokio::test]
async fn test_request_over_server_error_forwarded() {
    let client = RemoteClient::new("unused:0", KeyringSigner::new(vec![keypair(1)]));
    let (mut client_conn, mut server_conn) = pair();

    let server = tokio::spawn(async move {
        server_conn.recv().await.unwrap();
        server_conn.send(&Message::challenge(vec![0; CHALLENGE_LEN])).await.unwrap();
        expect_challenge_response(&mut server_conn).await;
        server_conn
            .send(&Message::error("User alice is not authorized to assume role X!"))
            .await
            .unwrap();
    });

    let err = client
        .request_over(&mut client_conn, ServerRequest::AssumeRole { role: "X".to_string() })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "User alice is not authorized to assume role X!");
    server.await.unwrap();
}

#[tokio::test]
async fn test_request_over_unexpected_message_fails() {
    let client = RemoteClient::new("unused:0", KeyringSigner::new(vec![keypair(1)]));
    let (mut client_conn, mut server_conn) = pair();

    let server = tokio::spawn(async move {
        server_conn.recv().await.unwrap();
        server_conn.send(&Message::Success).await.unwrap();
    });

    let err = client
        .request_over(&mut client_conn, ServerRequest::GetUserCredentials)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::UnexpectedMessage(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_request_over_server_hangup_is_transport_error() {
    let client = RemoteClient::new("unused:0", KeyringSigner::new(vec![keypair(1)]));
    let (mut client_conn, server_conn) = pair();
    drop(server_conn);

    let err = client
        .request_over(&mut client_conn, ServerRequest::GetUserCredentials)
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Transport(_)));
}
