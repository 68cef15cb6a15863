use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pageforge_core::contract::TaskReport;
use pageforge_core::notify::{deliver, BackoffPolicy};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn report() -> TaskReport {
    TaskReport {
        email: "dev@example.com".to_string(),
        task: "demo/app".to_string(),
        round: 1,
        nonce: "abc123".to_string(),
        repo_url: "https://github.com/octo/demo-app".to_string(),
        commit_sha: "0123456789abcdef0123456789abcdef01234567".to_string(),
        pages_url: "https://octo.github.io/demo-app/".to_string(),
    }
}

fn quick_policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy {
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 2,
        jitter_factor: 0.0,
    }
}

/// Consume one HTTP request from the socket, honouring content-length so the
/// client never sees a reset, then answer with `status_line`.
async fn answer_request(socket: &mut TcpStream, status_line: &str) {
    let mut data = Vec::new();
    let mut buf = vec![0u8; 4096];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&data[..pos]);
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (key, value) = line.split_once(':')?;
                            if key.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if data.len() - pos - 4 >= content_length {
                        break;
                    }
                }
            }
        }
    }
    let response = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn spawn_callback_server(
    status_line: &'static str,
    connections: Arc<AtomicUsize>,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind callback listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            connections.fetch_add(1, Ordering::SeqCst);
            answer_request(&mut socket, status_line).await;
        }
    });
    format!("http://{addr}/hook")
}

#[test]
fn delay_grows_exponentially_and_caps() {
    let policy = BackoffPolicy {
        max_attempts: 5,
        base_delay_ms: 100,
        max_delay_ms: 500,
        jitter_factor: 0.0,
    };
    assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for(3), Duration::from_millis(500));
    assert_eq!(policy.delay_for(4), Duration::from_millis(500));
}

#[test]
fn jitter_stays_within_the_configured_factor() {
    let policy = BackoffPolicy {
        max_attempts: 3,
        base_delay_ms: 200,
        max_delay_ms: 10_000,
        jitter_factor: 0.5,
    };
    for _ in 0..50 {
        let delay = policy.delay_for(0).as_millis();
        assert!((200..=300).contains(&delay), "delay {delay} out of bounds");
    }
}

#[tokio::test]
async fn unreachable_callback_returns_note_after_exhausting_attempts() {
    let client = reqwest::Client::new();
    // Port 1 is never listening; connection is refused immediately.
    let outcome = deliver(
        &client,
        "http://127.0.0.1:1/hook",
        &report(),
        &quick_policy(2),
    )
    .await;

    assert!(!outcome.delivered);
    let note = outcome.note.expect("failed delivery must carry a note");
    assert!(note.contains("2 attempts"), "note was: {note}");
}

#[tokio::test]
async fn successful_delivery_reports_no_note() {
    let connections = Arc::new(AtomicUsize::new(0));
    let url = spawn_callback_server("HTTP/1.1 200 OK", Arc::clone(&connections)).await;

    let client = reqwest::Client::new();
    let outcome = deliver(&client, &url, &report(), &quick_policy(3)).await;

    assert!(outcome.delivered);
    assert!(outcome.note.is_none());
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_success_status_is_retried_until_attempts_run_out() {
    let connections = Arc::new(AtomicUsize::new(0));
    let url =
        spawn_callback_server("HTTP/1.1 500 Internal Server Error", Arc::clone(&connections)).await;

    let client = reqwest::Client::new();
    let outcome = deliver(&client, &url, &report(), &quick_policy(3)).await;

    assert!(!outcome.delivered);
    assert!(outcome
        .note
        .as_deref()
        .expect("note expected")
        .contains("500"));
    assert_eq!(connections.load(Ordering::SeqCst), 3, "every attempt should hit the callback");
}
