//! Real-PTY exercise of `PtyProcess`: spawn, read, write, resize, terminate,
//! against short-lived `/bin/sh`/`/bin/cat` children.

use std::time::Duration;

use wt_session::pty::PtyProcess;

#[tokio::test]
async fn spawn_echo_and_read_output() {
    let pty = PtyProcess::spawn(
        "/bin/sh",
        &["-c".to_string(), "echo hello-pty".to_string()],
        &[],
        80,
        24,
    )
    .expect("spawn");

    let mut collected = Vec::new();
    for _ in 0..50 {
        if let Some(chunk) = tokio::time::timeout(Duration::from_millis(200), pty.read_next())
            .await
            .ok()
            .flatten()
        {
            collected.extend_from_slice(&chunk);
        }
        if !pty.is_alive() && collected.windows(9).any(|w| w == b"hello-pty") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&collected);
    assert!(text.contains("hello-pty"), "got: {text:?}");
}

#[tokio::test]
async fn write_echoes_back_through_a_cat_child() {
    let pty = PtyProcess::spawn("/bin/cat", &[], &[], 80, 24).expect("spawn");
    pty.write(b"pty_write_test_data\n").await;

    let mut collected = Vec::new();
    for _ in 0..50 {
        if let Some(chunk) = tokio::time::timeout(Duration::from_millis(100), pty.read_next())
            .await
            .ok()
            .flatten()
        {
            collected.extend_from_slice(&chunk);
        }
        if collected.windows(19).any(|w| w == b"pty_write_test_data") {
            break;
        }
    }
    let text = String::from_utf8_lossy(&collected);
    assert!(text.contains("pty_write_test_data"), "got: {text:?}");
    pty.terminate().await;
}

#[tokio::test]
async fn environment_variables_reach_the_child() {
    let pty = PtyProcess::spawn(
        "/bin/sh",
        &["-c".to_string(), "echo MY_TEST_VAR=$MY_TEST_VAR".to_string()],
        &[("MY_TEST_VAR".to_string(), "hello_from_env".to_string())],
        80,
        24,
    )
    .expect("spawn");

    let mut collected = Vec::new();
    for _ in 0..50 {
        if let Some(chunk) = tokio::time::timeout(Duration::from_millis(100), pty.read_next())
            .await
            .ok()
            .flatten()
        {
            collected.extend_from_slice(&chunk);
        }
        if !pty.is_alive() {
            break;
        }
    }
    let text = String::from_utf8_lossy(&collected);
    assert!(
        text.contains("MY_TEST_VAR=hello_from_env"),
        "got: {text:?}"
    );
}

#[tokio::test]
async fn exit_code_is_captured_after_reap() {
    let pty = PtyProcess::spawn(
        "/bin/sh",
        &["-c".to_string(), "exit 42".to_string()],
        &[],
        80,
        24,
    )
    .expect("spawn");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline && pty.is_alive() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!pty.is_alive());
    assert_eq!(pty.exit_status(), Some(42));
}

#[tokio::test]
async fn resize_after_exit_does_not_panic() {
    let pty = PtyProcess::spawn("/bin/sh", &["-c".to_string(), "true".to_string()], &[], 80, 24)
        .expect("spawn");
    pty.terminate().await;
    pty.resize(120, 40);
}

#[tokio::test]
async fn terminate_is_idempotent() {
    let pty = PtyProcess::spawn("/bin/sh", &["-c".to_string(), "sleep 5".to_string()], &[], 80, 24)
        .expect("spawn");
    pty.terminate().await;
    assert!(!pty.is_alive());
    pty.terminate().await;
    assert!(!pty.is_alive());
}

#[tokio::test]
async fn write_to_dead_process_is_dropped_silently() {
    let pty = PtyProcess::spawn("/bin/sh", &["-c".to_string(), "true".to_string()], &[], 80, 24)
        .expect("spawn");
    pty.terminate().await;
    pty.write(b"echo still alive\n").await;
}

#[tokio::test]
async fn spawning_a_nonexistent_binary_fails() {
    let result = PtyProcess::spawn("/nonexistent/binary/path", &[], &[], 80, 24);
    assert!(result.is_err());
}
