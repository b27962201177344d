//! CLI integration test for `docbench serve`.
//!
//! Starts the real binary, fetches a file over a raw HTTP/1.1 connection,
//! then sends SIGINT and expects a clean zero exit.

#![cfg(unix)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use docbench_test_utils::ViewerFixture;

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn fetch(port: u16, path: &str) -> Result<String> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut stream = loop {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => break stream,
            Err(_) if Instant::now() < deadline => sleep(Duration::from_millis(50)),
            Err(err) => bail!("server never accepted connections: {err}"),
        }
    };
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )?;
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    Ok(response)
}

#[test]
fn given_viewer_root_when_serving_then_files_have_types_and_sigint_exits_zero() -> Result<()> {
    let fixture = ViewerFixture::with_sample_files()?;
    let port = free_port()?;

    let mut child = Command::new(env!("CARGO_BIN_EXE_docbench"))
        .args(["serve", "--port", &port.to_string()])
        .arg("--root")
        .arg(fixture.root())
        .current_dir(fixture.root())
        .env("HOME", fixture.root())
        .env_remove("DOCBENCH_CONFIG_FILE")
        .env_remove("DOCBENCH_HOST")
        .stdout(Stdio::piped())
        .spawn()
        .context("failed to start docbench serve")?;

    let found = fetch(port, "/app.mjs");
    let missing = fetch(port, "/missing.txt");

    // SAFETY: `child.id()` is the pid of a process this test spawned and has not reaped.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(rc, 0, "failed to signal server");
    let output = child.wait_with_output()?;

    let found = found?;
    assert!(found.starts_with("HTTP/1.1 200 OK"), "response: {found}");
    assert!(found.contains("content-type: application/javascript"));
    assert!(found.contains("access-control-allow-origin: *"));
    assert!(found.ends_with("x=1;\n"));

    let missing = missing?;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "response: {missing}");
    assert!(missing.contains("access-control-allow-origin: *"));

    assert!(output.status.success(), "server should exit 0: {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&format!("Server running at: http://localhost:{port}")));
    assert!(stdout.contains("Press Ctrl+C to stop the server"));
    assert!(stdout.contains("Server stopped."));
    Ok(())
}
