use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};

pub(super) fn run_collaborator(program: &str, args: &[String], request: &str) -> Result<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program} with args: {args:?}"))?;

    // stdout is drained while the request is still being written.
    let writer = child.stdin.take().map(|mut stdin| {
        let request = request.as_bytes().to_vec();
        thread::spawn(move || match stdin.write_all(&request) {
            Err(error) if error.kind() == ErrorKind::BrokenPipe => Ok(()),
            result => result,
        })
    });

    let output = child
        .wait_with_output()
        .with_context(|| format!("failed to wait for {program}"))?;

    if let Some(writer) = writer {
        writer
            .join()
            .map_err(|_| anyhow!("request writer for {program} panicked"))?
            .with_context(|| format!("failed to write request to {program}"))?;
    }

    if output.status.success() {
        String::from_utf8(output.stdout).with_context(|| format!("{program} output was not valid UTF-8"))
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow!("{program} failed with {}: {stderr}", output.status))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const LARGE: usize = 256 * 1024;

    fn shell(script: &str) -> Vec<String> {
        vec!["-c".to_owned(), script.to_owned()]
    }

    #[test]
    fn chatty_collaborator_gets_its_whole_request() {
        let request = "r".repeat(LARGE);
        let script = format!("head -c {LARGE} /dev/zero | tr '\\0' x; wc -c");
        let output = run_collaborator("sh", &shell(&script), &request).expect("collaborator output");

        let (reply, count) = output.split_at(LARGE);
        assert!(reply.bytes().all(|byte| byte == b'x'));
        assert_eq!(count.trim(), LARGE.to_string());
    }

    #[test]
    fn collaborator_may_ignore_its_input() {
        let request = "r".repeat(LARGE);
        let output = run_collaborator("sh", &shell("echo ready"), &request).expect("collaborator output");
        assert_eq!(output.trim(), "ready");
    }

    #[test]
    fn failing_collaborator_reports_stderr() {
        let error = run_collaborator("sh", &shell("echo broken >&2; exit 3"), "{}")
            .expect_err("non-zero exit");
        assert!(format!("{error:#}").contains("broken"));
    }
}
