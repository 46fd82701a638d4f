//! Chain execution: sequencing, short-circuiting, `-exit`, stdio
//! wiring, shell fallback, cancellation and tree-kill.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use common::{count_in_file, init_tracing, spec_with_chain, wait_until};
use wgo::stdio::{InputSource, OutputSink};
use wgo::supervisor::Supervisor;

#[tokio::test(flavor = "multi_thread")]
async fn exit_mode_returns_cleanly_on_success() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec_with_chain(dir.path(), &[&["true"]]);
    spec.exit_when_done = true;

    let sup = Supervisor::new(spec, CancellationToken::new());
    sup.run().await.expect("clean exit");
}

#[tokio::test(flavor = "multi_thread")]
async fn exit_mode_surfaces_the_exit_status() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec_with_chain(dir.path(), &[&["sh", "-c", "exit 3"]]);
    spec.exit_when_done = true;

    let err = Supervisor::new(spec, CancellationToken::new())
        .run()
        .await
        .expect_err("failing command");
    assert!(err.to_string().contains("exit status 3"), "got: {err:#}");
}

#[tokio::test(flavor = "multi_thread")]
async fn chain_commands_run_in_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let one = format!("echo one >> {}", out.display());
    let two = format!("echo two >> {}", out.display());
    let mut spec = spec_with_chain(dir.path(), &[&["sh", "-c", &one], &["sh", "-c", &two]]);
    spec.exit_when_done = true;

    Supervisor::new(spec, CancellationToken::new())
        .run()
        .await
        .expect("chain");
    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents, "one\ntwo\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn chain_short_circuits_on_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let never = format!("echo never >> {}", out.display());
    let spec = spec_with_chain(dir.path(), &[&["false"], &["sh", "-c", &never]]);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Supervisor::new(spec, cancel.clone()).run());

    // The instance suspends after the failure instead of continuing.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count_in_file(&out, "never"), 0);

    cancel.cancel();
    handle.await.unwrap().expect("cancelled cleanly");
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_program_falls_back_to_the_shell() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec_with_chain(dir.path(), &[&["wgo-test-no-such-program"]]);
    spec.exit_when_done = true;

    // The shell reports "command not found" as 127; seeing that status
    // proves the argv was rewritten through `sh -c` instead of failing
    // to spawn.
    let err = Supervisor::new(spec, CancellationToken::new())
        .run()
        .await
        .expect_err("command not found");
    assert!(err.to_string().contains("exit status 127"), "got: {err:#}");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_tree_kills_the_running_child() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // A unique sleep duration makes the grandchild findable with pgrep.
    let marker = format!("30.{}", std::process::id());
    let script = format!("sleep {marker}");
    let spec = spec_with_chain(dir.path(), &[&["sh", "-c", &script]]);

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(Supervisor::new(spec, cancel.clone()).run());
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    cancel.cancel();
    handle.await.unwrap().expect("cancelled cleanly");
    assert!(started.elapsed() < Duration::from_secs(5), "kill was not prompt");

    // No descendant of the killed sh may survive.
    tokio::time::sleep(Duration::from_millis(200)).await;
    if let Ok(output) = std::process::Command::new("pgrep").args(["-f", &marker]).output() {
        if output.status.code() == Some(0) {
            let survivors = String::from_utf8_lossy(&output.stdout).trim().to_string();
            panic!("grandchildren survived tree-kill: {survivors}");
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn captured_stdout_sees_child_output() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec_with_chain(dir.path(), &[&["echo", "hello"]]);
    spec.exit_when_done = true;

    let (sink, buf) = OutputSink::capture();
    Supervisor::new(spec, CancellationToken::new())
        .with_stdout(sink)
        .run()
        .await
        .expect("echo");
    assert!(
        wait_until(
            || String::from_utf8_lossy(&buf.lock().unwrap()).contains("hello"),
            Duration::from_secs(2),
        )
        .await,
        "stdout was not captured"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn stdin_bytes_reach_the_last_command() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec_with_chain(dir.path(), &[&["cat"]]);
    spec.exit_when_done = true;
    spec.enable_stdin = true;

    let (sink, buf) = OutputSink::capture();
    Supervisor::new(spec, CancellationToken::new())
        .with_stdin(InputSource::Bytes(Arc::new(b"over the wire".to_vec())))
        .with_stdout(sink)
        .run()
        .await
        .expect("cat");
    assert!(
        wait_until(
            || String::from_utf8_lossy(&buf.lock().unwrap()).contains("over the wire"),
            Duration::from_secs(2),
        )
        .await,
        "stdin bytes did not round-trip"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn env_entries_replace_the_child_environment() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut spec = spec_with_chain(dir.path(), &[&["/bin/sh", "-c", "echo FOO=$FOO HOME=$HOME"]]);
    spec.exit_when_done = true;
    spec.env = vec!["FOO=green".to_string()];

    let (sink, buf) = OutputSink::capture();
    Supervisor::new(spec, CancellationToken::new())
        .with_stdout(sink)
        .run()
        .await
        .expect("env probe");
    assert!(
        wait_until(
            || String::from_utf8_lossy(&buf.lock().unwrap()).contains("FOO=green HOME="),
            Duration::from_secs(2),
        )
        .await,
        "environment was not replaced"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn cwd_override_applies_to_children() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().join("inner");
    std::fs::create_dir(&workdir).unwrap();

    let mut spec = spec_with_chain(dir.path(), &[&["/bin/sh", "-c", "pwd"]]);
    spec.exit_when_done = true;
    spec.cwd_override = Some(workdir.clone());

    let (sink, buf) = OutputSink::capture();
    Supervisor::new(spec, CancellationToken::new())
        .with_stdout(sink)
        .run()
        .await
        .expect("pwd");
    let expected = workdir.canonicalize().unwrap().display().to_string();
    assert!(
        wait_until(
            || String::from_utf8_lossy(&buf.lock().unwrap()).contains(&expected),
            Duration::from_secs(2),
        )
        .await,
        "child did not run in the override directory"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_instances_are_independent() {
    init_tracing();
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let out_b = dir_b.path().join("out.txt");

    // Instance A exits immediately with an error; instance B keeps
    // supervising until cancelled.
    let mut spec_a = spec_with_chain(dir_a.path(), &[&["false"]]);
    spec_a.exit_when_done = true;
    let tick = format!("echo tick >> {}", out_b.display());
    let spec_b = spec_with_chain(dir_b.path(), &[&["sh", "-c", &tick]]);

    let cancel = CancellationToken::new();
    let mut set = JoinSet::new();
    set.spawn(Supervisor::new(spec_a, cancel.child_token()).run());
    set.spawn(Supervisor::new(spec_b, cancel.child_token()).run());

    // A's failure arrives first and must not disturb B.
    let first = set.join_next().await.unwrap().unwrap();
    assert!(first.is_err(), "instance A should fail");
    assert!(
        wait_until(|| count_in_file(&out_b, "tick") >= 1, Duration::from_secs(5)).await,
        "instance B never ran"
    );

    cancel.cancel();
    let second = set.join_next().await.unwrap().unwrap();
    assert!(second.is_ok(), "instance B should exit cleanly: {second:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn parsed_spec_runs_end_to_end() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let tick = format!("echo tick >> {}", out.display());

    let args: Vec<String> = ["wgo", "-exit", "sh", "-c", tick.as_str()]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut specs = wgo::cli::parse_commands(&args).unwrap();
    assert_eq!(specs.len(), 1);
    let mut spec = specs.remove(0);
    spec.roots = vec![dir.path().to_path_buf()];

    Supervisor::new(spec, CancellationToken::new())
        .run()
        .await
        .expect("parsed spec");
    assert_eq!(count_in_file(&out, "tick"), 1);
}
