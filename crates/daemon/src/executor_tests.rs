use super::*;
use chrono::Utc;
use std::time::Duration;

fn shell(command: &str) -> ShellExecutor {
    ShellExecutor::new(&ExecutorConfig {
        command: command.to_string(),
        timeout: Duration::from_secs(5),
    })
}

fn job() -> BuildJobQueueItem {
    let mut job = BuildJobQueueItem::new("job-42", 7, 3, Utc::now());
    job.commit_hash = Some("abc123".to_string());
    job
}

#[tokio::test]
async fn exports_the_job_to_the_command() {
    let executor = shell("echo $BQ_JOB_ID $BQ_PARTICIPATION_ID $BQ_COURSE_ID $BQ_COMMIT_HASH");
    let result = executor.execute(&job()).await.unwrap();

    assert!(result.successful);
    assert_eq!(result.logs, vec!["job-42 7 3 abc123".to_string()]);
    assert_eq!(result.commit_hash.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn docker_image_is_exported_when_set() {
    let executor = shell("echo image=$BQ_DOCKER_IMAGE");
    let result = executor
        .execute(&job().with_docker_image("rust:1.80"))
        .await
        .unwrap();
    assert_eq!(result.logs, vec!["image=rust:1.80".to_string()]);
}

#[tokio::test]
async fn nonzero_exit_is_a_failed_build() {
    let executor = shell("echo compiling; echo 'error[E0308]' >&2; exit 101");
    let result = executor.execute(&job()).await.unwrap();

    assert!(!result.successful);
    assert_eq!(
        result.logs,
        vec!["compiling".to_string(), "error[E0308]".to_string()]
    );
}

#[tokio::test]
async fn runs_in_the_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("build.sh"), "echo from-script\n").unwrap();

    let executor = shell("sh ./build.sh").in_dir(dir.path());
    let result = executor.execute(&job()).await.unwrap();
    assert_eq!(result.logs, vec!["from-script".to_string()]);
}

#[tokio::test]
async fn missing_directory_is_a_spawn_error() {
    let executor = shell("true").in_dir("/nonexistent/bq-build-dir");
    let err = executor.execute(&job()).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Spawn(_)));
}

#[tokio::test]
async fn killed_command_is_a_crash() {
    let executor = shell("kill -9 $$");
    let err = executor.execute(&job()).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Crashed(_)));
}
