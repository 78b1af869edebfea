use std::fmt;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use threadpool::ThreadPool;
use wait_timeout::ChildExt;

/// A command to execute for one instance.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub command: String,
    /// Wall clock budget; `None` waits for the process forever.
    pub limit: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Ok,
    Failed(Option<i32>),
    Timeout,
    Error(String),
}

impl RunStatus {
    pub fn is_ok(&self) -> bool {
        *self == RunStatus::Ok
    }

    fn from_exit(status: ExitStatus) -> Self {
        if status.success() {
            RunStatus::Ok
        } else {
            RunStatus::Failed(status.code())
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Ok => write!(f, "ok"),
            RunStatus::Failed(Some(code)) => write!(f, "failed({})", code),
            RunStatus::Failed(None) => write!(f, "failed(signal)"),
            RunStatus::Timeout => write!(f, "timeout"),
            RunStatus::Error(_) => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub name: String,
    pub status: RunStatus,
    pub elapsed: Duration,
}

impl RunReport {
    /// `name,status,seconds`
    pub fn to_line(&self) -> String {
        format!("{},{},{:.3}", self.name, self.status, self.elapsed.as_secs_f64())
    }
}

/// Runs `command` through `sh -c`, killing it once it outlives `limit`.
pub fn run_command(command: &str, limit: Option<Duration>) -> io::Result<RunStatus> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .spawn()?;

    let status = match limit {
        Some(limit) => match child.wait_timeout(limit)? {
            Some(status) => RunStatus::from_exit(status),
            None => {
                child.kill()?;
                child.wait()?;
                RunStatus::Timeout
            }
        },
        None => RunStatus::from_exit(child.wait()?),
    };
    Ok(status)
}

fn run_job(job: &Job) -> RunReport {
    let start = Instant::now();
    log::info!("starting {}: {}", job.name, job.command);
    let status = match run_command(&job.command, job.limit) {
        Ok(status) => status,
        Err(err) => {
            log::error!("{}: {}", job.name, err);
            RunStatus::Error(err.to_string())
        }
    };
    let elapsed = start.elapsed();
    log::info!("finished {} in {:.3}s: {}", job.name, elapsed.as_secs_f64(), status);
    RunReport {
        name: job.name.clone(),
        status,
        elapsed,
    }
}

/// Runs every job on `workers` threads. Reports come back in job order.
pub fn run_all(jobs: Vec<Job>, workers: usize) -> Vec<RunReport> {
    let pool = ThreadPool::new(workers.max(1));
    let (tx, rx) = channel();
    let names: Vec<String> = jobs.iter().map(|job| job.name.clone()).collect();

    for (index, job) in jobs.into_iter().enumerate() {
        let tx = tx.clone();
        pool.execute(move || {
            let report = run_job(&job);
            // the receiver outlives every worker
            let _ = tx.send((index, report));
        });
    }
    drop(tx);

    let mut reports: Vec<Option<RunReport>> = vec![None; names.len()];
    for (index, report) in rx.iter() {
        reports[index] = Some(report);
    }
    reports
        .into_iter()
        .zip(names)
        .map(|(report, name)| {
            report.unwrap_or_else(|| RunReport {
                name,
                status: RunStatus::Error("worker panicked".to_string()),
                elapsed: Duration::ZERO,
            })
        })
        .collect()
}

#[cfg(test)]
fn job(name: &str, command: &str, limit: Option<Duration>) -> Job {
    Job {
        name: name.to_string(),
        command: command.to_string(),
        limit,
    }
}

#[test]
fn test_exit_codes_are_reported() {
    assert_eq!(run_command("true", None).unwrap(), RunStatus::Ok);
    assert_eq!(run_command("exit 3", None).unwrap(), RunStatus::Failed(Some(3)));
}

#[test]
fn test_slow_command_is_killed() {
    let start = Instant::now();
    let status = run_command("sleep 5", Some(Duration::from_millis(200))).unwrap();
    assert_eq!(status, RunStatus::Timeout);
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_reports_keep_job_order() {
    let jobs = vec![
        job("slow", "sleep 0.3", None),
        job("fast", "true", None),
        job("bad", "exit 1", Some(Duration::from_secs(5))),
    ];
    let reports = run_all(jobs, 3);
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["slow", "fast", "bad"]);
    assert!(reports[0].status.is_ok());
    assert!(reports[1].status.is_ok());
    assert_eq!(reports[2].status, RunStatus::Failed(Some(1)));
    assert!(reports[2].to_line().starts_with("bad,failed(1),"));
}
