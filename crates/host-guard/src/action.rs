//! 호스트 교정 액션
//!
//! [`Step`]은 교정 단계 하나(명령 실행, 줄 추가, 파일 쓰기)를 정의하고,
//! [`HostAction`]은 단계 목록을 순서대로 실행하는 [`Action`] 구현입니다.
//! 모든 단계는 이미 기대 상태인 시스템에서 다시 실행해도 안전합니다.

use std::fmt;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::info;

use bulwark_core::error::ActionError;
use bulwark_core::fact::{Action, Descriptor};
use bulwark_core::types::ActionOutcome;

use crate::command::{CommandRunner, run_checked};
use crate::error::HostGuardError;
use crate::probe::read_optional;

/// 교정 단계 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 프로그램 실행 (셸 없이)
    Run {
        /// 프로그램
        program: String,
        /// 인자
        args: Vec<String>,
        /// 성공으로 간주할 추가 종료 코드 (예: 이미 존재함)
        tolerated: Vec<i32>,
    },
    /// 파일에 줄이 없으면 추가 (파일이 없으면 생성)
    AppendLine {
        /// 대상 파일
        path: String,
        /// 추가할 줄
        line: String,
    },
    /// 파일 내용을 통째로 씀 (상위 디렉토리 생성)
    WriteFile {
        /// 대상 파일
        path: String,
        /// 내용
        content: String,
    },
}

impl Step {
    /// 명령 실행 단계를 생성합니다.
    pub fn run(program: &str, args: &[&str]) -> Self {
        Self::Run {
            program: program.to_owned(),
            args: args.iter().map(|s| (*s).to_owned()).collect(),
            tolerated: Vec::new(),
        }
    }

    /// 성공으로 간주할 종료 코드를 추가합니다.
    pub fn tolerate(mut self, code: i32) -> Self {
        if let Self::Run { tolerated, .. } = &mut self {
            tolerated.push(code);
        }
        self
    }

    async fn execute<R: CommandRunner>(&self, runner: &R) -> Result<(), HostGuardError> {
        match self {
            Self::Run {
                program,
                args,
                tolerated,
            } => {
                run_checked(runner, program, args, tolerated).await?;
                Ok(())
            }
            Self::AppendLine { path, line } => append_line(path, line).await,
            Self::WriteFile { path, content } => write_file(path, content).await,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run { program, args, .. } => {
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Self::AppendLine { path, line } => write!(f, "append '{line}' to {path}"),
            Self::WriteFile { path, .. } => write!(f, "write {path}"),
        }
    }
}

async fn append_line(path: &str, line: &str) -> Result<(), HostGuardError> {
    let existing = read_optional(path).await?;
    if existing
        .as_deref()
        .is_some_and(|content| content.lines().any(|l| l.trim() == line))
    {
        return Ok(());
    }
    let needs_newline = existing
        .as_deref()
        .is_some_and(|content| !content.is_empty() && !content.ends_with('\n'));

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| HostGuardError::io(path, &e))?;
    let mut data = String::new();
    if needs_newline {
        data.push('\n');
    }
    data.push_str(line);
    data.push('\n');
    file.write_all(data.as_bytes())
        .await
        .map_err(|e| HostGuardError::io(path, &e))?;
    file.flush().await.map_err(|e| HostGuardError::io(path, &e))
}

async fn write_file(path: &str, content: &str) -> Result<(), HostGuardError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HostGuardError::io(parent.display().to_string(), &e))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| HostGuardError::io(path, &e))
}

/// 단계 목록을 순서대로 실행하는 호스트 액션
///
/// 한 단계가 실패하면 나머지 단계는 실행하지 않습니다.
pub struct HostAction<R> {
    steps: Vec<Step>,
    runner: Arc<R>,
}

impl<R: CommandRunner> HostAction<R> {
    /// 새 액션을 생성합니다.
    pub fn new(steps: Vec<Step>, runner: Arc<R>) -> Self {
        Self { steps, runner }
    }

    /// 단계 목록
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl<R: CommandRunner> Action for HostAction<R> {
    fn describe(&self) -> String {
        self.steps
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    async fn execute(&self, descriptor: &Descriptor) -> Result<ActionOutcome, ActionError> {
        for step in &self.steps {
            info!(fact = %descriptor.id, step = %step, "executing step");
            step.execute(self.runner.as_ref()).await?;
        }
        Ok(ActionOutcome::applied(self.describe()))
    }
}
