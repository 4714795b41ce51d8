//! 외부 명령 실행 추상화
//!
//! [`CommandRunner`] trait으로 명령 실행을 추상화하여 테스트에서
//! 목(mock) 구현을 주입할 수 있게 합니다.
//! 실제 구현인 [`SystemCommandRunner`]는 셸을 거치지 않고
//! `tokio::process::Command`로 프로그램을 직접 실행합니다.

use std::future::Future;

use tracing::debug;

use crate::error::HostGuardError;

/// 명령 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// 종료 코드 (시그널로 종료되면 -1)
    pub code: i32,
    /// 표준 출력
    pub stdout: String,
    /// 표준 에러 출력
    pub stderr: String,
}

impl CommandOutput {
    /// 정상 종료 여부
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// 명령 실행 trait
///
/// 종료 코드와 무관하게 프로세스가 실행되었다면 `Ok`를 반환해야 합니다.
/// 종료 코드 해석은 호출자의 몫입니다.
pub trait CommandRunner: Send + Sync + 'static {
    /// 프로그램을 인자와 함께 실행합니다.
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<CommandOutput, HostGuardError>> + Send;
}

/// 명령을 실행하고 허용된 종료 코드가 아니면 에러를 반환합니다.
///
/// `0`은 항상 허용됩니다.
pub async fn run_checked<R: CommandRunner>(
    runner: &R,
    program: &str,
    args: &[String],
    tolerated: &[i32],
) -> Result<CommandOutput, HostGuardError> {
    let output = runner.run(program, args).await?;
    if output.success() || tolerated.contains(&output.code) {
        Ok(output)
    } else {
        Err(HostGuardError::Exit {
            program: program.to_owned(),
            code: output.code,
            stderr: output.stderr.trim().to_owned(),
        })
    }
}

/// 문자열 슬라이스를 인자 벡터로 변환합니다.
pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// 실제 프로세스를 실행하는 명령 실행기
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, HostGuardError> {
        debug!(program, ?args, "running command");
        let output = tokio::process::Command::new(program)
            .args(args)
            .env("LC_ALL", "C")
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| HostGuardError::Spawn {
                program: program.to_owned(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8(output.stdout).map_err(|_| HostGuardError::NonUtf8 {
            program: program.to_owned(),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code().unwrap_or(-1);
        debug!(program, code, "command finished");
        Ok(CommandOutput {
            code,
            stdout,
            stderr,
        })
    }
}

// --- 테스트용 Mock ---
