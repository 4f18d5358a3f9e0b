use crate::core::error::{AppError, AppResult};
use std::io;
use std::process::{Command, Output};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

/// 日志中最多输出的行数/字符数
pub const MAX_LOG_OUTPUT: usize = 6000;

/// 子进程的原始输出
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    /// 被信号终止时为 None
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RawOutput {
    pub fn from_output(output: Output) -> Self {
        RawOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// 命令执行结果
///
/// 成功时是按行切分的 stdout，失败时是未切分的整段 stderr，两者都会交给同一个 JSON 解码器。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Lines(Vec<String>),
    Failure(String),
}

impl CommandOutput {
    /// 以行的形式访问输出
    pub fn lines(&self) -> Vec<&str> {
        match self {
            CommandOutput::Lines(lines) => lines.iter().map(String::as_str).collect(),
            CommandOutput::Failure(text) => text.lines().collect(),
        }
    }

    /// 合并为一段文本
    pub fn into_text(self) -> String {
        match self {
            CommandOutput::Lines(lines) => lines.join("\n"),
            CommandOutput::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CommandOutput::Failure(_))
    }
}

/// 启动子进程的抽象，便于在测试中注入预设输出
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> io::Result<RawOutput>;
}

/// 基于 `std::process::Command` 的实现
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<RawOutput> {
        let mut command = Command::new(program);
        command.args(args);

        #[cfg(target_os = "windows")]
        command.creation_flags(0x08000000); // CREATE_NO_WINDOW

        command.output().map(RawOutput::from_output)
    }
}

/// 命令执行器
pub struct CommandExecutor<R = SystemRunner> {
    runner: R,
}

impl CommandExecutor<SystemRunner> {
    pub fn new() -> Self {
        CommandExecutor {
            runner: SystemRunner,
        }
    }
}

impl Default for CommandExecutor<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> CommandExecutor<R> {
    pub fn with_runner(runner: R) -> Self {
        CommandExecutor { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// 同步执行命令并等待结束
    ///
    /// `command` 按空白切分，`args` 原样追加（不做 shell 转义，调用方不要传需要引号的参数）。
    /// 退出码为 0 时返回按行切分的 stdout，否则返回 stderr 原文。
    /// 无法启动进程或输出不是 UTF-8 时返回错误。
    pub fn execute<S: AsRef<str>>(&self, command: &str, args: &[S]) -> AppResult<CommandOutput> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| AppError::Config {
            reason: "命令为空".to_string(),
        })?;
        let argv: Vec<String> = parts
            .map(str::to_string)
            .chain(args.iter().map(|arg| arg.as_ref().to_string()))
            .collect();

        let cmdline = std::iter::once(program.to_string())
            .chain(argv.iter().cloned())
            .collect::<Vec<_>>();
        tracing::debug!(command = ?cmdline, "执行命令");

        let raw = self
            .runner
            .run(program, &argv)
            .map_err(|source| AppError::Spawn {
                command: cmdline.join(" "),
                source,
            })?;

        let output = if raw.success() {
            let stdout = String::from_utf8(raw.stdout)?;
            CommandOutput::Lines(stdout.lines().map(str::to_string).collect())
        } else {
            tracing::debug!(exit_code = ?raw.exit_code, "命令退出码非 0");
            CommandOutput::Failure(String::from_utf8(raw.stderr)?)
        };

        log_output(&output);
        Ok(output)
    }
}

fn log_output(output: &CommandOutput) {
    let (shown, truncated) = truncated_view(output);
    tracing::debug!(output = %shown, "命令输出");
    if truncated {
        tracing::debug!("...");
    }
}

// 行输出按行数截断，错误文本按字符数截断；第二个值表示是否发生了截断
fn truncated_view(output: &CommandOutput) -> (String, bool) {
    match output {
        CommandOutput::Lines(lines) => {
            let shown = lines[..lines.len().min(MAX_LOG_OUTPUT)].join("\n");
            (shown, lines.len() > MAX_LOG_OUTPUT)
        }
        CommandOutput::Failure(text) => {
            let mut chars = text.chars();
            let shown: String = chars.by_ref().take(MAX_LOG_OUTPUT).collect();
            (shown, chars.next().is_some())
        }
    }
}
