//! 应用程序初始化和启动
//!
//! 负责终端应用的完整启动流程，包括：
//! - 日志系统初始化
//! - 设置加载与存储配置校验
//! - 存储客户端与数据访问层构建
//! - 控制器挂载
//! - 终端输入循环与卸载

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::controller::{self, ControllerHandle, SessionState};
use crate::logger;
use crate::settings::{default_settings_path, SettingsManager};
use crate::storage::{PostgrestStore, RationRepository, StoreConfig};
use crate::views::{self, Command};

/// 应用程序入口点
///
/// 存储配置缺失时直接返回错误，不会构建存储客户端
pub async fn run() -> Result<()> {
    let config = StoreConfig::from_env()?;

    let _log_guard = logger::init()?;
    info!("初始化家庭物资清单...");

    let settings = SettingsManager::new(default_settings_path()).await?;
    info!("设置文件: {:?}", settings.path());

    let store = PostgrestStore::new(
        &config,
        settings.get().request_timeout(),
        settings.get().poll_interval(),
    )?;
    let repo = RationRepository::new(Arc::new(store));

    let handle = controller::mount(repo);
    let mut stdout = tokio::io::stdout();
    let result = run_terminal(&handle, BufReader::new(tokio::io::stdin()), &mut stdout).await;

    handle.unmount().await;
    if let Err(e) = &result {
        error!("终端循环异常退出: {}", e);
    }
    info!("已退出");
    result
}

/// 一行输入的处理结果
enum Step {
    Quit,
    /// 意图已发出，等待其效果生效
    Wait(oneshot::Receiver<()>),
    Ready,
}

/// 终端循环：状态变化时重绘，读取输入派发意图
///
/// 意图在后台执行，执行期间仍会重绘和读取输入；后续输入排队，quit 立即生效
async fn run_terminal<R, W>(handle: &ControllerHandle, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut state_rx = handle.watch();
    let mut in_flight: Option<oneshot::Receiver<()>> = None;
    let mut queued: VecDeque<String> = VecDeque::new();

    // 先克隆快照再绘制，避免跨 await 持有读锁
    let initial = state_rx.borrow_and_update().clone();
    draw(output, &initial).await?;

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                draw(output, &state).await?;
            }
            _ = async {
                if let Some(rx) = in_flight.as_mut() {
                    let _ = rx.await;
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                match drain_queue(handle, output, &mut queued).await? {
                    Step::Quit => break,
                    Step::Wait(rx) => in_flight = Some(rx),
                    Step::Ready => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if in_flight.is_some() {
                    if matches!(views::parse(&handle.snapshot(), &line), Command::Quit) {
                        break;
                    }
                    debug!("上一条指令未完成，输入排队: {}", line);
                    queued.push_back(line);
                } else {
                    queued.push_back(line);
                    match drain_queue(handle, output, &mut queued).await? {
                        Step::Quit => break,
                        Step::Wait(rx) => in_flight = Some(rx),
                        Step::Ready => {}
                    }
                }
            }
        }
    }

    Ok(())
}

/// 依次处理排队的输入，遇到需要等待的意图时停下
async fn drain_queue<W>(
    handle: &ControllerHandle,
    output: &mut W,
    queued: &mut VecDeque<String>,
) -> Result<Step>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queued.pop_front() {
        match submit_line(handle, output, &line).await? {
            Step::Ready => {}
            step => return Ok(step),
        }
    }
    Ok(Step::Ready)
}

async fn submit_line<W>(handle: &ControllerHandle, output: &mut W, line: &str) -> Result<Step>
where
    W: AsyncWrite + Unpin,
{
    let step = match views::parse(&handle.snapshot(), line) {
        Command::Quit => Step::Quit,
        Command::Intent(intent) => Step::Wait(handle.send(intent)),
        Command::Intents(intents) => {
            // 控制器按顺序处理，等最后一个即可
            let mut last = None;
            for intent in intents {
                last = Some(handle.send(intent));
            }
            last.map_or(Step::Ready, Step::Wait)
        }
        Command::Unknown => {
            output.write_all(b"? unknown command\n> ").await?;
            output.flush().await?;
            Step::Ready
        }
    };
    Ok(step)
}

async fn draw<W>(output: &mut W, state: &SessionState) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    // 清屏并回到左上角
    let frame = format!("\x1b[2J\x1b[H{}\n> ", views::render(state));
    output.write_all(frame.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
