//! 异步分发使用的执行器抽象
//!
//! 核心只要求"提交任务"，结果通过 `SendHandle` 取回，不依赖具体的线程池实现。

use std::io;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{error, warn};

/// 共享运行时的阻塞线程上限
const MAX_BLOCKING_THREADS: usize = 64;

/// 提交给执行器的任务
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// 执行器：接收任务并在其他线程上运行，`execute` 本身不能阻塞
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

impl<F> Executor for F
where
    F: Fn(Job) + Send + Sync,
{
    fn execute(&self, job: Job) {
        self(job)
    }
}

/// 进程内共享的运行时，首次使用时创建
///
/// 用于不在 tokio 运行时内的调用方：异步发送的线程池和重试 backoff 的计时器。
pub(crate) fn shared_runtime() -> Result<&'static Runtime, &'static io::Error> {
    static RUNTIME: OnceLock<io::Result<Runtime>> = OnceLock::new();

    RUNTIME
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(1)
                .max_blocking_threads(MAX_BLOCKING_THREADS)
                .thread_name("notify-dispatch")
                .enable_time()
                .build()
        })
        .as_ref()
}

/// 使用 tokio 运行时的阻塞线程池（`spawn_blocking`）
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// 使用当前上下文的运行时，不在运行时内时返回 None
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // JoinHandle 直接丢弃，结果通过 SendHandle 返回
        drop(self.handle.spawn_blocking(job));
    }
}

/// 每个任务一个独立线程
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        let spawned = std::thread::Builder::new()
            .name("notify-dispatch".to_string())
            .spawn(job);

        // 线程创建失败时任务被丢弃，等待方会收到 DispatchError::Executor
        if let Err(e) = spawned {
            error!(error = %e, "Failed to spawn dispatch thread");
        }
    }
}

/// 默认执行器
///
/// 提交时若处于 tokio 运行时中则使用其阻塞线程池，否则使用进程共享运行时的阻塞线程池
/// （线程数有上限）。共享运行时创建失败时退回独立线程。
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecutor;

impl Executor for DefaultExecutor {
    fn execute(&self, job: Job) {
        if let Some(tokio) = TokioExecutor::current() {
            return tokio.execute(job);
        }

        match shared_runtime() {
            Ok(runtime) => TokioExecutor::new(runtime.handle().clone()).execute(job),
            Err(e) => {
                warn!(error = %e, "Shared dispatch runtime unavailable, using a dedicated thread");
                ThreadExecutor.execute(job);
            }
        }
    }
}
