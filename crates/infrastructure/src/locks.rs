//! 按聚合 id 加锁
//!
//! 每个聚合根（任务、志愿者）由单一逻辑所有者串行变更：同一 id 上的
//! 并发操作互斥，不同 id 并行。后台巡检只在变更时短暂持锁，不在扫描
//! 全程持锁。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// 锁的聚合类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKind {
    Task,
    Volunteer,
}

/// 键控锁管理器
#[derive(Debug, Default)]
pub struct KeyedLockManager {
    locks: Mutex<HashMap<(LockKind, i64), Arc<Mutex<()>>>>,
}

impl KeyedLockManager {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// 获取某聚合的互斥锁，守卫释放即解锁
    pub async fn acquire(&self, kind: LockKind, id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry((kind, id))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
