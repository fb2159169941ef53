//! 事件总线
//!
//! 基于 Tokio 无界 channel 的进程内事件通道：状态机一侧同步发布，
//! 冲突监听器一侧异步消费。发布永不阻塞状态转换。

use tokio::sync::mpsc;
use tracing::{debug, warn};

use volunteer_domain::events::{DomainEvent, EngineEvent};
use volunteer_domain::ports::EventPublisher;

/// 事件总线：一个发布端口实现 + 一个消费端
pub struct EventBus {
    pub publisher: MpscEventPublisher,
    pub receiver: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            publisher: MpscEventPublisher { sender },
            receiver,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// mpsc 发送端的事件发布实现
#[derive(Debug, Clone)]
pub struct MpscEventPublisher {
    sender: mpsc::UnboundedSender<EngineEvent>,
}

impl EventPublisher for MpscEventPublisher {
    fn publish(&self, event: EngineEvent) {
        debug!(
            "发布领域事件: {} ({})",
            event.event_type(),
            event.aggregate_id()
        );
        if self.sender.send(event).is_err() {
            // 监听器已关闭（通常在停机过程中），事件丢弃不影响状态
            warn!("事件通道已关闭，领域事件被丢弃");
        }
    }
}
