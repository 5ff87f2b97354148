//! # Delivery
//!
//! 事件投递模块。
//!
//! 负责：
//! - 把编码后的事件交给 transport（Kafka 或内存实现）
//! - 在独立任务中统计投递确认，不阻塞 transport 的回调线程
//! - 维护提交、成功、失败计数

pub mod state;
pub mod tracker;
pub mod transports;

pub use contracts::{DeliveryCallback, DeliveryOutcome, FinalReport, Transport};
pub use state::PipelineState;
pub use tracker::DeliveryTracker;
pub use transports::{
    KafkaConfig, KafkaTransport, MemoryTransport, PublishedEvent, TransportCall,
};
