//! # Bus
//!
//! 进程内消息总线与读数分发。
//!
//! 负责：
//! - 以 `LocalBus` 实现插件所需的消息运行时
//! - 消费照度话题并 fan-out 到多个 sinks
//! - 隔离慢 sink，不阻塞插件发布

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod local;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, IlluminanceReading};
pub use dispatcher::{
    create_dispatcher, DispatchReport, Dispatcher, DispatcherBuilder, DispatcherConfig,
};
pub use error::BusError;
pub use handle::{Delivery, SinkHandle};
pub use local::{LocalBus, DEFAULT_TOPIC_CAPACITY};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
