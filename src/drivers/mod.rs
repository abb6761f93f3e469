// src/drivers/mod.rs
// 仪器相关的子模块
pub mod error;
pub mod multimeter;
pub mod serial;
pub mod source;
pub mod visa;
// 公开导出常用类型，方便外部调用
pub use error::InstrumentError;
pub use multimeter::{open_multimeter, DEFAULT_MAX_RANGE, DEFAULT_RESOLUTION};
pub use serial::SerialSettings;
pub use source::{InstrumentSource, SyntheticSource};
