pub mod monitor;
pub mod registry;
pub mod ring_buffer;
pub mod stream;

pub use monitor::{LatencyMonitor, TimeUnit};
pub use registry::{
    KeySetChanged, LatencyReport, MonitorRegistry, MonitorSnapshot, RegistrySnapshot,
};
pub use ring_buffer::RingBuffer;
