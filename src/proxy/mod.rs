pub mod dispatch;
pub mod naming;
pub mod timing;

pub use dispatch::{Dispatch, DispatchError};
pub use naming::{Interface, Method, MethodNameOnly, NamingPolicy, NamingStrategy, QualifiedNaming};
pub use timing::LatencyMonitored;
