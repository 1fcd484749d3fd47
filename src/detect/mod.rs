mod backend;
mod backends;
mod nms;
mod registry;
mod result;

pub use backend::{DetectParams, DetectorBackend};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use nms::{iou, non_max_suppression};
pub use registry::{build_backend, BackendKind};
pub use result::{BBox, RawDetection};
