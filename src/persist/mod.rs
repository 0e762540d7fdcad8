//! Session logging: wire records, file layout and the flush pipeline

pub mod record;
pub mod session;
pub mod stream;
pub mod pipeline;

pub use record::{CameraRecord, PointRecord, format_point_record, parse_camera_record, parse_point_record};
pub use session::SessionPaths;
pub use pipeline::{FLUSH_CHUNK_BYTES, FlushTicket, PersistencePipeline};
