//! Output rendering.
//!
//! Classification stays markup-free; these modules map structured
//! outcomes onto the transcript, the result files, and the JSON envelope.

pub mod files;
pub mod robot;
pub mod transcript;

pub use files::write_report_files;
pub use robot::{CheckPayload, RobotOutput};
pub use transcript::render_transcript;
