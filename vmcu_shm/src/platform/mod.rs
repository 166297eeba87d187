//! Platform-specific shared memory plumbing

mod linux;

pub use linux::{attach_segment_mmap, create_segment_mmap, current_pid, is_process_alive};
