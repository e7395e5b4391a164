/*!
# Core Module

Core functionality shared by every layer of the analyzer: source
positions, the fatal error type and BOM-aware file reading.
*/

pub mod errors;
pub mod fs_utils;
pub mod position;

pub use errors::{AnalysisError, AnalysisResult};
pub use fs_utils::{decode_script_bytes, is_script_file, read_script_file, SCRIPT_EXTENSIONS};
pub use position::{LineIndex, ScriptExtent, ScriptPosition};
