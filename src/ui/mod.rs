mod output;

pub use output::{display_server_info, display_tool_error, display_tool_list, display_tool_result};
