pub mod codec_util;
pub mod data_input;
pub mod data_output;
pub mod layout;
pub mod segment;
