pub mod packed;
pub mod vbyte;
