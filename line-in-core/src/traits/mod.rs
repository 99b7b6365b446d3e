pub mod audio_subsystem;
pub mod capture_line;
