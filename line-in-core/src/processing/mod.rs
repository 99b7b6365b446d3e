pub mod au_format;
pub mod pcm;
pub mod ring_buffer;
pub mod wav_format;
