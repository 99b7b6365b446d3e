use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::models::audio_models::{AudioFormat, FileFormat};
use crate::models::error::LineInError;
use crate::processing::pcm::{self, SampleLayout};
use crate::processing::{au_format, wav_format};

/// Streaming audio file writer for recordings of unknown length.
///
/// The header is written up front with placeholder sizes and patched by
/// [`finish`](Self::finish). Incoming bytes are rewritten into the byte order
/// and signedness the container requires.
///
/// ## File Format
///
/// ```text
/// [container header]
/// [raw sample data...]
/// ```
pub struct ContainerWriter {
    file_path: PathBuf,
    file_format: FileFormat,
    audio_format: AudioFormat,
    layout: Option<SampleLayout>,
    file: BufWriter<File>,
    data_bytes: u64,
    // Bytes of a sample split across two writes.
    carry: Vec<u8>,
    scratch: Vec<u8>,
}

impl ContainerWriter {
    /// Create the file (and any missing parent directories) and write its header.
    pub fn create(
        file_path: impl Into<PathBuf>,
        file_format: FileFormat,
        audio_format: AudioFormat,
    ) -> Result<Self, LineInError> {
        let file_path = file_path.into();

        let header: Vec<u8> = match file_format {
            FileFormat::Wave => wav_format::generate_wav_header(&audio_format, 0).to_vec(),
            FileFormat::Au => {
                au_format::generate_au_header(&audio_format, au_format::UNKNOWN_DATA_SIZE)?
                    .to_vec()
            }
        };
        let target = match file_format {
            FileFormat::Wave => wav_format::wav_layout(&audio_format),
            FileFormat::Au => au_format::au_layout(),
        };
        let layout = pcm::needs_conversion(&audio_format, target).then_some(target);

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LineInError::StorageError(format!("failed to create directory: {e}"))
            })?;
        }

        let file = File::create(&file_path)
            .map_err(|e| LineInError::StorageError(format!("failed to create file: {e}")))?;
        let mut file = BufWriter::new(file);
        file.write_all(&header)
            .map_err(|e| LineInError::StorageError(format!("write failed: {e}")))?;

        Ok(Self {
            file_path,
            file_format,
            audio_format,
            layout,
            file,
            data_bytes: 0,
            carry: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Append raw captured bytes in the writer's audio format.
    pub fn write(&mut self, data: &[u8]) -> Result<(), LineInError> {
        let Some(layout) = self.layout else {
            return self.write_raw_data(data);
        };

        let sample_bytes = self.audio_format.sample_size_bytes().max(1);
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.carry);
        self.scratch.extend_from_slice(data);

        let whole = self.scratch.len() - self.scratch.len() % sample_bytes;
        self.carry.clear();
        self.carry.extend_from_slice(&self.scratch[whole..]);
        self.scratch.truncate(whole);

        pcm::convert_in_place(&mut self.scratch, &self.audio_format, layout);
        let converted = std::mem::take(&mut self.scratch);
        let result = self.write_raw_data(&converted);
        self.scratch = converted;
        result
    }

    /// Patch the header with the final sizes and flush everything to disk.
    ///
    /// Returns the number of sample bytes written.
    pub fn finish(mut self) -> Result<u64, LineInError> {
        if !self.carry.is_empty() {
            log::debug!(
                "Dropping {} trailing bytes of an incomplete sample in {}",
                self.carry.len(),
                self.file_path.display()
            );
            self.carry.clear();
        }

        let storage = |e: std::io::Error| LineInError::StorageError(e.to_string());

        match self.file_format {
            FileFormat::Wave => {
                if wav_format::pad_size(self.data_bytes) > 0 {
                    self.file.write_all(&[0]).map_err(storage)?;
                }
                self.file
                    .seek(SeekFrom::Start(wav_format::RIFF_SIZE_OFFSET))
                    .map_err(storage)?;
                self.file
                    .write_all(&wav_format::riff_chunk_size(self.data_bytes).to_le_bytes())
                    .map_err(storage)?;
                self.file
                    .seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET))
                    .map_err(storage)?;
                self.file
                    .write_all(&wav_format::clamp_u32(self.data_bytes).to_le_bytes())
                    .map_err(storage)?;
            }
            FileFormat::Au => {
                // Anything that doesn't fit keeps the "unknown" marker.
                let size = u32::try_from(self.data_bytes)
                    .ok()
                    .filter(|&s| s != au_format::UNKNOWN_DATA_SIZE)
                    .unwrap_or(au_format::UNKNOWN_DATA_SIZE);
                self.file
                    .seek(SeekFrom::Start(au_format::DATA_SIZE_OFFSET))
                    .map_err(storage)?;
                self.file.write_all(&size.to_be_bytes()).map_err(storage)?;
            }
        }

        self.file.flush().map_err(storage)?;
        self.file.get_ref().sync_all().map_err(storage)?;
        Ok(self.data_bytes)
    }

    fn write_raw_data(&mut self, data: &[u8]) -> Result<(), LineInError> {
        self.file
            .write_all(data)
            .map_err(|e| LineInError::StorageError(format!("write failed: {e}")))?;
        self.data_bytes += data.len() as u64;
        Ok(())
    }
}
