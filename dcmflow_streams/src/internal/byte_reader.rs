use std::collections::VecDeque;

/// Accumulates incoming chunks of binary data of arbitrary sizes and exposes
/// them as one contiguous stream of bytes that can be read and peeked.
///
/// Incoming bytes can optionally be passed through zlib inflate prior to
/// being made available for reading, which is used for deflated transfer
/// syntaxes.
///
#[derive(Debug)]
pub struct ByteReader {
  chunks: VecDeque<Vec<u8>>,

  // Read offset into the chunk at the front of the queue
  head_offset: usize,

  available: u64,
  bytes_read: u64,
  is_writing_finished: bool,

  zlib_stream: Option<flate2::Decompress>,
  zlib_input: VecDeque<Vec<u8>>,
  zlib_input_offset: usize,
  zlib_inflate_complete: bool,
}

#[derive(Debug, PartialEq)]
pub enum ByteReaderError {
  /// The requested number of bytes is not yet available and more bytes need
  /// to be written first.
  DataRequired,

  /// The requested number of bytes goes past the end of the stream.
  DataEnd,

  /// Data written while zlib inflate is active was not valid deflated data.
  ZlibDataError,

  /// Data was written after the final bytes had already been written.
  WriteAfterCompletion,
}

/// Deflated data is inflated into chunks of at most this size to protect
/// against zlib bombs.
///
const ZLIB_INFLATE_CHUNK_SIZE: usize = 64 * 1024;

impl ByteReader {
  /// Creates a new empty byte reader.
  ///
  pub fn new() -> Self {
    Self {
      chunks: VecDeque::new(),
      head_offset: 0,
      available: 0,
      bytes_read: 0,
      is_writing_finished: false,
      zlib_stream: None,
      zlib_input: VecDeque::new(),
      zlib_input_offset: 0,
      zlib_inflate_complete: false,
    }
  }

  /// Returns the total number of bytes that have been read out so far.
  ///
  pub fn bytes_read(&self) -> u64 {
    self.bytes_read
  }

  /// Returns whether the reader has no unread bytes left and the end of the
  /// incoming data has been signalled.
  ///
  pub fn is_fully_consumed(&self) -> bool {
    self.available == 0
      && self.is_writing_finished
      && (self.zlib_stream.is_none() || self.zlib_inflate_complete)
  }

  /// Writes a chunk of bytes so it is available to subsequent calls to
  /// `read` and `peek`. If `done` is true then no more bytes will be written
  /// and any further call to `write` errors.
  ///
  pub fn write(
    &mut self,
    data: Vec<u8>,
    done: bool,
  ) -> Result<(), ByteReaderError> {
    if self.is_writing_finished {
      return Err(ByteReaderError::WriteAfterCompletion);
    }

    self.is_writing_finished = done;

    if data.is_empty() {
      return Ok(());
    }

    if self.zlib_stream.is_some() {
      self.zlib_input.push_back(data);
    } else {
      self.available += data.len() as u64;
      self.chunks.push_back(data);
    }

    Ok(())
  }

  /// Reads and consumes the requested number of bytes.
  ///
  pub fn read(
    &mut self,
    byte_count: usize,
  ) -> Result<Vec<u8>, ByteReaderError> {
    self.ensure(byte_count)?;

    let mut result = Vec::with_capacity(byte_count);

    while result.len() < byte_count {
      let chunk = self.chunks.front().unwrap();

      let start = self.head_offset;
      let end = std::cmp::min(
        chunk.len(),
        start + byte_count - result.len(),
      );
      result.extend_from_slice(&chunk[start..end]);

      if end == chunk.len() {
        self.chunks.pop_front();
        self.head_offset = 0;
      } else {
        self.head_offset = end;
      }
    }

    self.available -= byte_count as u64;
    self.bytes_read += byte_count as u64;

    Ok(result)
  }

  /// Returns the next bytes that will be read without consuming them.
  ///
  pub fn peek(
    &mut self,
    byte_count: usize,
  ) -> Result<Vec<u8>, ByteReaderError> {
    self.ensure(byte_count)?;

    let mut result = Vec::with_capacity(byte_count);
    let mut offset = self.head_offset;

    for chunk in self.chunks.iter() {
      let end =
        std::cmp::min(chunk.len(), offset + byte_count - result.len());
      result.extend_from_slice(&chunk[offset..end]);

      if result.len() == byte_count {
        break;
      }

      offset = 0;
    }

    Ok(result)
  }

  /// Reads and consumes up to `max_bytes` of whatever is currently
  /// available. Used to drain deflated bytes through without framing them.
  ///
  pub fn read_available(
    &mut self,
    max_bytes: usize,
  ) -> Result<Vec<u8>, ByteReaderError> {
    let byte_count = std::cmp::min(self.available, max_bytes as u64) as usize;

    self.read(byte_count)
  }

  /// Checks that the requested number of bytes is available to be read,
  /// inflating pending deflated data first when zlib inflate is active.
  ///
  fn ensure(&mut self, byte_count: usize) -> Result<(), ByteReaderError> {
    self.inflate_up_to(byte_count)?;

    if byte_count as u64 > self.available {
      if self.is_writing_finished {
        Err(ByteReaderError::DataEnd)
      } else {
        Err(ByteReaderError::DataRequired)
      }
    } else {
      Ok(())
    }
  }

  /// Converts the reader into one whose incoming bytes are deflated. All
  /// currently unread bytes, and all subsequently written bytes, are passed
  /// through streaming zlib inflate (raw deflate, no zlib header) and the
  /// result made available to be read.
  ///
  pub fn start_zlib_inflate(&mut self) -> Result<(), ByteReaderError> {
    let pending: Vec<Vec<u8>> = self.chunks.drain(..).collect();
    let head_offset = std::mem::take(&mut self.head_offset);
    let is_writing_finished = self.is_writing_finished;

    self.available = 0;
    self.is_writing_finished = false;
    self.zlib_stream = Some(flate2::Decompress::new(false));

    for (i, chunk) in pending.iter().enumerate() {
      let data = if i == 0 {
        chunk[head_offset..].to_vec()
      } else {
        chunk.clone()
      };

      self.write(data, false)?;
    }

    self.is_writing_finished = is_writing_finished;

    Ok(())
  }

  /// When zlib inflate is active, inflates pending deflated input until at
  /// least `read_size` bytes are available or the input is exhausted. Output
  /// is produced in bounded chunks so that a hostile deflate stream cannot
  /// force unbounded memory use for a small read.
  ///
  fn inflate_up_to(
    &mut self,
    read_size: usize,
  ) -> Result<(), ByteReaderError> {
    let zlib_stream = match self.zlib_stream.as_mut() {
      Some(zlib_stream) => zlib_stream,
      None => return Ok(()),
    };

    while self.available < read_size as u64 {
      let input = match self.zlib_input.front() {
        Some(input) => &input[self.zlib_input_offset..],
        None => return Ok(()),
      };

      let initial_total_in = zlib_stream.total_in();
      let initial_total_out = zlib_stream.total_out();

      let mut output = vec![0u8; ZLIB_INFLATE_CHUNK_SIZE];

      match zlib_stream.decompress(
        input,
        output.as_mut_slice(),
        flate2::FlushDecompress::None,
      ) {
        Ok(status) => {
          let consumed = (zlib_stream.total_in() - initial_total_in) as usize;
          let produced =
            (zlib_stream.total_out() - initial_total_out) as usize;

          if consumed == input.len() {
            self.zlib_input.pop_front();
            self.zlib_input_offset = 0;
          } else {
            self.zlib_input_offset += consumed;
          }

          if produced > 0 {
            output.resize(produced, 0);
            self.available += produced as u64;
            self.chunks.push_back(output);
          }

          if status == flate2::Status::StreamEnd {
            self.zlib_inflate_complete = true;
            return Ok(());
          }

          if produced == 0 && consumed == 0 {
            return Ok(());
          }
        }

        Err(_) => return Err(ByteReaderError::ZlibDataError),
      }
    }

    Ok(())
  }
}
