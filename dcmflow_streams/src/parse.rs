//! Converts incoming chunks of binary DICOM data into DICOM parts.
//!
//! The conversion is done in a streaming fashion, where chunks of raw binary
//! data of any size are added to a parse context, and DICOM parts are then
//! progressively made available as their data comes in. See the
//! [`DicomPart`] type for details on the parts that are emitted.
//!
//! Every emitted part carries its exact on-the-wire bytes, so the
//! concatenation of the bytes of all emitted parts reproduces the input.
//! Delimitations that close defined-length sequences and items have no bytes
//! on the wire and are emitted with empty bytes.

use std::rc::Rc;

use dcmflow_core::value_representation::ValueLengthSize;
use dcmflow_core::{
  dictionary, utils, DataElementTag, TransferSyntax, ValueRepresentation,
};

use crate::internal::byte_reader::{ByteReader, ByteReaderError};
use crate::internal::data_element_header::{
  decode_u16, decode_u32, DataElementHeader,
};
use crate::internal::parse_location::ParseLocation;
use crate::internal::value_length::{ValueLength, UNDEFINED_LENGTH};
use crate::part::HeaderPart;
use crate::{DicomPart, StreamError};

/// Configuration used when parsing DICOM data.
///
pub struct ParseConfig {
  /// The maximum size in bytes of a [`DicomPart::ValueChunk`] emitted by a
  /// parse context. Values longer than this are split across multiple
  /// chunks. This can be used to control memory usage during a streaming
  /// parse, and must be a multiple of 8.
  ///
  /// By default there is no meaningful limit, i.e. each data element has its
  /// value emitted in exactly one chunk.
  ///
  pub max_chunk_size: u32,

  /// The maximum sequence nesting depth that can be parsed. This can be used
  /// to reject malformed or malicious data.
  ///
  /// By default the maximum sequence depth is set to ten thousand, i.e. no
  /// meaningful maximum is enforced.
  ///
  pub max_sequence_depth: u32,

  /// The byte order assumed for a data set that doesn't declare its transfer
  /// syntax in File Meta Information. The assumption is corrected when the
  /// first data element header is clearly in the opposite byte order.
  ///
  /// Default: false, i.e. little endian.
  ///
  pub assume_big_endian: bool,

  /// Whether explicit VRs are assumed for a data set that doesn't declare
  /// its transfer syntax in File Meta Information. The assumption is
  /// corrected when the first data element header doesn't carry a valid VR
  /// code.
  ///
  /// Default: true.
  ///
  pub assume_explicit_vr: bool,

  /// Whether the data set content of a deflated transfer syntax is inflated
  /// transparently, continuing the parse on the inflated bytes. When false,
  /// the deflated bytes are passed through unaltered as
  /// [`DicomPart::DeflatedChunk`] parts.
  ///
  /// Default: true.
  ///
  pub inflate: bool,
}

impl Default for ParseConfig {
  fn default() -> Self {
    Self {
      max_chunk_size: 0xFFFF_FFF8,
      max_sequence_depth: 10_000,
      assume_big_endian: false,
      assume_explicit_vr: true,
      inflate: true,
    }
  }
}

/// A parse context holds the current state of an in-progress DICOM parse.
/// Raw DICOM bytes are added to a parse context with [`Self::write_bytes`],
/// and DICOM parts are then read out with [`Self::read_parts`].
///
pub struct ParseContext {
  config: ParseConfig,
  reader: ByteReader,
  next_step: NextStep,
  transfer_syntax: Option<&'static TransferSyntax>,
  big_endian: bool,
  explicit_vr: bool,
  location: ParseLocation,
  sequence_depth: u32,
}

/// The next step specifies what a parse context will attempt to read next
/// from its incoming bytes.
///
enum NextStep {
  ReadPreamble,
  ReadFmiHeader {
    ends_at: Option<u64>,
  },
  ReadFmiValue {
    tag: DataElementTag,
    length: u32,
    ends_at: Option<u64>,
  },
  ReadDatasetHeader,
  ReadValueBytes {
    in_fragments: bool,
    bytes_remaining: u32,
  },
  ReadFragmentsItem,
  ReadDeflatedChunk,
}

impl ParseContext {
  /// Creates a new parse context with the default configuration.
  ///
  pub fn new() -> Self {
    Self {
      config: ParseConfig::default(),
      reader: ByteReader::new(),
      next_step: NextStep::ReadPreamble,
      transfer_syntax: None,
      big_endian: false,
      explicit_vr: true,
      location: ParseLocation::new(),
      sequence_depth: 0,
    }
  }

  /// Updates the config for a parse context. Should be called before any
  /// parts are read.
  ///
  pub fn set_config(&mut self, config: ParseConfig) {
    // Round max chunk size to a non-zero multiple of 8
    let max_chunk_size =
      std::cmp::max(8, { config.max_chunk_size / 8 } * 8);

    self.big_endian = config.assume_big_endian;
    self.explicit_vr = config.assume_explicit_vr;

    self.config = ParseConfig {
      max_chunk_size,
      ..config
    };
  }

  /// Returns the transfer syntax read from the File Meta Information, if one
  /// has been read yet.
  ///
  pub fn transfer_syntax(&self) -> Option<&'static TransferSyntax> {
    self.transfer_syntax
  }

  /// Writes raw DICOM bytes to a parse context to be parsed into parts by
  /// subsequent calls to [`Self::read_parts`]. If `done` is true this
  /// indicates the end of the incoming data, after which any further call to
  /// this function will error.
  ///
  pub fn write_bytes(
    &mut self,
    bytes: Vec<u8>,
    done: bool,
  ) -> Result<(), StreamError> {
    self
      .reader
      .write(bytes, done)
      .map_err(|e| self.map_byte_reader_error(e, "Writing data to parse context"))
  }

  /// Reads the next DICOM parts from a parse context. On success, zero or
  /// more parts are returned and the function can be called again to read
  /// further parts, until the [`DicomPart::End`] part is returned.
  ///
  /// An error of [`StreamError::DataRequired`] means the parse context needs
  /// more data to be added with [`Self::write_bytes`] before the next part
  /// can be read.
  ///
  pub fn read_parts(&mut self) -> Result<Vec<DicomPart>, StreamError> {
    match self.next_step {
      NextStep::ReadPreamble => self.read_preamble_part(),

      NextStep::ReadFmiHeader { ends_at } => {
        self.read_fmi_header_part(ends_at)
      }

      NextStep::ReadFmiValue {
        tag,
        length,
        ends_at,
      } => self.read_fmi_value_part(tag, length, ends_at),

      NextStep::ReadDatasetHeader => {
        // If a defined-length sequence or item ends at the current offset
        // then its delimitation is the next part
        if let Some(part) = self
          .location
          .next_delimiter_part(self.reader.bytes_read(), self.big_endian)
        {
          if matches!(part, DicomPart::SequenceDelimitation { .. }) {
            self.sequence_depth = self.sequence_depth.saturating_sub(1);
          }

          return Ok(vec![part]);
        }

        // Detect the end of the DICOM data. Data that stops on a data
        // element boundary ends any active sequences and items without
        // error, mirroring how delimited data can simply stop arriving.
        if self.reader.is_fully_consumed() {
          let big_endian = self.big_endian;
          return Ok(self.location.pending_delimiter_parts(big_endian));
        }

        self.read_dataset_header_part()
      }

      NextStep::ReadValueBytes {
        in_fragments,
        bytes_remaining,
      } => self.read_value_bytes_part(in_fragments, bytes_remaining),

      NextStep::ReadFragmentsItem => self.read_fragments_item_part(),

      NextStep::ReadDeflatedChunk => self.read_deflated_chunk_part(),
    }
  }

  /// Reads the 128-byte File Preamble and the 4-byte `DICM` prefix following
  /// it. If the `DICM` bytes aren't present at the expected offset then the
  /// input has no preamble and parsing continues directly with the File Meta
  /// Information or the data set, depending on the group of the first tag.
  ///
  fn read_preamble_part(&mut self) -> Result<Vec<DicomPart>, StreamError> {
    match self.reader.peek(132) {
      Ok(data) if &data[128..132] == b"DICM" => {
        let bytes = self.reader.read(132).unwrap();

        self.next_step = NextStep::ReadFmiHeader { ends_at: None };

        Ok(vec![DicomPart::Preamble {
          bytes: Rc::new(bytes),
        }])
      }

      Ok(data) => {
        self.begin_without_preamble(&data)?;
        Ok(vec![])
      }

      // The input ended before 132 bytes arrived, so there is no preamble
      Err(ByteReaderError::DataEnd) => {
        let data = self
          .reader
          .peek(8)
          .map_err(|e| self.map_byte_reader_error(e, "Reading start of stream"))?;

        self.begin_without_preamble(&data)?;
        Ok(vec![])
      }

      Err(e) => Err(self.map_byte_reader_error(e, "Reading file header")),
    }
  }

  /// Decides how to parse input that has no preamble: File Meta Information
  /// when the first tag is in group 0x0002, otherwise a bare data set whose
  /// encoding is taken from the configured assumptions, corrected when the
  /// first header clearly disagrees with them.
  ///
  fn begin_without_preamble(
    &mut self,
    data: &[u8],
  ) -> Result<(), StreamError> {
    if data.len() < 8 {
      return Err(StreamError::DataEndedUnexpectedly {
        when: "Reading start of stream".to_string(),
        offset: 0,
      });
    }

    if DataElementTag::from_bytes(data, false).group == 0x0002 {
      self.next_step = NextStep::ReadFmiHeader { ends_at: None };
      return Ok(());
    }

    let (big_endian, explicit_vr) = self.guess_dataset_encoding(data);

    self.big_endian = big_endian;
    self.explicit_vr = explicit_vr;
    self.next_step = NextStep::ReadDatasetHeader;

    Ok(())
  }

  /// Inspects the first eight bytes of a bare data set and corrects the
  /// configured encoding assumptions when they produce an implausible
  /// header: a VR code that doesn't parse means implicit VRs, and the
  /// endianness flips when the assumed byte order yields a nonsense first
  /// header while the opposite one doesn't.
  ///
  fn guess_dataset_encoding(&self, data: &[u8]) -> (bool, bool) {
    let explicit_vr = ValueRepresentation::from_bytes(&data[4..6]).is_ok();

    // A plausible first header names a tag that is either registered or
    // private, and when VRs are implicit its 32-bit length must be sane
    let plausible = |big_endian: bool| {
      let tag = DataElementTag::from_bytes(data, big_endian);

      if tag.group == 0 {
        return false;
      }

      if dictionary::find(tag).is_err() && !tag.is_private() {
        return false;
      }

      if !explicit_vr {
        let length = decode_u32(&data[4..8], big_endian);

        if length != UNDEFINED_LENGTH && length > 0x00FF_FFFF {
          return false;
        }
      }

      true
    };

    let assumed = self.config.assume_big_endian;

    let big_endian = if plausible(assumed) || !plausible(!assumed) {
      assumed
    } else {
      !assumed
    };

    (big_endian, explicit_vr)
  }

  /// Reads the header of the next File Meta Information data element. The
  /// File Meta Information is always encoded with explicit VRs in little
  /// endian. Reaching the end offset given by the *'(0002,0000) File Meta
  /// Information Group Length'* value, or a tag outside group 0x0002,
  /// transitions to the data set.
  ///
  fn read_fmi_header_part(
    &mut self,
    ends_at: Option<u64>,
  ) -> Result<Vec<DicomPart>, StreamError> {
    if let Some(ends_at) = ends_at {
      if self.reader.bytes_read() >= ends_at {
        return self.begin_dataset();
      }
    }

    let data = match self.reader.peek(8) {
      Ok(data) => data,

      // The input can stop after the File Meta Information, in which case
      // the data set that follows is empty
      Err(ByteReaderError::DataEnd) => return self.begin_dataset(),

      Err(e) => {
        return Err(
          self.map_byte_reader_error(e, "Reading File Meta Information"),
        )
      }
    };

    let tag = DataElementTag::from_bytes(&data, false);

    if tag.group != 0x0002 {
      return self.begin_dataset();
    }

    let vr = ValueRepresentation::from_bytes(&data[4..6]).map_err(|_| {
      self.data_invalid(
        "Reading File Meta Information",
        format!(
          "Data element '{}' has invalid VR {}",
          dictionary::tag_with_name(tag),
          utils::inspect_u8_slice(&data[4..6], 2)
        ),
      )
    })?;

    if vr == ValueRepresentation::Sequence {
      return Err(self.data_invalid(
        "Reading File Meta Information",
        "Data element in File Meta Information is a sequence".to_string(),
      ));
    }

    let (header_size, length) = match vr.value_length_size() {
      ValueLengthSize::U16 => (8, decode_u16(&data[6..8], false) as u32),

      ValueLengthSize::U32 => {
        let data = self.reader.peek(12).map_err(|e| {
          self.map_byte_reader_error(e, "Reading File Meta Information")
        })?;

        (12, decode_u32(&data[8..12], false))
      }
    };

    if length as u64 > self.config.max_chunk_size as u64 {
      return Err(StreamError::MaximumExceeded {
        details: format!(
          "File Meta Information value of {} bytes exceeds the max chunk \
          size of {} bytes",
          length, self.config.max_chunk_size
        ),
        offset: self.reader.bytes_read(),
      });
    }

    let bytes = self.reader.read(header_size).unwrap();

    self.next_step = NextStep::ReadFmiValue {
      tag,
      length,
      ends_at,
    };

    Ok(vec![DicomPart::Header(HeaderPart {
      tag,
      vr,
      length,
      is_fmi: true,
      big_endian: false,
      explicit_vr: true,
      bytes: Rc::new(bytes),
    })])
  }

  /// Reads the value of a File Meta Information data element in one chunk.
  /// The group length value determines where the File Meta Information ends,
  /// and the transfer syntax UID determines how the data set that follows is
  /// to be parsed.
  ///
  fn read_fmi_value_part(
    &mut self,
    tag: DataElementTag,
    length: u32,
    ends_at: Option<u64>,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let bytes = self.reader.read(length as usize).map_err(|e| {
      self.map_byte_reader_error(
        e,
        "Reading File Meta Information data element value",
      )
    })?;

    let mut ends_at = ends_at;

    if tag == dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag
      && ends_at.is_none()
    {
      if bytes.len() != 4 {
        return Err(self.data_invalid(
          "Reading File Meta Information",
          format!("Group length has invalid length {} bytes", bytes.len()),
        ));
      }

      let group_length = decode_u32(&bytes, false);
      ends_at = Some(self.reader.bytes_read() + group_length as u64);
    }

    if tag == dictionary::TRANSFER_SYNTAX_UID.tag {
      let uid = std::str::from_utf8(&bytes)
        .map_err(|_| {
          self.data_invalid(
            "Reading File Meta Information",
            "Transfer syntax UID is not valid UTF-8".to_string(),
          )
        })?
        .trim_end_matches(['\0', ' ']);

      self.transfer_syntax =
        Some(TransferSyntax::from_uid(uid).map_err(|_| {
          StreamError::TransferSyntaxNotSupported {
            transfer_syntax_uid: uid.to_string(),
          }
        })?);
    }

    self.next_step = NextStep::ReadFmiHeader { ends_at };

    Ok(vec![DicomPart::ValueChunk {
      big_endian: false,
      bytes: Rc::new(bytes),
      last: true,
    }])
  }

  /// Transitions from the File Meta Information to the data set, configuring
  /// the data set encoding from the transfer syntax that was read, or from
  /// the configured assumptions when none was present.
  ///
  fn begin_dataset(&mut self) -> Result<Vec<DicomPart>, StreamError> {
    match self.transfer_syntax {
      Some(transfer_syntax) => {
        self.big_endian = transfer_syntax.is_big_endian();
        self.explicit_vr = transfer_syntax.is_explicit_vr();

        if transfer_syntax.is_deflated {
          if self.config.inflate {
            self.reader.start_zlib_inflate().map_err(|e| {
              self.map_byte_reader_error(
                e,
                "Starting inflate for deflated transfer syntax",
              )
            })?;

            self.next_step = NextStep::ReadDatasetHeader;
          } else {
            self.next_step = NextStep::ReadDeflatedChunk;
          }
        } else {
          self.next_step = NextStep::ReadDatasetHeader;
        }
      }

      None => {
        self.big_endian = self.config.assume_big_endian;
        self.explicit_vr = self.config.assume_explicit_vr;
        self.next_step = NextStep::ReadDatasetHeader;
      }
    }

    Ok(vec![])
  }

  fn read_dataset_header_part(
    &mut self,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let big_endian = self.active_big_endian();
    let explicit_vr = self.active_explicit_vr();

    let (header, bytes) =
      self.read_data_element_header(big_endian, explicit_vr)?;
    let bytes = Rc::new(bytes);

    match (header.tag, header.vr, header.length) {
      // The start of a sequence
      (tag, Some(ValueRepresentation::Sequence), length) => {
        self.begin_sequence(tag, false, length, big_endian, explicit_vr, bytes)
      }

      // An explicit VR of UN with undefined length is a sequence whose
      // content must be read with implicit VRs.
      // Ref: DICOM Correction Proposal CP-246.
      (tag, Some(ValueRepresentation::Unknown), ValueLength::Undefined) => {
        self.begin_sequence(
          tag,
          true,
          ValueLength::Undefined,
          big_endian,
          explicit_vr,
          bytes,
        )
      }

      // Encapsulated pixel data opens a fragments stream
      (tag, Some(vr), ValueLength::Undefined)
        if tag == dictionary::PIXEL_DATA.tag
          && (vr == ValueRepresentation::OtherByteString
            || vr == ValueRepresentation::OtherWordString) =>
      {
        self
          .location
          .add_fragments()
          .map_err(|details| {
            self.data_invalid("Reading data element header", details)
          })?;

        self.next_step = NextStep::ReadFragmentsItem;

        Ok(vec![DicomPart::Fragments {
          tag,
          vr,
          big_endian,
          explicit_vr,
          bytes,
        }])
      }

      // The start of a new item in the current sequence
      (tag, None, length) if tag == dictionary::ITEM.tag => {
        let ends_at = match length {
          ValueLength::Defined { length } => {
            Some(self.reader.bytes_read() + length as u64)
          }
          ValueLength::Undefined => None,
        };

        let index = self.location.add_item(ends_at).map_err(|details| {
          self.data_invalid("Reading data element header", details)
        })?;

        Ok(vec![DicomPart::Item {
          index,
          length: length.to_u32(),
          big_endian,
          bytes,
        }])
      }

      // The end of an undefined-length item
      (tag, None, ValueLength::ZERO)
        if tag == dictionary::ITEM_DELIMITATION_ITEM.tag =>
      {
        match self.location.end_item() {
          Ok(index) => Ok(vec![DicomPart::ItemDelimitation {
            index,
            big_endian,
            bytes,
          }]),

          // Rogue item delimiters have been observed in the wild. The bytes
          // are framed, so step over them and continue.
          Err(_) => Ok(vec![DicomPart::Unknown { big_endian, bytes }]),
        }
      }

      // The end of an undefined-length sequence
      (tag, None, ValueLength::ZERO)
        if tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag =>
      {
        match self.location.end_sequence() {
          Ok(()) => {
            self.sequence_depth = self.sequence_depth.saturating_sub(1);

            Ok(vec![DicomPart::SequenceDelimitation { big_endian, bytes }])
          }

          Err(_) => Ok(vec![DicomPart::Unknown { big_endian, bytes }]),
        }
      }

      // A standard data element whose value bytes follow
      (tag, Some(vr), ValueLength::Defined { length }) => {
        self.next_step = NextStep::ReadValueBytes {
          in_fragments: false,
          bytes_remaining: length,
        };

        Ok(vec![DicomPart::Header(HeaderPart {
          tag,
          vr,
          length,
          is_fmi: false,
          big_endian,
          explicit_vr,
          bytes,
        })])
      }

      (_, _, _) => Err(self.data_invalid(
        "Reading data element header",
        format!("Invalid data element '{}'", header),
      )),
    }
  }

  fn begin_sequence(
    &mut self,
    tag: DataElementTag,
    forces_implicit_vr: bool,
    length: ValueLength,
    big_endian: bool,
    explicit_vr: bool,
    bytes: Rc<Vec<u8>>,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let ends_at = match length {
      ValueLength::Defined { length } => {
        Some(self.reader.bytes_read() + length as u64)
      }
      ValueLength::Undefined => None,
    };

    self
      .location
      .add_sequence(forces_implicit_vr, ends_at)
      .map_err(|details| {
        self.data_invalid("Reading data element header", details)
      })?;

    if self.sequence_depth >= self.config.max_sequence_depth {
      return Err(StreamError::MaximumExceeded {
        details: "Maximum allowed sequence depth reached".to_string(),
        offset: self.reader.bytes_read(),
      });
    }

    self.sequence_depth += 1;

    Ok(vec![DicomPart::Sequence {
      tag,
      length: length.to_u32(),
      big_endian,
      explicit_vr,
      bytes,
    }])
  }

  /// Reads a data element header and its raw wire bytes. Depending on the
  /// encoding and the specific VR this reads either 8 or 12 bytes in total.
  ///
  fn read_data_element_header(
    &mut self,
    big_endian: bool,
    explicit_vr: bool,
  ) -> Result<(DataElementHeader, Vec<u8>), StreamError> {
    let data = self.reader.peek(4).map_err(|e| {
      self.map_byte_reader_error(e, "Reading data element header")
    })?;

    let tag = DataElementTag::from_bytes(&data, big_endian);

    // The item and delimitation tags carry a 32-bit length and never a VR
    if tag == dictionary::ITEM.tag
      || tag == dictionary::ITEM_DELIMITATION_ITEM.tag
      || tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag
    {
      let bytes = self.reader.read(8).map_err(|e| {
        self.map_byte_reader_error(e, "Reading data element header")
      })?;

      let length = decode_u32(&bytes[4..8], big_endian);

      let header = DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::new(length),
      };

      return Ok((header, bytes));
    }

    if explicit_vr {
      self.read_explicit_vr_and_length(tag, big_endian)
    } else {
      self.read_implicit_vr_and_length(tag, big_endian)
    }
  }

  /// Reads the explicit VR and value length following a data element tag.
  ///
  fn read_explicit_vr_and_length(
    &mut self,
    tag: DataElementTag,
    big_endian: bool,
  ) -> Result<(DataElementHeader, Vec<u8>), StreamError> {
    let data = self.reader.peek(6).map_err(|e| {
      self.map_byte_reader_error(e, "Reading data element header")
    })?;

    let vr = match ValueRepresentation::from_bytes(&data[4..6]) {
      Ok(vr) => vr,

      // An explicit VR of two spaces is treated as implicit and the VR is
      // taken from the dictionary. Not part of the DICOM standard, but such
      // data has been observed in the wild.
      _ => match &data[4..6] {
        [0x20, 0x20] => self.infer_vr(tag),

        vr_bytes => {
          return Err(self.data_invalid(
            "Reading data element VR",
            format!(
              "Unrecognized VR {} for tag '{}'",
              utils::inspect_u8_slice(vr_bytes, 2),
              dictionary::tag_with_name(tag)
            ),
          ))
        }
      },
    };

    let header_size = match vr.value_length_size() {
      ValueLengthSize::U32 => 12,
      ValueLengthSize::U16 => 8,
    };

    let bytes = self.reader.read(header_size).map_err(|e| {
      self.map_byte_reader_error(e, "Reading data element header")
    })?;

    let length = if header_size == 12 {
      decode_u32(&bytes[8..12], big_endian)
    } else {
      decode_u16(&bytes[6..8], big_endian) as u32
    };

    let header = DataElementHeader {
      tag,
      vr: Some(vr),
      length: ValueLength::new(length),
    };

    Ok((header, bytes))
  }

  /// Reads the value length following a data element tag when VRs are
  /// implicit. The VR itself is taken from the dictionary.
  ///
  fn read_implicit_vr_and_length(
    &mut self,
    tag: DataElementTag,
    big_endian: bool,
  ) -> Result<(DataElementHeader, Vec<u8>), StreamError> {
    let bytes = self.reader.read(8).map_err(|e| {
      self.map_byte_reader_error(e, "Reading data element header")
    })?;

    let length = decode_u32(&bytes[4..8], big_endian);

    let header = DataElementHeader {
      tag,
      vr: Some(self.infer_vr(tag)),
      length: ValueLength::new(length),
    };

    Ok((header, bytes))
  }

  /// Returns the VR to use for a data element that doesn't carry one on the
  /// wire, or `UN` when the dictionary can't determine it.
  ///
  fn infer_vr(&self, tag: DataElementTag) -> ValueRepresentation {
    match dictionary::find(tag) {
      Ok(dictionary::Item { vrs: [vr], .. }) => *vr,

      // OB is not usable for pixel data when VRs are implicit.
      // Ref: PS3.5 8.1.2.
      Ok(entry) if entry.tag == dictionary::PIXEL_DATA.tag => {
        ValueRepresentation::OtherWordString
      }

      Ok(dictionary::Item { vrs, .. }) => {
        vrs.first().copied().unwrap_or(ValueRepresentation::Unknown)
      }

      Err(()) => ValueRepresentation::Unknown,
    }
  }

  fn read_value_bytes_part(
    &mut self,
    in_fragments: bool,
    bytes_remaining: u32,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let big_endian = self.active_big_endian();

    let bytes_to_read =
      std::cmp::min(bytes_remaining, self.config.max_chunk_size);

    let data = self.reader.read(bytes_to_read as usize).map_err(|e| {
      let when =
        format!("Reading {} data element value bytes", bytes_to_read);
      self.map_byte_reader_error(e, &when)
    })?;

    let bytes_remaining = bytes_remaining - bytes_to_read;
    let last = bytes_remaining == 0;

    self.next_step = if last {
      if in_fragments {
        NextStep::ReadFragmentsItem
      } else {
        NextStep::ReadDatasetHeader
      }
    } else {
      NextStep::ReadValueBytes {
        in_fragments,
        bytes_remaining,
      }
    };

    Ok(vec![DicomPart::ValueChunk {
      big_endian,
      bytes: Rc::new(data),
      last,
    }])
  }

  /// Reads the next item of encapsulated pixel data, or the delimitation
  /// that closes the fragments.
  ///
  fn read_fragments_item_part(
    &mut self,
  ) -> Result<Vec<DicomPart>, StreamError> {
    let big_endian = self.active_big_endian();
    let explicit_vr = self.active_explicit_vr();

    let (header, bytes) =
      self.read_data_element_header(big_endian, explicit_vr)?;

    match header {
      DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::Defined { length },
      } if tag == dictionary::ITEM.tag => {
        let index =
          self.location.add_fragment_item().map_err(|details| {
            self
              .data_invalid("Reading encapsulated pixel data item", details)
          })?;

        self.next_step = NextStep::ReadValueBytes {
          in_fragments: true,
          bytes_remaining: length,
        };

        Ok(vec![DicomPart::Item {
          index,
          length,
          big_endian,
          bytes: Rc::new(bytes),
        }])
      }

      DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::ZERO,
      } if tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag => {
        self.location.end_sequence().map_err(|details| {
          self.data_invalid("Reading encapsulated pixel data item", details)
        })?;

        self.next_step = NextStep::ReadDatasetHeader;

        Ok(vec![DicomPart::SequenceDelimitation {
          big_endian,
          bytes: Rc::new(bytes),
        }])
      }

      header => Err(self.data_invalid(
        "Reading encapsulated pixel data item",
        format!("Invalid data element '{}'", header),
      )),
    }
  }

  /// Passes deflated bytes through unaltered when the parse context is
  /// configured not to inflate them.
  ///
  fn read_deflated_chunk_part(
    &mut self,
  ) -> Result<Vec<DicomPart>, StreamError> {
    if self.reader.is_fully_consumed() {
      return Ok(vec![DicomPart::End]);
    }

    let data = self
      .reader
      .read_available(self.config.max_chunk_size as usize)
      .map_err(|e| self.map_byte_reader_error(e, "Reading deflated data"))?;

    if data.is_empty() {
      return Err(StreamError::DataRequired {
        when: "Reading deflated data".to_string(),
      });
    }

    Ok(vec![DicomPart::DeflatedChunk {
      big_endian: self.big_endian,
      bytes: Rc::new(data),
    }])
  }

  /// Returns the byte order for the current position. Sequences that force
  /// implicit VRs are always read in little endian.
  ///
  fn active_big_endian(&self) -> bool {
    if self.location.is_implicit_vr_forced() {
      false
    } else {
      self.big_endian
    }
  }

  /// Returns the VR mode for the current position, accounting for sequences
  /// that force implicit VRs.
  ///
  fn active_explicit_vr(&self) -> bool {
    if self.location.is_implicit_vr_forced() {
      false
    } else {
      self.explicit_vr
    }
  }

  fn map_byte_reader_error(
    &self,
    error: ByteReaderError,
    when: &str,
  ) -> StreamError {
    let offset = self.reader.bytes_read();

    match error {
      ByteReaderError::DataRequired => StreamError::DataRequired {
        when: when.to_string(),
      },

      ByteReaderError::DataEnd => StreamError::DataEndedUnexpectedly {
        when: when.to_string(),
        offset,
      },

      ByteReaderError::ZlibDataError => StreamError::DataInvalid {
        when: when.to_string(),
        details: "Deflated data is invalid".to_string(),
        offset: Some(offset),
      },

      ByteReaderError::WriteAfterCompletion => {
        StreamError::WriteAfterCompletion
      }
    }
  }

  fn data_invalid(&self, when: &str, details: String) -> StreamError {
    StreamError::DataInvalid {
      when: when.to_string(),
      details,
      offset: Some(self.reader.bytes_read()),
    }
  }
}

impl Default for ParseContext {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use dcmflow_core::transfer_syntax;

  use super::*;
  use crate::test_support;

  fn deflate(bytes: &[u8]) -> Vec<u8> {
    let mut compressor =
      flate2::Compress::new(flate2::Compression::default(), false);
    let mut output = vec![0u8; bytes.len() + 1024];
    compressor
      .compress(bytes, &mut output, flate2::FlushCompress::Finish)
      .unwrap();
    output.truncate(compressor.total_out() as usize);
    output
  }

  #[test]
  fn file_round_trip_test() {
    let mut input = test_support::preamble();
    input.extend(test_support::fmi_group(
      Some("1.2.840.10008.5.1.4.1.1.2"),
      transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN.uid,
    ));
    input.extend(test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    ));
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    ));

    let parts = test_support::parse_all(&input).unwrap();

    assert!(matches!(parts.first(), Some(DicomPart::Preamble { .. })));
    assert_eq!(parts.last(), Some(&DicomPart::End));
    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn fmi_parts_test() {
    let mut input = test_support::preamble();
    input.extend(test_support::fmi_group(
      None,
      transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN.uid,
    ));

    let parts = test_support::parse_all(&input).unwrap();

    let fmi_headers: Vec<_> = parts
      .iter()
      .filter_map(|part| match part {
        DicomPart::Header(header) if header.is_fmi => Some(header.tag),
        _ => None,
      })
      .collect();

    assert_eq!(
      fmi_headers,
      vec![
        dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag,
        dictionary::TRANSFER_SYNTAX_UID.tag,
      ]
    );

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn fmi_without_preamble_test() {
    let mut input = test_support::fmi_group(
      None,
      transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN.uid,
    );
    input.extend(test_support::element_implicit_le(
      dictionary::PATIENT_NAME.tag,
      b"Doe^John",
    ));

    let parts = test_support::parse_all(&input).unwrap();

    let header = parts
      .iter()
      .find_map(|part| match part {
        DicomPart::Header(header) if !header.is_fmi => Some(header),
        _ => None,
      })
      .unwrap();

    assert_eq!(header.tag, dictionary::PATIENT_NAME.tag);
    assert_eq!(header.vr, ValueRepresentation::PersonName);
    assert!(!header.explicit_vr);

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn big_endian_heuristic_test() {
    let input = test_support::element_be(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );

    let parts = test_support::parse_all(&input).unwrap();

    match &parts[0] {
      DicomPart::Header(header) => {
        assert_eq!(header.tag, dictionary::STUDY_DATE.tag);
        assert!(header.big_endian);
        assert_eq!(header.length, 8);
      }
      part => panic!("Expected header but got {}", part),
    }

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn implicit_vr_heuristic_test() {
    let input = test_support::element_implicit_le(
      dictionary::PATIENT_NAME.tag,
      b"Doe^John",
    );

    let parts = test_support::parse_all(&input).unwrap();

    match &parts[0] {
      DicomPart::Header(header) => {
        assert_eq!(header.vr, ValueRepresentation::PersonName);
        assert!(!header.explicit_vr);
        assert!(!header.big_endian);
      }
      part => panic!("Expected header but got {}", part),
    }

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn value_chunking_test() {
    let input = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"ABCDEFGHIJKLMNOPQRST",
    );

    let parts = test_support::parse_all_with_config(
      &input,
      ParseConfig {
        max_chunk_size: 8,
        ..ParseConfig::default()
      },
    )
    .unwrap();

    let chunks: Vec<_> = parts
      .iter()
      .filter_map(|part| match part {
        DicomPart::ValueChunk { bytes, last, .. } => {
          Some((bytes.len(), *last))
        }
        _ => None,
      })
      .collect();

    assert_eq!(chunks, vec![(8, false), (8, false), (4, true)]);
    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn undefined_length_sequence_test() {
    let mut input = test_support::sequence_undefined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
    );
    input.extend(test_support::item_undefined_le());
    input.extend(test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    ));
    input.extend(test_support::item_delimitation_le());
    input.extend(test_support::item_undefined_le());
    input.extend(test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240202",
    ));
    input.extend(test_support::item_delimitation_le());
    input.extend(test_support::sequence_delimitation_le());

    let parts = test_support::parse_all(&input).unwrap();

    let item_indices: Vec<_> = parts
      .iter()
      .filter_map(|part| match part {
        DicomPart::Item { index, .. } => Some(*index),
        _ => None,
      })
      .collect();

    assert_eq!(item_indices, vec![1, 2]);
    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn defined_length_sequence_emits_markers_test() {
    let inner = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );

    let mut input = test_support::sequence_defined_le(
      dictionary::DERIVATION_CODE_SEQUENCE.tag,
      (inner.len() + 8) as u32,
    );
    input.extend(test_support::item_defined_le(inner.len() as u32));
    input.extend(&inner);
    input.extend(test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    ));

    let parts = test_support::parse_all(&input).unwrap();

    // The implicit ends of the item and sequence produce delimitation parts
    // with no wire bytes
    let markers: Vec<_> = parts
      .iter()
      .filter(|part| {
        matches!(
          part,
          DicomPart::ItemDelimitation { .. }
            | DicomPart::SequenceDelimitation { .. }
        )
      })
      .collect();

    assert_eq!(markers.len(), 2);
    assert!(markers.iter().all(|part| part.bytes().is_empty()));

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn encapsulated_pixel_data_test() {
    let mut input = DataElementHeader {
      tag: dictionary::PIXEL_DATA.tag,
      vr: Some(ValueRepresentation::OtherByteString),
      length: ValueLength::Undefined,
    }
    .to_bytes(false, true);
    input.extend(test_support::item_defined_le(4));
    input.extend([1, 2, 3, 4]);
    input.extend(test_support::item_defined_le(2));
    input.extend([5, 6]);
    input.extend(test_support::sequence_delimitation_le());

    let parts = test_support::parse_all(&input).unwrap();

    assert!(matches!(
      parts[0],
      DicomPart::Fragments {
        tag,
        vr: ValueRepresentation::OtherByteString,
        ..
      } if tag == dictionary::PIXEL_DATA.tag
    ));

    let items: Vec<_> = parts
      .iter()
      .filter_map(|part| match part {
        DicomPart::Item { index, length, .. } => Some((*index, *length)),
        _ => None,
      })
      .collect();

    assert_eq!(items, vec![(1, 4), (2, 2)]);
    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn unknown_vr_undefined_length_is_implicit_sequence_test() {
    let mut input = DataElementHeader {
      tag: dictionary::DERIVATION_CODE_SEQUENCE.tag,
      vr: Some(ValueRepresentation::Unknown),
      length: ValueLength::Undefined,
    }
    .to_bytes(false, true);
    input.extend(test_support::item_undefined_le());
    input.extend(test_support::element_implicit_le(
      dictionary::STUDY_DATE.tag,
      b"20240101",
    ));
    input.extend(test_support::item_delimitation_le());
    input.extend(test_support::sequence_delimitation_le());

    let parts = test_support::parse_all(&input).unwrap();

    assert!(matches!(parts[0], DicomPart::Sequence { .. }));

    let header = parts
      .iter()
      .find_map(|part| match part {
        DicomPart::Header(header) => Some(header),
        _ => None,
      })
      .unwrap();

    assert_eq!(header.tag, dictionary::STUDY_DATE.tag);
    assert_eq!(header.vr, ValueRepresentation::Date);
    assert!(!header.explicit_vr);

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn deflated_passthrough_test() {
    let dataset = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    );

    let mut input = test_support::preamble();
    input.extend(test_support::fmi_group(
      None,
      transfer_syntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN.uid,
    ));
    input.extend(deflate(&dataset));

    let parts = test_support::parse_all_with_config(
      &input,
      ParseConfig {
        inflate: false,
        ..ParseConfig::default()
      },
    )
    .unwrap();

    assert!(parts
      .iter()
      .any(|part| matches!(part, DicomPart::DeflatedChunk { .. })));

    assert_eq!(test_support::concat_bytes(&parts), input);
  }

  #[test]
  fn deflated_inflate_test() {
    let dataset = test_support::element_le(
      dictionary::PATIENT_NAME.tag,
      ValueRepresentation::PersonName,
      b"Doe^John",
    );

    let mut input = test_support::preamble();
    input.extend(test_support::fmi_group(
      None,
      transfer_syntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN.uid,
    ));
    input.extend(deflate(&dataset));

    let parts = test_support::parse_all(&input).unwrap();

    let header = parts
      .iter()
      .find_map(|part| match part {
        DicomPart::Header(header) if !header.is_fmi => Some(header),
        _ => None,
      })
      .unwrap();

    assert_eq!(header.tag, dictionary::PATIENT_NAME.tag);

    let value: Vec<u8> = parts
      .iter()
      .skip_while(|part| {
        !matches!(part, DicomPart::Header(h) if !h.is_fmi)
      })
      .filter_map(|part| match part {
        DicomPart::ValueChunk { bytes, .. } => Some(bytes.to_vec()),
        _ => None,
      })
      .flatten()
      .collect();

    assert_eq!(value, b"Doe^John".to_vec());
  }

  #[test]
  fn unsupported_transfer_syntax_test() {
    let mut input = test_support::preamble();
    input.extend(test_support::fmi_group(None, "1.2.3.4"));

    assert!(matches!(
      test_support::parse_all(&input),
      Err(StreamError::TransferSyntaxNotSupported { .. })
    ));
  }

  #[test]
  fn truncated_value_test() {
    let mut input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"20240101",
    );
    input.truncate(input.len() - 4);

    assert!(matches!(
      test_support::parse_all(&input),
      Err(StreamError::DataEndedUnexpectedly { .. })
    ));
  }

  #[test]
  fn empty_value_emits_final_chunk_test() {
    let input = test_support::element_le(
      dictionary::STUDY_DATE.tag,
      ValueRepresentation::Date,
      b"",
    );

    let parts = test_support::parse_all(&input).unwrap();

    assert_eq!(parts.len(), 3);
    assert!(matches!(
      &parts[1],
      DicomPart::ValueChunk { bytes, last: true, .. } if bytes.is_empty()
    ));
  }
}
