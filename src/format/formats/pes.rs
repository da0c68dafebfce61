//! Brother PES format implementation.
//!
//! A PES file wraps a PEC block. Only the PEC block is read; newer PES
//! versions add object descriptions in front of it, which are skipped by
//! following the PEC offset in the file header. Files are written as version
//! 1 with an empty PES section.

use crate::format::bytes::{ByteReader, ByteWriter};
use crate::format::error::{DecodeError, EncodeError};
use crate::format::formats::pec;
use crate::format::registry::FormatId;
use crate::format::traits::{Capabilities, StitchFormat};
use crate::pattern::Pattern;

pub const MAGIC: &[u8; 8] = b"#PES0001";

/// Offset of the PEC block in files this crate writes.
const PEC_OFFSET: u32 = 0x16;

/// Brother PES.
///
/// Supports the same commands as PEC, which carries the stitch data.
pub struct PesFormat;

impl StitchFormat for PesFormat {
    fn id(&self) -> FormatId {
        FormatId::Pes
    }

    fn display_name(&self) -> &'static str {
        "Brother (PES)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["pes"]
    }

    fn capabilities(&self) -> Capabilities {
        pec::block_capabilities()
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"#PES")
    }

    fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError> {
        let mut r = ByteReader::new(bytes, FormatId::Pes);
        let magic = r.take(MAGIC.len())?;
        if !pec::versioned_magic(magic, b"#PES") {
            return Err(DecodeError::bad_signature(
                FormatId::Pes,
                "missing #PES signature",
            ));
        }
        let offset = r.u32_le()? as usize;
        log::debug!(
            "PES version {}, PEC block at {}",
            String::from_utf8_lossy(&magic[4..]),
            offset
        );
        if offset < r.position() {
            return Err(DecodeError::bad_signature(
                FormatId::Pes,
                format!("PEC offset {} points into the file header", offset),
            ));
        }
        pec::decode_block(bytes, offset, FormatId::Pes)
    }

    fn encode(&self, pattern: &Pattern) -> Result<Vec<u8>, EncodeError> {
        let block = pec::encode_block(pattern, FormatId::Pes)?;
        let mut w = ByteWriter::with_capacity(PEC_OFFSET as usize + block.len());
        w.bytes(MAGIC);
        w.u32_le(PEC_OFFSET);
        w.pad_to(PEC_OFFSET as usize, 0x00);
        w.bytes(&block);
        Ok(w.into_inner())
    }
}
