//! Page codec and the spill frame format.
//!
//! Layout of one frame on disk (little-endian):
//! [ magic: u32 ][ position_count: u32 ][ payload_len: u32 ][ checksum: u64 ]
//! [ payload bytes … ]
//!
//! The checksum is the first 8 bytes of blake3(payload). A spill file is a
//! plain concatenation of frames; end of data is EOF at a frame boundary.

use std::io::{self, Read, Write};
use std::sync::Arc;

use pagespill_core::types::{Page, Scalar};

pub const FRAME_MAGIC: u32 = 0x5053_504C; // "PSPL"
pub const FRAME_HEADER_LEN: usize = 4 + 4 + 4 + 8;
const MAX_PAYLOAD_LEN: u32 = 1 << 30;

/// Encoded page as it sits in a spill file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedPage {
    position_count: u32,
    payload: Vec<u8>,
    checksum: u64,
}

impl SerializedPage {
    pub fn new(position_count: u32, payload: Vec<u8>) -> Self {
        let checksum = payload_checksum(&payload);
        Self {
            position_count,
            payload,
            checksum,
        }
    }

    pub fn position_count(&self) -> u32 {
        self.position_count
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// Bytes this page occupies on disk, frame header included.
    pub fn size_in_bytes(&self) -> u64 {
        (FRAME_HEADER_LEN + self.payload.len()) as u64
    }
}

fn payload_checksum(payload: &[u8]) -> u64 {
    let hash = blake3::hash(payload);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

/// Converts pages to and from their serialized form.
///
/// `deserialize(serialize(p))` must equal `p`.
pub trait PageCodec: Send + Sync {
    fn serialize(&self, page: &Page) -> io::Result<SerializedPage>;

    fn deserialize(&self, page: SerializedPage) -> io::Result<Page>;
}

/// Default codec: the page as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPagesSerde;

impl PageCodec for JsonPagesSerde {
    fn serialize(&self, page: &Page) -> io::Result<SerializedPage> {
        // JSON has no NaN/inf; they would come back as null.
        let non_finite = page.columns().iter().flat_map(|c| &c.values).any(|v| {
            matches!(v, Scalar::F32(f) if !f.is_finite())
                || matches!(v, Scalar::F64(f) if !f.is_finite())
        });
        if non_finite {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "page contains non-finite floats",
            ));
        }
        let position_count = u32::try_from(page.position_count()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "page has too many positions")
        })?;
        let payload = serde_json::to_vec(page).map_err(io::Error::from)?;
        Ok(SerializedPage::new(position_count, payload))
    }

    fn deserialize(&self, page: SerializedPage) -> io::Result<Page> {
        let decoded: Page = serde_json::from_slice(&page.payload).map_err(io::Error::from)?;
        if decoded.position_count() as u64 != page.position_count as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "decoded page has {} positions, frame says {}",
                    decoded.position_count(),
                    page.position_count
                ),
            ));
        }
        Ok(decoded)
    }
}

pub fn write_serialized_page<W: Write>(out: &mut W, page: &SerializedPage) -> io::Result<()> {
    let payload_len = u32::try_from(page.payload.len())
        .ok()
        .filter(|len| *len <= MAX_PAYLOAD_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "page payload too large"))?;

    let mut header = [0u8; FRAME_HEADER_LEN];
    header[0..4].copy_from_slice(&FRAME_MAGIC.to_le_bytes());
    header[4..8].copy_from_slice(&page.position_count.to_le_bytes());
    header[8..12].copy_from_slice(&payload_len.to_le_bytes());
    header[12..20].copy_from_slice(&page.checksum.to_le_bytes());
    out.write_all(&header)?;
    out.write_all(&page.payload)
}

/// Read the next frame. `Ok(None)` on a clean end of stream.
pub fn read_serialized_page<R: Read>(input: &mut R) -> io::Result<Option<SerializedPage>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        match input.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("truncated frame header ({filled} of {FRAME_HEADER_LEN} bytes)"),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    let field = |range: std::ops::Range<usize>| {
        let mut word = [0u8; 4];
        word.copy_from_slice(&header[range]);
        u32::from_le_bytes(word)
    };
    let magic = field(0..4);
    if magic != FRAME_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad frame magic {magic:#010x}"),
        ));
    }
    let position_count = field(4..8);
    let payload_len = field(8..12);
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame payload length {payload_len} exceeds {MAX_PAYLOAD_LEN}"),
        ));
    }
    let mut checksum = [0u8; 8];
    checksum.copy_from_slice(&header[12..20]);
    let checksum = u64::from_le_bytes(checksum);

    let mut payload = vec![0u8; payload_len as usize];
    input.read_exact(&mut payload)?;
    if payload_checksum(&payload) != checksum {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame checksum mismatch",
        ));
    }

    Ok(Some(SerializedPage {
        position_count,
        payload,
        checksum,
    }))
}

/// Lazily decodes pages from a stream of frames.
///
/// Stops for good after the first error or the end of the stream.
pub struct PageReader<R: Read> {
    codec: Arc<dyn PageCodec>,
    input: R,
    finished: bool,
}

pub fn read_pages<R: Read>(codec: Arc<dyn PageCodec>, input: R) -> PageReader<R> {
    PageReader {
        codec,
        input,
        finished: false,
    }
}

impl<R: Read> Iterator for PageReader<R> {
    type Item = io::Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let decoded = match read_serialized_page(&mut self.input) {
            Ok(Some(frame)) => self.codec.deserialize(frame),
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => Err(e),
        };
        if decoded.is_err() {
            self.finished = true;
        }
        Some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagespill_core::types::Column;

    fn page(ids: &[i64]) -> Page {
        Page::try_new(vec![
            Column::new("id", ids.iter().map(|v| Scalar::I64(*v)).collect()),
            Column::new(
                "tag",
                ids.iter().map(|v| Scalar::Str(format!("t{v}"))).collect(),
            ),
        ])
        .unwrap()
    }

    fn encode_all(pages: &[Page]) -> Vec<u8> {
        let codec = JsonPagesSerde;
        let mut out = Vec::new();
        for p in pages {
            write_serialized_page(&mut out, &codec.serialize(p).unwrap()).unwrap();
        }
        out
    }

    #[test]
    fn frames_decode_in_order() {
        let pages = vec![page(&[1, 2]), page(&[]), page(&[3])];
        let bytes = encode_all(&pages);
        let decoded: Vec<Page> = read_pages(Arc::new(JsonPagesSerde), bytes.as_slice())
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(decoded, pages);
    }

    #[test]
    fn serialized_size_counts_header() {
        let serialized = JsonPagesSerde.serialize(&page(&[1])).unwrap();
        assert_eq!(
            serialized.size_in_bytes(),
            (FRAME_HEADER_LEN + serialized.payload().len()) as u64
        );
        assert_eq!(serialized.position_count(), 1);
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let mut reader = read_pages(Arc::new(JsonPagesSerde), io::empty());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn truncated_frame_is_an_error_then_stops() {
        let mut bytes = encode_all(&[page(&[1, 2, 3])]);
        bytes.truncate(bytes.len() - 3);
        let mut reader = read_pages(Arc::new(JsonPagesSerde), bytes.as_slice());
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(reader.next().is_none());

        let bytes = encode_all(&[page(&[1])]);
        let err = read_serialized_page(&mut &bytes[..7]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut bytes = encode_all(&[page(&[1])]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = read_serialized_page(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = encode_all(&[page(&[1])]);
        bytes[0] = 0;
        let err = read_serialized_page(&mut bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn non_finite_floats_rejected_on_encode() {
        let nan = Page::try_new(vec![Column::new("f", vec![Scalar::F64(f64::NAN)])]).unwrap();
        let err = JsonPagesSerde.serialize(&nan).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
