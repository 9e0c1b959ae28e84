/*!
    Seekable in-memory byte store.
*/

use ffmpeg_types::{Error, Result};

/**
    Origin for [`MemoryBuffer::seek`].

    The numeric values match `SEEK_SET`, `SEEK_CUR` and `SEEK_END`, which is
    what FFmpeg passes to a custom seek callback.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(Error::InvalidOrigin(other)),
        }
    }
}

/**
    A growable byte sequence with a cursor.

    Writes overwrite in place inside the existing content and grow the buffer
    past its end. The cursor may sit beyond the end after a seek; the gap is
    zero-filled by the next write.

    Reads follow the convention a byte-addressable container stream expects:
    the cursor advances by the requested length even when fewer bytes were
    available to copy.

    Not synchronized. A buffer belongs to the one muxer or demuxer it backs.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryBuffer {
    data: Vec<u8>,
    offset: u64,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Create a buffer pre-loaded with existing content, cursor at zero.
    */
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, offset: 0 }
    }

    /**
        Write `bytes` at the cursor and advance it by `bytes.len()`.

        Always writes the full slice and returns its length.
    */
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let start = self.offset as usize;
        let end = start + bytes.len();

        if start > self.data.len() {
            self.data.resize(start, 0);
        }
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);

        self.offset = end as u64;
        bytes.len()
    }

    /**
        Copy up to `into.len()` bytes from the cursor into `into`.

        Returns the number of bytes actually copied, which is zero once the
        cursor is at or past the end. The cursor always advances by
        `into.len()`.
    */
    pub fn read(&mut self, into: &mut [u8]) -> usize {
        let start = self.offset as usize;
        let copied = if start >= self.data.len() {
            0
        } else {
            let available = self.data.len() - start;
            let n = available.min(into.len());
            into[..n].copy_from_slice(&self.data[start..start + n]);
            n
        };

        self.offset += into.len() as u64;
        copied
    }

    /**
        Move the cursor and return its new absolute position.

        Fails with [`Error::NegativeOffset`] if the target lies before the
        start of the buffer; the cursor is left untouched in that case.
    */
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.offset as i64,
            Whence::End => self.data.len() as i64,
        };

        let target = base
            .checked_add(offset)
            .ok_or_else(|| Error::invalid_data("seek offset overflow"))?;
        if target < 0 {
            return Err(Error::NegativeOffset(target));
        }

        self.offset = target as u64;
        Ok(self.offset)
    }

    /**
        Seek using a raw `whence` value as handed over by FFmpeg.

        Unknown values fail with [`Error::InvalidOrigin`].
    */
    pub fn seek_raw(&mut self, offset: i64, whence: i32) -> Result<u64> {
        let whence = Whence::try_from(whence)?;
        self.seek(offset, whence)
    }

    /// The full underlying content.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /**
        Reset to empty with the cursor at zero.
    */
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.offset = 0;
    }
}
