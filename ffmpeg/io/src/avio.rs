/*!
    FFmpeg custom I/O backed by a [`MemoryBuffer`].
*/

use std::ffi::{c_int, c_void};
use std::ptr;

use ffmpeg_next::ffi;

use ffmpeg_types::{Error, Result};

use crate::buffer::MemoryBuffer;

/// Size of the scratch buffer FFmpeg uses between us and the muxer/demuxer.
const IO_BUFFER_SIZE: usize = 8192;

// Not exported as integers by the bindings on every FFmpeg version.
const AVSEEK_SIZE: c_int = 0x10000;
const AVSEEK_FORCE: c_int = 0x20000;

/**
    An `AVIOContext` whose reads, writes and seeks go to a [`MemoryBuffer`].

    The context owns both the FFmpeg I/O context and the buffer. Format
    contexts using it must be flagged `AVFMT_FLAG_CUSTOM_IO` and must be
    dropped (or have their `pb` cleared) before this value is dropped.
*/
pub struct AvioContext {
    ptr: *mut ffi::AVIOContext,
    buffer: *mut MemoryBuffer,
}

impl AvioContext {
    /**
        Create a read+seek context over existing bytes, for demuxing.
    */
    pub fn reader(buffer: MemoryBuffer) -> Result<Self> {
        Self::alloc(buffer, false)
    }

    /**
        Create a write+seek context over an (usually empty) buffer, for muxing.
    */
    pub fn writer(buffer: MemoryBuffer) -> Result<Self> {
        Self::alloc(buffer, true)
    }

    fn alloc(buffer: MemoryBuffer, writable: bool) -> Result<Self> {
        let buffer = Box::into_raw(Box::new(buffer));

        unsafe {
            let io_buffer = ffi::av_malloc(IO_BUFFER_SIZE) as *mut u8;
            if io_buffer.is_null() {
                drop(Box::from_raw(buffer));
                return Err(Error::codec("failed to allocate I/O buffer"));
            }

            let ptr = ffi::avio_alloc_context(
                io_buffer,
                IO_BUFFER_SIZE as c_int,
                writable as c_int,
                buffer as *mut c_void,
                if writable { None } else { Some(read_packet) },
                if writable { Some(write_packet) } else { None },
                Some(seek),
            );
            if ptr.is_null() {
                ffi::av_free(io_buffer as *mut c_void);
                drop(Box::from_raw(buffer));
                return Err(Error::codec("failed to allocate I/O context"));
            }

            Ok(Self { ptr, buffer })
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut ffi::AVIOContext {
        self.ptr
    }

    /**
        Push any bytes still held in FFmpeg's scratch buffer into the
        memory buffer.
    */
    pub fn flush(&mut self) {
        unsafe { ffi::avio_flush(self.ptr) }
    }

    /**
        The memory buffer behind this context.

        Call [`flush`](Self::flush) first when reading back a muxer's output.
    */
    pub fn buffer(&self) -> &MemoryBuffer {
        unsafe { &*self.buffer }
    }

    /**
        Move the content out, leaving an empty buffer behind.
    */
    pub fn take_buffer(&mut self) -> MemoryBuffer {
        unsafe { std::mem::take(&mut *self.buffer) }
    }
}

impl Drop for AvioContext {
    fn drop(&mut self) {
        unsafe {
            if !self.ptr.is_null() {
                // The scratch buffer may have been reallocated by FFmpeg, so
                // free whatever the context currently points at.
                ffi::av_freep(&mut (*self.ptr).buffer as *mut *mut u8 as *mut c_void);
                ffi::avio_context_free(&mut self.ptr);
            }
            drop(Box::from_raw(self.buffer));
            self.buffer = ptr::null_mut();
        }
    }
}

impl std::fmt::Debug for AvioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvioContext")
            .field("len", &self.buffer().len())
            .field("position", &self.buffer().position())
            .finish()
    }
}

unsafe extern "C" fn read_packet(opaque: *mut c_void, buf: *mut u8, size: c_int) -> c_int {
    if size <= 0 {
        return 0;
    }

    let buffer = unsafe { &mut *(opaque as *mut MemoryBuffer) };
    let into = unsafe { std::slice::from_raw_parts_mut(buf, size as usize) };

    match buffer.read(into) {
        0 => ffi::AVERROR_EOF,
        n => n as c_int,
    }
}

unsafe extern "C" fn write_packet(opaque: *mut c_void, buf: *const u8, size: c_int) -> c_int {
    if size <= 0 {
        return 0;
    }

    let buffer = unsafe { &mut *(opaque as *mut MemoryBuffer) };
    let bytes = unsafe { std::slice::from_raw_parts(buf, size as usize) };

    buffer.write(bytes) as c_int
}

unsafe extern "C" fn seek(opaque: *mut c_void, offset: i64, whence: c_int) -> i64 {
    let buffer = unsafe { &mut *(opaque as *mut MemoryBuffer) };

    if whence & AVSEEK_SIZE != 0 {
        return buffer.len() as i64;
    }

    match buffer.seek_raw(offset, whence & !AVSEEK_FORCE) {
        Ok(position) => position as i64,
        Err(_) => ffi::AVERROR(ffi::EINVAL) as i64,
    }
}
