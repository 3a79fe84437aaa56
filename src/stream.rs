//! Streaming conversion adapters over `std::io` byte streams.
//!
//! [`DecodeReader`] wraps a source stream and converts on demand, pull-style;
//! converted bytes that do not fit the caller's buffer are retained in a
//! pending-output window until the next read. [`EncodeWriter`] converts each
//! chunk in full and pushes it downstream synchronously, keeping no state
//! between calls.

use std::io::{self, Read, Write};

use encoding_rs::Encoding;

use crate::engine::{self, DEFAULT_BUF_SIZE, Transcoder};
use crate::{Error, Result};

/// A pull-style decoding reader.
///
/// Wraps any [`Read`] source of bytes in the `from` encoding and yields bytes
/// in the `to` encoding. Each `read` call pulls up to the requested number of
/// bytes from the source, converts them in one engine call, and delivers as
/// much output as fits; the remainder waits in an internal window for the
/// next call. A multi-byte sequence split across source pulls is carried in
/// the converter state, so reads of any size produce the same byte stream as
/// a one-shot [`convert`](crate::convert) of the whole source.
///
/// Dropping the reader releases the converter state;
/// [`into_inner`](DecodeReader::into_inner) hands back the wrapped source
/// explicitly.
pub struct DecodeReader<R: Read> {
    inner: R,
    transcoder: Transcoder,
    from: &'static Encoding,
    to: &'static Encoding,

    // input staging, sized to the caller's request
    ibuf: Vec<u8>,
    ilen: usize,

    // output staging; [ostart, oend) is the undelivered window
    obuf: Vec<u8>,
    ostart: usize,
    oend: usize,

    // source hit end of stream and converter state has been flushed
    finished: bool,
    // conversion failure observed after bytes were already drained this call;
    // surfaced by the next call once the drained count has been returned
    pending_err: Option<Error>,
}

impl<R: Read> std::fmt::Debug for DecodeReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeReader")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("ilen", &self.ilen)
            .field("ostart", &self.ostart)
            .field("oend", &self.oend)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<R: Read> DecodeReader<R> {
    /// Open a decoding reader over `inner`, converting from the `from`
    /// encoding to the `to` encoding (WHATWG labels).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEncoding`] if either label fails to resolve.
    pub fn new(inner: R, from: &str, to: &str) -> Result<Self> {
        let from = engine::encoding_for_label(from)?;
        let to = engine::encoding_for_label(to)?;

        Ok(Self {
            inner,
            transcoder: Transcoder::new(from, to),
            from,
            to,
            ibuf: vec![0u8; DEFAULT_BUF_SIZE],
            ilen: 0,
            obuf: vec![0u8; DEFAULT_BUF_SIZE],
            ostart: 0,
            oend: 0,
            finished: false,
            pending_err: None,
        })
    }

    /// The raw source bytes of the most recent conversion step, retained
    /// after a failure so the offending input can be inspected. Empty while
    /// no failure is pending.
    pub fn last_input(&self) -> &[u8] {
        &self.ibuf[..self.ilen]
    }

    /// The converted bytes produced but not yet delivered to the caller.
    pub fn last_output(&self) -> &[u8] {
        &self.obuf[self.ostart..self.oend]
    }

    /// A reference to the wrapped source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the reader and hand back the wrapped source, discarding any
    /// undelivered converted bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
        let plen = p.len();
        if plen == 0 {
            return Ok(0);
        }

        // drain the pending window first
        let mut n = 0;
        let olen = self.oend - self.ostart;
        if olen > 0 {
            if olen > plen {
                p.copy_from_slice(&self.obuf[self.ostart..self.ostart + plen]);
                self.ostart += plen;
                return Ok(plen);
            }
            p[..olen].copy_from_slice(&self.obuf[self.ostart..self.oend]);
            self.ostart = 0;
            self.oend = 0;
            if olen == plen {
                return Ok(plen);
            }
            n = olen;
        }

        // a failure deferred by a previous call surfaces once nothing is
        // left to drain
        if let Some(err) = self.pending_err.take() {
            if n > 0 {
                self.pending_err = Some(err);
                return Ok(n);
            }
            return Err(io::Error::new(io::ErrorKind::InvalidData, err));
        }

        loop {
            if self.finished {
                return Ok(n);
            }

            // size the input staging to the caller's request; reallocate only
            // when the current capacity cannot hold it
            if plen != self.ibuf.len() {
                if plen > self.ibuf.capacity() {
                    self.ibuf = Vec::with_capacity(plen * 2);
                }
                self.ibuf.resize(plen, 0);
            }

            let pulled = match self.inner.read(&mut self.ibuf) {
                Ok(pulled) => pulled,
                Err(err) => {
                    if n > 0 {
                        // the source will report the same error to the next
                        // call; the drained count must not be lost
                        return Ok(n);
                    }
                    return Err(err);
                }
            };
            self.ilen = pulled;

            // zero bytes pulled means end of stream: flush converter state
            // exactly once, then this reader only drains
            let last = pulled == 0;
            if last {
                self.finished = true;
            }

            let needed = engine::worst_case_output_len(pulled, self.from, self.to);
            if needed > self.obuf.len() {
                self.obuf = vec![0u8; needed * 2];
            }

            let produced =
                match self
                    .transcoder
                    .convert_chunk(&self.ibuf[..pulled], &mut self.obuf, last)
                {
                    Ok(produced) => {
                        self.ilen = 0;
                        produced
                    }
                    Err(err) => {
                        if n > 0 {
                            self.pending_err = Some(err);
                            return Ok(n);
                        }
                        return Err(io::Error::new(io::ErrorKind::InvalidData, err));
                    }
                };

            // deliver what fits; the rest becomes the pending window
            let rem = plen - n;
            if produced > rem {
                p[n..].copy_from_slice(&self.obuf[..rem]);
                self.ostart = rem;
                self.oend = produced;
                return Ok(plen);
            }
            p[n..n + produced].copy_from_slice(&self.obuf[..produced]);
            n += produced;

            if n > 0 || self.finished {
                return Ok(n);
            }
            // the pull ended inside a multi-byte sequence and nothing was
            // produced; pull again rather than returning a misleading 0
        }
    }
}

/// A push-style encoding writer.
///
/// Each [`write`](EncodeWriter::write) converts the whole chunk with fresh
/// converter state and writes the converted bytes to the sink synchronously.
/// No state is kept between calls, so every chunk must consist of complete
/// code unit sequences in the `from` encoding; a sequence split across two
/// `write` calls is reported as malformed input.
pub struct EncodeWriter<W: Write> {
    inner: W,
    from: &'static Encoding,
    to: &'static Encoding,
    obuf: Vec<u8>,
    olen: usize,
}

impl<W: Write> EncodeWriter<W> {
    /// Open an encoding writer over `inner`, converting from the `from`
    /// encoding to the `to` encoding (WHATWG labels).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownEncoding`] if either label fails to resolve.
    pub fn new(inner: W, from: &str, to: &str) -> Result<Self> {
        let from = engine::encoding_for_label(from)?;
        let to = engine::encoding_for_label(to)?;

        Ok(Self {
            inner,
            from,
            to,
            obuf: vec![0u8; DEFAULT_BUF_SIZE],
            olen: 0,
        })
    }

    /// Convert `data` in full and write the converted bytes downstream.
    ///
    /// Returns the sink's own write count, which is in **target-encoding
    /// bytes** and is propagated unchanged: a short count from the sink is
    /// not retried here. (That count convention is also why this is not a
    /// [`std::io::Write`] impl, whose contract requires a consumed-input
    /// count.) An empty `data` is a no-op returning 0.
    ///
    /// # Errors
    ///
    /// Conversion failures surface as [`io::ErrorKind::InvalidData`] wrapping
    /// the crate [`Error`]; sink failures are passed through.
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }

        let needed = engine::worst_case_output_len(data.len(), self.from, self.to);
        if needed > self.obuf.len() {
            self.obuf = vec![0u8; needed * 2];
        }

        // fresh converter state: chunks are complete by contract
        let mut transcoder = Transcoder::new(self.from, self.to);
        let produced = transcoder
            .convert_chunk(data, &mut self.obuf, true)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.olen = produced;

        self.inner.write(&self.obuf[..produced])
    }

    /// Flush the wrapped sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// The converted bytes of the most recent successful `write`.
    pub fn last_output(&self) -> &[u8] {
        &self.obuf[..self.olen]
    }

    /// A reference to the wrapped sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the writer and hand back the wrapped sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
