use crate::error::{BspError, BspResult};
use binrw::{BinRead, BinWrite, Endian};
use std::fmt;
use std::io::{Cursor, Write};
use std::ops::Range;
use std::sync::Arc;

/// Endian tagged view into a shared byte buffer.
///
/// Cloning and slicing are cheap, the backing storage is reference counted
/// and only ever copied when a mutation asks for an owned vector.
#[derive(Clone)]
pub struct ByteBuf {
    data: Arc<[u8]>,
    range: Range<usize>,
    endian: Endian,
}

impl ByteBuf {
    pub fn new(data: Vec<u8>, endian: Endian) -> Self {
        let len = data.len();
        ByteBuf {
            data: data.into(),
            range: 0..len,
            endian,
        }
    }

    pub fn empty(endian: Endian) -> Self {
        ByteBuf::new(Vec::new(), endian)
    }

    /// Concatenate raw parts into a fresh buffer.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a [u8]>, endian: Endian) -> Self {
        let mut data = Vec::new();
        for part in parts {
            data.extend_from_slice(part);
        }
        ByteBuf::new(data, endian)
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.range.clone()]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Sub view sharing the backing storage and inheriting the endianness.
    pub fn slice(&self, range: Range<usize>) -> BspResult<ByteBuf> {
        if range.start > range.end || range.end > self.len() {
            return Err(BspError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.len(),
            });
        }
        Ok(ByteBuf {
            data: Arc::clone(&self.data),
            range: self.range.start + range.start..self.range.start + range.end,
            endian: self.endian,
        })
    }

    pub fn reader(&self) -> ByteReader {
        ByteReader::new(self.as_slice(), self.endian)
    }

    fn bytes_at<const N: usize>(&self, pos: usize) -> BspResult<[u8; N]> {
        let slice = self
            .as_slice()
            .get(pos..pos + N)
            .ok_or(BspError::OutOfBounds {
                start: pos,
                end: pos + N,
                len: self.len(),
            })?;
        let mut bytes = [0; N];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    pub fn i16_at(&self, pos: usize) -> BspResult<i16> {
        let b = self.bytes_at(pos)?;
        Ok(if self.endian == Endian::Little {
            i16::from_le_bytes(b)
        } else {
            i16::from_be_bytes(b)
        })
    }

    pub fn u16_at(&self, pos: usize) -> BspResult<u16> {
        Ok(self.i16_at(pos)? as u16)
    }

    pub fn i32_at(&self, pos: usize) -> BspResult<i32> {
        let b = self.bytes_at(pos)?;
        Ok(if self.endian == Endian::Little {
            i32::from_le_bytes(b)
        } else {
            i32::from_be_bytes(b)
        })
    }

    pub fn u32_at(&self, pos: usize) -> BspResult<u32> {
        Ok(self.i32_at(pos)? as u32)
    }

    pub fn f32_at(&self, pos: usize) -> BspResult<f32> {
        Ok(f32::from_bits(self.u32_at(pos)?))
    }
}

impl AsRef<[u8]> for ByteBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ByteBuf")
            .field("len", &self.len())
            .field("endian", &self.endian)
            .finish()
    }
}

/// Sequential reader over a byte slice with a fixed endianness.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        ByteReader {
            cursor: Cursor::new(data),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn set_position(&mut self, pos: usize) {
        self.cursor.set_position(pos as u64);
    }

    pub fn skip(&mut self, count: usize) {
        let pos = self.cursor.position() + count as u64;
        self.cursor.set_position(pos);
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.position())
    }

    pub fn read<T>(&mut self) -> BspResult<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        Ok(T::read_options(&mut self.cursor, self.endian, ())?)
    }

    pub fn read_args<T, A>(&mut self, args: A) -> BspResult<T>
    where
        T: for<'b> BinRead<Args<'b> = A>,
    {
        Ok(T::read_options(&mut self.cursor, self.endian, args)?)
    }

    pub fn read_vec<T>(&mut self, count: usize) -> BspResult<Vec<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read()?);
        }
        Ok(items)
    }
}

/// Sequential writer building an owned buffer with a fixed endianness.
pub struct ByteWriter {
    cursor: Cursor<Vec<u8>>,
    endian: Endian,
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        ByteWriter {
            cursor: Cursor::new(Vec::new()),
            endian,
        }
    }

    pub fn with_capacity(capacity: usize, endian: Endian) -> Self {
        ByteWriter {
            cursor: Cursor::new(Vec::with_capacity(capacity)),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Writes past the current end zero fill the gap.
    pub fn set_position(&mut self, pos: usize) {
        self.cursor.set_position(pos as u64);
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn write<T>(&mut self, value: &T) -> BspResult<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        Ok(value.write_options(&mut self.cursor, self.endian, ())?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> BspResult<()> {
        self.cursor.write_all(bytes)?;
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}
