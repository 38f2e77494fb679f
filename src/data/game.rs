//! The game lump: a secondary directory embedded inside one outer lump,
//! addressing game specific data by four character code.

use crate::bspfile::{AppId, BspFile, LumpType};
use crate::buffer::{ByteBuf, ByteWriter};
use crate::error::{BspError, BspResult};
use crate::lzma;
use binrw::{BinRead, BinWrite, Endian};
use bitflags::bitflags;
use std::borrow::Cow;
use tracing::warn;

#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLumpFlags(pub u16);

bitflags! {
    impl GameLumpFlags: u16 {
        const COMPRESSED = 0x1;
    }
}

/// One entry of the game lump directory.
#[derive(Debug, Clone)]
pub struct GameLump {
    id: i32,
    pub flags: GameLumpFlags,
    pub version: u32,
    offset: i32,
    data: ByteBuf,
}

impl GameLump {
    pub fn new(id: i32, flags: GameLumpFlags, version: u32, data: ByteBuf) -> Self {
        GameLump {
            id,
            flags,
            version,
            offset: 0,
            data,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// The id as its four ascii characters.
    pub fn four_cc(&self) -> [u8; 4] {
        self.id.to_be_bytes()
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.four_cc()).into_owned()
    }

    /// Payload offset relative to the containing lump.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn data(&self) -> &ByteBuf {
        &self.data
    }

    pub fn set_data(&mut self, data: ByteBuf) {
        self.data = data;
    }

    pub fn is_compressed(&self) -> bool {
        self.flags.contains(GameLumpFlags::COMPRESSED)
    }

    /// Transparently decompressed payload.
    pub fn read_data(&self) -> BspResult<Cow<[u8]>> {
        if self.is_compressed() {
            Ok(Cow::Owned(lzma::decompress(self.data.as_slice())?))
        } else {
            Ok(Cow::Borrowed(self.data.as_slice()))
        }
    }

    pub fn compress(&mut self) -> BspResult<bool> {
        if self.is_compressed() {
            return Ok(false);
        }
        match lzma::compress(self.data.as_slice())? {
            Some(packed) => {
                self.flags.insert(GameLumpFlags::COMPRESSED);
                self.data = ByteBuf::new(packed, self.data.endian());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn uncompress(&mut self) -> BspResult<bool> {
        if !self.is_compressed() {
            return Ok(false);
        }
        let raw = lzma::decompress(self.data.as_slice())?;
        self.flags.remove(GameLumpFlags::COMPRESSED);
        self.data = ByteBuf::new(raw, self.data.endian());
        Ok(true)
    }

    /// Size of the payload once uncompressed, the value the directory
    /// stores in its length field.
    fn stated_length(&self) -> i32 {
        if self.is_compressed() {
            lzma::actual_size(self.data.as_slice()).unwrap_or(0) as i32
        } else {
            self.data.len() as i32
        }
    }
}

// layout independent view of one directory entry
#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    id: i32,
    flags: u32,
    version: u32,
    offset: i32,
    length: i32,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct GameLumpEntry {
    id: i32,
    flags: u16,
    version: u16,
    offset: i32,
    length: i32,
}

// Vindictus widened flags and version to 32 bits
#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct GameLumpEntryVindictus {
    id: i32,
    flags: i32,
    version: i32,
    offset: i32,
    length: i32,
}

// Dark Messiah leads with an unused field
#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct GameLumpEntryDarkMessiah {
    unused: i32,
    id: i32,
    flags: u16,
    version: u16,
    offset: i32,
    length: i32,
}

impl From<GameLumpEntry> for Entry {
    fn from(e: GameLumpEntry) -> Self {
        Entry {
            id: e.id,
            flags: e.flags.into(),
            version: e.version.into(),
            offset: e.offset,
            length: e.length,
        }
    }
}

impl From<GameLumpEntryVindictus> for Entry {
    fn from(e: GameLumpEntryVindictus) -> Self {
        Entry {
            id: e.id,
            flags: e.flags as u32,
            version: e.version as u32,
            offset: e.offset,
            length: e.length,
        }
    }
}

impl From<GameLumpEntryDarkMessiah> for Entry {
    fn from(e: GameLumpEntryDarkMessiah) -> Self {
        Entry {
            id: e.id,
            flags: e.flags.into(),
            version: e.version.into(),
            offset: e.offset,
            length: e.length,
        }
    }
}

fn entry_size(app: AppId) -> usize {
    match app {
        AppId::VINDICTUS | AppId::DARK_MESSIAH => 20,
        _ => 16,
    }
}

// byte position of the offset field within an entry
fn offset_field_pos(app: AppId) -> usize {
    match app {
        AppId::VINDICTUS | AppId::DARK_MESSIAH => 12,
        _ => 8,
    }
}

/// Parse the game lump directory of a loaded file.
pub(crate) fn parse(bsp: &BspFile) -> BspResult<Vec<GameLump>> {
    if bsp.app() == AppId::TITANFALL {
        return Ok(Vec::new());
    }
    let lump = bsp.lump(LumpType::GameLump);
    parse_directory(lump.data(), lump.offset() as i32, bsp.app())
}

/// Parse a game lump directory from the containing lump's payload.
/// `lump_offset` is the payload's position in the outer file, stored
/// offsets are rebased against it.
pub(crate) fn parse_directory(
    data: &ByteBuf,
    lump_offset: i32,
    app: AppId,
) -> BspResult<Vec<GameLump>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = data.reader();
    let count: i32 = reader.read()?;
    if count < 0 || count as usize > data.len() / entry_size(app) {
        warn!(count, "implausible game lump count, ignoring directory");
        return Ok(Vec::new());
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let entry: Entry = match app {
            AppId::VINDICTUS => reader.read::<GameLumpEntryVindictus>()?.into(),
            AppId::DARK_MESSIAH => reader.read::<GameLumpEntryDarkMessiah>()?.into(),
            _ => reader.read::<GameLumpEntry>()?.into(),
        };
        entries.push(entry);
    }

    let mut lumps = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        // trailing dummy descriptor written next to compressed lumps
        if entry.id == 0 && entry.length == 0 {
            continue;
        }

        // stored offsets are absolute in the outer file, console builds
        // occasionally keep them relative already
        let rebased = entry.offset - lump_offset > 0;
        let rel = if rebased {
            entry.offset - lump_offset
        } else {
            entry.offset
        };
        if !rebased && entry.offset != 0 {
            warn!(
                id = entry.id,
                offset = entry.offset,
                lump_offset,
                "game lump offset not rebased, may decode at the wrong position"
            );
        }

        let compressed = entry.flags & u32::from(GameLumpFlags::COMPRESSED.bits()) != 0;
        let byte_len = if compressed {
            // the length field holds the uncompressed size, the payload runs
            // to the next entry or to the end of the containing lump
            let next = entries[i + 1..]
                .iter()
                .map(|e| e.offset)
                .find(|&offset| offset != 0);
            let end = if rebased {
                lump_offset + data.len() as i32
            } else {
                data.len() as i32
            };
            next.unwrap_or(end) - entry.offset
        } else {
            entry.length
        };

        if rel < 0 || byte_len < 0 || (rel + byte_len) as usize > data.len() {
            warn!(
                id = entry.id,
                offset = rel,
                length = byte_len,
                lump_size = data.len(),
                "game lump out of bounds, dropping"
            );
            continue;
        }

        lumps.push(GameLump {
            id: entry.id,
            flags: GameLumpFlags::from_bits_retain(entry.flags as u16),
            version: entry.version,
            offset: rel,
            data: data.slice(rel as usize..(rel + byte_len) as usize)?,
        });
    }
    Ok(lumps)
}

/// Serialize the directory and payloads with lump relative offsets. The
/// outer write pass translates them to absolute via [`fix_offsets`] once the
/// containing lump has its final position.
pub(crate) fn write(bsp: &BspFile) -> BspResult<Vec<u8>> {
    let app = bsp.app();
    let game_lumps = bsp.game_lumps();

    // the stock compiler terminates a directory holding compressed lumps
    // with an empty descriptor, its offset is the end sentinel
    let dummy_tail = game_lumps.iter().any(GameLump::is_compressed);
    let count = game_lumps.len() + usize::from(dummy_tail);

    let mut entries = Vec::with_capacity(count);
    let mut offset = (4 + count * entry_size(app)) as i32;
    for lump in game_lumps {
        entries.push(Entry {
            id: lump.id,
            flags: lump.flags.bits().into(),
            version: lump.version,
            offset,
            length: lump.stated_length(),
        });
        offset += lump.data.len() as i32;
    }
    if dummy_tail {
        entries.push(Entry {
            offset,
            ..Entry::default()
        });
    }

    let mut writer = ByteWriter::new(bsp.endian());
    writer.write(&(count as i32))?;
    for entry in &entries {
        match app {
            AppId::VINDICTUS => writer.write(&GameLumpEntryVindictus {
                id: entry.id,
                flags: entry.flags as i32,
                version: entry.version as i32,
                offset: entry.offset,
                length: entry.length,
            })?,
            AppId::DARK_MESSIAH => writer.write(&GameLumpEntryDarkMessiah {
                unused: 0,
                id: entry.id,
                flags: entry.flags as u16,
                version: entry.version as u16,
                offset: entry.offset,
                length: entry.length,
            })?,
            _ => writer.write(&GameLumpEntry {
                id: entry.id,
                flags: entry.flags as u16,
                version: entry.version as u16,
                offset: entry.offset,
                length: entry.length,
            })?,
        }
    }
    for lump in game_lumps {
        writer.write_bytes(lump.data.as_slice())?;
    }
    Ok(writer.into_inner())
}

/// Translate the relative offsets written by [`write`] into absolute file
/// offsets, patching the serialized directory in place.
pub(crate) fn fix_offsets(
    data: &mut [u8],
    endian: Endian,
    app: AppId,
    lump_offset: u32,
) -> BspResult<()> {
    let read_i32 = |data: &[u8], pos: usize| -> BspResult<i32> {
        let bytes: [u8; 4] = data
            .get(pos..pos + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or(BspError::OutOfBounds {
                start: pos,
                end: pos + 4,
                len: data.len(),
            })?;
        Ok(if endian == Endian::Little {
            i32::from_le_bytes(bytes)
        } else {
            i32::from_be_bytes(bytes)
        })
    };

    let count = read_i32(data, 0)?;
    for i in 0..count as usize {
        let pos = 4 + i * entry_size(app) + offset_field_pos(app);
        let offset = read_i32(data, pos)?;
        if offset == 0 {
            continue;
        }
        let fixed = offset + lump_offset as i32;
        let bytes = if endian == Endian::Little {
            fixed.to_le_bytes()
        } else {
            fixed.to_be_bytes()
        };
        data[pos..pos + 4].copy_from_slice(&bytes);
    }
    Ok(())
}

/// Probe a version 20 little endian file for the widened Vindictus
/// directory: parse both layouts and trust whichever yields plausible
/// four character codes throughout.
pub(crate) fn is_vindictus(bsp: &BspFile) -> bool {
    let data = bsp.lump(LumpType::GameLump).data();
    let generic = probe_layout(data, entry_size(AppId::UNKNOWN) - 4);
    let vindictus = probe_layout(data, entry_size(AppId::VINDICTUS) - 4);
    !generic && vindictus
}

// stride is the entry size minus the leading four character code
fn probe_layout(data: &ByteBuf, stride: usize) -> bool {
    if data.is_empty() {
        return false;
    }
    let mut reader = data.reader();
    let count: i32 = match reader.read() {
        Ok(count) => count,
        Err(_) => return false,
    };
    if count < 0 {
        return false;
    }
    for _ in 0..count {
        let id: i32 = match reader.read() {
            Ok(id) => id,
            Err(_) => return false,
        };
        if !id.to_be_bytes().iter().all(u8::is_ascii_alphanumeric) {
            return false;
        }
        if reader.remaining() < stride {
            return false;
        }
        reader.skip(stride);
    }
    true
}
