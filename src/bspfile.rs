//! The outer BSP container: format detection, the lump directory and the
//! write path that reassembles a file from its lumps.

use crate::buffer::{ByteBuf, ByteWriter};
use crate::cipher::{self, XOR_KEY_LEN};
use crate::data::game::{self, GameLump};
use crate::error::{BspError, BspResult};
use crate::external;
use crate::lzma;
use crate::winding::{MAX_COORD, MAX_COORD_STRATA};
use binrw::{BinRead, BinWrite, Endian};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Number of descriptors in a standard directory.
pub const HEADER_LUMPS: usize = 64;
/// Titanfall directories are twice as long.
pub const HEADER_LUMPS_TF: usize = 128;
/// Byte size of the standard header including the descriptor table.
pub const HEADER_SIZE: usize = 1036;

const IDENT_VBSP: u32 = u32::from_le_bytes(*b"VBSP");
const IDENT_RBSP: u32 = u32::from_le_bytes(*b"rBSP");
const IDENT_GOLDSRC: u32 = 0x1E;
const ZIP_MAGICS: [[u8; 4]; 3] = [*b"PK\x03\x04", *b"PK\x05\x06", *b"PK\x07\x08"];
const XOR_KEY_OFFSET: usize = 384;
// undocumented constant the Titanfall compiler writes after the map revision
const TF_HEADER_PAD: u32 = 0x7F;

/// Steam app id selecting parser variants.
///
/// Open set, unknown values parse as the generic Source layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AppId(pub u32);

impl AppId {
    pub const UNKNOWN: AppId = AppId(0);
    pub const HALF_LIFE_2: AppId = AppId(220);
    pub const LEFT_4_DEAD_2: AppId = AppId(550);
    pub const DARK_MESSIAH: AppId = AppId(2100);
    pub const TACTICAL_INTERVENTION: AppId = AppId(51100);
    pub const VINDICTUS: AppId = AppId(212160);
    pub const CONTAGION: AppId = AppId(238430);
    pub const TITANFALL: AppId = AppId(1454890);
    pub const STRATA_SOURCE: AppId = AppId(669270);

    /// World half extent used when reconstructing brush windings.
    pub fn max_coord(self) -> f32 {
        if self == AppId::STRATA_SOURCE {
            MAX_COORD_STRATA
        } else {
            MAX_COORD
        }
    }

    fn lump_count(self) -> usize {
        if self == AppId::TITANFALL {
            HEADER_LUMPS_TF
        } else {
            HEADER_LUMPS
        }
    }

    fn header_size(self) -> usize {
        match self {
            // ident, version, map revision, pad, 128 descriptors
            AppId::TITANFALL => 16 + HEADER_LUMPS_TF * 16,
            // one extra u32 after the version
            AppId::CONTAGION => HEADER_SIZE + 4,
            _ => HEADER_SIZE,
        }
    }
}

#[allow(dead_code)]
#[repr(usize)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum LumpType {
    Entities,
    Planes,
    TextureData,
    Vertices,
    Visibility,
    Nodes,
    TextureInfo,
    Faces,
    Lighting,
    Occlusion,
    Leaves,
    FaceIds,
    Edges,
    SurfaceEdges,
    Models,
    WorldLights,
    LeafFaces,
    LeafBrushes,
    Brushes,
    BrushSides,
    Areas,
    AreaPortals,
    Unused0,
    Unused1,
    Unused2,
    Unused3,
    DisplacementInfo,
    OriginalFaces,
    PhysDisplacement,
    PhysCollide,
    VertNormals,
    VertNormalIndices,
    DisplacementLightMapAlphas,
    DisplacementVertices,
    DisplacementLightMapSamplePositions,
    GameLump,
    LeafWaterData,
    Primitives,
    PrimVertices,
    PrimIndices,
    PakFile,
    ClipPortalVertices,
    CubeMaps,
    TextureDataStringData,
    TextureDataStringTable,
    Overlays,
    LeafMinimumDistanceToWater,
    FaceMacroTextureInfo,
    DisplacementTris,
    PhysicsCollideSurface,
    WaterOverlays,
    LeafAmbientIndexHdr,
    LeafAmbientIndex,
    LightingHdr,
    WorldLightsHdr,
    LeafAmbientLightingHdr,
    LeafAmbientLighting,
    XZipPakFile,
    FacesHdr,
    MapFlags,
    OverlayFades,
    OverlaySystemLevels,
    PhysLevel,
    DisplacementMultiBlend,
}

static_assertions::const_assert_eq!(LumpType::DisplacementMultiBlend as usize, 63);

impl LumpType {
    /// Minimum bsp version carrying this lump, `None` when always present.
    pub fn min_version(self) -> Option<u32> {
        use LumpType::*;
        match self {
            LeafAmbientIndexHdr | LeafAmbientIndex | LightingHdr | WorldLightsHdr
            | LeafAmbientLightingHdr | LeafAmbientLighting | FacesHdr | MapFlags => Some(20),
            OverlayFades => Some(21),
            OverlaySystemLevels | DisplacementMultiBlend => Some(22),
            PhysLevel => Some(23),
            _ => None,
        }
    }
}

// generic descriptor layout
#[derive(Debug, Clone, Copy, Default, BinRead, BinWrite)]
struct LumpEntry {
    offset: i32,
    length: i32,
    version: i32,
    four_cc: i32,
}

// Left 4 Dead 2 moved the version field to the front
#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct LumpEntryL4D2 {
    version: i32,
    offset: i32,
    length: i32,
    four_cc: i32,
}

impl From<LumpEntryL4D2> for LumpEntry {
    fn from(entry: LumpEntryL4D2) -> Self {
        LumpEntry {
            offset: entry.offset,
            length: entry.length,
            version: entry.version,
            four_cc: entry.four_cc,
        }
    }
}

impl From<LumpEntry> for LumpEntryL4D2 {
    fn from(entry: LumpEntry) -> Self {
        LumpEntryL4D2 {
            version: entry.version,
            offset: entry.offset,
            length: entry.length,
            four_cc: entry.four_cc,
        }
    }
}

/// One region of typed data in the outer file.
#[derive(Debug, Clone)]
pub struct Lump {
    index: usize,
    offset: u32,
    version: i32,
    four_cc: i32,
    data: ByteBuf,
    parent_file: Option<PathBuf>,
}

impl Lump {
    pub fn index(&self) -> usize {
        self.index
    }

    /// The type is derived from the index, Titanfall indices above 63 have
    /// no generic equivalent.
    pub fn lump_type(&self) -> Option<LumpType> {
        LumpType::try_from(self.index).ok()
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.data.len()
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Original uncompressed size when the payload is compressed, else 0.
    pub fn four_cc(&self) -> i32 {
        self.four_cc
    }

    pub fn data(&self) -> &ByteBuf {
        &self.data
    }

    /// Swap in a new payload buffer.
    pub fn set_data(&mut self, data: ByteBuf) {
        self.data = data;
    }

    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    /// Sibling file this lump was overridden from, if any.
    pub fn parent_file(&self) -> Option<&Path> {
        self.parent_file.as_deref()
    }

    pub(crate) fn set_parent_file(&mut self, path: PathBuf) {
        self.parent_file = Some(path);
    }

    pub fn is_compressed(&self) -> bool {
        lzma::is_compressed(self.data.as_slice())
    }

    /// Transparently decompressed payload.
    pub fn read_data(&self) -> BspResult<Cow<[u8]>> {
        if self.is_compressed() {
            Ok(Cow::Owned(lzma::decompress(self.data.as_slice())?))
        } else {
            Ok(Cow::Borrowed(self.data.as_slice()))
        }
    }

    /// Wrap the payload in an LZMA envelope. Returns false when the lump was
    /// already compressed or too small to benefit.
    pub fn compress(&mut self) -> BspResult<bool> {
        if self.is_compressed() {
            return Ok(false);
        }
        match lzma::compress(self.data.as_slice())? {
            Some(packed) => {
                self.four_cc = self.data.len() as i32;
                self.data = ByteBuf::new(packed, self.data.endian());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Unwrap a compressed payload back to raw bytes.
    pub fn uncompress(&mut self) -> BspResult<bool> {
        if !self.is_compressed() {
            return Ok(false);
        }
        let raw = lzma::decompress(self.data.as_slice())?;
        self.data = ByteBuf::new(raw, self.data.endian());
        self.four_cc = 0;
        Ok(true)
    }
}

/// A parsed map file: directory, lump payloads and the embedded game lump
/// directory.
#[derive(Debug)]
pub struct BspFile {
    path: Option<PathBuf>,
    name: String,
    endian: Endian,
    app: AppId,
    version: u32,
    map_revision: i32,
    lumps: Vec<Lump>,
    game_lumps: Vec<GameLump>,
}

impl BspFile {
    /// Load a map from disk and apply any sibling lump or entity files
    /// sitting next to it.
    pub fn load(path: impl AsRef<Path>) -> BspResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut bsp = Self::parse(name, data)?;
        bsp.path = Some(path.to_path_buf());
        external::apply_sibling_files(&mut bsp, path)?;
        Ok(bsp)
    }

    /// Parse a map from a fully loaded buffer.
    pub fn parse(name: impl Into<String>, mut data: Vec<u8>) -> BspResult<Self> {
        if data.len() < 4 {
            return Err(BspError::InvalidHeader);
        }
        let raw = [data[0], data[1], data[2], data[3]];
        if ZIP_MAGICS.contains(&raw) {
            return Err(BspError::ArchiveFile);
        }
        if data.len() < HEADER_SIZE {
            return Err(BspError::InvalidHeader);
        }

        let mut app = AppId::UNKNOWN;
        let endian = if u32::from_be_bytes(raw) == IDENT_VBSP {
            Endian::Big
        } else if u32::from_le_bytes(raw) == IDENT_VBSP {
            Endian::Little
        } else if u32::from_le_bytes(raw) == IDENT_RBSP {
            app = AppId::TITANFALL;
            Endian::Little
        } else if u32::from_le_bytes(raw) == IDENT_GOLDSRC {
            return Err(BspError::GoldSrcFormat);
        } else if let Some(key) = xor_probe(&data) {
            app = AppId::TACTICAL_INTERVENTION;
            cipher::xor_buf(&mut data, &key);
            debug!("xor encrypted map, key recovered from offset {XOR_KEY_OFFSET}");
            Endian::Little
        } else {
            return Err(BspError::UnknownIdent(u32::from_le_bytes(raw)));
        };

        let buf = ByteBuf::new(data, endian);
        let mut reader = buf.reader();
        reader.skip(4);
        let mut version: u32 = reader.read()?;

        // dialect quirks hiding in the version field
        if version == 0x0004_0014 {
            app = AppId::DARK_MESSIAH;
            version &= 0xFF;
        } else if version == 27 && app == AppId::UNKNOWN {
            app = AppId::CONTAGION;
            let _: u32 = reader.read()?;
        } else if version == 21 && app == AppId::UNKNOWN && buf.u32_at(8)? == 0 {
            // the first generic descriptor field can never be 0, the L4D2
            // order leads with the lump version which regularly is
            app = AppId::LEFT_4_DEAD_2;
        }

        let mut map_revision = 0;
        if app == AppId::TITANFALL {
            map_revision = reader.read()?;
            let pad: u32 = reader.read()?;
            if pad != TF_HEADER_PAD {
                debug!(pad, "unexpected value after titanfall map revision");
            }
        }

        let mut lumps = Vec::with_capacity(app.lump_count());
        for index in 0..app.lump_count() {
            let entry: LumpEntry = if app == AppId::LEFT_4_DEAD_2 {
                reader.read::<LumpEntryL4D2>()?.into()
            } else {
                reader.read()?
            };
            lumps.push(build_lump(index, entry, &buf)?);
        }

        if app != AppId::TITANFALL {
            map_revision = reader.read()?;
        }

        let mut bsp = BspFile {
            path: None,
            name: name.into(),
            endian,
            app,
            version,
            map_revision,
            lumps,
            game_lumps: Vec::new(),
        };

        // Vindictus shares version 20 with stock Source, the widened game
        // lump directory is the tell
        if bsp.version == 20 && bsp.endian == Endian::Little && game::is_vindictus(&bsp) {
            bsp.app = AppId::VINDICTUS;
        }
        bsp.game_lumps = game::parse(&bsp)?;

        Ok(bsp)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn app(&self) -> AppId {
        self.app
    }

    pub fn set_app(&mut self, app: AppId) {
        self.app = app;
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn map_revision(&self) -> i32 {
        self.map_revision
    }

    pub fn lumps(&self) -> &[Lump] {
        &self.lumps
    }

    pub fn lump(&self, lump_type: LumpType) -> &Lump {
        &self.lumps[lump_type as usize]
    }

    pub fn lump_mut(&mut self, lump_type: LumpType) -> &mut Lump {
        &mut self.lumps[lump_type as usize]
    }

    pub fn lump_at(&self, index: usize) -> Option<&Lump> {
        self.lumps.get(index)
    }

    pub fn lump_at_mut(&mut self, index: usize) -> Option<&mut Lump> {
        self.lumps.get_mut(index)
    }

    pub fn game_lumps(&self) -> &[GameLump] {
        &self.game_lumps
    }

    pub fn game_lumps_mut(&mut self) -> &mut Vec<GameLump> {
        &mut self.game_lumps
    }

    pub(crate) fn set_game_lumps(&mut self, game_lumps: Vec<GameLump>) {
        self.game_lumps = game_lumps;
    }

    /// Whether the file's version is recent enough to carry the lump type.
    pub fn can_read_lump(&self, lump_type: LumpType) -> bool {
        match lump_type.min_version() {
            Some(min) => self.version >= min,
            None => true,
        }
    }

    /// The embedded pakfile as a zip archive.
    pub fn pakfile(&self) -> BspResult<ZipArchive<Cursor<Cow<[u8]>>>> {
        let data = self.lump(LumpType::PakFile).read_data()?;
        Ok(ZipArchive::new(Cursor::new(data))?)
    }

    /// Compress every lump and game lump that benefits from it. The game
    /// lump directory and the pakfile stay raw, the engine reads both
    /// directly.
    pub fn compress_lumps(&mut self) -> BspResult<()> {
        for lump in &mut self.lumps {
            match lump.lump_type() {
                Some(LumpType::GameLump) | Some(LumpType::PakFile) => continue,
                _ => {}
            }
            lump.compress()?;
        }
        for game_lump in &mut self.game_lumps {
            game_lump.compress()?;
        }
        Ok(())
    }

    pub fn uncompress_lumps(&mut self) -> BspResult<()> {
        for lump in &mut self.lumps {
            lump.uncompress()?;
        }
        for game_lump in &mut self.game_lumps {
            game_lump.uncompress()?;
        }
        Ok(())
    }

    /// Serialize the file into a fresh buffer, reassigning lump offsets
    /// greedily in directory order.
    pub fn write(&mut self) -> BspResult<Vec<u8>> {
        // the game lump directory is rebuilt first so its length is final,
        // offsets inside stay relative until the outer lump has a home
        if !self.game_lumps.is_empty() {
            let data = game::write(self)?;
            let endian = self.endian;
            self.lump_mut(LumpType::GameLump)
                .set_data(ByteBuf::new(data, endian));
        }

        let header_size = self.app.header_size();
        let mut next = header_size;
        for lump in &mut self.lumps {
            if lump.length() == 0 {
                lump.offset = 0;
                continue;
            }
            lump.offset = next as u32;
            next += lump.length();
        }
        let total = next;

        if !self.game_lumps.is_empty() {
            let offset = self.lump(LumpType::GameLump).offset();
            let mut data = self.lump(LumpType::GameLump).data().to_vec();
            game::fix_offsets(&mut data, self.endian, self.app, offset)?;
            let endian = self.endian;
            self.lump_mut(LumpType::GameLump)
                .set_data(ByteBuf::new(data, endian));
        }

        let mut writer = ByteWriter::with_capacity(header_size, self.endian);
        let ident = if self.app == AppId::TITANFALL {
            IDENT_RBSP
        } else {
            IDENT_VBSP
        };
        writer.write(&ident)?;
        if self.app == AppId::DARK_MESSIAH {
            writer.write(&0x0004_0014u32)?;
        } else {
            writer.write(&self.version)?;
        }
        if self.app == AppId::CONTAGION {
            writer.write(&0u32)?;
        }
        if self.app == AppId::TITANFALL {
            writer.write(&self.map_revision)?;
            writer.write(&TF_HEADER_PAD)?;
        }
        for lump in &self.lumps {
            let entry = LumpEntry {
                offset: lump.offset as i32,
                length: lump.length() as i32,
                version: lump.version,
                four_cc: lump.four_cc,
            };
            if self.app == AppId::LEFT_4_DEAD_2 {
                writer.write(&LumpEntryL4D2::from(entry))?;
            } else {
                writer.write(&entry)?;
            }
        }
        if self.app != AppId::TITANFALL {
            writer.write(&self.map_revision)?;
        }
        let header = writer.into_inner();
        debug_assert_eq!(header.len(), header_size);

        let mut out = vec![0; total];
        out[..header.len()].copy_from_slice(&header);
        for lump in &self.lumps {
            if lump.length() == 0 {
                continue;
            }
            let start = lump.offset as usize;
            out[start..start + lump.length()].copy_from_slice(lump.data.as_slice());
        }
        Ok(out)
    }

    /// Write the map to disk. Returns the file size.
    pub fn save(&mut self, path: impl AsRef<Path>) -> BspResult<usize> {
        let image = self.write()?;
        fs::write(path, &image)?;
        Ok(image.len())
    }
}

fn xor_probe(data: &[u8]) -> Option<[u8; XOR_KEY_LEN]> {
    let key: [u8; XOR_KEY_LEN] = data
        .get(XOR_KEY_OFFSET..XOR_KEY_OFFSET + XOR_KEY_LEN)?
        .try_into()
        .ok()?;
    let ident = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    (cipher::xor_u32(ident, &key) == IDENT_VBSP).then_some(key)
}

/// Build a lump from its descriptor, clamping out of range regions instead
/// of failing the whole load.
fn build_lump(index: usize, entry: LumpEntry, buf: &ByteBuf) -> BspResult<Lump> {
    let capacity = buf.len();
    let mut offset = entry.offset;
    let mut length = entry.length;

    if offset < 0 {
        warn!(lump = index, offset, "negative lump offset");
        offset = 0;
        length = 0;
    }
    if offset as usize > capacity {
        warn!(lump = index, offset, capacity, "lump offset beyond end of file");
        offset = capacity as i32;
        length = 0;
    }
    if length < 0 {
        warn!(lump = index, length, "negative lump length");
        length = 0;
    }
    if offset as usize + length as usize > capacity {
        warn!(
            lump = index,
            offset, length, capacity, "lump reaches beyond end of file, clamping"
        );
        length = (capacity - offset as usize) as i32;
    }

    let data = buf.slice(offset as usize..offset as usize + length as usize)?;
    Ok(Lump {
        index,
        offset: offset as u32,
        version: entry.version,
        four_cc: entry.four_cc,
        data,
        parent_file: None,
    })
}
