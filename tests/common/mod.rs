#![allow(dead_code)]

use binrw::Endian;
use unbsp::ByteWriter;

pub const IDENT_VBSP: u32 = u32::from_le_bytes(*b"VBSP");
pub const IDENT_RBSP: u32 = u32::from_le_bytes(*b"rBSP");

pub struct LumpSpec {
    pub index: usize,
    pub version: i32,
    pub four_cc: i32,
    pub payload: Vec<u8>,
}

/// Assembles synthetic map images for the parser tests.
pub struct BspBuilder {
    endian: Endian,
    ident: u32,
    version_field: u32,
    map_revision: i32,
    titanfall: bool,
    l4d2_order: bool,
    contagion_pad: bool,
    lumps: Vec<LumpSpec>,
}

impl BspBuilder {
    pub fn new(endian: Endian, version: u32) -> Self {
        BspBuilder {
            endian,
            ident: IDENT_VBSP,
            version_field: version,
            map_revision: 0,
            titanfall: false,
            l4d2_order: false,
            contagion_pad: false,
            lumps: Vec::new(),
        }
    }

    pub fn titanfall(endian: Endian, version: u32) -> Self {
        BspBuilder {
            ident: IDENT_RBSP,
            titanfall: true,
            ..Self::new(endian, version)
        }
    }

    pub fn map_revision(mut self, map_revision: i32) -> Self {
        self.map_revision = map_revision;
        self
    }

    /// Raw value for the version field, e.g. Dark Messiah's `0x00040014`.
    pub fn version_field(mut self, raw: u32) -> Self {
        self.version_field = raw;
        self
    }

    pub fn l4d2_order(mut self) -> Self {
        self.l4d2_order = true;
        self
    }

    pub fn contagion_pad(mut self) -> Self {
        self.contagion_pad = true;
        self
    }

    pub fn lump(self, index: usize, payload: impl Into<Vec<u8>>) -> Self {
        self.lump_versioned(index, 0, payload)
    }

    pub fn lump_versioned(
        mut self,
        index: usize,
        version: i32,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        self.lumps.push(LumpSpec {
            index,
            version,
            four_cc: 0,
            payload: payload.into(),
        });
        self
    }

    pub fn header_size(&self) -> usize {
        let base = if self.titanfall {
            16 + 128 * 16
        } else {
            8 + 64 * 16 + 4
        };
        base + if self.contagion_pad { 4 } else { 0 }
    }

    /// Offset the payload of the n-th added lump will land at.
    pub fn payload_offset(&self, n: usize) -> usize {
        self.header_size()
            + self.lumps[..n]
                .iter()
                .map(|lump| lump.payload.len())
                .sum::<usize>()
    }

    pub fn build(self) -> Vec<u8> {
        let lump_count = if self.titanfall { 128 } else { 64 };
        let header_size = self.header_size();

        // offset, length, version, four_cc
        let mut entries = vec![[0i32; 4]; lump_count];
        let mut next = header_size as i32;
        for lump in &self.lumps {
            if lump.payload.is_empty() {
                entries[lump.index][2] = lump.version;
                continue;
            }
            entries[lump.index] = [
                next,
                lump.payload.len() as i32,
                lump.version,
                lump.four_cc,
            ];
            next += lump.payload.len() as i32;
        }

        let mut writer = ByteWriter::new(self.endian);
        writer.write(&self.ident).unwrap();
        writer.write(&self.version_field).unwrap();
        if self.contagion_pad {
            writer.write(&0u32).unwrap();
        }
        if self.titanfall {
            writer.write(&self.map_revision).unwrap();
            writer.write(&0x7Fu32).unwrap();
        }
        for entry in &entries {
            let [offset, length, version, four_cc] = *entry;
            if self.l4d2_order {
                writer.write(&version).unwrap();
                writer.write(&offset).unwrap();
                writer.write(&length).unwrap();
            } else {
                writer.write(&offset).unwrap();
                writer.write(&length).unwrap();
                writer.write(&version).unwrap();
            }
            writer.write(&four_cc).unwrap();
        }
        if !self.titanfall {
            writer.write(&self.map_revision).unwrap();
        }
        assert_eq!(writer.len(), header_size);

        for lump in &self.lumps {
            if lump.payload.is_empty() {
                continue;
            }
            writer.set_position(entries[lump.index][0] as usize);
            writer.write_bytes(&lump.payload).unwrap();
        }
        writer.into_inner()
    }
}

pub fn put_i32(image: &mut [u8], pos: usize, endian: Endian, value: i32) {
    let bytes = if endian == Endian::Little {
        value.to_le_bytes()
    } else {
        value.to_be_bytes()
    };
    image[pos..pos + 4].copy_from_slice(&bytes);
}

/// Route warnings from the parser into the test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("unbsp-{name}-{}", std::process::id()));
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
