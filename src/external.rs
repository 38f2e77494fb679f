//! Sibling file overlays: `.lmp` lump overrides next to the map, plus the
//! per lump `.bsp_lump` files and `.ent` entity overlays Titanfall ships.

use crate::bspfile::{AppId, BspFile, LumpType, HEADER_LUMPS_TF};
use crate::buffer::ByteBuf;
use crate::data::game;
use crate::error::BspResult;
use binrw::BinRead;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// { payload offset, lump index, lump version, map revision }
#[derive(Debug, Clone, Copy, BinRead)]
struct LumpFileHeader {
    offset: i32,
    index: i32,
    version: i32,
    map_revision: i32,
}

const LUMP_FILE_HEADER_SIZE: usize = 16;

const ENTITY_SUFFIXES: [&str; 5] = ["env", "fx", "script", "snd", "spawn"];
// "ENTITIESxx\n"
const ENTITY_PREAMBLE_LEN: usize = 11;

pub(crate) fn apply_sibling_files(bsp: &mut BspFile, path: &Path) -> BspResult<()> {
    if bsp.app() == AppId::TITANFALL {
        apply_titanfall_lump_files(bsp, path)?;
        merge_entity_files(bsp, path)?;
    } else {
        apply_lump_files(bsp, path)?;
    }
    Ok(())
}

/// Scan `<name>_l_<i>.lmp` overrides, stopping at the first missing index.
fn apply_lump_files(bsp: &mut BspFile, path: &Path) -> BspResult<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    let stem = match path.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => return Ok(()),
    };

    for i in 0..HEADER_LUMPS_TF {
        let lump_path = dir.join(format!("{stem}_l_{i}.lmp"));
        if !lump_path.exists() {
            break;
        }
        apply_lump_file(bsp, &lump_path)?;
    }
    Ok(())
}

fn apply_lump_file(bsp: &mut BspFile, lump_path: &Path) -> BspResult<()> {
    let buf = ByteBuf::new(fs::read(lump_path)?, bsp.endian());
    if buf.len() < LUMP_FILE_HEADER_SIZE {
        warn!(file = %lump_path.display(), "lump file too short for its header");
        return Ok(());
    }
    let header: LumpFileHeader = buf.reader().read()?;

    let index = header.index as usize;
    if header.index < 0 || bsp.lump_at(index).is_none() {
        warn!(file = %lump_path.display(), index = header.index, "lump file for invalid lump index");
        return Ok(());
    }
    if header.offset < 0 || header.offset as usize > buf.len() {
        warn!(file = %lump_path.display(), offset = header.offset, "lump file payload offset out of range");
        return Ok(());
    }

    let payload = buf.slice(header.offset as usize..buf.len())?;
    debug!(
        file = %lump_path.display(),
        lump = index,
        bytes = payload.len(),
        map_revision = header.map_revision,
        "applying lump file override"
    );

    if matches!(LumpType::try_from(index), Ok(LumpType::GameLump)) {
        // directory offsets in a lump file are relative to that file
        let game_lumps = game::parse_directory(&payload, header.offset, bsp.app())?;
        bsp.set_game_lumps(game_lumps);
    }

    if let Some(lump) = bsp.lump_at_mut(index) {
        lump.set_data(payload);
        lump.set_version(header.version);
        lump.set_parent_file(lump_path.to_path_buf());
    }
    Ok(())
}

/// Apply `<name>.bsp.<index:04x>.bsp_lump` overrides, each replacing one
/// lump's payload in place.
fn apply_titanfall_lump_files(bsp: &mut BspFile, path: &Path) -> BspResult<()> {
    for i in 0..HEADER_LUMPS_TF {
        let mut name: OsString = path.as_os_str().to_owned();
        name.push(format!(".{i:04x}.bsp_lump"));
        let lump_path = PathBuf::from(name);
        if !lump_path.exists() {
            continue;
        }
        let data = fs::read(&lump_path)?;
        debug!(file = %lump_path.display(), lump = i, bytes = data.len(), "applying external lump");
        let endian = bsp.endian();
        if let Some(lump) = bsp.lump_at_mut(i) {
            lump.set_data(ByteBuf::new(data, endian));
            lump.set_parent_file(lump_path);
        }
    }
    Ok(())
}

/// Concatenate `<name>_{env,fx,script,snd,spawn}.ent` overlays onto the
/// entity lump. Each overlay carries an `ENTITIESxx\n` preamble and a NUL
/// terminator, the merged lump ends in a single NUL.
fn merge_entity_files(bsp: &mut BspFile, path: &Path) -> BspResult<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    let stem = match path.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => return Ok(()),
    };

    let mut merged = bsp.lump(LumpType::Entities).data().to_vec();
    if merged.last() == Some(&0) {
        merged.pop();
    }

    let mut found = false;
    for suffix in ENTITY_SUFFIXES {
        let ent_path = dir.join(format!("{stem}_{suffix}.ent"));
        if !ent_path.exists() {
            continue;
        }
        let mut data = fs::read(&ent_path)?;
        if data.len() >= ENTITY_PREAMBLE_LEN && data.starts_with(b"ENTITIES") {
            data.drain(..ENTITY_PREAMBLE_LEN);
        } else {
            warn!(file = %ent_path.display(), "entity overlay without ENTITIES preamble");
        }
        if data.last() == Some(&0) {
            data.pop();
        }
        debug!(file = %ent_path.display(), bytes = data.len(), "merging entity overlay");
        merged.extend_from_slice(&data);
        found = true;
    }

    if found {
        merged.push(0);
        let endian = bsp.endian();
        bsp.lump_mut(LumpType::Entities)
            .set_data(ByteBuf::new(merged, endian));
    }
    Ok(())
}
