//! Reader/writer for Source engine BSP containers and reconstruction of
//! editable brush geometry from compiled maps.
//!
//! A compiled map stores its content in a directory of lumps with several
//! per game layout dialects, optional LZMA compression, an embedded
//! secondary directory of game lumps and, for some games, sibling files
//! overriding individual lumps. [`BspFile`] handles that container in both
//! directions. [`BspData`] exposes the geometry tables, and
//! [`BrushReconstructor`] inverts the compiler's half space representation
//! back into convex solids for a map editor.
//!
//! ```no_run
//! use unbsp::{BrushPolicy, BrushReconstructor, BspData, BspFile, Solid, WorldAlignedTextures};
//!
//! # fn main() -> unbsp::BspResult<()> {
//! let bsp = BspFile::load("de_dust2.bsp")?;
//! let data = BspData::parse(&bsp)?;
//! let textures = WorldAlignedTextures;
//! let mut writer =
//!     BrushReconstructor::new(&data, &textures, BrushPolicy::default(), bsp.app());
//! let mut solids: Vec<Solid> = Vec::new();
//! writer.write_brushes(&mut solids)?;
//! # Ok(())
//! # }
//! ```

mod bspfile;
mod buffer;
pub mod cipher;
pub mod data;
mod decompile;
mod error;
mod external;
mod geom;
pub mod lzma;
mod winding;

pub use crate::bspfile::{
    AppId, BspFile, Lump, LumpType, HEADER_LUMPS, HEADER_LUMPS_TF, HEADER_SIZE,
};
pub use crate::buffer::{ByteBuf, ByteReader, ByteWriter};
pub use crate::data::game::{GameLump, GameLumpFlags};
pub use crate::data::BspData;
pub use crate::decompile::{
    model_brush_ranges, BrushPolicy, BrushRange, BrushReconstructor, Side, Solid, SolidSink,
    TextureAxis, TextureBuilder, WindingFactory, WorldAlignedTextures,
};
pub use crate::error::{BspError, BspResult};
pub use crate::geom::{Plane, Vector, Vector4};
pub use crate::winding::{Winding, MAX_COORD, MAX_COORD_STRATA, ON_EPSILON};
