//! PDF overlay and e-signature engine.
//!
//! The crate owns everything between a loaded master PDF and the flattened,
//! signed copy: placing marks in zoom-independent page coordinates, the
//! select/drag/resize/rotate interaction model, rasterizing typed marks, and
//! drawing the final overlay list into the PDF. The host (a browser shell or
//! native UI) renders pages, forwards input records to
//! [`engine::EngineCore`], and applies the [`engine::Action`]s it returns.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Interaction engine and its [`engine::Action`] output |
//! | [`session`] | [`session::Editor`]: engine plus fonts, rasterizer, and export |
//! | [`doc`] | Overlay item model and the ordered item store |
//! | [`placement`] | Tools, placement payloads, and the select/place mode |
//! | [`transform`] | Pixel to normalized page coordinate conversions |
//! | [`input`] | Input event records and the gesture state machine |
//! | [`hit`] | Hit-testing of item bodies and resize handles |
//! | [`snap`] | Center alignment against sibling items |
//! | [`gesture`] | Drag, resize, and rotate math |
//! | [`raster`] | Typed-mark rasterization and data URL helpers |
//! | [`fonts`] | Handwriting font manifest and font sources |
//! | [`export`] | Flattening overlays into the PDF |
//! | [`color`] | Hex color parsing |
//! | [`config`] | Environment-driven editor configuration |
//! | [`consts`] | Fixed geometry and rasterization constants |
//! | [`error`] | The [`error::ErrorCode`] trait |

pub mod color;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod error;
pub mod export;
pub mod fonts;
pub mod gesture;
pub mod hit;
pub mod input;
pub mod placement;
pub mod raster;
pub mod session;
pub mod snap;
pub mod transform;
