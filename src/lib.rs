//! # chapterize
//!
//! Split EPUB content documents that hold several chapters into one file per
//! chapter.
//!
//! Some authoring tools put a whole book, or a whole part of it, into a
//! single XHTML file and address the chapters through `file.xhtml#anchor`
//! navigation targets. This crate cuts such files at their anchors and
//! rewrites the manifest, spine and table of contents to match.
//!
//! ## Features
//!
//! - Reads both navigation dialects (EPUB 2 NCX and EPUB 3 XHTML nav)
//! - Keeps spine order, linear flags and navigation hierarchy
//! - Drops leftover page-number and "back to contents" paragraphs
//! - Nothing is written unless the whole pass succeeds
//!
//! ## Quick Start
//!
//! ```no_run
//! use chapterize::{EpubDir, Outcome, StandardizeConfig};
//!
//! let mut book = EpubDir::open("unpacked-book")?;
//! if let Outcome::Rewritten(result) = book.standardize(&StandardizeConfig::default())? {
//!     println!("{} chapters", result.chapters.len());
//!     book.save()?;
//! }
//! # Ok::<(), chapterize::Error>(())
//! ```
//!
//! ## Working with Parsed Packages
//!
//! The core only needs a [`ContentStore`](io::ContentStore) and already
//! parsed [`Manifest`], [`Spine`] and [`NavNode`] values; see
//! [`standardize()`] and [`Standardizer`].

pub mod book;
pub mod epub;
pub mod error;
pub mod io;
pub mod standardize;
pub(crate) mod util;
pub mod xml;

pub use book::{Manifest, ManifestItem, MediaType, NavNode, PageDirection, Spine, SpineItem};
pub use epub::EpubDir;
pub use error::{Error, Result};
pub use standardize::{
    ChapterOutput, NoChange, Outcome, StandardizeConfig, Standardized, Standardizer, standardize,
};
