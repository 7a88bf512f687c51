//! riotee-core - Core library for programming Riotee targets
//!
//! This crate contains everything between a firmware image and the probe's
//! command channel. It is `no_std` (with `alloc`) so the wire format can be
//! shared with probe-side code; the `std` feature adds Intel-Hex file loading.
//!
//! # Data flow
//!
//! ```text
//! HexImage ──► Segment::words() ──► Packets ──► frame::encode_write ──► CommandTransport
//!                                                                            │
//!                              program::program ◄── frame::decode_read ◄─────┘
//! ```
//!
//! # Features
//!
//! - `std` - Enable standard library support and hex-file parsing
//!
//! # Example
//!
//! ```ignore
//! use riotee_core::{image::HexImage, target::{Msp430, Target}};
//!
//! let text = std::fs::read_to_string("firmware.hex")?;
//! let image = HexImage::from_hex_str(&text)?;
//! let mut msp430 = Msp430::open(&mut probe)?;
//! msp430.program(&image, true, &mut |p| println!("{:.0}%", p.percent()))?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod frame;
pub mod image;
pub mod packet;
pub mod probe;
pub mod program;
pub mod protocol;
pub mod target;
pub mod transport;

pub use error::{Error, Result};
