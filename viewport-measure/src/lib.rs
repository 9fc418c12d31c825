//! Interactive distance measurement for a 3D viewport.
//!
//! A [`tools::ruler::RulerManipulator`] turns left clicks on scene geometry
//! into an ordered chain of picked points and draws the distance of every
//! segment at its midpoint. Double clicking clears the chain. The toolbar, a
//! keyboard shortcut or the web RPC bridge toggle the tool.

pub mod engine;
pub mod error;
pub mod rpc;
pub mod tools;
