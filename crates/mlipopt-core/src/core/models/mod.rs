//! Data structures describing a molecule and the electronic state it is evaluated in.

pub mod atom;
pub mod element;
pub mod molecule;
pub mod state;
pub mod topology;
