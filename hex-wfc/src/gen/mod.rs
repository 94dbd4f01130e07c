//! Procedural generation: the collapse solver and its supporting queue and
//! propagation machinery.

pub mod collapse;
